use bigdecimal::{BigDecimal, Zero};
use chrono::{DateTime, Utc};
use serde::Serialize;

use super::matcher::{self, MatchPolicy};
use crate::models::{Amount, MatchMapping, ReferenceKey, SourceLine, TargetLine};

/// 对账视图操作错误
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ViewError {
    #[error("position {index} out of range ({len} target lines)")]
    PositionOutOfRange { index: usize, len: usize },
    #[error("target line not found: {0}")]
    TargetNotFound(String),
}

/// 一次 Source Line 拉取的凭证，结果回写时用 `generation` 判断是否过期
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchTicket {
    pub generation: u64,
    pub reference: ReferenceKey,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum FetchPhase {
    NoReference,
    Loading,
    Loaded,
    Failed(String),
}

/// 对外可见的状态
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ViewStatus {
    NoReferenceSelected,
    Loading,
    Failed { message: String },
    /// 拉取成功但没有任何行
    Empty,
    Ready,
}

/// 合计与平衡判断
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReconciliationTotals {
    pub source_total: BigDecimal,
    pub target_total: BigDecimal,
    pub difference: BigDecimal,
    pub balanced: bool,
    pub unparsed_source_lines: usize,
    pub unparsed_target_lines: usize,
}

/// 视图快照 (供前端 / 上层读取)
#[derive(Debug, Clone, Serialize)]
pub struct ViewSnapshot {
    pub status: ViewStatus,
    pub reference: Option<ReferenceKey>,
    pub generation: u64,
    pub source_lines: Vec<SourceLine>,
    pub target_lines: Vec<TargetLine>,
    pub mapping: MatchMapping,
    pub totals: ReconciliationTotals,
    pub fetched_at: Option<DateTime<Utc>>,
}

/// 对账视图模型
///
/// 单一所有者，所有状态转换都是同步的。异步拉取由调用方完成，
/// 结果通过 [`ReconciliationView::apply_fetch`] 回写。
#[derive(Debug, Clone)]
pub struct ReconciliationView {
    targets: Vec<TargetLine>,
    sources: Vec<SourceLine>,
    mapping: MatchMapping,
    reference: Option<ReferenceKey>,
    phase: FetchPhase,
    generation: u64,
    fetched_at: Option<DateTime<Utc>>,
    policy: MatchPolicy,
}

impl ReconciliationView {
    pub fn new(targets: Vec<TargetLine>, policy: MatchPolicy) -> Self {
        Self {
            targets,
            sources: Vec::new(),
            mapping: MatchMapping::new(),
            reference: None,
            phase: FetchPhase::NoReference,
            generation: 0,
            fetched_at: None,
            policy,
        }
    }

    /// 选择 (或清除) 参考单据
    ///
    /// 总是丢弃已拉取的行和映射并递增 generation。参考单据为空时回到
    /// 未选择状态并返回 `None`，否则进入加载状态并返回拉取凭证。
    pub fn select_reference(&mut self, reference: Option<ReferenceKey>) -> Option<FetchTicket> {
        self.generation += 1;
        self.sources.clear();
        self.mapping = MatchMapping::new();
        self.fetched_at = None;

        match reference.filter(|r| !r.is_blank()) {
            None => {
                self.reference = None;
                self.phase = FetchPhase::NoReference;
                None
            }
            Some(reference) => {
                self.reference = Some(reference.clone());
                self.phase = FetchPhase::Loading;
                Some(FetchTicket {
                    generation: self.generation,
                    reference,
                })
            }
        }
    }

    /// 回写拉取结果，generation 不是最新时丢弃并返回 `false`
    pub fn apply_fetch(&mut self, generation: u64, result: Result<Vec<SourceLine>, String>) -> bool {
        if generation != self.generation || self.phase != FetchPhase::Loading {
            tracing::debug!(
                "dropping stale fetch result (generation {}, current {})",
                generation,
                self.generation
            );
            return false;
        }

        match result {
            Ok(lines) => {
                self.mapping = matcher::compute_initial_matches(&lines, &self.targets, &self.policy);
                self.sources = lines;
                self.phase = FetchPhase::Loaded;
                self.fetched_at = Some(Utc::now());
            }
            Err(message) => {
                self.phase = FetchPhase::Failed(message);
            }
        }
        true
    }

    /// 交换两条 Target Line 并做局部修复
    pub fn swap_targets(&mut self, from: usize, to: usize) -> Result<(), ViewError> {
        let len = self.targets.len();
        for index in [from, to] {
            if index >= len {
                return Err(ViewError::PositionOutOfRange { index, len });
            }
        }

        self.targets.swap(from, to);
        self.mapping = matcher::repair_after_swap(
            &self.sources,
            &self.targets,
            &self.mapping,
            [from, to],
            &self.policy,
        );
        Ok(())
    }

    /// 全量重算映射并重排 Target Line
    pub fn auto_match(&mut self) {
        let result = matcher::auto_match(&self.sources, &self.targets, &self.policy);
        self.mapping = result.mapping;
        self.targets = result.targets;
    }

    pub fn toggle_selected(&mut self, target_id: &str) -> Result<bool, ViewError> {
        let line = self.target_mut(target_id)?;
        line.selected = !line.selected;
        Ok(line.selected)
    }

    pub fn set_selected(&mut self, target_id: &str, selected: bool) -> Result<(), ViewError> {
        self.target_mut(target_id)?.selected = selected;
        Ok(())
    }

    fn target_mut(&mut self, target_id: &str) -> Result<&mut TargetLine, ViewError> {
        self.targets
            .iter_mut()
            .find(|t| t.id == target_id)
            .ok_or_else(|| ViewError::TargetNotFound(target_id.to_string()))
    }

    pub fn status(&self) -> ViewStatus {
        match &self.phase {
            FetchPhase::NoReference => ViewStatus::NoReferenceSelected,
            FetchPhase::Loading => ViewStatus::Loading,
            FetchPhase::Failed(message) => ViewStatus::Failed {
                message: message.clone(),
            },
            FetchPhase::Loaded if self.sources.is_empty() => ViewStatus::Empty,
            FetchPhase::Loaded => ViewStatus::Ready,
        }
    }

    /// 合计: 只要有一行金额无法解析就不算平衡
    pub fn totals(&self) -> ReconciliationTotals {
        let (source_total, unparsed_source_lines) = sum_amounts(self.sources.iter().map(|s| &s.line_total));
        let (target_total, unparsed_target_lines) =
            sum_amounts(self.targets.iter().map(|t| &t.line_extension_amount));
        let difference = (&source_total - &target_total).abs();
        let balanced = unparsed_source_lines == 0
            && unparsed_target_lines == 0
            && difference < self.policy.balance_tolerance;

        ReconciliationTotals {
            source_total,
            target_total,
            difference,
            balanced,
            unparsed_source_lines,
            unparsed_target_lines,
        }
    }

    pub fn snapshot(&self) -> ViewSnapshot {
        ViewSnapshot {
            status: self.status(),
            reference: self.reference.clone(),
            generation: self.generation,
            source_lines: self.sources.clone(),
            target_lines: self.targets.clone(),
            mapping: self.mapping.clone(),
            totals: self.totals(),
            fetched_at: self.fetched_at,
        }
    }

    /// 提交时读取: 当前顺序下被选中的 Target Line
    pub fn selected_targets(&self) -> Vec<&TargetLine> {
        self.targets.iter().filter(|t| t.selected).collect()
    }

    pub fn targets(&self) -> &[TargetLine] {
        &self.targets
    }

    pub fn sources(&self) -> &[SourceLine] {
        &self.sources
    }

    pub fn mapping(&self) -> &MatchMapping {
        &self.mapping
    }

    pub fn reference(&self) -> Option<&ReferenceKey> {
        self.reference.as_ref()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }
}

fn sum_amounts<'a>(amounts: impl Iterator<Item = &'a Amount>) -> (BigDecimal, usize) {
    let mut total = BigDecimal::zero();
    let mut unparsed = 0;
    for amount in amounts {
        match amount.value() {
            Some(value) => total += value,
            None => unparsed += 1,
        }
    }
    (total, unparsed)
}
