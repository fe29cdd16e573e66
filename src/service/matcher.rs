use bigdecimal::{BigDecimal, Zero};
use crate::models::{Amount, MatchMapping, SourceLine, TargetLine};

/// 金额比较策略
///
/// `amount_tolerance` 为 0 时按十进制精确相等匹配；
/// `balance_tolerance` 只用于对账视图的平衡判断 (严格小于)。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchPolicy {
    pub amount_tolerance: BigDecimal,
    pub balance_tolerance: BigDecimal,
}

impl Default for MatchPolicy {
    fn default() -> Self {
        Self {
            amount_tolerance: BigDecimal::zero(),
            balance_tolerance: BigDecimal::new(1.into(), 2),
        }
    }
}

impl MatchPolicy {
    pub fn with_amount_tolerance(mut self, tolerance: BigDecimal) -> Self {
        self.amount_tolerance = tolerance;
        self
    }

    /// 未解析的金额永远不匹配
    pub fn amounts_match(&self, a: &Amount, b: &Amount) -> bool {
        match (a.value(), b.value()) {
            (Some(a), Some(b)) if self.amount_tolerance.is_zero() => a == b,
            (Some(a), Some(b)) => (a - b).abs() <= self.amount_tolerance,
            _ => false,
        }
    }

    pub fn lines_match(&self, source: &SourceLine, target: &TargetLine) -> bool {
        self.amounts_match(&source.line_total, &target.line_extension_amount)
    }
}

/// 自动匹配结果: 新映射 + 重新排列后的 Target Line 序列
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AutoMatch {
    pub mapping: MatchMapping,
    pub targets: Vec<TargetLine>,
}

/// 贪心配对，返回每个 Source Line 对应的 Target Line 下标
///
/// 先看同位置的行，再按顺序扫描尚未使用的行。重复的 id 只用一次。
fn pair_indices(source: &[SourceLine], target: &[TargetLine], policy: &MatchPolicy) -> Vec<Option<usize>> {
    let mut used = vec![false; target.len()];
    let mut claimed_ids: Vec<&str> = Vec::new();
    let mut pairs = Vec::with_capacity(source.len());

    for (idx, sl) in source.iter().enumerate() {
        let available = |ti: usize| !used[ti] && !claimed_ids.contains(&target[ti].id.as_str());

        let same_index = target
            .get(idx)
            .filter(|t| available(idx) && policy.lines_match(sl, t))
            .map(|_| idx);
        let chosen = same_index.or_else(|| {
            target
                .iter()
                .enumerate()
                .find(|(ti, t)| available(*ti) && policy.lines_match(sl, t))
                .map(|(ti, _)| ti)
        });

        if let Some(ti) = chosen {
            used[ti] = true;
            claimed_ids.push(target[ti].id.as_str());
        }
        pairs.push(chosen);
    }

    pairs
}

/// 初始匹配
///
/// 纯函数: 相同输入得到相同映射。没有任何匹配时返回空映射。
pub fn compute_initial_matches(source: &[SourceLine], target: &[TargetLine], policy: &MatchPolicy) -> MatchMapping {
    let pairs = pair_indices(source, target, policy);
    let mapping: MatchMapping = source
        .iter()
        .zip(&pairs)
        .filter_map(|(sl, ti)| ti.map(|ti| (sl.line_num, target[ti].id.clone())))
        .collect();

    tracing::debug!(
        "initial match: {} source lines, {} target lines, {} pairs",
        source.len(),
        target.len(),
        mapping.len()
    );
    mapping
}

/// 自动匹配: 丢弃现有映射，全量重算并重排 Target Line
///
/// 已匹配的行放在其 Source Line 的同一位置；未匹配 Source Line 的位置
/// 按原相对顺序填入未匹配的 Target Line，剩余的追加在末尾。
/// Target Line 不足以填满空位时，后面的配对会前移。
pub fn auto_match(source: &[SourceLine], target: &[TargetLine], policy: &MatchPolicy) -> AutoMatch {
    let pairs = pair_indices(source, target, policy);

    let mut claimed = vec![false; target.len()];
    for ti in pairs.iter().flatten() {
        claimed[*ti] = true;
    }
    let mut leftovers = target
        .iter()
        .zip(&claimed)
        .filter(|(_, c)| !**c)
        .map(|(t, _)| t.clone());

    let mut ordered = Vec::with_capacity(target.len());
    for slot in &pairs {
        match slot {
            Some(ti) => ordered.push(target[*ti].clone()),
            None => {
                if let Some(t) = leftovers.next() {
                    ordered.push(t);
                }
            }
        }
    }
    ordered.extend(leftovers);

    let mapping: MatchMapping = source
        .iter()
        .zip(&pairs)
        .filter_map(|(sl, ti)| ti.map(|ti| (sl.line_num, target[ti].id.clone())))
        .collect();

    tracing::info!(
        "auto match: {}/{} source lines paired, {} target lines reordered",
        mapping.len(),
        source.len(),
        ordered.len()
    );

    AutoMatch {
        mapping,
        targets: ordered,
    }
}

/// 交换后局部修复
///
/// `target` 是交换之后的序列。只处理受影响位置上的 Source Line:
/// 同位置金额相等则 (重新) 配对，否则删除旧配对。其他行号的条目保持不变；
/// 同位置的 Target Line 仍被未受影响的行号占用时不抢占，受影响行号保持未匹配。
pub fn repair_after_swap(
    source: &[SourceLine],
    target: &[TargetLine],
    mapping: &MatchMapping,
    affected: [usize; 2],
    policy: &MatchPolicy,
) -> MatchMapping {
    let mut repaired = mapping.clone();
    let positions: &[usize] = if affected[0] == affected[1] {
        &affected[..1]
    } else {
        &affected[..]
    };
    let affected_keys: Vec<i64> = positions
        .iter()
        .filter_map(|&pos| source.get(pos))
        .map(|sl| sl.line_num)
        .collect();

    for &pos in positions {
        let Some(sl) = source.get(pos) else {
            continue;
        };

        let colocated = target.get(pos).filter(|t| policy.lines_match(sl, t));
        let Some(t) = colocated else {
            if let Some(stale) = repaired.unpair(sl.line_num) {
                tracing::debug!("swap repair: line {} no longer matches {}", sl.line_num, stale);
            }
            continue;
        };

        match repaired.source_for(&t.id) {
            Some(holder) if holder == sl.line_num => {}
            Some(holder) if !affected_keys.contains(&holder) => {
                tracing::debug!(
                    "swap repair: {} still held by line {}, line {} left unmatched",
                    t.id,
                    holder,
                    sl.line_num
                );
                repaired.unpair(sl.line_num);
            }
            _ => repaired.pair(sl.line_num, t.id.clone()),
        }
    }

    repaired
}

/// Source Line 在序列中的位置
pub fn source_index_of(source: &[SourceLine], line_num: i64) -> Option<usize> {
    source.iter().position(|sl| sl.line_num == line_num)
}
