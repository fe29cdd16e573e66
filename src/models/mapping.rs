use super::TargetLine;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// 匹配映射: Source Line 行号 -> Target Line id
///
/// 部分单射: 每个行号至多对应一个 id，每个 id 至多出现一次。
/// 插入顺序仅用于稳定输出，比较相等时不考虑顺序。
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MatchMapping {
    pairs: IndexMap<i64, String>,
}

impl MatchMapping {
    pub fn new() -> Self {
        Self::default()
    }

    /// 建立配对；若该 id 已被其他行号占用，先解除旧配对以保持单射
    pub fn pair(&mut self, line_num: i64, target_id: impl Into<String>) {
        let target_id = target_id.into();
        if let Some(holder) = self.source_for(&target_id) {
            if holder != line_num {
                self.pairs.shift_remove(&holder);
            }
        }
        self.pairs.insert(line_num, target_id);
    }

    /// 解除配对，返回原 id
    pub fn unpair(&mut self, line_num: i64) -> Option<String> {
        self.pairs.shift_remove(&line_num)
    }

    pub fn target_for(&self, line_num: i64) -> Option<&str> {
        self.pairs.get(&line_num).map(String::as_str)
    }

    pub fn source_for(&self, target_id: &str) -> Option<i64> {
        self.pairs
            .iter()
            .find(|(_, id)| id.as_str() == target_id)
            .map(|(line_num, _)| *line_num)
    }

    pub fn is_source_matched(&self, line_num: i64) -> bool {
        self.pairs.contains_key(&line_num)
    }

    pub fn is_target_matched(&self, target_id: &str) -> bool {
        self.source_for(target_id).is_some()
    }

    /// 已匹配的 Target Line 在当前序列中的位置
    pub fn matched_target_index(&self, targets: &[TargetLine], target_id: &str) -> Option<usize> {
        if !self.is_target_matched(target_id) {
            return None;
        }
        targets.iter().position(|t| t.id == target_id)
    }

    pub fn iter(&self) -> impl Iterator<Item = (i64, &str)> {
        self.pairs.iter().map(|(line_num, id)| (*line_num, id.as_str()))
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }
}

impl<S: Into<String>> FromIterator<(i64, S)> for MatchMapping {
    fn from_iter<I: IntoIterator<Item = (i64, S)>>(iter: I) -> Self {
        let mut mapping = MatchMapping::new();
        for (line_num, target_id) in iter {
            mapping.pair(line_num, target_id);
        }
        mapping
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pairing_a_claimed_target_moves_it() {
        let mut mapping: MatchMapping = [(1, "a"), (2, "b")].into_iter().collect();
        mapping.pair(3, "a");

        assert!(!mapping.is_source_matched(1));
        assert_eq!(mapping.target_for(3), Some("a"));
        assert_eq!(mapping.source_for("b"), Some(2));
        assert_eq!(mapping.len(), 2);
    }

    #[test]
    fn equality_ignores_insertion_order() {
        let left: MatchMapping = [(1, "b"), (2, "a")].into_iter().collect();
        let right: MatchMapping = [(2, "a"), (1, "b")].into_iter().collect();
        assert_eq!(left, right);
    }

    #[test]
    fn matched_target_index_requires_a_pairing() {
        let targets = vec![TargetLine::new("a", "1"), TargetLine::new("b", "2")];
        let mapping: MatchMapping = [(7, "b")].into_iter().collect();

        assert_eq!(mapping.matched_target_index(&targets, "b"), Some(1));
        assert_eq!(mapping.matched_target_index(&targets, "a"), None);
    }

    #[test]
    fn serializes_as_plain_object() {
        let mapping: MatchMapping = [(1, "b")].into_iter().collect();
        assert_eq!(serde_json::to_string(&mapping).unwrap(), r#"{"1":"b"}"#);
    }
}
