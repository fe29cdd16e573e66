use super::Amount;
use serde::{Deserialize, Serialize};

/// 发票行 (Target Line)
///
/// 用户可以切换 `selected`，也可以通过交换调整顺序。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TargetLine {
    pub id: String,
    #[serde(default)]
    pub quantity: Amount,
    #[serde(default)]
    pub unit_price: Amount,
    /// 匹配所用金额
    #[serde(default)]
    pub line_extension_amount: Amount,
    #[serde(default = "default_selected")]
    pub selected: bool,
}

fn default_selected() -> bool {
    true
}

impl TargetLine {
    pub fn new(id: impl Into<String>, line_extension_amount: impl Into<Amount>) -> Self {
        Self {
            id: id.into(),
            quantity: Amount::default(),
            unit_price: Amount::default(),
            line_extension_amount: line_extension_amount.into(),
            selected: true,
        }
    }
}
