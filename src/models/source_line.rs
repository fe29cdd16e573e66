use super::Amount;
use bigdecimal::BigDecimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// SAP 参考单据行 (Source Line)
///
/// 拉取后不可变，重新拉取时整体替换。`line_num` 在一次拉取结果内唯一。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceLine {
    pub line_num: i64,
    #[serde(default)]
    pub unit_price: Amount,
    #[serde(default)]
    pub quantity: Amount,
    /// 匹配所用金额
    #[serde(default)]
    pub line_total: Amount,
    #[serde(default)]
    pub description: String,
}

impl SourceLine {
    pub fn new(line_num: i64, line_total: impl Into<Amount>) -> Self {
        Self {
            line_num,
            unit_price: Amount::default(),
            quantity: Amount::default(),
            line_total: line_total.into(),
            description: String::new(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }
}

/// 数据库行 (t_sap_document_line)
#[derive(Debug, Clone, FromRow)]
pub struct SourceLineRow {
    pub line_num: i64,
    pub price: Option<BigDecimal>,
    pub quantity: Option<BigDecimal>,
    pub line_total: Option<BigDecimal>,
    pub description: Option<String>,
}

impl From<SourceLineRow> for SourceLine {
    fn from(row: SourceLineRow) -> Self {
        Self {
            line_num: row.line_num,
            unit_price: row.price.into(),
            quantity: row.quantity.into(),
            line_total: row.line_total.into(),
            description: row.description.unwrap_or_default(),
        }
    }
}

/// 参考单据键: 单据号 + 业务伙伴编码
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ReferenceKey {
    pub doc_num: String,
    #[serde(default)]
    pub card_code: String,
}

impl ReferenceKey {
    pub fn new(doc_num: impl Into<String>, card_code: impl Into<String>) -> Self {
        Self {
            doc_num: doc_num.into(),
            card_code: card_code.into(),
        }
    }

    /// 单据号为空视为未选择参考单据
    pub fn is_blank(&self) -> bool {
        self.doc_num.trim().is_empty()
    }
}
