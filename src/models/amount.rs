use bigdecimal::BigDecimal;
use serde::de::{self, Unexpected};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// 可接受的最大小数位数 (绝对值)
///
/// bigdecimal 在比较和加减时按 10^|scale 差| 对齐，超出范围的字面量按无法解析处理。
pub const MAX_SCALE: i64 = 64;

/// 金额字段 (保留原始文本 + 解析后的十进制值)
///
/// 无法解析的金额 (空串、`"abc"`、`"NaN"`、`"1e-1000000000"` 等) 不报错，`value()` 返回 `None`，
/// 并且在匹配时永远不与任何金额相等。
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Amount {
    raw: String,
    value: Option<BigDecimal>,
}

impl Amount {
    pub fn parse(raw: impl Into<String>) -> Self {
        let raw = raw.into();
        let value = parse_decimal(&raw);
        Self { raw, value }
    }

    /// 原始文本
    pub fn raw(&self) -> &str {
        &self.raw
    }

    pub fn value(&self) -> Option<&BigDecimal> {
        self.value.as_ref()
    }

    pub fn is_parsed(&self) -> bool {
        self.value.is_some()
    }
}

impl From<BigDecimal> for Amount {
    fn from(value: BigDecimal) -> Self {
        Self {
            raw: value.to_string(),
            value: Some(value).filter(within_scale),
        }
    }
}

impl From<Option<BigDecimal>> for Amount {
    fn from(value: Option<BigDecimal>) -> Self {
        value.map(Amount::from).unwrap_or_default()
    }
}

impl From<&str> for Amount {
    fn from(raw: &str) -> Self {
        Amount::parse(raw)
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

/// 只接受普通十进制字面量 (可带符号和指数)，scale 超出 `MAX_SCALE` 时返回 `None`
pub(crate) fn parse_decimal(raw: &str) -> Option<BigDecimal> {
    let trimmed = raw.trim();
    let plain = trimmed
        .bytes()
        .all(|b| b.is_ascii_digit() || matches!(b, b'.' | b'-' | b'+' | b'e' | b'E'));
    if !plain || !trimmed.bytes().any(|b| b.is_ascii_digit()) {
        return None;
    }
    BigDecimal::from_str(trimmed).ok().filter(within_scale)
}

fn within_scale(value: &BigDecimal) -> bool {
    let (_, scale) = value.as_bigint_and_exponent();
    scale.abs() <= MAX_SCALE
}

impl Serialize for Amount {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.raw)
    }
}

/// JSON 数字保留原文 (依赖 serde_json 的 `arbitrary_precision`)，字符串原样保留，`null` 为空金额
impl<'de> Deserialize<'de> for Amount {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        match serde_json::Value::deserialize(deserializer)? {
            serde_json::Value::String(raw) => Ok(Amount::parse(raw)),
            serde_json::Value::Number(number) => Ok(Amount::parse(number.to_string())),
            serde_json::Value::Null => Ok(Amount::default()),
            serde_json::Value::Bool(v) => Err(de::Error::invalid_type(Unexpected::Bool(v), &EXPECTING)),
            serde_json::Value::Array(_) => Err(de::Error::invalid_type(Unexpected::Seq, &EXPECTING)),
            serde_json::Value::Object(_) => Err(de::Error::invalid_type(Unexpected::Map, &EXPECTING)),
        }
    }
}

const EXPECTING: &str = "a decimal amount as a number or a string";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_plain_decimals() {
        let amount = Amount::parse(" 100.50 ");
        assert_eq!(amount.value(), Some(&BigDecimal::from_str("100.5").unwrap()));
        assert_eq!(amount.raw(), " 100.50 ");
        assert!(Amount::parse("-3").is_parsed());
        assert!(Amount::parse("1e2").is_parsed());
    }

    #[test]
    fn garbage_is_unparsed() {
        for raw in ["", "   ", "abc", "NaN", "1,50", "12abc", ".", "-"] {
            assert!(!Amount::parse(raw).is_parsed(), "{raw:?} should not parse");
        }
    }

    #[test]
    fn deserializes_numbers_and_strings() {
        let amounts: Vec<Amount> = serde_json::from_str(r#"[100, 12.5, "7.25", null]"#).unwrap();
        assert_eq!(amounts[0].value(), Some(&BigDecimal::from(100)));
        assert_eq!(amounts[1].value(), Some(&BigDecimal::from_str("12.5").unwrap()));
        assert_eq!(amounts[2].raw(), "7.25");
        assert!(!amounts[3].is_parsed());
    }

    #[test]
    fn json_numbers_keep_their_text() {
        let amounts: Vec<Amount> = serde_json::from_str(r#"[50.00, 1e2, -0.10]"#).unwrap();
        assert_eq!(amounts[0].raw(), "50.00");
        assert_eq!(amounts[0].value(), Some(&BigDecimal::from(50)));
        assert_eq!(amounts[1].value(), Some(&BigDecimal::from(100)));
        assert_eq!(amounts[2].raw(), "-0.10");

        assert!(serde_json::from_str::<Amount>("true").is_err());
        assert!(serde_json::from_str::<Amount>("[1]").is_err());
    }

    #[test]
    fn extreme_exponents_are_unparsed() {
        for raw in ["1e-1000000000", "1e999999999", "-5E+100000"] {
            let amount = Amount::parse(raw);
            assert!(!amount.is_parsed(), "{raw:?} should not parse");
            assert_eq!(amount.raw(), raw);
        }
        assert!(Amount::parse("1e-64").is_parsed());
        assert!(Amount::parse("1e64").is_parsed());
        assert!(!Amount::parse("1e-65").is_parsed());

        let huge = BigDecimal::new(1.into(), -1_000);
        assert!(!Amount::from(huge).is_parsed());
    }

    #[test]
    fn serializes_raw_text() {
        let json = serde_json::to_string(&Amount::parse("0100.0")).unwrap();
        assert_eq!(json, r#""0100.0""#);
    }
}
