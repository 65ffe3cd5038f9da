use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// Identifier of an electorate within one district type.
///
/// Sources key electorates either by integer or by text code. The same value
/// may be reused across district types, so an id is only meaningful alongside
/// its [`DistrictType`](super::DistrictType).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DistrictId {
    Int(i64),
    Text(Arc<str>),
}

impl DistrictId {
    /// Literal form for use in a filter expression: integers unquoted, text quoted.
    pub fn to_literal(&self) -> String {
        match self {
            DistrictId::Int(value) => value.to_string(),
            DistrictId::Text(value) => format!("'{}'", value.replace('\'', "''")),
        }
    }

    #[inline] pub fn is_text(&self) -> bool { matches!(self, DistrictId::Text(_)) }
}

impl std::fmt::Display for DistrictId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DistrictId::Int(value) => write!(f, "{value}"),
            DistrictId::Text(value) => f.write_str(value),
        }
    }
}

impl From<i64> for DistrictId {
    fn from(value: i64) -> Self { DistrictId::Int(value) }
}

impl From<&str> for DistrictId {
    fn from(value: &str) -> Self { DistrictId::Text(Arc::from(value)) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn literals_quote_text_only() {
        assert_eq!(DistrictId::from(7).to_literal(), "7");
        assert_eq!(DistrictId::from("GN01").to_literal(), "'GN01'");
        assert_eq!(DistrictId::from("O'Neil").to_literal(), "'O''Neil'");
    }

    #[test]
    fn untagged_serde_keeps_variant() {
        let ids: Vec<DistrictId> = serde_json::from_str(r#"[3, "A"]"#).unwrap();
        assert_eq!(ids, vec![DistrictId::from(3), DistrictId::from("A")]);
    }
}
