use serde::{Deserialize, Serialize};

/// A single attribute value stored on a layer feature.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttrValue {
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    Text(String),
}

impl AttrValue {
    #[inline] pub fn is_null(&self) -> bool { matches!(self, AttrValue::Null) }

    pub fn as_int(&self) -> Option<i64> {
        match self { AttrValue::Int(value) => Some(*value), _ => None }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self { AttrValue::Bool(value) => Some(*value), _ => None }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self { AttrValue::Text(value) => Some(value), _ => None }
    }
}

impl From<Option<i64>> for AttrValue {
    fn from(value: Option<i64>) -> Self { value.map_or(AttrValue::Null, AttrValue::Int) }
}

impl From<i64> for AttrValue {
    fn from(value: i64) -> Self { AttrValue::Int(value) }
}

impl From<bool> for AttrValue {
    fn from(value: bool) -> Self { AttrValue::Bool(value) }
}

impl From<Option<String>> for AttrValue {
    fn from(value: Option<String>) -> Self { value.map_or(AttrValue::Null, AttrValue::Text) }
}
