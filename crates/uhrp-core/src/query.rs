//! Lookup queries
//!
//! Callers send loosely shaped JSON. It is parsed once into [`LookupQuery`];
//! shapes that are well formed but not understood become
//! [`LookupQuery::Other`] and match nothing.

use serde_json::{Value, json};

/// A parsed lookup query
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LookupQuery {
    /// `"all"`: every live commitment
    All,
    /// `"active"`: commitments whose expiry is still in the future
    Active,
    /// `{"type": "byUrl", "value": ..}`: exact URL match
    ByUrl(String),
    /// `{"type": "byHashHex", "value": ..}`: case-insensitive hash match
    ByHashHex(String),
    /// Anything else
    Other,
}

/// True for the values a JavaScript caller would treat as "no query"
fn is_missing(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::String(s) => s.is_empty(),
        Value::Array(_) | Value::Object(_) => false,
    }
}

impl LookupQuery {
    /// Parse a caller-supplied query
    ///
    /// Returns `None` when no usable query was given at all.
    pub fn parse(query: Option<&Value>) -> Option<Self> {
        let value = query.filter(|v| !is_missing(v))?;
        Some(Self::from_json(value))
    }

    /// Interpret a present query value
    pub fn from_json(value: &Value) -> Self {
        match value {
            Value::String(s) if s == "all" => Self::All,
            Value::String(s) if s == "active" => Self::Active,
            Value::Object(map) => {
                let kind = map.get("type").and_then(Value::as_str);
                let value = map.get("value").and_then(Value::as_str);
                match (kind, value) {
                    (Some("byUrl"), Some(url)) => Self::ByUrl(url.to_string()),
                    (Some("byHashHex"), Some(hash)) => Self::ByHashHex(hash.to_string()),
                    _ => Self::Other,
                }
            }
            _ => Self::Other,
        }
    }

    /// The JSON form of this query; `Other` has none
    pub fn to_json(&self) -> Option<Value> {
        match self {
            Self::All => Some(json!("all")),
            Self::Active => Some(json!("active")),
            Self::ByUrl(url) => Some(json!({ "type": "byUrl", "value": url })),
            Self::ByHashHex(hash) => Some(json!({ "type": "byHashHex", "value": hash })),
            Self::Other => None,
        }
    }
}
