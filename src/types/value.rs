//! Runtime typed values.
//!
//! [`TypedValue`] is the in-memory shape handlers consume and produce. The
//! wire shape is plain `serde_json::Value`; conversion between the two is
//! driven by a type tree (`TypeNode::decode` / `TypeNode::encode`), which is
//! where field-name case conversion and date formatting happen.

use chrono::{DateTime, NaiveDate, Utc};

/// A richly-typed in-memory value, mirroring one type-tree node shape.
#[derive(Debug, Clone, PartialEq)]
pub enum TypedValue {
    /// Explicit absence; only valid under a nullable node.
    Null,
    Str(String),
    Int(i64),
    Float(f64),
    Bool(bool),
    Date(NaiveDate),
    DateTime(DateTime<Utc>),
    List(Vec<TypedValue>),
    Tuple(Vec<TypedValue>),
    /// String-keyed mapping; keys are never case-converted.
    Dict(Vec<(String, TypedValue)>),
    /// Named composite with fields in declaration order, snake_case names.
    Object(Vec<(String, TypedValue)>),
}

impl TypedValue {
    /// Short kind name for error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            TypedValue::Null => "null",
            TypedValue::Str(_) => "string",
            TypedValue::Int(_) => "integer",
            TypedValue::Float(_) => "float",
            TypedValue::Bool(_) => "boolean",
            TypedValue::Date(_) => "date",
            TypedValue::DateTime(_) => "datetime",
            TypedValue::List(_) => "list",
            TypedValue::Tuple(_) => "tuple",
            TypedValue::Dict(_) => "dict",
            TypedValue::Object(_) => "object",
        }
    }

    /// Look up an object field by its snake_case name.
    pub fn field(&self, name: &str) -> Option<&TypedValue> {
        match self {
            TypedValue::Object(fields) => fields
                .iter()
                .find(|(field_name, _)| field_name == name)
                .map(|(_, value)| value),
            _ => None,
        }
    }
}

impl From<&str> for TypedValue {
    fn from(s: &str) -> Self {
        TypedValue::Str(s.to_string())
    }
}

impl From<i64> for TypedValue {
    fn from(v: i64) -> Self {
        TypedValue::Int(v)
    }
}

impl From<bool> for TypedValue {
    fn from(v: bool) -> Self {
        TypedValue::Bool(v)
    }
}
