//! Source-level type descriptors.
//!
//! The framework layer describes each handler's argument and return types
//! with a [`SourceType`] value. Descriptors are resolved into type-tree
//! nodes once, ahead of serving traffic; nothing in the crate inspects
//! Rust types at runtime.

use std::fmt;

/// Description of a server-side value type, as declared at the endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceType {
    Str,
    Int,
    Float,
    Bool,
    Date,
    DateTime,
    List(Box<SourceType>),
    Tuple(Vec<SourceType>),
    Dict {
        key: Box<SourceType>,
        value: Box<SourceType>,
    },
    /// A two-armed union with an explicit "absent" arm.
    Optional(Box<SourceType>),
    /// Named composite with ordered fields.
    Struct {
        name: String,
        fields: Vec<(String, SourceType)>,
    },
}

impl fmt::Display for SourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceType::Str => write!(f, "str"),
            SourceType::Int => write!(f, "int"),
            SourceType::Float => write!(f, "float"),
            SourceType::Bool => write!(f, "bool"),
            SourceType::Date => write!(f, "date"),
            SourceType::DateTime => write!(f, "datetime"),
            SourceType::List(elem) => write!(f, "list[{elem}]"),
            SourceType::Tuple(elems) => {
                write!(f, "tuple[")?;
                for (i, elem) in elems.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{elem}")?;
                }
                write!(f, "]")
            }
            SourceType::Dict { key, value } => write!(f, "dict[{key}, {value}]"),
            SourceType::Optional(inner) => write!(f, "{inner} | None"),
            SourceType::Struct { name, .. } => write!(f, "{name}"),
        }
    }
}

impl SourceType {
    /// Convenience constructor for a list descriptor.
    pub fn list(elem: SourceType) -> SourceType {
        SourceType::List(Box::new(elem))
    }

    /// Convenience constructor for a string-keyed dict descriptor.
    pub fn dict(value: SourceType) -> SourceType {
        SourceType::Dict {
            key: Box::new(SourceType::Str),
            value: Box::new(value),
        }
    }

    /// Convenience constructor for an optional descriptor.
    pub fn optional(inner: SourceType) -> SourceType {
        SourceType::Optional(Box::new(inner))
    }

    /// Convenience constructor for a named struct descriptor.
    pub fn strukt(name: &str, fields: Vec<(&str, SourceType)>) -> SourceType {
        SourceType::Struct {
            name: name.to_string(),
            fields: fields
                .into_iter()
                .map(|(n, t)| (n.to_string(), t))
                .collect(),
        }
    }
}
