//! Type trees: source descriptors, node model, runtime values, and the
//! descriptor-to-node builder.
//!
//! Resolution tries each node variant's matcher in a fixed priority order,
//! mirroring how the variants relate: `Optional` is a union wrapper and must
//! be peeled before anything else, date-like leaves must win over plain
//! strings, and the composite matchers come last.

mod descriptor;
mod node;
mod value;

pub use descriptor::SourceType;
pub use node::{ObjectNode, PrimitiveKind, TypeNode};
pub use value::TypedValue;

use crate::error::BuildError;

/// One variant's matcher: `None` means "not my shape, try the next one";
/// `Some(Err(..))` means "my shape, but invalid".
type Matcher = fn(&SourceType, &mut Vec<String>) -> Option<Result<TypeNode, BuildError>>;

static MATCHERS: &[Matcher] = &[
    match_nullable,
    match_date_time,
    match_date,
    match_primitive,
    match_list,
    match_tuple,
    match_dict,
    match_object,
];

/// Resolve a source type descriptor into a type tree.
///
/// Fails with [`BuildError::UnsupportedType`] when no variant matches and
/// with [`BuildError::CircularDependency`] when a named struct references
/// itself, directly or transitively.
pub fn build_tree(source: &SourceType) -> Result<TypeNode, BuildError> {
    let mut in_progress = Vec::new();
    build_tree_with(source, &mut in_progress)
}

fn build_tree_with(
    source: &SourceType,
    in_progress: &mut Vec<String>,
) -> Result<TypeNode, BuildError> {
    for matcher in MATCHERS {
        if let Some(result) = matcher(source, in_progress) {
            return result;
        }
    }
    Err(BuildError::UnsupportedType(source.to_string()))
}

fn match_nullable(
    source: &SourceType,
    in_progress: &mut Vec<String>,
) -> Option<Result<TypeNode, BuildError>> {
    match source {
        SourceType::Optional(inner) => Some(
            build_tree_with(inner, in_progress).map(|node| TypeNode::Nullable(Box::new(node))),
        ),
        _ => None,
    }
}

fn match_date_time(
    source: &SourceType,
    _in_progress: &mut Vec<String>,
) -> Option<Result<TypeNode, BuildError>> {
    matches!(source, SourceType::DateTime).then(|| Ok(TypeNode::DateTime))
}

fn match_date(
    source: &SourceType,
    _in_progress: &mut Vec<String>,
) -> Option<Result<TypeNode, BuildError>> {
    matches!(source, SourceType::Date).then(|| Ok(TypeNode::Date))
}

fn match_primitive(
    source: &SourceType,
    _in_progress: &mut Vec<String>,
) -> Option<Result<TypeNode, BuildError>> {
    let kind = match source {
        SourceType::Str => PrimitiveKind::Str,
        SourceType::Int => PrimitiveKind::Int,
        SourceType::Float => PrimitiveKind::Float,
        SourceType::Bool => PrimitiveKind::Bool,
        _ => return None,
    };
    Some(Ok(TypeNode::Primitive(kind)))
}

fn match_list(
    source: &SourceType,
    in_progress: &mut Vec<String>,
) -> Option<Result<TypeNode, BuildError>> {
    match source {
        SourceType::List(elem) => {
            Some(build_tree_with(elem, in_progress).map(|node| TypeNode::List(Box::new(node))))
        }
        _ => None,
    }
}

fn match_tuple(
    source: &SourceType,
    in_progress: &mut Vec<String>,
) -> Option<Result<TypeNode, BuildError>> {
    match source {
        SourceType::Tuple(elems) => Some(
            elems
                .iter()
                .map(|elem| build_tree_with(elem, in_progress))
                .collect::<Result<Vec<_>, _>>()
                .map(TypeNode::Tuple),
        ),
        _ => None,
    }
}

fn match_dict(
    source: &SourceType,
    in_progress: &mut Vec<String>,
) -> Option<Result<TypeNode, BuildError>> {
    match source {
        SourceType::Dict { key, value } => {
            if **key != SourceType::Str {
                return Some(Err(BuildError::UnsupportedKeyType(key.to_string())));
            }
            Some(build_tree_with(value, in_progress).map(|node| TypeNode::Dict(Box::new(node))))
        }
        _ => None,
    }
}

fn match_object(
    source: &SourceType,
    in_progress: &mut Vec<String>,
) -> Option<Result<TypeNode, BuildError>> {
    match source {
        SourceType::Struct { name, fields } => {
            if in_progress.iter().any(|n| n == name) {
                let mut cycle = in_progress.clone();
                cycle.push(name.clone());
                return Some(Err(BuildError::CircularDependency(cycle)));
            }
            in_progress.push(name.clone());
            let result = fields
                .iter()
                .map(|(field_name, field_type)| {
                    Ok((
                        field_name.clone(),
                        build_tree_with(field_type, in_progress)?,
                    ))
                })
                .collect::<Result<Vec<_>, BuildError>>()
                .map(|fields| {
                    TypeNode::Object(ObjectNode {
                        name: Some(name.clone()),
                        fields,
                    })
                });
            in_progress.pop();
            Some(result)
        }
        _ => None,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_build_tree_primitives() {
        assert_eq!(
            build_tree(&SourceType::Str).unwrap(),
            TypeNode::Primitive(PrimitiveKind::Str)
        );
        assert_eq!(
            build_tree(&SourceType::Float).unwrap(),
            TypeNode::Primitive(PrimitiveKind::Float)
        );
        assert_eq!(build_tree(&SourceType::Date).unwrap(), TypeNode::Date);
        assert_eq!(
            build_tree(&SourceType::DateTime).unwrap(),
            TypeNode::DateTime
        );
    }

    #[test]
    fn test_build_tree_composites() {
        let tree = build_tree(&SourceType::list(SourceType::Int)).unwrap();
        assert_eq!(
            tree,
            TypeNode::List(Box::new(TypeNode::Primitive(PrimitiveKind::Int)))
        );

        let tree = build_tree(&SourceType::optional(SourceType::Str)).unwrap();
        assert_eq!(
            tree,
            TypeNode::Nullable(Box::new(TypeNode::Primitive(PrimitiveKind::Str)))
        );

        let tree = build_tree(&SourceType::dict(SourceType::Bool)).unwrap();
        assert_eq!(
            tree,
            TypeNode::Dict(Box::new(TypeNode::Primitive(PrimitiveKind::Bool)))
        );
    }

    #[test]
    fn test_build_tree_struct_preserves_field_order() {
        let tree = build_tree(&SourceType::strukt(
            "thing",
            vec![
                ("zebra", SourceType::Str),
                ("apple", SourceType::Int),
            ],
        ))
        .unwrap();
        match tree {
            TypeNode::Object(obj) => {
                assert_eq!(obj.name.as_deref(), Some("thing"));
                let names: Vec<&str> = obj.fields.iter().map(|(n, _)| n.as_str()).collect();
                assert_eq!(names, vec!["zebra", "apple"]);
            }
            other => panic!("expected object, got {other:?}"),
        }
    }

    #[test]
    fn test_build_tree_non_string_dict_key_rejected() {
        let source = SourceType::Dict {
            key: Box::new(SourceType::Int),
            value: Box::new(SourceType::Str),
        };
        let err = build_tree(&source).unwrap_err();
        assert!(matches!(err, BuildError::UnsupportedKeyType(key) if key == "int"));
    }

    #[test]
    fn test_build_tree_self_referential_struct_rejected() {
        let source = SourceType::strukt(
            "node",
            vec![(
                "child",
                SourceType::strukt("node", vec![("leaf", SourceType::Int)]),
            )],
        );
        let err = build_tree(&source).unwrap_err();
        assert!(matches!(err, BuildError::CircularDependency(names) if names == vec!["node", "node"]));
    }

    #[test]
    fn test_build_tree_repeated_sibling_struct_allowed() {
        // The same name twice as siblings is not a cycle.
        let point = SourceType::strukt("point", vec![("x", SourceType::Int)]);
        let source = SourceType::strukt(
            "segment",
            vec![("from", point.clone()), ("to", point)],
        );
        assert!(build_tree(&source).is_ok());
    }
}
