//! The type-tree node model.
//!
//! A [`TypeNode`] describes how one value type is shaped on the wire and how
//! to convert between wire and typed representations, three ways:
//!
//! - `wire_repr` renders the TypeScript-facing type (registering interface
//!   declarations as a side effect),
//! - `decode`/`encode` convert wire JSON to and from [`TypedValue`] at
//!   request-serving time,
//! - `gen_decode_expr`/`gen_encode_expr` emit the equivalent client-side
//!   conversion expressions.
//!
//! Generated expressions apply an identity short-circuit uniformly: when a
//! nested transform is a no-op, the wrapping expression is suppressed and
//! the source expression is returned unchanged.

use chrono::NaiveDate;
use serde_json::Value;

use crate::error::{BuildError, DecodeError, EncodeError};
use crate::naming::{to_camel, to_pascal};
use crate::snippets::SnippetScope;
use crate::types::value::TypedValue;

const DATE_FORMAT: &str = "%Y-%m-%d";
const DATE_TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

const MAP_OBJECT_HELPER: &str = r#"const _mapObject = <T, U>(o: { [key: string]: T }, f: (t: T) => U) : { [key: string]: U } => {
  const result: { [key: string]: U } = {};
  Object.keys(o).forEach((key) => {
    result[key] = f(o[key]);
  });
  return result;
}"#;

const FORMAT_DATE_TIME_HELPER: &str =
    "const _formatISODateTimeString = (d: Date): string => d.toISOString().split('.')[0] + 'Z';";

const FORMAT_DATE_HELPER: &str =
    "const _formatISODateString = (d: Date): string => d.toISOString().split('T')[0];";

/// JSON-identical leaf kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrimitiveKind {
    Str,
    Int,
    Float,
    Bool,
}

impl PrimitiveKind {
    fn ts_repr(self) -> &'static str {
        match self {
            PrimitiveKind::Str => "string",
            PrimitiveKind::Int | PrimitiveKind::Float => "number",
            PrimitiveKind::Bool => "boolean",
        }
    }
}

/// Named (or anonymous structural) composite node.
///
/// Fields keep declaration order and snake_case server names; conversion to
/// the client convention happens at render/convert time. A node without a
/// name renders inline and never registers a declaration.
#[derive(Debug, Clone, PartialEq)]
pub struct ObjectNode {
    pub name: Option<String>,
    pub fields: Vec<(String, TypeNode)>,
}

/// One node of a type tree.
#[derive(Debug, Clone, PartialEq)]
pub enum TypeNode {
    Primitive(PrimitiveKind),
    Date,
    DateTime,
    List(Box<TypeNode>),
    Tuple(Vec<TypeNode>),
    /// String-keyed mapping; the value node describes the entries.
    Dict(Box<TypeNode>),
    Nullable(Box<TypeNode>),
    Object(ObjectNode),
}

impl TypeNode {
    /// Render the wire/client type representation, registering any interface
    /// declarations this type needs into the scope.
    pub fn wire_repr(&self, ctx: &mut SnippetScope<'_>) -> Result<String, BuildError> {
        match self {
            TypeNode::Primitive(kind) => Ok(kind.ts_repr().to_string()),
            TypeNode::Date | TypeNode::DateTime => Ok("Date".to_string()),
            TypeNode::List(elem) => {
                let inner = elem.wire_repr(ctx)?;
                // A union element needs parens: (Foo | null)[]
                if matches!(**elem, TypeNode::Nullable(_)) {
                    Ok(format!("({inner})[]"))
                } else {
                    Ok(format!("{inner}[]"))
                }
            }
            TypeNode::Tuple(elems) => {
                let parts = elems
                    .iter()
                    .map(|e| e.wire_repr(ctx))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(format!("[{}]", parts.join(", ")))
            }
            TypeNode::Dict(value) => {
                let inner = value.wire_repr(ctx)?;
                Ok(format!("{{ [key: string]: {inner} }}"))
            }
            TypeNode::Nullable(inner) => {
                let inner = inner.wire_repr(ctx)?;
                Ok(format!("{inner} | null"))
            }
            TypeNode::Object(obj) => obj.wire_repr(ctx),
        }
    }

    /// Convert a wire value into a typed value.
    pub fn decode(&self, wire: &Value) -> Result<TypedValue, DecodeError> {
        match self {
            TypeNode::Primitive(PrimitiveKind::Str) => match wire {
                Value::String(s) => Ok(TypedValue::Str(s.clone())),
                other => Err(mismatch("string", other)),
            },
            TypeNode::Primitive(PrimitiveKind::Int) => match wire.as_i64() {
                Some(v) => Ok(TypedValue::Int(v)),
                None => Err(mismatch("integer", wire)),
            },
            TypeNode::Primitive(PrimitiveKind::Float) => match wire.as_f64() {
                Some(v) => Ok(TypedValue::Float(v)),
                None => Err(mismatch("number", wire)),
            },
            TypeNode::Primitive(PrimitiveKind::Bool) => match wire {
                Value::Bool(b) => Ok(TypedValue::Bool(*b)),
                other => Err(mismatch("boolean", other)),
            },
            TypeNode::Date => match wire {
                Value::String(s) => NaiveDate::parse_from_str(s, DATE_FORMAT)
                    .map(TypedValue::Date)
                    .map_err(|_| DecodeError::MalformedDate(s.clone())),
                other => Err(mismatch("date string", other)),
            },
            TypeNode::DateTime => match wire {
                Value::String(s) => chrono::NaiveDateTime::parse_from_str(s, DATE_TIME_FORMAT)
                    .map(|dt| TypedValue::DateTime(dt.and_utc()))
                    .map_err(|_| DecodeError::MalformedDate(s.clone())),
                other => Err(mismatch("datetime string", other)),
            },
            TypeNode::List(elem) => match wire {
                Value::Array(items) => items
                    .iter()
                    .map(|item| elem.decode(item))
                    .collect::<Result<Vec<_>, _>>()
                    .map(TypedValue::List),
                other => Err(mismatch("array", other)),
            },
            TypeNode::Tuple(elems) => match wire {
                Value::Array(items) => {
                    if items.len() != elems.len() {
                        return Err(DecodeError::TupleArity {
                            expected: elems.len(),
                            found: items.len(),
                        });
                    }
                    elems
                        .iter()
                        .zip(items)
                        .map(|(node, item)| node.decode(item))
                        .collect::<Result<Vec<_>, _>>()
                        .map(TypedValue::Tuple)
                }
                other => Err(mismatch("array", other)),
            },
            TypeNode::Dict(value) => match wire {
                Value::Object(entries) => entries
                    .iter()
                    .map(|(key, item)| Ok((key.clone(), value.decode(item)?)))
                    .collect::<Result<Vec<_>, _>>()
                    .map(TypedValue::Dict),
                other => Err(mismatch("object", other)),
            },
            TypeNode::Nullable(inner) => match wire {
                Value::Null => Ok(TypedValue::Null),
                other => inner.decode(other),
            },
            TypeNode::Object(obj) => match wire {
                Value::Object(entries) => {
                    let mut fields = Vec::with_capacity(obj.fields.len());
                    for (name, node) in &obj.fields {
                        let wire_name = to_camel(name);
                        let item = entries
                            .get(&wire_name)
                            .ok_or_else(|| DecodeError::MissingField(wire_name.clone()))?;
                        fields.push((name.clone(), node.decode(item)?));
                    }
                    Ok(TypedValue::Object(fields))
                }
                other => Err(mismatch("object", other)),
            },
        }
    }

    /// Convert a typed value into its wire representation.
    pub fn encode(&self, value: &TypedValue) -> Result<Value, EncodeError> {
        match (self, value) {
            (TypeNode::Primitive(PrimitiveKind::Str), TypedValue::Str(s)) => {
                Ok(Value::String(s.clone()))
            }
            (TypeNode::Primitive(PrimitiveKind::Int), TypedValue::Int(v)) => Ok(Value::from(*v)),
            (TypeNode::Primitive(PrimitiveKind::Float), TypedValue::Float(v)) => {
                serde_json::Number::from_f64(*v)
                    .map(Value::Number)
                    .ok_or(EncodeError::NonFiniteFloat)
            }
            // Integer-valued floats are fine on the wire.
            (TypeNode::Primitive(PrimitiveKind::Float), TypedValue::Int(v)) => Ok(Value::from(*v)),
            (TypeNode::Primitive(PrimitiveKind::Bool), TypedValue::Bool(b)) => {
                Ok(Value::Bool(*b))
            }
            (TypeNode::Date, TypedValue::Date(d)) => {
                Ok(Value::String(d.format(DATE_FORMAT).to_string()))
            }
            (TypeNode::DateTime, TypedValue::DateTime(dt)) => {
                Ok(Value::String(dt.format(DATE_TIME_FORMAT).to_string()))
            }
            (TypeNode::List(elem), TypedValue::List(items)) => items
                .iter()
                .map(|item| elem.encode(item))
                .collect::<Result<Vec<_>, _>>()
                .map(Value::Array),
            (TypeNode::Tuple(elems), TypedValue::Tuple(items)) => {
                if items.len() != elems.len() {
                    return Err(EncodeError::TypeMismatch {
                        expected: "tuple of matching arity",
                        found: "tuple",
                    });
                }
                elems
                    .iter()
                    .zip(items)
                    .map(|(node, item)| node.encode(item))
                    .collect::<Result<Vec<_>, _>>()
                    .map(Value::Array)
            }
            (TypeNode::Dict(value_node), TypedValue::Dict(entries)) => {
                let mut map = serde_json::Map::with_capacity(entries.len());
                for (key, item) in entries {
                    map.insert(key.clone(), value_node.encode(item)?);
                }
                Ok(Value::Object(map))
            }
            (TypeNode::Nullable(_), TypedValue::Null) => Ok(Value::Null),
            (TypeNode::Nullable(inner), other) => inner.encode(other),
            (TypeNode::Object(obj), TypedValue::Object(_)) => {
                let mut map = serde_json::Map::with_capacity(obj.fields.len());
                for (name, node) in &obj.fields {
                    let field = value
                        .field(name)
                        .ok_or_else(|| EncodeError::MissingField(name.clone()))?;
                    map.insert(to_camel(name), node.encode(field)?);
                }
                Ok(Value::Object(map))
            }
            (node, other) => Err(EncodeError::TypeMismatch {
                expected: node.kind(),
                found: other.kind(),
            }),
        }
    }

    /// Client-side source text turning a wire-shaped expression into its
    /// typed client representation. Returns `source` unchanged when nothing
    /// needs transforming.
    pub fn gen_decode_expr(
        &self,
        ctx: &mut SnippetScope<'_>,
        source: &str,
    ) -> Result<String, BuildError> {
        match self {
            TypeNode::Primitive(_) => Ok(source.to_string()),
            TypeNode::Date | TypeNode::DateTime => Ok(format!("new Date({source})")),
            TypeNode::List(elem) => {
                let sub = elem.gen_decode_expr(ctx, "item")?;
                if sub == "item" {
                    Ok(source.to_string())
                } else {
                    Ok(format!("{source}.map(item => ({sub}))"))
                }
            }
            TypeNode::Tuple(elems) => gen_tuple_expr(elems, ctx, source, Direction::Decode),
            TypeNode::Dict(value) => {
                let sub = value.gen_decode_expr(ctx, "val")?;
                if sub == "val" {
                    Ok(source.to_string())
                } else {
                    ctx.add("_mapObject", MAP_OBJECT_HELPER)?;
                    Ok(format!("_mapObject({source}, val => ({sub}))"))
                }
            }
            TypeNode::Nullable(inner) => {
                let sub = inner.gen_decode_expr(ctx, source)?;
                if sub == source {
                    Ok(sub)
                } else {
                    Ok(format!("({source} === null ? null : {sub})"))
                }
            }
            TypeNode::Object(obj) => gen_object_expr(obj, ctx, source, Direction::Decode),
        }
    }

    /// Client-side source text turning a typed expression into its wire
    /// representation. Inverse of [`TypeNode::gen_decode_expr`].
    pub fn gen_encode_expr(
        &self,
        ctx: &mut SnippetScope<'_>,
        source: &str,
    ) -> Result<String, BuildError> {
        match self {
            TypeNode::Primitive(_) => Ok(source.to_string()),
            TypeNode::Date => {
                ctx.add("_formatISODateString", FORMAT_DATE_HELPER)?;
                Ok(format!("_formatISODateString({source})"))
            }
            TypeNode::DateTime => {
                ctx.add("_formatISODateTimeString", FORMAT_DATE_TIME_HELPER)?;
                Ok(format!("_formatISODateTimeString({source})"))
            }
            TypeNode::List(elem) => {
                let sub = elem.gen_encode_expr(ctx, "item")?;
                if sub == "item" {
                    Ok(source.to_string())
                } else {
                    Ok(format!("{source}.map(item => ({sub}))"))
                }
            }
            TypeNode::Tuple(elems) => gen_tuple_expr(elems, ctx, source, Direction::Encode),
            TypeNode::Dict(value) => {
                let sub = value.gen_encode_expr(ctx, "val")?;
                if sub == "val" {
                    Ok(source.to_string())
                } else {
                    ctx.add("_mapObject", MAP_OBJECT_HELPER)?;
                    Ok(format!("_mapObject({source}, val => ({sub}))"))
                }
            }
            TypeNode::Nullable(inner) => {
                let sub = inner.gen_encode_expr(ctx, source)?;
                if sub == source {
                    Ok(sub)
                } else {
                    Ok(format!("({source} === null ? null : {sub})"))
                }
            }
            TypeNode::Object(obj) => gen_object_expr(obj, ctx, source, Direction::Encode),
        }
    }

    /// The shape actually transmitted on the wire.
    ///
    /// Identical to the node itself except that date-like leaves become
    /// string primitives and objects lose their declared name (the DTO is a
    /// structural type, never a constructible domain object).
    pub fn dto_node(&self) -> TypeNode {
        match self {
            TypeNode::Primitive(kind) => TypeNode::Primitive(*kind),
            TypeNode::Date | TypeNode::DateTime => TypeNode::Primitive(PrimitiveKind::Str),
            TypeNode::List(elem) => TypeNode::List(Box::new(elem.dto_node())),
            TypeNode::Tuple(elems) => {
                TypeNode::Tuple(elems.iter().map(TypeNode::dto_node).collect())
            }
            TypeNode::Dict(value) => TypeNode::Dict(Box::new(value.dto_node())),
            TypeNode::Nullable(inner) => TypeNode::Nullable(Box::new(inner.dto_node())),
            TypeNode::Object(obj) => TypeNode::Object(ObjectNode {
                name: None,
                fields: obj
                    .fields
                    .iter()
                    .map(|(name, node)| (name.clone(), node.dto_node()))
                    .collect(),
            }),
        }
    }

    /// Short kind name for error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            TypeNode::Primitive(PrimitiveKind::Str) => "string",
            TypeNode::Primitive(PrimitiveKind::Int) => "integer",
            TypeNode::Primitive(PrimitiveKind::Float) => "float",
            TypeNode::Primitive(PrimitiveKind::Bool) => "boolean",
            TypeNode::Date => "date",
            TypeNode::DateTime => "datetime",
            TypeNode::List(_) => "list",
            TypeNode::Tuple(_) => "tuple",
            TypeNode::Dict(_) => "dict",
            TypeNode::Nullable(_) => "nullable",
            TypeNode::Object(_) => "object",
        }
    }
}

impl ObjectNode {
    fn wire_repr(&self, ctx: &mut SnippetScope<'_>) -> Result<String, BuildError> {
        match &self.name {
            Some(name) => {
                let interface_name = to_pascal(name);
                let code = self.render_interface(&interface_name, ctx)?;
                // Re-adding an identical declaration is a no-op; a different
                // one under the same name is a naming collision.
                ctx.add(&interface_name, &code)?;
                Ok(interface_name)
            }
            None => {
                let mut parts = Vec::with_capacity(self.fields.len());
                for (field_name, node) in &self.fields {
                    let field_type = node.wire_repr(ctx)?;
                    parts.push(format!("{}: {}", to_camel(field_name), field_type));
                }
                if parts.is_empty() {
                    Ok("{}".to_string())
                } else {
                    Ok(format!("{{ {} }}", parts.join("; ")))
                }
            }
        }
    }

    fn render_interface(
        &self,
        interface_name: &str,
        ctx: &mut SnippetScope<'_>,
    ) -> Result<String, BuildError> {
        let mut sub = ctx.nested(interface_name);
        let mut code = format!("interface {interface_name} {{\n");
        for (field_name, node) in &self.fields {
            let field_type = node.wire_repr(&mut sub)?;
            code.push_str(&format!("  {}: {};\n", to_camel(field_name), field_type));
        }
        code.push('}');
        Ok(code)
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn mismatch(expected: &'static str, found: &Value) -> DecodeError {
    DecodeError::TypeMismatch {
        expected,
        found: json_kind(found).to_string(),
    }
}

#[derive(Clone, Copy)]
enum Direction {
    Decode,
    Encode,
}

fn gen_sub_expr(
    node: &TypeNode,
    ctx: &mut SnippetScope<'_>,
    source: &str,
    direction: Direction,
) -> Result<String, BuildError> {
    match direction {
        Direction::Decode => node.gen_decode_expr(ctx, source),
        Direction::Encode => node.gen_encode_expr(ctx, source),
    }
}

fn gen_tuple_expr(
    elems: &[TypeNode],
    ctx: &mut SnippetScope<'_>,
    source: &str,
    direction: Direction,
) -> Result<String, BuildError> {
    let mut subs = Vec::with_capacity(elems.len());
    let mut any_transformed = false;
    for (i, node) in elems.iter().enumerate() {
        let elem_ref = format!("{source}[{i}]");
        let sub = gen_sub_expr(node, ctx, &elem_ref, direction)?;
        any_transformed |= sub != elem_ref;
        subs.push(sub);
    }
    if any_transformed {
        Ok(format!("[{}]", subs.join(", ")))
    } else {
        Ok(source.to_string())
    }
}

/// Object expression generation with the three-way short-circuit: identity
/// when no field transforms, a full literal when all do, and
/// spread-plus-override when only some do.
fn gen_object_expr(
    obj: &ObjectNode,
    ctx: &mut SnippetScope<'_>,
    source: &str,
    direction: Direction,
) -> Result<String, BuildError> {
    let mut rendered = Vec::with_capacity(obj.fields.len());
    let mut transformed = 0usize;
    for (field_name, node) in &obj.fields {
        let ts_name = to_camel(field_name);
        let field_ref = format!("{source}.{ts_name}");
        let sub = gen_sub_expr(node, ctx, &field_ref, direction)?;
        let changed = sub != field_ref;
        transformed += usize::from(changed);
        rendered.push((ts_name, sub, changed));
    }

    if transformed == 0 {
        return Ok(source.to_string());
    }
    if transformed == rendered.len() {
        let parts: Vec<String> = rendered
            .into_iter()
            .map(|(name, expr, _)| format!("{name}: {expr}"))
            .collect();
        return Ok(format!("{{{}}}", parts.join(", ")));
    }
    let overrides: Vec<String> = rendered
        .into_iter()
        .filter(|(_, _, changed)| *changed)
        .map(|(name, expr, _)| format!("{name}: {expr}"))
        .collect();
    Ok(format!("{{...{source}, {}}}", overrides.join(", ")))
}
