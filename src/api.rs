//! Integration surface for the embedding web framework.
//!
//! The framework prepares each handler once at registration time
//! ([`prepare_function`]) and stores the result in a [`PreparedEndpoints`]
//! side table keyed by handler name. At generation time it walks its route
//! table into [`RouteEntry`] values and hands both to [`collect_endpoints`];
//! at serving time it funnels each request through [`adapt_request`], which
//! owns payload decoding and response encoding so the handler itself works
//! on typed values only.

use std::collections::BTreeMap;

use serde_json::Value;
use tracing::{debug, warn};

use crate::client::{ClientBuilder, EndpointDescriptor, HttpMethod};
use crate::error::{BuildError, DecodeError, EncodeError, RequestError};
use crate::types::{build_tree, SourceType, TypeNode, TypedValue};

/// Resolved type information for one handler, computed once ahead of
/// serving traffic.
#[derive(Debug, Clone)]
pub struct FunctionInfo {
    pub return_tree: Option<TypeNode>,
    /// Arguments in declaration order, snake_case names.
    pub arg_trees: Vec<(String, TypeNode)>,
}

impl FunctionInfo {
    /// The body argument: the unique argument not bound from the URL path.
    ///
    /// Returns `None` for body-less endpoints and
    /// [`BuildError::TooManyPayloadArgs`] when more than one argument is
    /// left over.
    pub fn payload_arg(
        &self,
        endpoint: &str,
        path_args: &[String],
    ) -> Result<Option<(String, TypeNode)>, BuildError> {
        let mut unbound = self
            .arg_trees
            .iter()
            .filter(|(name, _)| !path_args.contains(name));
        let first = unbound.next();
        if unbound.next().is_some() {
            return Err(BuildError::TooManyPayloadArgs(endpoint.to_string()));
        }
        Ok(first.map(|(name, node)| (name.clone(), node.clone())))
    }
}

/// Resolve a handler's declared argument and return types into type trees.
pub fn prepare_function(
    args: &[(&str, SourceType)],
    return_type: Option<&SourceType>,
) -> Result<FunctionInfo, BuildError> {
    let return_tree = return_type.map(build_tree).transpose()?;
    let arg_trees = args
        .iter()
        .map(|(name, source)| Ok((name.to_string(), build_tree(source)?)))
        .collect::<Result<Vec<_>, BuildError>>()?;
    Ok(FunctionInfo {
        return_tree,
        arg_trees,
    })
}

/// Side table mapping handler names to their prepared type information.
///
/// Handlers without an entry are plain endpoints: they are skipped at
/// generation time and never routed through [`adapt_request`].
#[derive(Debug, Default)]
pub struct PreparedEndpoints {
    entries: BTreeMap<String, FunctionInfo>,
}

impl PreparedEndpoints {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, handler: &str, info: FunctionInfo) {
        self.entries.insert(handler.to_string(), info);
    }

    pub fn get(&self, handler: &str) -> Option<&FunctionInfo> {
        self.entries.get(handler)
    }

    pub fn contains(&self, handler: &str) -> bool {
        self.entries.contains_key(handler)
    }
}

/// One row of the framework's route table.
#[derive(Debug, Clone)]
pub struct RouteEntry {
    /// Handler name, the key into [`PreparedEndpoints`].
    pub handler: String,
    /// Source module of the handler; selects the output file.
    pub module: String,
    /// Route pattern with `<name>` path parameters.
    pub url_template: String,
    pub path_args: Vec<String>,
    pub method: HttpMethod,
}

/// Compile every prepared route into the builder.
///
/// Routes without prepared info are skipped. When the builder is lenient,
/// per-endpoint failures are logged and skipped; otherwise the first
/// failure aborts the collection.
pub fn collect_endpoints(
    routes: &[RouteEntry],
    prepared: &PreparedEndpoints,
    builder: &mut ClientBuilder,
) -> Result<(), BuildError> {
    for route in routes {
        let Some(info) = prepared.get(&route.handler) else {
            debug!(handler = %route.handler, "skipping route without prepared type information");
            continue;
        };
        let result = info
            .payload_arg(&route.handler, &route.path_args)
            .and_then(|payload| {
                let desc = EndpointDescriptor {
                    name: route.handler.clone(),
                    url_template: route.url_template.clone(),
                    path_args: route.path_args.clone(),
                    method: route.method,
                    return_type: info.return_tree.clone(),
                    payload,
                };
                builder.add_endpoint(&route.module, &desc)
            });
        if let Err(err) = result {
            if builder.is_lenient() {
                warn!(handler = %route.handler, error = %err, "skipping endpoint");
            } else {
                return Err(err);
            }
        }
    }
    Ok(())
}

/// What a handler hands back to the request adapter.
#[derive(Debug)]
pub enum HandlerOutput {
    /// A typed value to encode through the handler's declared return tree.
    Typed(TypedValue),
    /// A pre-built wire value, passed through untouched. The escape hatch
    /// for endpoints whose return type is not declared.
    Raw(Value),
}

/// Run one request through a prepared handler.
///
/// Decodes the request body (when the handler declares one) into a typed
/// value, invokes the handler, and encodes a [`HandlerOutput::Typed`]
/// result through the declared return tree. `bound_args` are the argument
/// names the framework already filled from the URL path.
pub fn adapt_request<F>(
    info: &FunctionInfo,
    bound_args: &[String],
    payload: Option<&Value>,
    handler: F,
) -> Result<Value, RequestError>
where
    F: FnOnce(Option<TypedValue>) -> HandlerOutput,
{
    let payload_slot = info
        .arg_trees
        .iter()
        .find(|(name, _)| !bound_args.contains(name));

    let decoded = match payload_slot {
        None => None,
        Some((name, node)) => match payload {
            Some(wire) => Some(node.decode(wire)?),
            None => return Err(DecodeError::MissingField(name.clone()).into()),
        },
    };

    match handler(decoded) {
        HandlerOutput::Raw(value) => Ok(value),
        HandlerOutput::Typed(value) => match &info.return_tree {
            Some(tree) => Ok(tree.encode(&value)?),
            None => Err(EncodeError::TypeMismatch {
                expected: "raw response",
                found: value.kind(),
            }
            .into()),
        },
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use serde_json::json;

    fn item_info() -> FunctionInfo {
        prepare_function(
            &[
                ("item_id", SourceType::Str),
                (
                    "item",
                    SourceType::strukt(
                        "item",
                        vec![("display_name", SourceType::Str), ("count", SourceType::Int)],
                    ),
                ),
            ],
            Some(&SourceType::strukt(
                "item",
                vec![("display_name", SourceType::Str), ("count", SourceType::Int)],
            )),
        )
        .unwrap()
    }

    #[test]
    fn test_payload_arg_excludes_path_args() {
        let info = item_info();
        let payload = info
            .payload_arg("update_item", &["item_id".to_string()])
            .unwrap();
        assert_eq!(payload.unwrap().0, "item");
    }

    #[test]
    fn test_payload_arg_rejects_two_body_args() {
        let info = item_info();
        let err = info.payload_arg("update_item", &[]).unwrap_err();
        assert!(matches!(err, BuildError::TooManyPayloadArgs(name) if name == "update_item"));
    }

    #[test]
    fn test_collect_endpoints_skips_unprepared() {
        let mut prepared = PreparedEndpoints::new();
        prepared.insert(
            "get_foo",
            prepare_function(&[], Some(&SourceType::strukt("foo", vec![]))).unwrap(),
        );

        let routes = vec![
            RouteEntry {
                handler: "get_foo".to_string(),
                module: "app".to_string(),
                url_template: "/api/foo".to_string(),
                path_args: vec![],
                method: HttpMethod::Get,
            },
            RouteEntry {
                handler: "healthcheck".to_string(),
                module: "app".to_string(),
                url_template: "/health".to_string(),
                path_args: vec![],
                method: HttpMethod::Get,
            },
        ];

        let mut builder = ClientBuilder::new();
        collect_endpoints(&routes, &prepared, &mut builder).unwrap();

        let registry = builder.registry("app").unwrap();
        assert!(registry.contains("getFoo"));
        assert!(!registry.contains("healthcheck"));
    }

    #[test]
    fn test_collect_endpoints_lenient_skips_failures() {
        let mut prepared = PreparedEndpoints::new();
        // Two non-path args cannot be compiled into a single body.
        prepared.insert(
            "broken",
            prepare_function(
                &[("a", SourceType::Int), ("b", SourceType::Int)],
                None,
            )
            .unwrap(),
        );
        prepared.insert("get_ok", prepare_function(&[], None).unwrap());

        let routes = vec![
            RouteEntry {
                handler: "broken".to_string(),
                module: "app".to_string(),
                url_template: "/api/broken".to_string(),
                path_args: vec![],
                method: HttpMethod::Post,
            },
            RouteEntry {
                handler: "get_ok".to_string(),
                module: "app".to_string(),
                url_template: "/api/ok".to_string(),
                path_args: vec![],
                method: HttpMethod::Get,
            },
        ];

        let mut strict = ClientBuilder::new();
        let err = collect_endpoints(&routes, &prepared, &mut strict).unwrap_err();
        assert!(matches!(err, BuildError::TooManyPayloadArgs(_)));

        let mut lenient = ClientBuilder::new().lenient(true);
        collect_endpoints(&routes, &prepared, &mut lenient).unwrap();
        let registry = lenient.registry("app").unwrap();
        assert!(registry.contains("getOk"));
        assert!(!registry.contains("broken"));
    }

    #[test]
    fn test_adapt_request_decodes_body_and_encodes_response() {
        let info = item_info();
        let response = adapt_request(
            &info,
            &["item_id".to_string()],
            Some(&json!({"displayName": "Widget", "count": 3})),
            |payload| {
                let item = payload.unwrap();
                assert_eq!(
                    item.field("display_name"),
                    Some(&TypedValue::Str("Widget".to_string()))
                );
                HandlerOutput::Typed(TypedValue::Object(vec![
                    ("display_name".to_string(), TypedValue::from("Widget")),
                    ("count".to_string(), TypedValue::Int(4)),
                ]))
            },
        )
        .unwrap();
        assert_eq!(response, json!({"displayName": "Widget", "count": 4}));
    }

    #[test]
    fn test_adapt_request_missing_body_is_client_error() {
        let info = item_info();
        let err = adapt_request(&info, &["item_id".to_string()], None, |_| {
            HandlerOutput::Raw(Value::Null)
        })
        .unwrap_err();
        assert!(err.is_client_error());
    }

    #[test]
    fn test_adapt_request_raw_passthrough() {
        let info = prepare_function(&[], None).unwrap();
        let response = adapt_request(&info, &[], None, |payload| {
            assert!(payload.is_none());
            HandlerOutput::Raw(json!({"anything": true}))
        })
        .unwrap();
        assert_eq!(response, json!({"anything": true}));
    }

    #[test]
    fn test_adapt_request_typed_without_return_tree_is_server_error() {
        let info = prepare_function(&[], None).unwrap();
        let err = adapt_request(&info, &[], None, |_| {
            HandlerOutput::Typed(TypedValue::Int(1))
        })
        .unwrap_err();
        assert!(!err.is_client_error());
    }
}
