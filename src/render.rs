//! Output renderers: turn a compiled accessor description into TypeScript
//! source text.
//!
//! The [`AccessorRenderer`] trait is the seam for alternative HTTP client
//! libraries; [`FetchRenderer`] targets the browser `fetch` API and is the
//! default.

use std::fmt::Write as _;

use crate::error::BuildError;
use crate::snippets::SnippetScope;

const API_ERROR_SNIPPET: &str = r#"export class ApiError extends Error {
  constructor(public message: string, public response: Response) {
    super(message);
    // https://github.com/Microsoft/TypeScript/wiki/FAQ#why-doesnt-extending-built-ins-like-error-array-and-map-work
    Object.setPrototypeOf(this, ApiError.prototype);
  }
}"#;

/// Everything a renderer needs to emit one accessor function.
///
/// All type names and expressions are already rendered TypeScript text;
/// the URL already has its path parameters substituted.
#[derive(Debug)]
pub struct AccessorParams<'a> {
    /// camelCase accessor name.
    pub name: &'a str,
    /// Argument list in declaration order: (camelCase name, TS type).
    pub args: &'a [(String, String)],
    /// Upper-case HTTP verb.
    pub method: &'a str,
    /// URL with `${arg}` interpolations in place.
    pub url: &'a str,
    /// Client-facing return type; `"void"` when the endpoint returns nothing.
    pub return_type: &'a str,
    /// Structural type of the raw response body, when a decode step exists.
    pub response_dto_type: Option<&'a str>,
    /// Expression over `dto` producing the return value; `None` for void.
    pub return_expr: Option<&'a str>,
    /// Expression producing the request body, when the endpoint takes one.
    pub payload_expr: Option<&'a str>,
}

/// Renders one accessor function body for a particular HTTP client flavor.
///
/// Implementations register their support snippets (error classes, shared
/// helpers) through `ctx`, which is scoped to the accessor being rendered,
/// and return the accessor source text.
pub trait AccessorRenderer {
    fn render(
        &self,
        ctx: &mut SnippetScope<'_>,
        params: &AccessorParams<'_>,
    ) -> Result<String, BuildError>;
}

/// Renderer targeting the standard `fetch` API. Failed responses are raised
/// as an `ApiError` carrying the raw `Response`.
#[derive(Debug, Default)]
pub struct FetchRenderer;

impl AccessorRenderer for FetchRenderer {
    fn render(
        &self,
        ctx: &mut SnippetScope<'_>,
        params: &AccessorParams<'_>,
    ) -> Result<String, BuildError> {
        ctx.add("ApiError", API_ERROR_SNIPPET)?;

        let arg_list = params
            .args
            .iter()
            .map(|(name, ty)| format!("{name}: {ty}"))
            .collect::<Vec<_>>()
            .join(", ");

        let mut code = String::new();
        let _ = writeln!(
            code,
            "export async function {}({arg_list}): Promise<{}> {{",
            params.name, params.return_type
        );
        let _ = writeln!(code, "  const response = await fetch(`{}`, {{", params.url);
        if let Some(payload) = params.payload_expr {
            let _ = writeln!(code, "    method: \"{}\",", params.method);
            code.push_str("    headers: {\n");
            code.push_str("      \"Content-Type\": \"application/json\"\n");
            code.push_str("    },\n");
            let _ = writeln!(code, "    body: JSON.stringify({payload}),");
        } else {
            let _ = writeln!(code, "    method: \"{}\"", params.method);
        }
        code.push_str("  });\n");
        code.push_str("  if (!response.ok) {\n");
        code.push_str("    throw new ApiError(\"HTTP status code: \" + response.status, response);\n");
        code.push_str("  }\n");
        match params.return_expr {
            None => {}
            Some("dto") => {
                code.push_str("  return await response.json();\n");
            }
            Some(expr) => {
                let dto_type = params.response_dto_type.unwrap_or("unknown");
                let _ = writeln!(code, "  const dto: {dto_type} = await response.json();");
                let _ = writeln!(code, "  return {expr};");
            }
        }
        code.push('}');
        Ok(code)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::snippets::SnippetRegistry;

    fn render(params: &AccessorParams<'_>) -> (SnippetRegistry, String) {
        let mut registry = SnippetRegistry::new();
        let code = {
            let mut scope = registry.scope();
            let mut ctx = scope.nested(params.name);
            FetchRenderer.render(&mut ctx, params).unwrap()
        };
        (registry, code)
    }

    #[test]
    fn test_get_without_body_or_transform() {
        let (registry, code) = render(&AccessorParams {
            name: "getFoo",
            args: &[("myId".to_string(), "string".to_string())],
            method: "GET",
            url: "/api/foo/${myId}",
            return_type: "Foo",
            response_dto_type: Some("Foo"),
            return_expr: Some("dto"),
            payload_expr: None,
        });
        assert_eq!(
            code,
            "export async function getFoo(myId: string): Promise<Foo> {\n\
             \x20 const response = await fetch(`/api/foo/${myId}`, {\n\
             \x20   method: \"GET\"\n\
             \x20 });\n\
             \x20 if (!response.ok) {\n\
             \x20   throw new ApiError(\"HTTP status code: \" + response.status, response);\n\
             \x20 }\n\
             \x20 return await response.json();\n\
             }"
        );
        assert!(registry.contains("ApiError"));
    }

    #[test]
    fn test_post_with_body() {
        let (_, code) = render(&AccessorParams {
            name: "createBar",
            args: &[("bar".to_string(), "Bar".to_string())],
            method: "POST",
            url: "/api/bar",
            return_type: "void",
            response_dto_type: None,
            return_expr: None,
            payload_expr: Some("bar"),
        });
        assert!(code.contains("    method: \"POST\",\n"));
        assert!(code.contains(
            "    headers: {\n      \"Content-Type\": \"application/json\"\n    },\n"
        ));
        assert!(code.contains("    body: JSON.stringify(bar),\n"));
        // Void endpoints fall through without touching the response body.
        assert!(!code.contains("response.json()"));
    }

    #[test]
    fn test_return_with_decode_step() {
        let (_, code) = render(&AccessorParams {
            name: "getWhen",
            args: &[],
            method: "GET",
            url: "/api/when",
            return_type: "Date",
            response_dto_type: Some("string"),
            return_expr: Some("new Date(dto)"),
            payload_expr: None,
        });
        assert!(code.contains("  const dto: string = await response.json();\n"));
        assert!(code.contains("  return new Date(dto);\n"));
    }

    #[test]
    fn test_api_error_becomes_accessor_dependency() {
        let (registry, _) = render(&AccessorParams {
            name: "getFoo",
            args: &[],
            method: "GET",
            url: "/api/foo",
            return_type: "void",
            response_dto_type: None,
            return_expr: None,
            payload_expr: None,
        });
        // ApiError is owned by the accessor, so it is not a root.
        assert!(!registry.top_level_snippets().contains("ApiError"));
    }
}
