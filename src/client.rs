//! Endpoint compilation and client assembly.
//!
//! [`compile_endpoint`] turns one endpoint description into an accessor
//! function plus whatever interface and helper snippets it needs, all
//! registered into a per-module [`SnippetRegistry`]. [`ClientBuilder`]
//! accumulates endpoints across modules and serializes each module's
//! registry into one generated TypeScript file.

use std::collections::BTreeMap;

use tracing::{debug, info};

use crate::error::BuildError;
use crate::naming::to_camel;
use crate::render::{AccessorParams, AccessorRenderer, FetchRenderer};
use crate::snippets::SnippetRegistry;
use crate::types::TypeNode;

const FILE_HEADER: &str = "// Generated source code - do not modify this file\n";

/// HTTP verbs the generated accessors can issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl HttpMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Delete => "DELETE",
        }
    }
}

/// One endpoint, fully resolved and ready to compile.
///
/// `url_template` uses `<name>` placeholders for path parameters, matching
/// the server-side route syntax; every placeholder name must appear in
/// `path_args`. At most one non-path argument (the request body) is allowed
/// and it arrives here already singled out.
#[derive(Debug, Clone)]
pub struct EndpointDescriptor {
    /// snake_case handler name; the accessor name is its camelCase form.
    pub name: String,
    pub url_template: String,
    pub path_args: Vec<String>,
    pub method: HttpMethod,
    pub return_type: Option<TypeNode>,
    pub payload: Option<(String, TypeNode)>,
}

/// Compile one endpoint into the registry and return the accessor name.
///
/// Path parameters become string-typed leading arguments with `${...}`
/// interpolations substituted into the URL. Types referenced by the return
/// value and payload are rendered through a scope owned by the accessor, so
/// their declarations sort before it in the generated file.
pub fn compile_endpoint(
    desc: &EndpointDescriptor,
    registry: &mut SnippetRegistry,
    renderer: &dyn AccessorRenderer,
) -> Result<String, BuildError> {
    let accessor = to_camel(&desc.name);
    debug!(endpoint = %desc.name, accessor = %accessor, "compiling endpoint");

    let mut url = desc.url_template.clone();
    let mut args: Vec<(String, String)> = Vec::new();
    for arg in &desc.path_args {
        let camel = to_camel(arg);
        url = url.replace(&format!("<{arg}>"), &format!("${{{camel}}}"));
        args.push((camel, "string".to_string()));
    }

    let mut scope = registry.scope();
    let mut ctx = scope.nested(&accessor);

    let (return_type, return_expr, dto_type) = match &desc.return_type {
        None => ("void".to_string(), None, None),
        Some(node) => {
            let ty = node.wire_repr(&mut ctx)?;
            let expr = node.gen_decode_expr(&mut ctx, "dto")?;
            let dto = node.dto_node().wire_repr(&mut ctx)?;
            (ty, Some(expr), Some(dto))
        }
    };

    let payload_expr = match &desc.payload {
        None => None,
        Some((name, node)) => {
            let camel = to_camel(name);
            let ty = node.wire_repr(&mut ctx)?;
            let expr = node.gen_encode_expr(&mut ctx, &camel)?;
            args.push((camel, ty));
            Some(expr)
        }
    };

    let params = AccessorParams {
        name: &accessor,
        args: &args,
        method: desc.method.as_str(),
        url: &url,
        return_type: &return_type,
        response_dto_type: dto_type.as_deref(),
        return_expr: return_expr.as_deref(),
        payload_expr: payload_expr.as_deref(),
    };
    let code = renderer.render(&mut ctx, &params)?;
    drop(ctx);
    scope.add(&accessor, &code)?;
    Ok(accessor)
}

/// Accumulates compiled endpoints, one snippet registry per source module,
/// and serializes them into generated TypeScript files.
pub struct ClientBuilder {
    modules: BTreeMap<String, SnippetRegistry>,
    renderer: Box<dyn AccessorRenderer>,
    lenient: bool,
}

impl std::fmt::Debug for ClientBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientBuilder")
            .field("modules", &self.modules)
            .field("lenient", &self.lenient)
            .finish_non_exhaustive()
    }
}

impl Default for ClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ClientBuilder {
    pub fn new() -> Self {
        Self::with_renderer(Box::new(FetchRenderer))
    }

    /// Build clients with an alternative output renderer.
    pub fn with_renderer(renderer: Box<dyn AccessorRenderer>) -> Self {
        Self {
            modules: BTreeMap::new(),
            renderer,
            lenient: false,
        }
    }

    /// In lenient mode endpoints that fail to compile are logged and
    /// skipped instead of aborting the whole build.
    pub fn lenient(mut self, lenient: bool) -> Self {
        self.lenient = lenient;
        self
    }

    /// Compile one endpoint into the registry of `module`.
    pub fn add_endpoint(
        &mut self,
        module: &str,
        desc: &EndpointDescriptor,
    ) -> Result<String, BuildError> {
        let registry = self.modules.entry(module.to_string()).or_default();
        compile_endpoint(desc, registry, self.renderer.as_ref())
    }

    pub fn is_lenient(&self) -> bool {
        self.lenient
    }

    /// Registry backing `module`, if any endpoint has been added to it.
    pub fn registry(&self, module: &str) -> Option<&SnippetRegistry> {
        self.modules.get(module)
    }

    /// Serialize every module into its generated file.
    ///
    /// Keys are relative file paths (module dots become directory
    /// separators); values are complete file contents ending in a newline.
    pub fn files(&self) -> Result<BTreeMap<String, String>, BuildError> {
        let mut out = BTreeMap::new();
        for (module, registry) in &self.modules {
            let mut content = String::from(FILE_HEADER);
            for name in registry.natural_order()? {
                content.push('\n');
                if let Some(code) = registry.get(&name) {
                    content.push_str(code);
                }
                content.push('\n');
            }
            let path = format!("{}.ts", module.replace('.', "/"));
            info!(module = %module, path = %path, "generated client module");
            out.insert(path, content);
        }
        Ok(out)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::types::{build_tree, SourceType};

    #[test]
    fn test_compile_get_endpoint() {
        let mut registry = SnippetRegistry::new();
        let desc = EndpointDescriptor {
            name: "get_foo".to_string(),
            url_template: "/api/foo/<my_id>".to_string(),
            path_args: vec!["my_id".to_string()],
            method: HttpMethod::Get,
            return_type: Some(build_tree(&SourceType::strukt("foo", vec![])).unwrap()),
            payload: None,
        };
        let accessor = compile_endpoint(&desc, &mut registry, &FetchRenderer).unwrap();
        assert_eq!(accessor, "getFoo");

        let code = registry.get("getFoo").unwrap();
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
        assert_eq!(
            registry.natural_order().unwrap(),
            vec!["ApiError", "Foo", "getFoo"]
        );
    }

    #[test]
    fn test_compile_post_endpoint_with_payload() {
        let mut registry = SnippetRegistry::new();
        let desc = EndpointDescriptor {
            name: "create_bar".to_string(),
            url_template: "/api/bar".to_string(),
            path_args: vec![],
            method: HttpMethod::Post,
            return_type: None,
            payload: Some((
                "bar".to_string(),
                build_tree(&SourceType::strukt(
                    "bar",
                    vec![("first_name", SourceType::Str)],
                ))
                .unwrap(),
            )),
        };
        compile_endpoint(&desc, &mut registry, &FetchRenderer).unwrap();

        let code = registry.get("createBar").unwrap();
        assert!(code.starts_with("export async function createBar(bar: Bar): Promise<void> {"));
        assert!(code.contains("body: JSON.stringify(bar),"));
        assert_eq!(
            registry.get("Bar").unwrap(),
            "interface Bar {\n  firstName: string;\n}"
        );
        assert_eq!(
            registry.natural_order().unwrap(),
            vec!["ApiError", "Bar", "createBar"]
        );
    }

    #[test]
    fn test_compile_date_return_adds_decode_step() {
        let mut registry = SnippetRegistry::new();
        let desc = EndpointDescriptor {
            name: "get_when".to_string(),
            url_template: "/api/when".to_string(),
            path_args: vec![],
            method: HttpMethod::Get,
            return_type: Some(TypeNode::DateTime),
            payload: None,
        };
        compile_endpoint(&desc, &mut registry, &FetchRenderer).unwrap();

        let code = registry.get("getWhen").unwrap();
        assert!(code.contains("Promise<Date>"));
        assert!(code.contains("const dto: string = await response.json();"));
        assert!(code.contains("return new Date(dto);"));
    }

    #[test]
    fn test_builder_groups_files_by_module() {
        let mut builder = ClientBuilder::new();
        let desc = EndpointDescriptor {
            name: "get_foo".to_string(),
            url_template: "/api/foo".to_string(),
            path_args: vec![],
            method: HttpMethod::Get,
            return_type: None,
            payload: None,
        };
        builder.add_endpoint("app.foo", &desc).unwrap();
        let desc = EndpointDescriptor {
            name: "get_bar".to_string(),
            url_template: "/api/bar".to_string(),
            path_args: vec![],
            method: HttpMethod::Get,
            return_type: None,
            payload: None,
        };
        builder.add_endpoint("app.bar", &desc).unwrap();

        let files = builder.files().unwrap();
        let paths: Vec<&str> = files.keys().map(String::as_str).collect();
        assert_eq!(paths, vec!["app/bar.ts", "app/foo.ts"]);

        let content = &files["app/foo.ts"];
        assert!(content.starts_with("// Generated source code - do not modify this file\n"));
        assert!(content.contains("\nexport class ApiError extends Error {"));
        assert!(content.contains("\nexport async function getFoo(): Promise<void> {"));
        assert!(content.ends_with("}\n"));
    }

    #[test]
    fn test_shared_interface_across_endpoints_in_module() {
        let mut builder = ClientBuilder::new();
        let foo = build_tree(&SourceType::strukt("foo", vec![("n", SourceType::Int)])).unwrap();
        for name in ["get_foo", "peek_foo"] {
            let desc = EndpointDescriptor {
                name: name.to_string(),
                url_template: format!("/api/{name}"),
                path_args: vec![],
                method: HttpMethod::Get,
                return_type: Some(foo.clone()),
                payload: None,
            };
            builder.add_endpoint("app", &desc).unwrap();
        }

        let registry = builder.registry("app").unwrap();
        assert_eq!(
            registry.natural_order().unwrap(),
            vec!["ApiError", "Foo", "getFoo", "peekFoo"]
        );
    }
}
