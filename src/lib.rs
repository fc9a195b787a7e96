//! Typed-endpoint TypeScript client generation.
//!
//! Server-side endpoint declarations (argument and return types, route
//! patterns, HTTP methods) are compiled into TypeScript accessor functions
//! plus the interface declarations and helper snippets they depend on, one
//! generated file per source module. The same type trees also drive the
//! runtime conversion between wire JSON and typed in-memory values, so the
//! generated client and the serving path can never disagree about a type.
//!
//! The flow is: describe each handler with [`types::SourceType`] values and
//! resolve them once via [`api::prepare_function`]; hand the route table to
//! [`api::collect_endpoints`] to fill a [`client::ClientBuilder`]; write
//! the files it produces into the frontend source tree. At serving time,
//! route each prepared request through [`api::adapt_request`].

#![forbid(unsafe_code)]
#![deny(unused_must_use, missing_debug_implementations)]
#![deny(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::todo,
    clippy::unimplemented,
    clippy::dbg_macro
)]

pub mod api;
pub mod client;
pub mod error;
pub mod naming;
pub mod render;
pub mod snippets;
pub mod types;

pub use api::{
    adapt_request, collect_endpoints, prepare_function, FunctionInfo, HandlerOutput,
    PreparedEndpoints, RouteEntry,
};
pub use client::{compile_endpoint, ClientBuilder, EndpointDescriptor, HttpMethod};
pub use error::{BuildError, DecodeError, EncodeError, RequestError};
pub use render::{AccessorParams, AccessorRenderer, FetchRenderer};
pub use snippets::{SnippetRegistry, SnippetScope};
pub use types::{build_tree, SourceType, TypeNode, TypedValue};
