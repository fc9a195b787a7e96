//! Error taxonomy for the generator.
//!
//! Build-time failures ([`BuildError`]) are unrecoverable for the client
//! unit being compiled: no partial output is produced. Runtime failures are
//! split into [`DecodeError`] (bad incoming payload, attributable to the
//! caller) and [`EncodeError`] (handler produced a value that does not match
//! its declared type tree).

use thiserror::Error;

/// Fatal errors raised while compiling a client unit.
#[derive(Debug, Error)]
pub enum BuildError {
    /// No registered node variant matched the source type.
    #[error("unsupported source type {0}")]
    UnsupportedType(String),

    /// The same snippet name was registered with different contents.
    #[error("conflicting definitions for snippet `{0}`")]
    ConflictingSnippet(String),

    /// A snippet directly or transitively depends on itself.
    #[error("circular dependency involving {0:?}")]
    CircularDependency(Vec<String>),

    /// An endpoint declared more than one non-path argument.
    #[error("endpoint `{0}` declares more than one payload argument")]
    TooManyPayloadArgs(String),

    /// A dict source type keyed by something other than strings.
    #[error("unsupported dict key type {0}; JSON objects require string keys")]
    UnsupportedKeyType(String),
}

/// An incoming wire payload did not match the expected type tree.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("expected {expected}, got {found}")]
    TypeMismatch {
        expected: &'static str,
        found: String,
    },

    #[error("missing field `{0}` in payload")]
    MissingField(String),

    #[error("malformed date string `{0}`")]
    MalformedDate(String),

    #[error("expected {expected} tuple elements, got {found}")]
    TupleArity { expected: usize, found: usize },
}

/// A handler return value did not match its declared type tree.
#[derive(Debug, Error)]
pub enum EncodeError {
    #[error("expected {expected}, got {found}")]
    TypeMismatch {
        expected: &'static str,
        found: &'static str,
    },

    #[error("missing field `{0}` in handler value")]
    MissingField(String),

    #[error("non-finite float cannot be represented in JSON")]
    NonFiniteFloat,
}

/// Failure while adapting a single request at serving time.
#[derive(Debug, Error)]
pub enum RequestError {
    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error(transparent)]
    Encode(#[from] EncodeError),
}

impl RequestError {
    /// Decode failures are the caller's fault and should map to a
    /// 4xx-class response; encode failures are server faults.
    pub fn is_client_error(&self) -> bool {
        matches!(self, RequestError::Decode(_))
    }
}
