//! Error types
//!
//! Library errors are typed; the binary wraps them with `anyhow`.

use thiserror::Error;

/// Failure of a single fetch.
///
/// The fetcher never hands these to callers of `observe`; they are logged
/// and kept on the state as diagnostics only.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    /// The GET itself failed (DNS, connection, timeout, non-success status)
    #[error("network failure: {0}")]
    Network(String),
    /// The body is not JSON, not an array, or not the requested record shape
    #[error("parse failure: {0}")]
    Parse(String),
}

impl FetchError {
    pub fn is_network(&self) -> bool {
        matches!(self, Self::Network(_))
    }

    pub fn is_parse(&self) -> bool {
        matches!(self, Self::Parse(_))
    }
}

/// Why a value could not be routed into exactly one variant
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClassifyError {
    #[error("expected a JSON object")]
    NotAnObject,
    #[error("value carries markers of several variants: {0:?}")]
    Ambiguous(Vec<&'static str>),
    #[error("value carries no known variant marker")]
    Unrecognized,
    /// A marker was found but the payload does not decode
    #[error("invalid variant payload: {0}")]
    Invalid(String),
}

/// Unknown resource kind literal
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown resource kind '{0}' (expected 'todos' or 'posts')")]
pub struct UnknownKind(pub String);

/// Failure to construct a client
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("invalid base URL '{url}': {reason}")]
    InvalidBaseUrl { url: String, reason: String },
    #[error(transparent)]
    Http(#[from] FetchError),
}
