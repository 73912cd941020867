//! Error type for the GitLab request dispatcher.
//!
//! # Design
//! One enum covers every way a call can fail. Configuration and path
//! problems are detected before the transport is touched; `Api` carries the
//! raw status and body of any non-2xx response so callers can translate it
//! into their own domain errors. Nothing here is retried.

use thiserror::Error;

/// Errors returned by `Dispatcher` operations and the `Transport` it drives.
#[derive(Debug, Error)]
pub enum GitlabError {
    /// `api_url` or `token` is missing or empty, `api_url` is not an
    /// absolute http(s) URL, or the profile could not be loaded.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// The request path is empty or does not start with `/`.
    #[error("invalid API path {0:?}: must be non-empty and start with '/'")]
    InvalidPath(String),

    /// Connection, DNS, TLS or timeout failure reported by the transport.
    #[error("transport error: {0}")]
    Transport(String),

    /// The server answered with a non-2xx status.
    #[error("HTTP {status}: {body}")]
    Api { status: u16, body: String },

    /// The streaming sink rejected a chunk. Output already written stays.
    #[error("stream error: {0}")]
    Stream(String),

    /// The request payload could not be encoded.
    #[error("serialization failed: {0}")]
    Serialization(String),

    /// The response body could not be decoded into the expected type.
    #[error("deserialization failed: {0}")]
    Deserialization(String),
}

impl GitlabError {
    /// Status code of an `Api` error, `None` for every other variant.
    pub fn status(&self) -> Option<u16> {
        match self {
            GitlabError::Api { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// True for an `Api` error with status 404.
    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }
}
