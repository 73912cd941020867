//! Authenticated request dispatch for the GitLab v4 REST API.
//!
//! # Overview
//! `Dispatcher` turns a relative API path plus optional payload and options
//! into one authenticated HTTP round-trip: it validates the configured
//! profile, composes an `HttpRequest`, hands it to a `Transport`, and decodes
//! the `HttpResponse` or maps it to a `GitlabError`.
//!
//! ```no_run
//! use gitlab_core::{Dispatcher, ProfileConfig, RequestOptions};
//!
//! let gitlab = Dispatcher::with_ureq(ProfileConfig::new("https://gitlab.example.com/api/v4", "glpat-xxxx"));
//! let users = gitlab.http_get("/users?username=alice", RequestOptions::new())?;
//! println!("{:?}", users.json());
//! # Ok::<(), gitlab_core::GitlabError>(())
//! ```
//!
//! # Design
//! - The dispatcher owns no state beyond its read-only profile and its
//!   transport; every call is independent.
//! - `Transport` is the I/O boundary. `UreqTransport` is the default; hosts
//!   with their own HTTP stack implement the trait.
//! - POST and PUT take one explicit `Payload` (JSON, form or none).
//! - Streaming goes through a caller-supplied `StreamSink`.

pub mod config;
pub mod dispatcher;
pub mod error;
pub mod http;
pub mod options;
pub mod transport;
pub mod types;
pub mod variables;

#[cfg(test)]
mod testing;

pub use config::{Profile, ProfileConfig, Settings, DEFAULT_PROFILE};
pub use dispatcher::{Dispatcher, Response, StreamSummary};
pub use error::GitlabError;
pub use http::{HttpMethod, HttpRequest, HttpResponse, Payload};
pub use options::{ClientCert, RequestOptions, StreamSink, Verify, WriteSink};
pub use transport::{Transport, UreqTransport};
pub use types::{NewVariable, ProjectVariable, VariableType, VariableUpdate};
