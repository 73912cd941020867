//! Request and response types exchanged with the transport.
//!
//! # Design
//! The dispatcher composes an `HttpRequest` as plain data and hands it to a
//! `Transport`; the transport answers with an `HttpResponse`. Non-2xx
//! statuses are ordinary responses here, interpretation happens in the
//! dispatcher. Everything is owned so requests can be logged, recorded by
//! test doubles, or moved across threads without lifetime concerns.

use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

use crate::error::GitlabError;
use crate::options::{ClientCert, Verify};

/// Header carrying the GitLab access token.
pub const TOKEN_HEADER: &str = "PRIVATE-TOKEN";

pub const CONTENT_TYPE_JSON: &str = "application/json";
pub const CONTENT_TYPE_FORM: &str = "application/x-www-form-urlencoded";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Delete,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Delete => "DELETE",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Body of a POST or PUT request. Exactly one encoding per call.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Payload {
    #[default]
    None,
    /// Sent as `application/json`.
    Json(serde_json::Value),
    /// Sent as `application/x-www-form-urlencoded`, pairs in order.
    Form(Vec<(String, String)>),
}

impl Payload {
    /// Serialize any value into a JSON payload.
    pub fn json<T: serde::Serialize>(value: &T) -> Result<Self, GitlabError> {
        serde_json::to_value(value)
            .map(Payload::Json)
            .map_err(|e| GitlabError::Serialization(e.to_string()))
    }

    pub fn form<K, V, I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Payload::Form(pairs.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }

    /// Encoded body and its content type, `None` for an empty payload.
    pub fn encode(&self) -> Result<Option<(&'static str, String)>, GitlabError> {
        match self {
            Payload::None => Ok(None),
            Payload::Json(value) => serde_json::to_string(value)
                .map(|body| Some((CONTENT_TYPE_JSON, body)))
                .map_err(|e| GitlabError::Serialization(e.to_string())),
            Payload::Form(pairs) => Ok(Some((CONTENT_TYPE_FORM, encode_form(pairs)))),
        }
    }
}

fn encode_form(pairs: &[(String, String)]) -> String {
    pairs
        .iter()
        .map(|(k, v)| format!("{}={}", urlencoding::encode(k), urlencoding::encode(v)))
        .collect::<Vec<_>>()
        .join("&")
}

/// A fully composed request, ready for a `Transport`.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpRequest {
    pub method: HttpMethod,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub query: Vec<(String, String)>,
    pub body: Option<String>,
    pub timeout: Option<Duration>,
    /// Never `Verify::Enabled` when the profile names a CA bundle; the
    /// dispatcher rewrites it to `Verify::CaBundle`.
    pub verify: Verify,
    pub cert: Option<ClientCert>,
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl HttpRequest {
    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        find_header(&self.headers, name)
    }
}

/// A response as returned by a `Transport`.
///
/// The body is raw bytes; raw files and artifacts need not be UTF-8. In
/// streaming mode with a 2xx status the body has already been pushed to the
/// sink and `body` is empty.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl HttpResponse {
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            headers: Vec::new(),
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        find_header(&self.headers, name)
    }

    /// Body as text, invalid UTF-8 replaced.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

fn find_header<'a>(headers: &'a [(String, String)], name: &str) -> Option<&'a str> {
    headers
        .iter()
        .find(|(k, _)| k.eq_ignore_ascii_case(name))
        .map(|(_, v)| v.as_str())
}
