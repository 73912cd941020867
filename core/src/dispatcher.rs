//! Authenticated request dispatch against the GitLab v4 API.
//!
//! # Design
//! `Dispatcher` holds the host-supplied `ProfileConfig` and a `Transport`,
//! nothing else. Each call re-validates the profile, composes one
//! `HttpRequest` (`compose`), runs it through the transport exactly once and
//! interprets the `HttpResponse` (`interpret`). There is no retry, paging or
//! caching; callers own those policies.

use log::{debug, trace};
use serde::de::DeserializeOwned;

use crate::config::ProfileConfig;
use crate::error::GitlabError;
use crate::http::{HttpMethod, HttpRequest, HttpResponse, Payload, CONTENT_TYPE_JSON, TOKEN_HEADER};
use crate::options::{RequestOptions, StreamSink, Verify};
use crate::transport::{Transport, UreqTransport};

/// Decoded result of a successful call.
#[derive(Debug, Clone, PartialEq)]
pub enum Response {
    /// 2xx with an empty body, e.g. most DELETEs.
    Empty,
    Json(serde_json::Value),
    /// 2xx UTF-8 body that is not JSON.
    Text(String),
    /// 2xx body that is not valid UTF-8, such as a raw file or archive.
    Bytes(Vec<u8>),
    /// The body went to the caller's sink.
    Streamed(StreamSummary),
}

/// What a streaming call delivered to its sink.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StreamSummary {
    pub chunks: usize,
    pub bytes: u64,
}

impl Response {
    pub fn is_empty(&self) -> bool {
        matches!(self, Response::Empty)
    }

    pub fn json(&self) -> Option<&serde_json::Value> {
        match self {
            Response::Json(value) => Some(value),
            _ => None,
        }
    }

    pub fn into_json(self) -> Option<serde_json::Value> {
        match self {
            Response::Json(value) => Some(value),
            _ => None,
        }
    }

    /// Decode into `T`. An empty response decodes as JSON `null`, so `()`
    /// and `Option<_>` targets accept it.
    pub fn deserialize<T: DeserializeOwned>(self) -> Result<T, GitlabError> {
        let value = match self {
            Response::Json(value) => value,
            Response::Empty => serde_json::Value::Null,
            Response::Text(text) => {
                return Err(GitlabError::Deserialization(format!("response is not JSON: {text}")));
            }
            Response::Bytes(bytes) => {
                return Err(GitlabError::Deserialization(format!(
                    "response is {} bytes of binary data",
                    bytes.len()
                )));
            }
            Response::Streamed(_) => {
                return Err(GitlabError::Deserialization("response body was streamed".to_string()));
            }
        };
        serde_json::from_value(value).map_err(|e| GitlabError::Deserialization(e.to_string()))
    }
}

/// Issues one authenticated request per call.
#[derive(Debug, Clone)]
pub struct Dispatcher<T> {
    config: ProfileConfig,
    transport: T,
}

impl Dispatcher<UreqTransport> {
    pub fn with_ureq(config: ProfileConfig) -> Self {
        Self::new(config, UreqTransport::new())
    }
}

impl<T: Transport> Dispatcher<T> {
    pub fn new(config: ProfileConfig, transport: T) -> Self {
        Self { config, transport }
    }

    pub fn config(&self) -> &ProfileConfig {
        &self.config
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn http_get(&self, path: &str, options: RequestOptions<'_>) -> Result<Response, GitlabError> {
        self.dispatch(HttpMethod::Get, path, Payload::None, options)
    }

    pub fn http_post(&self, path: &str, payload: Payload, options: RequestOptions<'_>) -> Result<Response, GitlabError> {
        self.dispatch(HttpMethod::Post, path, payload, options)
    }

    pub fn http_put(&self, path: &str, payload: Payload, options: RequestOptions<'_>) -> Result<Response, GitlabError> {
        self.dispatch(HttpMethod::Put, path, payload, options)
    }

    pub fn http_delete(&self, path: &str, options: RequestOptions<'_>) -> Result<Response, GitlabError> {
        self.dispatch(HttpMethod::Delete, path, Payload::None, options)
    }

    /// Build the request a call would send, without sending it.
    ///
    /// Fails with `Configuration` before looking at the path, then with
    /// `InvalidPath`. The URL is `api_url` and `path` concatenated verbatim.
    pub fn compose(
        &self,
        method: HttpMethod,
        path: &str,
        payload: &Payload,
        options: &RequestOptions<'_>,
    ) -> Result<HttpRequest, GitlabError> {
        let profile = self.config.resolve()?;
        if !path.starts_with('/') {
            return Err(GitlabError::InvalidPath(path.to_string()));
        }

        let mut headers = vec![
            (TOKEN_HEADER.to_string(), profile.token().to_string()),
            ("Accept".to_string(), CONTENT_TYPE_JSON.to_string()),
        ];
        let body = match payload.encode()? {
            Some((content_type, body)) => {
                headers.push(("Content-Type".to_string(), content_type.to_string()));
                Some(body)
            }
            None => None,
        };

        let verify = match (&options.verify, profile.ca_certs()) {
            (Verify::Enabled, Some(ca_certs)) => Verify::CaBundle(ca_certs.to_path_buf()),
            (verify, _) => verify.clone(),
        };

        Ok(HttpRequest {
            method,
            url: format!("{}{}", profile.api_url(), path),
            headers,
            query: options.query.clone(),
            body,
            timeout: options.timeout,
            verify,
            cert: options.cert.clone(),
            extra: options.extra.clone(),
        })
    }

    fn dispatch(
        &self,
        method: HttpMethod,
        path: &str,
        payload: Payload,
        mut options: RequestOptions<'_>,
    ) -> Result<Response, GitlabError> {
        let request = self.compose(method, path, &payload, &options)?;
        debug!("{} {}", request.method, request.url);

        match options.take_sink() {
            Some(sink) => {
                let mut counter = CountingSink {
                    inner: sink,
                    summary: StreamSummary::default(),
                };
                let response = self.transport.execute(&request, Some(&mut counter as &mut dyn StreamSink))?;
                trace!("{} {} -> {} (streamed)", request.method, request.url, response.status);
                check_status(response)?;
                Ok(Response::Streamed(counter.summary))
            }
            None => {
                let response = self.transport.execute(&request, None)?;
                trace!("{} {} -> {}", request.method, request.url, response.status);
                interpret(response)
            }
        }
    }
}

/// Map a transport response to a `Response`, or `Api` for non-2xx.
pub fn interpret(response: HttpResponse) -> Result<Response, GitlabError> {
    let body = check_status(response)?;
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(Response::Empty);
    }
    let text = match String::from_utf8(body) {
        Ok(text) => text,
        Err(e) => return Ok(Response::Bytes(e.into_bytes())),
    };
    match serde_json::from_str(&text) {
        Ok(value) => Ok(Response::Json(value)),
        Err(_) => Ok(Response::Text(text)),
    }
}

fn check_status(response: HttpResponse) -> Result<Vec<u8>, GitlabError> {
    if response.is_success() {
        return Ok(response.body);
    }
    Err(GitlabError::Api {
        status: response.status,
        body: response.text(),
    })
}

struct CountingSink<'a> {
    inner: &'a mut dyn StreamSink,
    summary: StreamSummary,
}

impl StreamSink for CountingSink<'_> {
    fn consume(&mut self, chunk: &[u8]) -> std::io::Result<()> {
        self.inner.consume(chunk)?;
        self.summary.chunks += 1;
        self.summary.bytes += chunk.len() as u64;
        Ok(())
    }
}
