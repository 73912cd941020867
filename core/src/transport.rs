//! The HTTP execution primitive and its default `ureq` implementation.
//!
//! # Design
//! `Transport` is the seam between request composition and I/O: the
//! dispatcher never opens a socket itself. Hosts that already own an HTTP
//! stack implement the trait; everyone else uses `UreqTransport`, which
//! builds a blocking agent per call from the request's timeout and TLS
//! options. Connection reuse, redirects and TLS are left to `ureq`.

use std::fs;
use std::io::{ErrorKind, Read};
use std::path::Path;
use std::sync::Arc;

use log::debug;
use ureq::tls::{parse_pem, Certificate, ClientCert as TlsClientCert, PemItem, PrivateKey, RootCerts, TlsConfig};

use crate::error::GitlabError;
use crate::http::{HttpMethod, HttpRequest, HttpResponse};
use crate::options::{ClientCert, StreamSink, Verify};

const CHUNK_SIZE: usize = 8 * 1024;

/// Largest body read into memory without a sink.
pub const MAX_BUFFERED_BODY: u64 = 256 * 1024 * 1024;

/// Executes one composed request.
///
/// Implementations must return non-2xx responses as `Ok`. When `sink` is
/// given and the status is 2xx, the body is delivered to the sink chunk by
/// chunk before returning, and the returned body is empty; a sink failure
/// is reported as `GitlabError::Stream`.
pub trait Transport {
    fn execute(&self, request: &HttpRequest, sink: Option<&mut dyn StreamSink>) -> Result<HttpResponse, GitlabError>;
}

impl<T: Transport + ?Sized> Transport for &T {
    fn execute(&self, request: &HttpRequest, sink: Option<&mut dyn StreamSink>) -> Result<HttpResponse, GitlabError> {
        (**self).execute(request, sink)
    }
}

impl<T: Transport + ?Sized> Transport for Arc<T> {
    fn execute(&self, request: &HttpRequest, sink: Option<&mut dyn StreamSink>) -> Result<HttpResponse, GitlabError> {
        (**self).execute(request, sink)
    }
}

/// Blocking transport backed by `ureq`.
#[derive(Debug, Clone)]
pub struct UreqTransport {
    user_agent: String,
}

impl Default for UreqTransport {
    fn default() -> Self {
        Self {
            user_agent: concat!("gitlab-core/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

impl UreqTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_user_agent(user_agent: &str) -> Self {
        Self {
            user_agent: user_agent.to_string(),
        }
    }

    fn agent(&self, request: &HttpRequest) -> Result<ureq::Agent, GitlabError> {
        Ok(ureq::Agent::config_builder()
            .http_status_as_error(false)
            .timeout_global(request.timeout)
            .tls_config(tls_config(request)?)
            .build()
            .new_agent())
    }

    fn decorate<B>(&self, mut builder: ureq::RequestBuilder<B>, request: &HttpRequest) -> ureq::RequestBuilder<B> {
        builder = builder.header("User-Agent", self.user_agent.as_str());
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        for (key, value) in &request.query {
            builder = builder.query(key, value);
        }
        builder
    }
}

impl Transport for UreqTransport {
    fn execute(&self, request: &HttpRequest, sink: Option<&mut dyn StreamSink>) -> Result<HttpResponse, GitlabError> {
        if !request.extra.is_empty() {
            debug!(
                "ignoring options not understood by ureq: {}",
                request.extra.keys().map(String::as_str).collect::<Vec<_>>().join(", ")
            );
        }
        let agent = self.agent(request)?;
        let url = request.url.as_str();

        let result = match (request.method, request.body.as_deref()) {
            (HttpMethod::Get, _) => self.decorate(agent.get(url), request).call(),
            (HttpMethod::Delete, _) => self.decorate(agent.delete(url), request).call(),
            (HttpMethod::Post, Some(body)) => self.decorate(agent.post(url), request).send(body.as_bytes()),
            (HttpMethod::Post, None) => self.decorate(agent.post(url), request).send_empty(),
            (HttpMethod::Put, Some(body)) => self.decorate(agent.put(url), request).send(body.as_bytes()),
            (HttpMethod::Put, None) => self.decorate(agent.put(url), request).send_empty(),
        };
        let mut response = result.map_err(|e| GitlabError::Transport(e.to_string()))?;

        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| Some((name.as_str().to_string(), value.to_str().ok()?.to_string())))
            .collect();

        let body = match sink {
            Some(sink) if (200..300).contains(&status) => {
                pump(response.body_mut().as_reader(), sink)?;
                Vec::new()
            }
            _ => response
                .body_mut()
                .with_config()
                .limit(MAX_BUFFERED_BODY)
                .read_to_vec()
                .map_err(|e| match e {
                    ureq::Error::BodyExceedsLimit(limit) => GitlabError::Transport(format!(
                        "response body exceeds {limit} bytes, attach a sink to stream it"
                    )),
                    e => GitlabError::Transport(e.to_string()),
                })?,
        };

        Ok(HttpResponse { status, headers, body })
    }
}

/// Copy `reader` into `sink`, one `consume` call per successful read.
pub(crate) fn pump(mut reader: impl Read, sink: &mut dyn StreamSink) -> Result<(), GitlabError> {
    let mut buf = vec![0u8; CHUNK_SIZE];
    loop {
        let n = match reader.read(&mut buf) {
            Ok(0) => return Ok(()),
            Ok(n) => n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(GitlabError::Transport(e.to_string())),
        };
        sink.consume(&buf[..n]).map_err(|e| GitlabError::Stream(e.to_string()))?;
    }
}

fn tls_config(request: &HttpRequest) -> Result<TlsConfig, GitlabError> {
    let mut builder = TlsConfig::builder();
    match &request.verify {
        Verify::Enabled => {}
        Verify::Disabled => builder = builder.disable_verification(true),
        Verify::CaBundle(path) => {
            let (certs, _) = read_pem(path)?;
            if certs.is_empty() {
                return Err(GitlabError::Transport(format!("no certificates in CA bundle {}", path.display())));
            }
            builder = builder.root_certs(RootCerts::new_with_certs(&certs));
        }
    }
    if let Some(cert) = &request.cert {
        builder = builder.client_cert(Some(client_cert(cert)?));
    }
    Ok(builder.build())
}

fn client_cert(cert: &ClientCert) -> Result<TlsClientCert, GitlabError> {
    let (chain, key, origin) = match cert {
        ClientCert::Combined(path) => {
            let (chain, key) = read_pem(path)?;
            (chain, key, path)
        }
        ClientCert::Pair { cert, key } => {
            let (chain, _) = read_pem(cert)?;
            let (_, key) = read_pem(key)?;
            (chain, key, cert)
        }
    };
    if chain.is_empty() {
        return Err(GitlabError::Transport(format!("no client certificate in {}", origin.display())));
    }
    let key = key.ok_or_else(|| GitlabError::Transport(format!("no private key for {}", origin.display())))?;
    Ok(TlsClientCert::new_with_certs(&chain, key))
}

fn read_pem(path: &Path) -> Result<(Vec<Certificate<'static>>, Option<PrivateKey<'static>>), GitlabError> {
    let bytes =
        fs::read(path).map_err(|e| GitlabError::Transport(format!("cannot read {}: {e}", path.display())))?;

    let mut certs = Vec::new();
    let mut key = None;
    for item in parse_pem(&bytes) {
        match item.map_err(|e| GitlabError::Transport(format!("invalid PEM in {}: {e}", path.display())))? {
            PemItem::Certificate(cert) => certs.push(cert.to_owned()),
            PemItem::PrivateKey(k) if key.is_none() => key = Some(k.to_owned()),
            _ => {}
        }
    }
    Ok((certs, key))
}
