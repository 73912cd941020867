//! Per-call transport options and the streaming sink interface.
//!
//! # Design
//! The recognised options are plain fields. Anything a caller wants to hand
//! to a custom `Transport` that this crate does not know about goes into the
//! `extra` bucket untouched. Streaming is switched on by attaching a sink,
//! so "stream without a destination" cannot be expressed.

use std::collections::BTreeMap;
use std::fmt;
use std::io::{self, Write};
use std::path::PathBuf;
use std::time::Duration;

/// Server certificate verification mode.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Verify {
    /// Verify against the profile's `ca_certs` bundle if set, otherwise the
    /// transport's default roots.
    #[default]
    Enabled,
    /// Verify against this PEM bundle, ignoring the profile's.
    CaBundle(PathBuf),
    Disabled,
}

/// Client certificate presented during the TLS handshake.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientCert {
    /// One PEM file holding the certificate chain and the private key.
    Combined(PathBuf),
    Pair { cert: PathBuf, key: PathBuf },
}

/// Receives response bytes as they arrive.
///
/// Called on the calling thread, once per chunk, in order. Returning an
/// error aborts the request with `GitlabError::Stream`.
pub trait StreamSink {
    fn consume(&mut self, chunk: &[u8]) -> io::Result<()>;
}

impl<F> StreamSink for F
where
    F: FnMut(&[u8]) -> io::Result<()>,
{
    fn consume(&mut self, chunk: &[u8]) -> io::Result<()> {
        self(chunk)
    }
}

/// Sink that writes every chunk to an `io::Write` destination.
#[derive(Debug)]
pub struct WriteSink<W> {
    inner: W,
}

impl<W: Write> WriteSink<W> {
    pub fn new(inner: W) -> Self {
        Self { inner }
    }

    pub fn get_ref(&self) -> &W {
        &self.inner
    }

    pub fn into_inner(self) -> W {
        self.inner
    }
}

impl<W: Write> StreamSink for WriteSink<W> {
    fn consume(&mut self, chunk: &[u8]) -> io::Result<()> {
        self.inner.write_all(chunk)
    }
}

/// Optional settings for a single call.
#[derive(Default)]
pub struct RequestOptions<'s> {
    pub timeout: Option<Duration>,
    pub verify: Verify,
    pub cert: Option<ClientCert>,
    /// Query pairs, appended in order.
    pub query: Vec<(String, String)>,
    /// Caller options this crate does not interpret, forwarded to the
    /// transport. `UreqTransport` ignores them and logs their keys at debug.
    pub extra: BTreeMap<String, serde_json::Value>,
    sink: Option<&'s mut dyn StreamSink>,
}

impl<'s> RequestOptions<'s> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn verify(mut self, verify: Verify) -> Self {
        self.verify = verify;
        self
    }

    pub fn cert(mut self, cert: ClientCert) -> Self {
        self.cert = Some(cert);
        self
    }

    pub fn query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    pub fn extra(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.extra.insert(key.into(), value);
        self
    }

    /// Stream the response body into `sink` instead of buffering it.
    pub fn stream_to(mut self, sink: &'s mut dyn StreamSink) -> Self {
        self.sink = Some(sink);
        self
    }

    pub fn is_streaming(&self) -> bool {
        self.sink.is_some()
    }

    /// Copy of every option except the sink.
    pub fn without_sink(&self) -> RequestOptions<'static> {
        RequestOptions {
            timeout: self.timeout,
            verify: self.verify.clone(),
            cert: self.cert.clone(),
            query: self.query.clone(),
            extra: self.extra.clone(),
            sink: None,
        }
    }

    pub(crate) fn take_sink(&mut self) -> Option<&'s mut dyn StreamSink> {
        self.sink.take()
    }
}

impl fmt::Debug for RequestOptions<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestOptions")
            .field("timeout", &self.timeout)
            .field("verify", &self.verify)
            .field("cert", &self.cert)
            .field("query", &self.query)
            .field("extra", &self.extra)
            .field("stream", &self.is_streaming())
            .finish()
    }
}
