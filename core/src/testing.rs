//! Scripted `Transport` for unit tests.

use std::cell::RefCell;
use std::collections::VecDeque;

use crate::error::GitlabError;
use crate::http::{HttpRequest, HttpResponse};
use crate::options::StreamSink;
use crate::transport::Transport;

/// One scripted answer, consumed per `execute` call.
pub enum Reply {
    Respond(HttpResponse),
    /// 201 with the request body as the response body.
    Echo,
    /// Body delivered as these exact chunks when a sink is attached.
    Chunks(u16, Vec<Vec<u8>>),
    Fail(String),
}

impl Reply {
    pub fn status(status: u16, body: &str) -> Self {
        Reply::Respond(HttpResponse::new(status, body))
    }

    pub fn json(status: u16, value: serde_json::Value) -> Self {
        Reply::Respond(HttpResponse::new(status, value.to_string()))
    }

    pub fn chunks(status: u16, chunks: &[&str]) -> Self {
        Reply::Chunks(status, chunks.iter().map(|c| c.as_bytes().to_vec()).collect())
    }
}

/// Records every request and answers from a queue of `Reply`s.
pub struct FakeTransport {
    replies: RefCell<VecDeque<Reply>>,
    requests: RefCell<Vec<HttpRequest>>,
}

impl FakeTransport {
    pub fn new(replies: Vec<Reply>) -> Self {
        Self {
            replies: RefCell::new(replies.into()),
            requests: RefCell::new(Vec::new()),
        }
    }

    pub fn requests(&self) -> Vec<HttpRequest> {
        self.requests.borrow().clone()
    }

    pub fn single_request(&self) -> HttpRequest {
        let requests = self.requests.borrow();
        assert_eq!(requests.len(), 1, "expected exactly one request");
        requests[0].clone()
    }
}

impl Transport for FakeTransport {
    fn execute(&self, request: &HttpRequest, sink: Option<&mut dyn StreamSink>) -> Result<HttpResponse, GitlabError> {
        self.requests.borrow_mut().push(request.clone());
        let reply = self
            .replies
            .borrow_mut()
            .pop_front()
            .unwrap_or_else(|| panic!("unexpected request: {} {}", request.method, request.url));

        match reply {
            Reply::Respond(response) => Ok(response),
            Reply::Echo => Ok(HttpResponse::new(201, request.body.clone().unwrap_or_default())),
            Reply::Fail(message) => Err(GitlabError::Transport(message)),
            Reply::Chunks(status, chunks) => match sink {
                Some(sink) if (200..300).contains(&status) => {
                    for chunk in &chunks {
                        sink.consume(chunk).map_err(|e| GitlabError::Stream(e.to_string()))?;
                    }
                    Ok(HttpResponse::new(status, ""))
                }
                _ => Ok(HttpResponse::new(status, chunks.concat())),
            },
        }
    }
}
