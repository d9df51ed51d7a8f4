//! In-memory transport with scripted replies.
//!
//! Used by the test suites across the workspace and usable as an offline
//! stand-in: replies are queued in order, every request is logged, and an
//! exhausted queue is an error rather than a panic so tests can assert on
//! call counts.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::Value as Json;

use crate::error::{ClientError, Result};
use crate::transport::{Transport, WireRequest, WireResponse};

enum ScriptedReply {
    Ok(Json),
    Status(u16, String),
    ConnectionError(String),
}

#[derive(Default)]
pub struct FakeTransport {
    replies: Mutex<VecDeque<ScriptedReply>>,
    log: Mutex<Vec<WireRequest>>,
}

impl FakeTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a successful JSON reply.
    pub fn push_ok(&self, body: Json) {
        self.replies
            .lock()
            .expect("reply queue poisoned")
            .push_back(ScriptedReply::Ok(body));
    }

    /// Queue an HTTP error reply.
    pub fn push_status(&self, status: u16, message: &str) {
        self.replies
            .lock()
            .expect("reply queue poisoned")
            .push_back(ScriptedReply::Status(status, message.to_string()));
    }

    /// Queue a network-level failure.
    pub fn push_connection_error(&self, message: &str) {
        self.replies
            .lock()
            .expect("reply queue poisoned")
            .push_back(ScriptedReply::ConnectionError(message.to_string()));
    }

    /// Number of requests sent so far.
    pub fn calls(&self) -> usize {
        self.log.lock().expect("request log poisoned").len()
    }

    /// Every request sent so far, in order.
    pub fn requests(&self) -> Vec<WireRequest> {
        self.log.lock().expect("request log poisoned").clone()
    }
}

#[async_trait]
impl Transport for FakeTransport {
    async fn send(&self, request: &WireRequest) -> Result<WireResponse> {
        self.log
            .lock()
            .expect("request log poisoned")
            .push(request.clone());

        let reply = self
            .replies
            .lock()
            .expect("reply queue poisoned")
            .pop_front();
        match reply {
            Some(ScriptedReply::Ok(body)) => Ok(body),
            Some(ScriptedReply::Status(404, _)) => Err(ClientError::NotFound {
                url: request.path.clone(),
            }),
            Some(ScriptedReply::Status(status, message)) => Err(ClientError::Api {
                status,
                url: request.path.clone(),
                message,
            }),
            Some(ScriptedReply::ConnectionError(message)) => Err(ClientError::Transport {
                url: request.path.clone(),
                message,
            }),
            None => Err(ClientError::Transport {
                url: request.path.clone(),
                message: "fake transport has no scripted reply left".to_string(),
            }),
        }
    }
}
