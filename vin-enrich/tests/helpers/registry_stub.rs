//! Scripted registry transport
//!
//! Answers requests by endpoint name (the first path segment after the base
//! URL). Each endpoint has a reply script; the last reply repeats once the
//! script is down to one entry. Unscripted endpoints answer 404.

use async_trait::async_trait;
use serde_json::Value;
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::Duration;
use vin_enrich::services::{HttpResponse, Transport, TransportError};

use super::STUB_BASE;

/// One scripted reply
#[derive(Debug, Clone)]
pub enum Reply {
    /// 200 with a JSON body
    Json(Value),
    /// Status with an empty body
    Status(u16),
    /// Status with a raw body
    Body(u16, String),
    /// No HTTP response
    Transport(TransportError),
    /// Never answers (the caller must give up)
    Hang,
}

/// A request as seen by the stub
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedRequest {
    pub endpoint: String,
    pub url: String,
    pub params: Vec<(String, String)>,
}

#[derive(Default)]
pub struct StubRegistry {
    scripts: Mutex<HashMap<String, VecDeque<Reply>>>,
    requests: Mutex<Vec<RecordedRequest>>,
}

impl StubRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Always answer `endpoint` with `reply`
    pub fn route(self, endpoint: &str, reply: Reply) -> Self {
        self.script(endpoint, vec![reply])
    }

    /// Answer `endpoint` with `replies` in order, repeating the last one
    pub fn script(self, endpoint: &str, replies: Vec<Reply>) -> Self {
        self.scripts
            .lock()
            .unwrap()
            .insert(endpoint.to_string(), replies.into());
        self
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().unwrap().clone()
    }

    /// Endpoint names in request order
    pub fn endpoints_requested(&self) -> Vec<String> {
        self.requests().into_iter().map(|r| r.endpoint).collect()
    }

    pub fn count_for(&self, endpoint: &str) -> usize {
        self.requests()
            .iter()
            .filter(|r| r.endpoint == endpoint)
            .count()
    }

    fn next_reply(&self, endpoint: &str) -> Reply {
        let mut scripts = self.scripts.lock().unwrap();
        match scripts.get_mut(endpoint) {
            Some(queue) if queue.len() > 1 => queue.pop_front().unwrap(),
            Some(queue) => queue.front().cloned().unwrap_or(Reply::Status(404)),
            None => Reply::Status(404),
        }
    }
}

fn endpoint_of(url: &str) -> String {
    url.strip_prefix(STUB_BASE)
        .unwrap_or(url)
        .trim_start_matches('/')
        .split('/')
        .next()
        .unwrap_or("")
        .to_string()
}

#[async_trait]
impl Transport for StubRegistry {
    async fn get(
        &self,
        url: &str,
        params: &[(String, String)],
        _timeout: Duration,
    ) -> Result<HttpResponse, TransportError> {
        let endpoint = endpoint_of(url);
        self.requests.lock().unwrap().push(RecordedRequest {
            endpoint: endpoint.clone(),
            url: url.to_string(),
            params: params.to_vec(),
        });

        match self.next_reply(&endpoint) {
            Reply::Json(value) => Ok(HttpResponse {
                status: 200,
                body: value.to_string(),
            }),
            Reply::Status(status) => Ok(HttpResponse {
                status,
                body: String::new(),
            }),
            Reply::Body(status, body) => Ok(HttpResponse { status, body }),
            Reply::Transport(e) => Err(e),
            Reply::Hang => std::future::pending().await,
        }
    }
}
