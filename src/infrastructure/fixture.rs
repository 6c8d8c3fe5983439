use crate::config::Configuration;
use crate::domain::order::Order;
use crate::domain::ports::{Method, Transport, TransportRequest, TransportResponse};
use crate::error::{Result, TransportError};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::collections::{HashMap, VecDeque};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

/// One scripted reply of the remote processor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FixtureRoute {
    pub method: Method,
    pub path: String,
    #[serde(default = "default_status")]
    pub status: u16,
    #[serde(default)]
    pub body: Value,
}

fn default_status() -> u16 {
    200
}

/// A replay scenario: configuration, the order, and the remote's replies.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Fixture {
    #[serde(default)]
    pub configuration: Configuration,
    pub order: Order,
    #[serde(default)]
    pub routes: Vec<FixtureRoute>,
}

impl Fixture {
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&json)?)
    }
}

#[derive(Debug, Clone)]
struct Reply {
    status: u16,
    body: String,
}

type Routes = HashMap<(Method, String), VecDeque<Reply>>;

/// An in-process `Transport` answering from scripted routes.
///
/// Replies for the same `(method, path)` are served in order; the last one
/// repeats. Unknown routes answer 404 with a problem document. Every request
/// is recorded.
#[derive(Clone, Default)]
pub struct FixtureTransport {
    routes: Arc<Mutex<Routes>>,
    requests: Arc<Mutex<Vec<TransportRequest>>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl FixtureTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_routes(routes: impl IntoIterator<Item = FixtureRoute>) -> Self {
        let transport = Self::new();
        for route in routes {
            transport.push(route.method, &route.path, route.status, route.body.to_string());
        }
        transport
    }

    /// Queues a 2xx JSON reply.
    pub fn with_json(self, method: Method, path: &str, body: Value) -> Self {
        self.push(method, path, 200, body.to_string());
        self
    }

    /// Queues a reply with an arbitrary status and raw body.
    pub fn with_reply(self, method: Method, path: &str, status: u16, body: impl Into<String>) -> Self {
        self.push(method, path, status, body.into());
        self
    }

    pub fn push(&self, method: Method, path: &str, status: u16, body: String) {
        lock(&self.routes)
            .entry((method, path.to_string()))
            .or_default()
            .push_back(Reply { status, body });
    }

    pub fn requests(&self) -> Vec<TransportRequest> {
        lock(&self.requests).clone()
    }

    /// Number of recorded requests for `(method, path)`.
    pub fn count(&self, method: Method, path: &str) -> usize {
        lock(&self.requests)
            .iter()
            .filter(|r| r.method == method && r.path == path)
            .count()
    }

    fn next_reply(&self, method: Method, path: &str) -> Option<Reply> {
        let mut routes = lock(&self.routes);
        let queue = routes.get_mut(&(method, path.to_string()))?;
        if queue.len() > 1 {
            queue.pop_front()
        } else {
            queue.front().cloned()
        }
    }
}

#[async_trait]
impl Transport for FixtureTransport {
    async fn request(
        &self,
        request: TransportRequest,
    ) -> std::result::Result<TransportResponse, TransportError> {
        let reply = self.next_reply(request.method, &request.path);
        lock(&self.requests).push(request.clone());

        let Some(reply) = reply else {
            let body = json!({
                "title": "Not Found",
                "status": 404,
                "detail": format!("No route for {} {}", request.method, request.path),
                "problems": []
            });
            return Err(TransportError::with_response(404, body.to_string()));
        };

        if !(200..300).contains(&reply.status) {
            return Err(TransportError::with_response(reply.status, reply.body));
        }

        Ok(TransportResponse {
            status: reply.status,
            body: reply.body,
        })
    }
}
