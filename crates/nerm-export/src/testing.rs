//! In-memory transport for unit tests.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::{Value, json};

use crate::error::{ExportError, Result};
use crate::transport::{Method, QueryParams, Transport};

#[derive(Debug, Clone)]
pub struct Call {
    pub method: Method,
    pub path: String,
    pub record_id: Option<String>,
    pub query: QueryParams,
    pub body: Option<Value>,
}

enum Responder {
    /// Serves `items` by `limit`/`offset`, with `_metadata.total` on request.
    Offset { collection: String, items: Vec<Value> },
    /// Replays bodies in order; an exhausted script answers with an empty body.
    Script(Mutex<VecDeque<String>>),
}

pub struct FakeTransport {
    responder: Responder,
    fail_at: Option<usize>,
    calls: Mutex<Vec<Call>>,
}

impl FakeTransport {
    pub fn offset_collection(collection: &str, items: Vec<Value>) -> Self {
        Self::with(Responder::Offset {
            collection: collection.to_string(),
            items,
        })
    }

    pub fn from_bodies(bodies: Vec<String>) -> Self {
        Self::with(Responder::Script(Mutex::new(bodies.into())))
    }

    fn with(responder: Responder) -> Self {
        Self {
            responder,
            fail_at: None,
            calls: Mutex::new(Vec::new()),
        }
    }

    /// The `n`th request (1-based) answers HTTP 500.
    pub fn fail_at_call(mut self, n: usize) -> Self {
        self.fail_at = Some(n);
        self
    }

    pub fn log(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn calls(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn paths(&self) -> Vec<String> {
        self.log().into_iter().map(|c| c.path).collect()
    }

    pub fn offsets(&self) -> Vec<u64> {
        self.numbers("offset")
    }

    pub fn limits(&self) -> Vec<u64> {
        self.numbers("limit")
    }

    pub fn cursors(&self) -> Vec<Option<String>> {
        self.log()
            .iter()
            .map(|c| c.query.get("after_id").map(str::to_string))
            .collect()
    }

    fn numbers(&self, key: &str) -> Vec<u64> {
        self.log()
            .iter()
            .filter_map(|c| c.query.get(key).and_then(|v| v.parse().ok()))
            .collect()
    }

    fn respond(&self, query: &QueryParams) -> String {
        match &self.responder {
            Responder::Offset { collection, items } => {
                let number = |key: &str, default: usize| {
                    query
                        .get(key)
                        .and_then(|v| v.parse().ok())
                        .unwrap_or(default)
                };
                let offset = number("offset", 0).min(items.len());
                let end = (offset + number("limit", items.len())).min(items.len());
                let mut body = json!({ collection.as_str(): &items[offset..end] });
                if query.get("metadata") == Some("true") {
                    body["_metadata"] = json!({
                        "total": items.len(),
                        "limit": end - offset,
                        "offset": offset,
                    });
                }
                body.to_string()
            }
            Responder::Script(bodies) => bodies.lock().unwrap().pop_front().unwrap_or_default(),
        }
    }
}

#[async_trait]
impl Transport for FakeTransport {
    async fn request(
        &self,
        method: Method,
        resource_path: &str,
        record_id: Option<&str>,
        query: &QueryParams,
        body: Option<Vec<u8>>,
    ) -> Result<Vec<u8>> {
        let call_number = {
            let mut calls = self.calls.lock().unwrap();
            calls.push(Call {
                method,
                path: resource_path.to_string(),
                record_id: record_id.map(str::to_string),
                query: query.clone(),
                body: body.and_then(|b| serde_json::from_slice(&b).ok()),
            });
            calls.len()
        };
        if self.fail_at == Some(call_number) {
            return Err(ExportError::Http {
                status: 500,
                body: "boom".to_string(),
            });
        }
        Ok(self.respond(query).into_bytes())
    }
}
