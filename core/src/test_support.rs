//! In-memory `Transport` that plays the record store for unit tests.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::client::RecordClient;
use crate::config::{DeploymentMode, RecordStoreConfig};
use crate::error::TransportError;
use crate::http::{HttpMethod, HttpRequest, HttpResponse, Transport};
use crate::types::PAGE_SIZE;

type Latency = Arc<dyn Fn(u64) -> u64 + Send + Sync>;

/// Canned store behaviour.
#[derive(Clone)]
pub(crate) struct ScriptedStore {
    records: Vec<Value>,
    fail_cursor: Option<u64>,
    latency: Option<Latency>,
    create_id: String,
    create_status: u16,
    offline: bool,
    reported_remaining: Option<u64>,
}

impl ScriptedStore {
    pub fn with_records(n: usize) -> Self {
        let records = (0..n)
            .map(|i| {
                json!({
                    "_id": Self::record_id(i),
                    "Created Date": "2024-05-06T12:00:00.000Z",
                    "Modified Date": "2024-05-06T12:00:00.000Z",
                    "n": i,
                })
            })
            .collect();
        Self {
            records,
            fail_cursor: None,
            latency: None,
            create_id: "1715000000000x100".to_string(),
            create_status: 200,
            offline: false,
            reported_remaining: None,
        }
    }

    pub fn record_id(i: usize) -> String {
        format!("rec-{i:04}")
    }

    /// Answer the list page at `cursor` with HTTP 500.
    pub fn fail_cursor(mut self, cursor: u64) -> Self {
        self.fail_cursor = Some(cursor);
        self
    }

    /// Delay, in milliseconds, before answering the page at a cursor.
    pub fn latency(mut self, f: impl Fn(u64) -> u64 + Send + Sync + 'static) -> Self {
        self.latency = Some(Arc::new(f));
        self
    }

    pub fn create_id(mut self, id: &str) -> Self {
        self.create_id = id.to_string();
        self
    }

    pub fn reject_create(mut self, status: u16) -> Self {
        self.create_status = status;
        self
    }

    /// Claim `remaining` on every page instead of the true figure.
    pub fn report_remaining(mut self, remaining: u64) -> Self {
        self.reported_remaining = Some(remaining);
        self
    }

    /// Every request fails without a response.
    pub fn offline(mut self) -> Self {
        self.offline = true;
        self
    }
}

pub(crate) struct ScriptedTransport {
    store: ScriptedStore,
    requests: Mutex<Vec<HttpRequest>>,
    completed: Mutex<Vec<u64>>,
}

impl ScriptedTransport {
    pub fn client(store: ScriptedStore) -> RecordClient<ScriptedTransport> {
        let config = RecordStoreConfig::new(DeploymentMode::Development, "test-token")
            .with_base_url("http://store.test");
        RecordClient::new(
            &config,
            ScriptedTransport {
                store,
                requests: Mutex::new(Vec::new()),
                completed: Mutex::new(Vec::new()),
            },
        )
    }

    /// Requests in the order they were issued.
    pub fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().unwrap().clone()
    }

    /// Cursors of list requests in issuance order.
    pub fn cursors(&self) -> Vec<u64> {
        self.requests()
            .iter()
            .filter_map(|r| r.query_value("cursor").and_then(|c| c.parse().ok()))
            .collect()
    }

    /// Cursors of list requests in the order they were answered.
    pub fn completed(&self) -> Vec<u64> {
        self.completed.lock().unwrap().clone()
    }

    fn page(&self, cursor: u64) -> HttpResponse {
        let len = self.store.records.len();
        let start = (cursor as usize).min(len);
        let end = (start + PAGE_SIZE as usize).min(len);
        let results = &self.store.records[start..end];
        let remaining = self.store.reported_remaining.unwrap_or((len - end) as u64);
        ok(json!({
            "response": {
                "cursor": cursor,
                "results": results,
                "count": results.len(),
                "remaining": remaining,
            }
        }))
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        self.requests.lock().unwrap().push(request.clone());
        if self.store.offline {
            return Err(TransportError::new("connection refused"));
        }

        if request.method == HttpMethod::Post {
            if self.store.create_status != 200 {
                return Ok(HttpResponse {
                    status: self.store.create_status,
                    headers: Vec::new(),
                    body: r#"{"status":"ERROR","message":"invalid data"}"#.to_string(),
                });
            }
            return Ok(ok(json!({"status": "success", "id": self.store.create_id})));
        }

        let cursor = request
            .query_value("cursor")
            .and_then(|c| c.parse::<u64>().ok())
            .unwrap_or(0);
        let delay = self.store.latency.as_ref().map_or(0, |f| f(cursor));
        if delay > 0 {
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }
        self.completed.lock().unwrap().push(cursor);

        if self.store.fail_cursor == Some(cursor) {
            return Ok(HttpResponse {
                status: 500,
                headers: Vec::new(),
                body: "internal error".to_string(),
            });
        }
        Ok(self.page(cursor))
    }
}

fn ok(body: Value) -> HttpResponse {
    HttpResponse {
        status: 200,
        headers: Vec::new(),
        body: body.to_string(),
    }
}
