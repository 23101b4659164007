use std::{
    collections::{HashMap, HashSet},
    sync::Arc,
};

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use tokio::{
    net::TcpListener,
    sync::{Mutex, RwLock},
};
use uuid::Uuid;

pub const PAGE_SIZE: usize = 100;

/// One request as the store saw it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RecordedRequest {
    pub method: &'static str,
    pub record_type: String,
    pub cursor: Option<usize>,
    pub constraints: Option<String>,
}

#[derive(Default)]
struct StoreState {
    records: HashMap<String, Vec<Value>>,
    failing_cursors: HashSet<usize>,
}

/// Shared handle onto the in-memory store behind the router.
#[derive(Clone, Default)]
pub struct MockStore {
    state: Arc<RwLock<StoreState>>,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
    api_token: Option<String>,
}

impl MockStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject requests whose `api_token` differs from `token`.
    pub fn with_token(token: &str) -> Self {
        Self {
            api_token: Some(token.to_string()),
            ..Self::default()
        }
    }

    /// Insert a record with system fields assigned, returning its id.
    pub async fn insert(&self, record_type: &str, fields: Value) -> String {
        let record = stamp(fields);
        let id = record["_id"].as_str().unwrap_or_default().to_string();
        self.state
            .write()
            .await
            .records
            .entry(record_type.to_string())
            .or_default()
            .push(record);
        id
    }

    /// Insert `n` records whose only caller field is `seq` (0-based).
    pub async fn seed(&self, record_type: &str, n: usize) {
        for seq in 0..n {
            self.insert(record_type, json!({ "seq": seq })).await;
        }
    }

    pub async fn records(&self, record_type: &str) -> Vec<Value> {
        self.state
            .read()
            .await
            .records
            .get(record_type)
            .cloned()
            .unwrap_or_default()
    }

    pub async fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().await.clone()
    }

    /// Answer list requests at `cursor` with HTTP 500.
    pub async fn fail_cursor(&self, cursor: usize) {
        self.state.write().await.failing_cursors.insert(cursor);
    }

    async fn record(&self, request: RecordedRequest) {
        self.requests.lock().await.push(request);
    }

    fn authorized(&self, token: Option<&str>) -> bool {
        match &self.api_token {
            Some(expected) => token == Some(expected.as_str()),
            None => true,
        }
    }
}

#[derive(Deserialize)]
pub struct ListParams {
    #[serde(default)]
    pub cursor: usize,
    pub api_token: Option<String>,
    pub constraints: Option<String>,
}

#[derive(Deserialize)]
pub struct TokenParams {
    pub api_token: Option<String>,
}

#[derive(Deserialize)]
struct Constraint {
    key: String,
    constraint_type: String,
    #[serde(default)]
    value: Option<Value>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ListPage {
    pub cursor: usize,
    pub results: Vec<Value>,
    pub count: usize,
    pub remaining: usize,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ListResponse {
    pub response: ListPage,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Created {
    pub status: String,
    pub id: String,
}

type Rejection = (StatusCode, Json<Value>);

pub fn app() -> Router {
    app_with_store(MockStore::new())
}

pub fn app_with_store(store: MockStore) -> Router {
    Router::new()
        .route("/{record_type}", get(list_records).post(create_record))
        .with_state(store)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

pub async fn run_with_store(listener: TcpListener, store: MockStore) -> Result<(), std::io::Error> {
    axum::serve(listener, app_with_store(store)).await
}

async fn list_records(
    State(store): State<MockStore>,
    Path(record_type): Path<String>,
    Query(params): Query<ListParams>,
) -> Result<Json<ListResponse>, Rejection> {
    store
        .record(RecordedRequest {
            method: "GET",
            record_type: record_type.clone(),
            cursor: Some(params.cursor),
            constraints: params.constraints.clone(),
        })
        .await;

    let state = store.state.read().await;
    if !store.authorized(params.api_token.as_deref()) {
        return Err(unauthorized());
    }
    if state.failing_cursors.contains(&params.cursor) {
        return Err(error(StatusCode::INTERNAL_SERVER_ERROR, "injected failure"));
    }

    let constraints: Vec<Constraint> = match &params.constraints {
        Some(raw) => serde_json::from_str(raw)
            .map_err(|e| error(StatusCode::BAD_REQUEST, &format!("invalid constraints: {e}")))?,
        None => Vec::new(),
    };

    let mut matching = Vec::new();
    for record in state.records.get(&record_type).into_iter().flatten() {
        let mut keep = true;
        for constraint in &constraints {
            if !satisfies(record, constraint)? {
                keep = false;
                break;
            }
        }
        if keep {
            matching.push(record.clone());
        }
    }

    let start = params.cursor.min(matching.len());
    let end = (start + PAGE_SIZE).min(matching.len());
    let results = matching[start..end].to_vec();
    Ok(Json(ListResponse {
        response: ListPage {
            cursor: params.cursor,
            count: results.len(),
            remaining: matching.len() - end,
            results,
        },
    }))
}

async fn create_record(
    State(store): State<MockStore>,
    Path(record_type): Path<String>,
    Query(params): Query<TokenParams>,
    Json(fields): Json<Value>,
) -> Result<Json<Created>, Rejection> {
    store
        .record(RecordedRequest {
            method: "POST",
            record_type: record_type.clone(),
            cursor: None,
            constraints: None,
        })
        .await;

    if !store.authorized(params.api_token.as_deref()) {
        return Err(unauthorized());
    }
    let Value::Object(map) = &fields else {
        return Err(error(StatusCode::BAD_REQUEST, "body must be a JSON object"));
    };
    if let Some(reserved) = ["_id", "Created By", "Created Date", "Modified Date"]
        .iter()
        .find(|name| map.contains_key(**name))
    {
        return Err(error(
            StatusCode::BAD_REQUEST,
            &format!("field {reserved} cannot be modified"),
        ));
    }

    let id = store.insert(&record_type, fields).await;
    Ok(Json(Created {
        status: "success".to_string(),
        id,
    }))
}

/// Add the four system fields to caller fields.
fn stamp(fields: Value) -> Value {
    let now = Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true);
    let mut record = Map::new();
    record.insert(
        "_id".to_string(),
        json!(format!("{}x{}", Utc::now().timestamp_millis(), Uuid::new_v4().simple())),
    );
    record.insert("Created By".to_string(), json!("admin_user_mock"));
    record.insert("Created Date".to_string(), json!(now));
    record.insert("Modified Date".to_string(), json!(now));
    if let Value::Object(map) = fields {
        record.extend(map);
    }
    Value::Object(record)
}

fn satisfies(record: &Value, constraint: &Constraint) -> Result<bool, Rejection> {
    let field = record.get(&constraint.key).filter(|v| !is_empty(v));
    let value = constraint.value.as_ref();
    let matched = match constraint.constraint_type.as_str() {
        "is_empty" | "empty" => field.is_none(),
        "is_not_empty" | "not empty" => field.is_some(),
        "equals" => field == value,
        "not equal" => field != value,
        "text contains" => text_contains(field, value),
        "not text contains" => !text_contains(field, value),
        "greater than" => compare(field, value) == Some(std::cmp::Ordering::Greater),
        "less than" => compare(field, value) == Some(std::cmp::Ordering::Less),
        "in" => in_list(field, value),
        "not in" => !in_list(field, value),
        "contains" => list_contains(field, value),
        "not contains" => !list_contains(field, value),
        other => {
            return Err(error(
                StatusCode::BAD_REQUEST,
                &format!("unsupported constraint_type {other}"),
            ))
        }
    };
    Ok(matched)
}

fn is_empty(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        Value::Array(items) => items.is_empty(),
        _ => false,
    }
}

fn text_contains(field: Option<&Value>, needle: Option<&Value>) -> bool {
    match (field.and_then(Value::as_str), needle.and_then(Value::as_str)) {
        (Some(haystack), Some(needle)) => haystack.to_lowercase().contains(&needle.to_lowercase()),
        _ => false,
    }
}

fn compare(field: Option<&Value>, value: Option<&Value>) -> Option<std::cmp::Ordering> {
    match (field?, value?) {
        (Value::Number(a), Value::Number(b)) => a.as_f64()?.partial_cmp(&b.as_f64()?),
        (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
        _ => None,
    }
}

fn in_list(field: Option<&Value>, list: Option<&Value>) -> bool {
    match (field, list.and_then(Value::as_array)) {
        (Some(field), Some(items)) => items.contains(field),
        _ => false,
    }
}

fn list_contains(field: Option<&Value>, item: Option<&Value>) -> bool {
    match (field.and_then(Value::as_array), item) {
        (Some(items), Some(item)) => items.contains(item),
        _ => false,
    }
}

fn unauthorized() -> Rejection {
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({
            "statusCode": 401,
            "body": {"status": "UNAUTHORIZED", "message": "Invalid or expired token"}
        })),
    )
}

fn error(status: StatusCode, message: &str) -> Rejection {
    (
        status,
        Json(json!({
            "statusCode": status.as_u16(),
            "body": {"status": "ERROR", "message": message}
        })),
    )
}
