//! Endpoint tests: the router against the mock record store, with canned
//! extraction and voice-platform collaborators.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::http::{self, Request, StatusCode};
use http_body_util::BodyExt;
use meli_core::{DeploymentMode, RecordClient, RecordStoreConfig, ReqwestTransport};
use meli_server::error::FAILURE_BODY;
use meli_server::extract::{ExtractedLead, ExtractionError, LeadExtractor};
use meli_server::voice::{
    AgentDefinition, AgentHandle, LlmDefinition, LlmHandle, PhoneNumber, VoiceError,
    VoicePlatform,
};
use meli_server::{router, AppState};
use mock_server::MockStore;
use secrecy::SecretString;
use serde_json::{json, Map, Value};
use tower::ServiceExt;

const TOKEN: &str = "endpoint-token";

enum Extraction {
    Lead(ExtractedLead),
    Nothing,
    Fail,
}

struct CannedExtractor {
    outcome: Extraction,
    transcripts: Mutex<Vec<String>>,
}

#[async_trait]
impl LeadExtractor for CannedExtractor {
    async fn extract(&self, transcript: &str) -> Result<Option<ExtractedLead>, ExtractionError> {
        self.transcripts.lock().unwrap().push(transcript.to_string());
        match &self.outcome {
            Extraction::Lead(lead) => Ok(Some(lead.clone())),
            Extraction::Nothing => Ok(None),
            Extraction::Fail => Err(ExtractionError::Api {
                status: 429,
                body: "rate limited".to_string(),
            }),
        }
    }
}

#[derive(Default)]
struct RecordingVoice {
    fail_agent: bool,
    calls: Mutex<Vec<Value>>,
}

#[async_trait]
impl VoicePlatform for RecordingVoice {
    async fn create_llm(&self, definition: &LlmDefinition) -> Result<LlmHandle, VoiceError> {
        self.calls
            .lock()
            .unwrap()
            .push(json!({"llm": serde_json::to_value(definition).unwrap()}));
        Ok(LlmHandle {
            llm_id: "llm_1".to_string(),
            llm_websocket_url: "wss://voice.test/llm_1".to_string(),
        })
    }

    async fn create_agent(&self, definition: &AgentDefinition) -> Result<AgentHandle, VoiceError> {
        self.calls
            .lock()
            .unwrap()
            .push(json!({"agent": serde_json::to_value(definition).unwrap()}));
        if self.fail_agent {
            return Err(VoiceError::Api {
                endpoint: "create-agent",
                status: 500,
                body: "boom".to_string(),
            });
        }
        Ok(AgentHandle {
            agent_id: "agent_1".to_string(),
        })
    }

    async fn create_phone_number(&self, agent_id: &str) -> Result<PhoneNumber, VoiceError> {
        self.calls.lock().unwrap().push(json!({"phone": agent_id}));
        Ok(PhoneNumber {
            phone_number: "+14155550100".to_string(),
            agent_id: Some(agent_id.to_string()),
            extra: Map::new(),
        })
    }
}

fn lead() -> ExtractedLead {
    ExtractedLead {
        address: "12 Elm St".to_string(),
        appointment_date: "2024-06-01T10:00:00Z".to_string(),
        number_of_rooms: 3.0,
        quote_price: 1200.0,
        square_footage: 500.0,
        service_type: "interior".to_string(),
    }
}

struct Harness {
    store: MockStore,
    extractor: Arc<CannedExtractor>,
    voice: Arc<RecordingVoice>,
    state: AppState,
}

async fn harness(outcome: Extraction, voice: RecordingVoice) -> Harness {
    let store = MockStore::with_token(TOKEN);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(mock_server::run_with_store(listener, store.clone()));

    let config = RecordStoreConfig::new(DeploymentMode::Development, TOKEN)
        .with_base_url(&format!("http://{addr}"));
    let extractor = Arc::new(CannedExtractor {
        outcome,
        transcripts: Mutex::new(Vec::new()),
    });
    let voice = Arc::new(voice);
    let state = AppState {
        records: Arc::new(RecordClient::new(&config, ReqwestTransport::default())),
        extractor: extractor.clone(),
        voice: voice.clone(),
        cal_api_key: SecretString::from("cal_test"),
        default_voice_id: "11labs-Adrian".to_string(),
    };
    Harness {
        store,
        extractor,
        voice,
        state,
    }
}

async fn seed_agent(store: &MockStore, agent_id: &str, owner: &str) -> String {
    store
        .insert(
            "agent",
            json!({
                "agent_id_text": agent_id,
                "owner_user": owner,
                "agent_name_text": "Kevin",
                "company_name_text": "San Francisco Home Painters"
            }),
        )
        .await
}

fn post(uri: &str, body: &str) -> Request<String> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(http::header::CONTENT_TYPE, "application/json")
        .body(body.to_string())
        .unwrap()
}

async fn body_string(response: axum::response::Response) -> String {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    String::from_utf8(bytes.to_vec()).unwrap()
}

fn call_ended(agent_id: &str) -> String {
    json!({
        "event": "call_ended",
        "data": {
            "agent_id": agent_id,
            "call_id": "call_1",
            "transcript": "Agent: Hi, this is Kevin. User: I need my living room painted."
        }
    })
    .to_string()
}

// --- webhook ---

#[tokio::test]
async fn call_ended_creates_lead_for_agent_owner() {
    let h = harness(Extraction::Lead(lead()), RecordingVoice::default()).await;
    seed_agent(&h.store, "agent_other", "owner_2").await;
    let agent_record_id = seed_agent(&h.store, "agent_7f1c", "owner_1").await;

    let resp = router(h.state.clone())
        .oneshot(post("/api/webhook", &call_ended("agent_7f1c")))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(body_string(resp).await, "OK");

    let leads = h.store.records("lead").await;
    assert_eq!(leads.len(), 1);
    let lead = &leads[0];
    assert_eq!(lead["owner_user"], "owner_1");
    assert_eq!(lead["agent_custom_agent"], agent_record_id.as_str());
    assert_eq!(lead["service_address_text"], "12 Elm St");
    assert_eq!(lead["appointment_date_date"], "2024-06-01T10:00:00Z");
    assert_eq!(lead["num_rooms_number"], 3.0);
    assert_eq!(lead["quote_price_number"], 1200.0);
    assert_eq!(lead["service_type1_text"], "interior");
    assert_eq!(lead["square_footage_number"], 500.0);

    assert_eq!(
        h.extractor.transcripts.lock().unwrap().as_slice(),
        ["Agent: Hi, this is Kevin. User: I need my living room painted."]
    );

    let lookup = &h.store.requests().await[0];
    assert_eq!(lookup.record_type, "agent");
    assert_eq!(
        lookup.constraints.as_deref(),
        Some(r#"[{"key":"agent_id_text","constraint_type":"equals","value":"agent_7f1c"}]"#)
    );
}

#[tokio::test]
async fn other_events_are_acknowledged_and_ignored() {
    let h = harness(Extraction::Lead(lead()), RecordingVoice::default()).await;

    let body = json!({"event": "call_started", "data": {"agent_id": "agent_7f1c"}}).to_string();
    let resp = router(h.state.clone())
        .oneshot(post("/api/webhook", &body))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert!(h.store.requests().await.is_empty());
    assert!(h.extractor.transcripts.lock().unwrap().is_empty());
}

#[tokio::test]
async fn no_extracted_lead_creates_nothing() {
    let h = harness(Extraction::Nothing, RecordingVoice::default()).await;
    seed_agent(&h.store, "agent_7f1c", "owner_1").await;

    let resp = router(h.state.clone())
        .oneshot(post("/api/webhook", &call_ended("agent_7f1c")))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert!(h.store.records("lead").await.is_empty());
}

#[tokio::test]
async fn unknown_agent_fails_without_extraction() {
    let h = harness(Extraction::Lead(lead()), RecordingVoice::default()).await;

    let resp = router(h.state.clone())
        .oneshot(post("/api/webhook", &call_ended("agent_missing")))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body_string(resp).await, FAILURE_BODY);
    assert!(h.extractor.transcripts.lock().unwrap().is_empty());
    assert!(h.store.records("lead").await.is_empty());
}

#[tokio::test]
async fn extraction_failure_is_500() {
    let h = harness(Extraction::Fail, RecordingVoice::default()).await;
    seed_agent(&h.store, "agent_7f1c", "owner_1").await;

    let resp = router(h.state.clone())
        .oneshot(post("/api/webhook", &call_ended("agent_7f1c")))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert!(h.store.records("lead").await.is_empty());
}

#[tokio::test]
async fn call_ended_without_transcript_is_400() {
    let h = harness(Extraction::Lead(lead()), RecordingVoice::default()).await;

    let body = json!({"event": "call_ended", "data": {"agent_id": "agent_7f1c"}}).to_string();
    let resp = router(h.state.clone())
        .oneshot(post("/api/webhook", &body))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert!(h.store.requests().await.is_empty());
}

#[tokio::test]
async fn event_without_name_is_400() {
    let h = harness(Extraction::Lead(lead()), RecordingVoice::default()).await;

    let body = json!({"data": {"agent_id": "agent_7f1c", "transcript": "t"}}).to_string();
    let resp = router(h.state.clone())
        .oneshot(post("/api/webhook", &body))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert!(body_string(resp).await.contains("missing field `event`"));
    assert!(h.store.requests().await.is_empty());
}

#[tokio::test]
async fn non_json_webhook_body_is_400() {
    let h = harness(Extraction::Lead(lead()), RecordingVoice::default()).await;

    let resp = router(h.state.clone())
        .oneshot(post("/api/webhook", "event=call_ended"))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert!(h.store.requests().await.is_empty());
}

#[tokio::test]
async fn webhook_accepts_body_without_content_type() {
    let h = harness(Extraction::Lead(lead()), RecordingVoice::default()).await;
    seed_agent(&h.store, "agent_7f1c", "owner_1").await;

    let request = Request::builder()
        .method("POST")
        .uri("/api/webhook")
        .body(call_ended("agent_7f1c"))
        .unwrap();
    let resp = router(h.state.clone()).oneshot(request).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(h.store.records("lead").await.len(), 1);
}

#[tokio::test]
async fn malformed_webhook_with_wrong_content_type_is_400() {
    let h = harness(Extraction::Lead(lead()), RecordingVoice::default()).await;

    let request = Request::builder()
        .method("POST")
        .uri("/api/webhook")
        .header(http::header::CONTENT_TYPE, "text/plain")
        .body("{\"data\": {}}".to_string())
        .unwrap();
    let resp = router(h.state.clone()).oneshot(request).await.unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

// --- provisioning ---

#[tokio::test]
async fn provision_with_empty_body_uses_defaults() {
    let h = harness(Extraction::Nothing, RecordingVoice::default()).await;

    let resp = router(h.state.clone())
        .oneshot(post("/api/retell", ""))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let phone: Value = serde_json::from_str(&body_string(resp).await).unwrap();
    assert_eq!(phone, json!({"phone_number": "+14155550100", "agent_id": "agent_1"}));

    let calls = h.voice.calls.lock().unwrap().clone();
    assert_eq!(calls.len(), 3);
    let llm = &calls[0]["llm"];
    assert_eq!(
        llm["begin_message"],
        "Hi, this is Kevin from San Francisco Home Painters, how can I help you?"
    );
    assert_eq!(llm["states"][1]["tools"][0]["cal_api_key"], "cal_test");
    assert_eq!(llm["states"][1]["tools"][0]["event_type_id"], 619319);
    assert_eq!(
        calls[1]["agent"],
        json!({
            "llm_websocket_url": "wss://voice.test/llm_1",
            "voice_id": "11labs-Adrian",
            "agent_name": "Kevin"
        })
    );
    assert_eq!(calls[2]["phone"], "agent_1");
}

#[tokio::test]
async fn provision_applies_overrides() {
    let h = harness(Extraction::Nothing, RecordingVoice::default()).await;

    let body = json!({"agent_name": "Ava", "company_name": "Oak Painting", "event_type_id": 7})
        .to_string();
    let resp = router(h.state.clone())
        .oneshot(post("/api/retell", &body))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let calls = h.voice.calls.lock().unwrap().clone();
    assert_eq!(
        calls[0]["llm"]["begin_message"],
        "Hi, this is Ava from Oak Painting, how can I help you?"
    );
    assert_eq!(calls[0]["llm"]["states"][1]["tools"][1]["event_type_id"], 7);
    assert_eq!(calls[1]["agent"]["agent_name"], "Ava");
}

#[tokio::test]
async fn provision_stops_at_failing_step() {
    let voice = RecordingVoice {
        fail_agent: true,
        ..RecordingVoice::default()
    };
    let h = harness(Extraction::Nothing, voice).await;

    let resp = router(h.state.clone())
        .oneshot(post("/api/retell", ""))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(h.voice.calls.lock().unwrap().len(), 2);
}

#[tokio::test]
async fn provision_rejects_malformed_body() {
    let h = harness(Extraction::Nothing, RecordingVoice::default()).await;

    let resp = router(h.state.clone())
        .oneshot(post("/api/retell", "{not json"))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert!(h.voice.calls.lock().unwrap().is_empty());
}

#[tokio::test]
async fn health_check_answers() {
    let h = harness(Extraction::Nothing, RecordingVoice::default()).await;
    let resp = router(h.state.clone())
        .oneshot(Request::builder().uri("/health").body(String::new()).unwrap())
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
}
