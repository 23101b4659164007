//! Voice-agent platform client.
//!
//! # Design
//! Provisioning is three dependent calls: a response-engine LLM carrying the
//! conversation script, an agent bound to that LLM's websocket, and a phone
//! number bound to the agent. `VoicePlatform` is the seam the provisioning
//! endpoint talks to; `RetellClient` is the HTTP implementation.

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::debug;

use crate::config::VoiceConfig;

/// Conversation script for the platform's LLM response engine.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LlmDefinition {
    pub general_prompt: String,
    pub begin_message: String,
    pub starting_state: String,
    pub general_tools: Vec<Tool>,
    pub states: Vec<ConversationState>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConversationState {
    pub name: String,
    pub state_prompt: String,
    pub edges: Vec<Edge>,
    pub tools: Vec<Tool>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Edge {
    pub destination_state_name: String,
    pub description: String,
}

/// Actions the voice agent can take during a call.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Tool {
    EndCall {
        name: String,
        description: String,
    },
    CheckAvailabilityCal {
        name: String,
        description: String,
        cal_api_key: String,
        event_type_id: u64,
    },
    BookAppointmentCal {
        name: String,
        description: String,
        cal_api_key: String,
        event_type_id: u64,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AgentDefinition {
    pub llm_websocket_url: String,
    pub voice_id: String,
    pub agent_name: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct LlmHandle {
    pub llm_id: String,
    pub llm_websocket_url: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct AgentHandle {
    pub agent_id: String,
}

/// Phone number as reported by the platform; unknown fields pass through.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhoneNumber {
    pub phone_number: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent_id: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Error)]
pub enum VoiceError {
    #[error("voice platform returned HTTP {status} for {endpoint}: {body}")]
    Api {
        endpoint: &'static str,
        status: u16,
        body: String,
    },
    #[error("voice platform response from {endpoint} did not decode: {message}")]
    Decode {
        endpoint: &'static str,
        message: String,
    },
    #[error("voice platform request failed: {0}")]
    Http(#[from] reqwest::Error),
}

#[async_trait]
pub trait VoicePlatform: Send + Sync {
    async fn create_llm(&self, definition: &LlmDefinition) -> Result<LlmHandle, VoiceError>;
    async fn create_agent(&self, definition: &AgentDefinition) -> Result<AgentHandle, VoiceError>;
    async fn create_phone_number(&self, agent_id: &str) -> Result<PhoneNumber, VoiceError>;
}

pub struct RetellClient {
    client: reqwest::Client,
    base_url: String,
    api_key: SecretString,
}

impl RetellClient {
    pub fn new(client: reqwest::Client, config: &VoiceConfig) -> Self {
        Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
        }
    }

    async fn post<B, R>(&self, endpoint: &'static str, body: &B) -> Result<R, VoiceError>
    where
        B: Serialize + Sync + ?Sized,
        R: DeserializeOwned,
    {
        debug!(endpoint, "voice platform request");
        let response = self
            .client
            .post(format!("{}/{endpoint}", self.base_url))
            .bearer_auth(self.api_key.expose_secret())
            .json(body)
            .send()
            .await?;
        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(VoiceError::Api {
                endpoint,
                status: status.as_u16(),
                body,
            });
        }
        serde_json::from_str(&body).map_err(|e| VoiceError::Decode {
            endpoint,
            message: e.to_string(),
        })
    }
}

#[async_trait]
impl VoicePlatform for RetellClient {
    async fn create_llm(&self, definition: &LlmDefinition) -> Result<LlmHandle, VoiceError> {
        self.post("create-retell-llm", definition).await
    }

    async fn create_agent(&self, definition: &AgentDefinition) -> Result<AgentHandle, VoiceError> {
        self.post("create-agent", definition).await
    }

    async fn create_phone_number(&self, agent_id: &str) -> Result<PhoneNumber, VoiceError> {
        self.post("create-phone-number", &serde_json::json!({ "agent_id": agent_id }))
            .await
    }
}
