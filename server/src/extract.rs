//! Lead extraction from call transcripts through a chat-completion API.
//!
//! The model is forced to call a single `create_lead` function whose JSON
//! schema lists the six fields of a lead; the function arguments are the
//! extraction result.

use async_trait::async_trait;
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use thiserror::Error;
use tracing::{debug, warn};

use crate::config::OpenAiConfig;

const TOOL_NAME: &str = "create_lead";

const SYSTEM_PROMPT: &str = "\
You will be provided with a transcript of the phone call between customer and an agent at a painting company.
The customer is booking an appointment for a painting service and requesting a quote.
Your job is to extract the following information from the transcript and create a new lead in the system:
- Address of the property
- Appointment date
- Number of rooms to be painted
- Agreed-upon price quote for the service
- Type of painting service requested (interior or exterior)
- Square footage of the property

If you are unable to extract any of the information, please leave it blank.";

/// Structured data pulled out of one call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractedLead {
    pub address: String,
    pub appointment_date: String,
    pub number_of_rooms: f64,
    pub quote_price: f64,
    pub square_footage: f64,
    pub service_type: String,
}

#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("chat completion returned HTTP {status}: {body}")]
    Api { status: u16, body: String },
    #[error("chat completion body did not decode: {0}")]
    Decode(String),
    #[error("chat completion request failed: {0}")]
    Http(#[from] reqwest::Error),
}

#[async_trait]
pub trait LeadExtractor: Send + Sync {
    /// `Ok(None)` when the transcript does not yield a complete lead.
    async fn extract(&self, transcript: &str) -> Result<Option<ExtractedLead>, ExtractionError>;
}

pub struct OpenAiExtractor {
    client: reqwest::Client,
    config: OpenAiConfig,
}

impl OpenAiExtractor {
    pub fn new(client: reqwest::Client, config: OpenAiConfig) -> Self {
        Self { client, config }
    }
}

#[async_trait]
impl LeadExtractor for OpenAiExtractor {
    async fn extract(&self, transcript: &str) -> Result<Option<ExtractedLead>, ExtractionError> {
        let mut request = self
            .client
            .post(format!("{}/chat/completions", self.config.base_url))
            .bearer_auth(self.config.api_key.expose_secret())
            .json(&completion_request(&self.config.model, transcript));
        if let Some(org) = &self.config.organization {
            request = request.header("OpenAI-Organization", org);
        }

        let response = request.send().await?;
        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(ExtractionError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let completion: Value =
            serde_json::from_str(&body).map_err(|e| ExtractionError::Decode(e.to_string()))?;
        let lead = lead_from_completion(&completion);
        if lead.is_none() {
            warn!(model = %self.config.model, "completion did not yield a complete lead");
        }
        Ok(lead)
    }
}

/// Chat-completion payload forcing a `create_lead` call.
pub fn completion_request(model: &str, transcript: &str) -> Value {
    json!({
        "model": model,
        "messages": [
            {"role": "system", "content": SYSTEM_PROMPT},
            {"role": "user", "content": transcript},
        ],
        "tools": [create_lead_tool()],
        "tool_choice": {"type": "function", "function": {"name": TOOL_NAME}},
    })
}

fn create_lead_tool() -> Value {
    json!({
        "type": "function",
        "function": {
            "name": TOOL_NAME,
            "description": "Generate a new lead with the provided information",
            "parameters": {
                "type": "object",
                "properties": {
                    "address": {"type": "string", "description": "The address of the property"},
                    "appointment_date": {"type": "string", "description": "The date of the appointment"},
                    "number_of_rooms": {"type": "number", "description": "The number of rooms to be painted"},
                    "quote_price": {"type": "number", "description": "The agreed-upon price for the service"},
                    "service_type": {
                        "type": "string",
                        "description": "The type of painting service requested",
                        "enum": ["interior", "exterior"]
                    },
                    "square_footage": {"type": "number", "description": "The square footage of the property"}
                },
                "required": [
                    "address",
                    "appointment_date",
                    "number_of_rooms",
                    "quote_price",
                    "service_type",
                    "square_footage"
                ]
            }
        }
    })
}

/// Decode the first tool call's arguments. Anything missing or mistyped
/// yields `None`.
pub fn lead_from_completion(completion: &Value) -> Option<ExtractedLead> {
    let arguments = completion
        .pointer("/choices/0/message/tool_calls/0/function/arguments")?
        .as_str()?;
    match serde_json::from_str(arguments) {
        Ok(lead) => Some(lead),
        Err(e) => {
            debug!(error = %e, "tool call arguments did not match the lead schema");
            None
        }
    }
}
