//! `POST /api/retell`: stand up a voice agent with a phone number.

use axum::{body::Bytes, extract::State, Json};
use secrecy::ExposeSecret;
use serde::Deserialize;
use tracing::info;

use crate::error::AppError;
use crate::voice::{
    AgentDefinition, ConversationState, Edge, LlmDefinition, PhoneNumber, Tool, VoiceError,
    VoicePlatform,
};
use crate::AppState;

pub const DEFAULT_AGENT_NAME: &str = "Kevin";
pub const DEFAULT_COMPANY_NAME: &str = "San Francisco Home Painters";
pub const DEFAULT_EVENT_TYPE_ID: u64 = 619319;

const COLLECT_SQUARE_FOOTAGE: &str = "collect_square_footage";
const APPOINTMENT_BOOKING: &str = "appointment_booking";

/// Optional overrides for a provisioning request. Every field has a default.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProvisionRequest {
    pub agent_name: Option<String>,
    pub company_name: Option<String>,
    pub voice_id: Option<String>,
    pub event_type_id: Option<u64>,
}

/// Two-state booking script: collect square footage, then book a
/// consultation through the calendar tools.
pub fn booking_script(
    agent_name: &str,
    company_name: &str,
    cal_api_key: &str,
    event_type_id: u64,
) -> LlmDefinition {
    let calendar_tool = |check: bool| {
        if check {
            Tool::CheckAvailabilityCal {
                name: "check_availability".to_string(),
                description: "Check the availability of the painting company you work for."
                    .to_string(),
                cal_api_key: cal_api_key.to_string(),
                event_type_id,
            }
        } else {
            Tool::BookAppointmentCal {
                name: "book_appointment".to_string(),
                description: "Book an appointment for an initial consultation.".to_string(),
                cal_api_key: cal_api_key.to_string(),
                event_type_id,
            }
        }
    };

    LlmDefinition {
        general_prompt: "You're a front desk person for a painting company. Your job is to \
            schedule an initial home consultation with clients who call in. You should ask them \
            for the date/time that works best for them. You should also ask them the size of the \
            room they want painted and provide a quote based on that information."
            .to_string(),
        begin_message: format!("Hi, this is {agent_name} from {company_name}, how can I help you?"),
        starting_state: COLLECT_SQUARE_FOOTAGE.to_string(),
        general_tools: vec![Tool::EndCall {
            name: "end_call".to_string(),
            description: "Hang up the call, triggered only after appointment successfully scheduled."
                .to_string(),
        }],
        states: vec![
            ConversationState {
                name: COLLECT_SQUARE_FOOTAGE.to_string(),
                state_prompt: format!(
                    "You will collect the square footage of the area to be painted. After the \
                     user has provided their square footage, transition to {APPOINTMENT_BOOKING}."
                ),
                edges: vec![Edge {
                    destination_state_name: APPOINTMENT_BOOKING.to_string(),
                    description: "Transition to book an appointment when square footage has been \
                        collected."
                        .to_string(),
                }],
                tools: Vec::new(),
            },
            ConversationState {
                name: APPOINTMENT_BOOKING.to_string(),
                state_prompt:
                    "You will book an appointment for an initial consultation with the client."
                        .to_string(),
                edges: Vec::new(),
                tools: vec![calendar_tool(true), calendar_tool(false)],
            },
        ],
    }
}

/// Create the LLM, then the agent, then its phone number. Stops at the first
/// failing step.
pub async fn provision(
    voice: &dyn VoicePlatform,
    request: &ProvisionRequest,
    cal_api_key: &str,
    default_voice_id: &str,
) -> Result<PhoneNumber, VoiceError> {
    let agent_name = request.agent_name.as_deref().unwrap_or(DEFAULT_AGENT_NAME);
    let company_name = request.company_name.as_deref().unwrap_or(DEFAULT_COMPANY_NAME);
    let script = booking_script(
        agent_name,
        company_name,
        cal_api_key,
        request.event_type_id.unwrap_or(DEFAULT_EVENT_TYPE_ID),
    );

    let llm = voice.create_llm(&script).await?;
    let agent = voice
        .create_agent(&AgentDefinition {
            llm_websocket_url: llm.llm_websocket_url,
            voice_id: request
                .voice_id
                .clone()
                .unwrap_or_else(|| default_voice_id.to_string()),
            agent_name: agent_name.to_string(),
        })
        .await?;
    let phone = voice.create_phone_number(&agent.agent_id).await?;

    info!(
        llm_id = %llm.llm_id,
        agent_id = %agent.agent_id,
        phone_number = %phone.phone_number,
        "voice agent provisioned"
    );
    Ok(phone)
}

pub async fn handle_provision(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<PhoneNumber>, AppError> {
    let request: ProvisionRequest = if body.iter().all(u8::is_ascii_whitespace) {
        ProvisionRequest::default()
    } else {
        serde_json::from_slice(&body).map_err(|e| AppError::InvalidPayload(e.to_string()))?
    };
    let phone = provision(
        state.voice.as_ref(),
        &request,
        state.cal_api_key.expose_secret(),
        &state.default_voice_id,
    )
    .await?;
    Ok(Json(phone))
}
