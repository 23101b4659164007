//! `POST /api/webhook`: post-call events from the voice platform.
//!
//! A `call_ended` event is turned into a lead: look up the agent that took
//! the call, have the language model pull the lead fields out of the
//! transcript, and store a `lead` record owned by the agent's owner.

use axum::{body::Bytes, extract::State};
use meli_core::Constraint;
use serde::Deserialize;
use serde_json::Value;
use tracing::info;

use crate::error::AppError;
use crate::models::{AgentFields, NewLead, AGENT_TYPE, LEAD_TYPE};
use crate::AppState;

pub const CALL_ENDED: &str = "call_ended";

#[derive(Debug, Deserialize)]
pub struct CallEvent {
    pub event: String,
    #[serde(default)]
    pub data: Value,
}

#[derive(Debug, Deserialize)]
pub struct CallEnded {
    pub agent_id: String,
    pub transcript: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallOutcome {
    Ignored,
    NoLead,
    LeadCreated(String),
}

/// Any undecodable body is `InvalidPayload`, whatever its content type.
pub async fn handle_webhook(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<&'static str, AppError> {
    let event: CallEvent =
        serde_json::from_slice(&body).map_err(|e| AppError::InvalidPayload(e.to_string()))?;
    process_event(&state, event).await?;
    Ok("OK")
}

pub async fn process_event(state: &AppState, event: CallEvent) -> Result<CallOutcome, AppError> {
    if event.event != CALL_ENDED {
        info!(event = %event.event, "ignoring call event");
        return Ok(CallOutcome::Ignored);
    }
    let call: CallEnded =
        serde_json::from_value(event.data).map_err(|e| AppError::InvalidPayload(e.to_string()))?;
    process_call_ended(state, call).await
}

pub async fn process_call_ended(
    state: &AppState,
    call: CallEnded,
) -> Result<CallOutcome, AppError> {
    info!(
        agent_id = %call.agent_id,
        transcript_chars = call.transcript.len(),
        "call ended"
    );

    let agents = state
        .records
        .list_all::<AgentFields>(
            AGENT_TYPE,
            &[Constraint::equals("agent_id_text", call.agent_id.as_str())],
        )
        .await?;
    let agent = agents
        .into_iter()
        .next()
        .ok_or_else(|| AppError::UnknownAgent(call.agent_id.clone()))?;

    let Some(extracted) = state.extractor.extract(&call.transcript).await? else {
        info!(agent_id = %call.agent_id, "no lead extracted from call");
        return Ok(CallOutcome::NoLead);
    };

    let lead = NewLead::for_agent(&agent, extracted);
    let id = state.records.create(LEAD_TYPE, &lead).await?;
    info!(agent_id = %call.agent_id, lead_id = %id, "lead created");
    Ok(CallOutcome::LeadCreated(id))
}
