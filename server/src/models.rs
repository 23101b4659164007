//! Record shapes the endpoints read from and write to the record store.

use meli_core::Record;
use serde::{Deserialize, Serialize};

use crate::extract::ExtractedLead;

pub const AGENT_TYPE: &str = "agent";
pub const LEAD_TYPE: &str = "lead";

/// Caller fields of an `agent` record. The store omits empty fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentFields {
    pub agent_id_text: String,
    #[serde(default)]
    pub owner_user: Option<String>,
    #[serde(default)]
    pub agent_name_text: Option<String>,
    #[serde(default)]
    pub company_name_text: Option<String>,
    #[serde(default)]
    pub phone_number_text: Option<String>,
    #[serde(default)]
    pub cal_api_key_text: Option<String>,
    #[serde(default)]
    pub cal_event_id_number: Option<f64>,
}

/// Caller fields of a `lead` record, as written after a call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewLead {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner_user: Option<String>,
    pub service_address_text: String,
    pub agent_custom_agent: String,
    pub appointment_date_date: String,
    pub num_rooms_number: f64,
    pub quote_price_number: f64,
    pub service_type1_text: String,
    pub square_footage_number: f64,
}

impl NewLead {
    /// Attach an extracted lead to the agent that took the call.
    pub fn for_agent(agent: &Record<AgentFields>, lead: ExtractedLead) -> Self {
        Self {
            owner_user: agent.fields.owner_user.clone(),
            service_address_text: lead.address,
            agent_custom_agent: agent.id.clone(),
            appointment_date_date: lead.appointment_date,
            num_rooms_number: lead.number_of_rooms,
            quote_price_number: lead.quote_price,
            service_type1_text: lead.service_type,
            square_footage_number: lead.square_footage,
        }
    }
}
