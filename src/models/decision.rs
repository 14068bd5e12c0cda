use serde::{Deserialize, Serialize};

use crate::models::AppointmentDetails;

/// Structured routing decision returned by the LLM for one caller utterance.
/// Field names match the JSON contract the oracle is prompted to emit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoutingDecision {
    /// "schedule" or "conversation".
    pub route: String,
    pub response_text: String,
    #[serde(rename = "nextState", default)]
    pub next_state: Option<String>,
    #[serde(default)]
    pub check_availability: bool,
    /// Full appointment request, present once the oracle decides availability
    /// should be checked.
    #[serde(default)]
    pub appointment_details: Option<AppointmentDetails>,
    /// The oracle's view of everything gathered so far; merged into the
    /// session's details field-wise.
    #[serde(rename = "collectedDetails", default)]
    pub collected_details: Option<AppointmentDetails>,
    /// Only present when the oracle wants to flip the confirmed flag, e.g.
    /// when a caller reopens a confirmed booking to switch staff.
    #[serde(rename = "bookingConfirmed", default)]
    pub booking_confirmed: Option<bool>,
}

impl RoutingDecision {
    pub fn wants_scheduling(&self) -> bool {
        self.route == "schedule" && self.check_availability
    }
}
