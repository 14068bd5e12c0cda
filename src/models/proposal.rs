use serde::{Deserialize, Serialize};

use crate::models::AppointmentDetails;

/// Why an alternative was offered instead of the requested slot.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum ProposalReason {
    /// The requested time was taken; a later open slot is offered.
    NextAvailableSlot,
    /// Neither the slot nor a later one worked; the other staff member is
    /// offered at the originally requested time.
    AlternateStaff,
}

/// An alternative staff/time offer awaiting the caller's yes or no. Lives
/// only until accepted (promoted to a pending booking) or declined.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulingProposal {
    pub staff: String,
    pub date: String,
    pub time: String,
    pub duration: String,
    pub reason: ProposalReason,
}

impl SchedulingProposal {
    /// Promote an accepted proposal into a bookable appointment request.
    pub fn into_details(self) -> AppointmentDetails {
        AppointmentDetails {
            date: Some(self.date),
            time: Some(self.time),
            duration: Some(self.duration),
            staff: Some(self.staff),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_into_details() {
        let proposal = SchedulingProposal {
            staff: "Bell".to_string(),
            date: "2025-03-27".to_string(),
            time: "18:00".to_string(),
            duration: "60 minutes".to_string(),
            reason: ProposalReason::NextAvailableSlot,
        };

        let details = proposal.into_details();
        assert_eq!(details.staff.as_deref(), Some("Bell"));
        assert_eq!(details.date.as_deref(), Some("2025-03-27"));
        assert_eq!(details.time.as_deref(), Some("18:00"));
        assert_eq!(details.duration.as_deref(), Some("60 minutes"));
    }
}
