use serde::{Deserialize, Serialize};

use crate::models::{AppointmentDetails, SchedulingProposal};

/// Conversational stage of the call, as steered by the routing oracle.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub enum CallStage {
    InitialGreeting,
    GeneralInquiry,
    Scheduling,
    BookingConfirmed,
    Goodbye,
}

impl CallStage {
    pub fn label(&self) -> &'static str {
        match self {
            CallStage::InitialGreeting => "Initial Greeting",
            CallStage::GeneralInquiry => "General Inquiry",
            CallStage::Scheduling => "Scheduling",
            CallStage::BookingConfirmed => "Booking Confirmed",
            CallStage::Goodbye => "Goodbye",
        }
    }

    pub fn from_label(s: &str) -> Option<Self> {
        match s {
            "Initial Greeting" => Some(CallStage::InitialGreeting),
            "General Inquiry" => Some(CallStage::GeneralInquiry),
            "Scheduling" => Some(CallStage::Scheduling),
            "Booking Confirmed" => Some(CallStage::BookingConfirmed),
            "Goodbye" => Some(CallStage::Goodbye),
            _ => None,
        }
    }
}

/// One question/response exchange, kept for oracle context.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallTurn {
    pub question: String,
    pub response: String,
}

/// All mutable state for one active phone call. Owned exclusively by the
/// session's own task and destroyed when the connection closes.
#[derive(Debug)]
pub struct CallSession {
    /// Internal id for log correlation, assigned before Twilio sends the
    /// stream identifier.
    pub id: String,
    /// Stream token from the telephony `start` event; echoed on every
    /// outbound media frame.
    pub stream_sid: Option<String>,
    pub stage: CallStage,
    pub details: AppointmentDetails,
    pub booking_confirmed: bool,
    pending_booking: Option<AppointmentDetails>,
    pending_proposal: Option<SchedulingProposal>,
    /// Outbound playback in progress; inbound capture is suppressed.
    pub ai_speaking: bool,
    /// A calendar resolution is outstanding; blocks a second one.
    pub booking_in_flight: bool,
    pub turns: Vec<CallTurn>,
}

impl CallSession {
    pub fn new(id: String) -> Self {
        Self {
            id,
            stream_sid: None,
            stage: CallStage::InitialGreeting,
            details: AppointmentDetails::default(),
            booking_confirmed: false,
            pending_booking: None,
            pending_proposal: None,
            ai_speaking: false,
            booking_in_flight: false,
            turns: Vec::new(),
        }
    }

    // A pending booking and a pending proposal are mutually exclusive, so
    // installing either clears the other.

    pub fn set_pending_booking(&mut self, details: AppointmentDetails) {
        self.pending_proposal = None;
        self.pending_booking = Some(details);
    }

    pub fn set_pending_proposal(&mut self, proposal: SchedulingProposal) {
        self.pending_booking = None;
        self.pending_proposal = Some(proposal);
    }

    pub fn clear_pending_booking(&mut self) {
        self.pending_booking = None;
    }

    pub fn clear_pending_proposal(&mut self) {
        self.pending_proposal = None;
    }

    pub fn take_pending_proposal(&mut self) -> Option<SchedulingProposal> {
        self.pending_proposal.take()
    }

    pub fn pending_booking(&self) -> Option<&AppointmentDetails> {
        self.pending_booking.as_ref()
    }

    pub fn pending_proposal(&self) -> Option<&SchedulingProposal> {
        self.pending_proposal.as_ref()
    }

    /// A proposal is on the table and the next transcript is interpreted as
    /// accept/decline instead of going to the oracle.
    pub fn awaiting_confirmation(&self) -> bool {
        self.pending_proposal.is_some()
    }

    /// Session teardown on disconnect.
    pub fn reset(&mut self) {
        self.stage = CallStage::InitialGreeting;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ProposalReason;

    fn proposal() -> SchedulingProposal {
        SchedulingProposal {
            staff: "Angie".to_string(),
            date: "2025-03-27".to_string(),
            time: "18:00".to_string(),
            duration: "60 minutes".to_string(),
            reason: ProposalReason::NextAvailableSlot,
        }
    }

    #[test]
    fn test_stage_label_round_trip() {
        for stage in [
            CallStage::InitialGreeting,
            CallStage::GeneralInquiry,
            CallStage::Scheduling,
            CallStage::BookingConfirmed,
            CallStage::Goodbye,
        ] {
            assert_eq!(CallStage::from_label(stage.label()), Some(stage));
        }
        assert_eq!(CallStage::from_label("Hold Music"), None);
    }

    #[test]
    fn test_pending_booking_and_proposal_are_exclusive() {
        let mut session = CallSession::new("test".to_string());

        session.set_pending_booking(AppointmentDetails::default());
        assert!(session.pending_booking().is_some());
        assert!(!session.awaiting_confirmation());

        session.set_pending_proposal(proposal());
        assert!(session.pending_booking().is_none());
        assert!(session.awaiting_confirmation());

        session.set_pending_booking(AppointmentDetails::default());
        assert!(session.pending_proposal().is_none());
    }

    #[test]
    fn test_reset_returns_to_greeting() {
        let mut session = CallSession::new("test".to_string());
        session.stage = CallStage::BookingConfirmed;
        session.reset();
        assert_eq!(session.stage, CallStage::InitialGreeting);
    }
}
