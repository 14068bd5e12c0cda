use crate::config::BusinessProfile;
use crate::models::{CallSession, CallStage, CallTurn, RoutingDecision};
use crate::services::ai::router::route_utterance;
use crate::services::ai::LlmProvider;

const AFFIRMATIVE_KEYWORDS: &[&str] = &[
    "yes",
    "sure",
    "okay",
    "please",
    "i would like",
    "schedule with",
    "book with",
];

const NEGATIVE_KEYWORDS: &[&str] = &["no", "not", "don't", "decline"];

const DECLINE_REPLY: &str = "Alright, please suggest another time or staff member.";
const UNCLEAR_REPLY: &str = "I didn't understand. Please say yes or no.";

/// Drive one accepted transcript through the conversation. Returns the
/// utterance to speak now, or `None` when the turn only queues work (an
/// accepted proposal becomes a pending booking and the resolver announces
/// the outcome on the next tick).
pub async fn handle_transcript(
    llm: &dyn LlmProvider,
    business: &BusinessProfile,
    session: &mut CallSession,
    transcript: &str,
) -> Option<String> {
    // While a proposal is on the table the transcript is a yes/no answer,
    // never an oracle question.
    if session.awaiting_confirmation() {
        return handle_confirmation(session, transcript);
    }

    let decision = route_utterance(llm, business, session, transcript).await;
    tracing::info!(
        session = %session.id,
        route = %decision.route,
        check_availability = decision.check_availability,
        "oracle decision"
    );
    Some(apply_decision(session, transcript, decision))
}

/// Local keyword interpretation of the caller's answer to a pending
/// proposal: accept, decline, or re-prompt.
fn handle_confirmation(session: &mut CallSession, transcript: &str) -> Option<String> {
    let lower = transcript.to_lowercase();
    let staff_mentioned = session
        .pending_proposal()
        .map(|p| lower.contains(&p.staff.to_lowercase()))
        .unwrap_or(false);

    if AFFIRMATIVE_KEYWORDS.iter().any(|k| lower.contains(k)) || staff_mentioned {
        if let Some(proposal) = session.take_pending_proposal() {
            tracing::info!(session = %session.id, staff = %proposal.staff, "caller accepted proposal");
            session.set_pending_booking(proposal.into_details());
        }
        None
    } else if NEGATIVE_KEYWORDS.iter().any(|k| lower.contains(k)) {
        tracing::info!(session = %session.id, "caller declined proposal");
        session.clear_pending_proposal();
        session.clear_pending_booking();
        Some(DECLINE_REPLY.to_string())
    } else {
        tracing::info!(session = %session.id, "unclear answer to proposal");
        Some(UNCLEAR_REPLY.to_string())
    }
}

/// Apply an oracle decision to the session: stage transition, detail merge,
/// turn log, and (when asked) installing the pending booking request.
fn apply_decision(
    session: &mut CallSession,
    transcript: &str,
    decision: RoutingDecision,
) -> String {
    if let Some(stage) = decision
        .next_state
        .as_deref()
        .and_then(CallStage::from_label)
    {
        session.stage = stage;
    }

    if let Some(collected) = &decision.collected_details {
        session.details.merge(collected);
    }

    if let Some(confirmed) = decision.booking_confirmed {
        session.booking_confirmed = confirmed;
    }

    session.turns.push(CallTurn {
        question: transcript.to_string(),
        response: decision.response_text.clone(),
    });

    if decision.wants_scheduling() {
        let details = decision
            .appointment_details
            .clone()
            .unwrap_or_else(|| session.details.clone());
        session.set_pending_booking(details);
    }

    decision.response_text
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AppointmentDetails, ProposalReason, SchedulingProposal};

    fn session() -> CallSession {
        CallSession::new("test".to_string())
    }

    fn proposal(staff: &str) -> SchedulingProposal {
        SchedulingProposal {
            staff: staff.to_string(),
            date: "2025-03-27".to_string(),
            time: "18:00".to_string(),
            duration: "60 minutes".to_string(),
            reason: ProposalReason::NextAvailableSlot,
        }
    }

    fn schedule_decision() -> RoutingDecision {
        RoutingDecision {
            route: "schedule".to_string(),
            response_text: "Let me check that for you.".to_string(),
            next_state: Some("Scheduling".to_string()),
            check_availability: true,
            appointment_details: Some(AppointmentDetails {
                date: Some("2025-03-27".to_string()),
                time: Some("17:00".to_string()),
                duration: Some("60 minutes".to_string()),
                staff: Some("Any".to_string()),
            }),
            collected_details: Some(AppointmentDetails {
                date: Some("2025-03-27".to_string()),
                time: Some("17:00".to_string()),
                duration: Some("60 minutes".to_string()),
                staff: Some("Any".to_string()),
            }),
            booking_confirmed: None,
        }
    }

    #[test]
    fn test_accept_proposal_by_keyword() {
        let mut s = session();
        s.set_pending_proposal(proposal("Angie"));

        let reply = handle_confirmation(&mut s, "Sure, that works");
        assert!(reply.is_none());
        assert!(!s.awaiting_confirmation());
        let pending = s.pending_booking().unwrap();
        assert_eq!(pending.staff.as_deref(), Some("Angie"));
        assert_eq!(pending.time.as_deref(), Some("18:00"));
    }

    #[test]
    fn test_accept_proposal_by_staff_name() {
        let mut s = session();
        s.set_pending_proposal(proposal("Bell"));

        let reply = handle_confirmation(&mut s, "with bell then");
        assert!(reply.is_none());
        assert!(s.pending_booking().is_some());
    }

    #[test]
    fn test_decline_proposal() {
        let mut s = session();
        s.set_pending_proposal(proposal("Angie"));

        let reply = handle_confirmation(&mut s, "No thanks");
        assert_eq!(reply.as_deref(), Some(DECLINE_REPLY));
        assert!(!s.awaiting_confirmation());
        assert!(s.pending_booking().is_none());
    }

    #[test]
    fn test_unclear_answer_reprompts_and_keeps_proposal() {
        let mut s = session();
        s.set_pending_proposal(proposal("Angie"));

        let reply = handle_confirmation(&mut s, "what was the price again");
        assert_eq!(reply.as_deref(), Some(UNCLEAR_REPLY));
        assert!(s.awaiting_confirmation());
    }

    #[test]
    fn test_apply_decision_installs_pending_booking() {
        let mut s = session();
        let reply = apply_decision(&mut s, "5pm today for an hour", schedule_decision());

        assert_eq!(reply, "Let me check that for you.");
        assert_eq!(s.stage, CallStage::Scheduling);
        assert!(s.pending_booking().is_some());
        assert_eq!(s.turns.len(), 1);
        assert_eq!(s.turns[0].question, "5pm today for an hour");
    }

    #[test]
    fn test_apply_decision_merge_is_monotonic() {
        let mut s = session();
        s.details.date = Some("2025-03-27".to_string());
        s.details.duration = Some("60 minutes".to_string());

        let mut decision = schedule_decision();
        decision.check_availability = false;
        decision.appointment_details = None;
        decision.collected_details = Some(AppointmentDetails {
            time: Some("17:00".to_string()),
            ..Default::default()
        });

        apply_decision(&mut s, "5pm", decision);
        assert_eq!(s.details.date.as_deref(), Some("2025-03-27"));
        assert_eq!(s.details.duration.as_deref(), Some("60 minutes"));
        assert_eq!(s.details.time.as_deref(), Some("17:00"));
    }

    #[test]
    fn test_apply_decision_unknown_stage_label_holds_stage() {
        let mut s = session();
        s.stage = CallStage::Scheduling;

        let mut decision = schedule_decision();
        decision.check_availability = false;
        decision.next_state = Some("Interpretive Dance".to_string());

        apply_decision(&mut s, "hm", decision);
        assert_eq!(s.stage, CallStage::Scheduling);
    }

    #[test]
    fn test_apply_decision_booking_confirmed_override() {
        let mut s = session();
        s.booking_confirmed = true;

        let mut decision = schedule_decision();
        decision.booking_confirmed = Some(false);

        apply_decision(&mut s, "I'd rather wait for Angie", decision);
        assert!(!s.booking_confirmed);
    }
}
