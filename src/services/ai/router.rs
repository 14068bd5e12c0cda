use chrono::Utc;

use crate::config::BusinessProfile;
use crate::models::{CallSession, RoutingDecision};
use crate::services::ai::{LlmProvider, Message};

const SYSTEM_PROMPT: &str = r#"You are "Aichi," an AI phone assistant for a massage business.

**Primary Goal:**
Schedule a massage appointment for the caller. You need three key details: date, time, and duration. Staff preference is optional. Use the "Collected details so far" to track what has been provided and ask only for what is missing, in a natural conversational way.

**Instructions:**
1. If the user said nothing, politely re-prompt or greet based on the state.
2. Recognize intents such as scheduling, pricing, hours, location, or general inquiries.
3. For scheduling:
   - Set "route" to "schedule".
   - Always include a "collectedDetails" object with fields: "date" ("YYYY-MM-DD" or null), "time" ("HH:MM" or null), "duration" ("XX minutes" or null), "staff" (a staff name, "Any", or null). Update it with new information from the user's speech; keep existing values if unchanged.
   - If the user's speech is ambiguous (e.g. "tomorrow" without a date), ask for clarification before updating "collectedDetails".
   - Once date, time, and duration are all set (staff can be "Any"), set "check_availability" to true and include "appointment_details" with the collected values.
4. For pricing inquiries, answer from the business data; if the user asks about an unlisted duration, suggest the closest option.
5. For all other questions, set "route" to "conversation".
6. Give a short, natural-sounding "response_text". Use natural time formats like "5 p.m." in responses, even though "time" in "collectedDetails" remains "HH:MM".
7. Suggest the next conversation state in "nextState": one of "Initial Greeting", "General Inquiry", "Scheduling", "Booking Confirmed", "Goodbye".

**Post-Booking:**
- If "Booking confirmed" is "Yes" and the user is satisfied or has no new request, acknowledge politely, set "nextState" to "Booking Confirmed" and "check_availability" to false.
- If "Booking confirmed" is "Yes" and the user wants different staff, set "bookingConfirmed" to false, update "staff" in "collectedDetails", and set "check_availability" to true.

Only respond in JSON format:
{
  "route": "schedule" | "conversation",
  "response_text": "...",
  "nextState": "...",
  "check_availability": false,
  "appointment_details": { "date": "YYYY-MM-DD", "time": "HH:MM", "duration": "XX minutes", "staff": "..." },
  "collectedDetails": { "date": "YYYY-MM-DD", "time": "HH:MM", "duration": "XX minutes", "staff": "..." },
  "bookingConfirmed": true/false // optional, only when changing booking status
}"#;

/// Ask the routing oracle what to do with one transcript. Never fails: any
/// transport or parse problem degrades to a fixed apology that holds the
/// session's current stage and details.
pub async fn route_utterance(
    llm: &dyn LlmProvider,
    business: &BusinessProfile,
    session: &CallSession,
    transcript: &str,
) -> RoutingDecision {
    let business_json =
        serde_json::to_string_pretty(business).unwrap_or_else(|_| "{}".to_string());
    let today = Utc::now().format("%Y-%m-%d");
    let system = format!("{SYSTEM_PROMPT}\n\nBusiness data:\n{business_json}\n\nCurrent date: {today}");

    let user = format!(
        "Current state: \"{}\"\n\
         Collected details so far:\n\
         - Date: {}\n\
         - Time: {}\n\
         - Duration: {}\n\
         - Staff: {}\n\
         User speech: \"{}\"\n\
         Booking confirmed: {}\n\
         Based on the user's speech, update the collected details and provide a response.",
        session.stage.label(),
        session.details.date.as_deref().unwrap_or("not provided"),
        session.details.time.as_deref().unwrap_or("not provided"),
        session.details.duration.as_deref().unwrap_or("not provided"),
        session.details.staff_preference(),
        transcript,
        if session.booking_confirmed { "Yes" } else { "No" },
    );

    // Prior turns give the oracle conversational context.
    let mut messages: Vec<Message> = Vec::new();
    for turn in &session.turns {
        messages.push(Message {
            role: "user".to_string(),
            content: turn.question.clone(),
        });
        messages.push(Message {
            role: "assistant".to_string(),
            content: turn.response.clone(),
        });
    }
    messages.push(Message {
        role: "user".to_string(),
        content: user,
    });

    match llm.chat(&system, &messages).await {
        Ok(raw) => match parse_decision(&raw) {
            Some(decision) => decision,
            None => {
                tracing::warn!(session = %session.id, "oracle returned unparseable decision");
                fallback_decision(session)
            }
        },
        Err(e) => {
            tracing::error!(session = %session.id, error = %e, "oracle call failed");
            fallback_decision(session)
        }
    }
}

fn fallback_decision(session: &CallSession) -> RoutingDecision {
    RoutingDecision {
        route: "conversation".to_string(),
        response_text: "I'm experiencing some issues. Could you try again shortly?".to_string(),
        next_state: Some(session.stage.label().to_string()),
        check_availability: false,
        appointment_details: None,
        collected_details: None,
        booking_confirmed: None,
    }
}

fn parse_decision(response: &str) -> Option<RoutingDecision> {
    // Try direct parse first
    if let Ok(decision) = serde_json::from_str::<RoutingDecision>(response) {
        return Some(decision);
    }

    // Strip markdown code fences
    let cleaned = response
        .trim()
        .strip_prefix("```json")
        .or_else(|| response.trim().strip_prefix("```"))
        .unwrap_or(response.trim());
    let cleaned = cleaned.strip_suffix("```").unwrap_or(cleaned).trim();

    if let Ok(decision) = serde_json::from_str::<RoutingDecision>(cleaned) {
        return Some(decision);
    }

    // Try to find a JSON object in the response
    if let Some(start) = cleaned.find('{') {
        if let Some(end) = cleaned.rfind('}') {
            if let Ok(decision) = serde_json::from_str::<RoutingDecision>(&cleaned[start..=end]) {
                return Some(decision);
            }
        }
    }

    None
}
