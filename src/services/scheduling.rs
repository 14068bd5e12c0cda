use chrono::{Duration, NaiveDateTime};

use crate::config::BusinessProfile;
use crate::models::{
    AppointmentDetails, CallSession, CallStage, ProposalReason, SchedulingProposal,
};
use crate::services::calendar::{BookingRequest, CalendarProvider};

const BOOKING_FAILED_REPLY: &str =
    "There was an issue scheduling your appointment. Could you try another time?";
const GENERIC_ERROR_REPLY: &str =
    "Something went wrong while checking availability. Please try again.";

enum Phrasing {
    /// The caller's request was honored as asked.
    Confirmed,
    /// Booked with the other staff member; phrased as an offer since it
    /// substitutes the caller's implicit preference.
    AlternateOffer { preferred: String },
}

/// Resolve the session's pending booking request against the two staff
/// calendars. Returns the utterance to speak, or `None` when there is
/// nothing to do. The in-flight flag is held across the whole resolution and
/// released unconditionally.
pub async fn resolve_pending_booking(
    calendar: &dyn CalendarProvider,
    business: &BusinessProfile,
    session: &mut CallSession,
) -> Option<String> {
    if session.booking_in_flight {
        tracing::debug!(session = %session.id, "booking already in progress, skipping");
        return None;
    }
    let request = session.pending_booking()?.clone();

    session.booking_in_flight = true;
    let utterance = match try_resolve(calendar, business, session, &request).await {
        Ok(text) => text,
        Err(e) => {
            tracing::error!(session = %session.id, error = %e, "scheduling failed");
            session.clear_pending_booking();
            GENERIC_ERROR_REPLY.to_string()
        }
    };
    session.booking_in_flight = false;

    Some(utterance)
}

async fn try_resolve(
    calendar: &dyn CalendarProvider,
    business: &BusinessProfile,
    session: &mut CallSession,
    request: &AppointmentDetails,
) -> anyhow::Result<String> {
    let (preferred, alternate) = business.staff_pair(request.staff_preference());
    let start = request.start_datetime()?;
    let minutes = request.duration_minutes()?;
    let end = start + Duration::minutes(minutes);

    if calendar.check_availability(&preferred, start, end).await? {
        return book(
            calendar,
            session,
            request,
            &preferred,
            start,
            end,
            Phrasing::Confirmed,
        )
        .await;
    }

    if calendar.check_availability(&alternate, start, end).await? {
        return book(
            calendar,
            session,
            request,
            &alternate,
            start,
            end,
            Phrasing::AlternateOffer {
                preferred: preferred.clone(),
            },
        )
        .await;
    }

    // Both staff are taken at the requested time; offer an alternative and
    // wait for an explicit yes before booking anything.
    session.clear_pending_booking();

    if let Some(slot) = calendar
        .find_next_available(&preferred, minutes, start)
        .await?
    {
        let date = slot.start.format("%Y-%m-%d").to_string();
        let time = slot.start.format("%H:%M").to_string();
        let text = format!(
            "{preferred} is booked at {}. The next available slot is {time} on {date}. Would that work for you?",
            request.time.as_deref().unwrap_or("that time"),
        );
        tracing::info!(session = %session.id, staff = %preferred, %date, %time, "offering next slot");
        session.set_pending_proposal(SchedulingProposal {
            staff: preferred,
            date,
            time,
            duration: request.duration.clone().unwrap_or_default(),
            reason: ProposalReason::NextAvailableSlot,
        });
        return Ok(text);
    }

    let text = format!(
        "{preferred} isn't available soon. Would you like to try a different time or schedule with {alternate}?"
    );
    tracing::info!(session = %session.id, staff = %alternate, "offering alternate staff");
    session.set_pending_proposal(SchedulingProposal {
        staff: alternate,
        date: request.date.clone().unwrap_or_default(),
        time: request.time.clone().unwrap_or_default(),
        duration: request.duration.clone().unwrap_or_default(),
        reason: ProposalReason::AlternateStaff,
    });
    Ok(text)
}

async fn book(
    calendar: &dyn CalendarProvider,
    session: &mut CallSession,
    request: &AppointmentDetails,
    staff: &str,
    start: NaiveDateTime,
    end: NaiveDateTime,
    phrasing: Phrasing,
) -> anyhow::Result<String> {
    let booking = BookingRequest {
        staff: staff.to_string(),
        summary: format!("Massage with {staff}"),
        start,
        end,
    };
    let outcome = calendar.create_booking(&booking).await?;

    // Cleared either way: a failed create means the caller must re-request.
    session.clear_pending_booking();

    if !outcome.success {
        tracing::error!(
            session = %session.id,
            staff,
            error = ?outcome.error,
            "calendar rejected booking"
        );
        return Ok(BOOKING_FAILED_REPLY.to_string());
    }

    session.booking_confirmed = true;
    session.stage = CallStage::BookingConfirmed;
    tracing::info!(session = %session.id, staff, link = ?outcome.link, "booking completed");

    let time = request.time.as_deref().unwrap_or("the requested time");
    let date = request.date.as_deref().unwrap_or("the requested day");
    Ok(match phrasing {
        Phrasing::Confirmed => {
            format!("I've scheduled you with {staff} at {time} on {date}.")
        }
        Phrasing::AlternateOffer { preferred } => format!(
            "{preferred} isn't available, but I've scheduled you with {staff} at {time} on {date}. \
             Does that work, or would you prefer to wait for {preferred}?"
        ),
    })
}
