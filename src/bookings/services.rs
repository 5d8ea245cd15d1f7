use anyhow::Context;
use time::{Duration, Time};
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use super::{
    qr::{self, QrPayload},
    repo,
    repo_types::{Booking, BookingDetails},
};
use crate::{
    error::{is_unique_violation, ApiError},
    integrations::{mail::booking_confirmation, CalendarEvent},
    state::AppState,
};

const BOOKING_SLOT_UNIQUE: &str = "bookings_slot_id_key";

/// Reserve `slot_id` for `attendee_id` and issue its QR ticket, all in one transaction.
///
/// The slot row is locked with `FOR UPDATE`, so concurrent requests for the same
/// slot run one after another and every loser sees it booked. The joined details are
/// read before commit, so a confirmed booking never needs a second lookup.
#[instrument(skip(state))]
pub async fn create_booking(
    state: &AppState,
    attendee_id: Uuid,
    slot_id: i64,
) -> Result<BookingDetails, ApiError> {
    let mut tx = state.db.begin().await?;

    let slot = repo::lock_slot_tx(&mut tx, slot_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Slot not found."))?;
    if slot.is_booked {
        warn!(slot_id, "slot already booked");
        return Err(ApiError::conflict("Slot is already booked."));
    }

    repo::mark_slot_booked_tx(&mut tx, slot.id).await?;

    let booking = match repo::insert_booking_tx(&mut tx, attendee_id, slot.id).await {
        Ok(b) => b,
        Err(e) if is_unique_violation(&e, Some(BOOKING_SLOT_UNIQUE)) => {
            warn!(slot_id, "booking row already exists for slot");
            return Err(ApiError::conflict("Slot is already booked."));
        }
        Err(e) => return Err(e.into()),
    };

    let payload = QrPayload::new(
        booking.id,
        attendee_id,
        slot.speaker_id,
        slot.session_date,
        slot.hour,
    );
    let payload_json = payload.to_json()?;
    let qr_code_url = qr::render_data_url(&payload_json)?;
    repo::set_qr_tx(&mut tx, booking.id, &payload_json, &qr_code_url).await?;
    let details = repo::find_details_tx(&mut tx, booking.id)
        .await?
        .with_context(|| format!("booking {} missing inside its transaction", booking.id))?;

    tx.commit().await?;
    info!(booking_id = details.id, slot_id, %attendee_id, "booking confirmed");
    Ok(details)
}

/// Run the post-commit side effects of a confirmed booking in the background.
pub fn dispatch_confirmation(state: &AppState, details: BookingDetails) {
    let state = state.clone();
    tokio::spawn(async move {
        let booking_id = details.id;
        if let Err(e) = notify_confirmed(&state, &details).await {
            error!(error = ?e, booking_id, "booking confirmation side effects failed");
        }
    });
}

async fn notify_confirmed(state: &AppState, details: &BookingDetails) -> anyhow::Result<()> {
    let booking_id = details.id;

    // Calendar and mail are independent; a calendar failure must not stop the mail.
    if let Some(calendar) = &state.calendar {
        let event = calendar_event(details);
        match calendar.create_event(&event).await {
            Ok(event_id) => match Booking::set_calendar_event(&state.db, booking_id, &event_id).await {
                Ok(()) => info!(booking_id, %event_id, "calendar event attached"),
                Err(e) => warn!(error = %e, booking_id, "failed to store calendar event id"),
            },
            Err(e) => warn!(error = %e, booking_id, "calendar event creation failed"),
        }
    }

    let qr_png = details.qr_code_url.as_deref().and_then(qr::png_from_data_url);
    let mail = booking_confirmation(
        &details.attendee_email,
        &details.attendee_name,
        &details.speaker_name,
        details.session_date,
        details.hour,
        qr_png,
    );
    state.mailer.send(&mail).await.context("send confirmation mail")?;
    Ok(())
}

fn calendar_event(d: &BookingDetails) -> CalendarEvent {
    let start = d
        .session_date
        .with_time(Time::from_hms(d.hour as u8, 0, 0).unwrap_or(Time::MIDNIGHT))
        .assume_utc();
    CalendarEvent {
        summary: format!("Session: {} & {}", d.speaker_name, d.attendee_name),
        description: format!(
            "Booked session between {} (Speaker) and {} (Attendee).",
            d.speaker_name, d.attendee_name
        ),
        start,
        end: start + Duration::hours(1),
        attendees: vec![d.speaker_email.clone(), d.attendee_email.clone()],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::{date, datetime};

    fn details() -> BookingDetails {
        BookingDetails {
            id: 1,
            user_id: Uuid::new_v4(),
            slot_id: 2,
            qr_payload: None,
            qr_code_url: None,
            checked_in: false,
            checked_in_at: None,
            calendar_event_id: None,
            created_at: datetime!(2030-01-01 00:00 UTC),
            speaker_id: Uuid::new_v4(),
            session_date: date!(2030 - 05 - 01),
            hour: 14,
            speaker_name: "Grace".into(),
            speaker_email: "grace@x.com".into(),
            attendee_name: "Ada".into(),
            attendee_email: "ada@x.com".into(),
        }
    }

    #[test]
    fn calendar_event_spans_the_booked_hour() {
        let event = calendar_event(&details());
        assert_eq!(event.start, datetime!(2030-05-01 14:00 UTC));
        assert_eq!(event.end, datetime!(2030-05-01 15:00 UTC));
        assert_eq!(event.summary, "Session: Grace & Ada");
        assert_eq!(event.attendees, vec!["grace@x.com", "ada@x.com"]);
    }
}
