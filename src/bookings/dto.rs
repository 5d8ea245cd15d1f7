use serde::{Deserialize, Serialize};
use time::{Date, OffsetDateTime};
use uuid::Uuid;

use super::repo_types::BookingDetails;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateBookingRequest {
    pub slot_id: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct SlotSummary {
    pub id: i64,
    pub speaker_id: Uuid,
    pub speaker_name: String,
    pub session_date: Date,
    pub hour: i16,
}

#[derive(Debug, Serialize)]
pub struct AttendeeSummary {
    pub id: Uuid,
    pub full_name: String,
    pub email: String,
}

/// Booking as returned to clients, with slot and attendee resolved.
#[derive(Debug, Serialize)]
pub struct BookingResponse {
    pub id: i64,
    pub user_id: Uuid,
    pub slot_id: i64,
    pub qr_code_url: Option<String>,
    pub checked_in: bool,
    #[serde(with = "time::serde::rfc3339::option")]
    pub checked_in_at: Option<OffsetDateTime>,
    pub calendar_event_id: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    pub slot: SlotSummary,
    pub user: AttendeeSummary,
}

impl From<BookingDetails> for BookingResponse {
    fn from(d: BookingDetails) -> Self {
        Self {
            id: d.id,
            user_id: d.user_id,
            slot_id: d.slot_id,
            qr_code_url: d.qr_code_url,
            checked_in: d.checked_in,
            checked_in_at: d.checked_in_at,
            calendar_event_id: d.calendar_event_id,
            created_at: d.created_at,
            slot: SlotSummary {
                id: d.slot_id,
                speaker_id: d.speaker_id,
                speaker_name: d.speaker_name,
                session_date: d.session_date,
                hour: d.hour,
            },
            user: AttendeeSummary {
                id: d.user_id,
                full_name: d.attendee_name,
                email: d.attendee_email,
            },
        }
    }
}

#[derive(Debug, Serialize)]
pub struct QrCodeResponse {
    pub qr_code_url: String,
}
