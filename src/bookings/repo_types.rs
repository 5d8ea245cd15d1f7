use sqlx::FromRow;
use time::{Date, OffsetDateTime};
use uuid::Uuid;

/// A reservation of one slot by one attendee (`bookings`).
#[derive(Debug, Clone, FromRow)]
pub struct Booking {
    pub id: i64,
    pub user_id: Uuid,
    pub slot_id: i64,
    pub qr_payload: Option<String>,
    pub qr_code_url: Option<String>,
    pub checked_in: bool,
    pub checked_in_at: Option<OffsetDateTime>,
    pub calendar_event_id: Option<String>,
    pub created_at: OffsetDateTime,
}

/// Booking joined with its slot, speaker and attendee.
#[derive(Debug, Clone, FromRow)]
pub struct BookingDetails {
    pub id: i64,
    pub user_id: Uuid,
    pub slot_id: i64,
    pub qr_payload: Option<String>,
    pub qr_code_url: Option<String>,
    pub checked_in: bool,
    pub checked_in_at: Option<OffsetDateTime>,
    pub calendar_event_id: Option<String>,
    pub created_at: OffsetDateTime,
    pub speaker_id: Uuid,
    pub session_date: Date,
    pub hour: i16,
    pub speaker_name: String,
    pub speaker_email: String,
    pub attendee_name: String,
    pub attendee_email: String,
}
