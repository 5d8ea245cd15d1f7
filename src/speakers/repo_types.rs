use serde::Serialize;
use sqlx::FromRow;
use time::Date;
use uuid::Uuid;

/// Speaker extension of an identity (`speaker_profiles`).
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct SpeakerProfile {
    pub id: Uuid,
    pub expertise: Option<String>,
    pub bio: Option<String>,
    pub price_per_hour: f64,
    pub avatar_key: Option<String>,   // object storage key
}

/// Speaker profile joined with the owning identity.
#[derive(Debug, Clone, FromRow)]
pub struct SpeakerListRow {
    pub id: Uuid,
    pub full_name: String,
    pub email: String,
    pub expertise: Option<String>,
    pub bio: Option<String>,
    pub price_per_hour: f64,
    pub avatar_key: Option<String>,
}

/// One bookable hour (`session_slots`).
#[derive(Debug, Clone, FromRow)]
pub struct SessionSlot {
    pub id: i64,
    pub speaker_id: Uuid,
    pub session_date: Date,
    pub hour: i16,
    pub is_booked: bool,
}

/// A booking on one of the speaker's slots, as needed for income reporting.
#[derive(Debug, Clone, FromRow)]
pub struct IncomeRow {
    pub booking_id: i64,
    pub attendee_id: Uuid,
    pub attendee_name: String,
    pub session_date: Date,
}

/// Fields a speaker may change on their profile.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProfileUpdate {
    pub expertise: Option<String>,
    pub bio: Option<String>,
    pub price_per_hour: Option<f64>,
}
