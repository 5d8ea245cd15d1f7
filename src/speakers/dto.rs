use serde::{Deserialize, Serialize};
use time::Date;
use uuid::Uuid;

use super::repo_types::{SessionSlot, SpeakerListRow};

/// Public speaker card.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SpeakerResponse {
    pub id: Uuid,
    pub full_name: String,
    pub email: String,
    pub expertise: Option<String>,
    pub bio: Option<String>,
    pub price_per_hour: f64,
    pub avatar_url: Option<String>,
}

impl SpeakerResponse {
    pub fn from_row(row: SpeakerListRow, avatar_url: Option<String>) -> Self {
        Self {
            id: row.id,
            full_name: row.full_name,
            email: row.email,
            expertise: row.expertise,
            bio: row.bio,
            price_per_hour: row.price_per_hour,
            avatar_url,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct UpdateProfileRequest {
    pub expertise: Option<String>,
    pub price_per_hour: Option<f64>,
    pub bio: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SlotsQuery {
    pub date: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CreateSlotRequest {
    pub session_date: String,
    pub hour: i64,
}

#[derive(Debug, Serialize)]
pub struct SlotResponse {
    pub id: i64,
    pub speaker_id: Uuid,
    pub session_date: Date,
    pub hour: i16,
    pub is_booked: bool,
}

impl From<SessionSlot> for SlotResponse {
    fn from(s: SessionSlot) -> Self {
        Self {
            id: s.id,
            speaker_id: s.speaker_id,
            session_date: s.session_date,
            hour: s.hour,
            is_booked: s.is_booked,
        }
    }
}

#[derive(Debug, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MonthlyIncome {
    pub month: String,   // YYYY-MM
    pub sessions: u32,
    pub income: f64,
}

#[derive(Debug, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AttendeeIncome {
    pub attendee_id: Uuid,
    pub full_name: String,
    pub sessions: u32,
    pub income: f64,
}

#[derive(Debug, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct IncomeResponse {
    pub price_per_hour: f64,
    pub total_sessions: u32,
    pub total_income: f64,
    pub months: Vec<MonthlyIncome>,
    pub attendees: Vec<AttendeeIncome>,
}
