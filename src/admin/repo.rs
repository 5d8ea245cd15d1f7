use serde::Serialize;
use sqlx::{FromRow, PgPool};

#[derive(Debug, Clone, Copy, FromRow)]
pub struct BookingCounts {
    pub total: i64,
    pub checked_in: i64,
}

#[derive(Debug, Clone, Serialize, FromRow, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SpeakerCount {
    pub speaker_name: String,
    pub count: i64,
}

pub const TOP_SPEAKERS: i64 = 5;

impl BookingCounts {
    pub async fn load(db: &PgPool) -> anyhow::Result<BookingCounts> {
        let row = sqlx::query_as::<_, BookingCounts>(
            r#"
            SELECT COUNT(*) AS total,
                   COUNT(*) FILTER (WHERE checked_in) AS checked_in
              FROM bookings
            "#,
        )
        .fetch_one(db)
        .await?;
        Ok(row)
    }
}

impl SpeakerCount {
    /// Most-booked speakers, one entry per speaker; ties broken by name.
    pub async fn top(db: &PgPool, limit: i64) -> anyhow::Result<Vec<SpeakerCount>> {
        let rows = sqlx::query_as::<_, SpeakerCount>(
            r#"
            SELECT p.full_name AS speaker_name, COUNT(*) AS count
              FROM bookings b
              JOIN session_slots s ON s.id = b.slot_id
              JOIN profiles p ON p.id = s.speaker_id
             GROUP BY s.speaker_id, p.full_name
             ORDER BY count DESC, speaker_name ASC
             LIMIT $1
            "#,
        )
        .bind(limit)
        .fetch_all(db)
        .await?;
        Ok(rows)
    }
}
