use sqlx::{PgPool, Postgres, Transaction};
use time::Date;
use uuid::Uuid;

use super::repo_types::{IncomeRow, ProfileUpdate, SessionSlot, SpeakerListRow, SpeakerProfile};

pub const DEFAULT_EXPERTISE: &str = "General";
pub const DEFAULT_PRICE_PER_HOUR: f64 = 100.0;

impl SpeakerProfile {
    pub async fn create_empty_tx(
        tx: &mut Transaction<'_, Postgres>,
        id: Uuid,
    ) -> anyhow::Result<()> {
        sqlx::query("INSERT INTO speaker_profiles (id) VALUES ($1)")
            .bind(id)
            .execute(&mut **tx)
            .await?;
        Ok(())
    }

    /// Create an empty profile if none exists yet.
    pub async fn ensure_exists(db: &PgPool, id: Uuid) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            INSERT INTO speaker_profiles (id, expertise, price_per_hour)
            VALUES ($1, $2, $3)
            ON CONFLICT (id) DO NOTHING
            "#,
        )
        .bind(id)
        .bind(DEFAULT_EXPERTISE)
        .bind(DEFAULT_PRICE_PER_HOUR)
        .execute(db)
        .await?;
        Ok(())
    }

    pub async fn find(db: &PgPool, id: Uuid) -> anyhow::Result<Option<SpeakerProfile>> {
        let row = sqlx::query_as::<_, SpeakerProfile>(
            r#"
            SELECT id, expertise, bio, price_per_hour, avatar_key
            FROM speaker_profiles
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(db)
        .await?;
        Ok(row)
    }

    /// Insert a profile seeded from `update`, falling back to defaults.
    pub async fn create_from(
        db: &PgPool,
        id: Uuid,
        update: &ProfileUpdate,
    ) -> anyhow::Result<SpeakerProfile> {
        let row = sqlx::query_as::<_, SpeakerProfile>(
            r#"
            INSERT INTO speaker_profiles (id, expertise, bio, price_per_hour)
            VALUES ($1, $2, $3, $4)
            RETURNING id, expertise, bio, price_per_hour, avatar_key
            "#,
        )
        .bind(id)
        .bind(update.expertise.as_deref().unwrap_or(DEFAULT_EXPERTISE))
        .bind(update.bio.as_deref())
        .bind(update.price_per_hour.unwrap_or(DEFAULT_PRICE_PER_HOUR))
        .fetch_one(db)
        .await?;
        Ok(row)
    }

    pub async fn update(
        db: &PgPool,
        id: Uuid,
        update: &ProfileUpdate,
    ) -> anyhow::Result<SpeakerProfile> {
        let row = sqlx::query_as::<_, SpeakerProfile>(
            r#"
            UPDATE speaker_profiles
               SET expertise      = COALESCE($2, expertise),
                   bio            = COALESCE($3, bio),
                   price_per_hour = COALESCE($4, price_per_hour)
             WHERE id = $1
            RETURNING id, expertise, bio, price_per_hour, avatar_key
            "#,
        )
        .bind(id)
        .bind(update.expertise.as_deref())
        .bind(update.bio.as_deref())
        .bind(update.price_per_hour)
        .fetch_one(db)
        .await?;
        Ok(row)
    }

    /// Point the profile at a new avatar; returns the replaced key, if any.
    pub async fn set_avatar(db: &PgPool, id: Uuid, key: &str) -> anyhow::Result<Option<String>> {
        let previous: Option<Option<String>> =
            sqlx::query_scalar("SELECT avatar_key FROM speaker_profiles WHERE id = $1")
                .bind(id)
                .fetch_optional(db)
                .await?;
        sqlx::query("UPDATE speaker_profiles SET avatar_key = $2 WHERE id = $1")
            .bind(id)
            .bind(key)
            .execute(db)
            .await?;
        Ok(previous.flatten())
    }
}

impl SpeakerListRow {
    pub async fn list_all(db: &PgPool) -> anyhow::Result<Vec<SpeakerListRow>> {
        let rows = sqlx::query_as::<_, SpeakerListRow>(
            r#"
            SELECT sp.id, p.full_name, p.email, sp.expertise, sp.bio,
                   sp.price_per_hour, sp.avatar_key
              FROM speaker_profiles sp
              JOIN profiles p ON p.id = sp.id
             ORDER BY p.full_name ASC
            "#,
        )
        .fetch_all(db)
        .await?;
        Ok(rows)
    }
}

impl SessionSlot {
    /// Insert a free slot. Duplicate (speaker, date, hour) surfaces as a unique violation.
    pub async fn create(
        db: &PgPool,
        speaker_id: Uuid,
        session_date: Date,
        hour: i16,
    ) -> Result<SessionSlot, sqlx::Error> {
        sqlx::query_as::<_, SessionSlot>(
            r#"
            INSERT INTO session_slots (speaker_id, session_date, hour, is_booked)
            VALUES ($1, $2, $3, FALSE)
            RETURNING id, speaker_id, session_date, hour, is_booked
            "#,
        )
        .bind(speaker_id)
        .bind(session_date)
        .bind(hour)
        .fetch_one(db)
        .await
    }

    /// Slots for one speaker and day, ordered by hour. Booked slots only when `include_booked`.
    pub async fn list_for_date(
        db: &PgPool,
        speaker_id: Uuid,
        session_date: Date,
        include_booked: bool,
    ) -> anyhow::Result<Vec<SessionSlot>> {
        let rows = sqlx::query_as::<_, SessionSlot>(
            r#"
            SELECT id, speaker_id, session_date, hour, is_booked
              FROM session_slots
             WHERE speaker_id = $1
               AND session_date = $2
               AND ($3 OR NOT is_booked)
             ORDER BY hour ASC
            "#,
        )
        .bind(speaker_id)
        .bind(session_date)
        .bind(include_booked)
        .fetch_all(db)
        .await?;
        Ok(rows)
    }
}

impl IncomeRow {
    pub async fn list_for_speaker(db: &PgPool, speaker_id: Uuid) -> anyhow::Result<Vec<IncomeRow>> {
        let rows = sqlx::query_as::<_, IncomeRow>(
            r#"
            SELECT b.id AS booking_id, b.user_id AS attendee_id,
                   p.full_name AS attendee_name, s.session_date
              FROM bookings b
              JOIN session_slots s ON s.id = b.slot_id
              JOIN profiles p ON p.id = b.user_id
             WHERE s.speaker_id = $1
             ORDER BY s.session_date ASC, s.hour ASC
            "#,
        )
        .bind(speaker_id)
        .fetch_all(db)
        .await?;
        Ok(rows)
    }
}
