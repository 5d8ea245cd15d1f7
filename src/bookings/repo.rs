use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use super::repo_types::{Booking, BookingDetails};
use crate::speakers::repo_types::SessionSlot;

const BOOKING_COLUMNS: &str = "id, user_id, slot_id, qr_payload, qr_code_url, checked_in, \
                               checked_in_at, calendar_event_id, created_at";

const DETAILS_SELECT: &str = r#"
    SELECT b.id, b.user_id, b.slot_id, b.qr_payload, b.qr_code_url, b.checked_in,
           b.checked_in_at, b.calendar_event_id, b.created_at,
           s.speaker_id, s.session_date, s.hour,
           sp.full_name AS speaker_name, sp.email AS speaker_email,
           u.full_name AS attendee_name, u.email AS attendee_email
      FROM bookings b
      JOIN session_slots s ON s.id = b.slot_id
      JOIN profiles sp ON sp.id = s.speaker_id
      JOIN profiles u ON u.id = b.user_id
"#;

/// Load the slot row and hold its lock until the transaction ends.
pub async fn lock_slot_tx(
    tx: &mut Transaction<'_, Postgres>,
    slot_id: i64,
) -> Result<Option<SessionSlot>, sqlx::Error> {
    sqlx::query_as::<_, SessionSlot>(
        r#"
        SELECT id, speaker_id, session_date, hour, is_booked
          FROM session_slots
         WHERE id = $1
           FOR UPDATE
        "#,
    )
    .bind(slot_id)
    .fetch_optional(&mut **tx)
    .await
}

pub async fn mark_slot_booked_tx(
    tx: &mut Transaction<'_, Postgres>,
    slot_id: i64,
) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE session_slots SET is_booked = TRUE WHERE id = $1")
        .bind(slot_id)
        .execute(&mut **tx)
        .await?;
    Ok(())
}

/// Insert the booking row. A second booking of the same slot fails with a unique violation.
pub async fn insert_booking_tx(
    tx: &mut Transaction<'_, Postgres>,
    user_id: Uuid,
    slot_id: i64,
) -> Result<Booking, sqlx::Error> {
    let sql = format!(
        "INSERT INTO bookings (user_id, slot_id) VALUES ($1, $2) RETURNING {BOOKING_COLUMNS}"
    );
    sqlx::query_as::<_, Booking>(&sql)
        .bind(user_id)
        .bind(slot_id)
        .fetch_one(&mut **tx)
        .await
}

pub async fn set_qr_tx(
    tx: &mut Transaction<'_, Postgres>,
    booking_id: i64,
    qr_payload: &str,
    qr_code_url: &str,
) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE bookings SET qr_payload = $2, qr_code_url = $3 WHERE id = $1")
        .bind(booking_id)
        .bind(qr_payload)
        .bind(qr_code_url)
        .execute(&mut **tx)
        .await?;
    Ok(())
}

/// Joined view of a booking as seen inside the open transaction.
pub async fn find_details_tx(
    tx: &mut Transaction<'_, Postgres>,
    booking_id: i64,
) -> Result<Option<BookingDetails>, sqlx::Error> {
    let sql = format!("{DETAILS_SELECT} WHERE b.id = $1");
    sqlx::query_as::<_, BookingDetails>(&sql)
        .bind(booking_id)
        .fetch_optional(&mut **tx)
        .await
}

impl Booking {
    pub async fn set_calendar_event(db: &PgPool, id: i64, event_id: &str) -> anyhow::Result<()> {
        sqlx::query("UPDATE bookings SET calendar_event_id = $2 WHERE id = $1")
            .bind(id)
            .bind(event_id)
            .execute(db)
            .await?;
        Ok(())
    }

    /// Flip `checked_in` once. `None` when the booking was already checked in.
    pub async fn mark_checked_in(db: &PgPool, id: i64) -> anyhow::Result<Option<Booking>> {
        let sql = format!(
            r#"
            UPDATE bookings
               SET checked_in = TRUE, checked_in_at = now()
             WHERE id = $1 AND NOT checked_in
            RETURNING {BOOKING_COLUMNS}
            "#
        );
        let row = sqlx::query_as::<_, Booking>(&sql)
            .bind(id)
            .fetch_optional(db)
            .await?;
        Ok(row)
    }
}

impl BookingDetails {
    pub async fn find(db: &PgPool, id: i64) -> anyhow::Result<Option<BookingDetails>> {
        let sql = format!("{DETAILS_SELECT} WHERE b.id = $1");
        let row = sqlx::query_as::<_, BookingDetails>(&sql)
            .bind(id)
            .fetch_optional(db)
            .await?;
        Ok(row)
    }

    /// Attendee's bookings, most recent first.
    pub async fn list_for_attendee(db: &PgPool, user_id: Uuid) -> anyhow::Result<Vec<BookingDetails>> {
        let sql = format!("{DETAILS_SELECT} WHERE b.user_id = $1 ORDER BY b.created_at DESC, b.id DESC");
        let rows = sqlx::query_as::<_, BookingDetails>(&sql)
            .bind(user_id)
            .fetch_all(db)
            .await?;
        Ok(rows)
    }

    /// Bookings on the speaker's slots: latest day first, hours ascending within a day.
    pub async fn list_for_speaker(db: &PgPool, speaker_id: Uuid) -> anyhow::Result<Vec<BookingDetails>> {
        let sql = format!(
            "{DETAILS_SELECT} WHERE s.speaker_id = $1 ORDER BY s.session_date DESC, s.hour ASC"
        );
        let rows = sqlx::query_as::<_, BookingDetails>(&sql)
            .bind(speaker_id)
            .fetch_all(db)
            .await?;
        Ok(rows)
    }
}
