use std::collections::BTreeMap;

use anyhow::Context;
use bytes::Bytes;
use time::{macros::format_description, Date};
use tracing::{info, warn};
use uuid::Uuid;

use super::{
    dto::{AttendeeIncome, IncomeResponse, MonthlyIncome, UpdateProfileRequest},
    repo_types::{IncomeRow, ProfileUpdate, SpeakerProfile},
};
use crate::{
    error::ApiError,
    state::AppState,
    storage::{avatar_key, ext_from_mime},
};

pub const FIRST_HOUR: i16 = 9;
pub const LAST_HOUR: i16 = 16;
pub const AVATAR_MAX_BYTES: usize = 5 * 1024 * 1024;
const AVATAR_URL_TTL_SECS: u64 = 60 * 60;

pub fn parse_date(raw: &str) -> Result<Date, ApiError> {
    Date::parse(raw.trim(), format_description!("[year]-[month]-[day]"))
        .map_err(|_| ApiError::validation("Invalid date format. Please use YYYY-MM-DD."))
}

/// Validate a new slot against the allowed hours and `today`.
pub fn validate_slot(session_date: &str, hour: i64, today: Date) -> Result<(Date, i16), ApiError> {
    let date = parse_date(session_date)?;
    let hour = i16::try_from(hour)
        .ok()
        .filter(|h| (FIRST_HOUR..=LAST_HOUR).contains(h))
        .ok_or_else(|| {
            ApiError::validation(format!(
                "Invalid hour. Must be a number between {FIRST_HOUR} and {LAST_HOUR} (inclusive)."
            ))
        })?;
    if date < today {
        return Err(ApiError::validation("Cannot create slots for past dates."));
    }
    Ok((date, hour))
}

pub fn validate_profile_update(req: UpdateProfileRequest) -> Result<ProfileUpdate, ApiError> {
    if req.expertise.is_none() && req.price_per_hour.is_none() && req.bio.is_none() {
        return Err(ApiError::validation(
            "At least one field (expertise, price_per_hour, bio) must be provided.",
        ));
    }
    if let Some(price) = req.price_per_hour {
        if !price.is_finite() || price < 0.0 {
            return Err(ApiError::validation(
                "Invalid price_per_hour. Must be a non-negative number.",
            ));
        }
    }
    Ok(ProfileUpdate {
        expertise: req.expertise,
        bio: req.bio,
        price_per_hour: req.price_per_hour,
    })
}

/// Income at the current hourly price, by month and by attendee.
pub fn compute_income(price_per_hour: f64, rows: &[IncomeRow]) -> IncomeResponse {
    let mut months: BTreeMap<String, MonthlyIncome> = BTreeMap::new();
    let mut attendees: BTreeMap<Uuid, AttendeeIncome> = BTreeMap::new();

    for row in rows {
        let key = format!("{:04}-{:02}", row.session_date.year(), u8::from(row.session_date.month()));
        let month = months.entry(key.clone()).or_insert_with(|| MonthlyIncome {
            month: key,
            sessions: 0,
            income: 0.0,
        });
        month.sessions += 1;
        month.income += price_per_hour;

        let attendee = attendees
            .entry(row.attendee_id)
            .or_insert_with(|| AttendeeIncome {
                attendee_id: row.attendee_id,
                full_name: row.attendee_name.clone(),
                sessions: 0,
                income: 0.0,
            });
        attendee.sessions += 1;
        attendee.income += price_per_hour;
    }

    let mut attendees: Vec<AttendeeIncome> = attendees.into_values().collect();
    attendees.sort_by(|a, b| {
        b.sessions
            .cmp(&a.sessions)
            .then_with(|| a.full_name.cmp(&b.full_name))
    });

    let total_sessions = rows.len() as u32;
    IncomeResponse {
        price_per_hour,
        total_sessions,
        total_income: price_per_hour * f64::from(total_sessions),
        months: months.into_values().collect(),
        attendees,
    }
}

/// Presign an avatar key; failures degrade to no URL.
pub async fn avatar_url(state: &AppState, key: Option<&str>) -> Option<String> {
    let (storage, key) = (state.storage.as_ref()?, key?);
    match storage.presign_get(key, AVATAR_URL_TTL_SECS).await {
        Ok(url) => Some(url),
        Err(e) => {
            warn!(error = %e, %key, "avatar presign failed");
            None
        }
    }
}

/// Store a new avatar for the speaker and drop the previous object.
pub async fn replace_avatar(
    state: &AppState,
    speaker_id: Uuid,
    body: Bytes,
    content_type: &str,
) -> Result<String, ApiError> {
    let storage = state
        .storage
        .as_ref()
        .ok_or_else(|| ApiError::Unavailable("Avatar uploads are not configured.".into()))?;
    let ext = ext_from_mime(content_type)
        .ok_or_else(|| ApiError::validation("Avatar must be a PNG, JPEG or WebP image."))?;
    if body.is_empty() || body.len() > AVATAR_MAX_BYTES {
        return Err(ApiError::validation("Avatar must be between 1 byte and 5 MB."));
    }

    SpeakerProfile::ensure_exists(&state.db, speaker_id).await?;

    let key = avatar_key(speaker_id, Uuid::new_v4(), ext);
    storage
        .put_object(&key, body, content_type)
        .await
        .with_context(|| format!("put_object {}", key))?;

    let previous = SpeakerProfile::set_avatar(&state.db, speaker_id, &key).await?;
    if let Some(old) = previous {
        if let Err(e) = storage.delete_object(&old).await {
            warn!(error = %e, key = %old, "failed to delete replaced avatar");
        }
    }
    info!(%speaker_id, %key, "avatar replaced");
    Ok(key)
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::date;

    #[test]
    fn slot_hours_are_bounded() {
        let today = date!(2030 - 01 - 01);
        assert!(validate_slot("2030-01-02", 9, today).is_ok());
        assert!(validate_slot("2030-01-02", 16, today).is_ok());
        assert!(validate_slot("2030-01-02", 8, today).is_err());
        assert!(validate_slot("2030-01-02", 17, today).is_err());
        assert!(validate_slot("2030-01-02", 100_000, today).is_err());
    }

    #[test]
    fn slots_today_allowed_but_not_in_the_past() {
        let today = date!(2030 - 01 - 10);
        assert_eq!(
            validate_slot("2030-01-10", 10, today).unwrap(),
            (date!(2030 - 01 - 10), 10)
        );
        let err = validate_slot("2030-01-09", 10, today).unwrap_err();
        assert_eq!(err.to_string(), "Cannot create slots for past dates.");
    }

    #[test]
    fn malformed_dates_rejected() {
        let today = date!(2030 - 01 - 01);
        for raw in ["2030/01/02", "02-01-2030", "2030-13-01", "tomorrow", ""] {
            assert!(matches!(validate_slot(raw, 10, today), Err(ApiError::Validation(_))), "{raw}");
        }
    }

    #[test]
    fn profile_update_requires_a_field_and_non_negative_price() {
        let empty = UpdateProfileRequest { expertise: None, price_per_hour: None, bio: None };
        assert!(validate_profile_update(empty).is_err());

        let negative = UpdateProfileRequest { expertise: None, price_per_hour: Some(-1.0), bio: None };
        assert!(validate_profile_update(negative).is_err());

        let ok = UpdateProfileRequest {
            expertise: Some("Rust".into()),
            price_per_hour: Some(0.0),
            bio: None,
        };
        let update = validate_profile_update(ok).unwrap();
        assert_eq!(update.expertise.as_deref(), Some("Rust"));
        assert_eq!(update.price_per_hour, Some(0.0));
    }

    #[test]
    fn income_groups_by_month_and_attendee() {
        let ada = Uuid::new_v4();
        let bob = Uuid::new_v4();
        let row = |id: i64, who: Uuid, name: &str, d: Date| IncomeRow {
            booking_id: id,
            attendee_id: who,
            attendee_name: name.into(),
            session_date: d,
        };
        let rows = vec![
            row(1, ada, "Ada", date!(2030 - 01 - 05)),
            row(2, bob, "Bob", date!(2030 - 01 - 20)),
            row(3, ada, "Ada", date!(2030 - 02 - 01)),
        ];

        let income = compute_income(150.0, &rows);
        assert_eq!(income.total_sessions, 3);
        assert_eq!(income.total_income, 450.0);
        assert_eq!(income.months.len(), 2);
        assert_eq!(income.months[0].month, "2030-01");
        assert_eq!(income.months[0].sessions, 2);
        assert_eq!(income.months[1].income, 150.0);
        assert_eq!(income.attendees[0].full_name, "Ada");
        assert_eq!(income.attendees[0].income, 300.0);
        assert_eq!(income.attendees[1].sessions, 1);
    }

    #[test]
    fn income_is_zero_without_bookings() {
        let income = compute_income(120.0, &[]);
        assert_eq!(income.total_sessions, 0);
        assert_eq!(income.total_income, 0.0);
        assert!(income.months.is_empty() && income.attendees.is_empty());
    }

    #[tokio::test]
    async fn avatar_upload_needs_configured_storage() {
        let mut state = AppState::fake();
        state.storage = None;
        let err = replace_avatar(&state, Uuid::new_v4(), Bytes::from_static(b"png"), "image/png")
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Unavailable(_)));
    }

    #[tokio::test]
    async fn avatar_upload_rejects_unknown_types_before_storage() {
        let state = AppState::fake();
        let err = replace_avatar(&state, Uuid::new_v4(), Bytes::from_static(b"gif"), "image/gif")
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));
    }
}
