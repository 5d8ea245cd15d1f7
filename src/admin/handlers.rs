use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};

use super::{
    repo::{BookingCounts, SpeakerCount, TOP_SPEAKERS},
    services::{cross_check, parse_payload, percentage},
};
use crate::{
    auth::{AuthUser, Role},
    bookings::{
        dto::BookingResponse,
        repo_types::{Booking, BookingDetails},
    },
    error::{ApiError, ApiResult, ValidJson},
    state::AppState,
};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/admin/checkin", post(checkin))
        .route("/admin/stats", get(stats))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckinRequest {
    pub qr_payload: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CheckinResponse {
    pub message: String,
    pub booking: BookingResponse,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsResponse {
    pub total_bookings: i64,
    pub checked_in_bookings: i64,
    pub checked_in_percentage: i64,
    pub top_speakers: Vec<SpeakerCount>,
}

#[instrument(skip(state, user, payload), fields(user_id = %user.id))]
pub async fn checkin(
    State(state): State<AppState>,
    user: AuthUser,
    ValidJson(payload): ValidJson<CheckinRequest>,
) -> ApiResult<Json<CheckinResponse>> {
    user.require(&[Role::Admin])?;
    let raw = payload
        .qr_payload
        .filter(|s| !s.trim().is_empty())
        .ok_or_else(|| ApiError::validation("qrPayload is required."))?;
    let ticket = parse_payload(&raw)?;

    let booking = BookingDetails::find(&state.db, ticket.booking_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Booking not found for this QR code."))?;
    cross_check(&ticket, &booking)?;

    let already = || ApiError::conflict("This booking has already been checked in.");
    if booking.checked_in {
        warn!(booking_id = booking.id, "duplicate check-in");
        return Err(already());
    }
    if Booking::mark_checked_in(&state.db, booking.id).await?.is_none() {
        warn!(booking_id = booking.id, "check-in lost race");
        return Err(already());
    }

    let booking = BookingDetails::find(&state.db, booking.id)
        .await?
        .ok_or_else(|| ApiError::not_found("Booking not found for this QR code."))?;
    info!(booking_id = booking.id, attendee = %booking.attendee_name, "checked in");

    Ok(Json(CheckinResponse {
        message: format!(
            "Successfully checked in {} for session with {}.",
            booking.attendee_name, booking.speaker_name
        ),
        booking: booking.into(),
    }))
}

#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn stats(State(state): State<AppState>, user: AuthUser) -> ApiResult<Json<StatsResponse>> {
    user.require(&[Role::Admin])?;
    let counts = BookingCounts::load(&state.db).await?;
    let top_speakers = SpeakerCount::top(&state.db, TOP_SPEAKERS).await?;
    Ok(Json(StatsResponse {
        total_bookings: counts.total,
        checked_in_bookings: counts.checked_in,
        checked_in_percentage: percentage(counts.total, counts.checked_in),
        top_speakers,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::jwt::JwtKeys;
    use axum::{body::Body, extract::FromRef, http::{Request, StatusCode}};
    use tower::ServiceExt;
    use uuid::Uuid;

    async fn send(req: Request<Body>, role: Option<Role>) -> (StatusCode, serde_json::Value) {
        let state = AppState::fake();
        let mut req = req;
        if let Some(role) = role {
            let (token, _) = JwtKeys::from_ref(&state)
                .sign(Uuid::new_v4(), "admin@x.com", role)
                .unwrap();
            req.headers_mut()
                .insert("authorization", format!("Bearer {token}").parse().unwrap());
        }
        let res = crate::app::api_router()
            .with_state(state)
            .oneshot(req)
            .await
            .unwrap();
        let status = res.status();
        let bytes = axum::body::to_bytes(res.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap_or_default())
    }

    fn checkin_req(body: &str) -> Request<Body> {
        Request::post("/admin/checkin")
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn stats_are_admin_only() {
        let req = Request::get("/admin/stats").body(Body::empty()).unwrap();
        let (status, _) = send(req, Some(Role::Attendee)).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn checkin_requires_payload() {
        let (status, body) = send(checkin_req("{}"), Some(Role::Admin)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "qrPayload is required.");
    }

    #[tokio::test]
    async fn checkin_rejects_garbage_payload() {
        let (status, body) = send(checkin_req(r#"{"qrPayload":"{oops"}"#), Some(Role::Admin)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Invalid or malformed QR code payload.");
    }

    #[tokio::test]
    async fn checkin_without_token_is_unauthorized() {
        let (status, _) = send(checkin_req(r#"{"qrPayload":"x"}"#), None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }
}
