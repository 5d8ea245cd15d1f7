use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use tracing::{info, instrument, warn};

use super::{
    dto::{BookingResponse, CreateBookingRequest, QrCodeResponse},
    repo_types::BookingDetails,
    services::{create_booking, dispatch_confirmation},
};
use crate::{
    auth::{AuthUser, Role},
    error::{ApiError, ApiResult, ValidJson, ValidPath},
    state::AppState,
};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/bookings", post(book_slot))
        .route("/bookings/my", get(my_bookings))
        .route("/bookings/speaker", get(speaker_bookings))
        .route("/bookings/:id/qr", get(booking_qr))
}

#[instrument(skip(state, user, payload), fields(user_id = %user.id))]
pub async fn book_slot(
    State(state): State<AppState>,
    user: AuthUser,
    ValidJson(payload): ValidJson<CreateBookingRequest>,
) -> ApiResult<(StatusCode, Json<BookingResponse>)> {
    user.require(&[Role::Attendee])?;
    let slot_id = payload
        .slot_id
        .ok_or_else(|| ApiError::validation("slotId is required."))?;

    let details = create_booking(&state, user.id, slot_id).await?;
    dispatch_confirmation(&state, details.clone());
    Ok((StatusCode::CREATED, Json(details.into())))
}

#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn my_bookings(
    State(state): State<AppState>,
    user: AuthUser,
) -> ApiResult<Json<Vec<BookingResponse>>> {
    let rows = BookingDetails::list_for_attendee(&state.db, user.id).await?;
    Ok(Json(rows.into_iter().map(BookingResponse::from).collect()))
}

#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn speaker_bookings(
    State(state): State<AppState>,
    user: AuthUser,
) -> ApiResult<Json<Vec<BookingResponse>>> {
    user.require(&[Role::Speaker])?;
    let rows = BookingDetails::list_for_speaker(&state.db, user.id).await?;
    info!(count = rows.len(), "speaker bookings listed");
    Ok(Json(rows.into_iter().map(BookingResponse::from).collect()))
}

#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn booking_qr(
    State(state): State<AppState>,
    user: AuthUser,
    ValidPath(raw_id): ValidPath<String>,
) -> ApiResult<Json<QrCodeResponse>> {
    let id: i64 = raw_id
        .parse()
        .map_err(|_| ApiError::validation("Invalid booking ID."))?;

    let booking = BookingDetails::find(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::not_found("Booking not found."))?;
    if booking.user_id != user.id {
        warn!(booking_id = id, owner = %booking.user_id, "qr requested by non-owner");
        return Err(ApiError::forbidden(
            "Access denied. This booking belongs to another user.",
        ));
    }
    let qr_code_url = booking
        .qr_code_url
        .ok_or_else(|| ApiError::not_found("QR code not found for this booking."))?;
    Ok(Json(QrCodeResponse { qr_code_url }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::jwt::JwtKeys;
    use axum::{body::Body, extract::FromRef, http::Request};
    use tower::ServiceExt;
    use uuid::Uuid;

    fn bearer(state: &AppState, role: Role) -> String {
        let (token, _) = JwtKeys::from_ref(state)
            .sign(Uuid::new_v4(), "u@x.com", role)
            .unwrap();
        format!("Bearer {token}")
    }

    async fn send(state: AppState, req: Request<Body>) -> (StatusCode, serde_json::Value) {
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

    #[tokio::test]
    async fn booking_requires_slot_id() {
        let state = AppState::fake();
        let auth = bearer(&state, Role::Attendee);
        let req = Request::post("/bookings")
            .header("content-type", "application/json")
            .header("authorization", auth)
            .body(Body::from("{}"))
            .unwrap();
        let (status, body) = send(state, req).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "slotId is required.");
    }

    #[tokio::test]
    async fn speakers_cannot_book() {
        let state = AppState::fake();
        let auth = bearer(&state, Role::Speaker);
        let req = Request::post("/bookings")
            .header("content-type", "application/json")
            .header("authorization", auth)
            .body(Body::from(r#"{"slotId":1}"#))
            .unwrap();
        let (status, _) = send(state, req).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn speaker_listing_is_speaker_only() {
        let state = AppState::fake();
        let auth = bearer(&state, Role::Attendee);
        let req = Request::get("/bookings/speaker")
            .header("authorization", auth)
            .body(Body::empty())
            .unwrap();
        let (status, _) = send(state, req).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn qr_rejects_non_numeric_id() {
        let state = AppState::fake();
        let auth = bearer(&state, Role::Attendee);
        let req = Request::get("/bookings/abc/qr")
            .header("authorization", auth)
            .body(Body::empty())
            .unwrap();
        let (status, body) = send(state, req).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Invalid booking ID.");
    }

    #[tokio::test]
    async fn my_bookings_requires_auth() {
        let req = Request::get("/bookings/my").body(Body::empty()).unwrap();
        let (status, _) = send(AppState::fake(), req).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }
}
