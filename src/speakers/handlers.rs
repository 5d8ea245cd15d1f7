use axum::{
    extract::{DefaultBodyLimit, State},
    http::StatusCode,
    routing::{get, post, put},
    Json, Router,
};
use serde_json::{json, Value};
use time::OffsetDateTime;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use super::{
    dto::{
        CreateSlotRequest, IncomeResponse, SlotResponse, SlotsQuery, SpeakerResponse,
        UpdateProfileRequest,
    },
    repo_types::{IncomeRow, SessionSlot, SpeakerListRow, SpeakerProfile},
    services::{
        avatar_url, compute_income, parse_date, replace_avatar, validate_profile_update,
        validate_slot, AVATAR_MAX_BYTES,
    },
};
use crate::{
    auth::{AuthUser, MaybeAuthUser, Role},
    error::{
        is_unique_violation, ApiError, ApiResult, ValidJson, ValidMultipart, ValidPath, ValidQuery,
    },
    state::AppState,
};

const SLOT_UNIQUE: &str = "session_slots_speaker_date_hour_key";

pub fn public_routes() -> Router<AppState> {
    Router::new()
        .route("/speakers", get(list_speakers))
        .route("/speakers/slots/:speaker_id", get(list_slots))
}

pub fn speaker_routes() -> Router<AppState> {
    Router::new()
        .route("/speakers/me", put(update_me))
        .route("/speakers/me/income", get(income))
        .route("/speakers/slots", post(create_slot))
}

pub fn avatar_routes() -> Router<AppState> {
    Router::new()
        .route("/speakers/me/avatar", put(upload_avatar))
        .layer(DefaultBodyLimit::max(AVATAR_MAX_BYTES + 64 * 1024)) // multipart overhead
}

#[instrument(skip(state))]
pub async fn list_speakers(State(state): State<AppState>) -> ApiResult<Json<Vec<SpeakerResponse>>> {
    let rows = SpeakerListRow::list_all(&state.db).await?;
    let mut out = Vec::with_capacity(rows.len());
    for row in rows {
        let url = avatar_url(&state, row.avatar_key.as_deref()).await;
        out.push(SpeakerResponse::from_row(row, url));
    }
    Ok(Json(out))
}

#[instrument(skip(state, user, payload), fields(user_id = %user.id))]
pub async fn update_me(
    State(state): State<AppState>,
    user: AuthUser,
    ValidJson(payload): ValidJson<UpdateProfileRequest>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    user.require(&[Role::Speaker])?;
    let update = validate_profile_update(payload)?;

    let (status, message, profile) = match SpeakerProfile::find(&state.db, user.id).await? {
        Some(_) => {
            let profile = SpeakerProfile::update(&state.db, user.id, &update).await?;
            (StatusCode::OK, "Profile updated successfully.", profile)
        }
        None => {
            let profile = SpeakerProfile::create_from(&state.db, user.id, &update).await?;
            (StatusCode::CREATED, "Profile created successfully.", profile)
        }
    };
    info!(speaker_id = %user.id, status = status.as_u16(), "speaker profile saved");

    Ok((status, Json(json!({ "message": message, "profile": profile }))))
}

#[instrument(skip(state, user, mp), fields(user_id = %user.id))]
pub async fn upload_avatar(
    State(state): State<AppState>,
    user: AuthUser,
    ValidMultipart(mut mp): ValidMultipart,
) -> ApiResult<Json<Value>> {
    user.require(&[Role::Speaker])?;

    let mut upload = None;
    while let Some(field) = mp
        .next_field()
        .await
        .map_err(|e| ApiError::validation(e.body_text()))?
    {
        if field.name() != Some("avatar") {
            continue;
        }
        let content_type = field
            .content_type()
            .map(str::to_string)
            .unwrap_or_else(|| "application/octet-stream".into());
        let data = field.bytes().await.map_err(|e| {
            warn!(error = %e, "avatar field unreadable");
            ApiError::validation(e.body_text())
        })?;
        upload = Some((content_type, data));
        break;
    }
    let (content_type, data) =
        upload.ok_or_else(|| ApiError::validation("Multipart field `avatar` is required."))?;

    let key = replace_avatar(&state, user.id, data, &content_type).await?;
    let url = avatar_url(&state, Some(&key)).await;
    Ok(Json(json!({ "avatarKey": key, "avatarUrl": url })))
}

#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn income(State(state): State<AppState>, user: AuthUser) -> ApiResult<Json<IncomeResponse>> {
    user.require(&[Role::Speaker])?;
    let profile = SpeakerProfile::find(&state.db, user.id)
        .await?
        .ok_or_else(|| ApiError::not_found("Speaker profile not found."))?;
    let rows = IncomeRow::list_for_speaker(&state.db, user.id).await?;
    Ok(Json(compute_income(profile.price_per_hour, &rows)))
}

#[instrument(skip(state, viewer))]
pub async fn list_slots(
    State(state): State<AppState>,
    MaybeAuthUser(viewer): MaybeAuthUser,
    ValidPath(speaker_id): ValidPath<Uuid>,
    ValidQuery(q): ValidQuery<SlotsQuery>,
) -> ApiResult<Json<Vec<SlotResponse>>> {
    let raw = q
        .date
        .as_deref()
        .filter(|d| !d.trim().is_empty())
        .ok_or_else(|| ApiError::validation("Date query parameter is required (YYYY-MM-DD)."))?;
    let date = parse_date(raw)?;

    if SpeakerProfile::find(&state.db, speaker_id).await?.is_none() {
        return Err(ApiError::not_found("Speaker not found."));
    }

    let is_owner = viewer.as_ref().is_some_and(|u| u.id == speaker_id);
    let slots = SessionSlot::list_for_date(&state.db, speaker_id, date, is_owner).await?;
    Ok(Json(slots.into_iter().map(SlotResponse::from).collect()))
}

#[instrument(skip(state, user, payload), fields(user_id = %user.id))]
pub async fn create_slot(
    State(state): State<AppState>,
    user: AuthUser,
    ValidJson(payload): ValidJson<CreateSlotRequest>,
) -> ApiResult<(StatusCode, Json<SlotResponse>)> {
    user.require(&[Role::Speaker])?;
    let today = OffsetDateTime::now_utc().date();
    let (date, hour) = validate_slot(&payload.session_date, payload.hour, today)?;

    SpeakerProfile::ensure_exists(&state.db, user.id).await?;

    match SessionSlot::create(&state.db, user.id, date, hour).await {
        Ok(slot) => {
            info!(slot_id = slot.id, %date, hour, "slot created");
            Ok((StatusCode::CREATED, Json(slot.into())))
        }
        Err(e) if is_unique_violation(&e, Some(SLOT_UNIQUE)) => {
            warn!(%date, hour, "duplicate slot");
            Err(ApiError::conflict(
                "A slot for this speaker, date, and hour already exists.",
            ))
        }
        Err(e) => Err(e.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::jwt::JwtKeys;
    use axum::{body::Body, extract::FromRef, http::Request};
    use tower::ServiceExt;

    fn bearer(state: &AppState, role: Role) -> String {
        let keys = JwtKeys::from_ref(state);
        let (token, _) = keys.sign(Uuid::new_v4(), "u@x.com", role).unwrap();
        format!("Bearer {token}")
    }

    async fn send(state: AppState, req: Request<Body>) -> (StatusCode, serde_json::Value) {
        let app = crate::app::api_router().with_state(state);
        let res = app.oneshot(req).await.unwrap();
        let status = res.status();
        let bytes = axum::body::to_bytes(res.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap_or_default())
    }

    #[tokio::test]
    async fn attendee_cannot_create_slots() {
        let state = AppState::fake();
        let auth = bearer(&state, Role::Attendee);
        let req = Request::post("/speakers/slots")
            .header("content-type", "application/json")
            .header("authorization", auth)
            .body(Body::from(r#"{"session_date":"2999-01-01","hour":10}"#))
            .unwrap();
        let (status, body) = send(state, req).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert!(body["error"].as_str().unwrap().contains("speaker"));
    }

    #[tokio::test]
    async fn slot_hour_out_of_range_is_rejected() {
        let state = AppState::fake();
        let auth = bearer(&state, Role::Speaker);
        let req = Request::post("/speakers/slots")
            .header("content-type", "application/json")
            .header("authorization", auth)
            .body(Body::from(r#"{"session_date":"2999-01-01","hour":17}"#))
            .unwrap();
        let (status, _) = send(state, req).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn profile_update_needs_a_field() {
        let state = AppState::fake();
        let auth = bearer(&state, Role::Speaker);
        let req = Request::put("/speakers/me")
            .header("content-type", "application/json")
            .header("authorization", auth)
            .body(Body::from("{}"))
            .unwrap();
        let (status, body) = send(state, req).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().starts_with("At least one field"));
    }

    #[tokio::test]
    async fn slot_listing_requires_a_valid_date() {
        let id = Uuid::new_v4();
        let req = Request::get(format!("/speakers/slots/{id}"))
            .body(Body::empty())
            .unwrap();
        let (status, _) = send(AppState::fake(), req).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let req = Request::get(format!("/speakers/slots/{id}?date=01-02-2030"))
            .body(Body::empty())
            .unwrap();
        let (status, body) = send(AppState::fake(), req).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Invalid date format. Please use YYYY-MM-DD.");
    }

    #[tokio::test]
    async fn malformed_speaker_id_is_a_json_error() {
        let req = Request::get("/speakers/slots/not-a-uuid?date=2030-01-01")
            .body(Body::empty())
            .unwrap();
        let (status, body) = send(AppState::fake(), req).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().contains("UUID"));
    }

    #[tokio::test]
    async fn avatar_upload_without_multipart_body_is_a_json_error() {
        let state = AppState::fake();
        let auth = bearer(&state, Role::Speaker);
        let req = Request::put("/speakers/me/avatar")
            .header("content-type", "application/json")
            .header("authorization", auth)
            .body(Body::from("{}"))
            .unwrap();
        let (status, body) = send(state, req).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].is_string());
    }

    #[tokio::test]
    async fn income_requires_auth() {
        let req = Request::get("/speakers/me/income").body(Body::empty()).unwrap();
        let (status, _) = send(AppState::fake(), req).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }
}
