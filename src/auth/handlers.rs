use axum::{
    extract::{FromRef, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use time::{Duration, OffsetDateTime};
use tracing::{error, info, instrument, warn};

use crate::{
    auth::{
        dto::{
            LoginRequest, LoginResponse, MessageResponse, PublicUser, SignupRequest,
            SignupResponse, VerifyOtpRequest,
        },
        extractors::AuthUser,
        jwt::JwtKeys,
        password::{hash_password, verify_password},
        repo_types::{Identity, Role},
        services::{check_otp, generate_otp, DEMO_OTP_HINT},
    },
    config::OtpMode,
    error::{is_unique_violation, ApiError, ApiResult, ValidJson},
    speakers::repo_types::SpeakerProfile,
    state::AppState,
};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/signup", post(signup))
        .route("/auth/verify-otp", post(verify_otp))
        .route("/auth/login", post(login))
}

pub fn me_routes() -> Router<AppState> {
    Router::new().route("/auth/me", get(get_me))
}

#[instrument(skip(state, payload))]
pub async fn signup(
    State(state): State<AppState>,
    ValidJson(payload): ValidJson<SignupRequest>,
) -> ApiResult<(StatusCode, Json<SignupResponse>)> {
    let new = payload.validate()?;

    if Identity::find_by_email(&state.db, &new.email).await?.is_some() {
        warn!(email = %new.email, "email already registered");
        return Err(ApiError::conflict("User with this email already exists."));
    }

    let hash = hash_password(&new.password)?;
    let otp = generate_otp();
    let otp_expires_at =
        OffsetDateTime::now_utc() + Duration::minutes(state.config.otp_ttl_minutes);

    let mut tx = state.db.begin().await?;
    let identity = match Identity::create_tx(&mut tx, &new, &hash, &otp, otp_expires_at).await {
        Ok(identity) => identity,
        Err(e) if is_unique_violation(&e, None) => {
            warn!(email = %new.email, "email registered concurrently");
            return Err(ApiError::conflict("User with this email already exists."));
        }
        Err(e) => return Err(e.into()),
    };
    if identity.role == Role::Speaker {
        SpeakerProfile::create_empty_tx(&mut tx, identity.id).await?;
    }
    tx.commit().await?;

    // The SMS is best-effort; signup succeeds whether or not it arrives.
    let sms = state.sms.clone();
    let phone = identity.phone.clone();
    let body = format!("Your verification code is: {otp}");
    let user_id = identity.id;
    tokio::spawn(async move {
        if let Err(e) = sms.send(&phone, &body).await {
            error!(error = %e, %user_id, "failed to send verification sms");
        }
    });

    info!(user_id = %identity.id, email = %identity.email, role = %identity.role, "identity registered");

    let (message, demo_otp) = match state.config.otp_mode {
        OtpMode::Demo => (
            "User created successfully. Enter any 6-digit code (e.g. 123456) to verify the account."
                .to_string(),
            Some(DEMO_OTP_HINT.to_string()),
        ),
        OtpMode::Strict => (
            "User created successfully. A verification code has been sent by SMS.".to_string(),
            None,
        ),
    };

    Ok((
        StatusCode::CREATED,
        Json(SignupResponse {
            message,
            user_id: identity.id,
            demo_otp,
        }),
    ))
}

#[instrument(skip(state, payload))]
pub async fn verify_otp(
    State(state): State<AppState>,
    ValidJson(payload): ValidJson<VerifyOtpRequest>,
) -> ApiResult<Json<MessageResponse>> {
    let email = payload.email.trim().to_lowercase();
    if email.is_empty() || payload.otp.is_empty() {
        return Err(ApiError::validation("Email and OTP are required."));
    }

    let identity = Identity::find_by_email(&state.db, &email)
        .await?
        .ok_or_else(|| ApiError::not_found("User not found."))?;

    check_otp(
        state.config.otp_mode,
        &identity,
        payload.otp.trim(),
        OffsetDateTime::now_utc(),
    )?;

    Identity::mark_verified(&state.db, identity.id).await?;
    info!(user_id = %identity.id, "identity verified");

    Ok(Json(MessageResponse {
        message: "OTP verified successfully. You can now log in.".into(),
    }))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    ValidJson(payload): ValidJson<LoginRequest>,
) -> ApiResult<Json<LoginResponse>> {
    let email = payload.email.trim().to_lowercase();
    if email.is_empty() || payload.password.is_empty() {
        return Err(ApiError::validation("Email and password are required."));
    }

    let Some(identity) = Identity::find_by_email(&state.db, &email).await? else {
        warn!(%email, "login unknown email");
        return Err(ApiError::unauthorized("Invalid login credentials."));
    };

    if !identity.otp_verified {
        warn!(user_id = %identity.id, "login before verification");
        return Err(ApiError::forbidden(
            "Account not verified. Please verify OTP first.",
        ));
    }

    if !verify_password(&payload.password, &identity.password_hash)? {
        warn!(user_id = %identity.id, "login invalid password");
        return Err(ApiError::unauthorized("Invalid login credentials."));
    }

    let keys = JwtKeys::from_ref(&state);
    let (token, expires_at) = keys.sign(identity.id, &identity.email, identity.role)?;

    info!(user_id = %identity.id, role = %identity.role, "identity logged in");
    Ok(Json(LoginResponse {
        token,
        expires_at,
        user: identity.into(),
    }))
}

#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn get_me(
    State(state): State<AppState>,
    user: AuthUser,
) -> ApiResult<Json<PublicUser>> {
    let identity = Identity::find_by_id(&state.db, user.id)
        .await?
        .ok_or_else(|| ApiError::not_found("User profile not found."))?;
    Ok(Json(identity.into()))
}
