use axum::{
    async_trait,
    extract::{FromRequestParts, OriginalUri},
    http::request::Parts,
};
use tracing::{debug, warn};
use uuid::Uuid;

use super::{demo, jwt::JwtKeys, repo_types::Role};
use crate::{
    config::{AppConfig, AuthMode},
    error::ApiError,
    state::AppState,
};

/// Strategy used to turn request headers into an identity.
#[derive(Clone)]
pub enum Authenticator {
    /// Bearer JWT; role gates enforced.
    Token(JwtKeys),
    /// Fixed demo identity picked from the path; role gates bypassed.
    Demo,
}

impl Authenticator {
    pub fn from_config(cfg: &AppConfig) -> Self {
        match cfg.auth_mode {
            AuthMode::Token => Authenticator::Token(JwtKeys::from_config(&cfg.jwt)),
            AuthMode::Demo => {
                warn!("AUTH_MODE=demo: token validation and role checks are disabled");
                Authenticator::Demo
            }
        }
    }

    /// Authenticate a request. `Ok(None)` means no credentials were presented.
    pub fn authenticate(&self, parts: &Parts) -> Result<Option<AuthUser>, ApiError> {
        match self {
            Authenticator::Demo => {
                let path = parts
                    .extensions
                    .get::<OriginalUri>()
                    .map(|uri| uri.0.path().to_string())
                    .unwrap_or_else(|| parts.uri.path().to_string());
                let who = demo::identity_for_path(&path);
                debug!(%path, role = %who.role, "demo identity attached");
                Ok(Some(AuthUser {
                    id: who.id,
                    email: who.email.to_string(),
                    role: who.role,
                    roles_bypassed: true,
                }))
            }
            Authenticator::Token(keys) => {
                let Some(header) = parts.headers.get(axum::http::header::AUTHORIZATION) else {
                    return Ok(None);
                };
                let token = header
                    .to_str()
                    .ok()
                    .and_then(|h| h.strip_prefix("Bearer ").or_else(|| h.strip_prefix("bearer ")))
                    .ok_or_else(|| ApiError::unauthorized("Invalid Authorization header"))?;

                let claims = keys.verify(token).map_err(|_| {
                    warn!("invalid or expired token");
                    ApiError::unauthorized("Invalid or expired token")
                })?;

                Ok(Some(AuthUser {
                    id: claims.sub,
                    email: claims.email,
                    role: claims.role,
                    roles_bypassed: false,
                }))
            }
        }
    }

    /// Identity for public endpoints. Bad credentials count as anonymous, and the
    /// demo identity is never attached since no credentials were presented.
    pub fn authenticate_optional(&self, parts: &Parts) -> Option<AuthUser> {
        match self {
            Authenticator::Demo => None,
            Authenticator::Token(_) => self.authenticate(parts).ok().flatten(),
        }
    }
}

/// Authenticated caller.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub id: Uuid,
    pub email: String,
    pub role: Role,
    pub roles_bypassed: bool,
}

impl AuthUser {
    /// Fail with 403 unless the caller holds one of `allowed`.
    pub fn require(&self, allowed: &[Role]) -> Result<(), ApiError> {
        if self.roles_bypassed || allowed.contains(&self.role) {
            return Ok(());
        }
        let names: Vec<&str> = allowed.iter().map(|r| r.as_str()).collect();
        warn!(user_id = %self.id, role = %self.role, "role check failed");
        Err(ApiError::forbidden(format!(
            "Access forbidden: requires {} role.",
            names.join(" or ")
        )))
    }
}

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        state
            .auth
            .authenticate(parts)?
            .ok_or_else(|| ApiError::unauthorized("Missing Authorization header"))
    }
}

/// Caller identity when present; public endpoints use this.
pub struct MaybeAuthUser(pub Option<AuthUser>);

#[async_trait]
impl FromRequestParts<AppState> for MaybeAuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        Ok(MaybeAuthUser(state.auth.authenticate_optional(parts)))
    }
}
