use crate::state::AppState;
use axum::Router;

mod claims;
pub mod demo;
pub mod dto;
pub mod extractors;
pub mod handlers;
pub mod jwt;
pub mod password;
pub mod repo;
pub mod repo_types;
pub mod services;

pub use extractors::{AuthUser, Authenticator, MaybeAuthUser};
pub use repo_types::Role;

pub fn router() -> Router<AppState> {
    Router::new()
        .merge(handlers::auth_routes())
        .merge(handlers::me_routes())
}
