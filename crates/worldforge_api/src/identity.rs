//! Request principal extraction.
//!
//! The session layer in front of this service forwards the signed-in user
//! id in [`USER_HEADER`]; the role always comes from the `users` table.

use crate::api::ApiReply;
use crate::http::AppState;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use worldforge_core::{Principal, SqliteUserRepository, UserService};

/// Header carrying the authenticated user id.
pub const USER_HEADER: &str = "x-user-id";

/// Extractor that resolves the caller or rejects with `401 UNAUTHORIZED`.
#[derive(Debug, Clone)]
pub struct Authenticated(pub Principal);

#[axum::async_trait]
impl FromRequestParts<AppState> for Authenticated {
    type Rejection = ApiReply;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let user_id = parts
            .headers
            .get(USER_HEADER)
            .and_then(|value| value.to_str().ok());

        let principal = state.with_conn(|conn| {
            UserService::new(SqliteUserRepository::try_new(conn)?).resolve_principal(user_id)
        })?;
        Ok(Self(principal))
    }
}
