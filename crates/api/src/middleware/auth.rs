//! JWT-based authentication extractor for Axum handlers.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use animagen_core::error::CoreError;
use animagen_core::types::DbId;

use crate::auth::jwt::validate_token;
use crate::error::AppError;
use crate::state::AppState;

/// Authenticated user, from `Authorization: Bearer <token>` or, for
/// WebSocket upgrades where browsers cannot set headers, a `token` query
/// parameter.
#[derive(Debug, Clone)]
pub struct AuthUser {
    /// The user's internal database id (from `claims.sub`).
    pub user_id: DbId,
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = match parts.headers.get("authorization") {
            Some(value) => {
                let header = value.to_str().map_err(|_| unauthorized("Invalid Authorization header"))?;
                header.strip_prefix("Bearer ").ok_or_else(|| {
                    unauthorized("Invalid Authorization format. Expected: Bearer <token>")
                })?
            }
            None => query_token(parts.uri.query())
                .ok_or_else(|| unauthorized("Missing Authorization header"))?,
        };

        let claims = validate_token(token, &state.config.jwt)
            .map_err(|_| unauthorized("Invalid or expired token"))?;

        Ok(AuthUser {
            user_id: claims.sub,
        })
    }
}

fn unauthorized(msg: &str) -> AppError {
    AppError::Core(CoreError::Unauthorized(msg.into()))
}

/// Extract `token=...` from a raw query string.
fn query_token(query: Option<&str>) -> Option<&str> {
    query?
        .split('&')
        .filter_map(|pair| pair.split_once('='))
        .find(|(key, _)| *key == "token")
        .map(|(_, value)| value)
        .filter(|value| !value.is_empty())
}
