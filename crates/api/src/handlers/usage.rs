//! Handlers for per-user usage totals.

use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use serde::Serialize;
use animagen_db::repositories::UsageLogRepo;

use crate::error::AppResult;
use crate::middleware::auth::AuthUser;
use crate::response::DataResponse;
use crate::state::AppState;

/// Processing time billed to the caller.
#[derive(Debug, Serialize)]
pub struct UsageSummary {
    pub total_processing_seconds: f64,
}

/// GET /api/v1/usage
pub async fn usage_summary(
    auth: AuthUser,
    State(state): State<AppState>,
) -> AppResult<impl IntoResponse> {
    let total_processing_seconds =
        UsageLogRepo::total_seconds_for_user(&state.pool, auth.user_id).await?;
    Ok(Json(DataResponse {
        data: UsageSummary {
            total_processing_seconds,
        },
    }))
}
