use axum::extract::State;
use axum::{routing::get, Json, Router};
use serde::Serialize;

use crate::state::AppState;

/// Health check response payload.
#[derive(Serialize)]
pub struct HealthResponse {
    /// `"ok"` when every dependency answers, `"degraded"` otherwise.
    pub status: &'static str,
    /// Crate version from Cargo.toml.
    pub version: &'static str,
    /// Whether the database is reachable.
    pub db_healthy: bool,
    /// Whether the AI generation service answers its health probe.
    pub ai_service_healthy: bool,
}

/// GET /health -- returns service, database and AI service health.
async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let (db, ai) = tokio::join!(
        animagen_db::health_check(&state.pool),
        state.ai_client.health(),
    );
    let db_healthy = db.is_ok();
    let ai_service_healthy = match ai {
        Ok(_) => true,
        Err(e) => {
            tracing::debug!(error = %e, "AI service health probe failed");
            false
        }
    };

    let status = if db_healthy && ai_service_healthy {
        "ok"
    } else {
        "degraded"
    };

    Json(HealthResponse {
        status,
        version: env!("CARGO_PKG_VERSION"),
        db_healthy,
        ai_service_healthy,
    })
}

/// Mount health check routes (intended for root-level, NOT under `/api/v1`).
pub fn router() -> Router<AppState> {
    Router::new().route("/health", get(health_check))
}
