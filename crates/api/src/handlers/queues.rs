//! Handlers for queue inspection.

use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use serde::Serialize;
use animagen_core::generation::ContentType;
use animagen_core::queue_policy::QueuePolicy;
use animagen_db::models::generation_job::QueueCounts;

use crate::error::AppResult;
use crate::middleware::auth::AuthUser;
use crate::response::DataResponse;
use crate::state::AppState;

/// Job counts and worker concurrency for one queue.
#[derive(Debug, Serialize)]
pub struct QueueStats {
    pub queue: &'static str,
    pub content_type: ContentType,
    pub concurrency: usize,
    #[serde(flatten)]
    pub counts: QueueCounts,
}

/// GET /api/v1/queues/stats
///
/// One entry per generation queue, image first.
pub async fn queue_stats(
    _auth: AuthUser,
    State(state): State<AppState>,
) -> AppResult<impl IntoResponse> {
    let mut data = Vec::with_capacity(ContentType::ALL.len());
    for content_type in ContentType::ALL {
        let counts = state.dispatcher.queue().counts(content_type).await?;
        data.push(QueueStats {
            queue: content_type.queue_name(),
            content_type,
            concurrency: QueuePolicy::for_type(content_type).concurrency,
            counts,
        });
    }
    Ok(Json(DataResponse { data }))
}
