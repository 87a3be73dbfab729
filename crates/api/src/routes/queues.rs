//! Route definitions for queue inspection.

use axum::routing::get;
use axum::Router;

use crate::handlers::queues;
use crate::state::AppState;

/// Routes mounted at `/queues`.
///
/// ```text
/// GET    /stats           -> queue_stats
/// ```
pub fn router() -> Router<AppState> {
    Router::new().route("/stats", get(queues::queue_stats))
}
