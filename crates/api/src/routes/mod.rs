pub mod generations;
pub mod health;
pub mod queues;

use axum::routing::get;
use axum::Router;

use crate::handlers;
use crate::state::AppState;
use crate::ws;

/// Build the `/api/v1` route tree.
///
/// Route hierarchy:
///
/// ```text
/// /ws                         WebSocket (token in query or header)
///
/// /generations                list, create
/// /generations/{id}           get (owner only)
/// /generations/{id}/usage     usage rows (owner only)
///
/// /queues/stats               per-queue job counts
///
/// /usage                      caller's total processing time
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/ws", get(ws::ws_handler))
        .nest("/generations", generations::router())
        .nest("/queues", queues::router())
        .route("/usage", get(handlers::usage::usage_summary))
}
