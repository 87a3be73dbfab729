use std::sync::Arc;

use animagen_aiservice::GenerationApi;
use animagen_worker::JobDispatcher;

use crate::config::ServerConfig;
use crate::ws::WsManager;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// Cheap to clone: everything is behind an `Arc` or is already a handle.
#[derive(Clone)]
pub struct AppState {
    /// Main database pool (prompts, outputs, usage logs).
    pub pool: animagen_db::DbPool,
    pub config: Arc<ServerConfig>,
    /// WebSocket connection manager (browser clients).
    pub ws_manager: Arc<WsManager>,
    /// Routes new generations onto the image/video queues.
    pub dispatcher: Arc<JobDispatcher>,
    /// Client for the AI generation service, used for health reporting.
    pub ai_client: Arc<GenerationApi>,
}
