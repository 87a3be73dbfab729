#![allow(dead_code)]

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, Response};
use axum::Router;
use http_body_util::BodyExt;
use sqlx::PgPool;
use tower::ServiceExt;

use animagen_aiservice::GenerationApi;
use animagen_api::auth::jwt::{generate_access_token, JwtConfig};
use animagen_api::config::ServerConfig;
use animagen_api::router::build_app_router;
use animagen_api::state::AppState;
use animagen_api::ws::WsManager;
use animagen_core::types::DbId;
use animagen_events::EventBus;
use animagen_worker::{JobDispatcher, JobQueue, PgJobQueue, QueueSignals};

/// Nothing listens here, so AI health probes fail fast.
pub const UNREACHABLE_AI_URL: &str = "http://127.0.0.1:9";

/// Build a test `ServerConfig` with safe defaults.
pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        database_url: String::new(),
        queue_database_url: String::new(),
        ai_service_url: UNREACHABLE_AI_URL.to_string(),
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        shutdown_timeout_secs: 30,
        jwt: JwtConfig {
            secret: "test-secret-that-is-long-enough-for-hmac".to_string(),
            access_token_expiry_mins: 15,
        },
    }
}

/// Everything a test may want to poke at besides the router.
pub struct TestApp {
    pub router: Router,
    pub pool: PgPool,
    pub event_bus: Arc<EventBus>,
    pub ws_manager: Arc<WsManager>,
    pub job_queue: Arc<dyn JobQueue>,
    pub signals: QueueSignals,
}

/// Build the full application router against `pool`, with the AI service
/// at `ai_url`. No worker pools run, so accepted jobs stay queued.
pub fn build_test_app_with(pool: PgPool, ai_url: &str) -> TestApp {
    let mut config = test_config();
    config.ai_service_url = ai_url.to_string();

    let job_queue: Arc<dyn JobQueue> = Arc::new(PgJobQueue::new(pool.clone()));
    let signals = QueueSignals::new();
    let event_bus = Arc::new(EventBus::default());
    let ws_manager = Arc::new(WsManager::new());

    let state = AppState {
        pool: pool.clone(),
        config: Arc::new(config.clone()),
        ws_manager: Arc::clone(&ws_manager),
        dispatcher: Arc::new(JobDispatcher::new(Arc::clone(&job_queue), signals.clone())),
        ai_client: Arc::new(GenerationApi::new(ai_url)),
    };

    TestApp {
        router: build_app_router(state, &config),
        pool,
        event_bus,
        ws_manager,
        job_queue,
        signals,
    }
}

pub fn build_test_app(pool: PgPool) -> Router {
    build_test_app_with(pool, UNREACHABLE_AI_URL).router
}

/// A valid bearer token for `user_id`.
pub fn token_for(user_id: DbId) -> String {
    generate_access_token(user_id, &test_config().jwt).expect("token generation should succeed")
}

pub async fn get(app: Router, uri: &str) -> Response<Body> {
    let request = Request::get(uri).body(Body::empty()).unwrap();
    app.oneshot(request).await.unwrap()
}

pub async fn get_auth(app: Router, uri: &str, token: &str) -> Response<Body> {
    let request = Request::get(uri)
        .header("Authorization", format!("Bearer {token}"))
        .body(Body::empty())
        .unwrap();
    app.oneshot(request).await.unwrap()
}

pub async fn post_json_auth(
    app: Router,
    uri: &str,
    token: &str,
    body: serde_json::Value,
) -> Response<Body> {
    let request = Request::post(uri)
        .header("Authorization", format!("Bearer {token}"))
        .header("Content-Type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    app.oneshot(request).await.unwrap()
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}
