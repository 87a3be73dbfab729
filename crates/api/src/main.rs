use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use animagen_aiservice::{GenerationApi, GenerationBackend};
use animagen_api::config::ServerConfig;
use animagen_api::notifications::NotificationRouter;
use animagen_api::router::build_app_router;
use animagen_api::state::AppState;
use animagen_api::ws;
use animagen_core::generation::ContentType;
use animagen_events::EventBus;
use animagen_worker::{
    JobDispatcher, JobProcessor, JobQueue, OutputStore, PgJobQueue, PgOutputStore, QueueSignals,
};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        "animagen_api=debug,animagen_worker=debug,animagen_aiservice=debug,tower_http=debug".into()
    });
    let json_logs = std::env::var("LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json"));
    if json_logs {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }

    // --- Configuration ---
    let config = ServerConfig::from_env();
    tracing::info!(host = %config.host, port = %config.port, "Loaded server configuration");

    // --- Databases ---
    let pool = animagen_db::create_pool(&config.database_url)
        .await
        .expect("Failed to connect to database");
    animagen_db::health_check(&pool)
        .await
        .expect("Database health check failed");
    animagen_db::run_migrations(&pool)
        .await
        .expect("Failed to run database migrations");
    tracing::info!("Database ready");

    let queue_pool = if config.queue_database_url == config.database_url {
        pool.clone()
    } else {
        let queue_pool = animagen_db::create_pool(&config.queue_database_url)
            .await
            .expect("Failed to connect to queue database");
        animagen_db::run_migrations(&queue_pool)
            .await
            .expect("Failed to run queue database migrations");
        tracing::info!("Queue database ready");
        queue_pool
    };

    // --- Queue ---
    let job_queue: Arc<dyn JobQueue> = Arc::new(PgJobQueue::new(queue_pool));
    match job_queue.recover_stalled().await {
        Ok(0) => {}
        Ok(recovered) => tracing::warn!(recovered, "Returned stalled jobs to their queues"),
        Err(e) => tracing::error!(error = %e, "Failed to recover stalled jobs"),
    }
    let output_store: Arc<dyn OutputStore> = Arc::new(PgOutputStore::new(pool.clone()));
    let signals = QueueSignals::new();
    let dispatcher = Arc::new(JobDispatcher::new(Arc::clone(&job_queue), signals.clone()));

    // --- AI service ---
    let ai_client = Arc::new(GenerationApi::new(config.ai_service_url.clone()));
    tracing::info!(url = %ai_client.api_url(), "AI service client configured");

    // --- Event bus + notification delivery ---
    let event_bus = Arc::new(EventBus::default());
    let ws_manager = Arc::new(ws::WsManager::new());
    let heartbeat_handle = ws::start_heartbeat(Arc::clone(&ws_manager));
    let router_handle = tokio::spawn(
        NotificationRouter::new(Arc::clone(&ws_manager)).run(event_bus.subscribe()),
    );

    // --- Worker pools ---
    let worker_cancel = CancellationToken::new();
    let backend: Arc<dyn GenerationBackend> = ai_client.clone();
    let mut worker_handles = Vec::new();
    for content_type in ContentType::ALL {
        let processor = Arc::new(JobProcessor::new(
            content_type,
            Arc::clone(&job_queue),
            Arc::clone(&output_store),
            Arc::clone(&backend),
            Arc::clone(&event_bus),
            &signals,
        ));
        worker_handles.extend(processor.spawn(worker_cancel.clone()));
    }

    // --- App state ---
    let state = AppState {
        pool,
        config: Arc::new(config.clone()),
        ws_manager: Arc::clone(&ws_manager),
        dispatcher,
        ai_client,
    };
    let app = build_app_router(state, &config);

    // --- Start server ---
    let addr = SocketAddr::new(
        config.host.parse().expect("Invalid HOST address"),
        config.port,
    );
    tracing::info!(%addr, "Starting server");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server error");

    // --- Post-shutdown cleanup ---
    tracing::info!("Server stopped accepting connections, cleaning up");

    // Workers stop claiming; running generations get the shutdown window.
    worker_cancel.cancel();
    let drain = futures::future::join_all(worker_handles);
    if tokio::time::timeout(Duration::from_secs(config.shutdown_timeout_secs), drain)
        .await
        .is_err()
    {
        tracing::warn!(
            timeout_secs = config.shutdown_timeout_secs,
            "Workers still busy at shutdown; their jobs will be recovered on next start",
        );
    } else {
        tracing::info!("Worker pools stopped");
    }

    // Dropping the last sender closes the broadcast channel and ends the router.
    drop(event_bus);
    let _ = tokio::time::timeout(Duration::from_secs(5), router_handle).await;
    tracing::info!("Notification router shut down");

    let ws_count = ws_manager.connection_count().await;
    tracing::info!(ws_count, "Closing remaining WebSocket connections");
    ws_manager.shutdown_all().await;

    heartbeat_handle.abort();

    tracing::info!("Graceful shutdown complete");
}

/// Wait for a termination signal to initiate graceful shutdown.
///
/// Handles both SIGINT (Ctrl-C) and SIGTERM (on Unix).
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl-C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received SIGINT (Ctrl-C), starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        }
    }
}
