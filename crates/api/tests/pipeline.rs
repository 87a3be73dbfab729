//! End to end: HTTP submission, a worker run against Postgres, and the
//! socket notification reaching the owner.

mod common;

use std::sync::Arc;

use async_trait::async_trait;
use axum::extract::ws::Message;
use axum::http::StatusCode;
use common::{body_json, get_auth, post_json_auth, token_for};
use serde_json::json;
use sqlx::PgPool;
use animagen_aiservice::{
    GenerationApiError, GenerationBackend, GenerationRequest, GenerationResponse,
};
use animagen_api::notifications::NotificationRouter;
use animagen_core::generation::ContentType;
use animagen_worker::processor::JobOutcome;
use animagen_worker::{JobProcessor, OutputStore, PgOutputStore};

/// Backend that renders every request instantly.
struct InstantBackend;

#[async_trait]
impl GenerationBackend for InstantBackend {
    async fn generate(
        &self,
        request: &GenerationRequest,
    ) -> Result<GenerationResponse, GenerationApiError> {
        Ok(GenerationResponse {
            output_id: Some(request.output_id().to_string()),
            file_path: format!("/outputs/{}.png", request.output_id()),
            thumbnail_path: None,
            metadata: json!({"width": 512, "height": 512, "format": "png"}),
            processing_time: Some(0.5),
        })
    }
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn completed_generation_is_stored_billed_and_announced(pool: PgPool) {
    let app = common::build_test_app_with(pool.clone(), common::UNREACHABLE_AI_URL);
    let token = token_for(1);

    let mut socket = app.ws_manager.add("conn-1".into(), 1).await;
    let router = tokio::spawn(
        NotificationRouter::new(Arc::clone(&app.ws_manager)).run(app.event_bus.subscribe()),
    );

    let response = post_json_auth(
        app.router.clone(),
        "/api/v1/generations",
        &token,
        json!({"content_type": "image", "prompt": "A cat on a skateboard"}),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let output_id = body_json(response).await["data"]["output"]["id"]
        .as_i64()
        .unwrap();

    let outputs: Arc<dyn OutputStore> = Arc::new(PgOutputStore::new(pool.clone()));
    let processor = JobProcessor::new(
        ContentType::Image,
        Arc::clone(&app.job_queue),
        outputs,
        Arc::new(InstantBackend),
        Arc::clone(&app.event_bus),
        &app.signals,
    );
    let outcome = processor.process_next().await.unwrap();
    assert_eq!(outcome, Some(JobOutcome::Completed));
    assert_eq!(processor.process_next().await.unwrap(), None);

    let json = body_json(
        get_auth(
            app.router.clone(),
            &format!("/api/v1/generations/{output_id}"),
            &token,
        )
        .await,
    )
    .await;
    assert_eq!(json["data"]["status"], "COMPLETED");
    assert_eq!(json["data"]["file_path"], format!("/outputs/{output_id}.png"));

    let json = body_json(
        get_auth(
            app.router.clone(),
            &format!("/api/v1/generations/{output_id}/usage"),
            &token,
        )
        .await,
    )
    .await;
    assert_eq!(json["data"].as_array().unwrap().len(), 1);

    let frame = tokio::time::timeout(std::time::Duration::from_secs(5), socket.recv())
        .await
        .expect("notification should arrive")
        .expect("socket channel should stay open");
    let Message::Text(text) = frame else {
        panic!("expected a text frame, got {frame:?}");
    };
    let event: serde_json::Value = serde_json::from_str(text.as_str()).unwrap();
    assert_eq!(event["event"], "generation-complete");
    assert_eq!(event["data"]["outputId"], output_id);
    assert_eq!(event["data"]["type"], "IMAGE");
    assert_eq!(event["data"]["status"], "COMPLETED");

    router.abort();
}
