//! Integration tests for `/api/v1/generations`, `/queues` and `/usage`.

mod common;

use axum::http::StatusCode;
use common::{body_json, get, get_auth, post_json_auth, token_for};
use serde_json::json;
use sqlx::PgPool;
use animagen_core::generation::ContentType;
use animagen_db::repositories::GenerationJobRepo;

const ALICE: i64 = 1;
const BOB: i64 = 2;

async fn create(app: axum::Router, user: i64, body: serde_json::Value) -> serde_json::Value {
    let response = post_json_auth(app, "/api/v1/generations", &token_for(user), body).await;
    assert_eq!(response.status(), StatusCode::CREATED);
    body_json(response).await
}

// ---------------------------------------------------------------------------
// Create
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn create_records_pending_output_and_queues_job(pool: PgPool) {
    let app = common::build_test_app_with(pool.clone(), common::UNREACHABLE_AI_URL);

    let json = create(
        app.router.clone(),
        ALICE,
        json!({"content_type": "image", "prompt": "A cat on a skateboard"}),
    )
    .await;

    let output = &json["data"]["output"];
    let job = &json["data"]["job"];
    assert_eq!(output["status"], "PENDING");
    assert_eq!(output["content_type"], "IMAGE");
    assert_eq!(output["user_id"], ALICE);
    assert_eq!(job["queue"], "image-generation");
    assert_eq!(job["output_id"], output["id"]);

    let row = GenerationJobRepo::find_by_id(&pool, job["job_id"].as_i64().unwrap())
        .await
        .unwrap()
        .expect("queue row should exist");
    assert_eq!(row.queue, "image-generation");
    assert_eq!(row.payload["output_id"], output["id"]);

    let counts = app.job_queue.counts(ContentType::Image).await.unwrap();
    assert_eq!(counts.waiting, 1);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn video_jobs_go_to_the_video_queue(pool: PgPool) {
    let app = common::build_test_app(pool);

    let json = create(
        app,
        ALICE,
        json!({
            "content_type": "video",
            "prompt": "Waves at dusk",
            "style": {"fps": 12, "duration": 3},
            "audio_track_id": "track-7",
        }),
    )
    .await;

    assert_eq!(json["data"]["job"]["queue"], "video-generation");
    assert_eq!(json["data"]["output"]["content_type"], "VIDEO");
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn unqueued_generation_leaves_no_rows(pool: PgPool) {
    let app = common::build_test_app(pool.clone());
    sqlx::query("DROP TABLE generation_jobs").execute(&pool).await.unwrap();

    let response = post_json_auth(
        app,
        "/api/v1/generations",
        &token_for(ALICE),
        json!({"content_type": "image", "prompt": "a cat"}),
    )
    .await;
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body_json(response).await["code"], "QUEUE_UNAVAILABLE");

    let (outputs,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM generated_outputs")
        .fetch_one(&pool)
        .await
        .unwrap();
    let (prompts,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM prompts")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!((outputs, prompts), (0, 0));
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn create_rejects_invalid_input(pool: PgPool) {
    let app = common::build_test_app(pool);
    let token = token_for(ALICE);

    let cases = [
        json!({"content_type": "image", "prompt": ""}),
        json!({"content_type": "image", "prompt": "   "}),
        json!({"content_type": "image", "prompt": "x".repeat(1001)}),
        json!({"content_type": "audio", "prompt": "hum"}),
        json!({"content_type": "image", "prompt": "cat", "style": {"width": 4096}}),
    ];

    for body in cases {
        let response =
            post_json_auth(app.clone(), "/api/v1/generations", &token, body.clone()).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "body: {body}");
        let json = body_json(response).await;
        assert_eq!(json["code"], "VALIDATION_ERROR");
    }
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn requests_without_a_valid_token_are_rejected(pool: PgPool) {
    let app = common::build_test_app(pool);

    let response = get(app.clone(), "/api/v1/generations").await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = get_auth(app, "/api/v1/generations", "not-a-jwt").await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_json(response).await["code"], "UNAUTHORIZED");
}

// ---------------------------------------------------------------------------
// Read
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn list_only_returns_callers_outputs(pool: PgPool) {
    let app = common::build_test_app(pool);
    create(app.clone(), ALICE, json!({"content_type": "image", "prompt": "one"})).await;
    create(app.clone(), ALICE, json!({"content_type": "video", "prompt": "two"})).await;
    create(app.clone(), BOB, json!({"content_type": "image", "prompt": "three"})).await;

    let response = get_auth(app.clone(), "/api/v1/generations", &token_for(ALICE)).await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    let outputs = json["data"].as_array().unwrap();
    assert_eq!(outputs.len(), 2);
    assert!(outputs.iter().all(|o| o["user_id"] == ALICE));

    let response = get_auth(
        app,
        "/api/v1/generations?status=COMPLETED",
        &token_for(ALICE),
    )
    .await;
    assert!(body_json(response).await["data"].as_array().unwrap().is_empty());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn outputs_are_private_to_their_owner(pool: PgPool) {
    let app = common::build_test_app(pool);
    let json = create(app.clone(), ALICE, json!({"content_type": "image", "prompt": "mine"})).await;
    let id = json["data"]["output"]["id"].as_i64().unwrap();
    let uri = format!("/api/v1/generations/{id}");

    let response = get_auth(app.clone(), &uri, &token_for(ALICE)).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["data"]["id"], id);

    let response = get_auth(app.clone(), &uri, &token_for(BOB)).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = get_auth(app.clone(), &format!("{uri}/usage"), &token_for(BOB)).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = get_auth(app, "/api/v1/generations/999999", &token_for(ALICE)).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

// ---------------------------------------------------------------------------
// Queues
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn queue_stats_list_both_queues(pool: PgPool) {
    let app = common::build_test_app(pool);
    create(app.clone(), ALICE, json!({"content_type": "video", "prompt": "clip"})).await;

    let response = get_auth(app, "/api/v1/queues/stats", &token_for(ALICE)).await;
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    let stats = json["data"].as_array().unwrap();
    assert_eq!(stats.len(), 2);
    assert_eq!(stats[0]["queue"], "image-generation");
    assert_eq!(stats[0]["concurrency"], 2);
    assert_eq!(stats[0]["waiting"], 0);
    assert_eq!(stats[1]["queue"], "video-generation");
    assert_eq!(stats[1]["concurrency"], 1);
    assert_eq!(stats[1]["waiting"], 1);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn usage_is_zero_before_any_completion(pool: PgPool) {
    let app = common::build_test_app(pool);

    let response = get_auth(app, "/api/v1/usage", &token_for(ALICE)).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["data"]["total_processing_seconds"], 0.0);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn websocket_upgrade_requires_a_token(pool: PgPool) {
    let app = common::build_test_app(pool);

    let response = get(app.clone(), "/api/v1/ws").await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = get(app, "/api/v1/ws?token=garbage").await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}
