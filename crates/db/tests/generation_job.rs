//! Integration tests for the generation queue table.

use animagen_db::models::generation_job::NewGenerationJob;
use animagen_db::models::prompt::CreatePrompt;
use animagen_db::models::status::JobState;
use animagen_db::repositories::{GeneratedOutputRepo, GenerationJobRepo, PromptRepo};
use assert_matches::assert_matches;
use sqlx::PgPool;

async fn seed_output(pool: &PgPool) -> i64 {
    let prompt = PromptRepo::create(
        pool,
        1,
        &CreatePrompt {
            content_type: "VIDEO".to_string(),
            prompt_text: "waves".to_string(),
            style: serde_json::json!({}),
            audio_track_id: None,
        },
    )
    .await
    .unwrap();
    GeneratedOutputRepo::create(pool, 1, prompt.id, "VIDEO")
        .await
        .unwrap()
        .id
}

fn new_job(queue: &str, output_id: i64, priority: i32) -> NewGenerationJob {
    NewGenerationJob {
        queue: queue.to_string(),
        output_id,
        payload: serde_json::json!({"output_id": output_id}),
        priority,
        max_attempts: 2,
        backoff_ms: 5_000,
    }
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn claim_prefers_higher_priority(pool: PgPool) {
    let output = seed_output(&pool).await;
    let low = GenerationJobRepo::insert(&pool, &new_job("q", output, 1)).await.unwrap();
    let high = GenerationJobRepo::insert(&pool, &new_job("q", output, 9)).await.unwrap();

    let first = GenerationJobRepo::claim_next(&pool, "q").await.unwrap().unwrap();
    assert_eq!(first.id, high.id);
    assert_eq!(first.attempts_made, 1);
    assert_matches!(first.state(), Some(JobState::Active));

    let second = GenerationJobRepo::claim_next(&pool, "q").await.unwrap().unwrap();
    assert_eq!(second.id, low.id);

    assert!(GenerationJobRepo::claim_next(&pool, "q").await.unwrap().is_none());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn queue_does_not_need_the_output_row(pool: PgPool) {
    // A dedicated queue database holds no outputs.
    let job = GenerationJobRepo::insert(&pool, &new_job("image-generation", 4_242, 10))
        .await
        .unwrap();
    assert_eq!(job.output_id, 4_242);

    let claimed = GenerationJobRepo::claim_next(&pool, "image-generation")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(claimed.id, job.id);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn claim_is_scoped_to_queue(pool: PgPool) {
    let output = seed_output(&pool).await;
    GenerationJobRepo::insert(&pool, &new_job("video-generation", output, 5))
        .await
        .unwrap();
    assert!(GenerationJobRepo::claim_next(&pool, "image-generation")
        .await
        .unwrap()
        .is_none());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn retry_later_delays_the_job(pool: PgPool) {
    let output = seed_output(&pool).await;
    let job = GenerationJobRepo::insert(&pool, &new_job("q", output, 1)).await.unwrap();
    GenerationJobRepo::claim_next(&pool, "q").await.unwrap().unwrap();

    GenerationJobRepo::retry_later(&pool, job.id, 60_000, "timeout").await.unwrap();

    assert!(GenerationJobRepo::claim_next(&pool, "q").await.unwrap().is_none());
    let counts = GenerationJobRepo::counts(&pool, "q").await.unwrap();
    assert_eq!(counts.delayed, 1);
    assert_eq!(counts.waiting, 0);

    let row = GenerationJobRepo::find_by_id(&pool, job.id).await.unwrap().unwrap();
    assert_eq!(row.last_error.as_deref(), Some("timeout"));
    assert_eq!(row.attempts_made, 1);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn recover_stalled_uncounts_the_attempt(pool: PgPool) {
    let output = seed_output(&pool).await;
    let job = GenerationJobRepo::insert(&pool, &new_job("q", output, 1)).await.unwrap();
    GenerationJobRepo::claim_next(&pool, "q").await.unwrap().unwrap();

    assert_eq!(GenerationJobRepo::recover_stalled(&pool).await.unwrap(), 1);

    let row = GenerationJobRepo::find_by_id(&pool, job.id).await.unwrap().unwrap();
    assert_matches!(row.state(), Some(JobState::Waiting));
    assert_eq!(row.attempts_made, 0);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn prune_keeps_newest_finished_jobs(pool: PgPool) {
    let output = seed_output(&pool).await;
    for _ in 0..3 {
        let job = GenerationJobRepo::insert(&pool, &new_job("q", output, 1)).await.unwrap();
        GenerationJobRepo::claim_next(&pool, "q").await.unwrap().unwrap();
        GenerationJobRepo::complete(&pool, job.id).await.unwrap();
    }

    let removed = GenerationJobRepo::prune_finished(&pool, "q", JobState::Completed, 1)
        .await
        .unwrap();
    assert_eq!(removed, 2);
    assert_eq!(GenerationJobRepo::counts(&pool, "q").await.unwrap().completed, 1);
}
