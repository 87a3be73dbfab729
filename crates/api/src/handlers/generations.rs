//! Handlers for the `/generations` resource.
//!
//! All endpoints require authentication via [`AuthUser`]. Users only ever
//! see their own outputs.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::{Deserialize, Serialize};
use validator::Validate;
use animagen_core::error::CoreError;
use animagen_core::generation::{ContentType, OutputStatus};
use animagen_core::style::{StyleParameters, MAX_PROMPT_LENGTH};
use animagen_core::types::DbId;
use animagen_db::models::generated_output::{GeneratedOutput, OutputListQuery};
use animagen_db::models::prompt::CreatePrompt;
use animagen_db::repositories::{GeneratedOutputRepo, PromptRepo, UsageLogRepo};
use animagen_worker::{GenerationJob, JobHandle};

use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::response::DataResponse;
use crate::state::AppState;

/// Request body for `POST /api/v1/generations`.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateGenerationRequest {
    /// `"image"` or `"video"`.
    pub content_type: String,
    #[validate(length(min = 1, max = MAX_PROMPT_LENGTH))]
    pub prompt: String,
    /// Style parameters for the content type; defaults when omitted.
    #[serde(default)]
    pub style: Option<serde_json::Value>,
    #[validate(length(min = 1, max = 255))]
    pub audio_track_id: Option<String>,
}

/// An output row with its status decoded to a name.
#[derive(Debug, Serialize)]
pub struct OutputView {
    #[serde(flatten)]
    pub output: GeneratedOutput,
    pub status: Option<OutputStatus>,
}

impl From<GeneratedOutput> for OutputView {
    fn from(output: GeneratedOutput) -> Self {
        let status = output.status();
        Self { output, status }
    }
}

/// Response body for a newly accepted generation.
#[derive(Debug, Serialize)]
pub struct CreatedGeneration {
    pub output: OutputView,
    pub job: JobHandle,
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Fetch an output by ID and verify the caller owns it.
///
/// Returns `NotFound` if the output does not exist and `Forbidden` if it
/// belongs to another user.
async fn find_and_authorize(
    pool: &sqlx::PgPool,
    output_id: DbId,
    auth: &AuthUser,
) -> AppResult<GeneratedOutput> {
    let output = GeneratedOutputRepo::find_by_id(pool, output_id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "GeneratedOutput",
            id: output_id,
        }))?;

    if output.user_id != auth.user_id {
        return Err(AppError::Core(CoreError::Forbidden(
            "Cannot view another user's generation".into(),
        )));
    }

    Ok(output)
}

/// Remove the prompt and `PENDING` output of a generation whose job never
/// reached the queue.
async fn discard_unqueued(
    pool: &sqlx::PgPool,
    output_id: DbId,
    prompt_id: DbId,
) -> Result<(), sqlx::Error> {
    let mut tx = pool.begin().await?;
    GeneratedOutputRepo::discard_pending(&mut *tx, output_id).await?;
    PromptRepo::delete(&mut *tx, prompt_id).await?;
    tx.commit().await
}

// ---------------------------------------------------------------------------
// Create
// ---------------------------------------------------------------------------

/// POST /api/v1/generations
///
/// Validates the request, records the prompt and a `PENDING` output in one
/// transaction, then hands the job to the dispatcher. Returns 201 as soon
/// as the job is queued; completion arrives over the user's socket. If the
/// job cannot be queued, both rows are removed again.
pub async fn create_generation(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(input): Json<CreateGenerationRequest>,
) -> AppResult<impl IntoResponse> {
    input.validate()?;

    let content_type: ContentType = input.content_type.parse()?;
    let prompt_text = input.prompt.trim();
    if prompt_text.is_empty() {
        return Err(AppError::Core(CoreError::Validation(
            "prompt must not be blank".into(),
        )));
    }
    let style = StyleParameters::from_json(content_type, input.style)?;
    let style_json = serde_json::to_value(&style)
        .map_err(|e| AppError::InternalError(format!("Failed to encode style: {e}")))?;

    let mut tx = state.pool.begin().await?;
    let prompt = PromptRepo::create(
        &mut *tx,
        auth.user_id,
        &CreatePrompt {
            content_type: content_type.as_str().to_string(),
            prompt_text: prompt_text.to_string(),
            style: style_json,
            audio_track_id: input.audio_track_id.clone(),
        },
    )
    .await?;
    let output =
        GeneratedOutputRepo::create(&mut *tx, auth.user_id, prompt.id, content_type.as_str())
            .await?;
    tx.commit().await?;

    let queued = state
        .dispatcher
        .enqueue(GenerationJob {
            user_id: auth.user_id,
            prompt_id: prompt.id,
            output_id: output.id,
            content_type,
            prompt_text: prompt.prompt_text,
            style,
            audio_track_id: input.audio_track_id,
        })
        .await;
    let job = match queued {
        Ok(job) => job,
        Err(e) => {
            if let Err(cleanup) = discard_unqueued(&state.pool, output.id, prompt.id).await {
                tracing::error!(
                    output_id = output.id,
                    error = %cleanup,
                    "Failed to discard unqueued generation",
                );
            }
            return Err(e.into());
        }
    };

    tracing::info!(
        output_id = output.id,
        job_id = job.job_id,
        user_id = auth.user_id,
        queue = job.queue,
        "Generation accepted",
    );

    Ok((
        StatusCode::CREATED,
        Json(DataResponse {
            data: CreatedGeneration {
                output: output.into(),
                job,
            },
        }),
    ))
}

// ---------------------------------------------------------------------------
// Read
// ---------------------------------------------------------------------------

/// GET /api/v1/generations
///
/// List the caller's outputs, newest first. Supports optional `status`,
/// `limit`, and `offset` query parameters.
pub async fn list_generations(
    auth: AuthUser,
    State(state): State<AppState>,
    Query(params): Query<OutputListQuery>,
) -> AppResult<impl IntoResponse> {
    let outputs = GeneratedOutputRepo::list_by_user(&state.pool, auth.user_id, &params).await?;
    let data: Vec<OutputView> = outputs.into_iter().map(OutputView::from).collect();
    Ok(Json(DataResponse { data }))
}

/// GET /api/v1/generations/{id}
pub async fn get_generation(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(output_id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let output = find_and_authorize(&state.pool, output_id, &auth).await?;
    Ok(Json(DataResponse {
        data: OutputView::from(output),
    }))
}

/// GET /api/v1/generations/{id}/usage
///
/// Usage rows recorded for one of the caller's outputs. Empty until the
/// output completes.
pub async fn get_generation_usage(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(output_id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let output = find_and_authorize(&state.pool, output_id, &auth).await?;
    let logs = UsageLogRepo::list_for_output(&state.pool, output.id).await?;
    Ok(Json(DataResponse { data: logs }))
}
