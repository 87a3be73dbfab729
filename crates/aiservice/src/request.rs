//! Request and response bodies of the generation endpoints.

use serde::{Deserialize, Serialize};
use animagen_core::generation::ContentType;
use animagen_core::style::{ImageStyle, StyleParameters, StylePreset, VideoStyle};
use animagen_core::types::DbId;

/// Body of `POST /generate/image`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImageGenerationRequest {
    pub prompt: String,
    pub negative_prompt: String,
    pub width: u32,
    pub height: u32,
    pub num_inference_steps: u32,
    pub guidance_scale: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
    pub style: StylePreset,
    pub output_id: String,
}

/// Body of `POST /generate/video`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VideoGenerationRequest {
    pub prompt: String,
    pub negative_prompt: String,
    pub width: u32,
    pub height: u32,
    pub num_frames: u32,
    pub fps: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration: Option<f32>,
    pub num_inference_steps: u32,
    pub guidance_scale: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
    pub style: StylePreset,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audio_track_id: Option<String>,
    pub output_id: String,
}

/// A generation call, one variant per endpoint.
#[derive(Debug, Clone, PartialEq)]
pub enum GenerationRequest {
    Image(ImageGenerationRequest),
    Video(VideoGenerationRequest),
}

impl GenerationRequest {
    /// Build the request for one output.
    ///
    /// The audio track only applies to videos and is dropped for images.
    pub fn new(
        output_id: DbId,
        prompt: &str,
        style: &StyleParameters,
        audio_track_id: Option<&str>,
    ) -> Self {
        match style {
            StyleParameters::Image(s) => GenerationRequest::Image(image_request(output_id, prompt, s)),
            StyleParameters::Video(s) => {
                GenerationRequest::Video(video_request(output_id, prompt, s, audio_track_id))
            }
        }
    }

    pub fn content_type(&self) -> ContentType {
        match self {
            GenerationRequest::Image(_) => ContentType::Image,
            GenerationRequest::Video(_) => ContentType::Video,
        }
    }

    /// Path of the endpoint this request is sent to.
    pub fn path(&self) -> &'static str {
        match self {
            GenerationRequest::Image(_) => "/generate/image",
            GenerationRequest::Video(_) => "/generate/video",
        }
    }

    pub fn output_id(&self) -> &str {
        match self {
            GenerationRequest::Image(r) => &r.output_id,
            GenerationRequest::Video(r) => &r.output_id,
        }
    }
}

fn image_request(output_id: DbId, prompt: &str, s: &ImageStyle) -> ImageGenerationRequest {
    ImageGenerationRequest {
        prompt: prompt.to_string(),
        negative_prompt: s.negative_prompt.clone(),
        width: s.width,
        height: s.height,
        num_inference_steps: s.num_inference_steps,
        guidance_scale: s.guidance_scale,
        seed: s.seed,
        style: s.preset.clone(),
        output_id: output_id.to_string(),
    }
}

fn video_request(
    output_id: DbId,
    prompt: &str,
    s: &VideoStyle,
    audio_track_id: Option<&str>,
) -> VideoGenerationRequest {
    VideoGenerationRequest {
        prompt: prompt.to_string(),
        negative_prompt: s.negative_prompt.clone(),
        width: s.width,
        height: s.height,
        num_frames: s.num_frames,
        fps: s.fps,
        duration: s.duration,
        num_inference_steps: s.num_inference_steps,
        guidance_scale: s.guidance_scale,
        seed: s.seed,
        style: s.preset.clone(),
        audio_track_id: audio_track_id.map(str::to_string),
        output_id: output_id.to_string(),
    }
}

/// Response of both generation endpoints.
///
/// The service answers in snake_case; camelCase keys are accepted too.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct GenerationResponse {
    #[serde(default, alias = "outputId")]
    pub output_id: Option<String>,
    #[serde(alias = "filePath")]
    pub file_path: String,
    #[serde(default, alias = "thumbnailPath")]
    pub thumbnail_path: Option<String>,
    #[serde(default)]
    pub metadata: serde_json::Value,
    /// Seconds the service spent, as measured by the service.
    #[serde(default, alias = "processingTime")]
    pub processing_time: Option<f64>,
}
