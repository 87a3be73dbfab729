//! Typed style parameters per content type.
//!
//! Defaults and bounds mirror what the AI generation service accepts, so a
//! request rejected here would also have been rejected downstream.

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::error::CoreError;
use crate::generation::ContentType;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Maximum prompt length in characters.
pub const MAX_PROMPT_LENGTH: u64 = 1000;

pub const DEFAULT_WIDTH: u32 = 512;
pub const DEFAULT_HEIGHT: u32 = 512;
pub const MIN_DIMENSION: u32 = 64;
pub const MAX_WIDTH: u32 = 1024;
pub const MAX_HEIGHT: u32 = 1024;

pub const DEFAULT_STEPS: u32 = 20;
pub const MAX_STEPS: u32 = 50;

pub const DEFAULT_GUIDANCE: f32 = 7.5;

pub const DEFAULT_FPS: u32 = 24;
pub const DEFAULT_FRAMES: u32 = 24;
pub const MAX_FRAMES: u32 = 120;

/// Largest seed the diffusion pipeline accepts (`2^32 - 1`).
pub const MAX_SEED: u64 = u32::MAX as u64;

fn default_width() -> u32 {
    DEFAULT_WIDTH
}
fn default_height() -> u32 {
    DEFAULT_HEIGHT
}
fn default_steps() -> u32 {
    DEFAULT_STEPS
}
fn default_guidance() -> f32 {
    DEFAULT_GUIDANCE
}
fn default_fps() -> u32 {
    DEFAULT_FPS
}
fn default_frames() -> u32 {
    DEFAULT_FRAMES
}

// ---------------------------------------------------------------------------
// Presets
// ---------------------------------------------------------------------------

/// Named look-and-feel selections offered by the generation service.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StylePreset {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub art_style: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color_palette: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mood: Option<String>,
    /// Any other preset keys, passed to the service as given.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

// ---------------------------------------------------------------------------
// Image / video parameters
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct ImageStyle {
    #[serde(default)]
    #[validate(length(max = MAX_PROMPT_LENGTH))]
    pub negative_prompt: String,
    #[serde(default = "default_width")]
    #[validate(range(min = MIN_DIMENSION, max = MAX_WIDTH))]
    pub width: u32,
    #[serde(default = "default_height")]
    #[validate(range(min = MIN_DIMENSION, max = MAX_HEIGHT))]
    pub height: u32,
    #[serde(default = "default_steps")]
    #[validate(range(min = 1, max = MAX_STEPS))]
    pub num_inference_steps: u32,
    #[serde(default = "default_guidance")]
    #[validate(range(min = 1.0, max = 20.0))]
    pub guidance_scale: f32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(range(max = MAX_SEED))]
    pub seed: Option<u64>,
    #[serde(default)]
    pub preset: StylePreset,
}

impl Default for ImageStyle {
    fn default() -> Self {
        Self {
            negative_prompt: String::new(),
            width: DEFAULT_WIDTH,
            height: DEFAULT_HEIGHT,
            num_inference_steps: DEFAULT_STEPS,
            guidance_scale: DEFAULT_GUIDANCE,
            seed: None,
            preset: StylePreset::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct VideoStyle {
    #[serde(default)]
    #[validate(length(max = MAX_PROMPT_LENGTH))]
    pub negative_prompt: String,
    #[serde(default = "default_width")]
    #[validate(range(min = MIN_DIMENSION, max = MAX_WIDTH))]
    pub width: u32,
    #[serde(default = "default_height")]
    #[validate(range(min = MIN_DIMENSION, max = MAX_HEIGHT))]
    pub height: u32,
    #[serde(default = "default_frames")]
    #[validate(range(min = 1, max = MAX_FRAMES))]
    pub num_frames: u32,
    #[serde(default = "default_fps")]
    #[validate(range(min = 1, max = 60))]
    pub fps: u32,
    /// Clip length in seconds; when set it overrides `num_frames`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(range(min = 0.1, max = 10.0))]
    pub duration: Option<f32>,
    #[serde(default = "default_steps")]
    #[validate(range(min = 1, max = MAX_STEPS))]
    pub num_inference_steps: u32,
    #[serde(default = "default_guidance")]
    #[validate(range(min = 1.0, max = 20.0))]
    pub guidance_scale: f32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(range(max = MAX_SEED))]
    pub seed: Option<u64>,
    #[serde(default)]
    pub preset: StylePreset,
}

impl Default for VideoStyle {
    fn default() -> Self {
        Self {
            negative_prompt: String::new(),
            width: DEFAULT_WIDTH,
            height: DEFAULT_HEIGHT,
            num_frames: DEFAULT_FRAMES,
            fps: DEFAULT_FPS,
            duration: None,
            num_inference_steps: DEFAULT_STEPS,
            guidance_scale: DEFAULT_GUIDANCE,
            seed: None,
            preset: StylePreset::default(),
        }
    }
}

// ---------------------------------------------------------------------------
// StyleParameters
// ---------------------------------------------------------------------------

/// Style parameters tagged by the content type they belong to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum StyleParameters {
    Image(ImageStyle),
    Video(VideoStyle),
}

impl StyleParameters {
    /// Default parameters for a content type.
    pub fn default_for(content_type: ContentType) -> Self {
        match content_type {
            ContentType::Image => StyleParameters::Image(ImageStyle::default()),
            ContentType::Video => StyleParameters::Video(VideoStyle::default()),
        }
    }

    /// Parse an untyped style object submitted by a client for `content_type`.
    ///
    /// `null` or a missing object yields the defaults. Unknown keys are
    /// ignored; out-of-range values are rejected.
    pub fn from_json(
        content_type: ContentType,
        value: Option<serde_json::Value>,
    ) -> Result<Self, CoreError> {
        let value = match value {
            None | Some(serde_json::Value::Null) => return Ok(Self::default_for(content_type)),
            Some(v) => v,
        };

        let parsed = match content_type {
            ContentType::Image => serde_json::from_value::<ImageStyle>(value)
                .map(StyleParameters::Image),
            ContentType::Video => serde_json::from_value::<VideoStyle>(value)
                .map(StyleParameters::Video),
        }
        .map_err(|e| CoreError::Validation(format!("Invalid style parameters: {e}")))?;

        parsed.validate()?;
        Ok(parsed)
    }

    pub fn content_type(&self) -> ContentType {
        match self {
            StyleParameters::Image(_) => ContentType::Image,
            StyleParameters::Video(_) => ContentType::Video,
        }
    }

    /// Run field-level validation for the inner parameters.
    pub fn validate(&self) -> Result<(), CoreError> {
        let result = match self {
            StyleParameters::Image(s) => s.validate(),
            StyleParameters::Video(s) => s.validate(),
        };
        result.map_err(|e| CoreError::Validation(e.to_string()))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
