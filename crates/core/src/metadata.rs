//! Typed result metadata returned by the generation service.
//!
//! The service reports a loose JSON object per output. The fields the
//! platform relies on are lifted into [`ImageMetadata`] / [`VideoMetadata`];
//! everything else is preserved in `extra` so the stored row keeps the full
//! response.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::generation::ContentType;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ImageMetadata {
    #[serde(default, alias = "w")]
    pub width: Option<u32>,
    #[serde(default, alias = "h")]
    pub height: Option<u32>,
    #[serde(default)]
    pub format: Option<String>,
    #[serde(default)]
    pub file_size: Option<u64>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VideoMetadata {
    #[serde(default, alias = "w")]
    pub width: Option<u32>,
    #[serde(default, alias = "h")]
    pub height: Option<u32>,
    #[serde(default)]
    pub frames: Option<u32>,
    #[serde(default)]
    pub fps: Option<u32>,
    #[serde(default)]
    pub duration: Option<f64>,
    #[serde(default)]
    pub has_audio: Option<bool>,
    #[serde(default)]
    pub format: Option<String>,
    #[serde(default)]
    pub file_size: Option<u64>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// Metadata tagged by content type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum OutputMetadata {
    Image(ImageMetadata),
    Video(VideoMetadata),
}

impl OutputMetadata {
    /// Interpret a raw metadata object for the given content type.
    ///
    /// `null` yields empty metadata. Anything other than an object, or
    /// recognised keys with the wrong type, is an error.
    pub fn from_json(
        content_type: ContentType,
        value: &serde_json::Value,
    ) -> Result<Self, CoreError> {
        let value = if value.is_null() {
            serde_json::Value::Object(Default::default())
        } else {
            value.clone()
        };
        if !value.is_object() {
            return Err(CoreError::Validation(
                "Generation metadata must be a JSON object".to_string(),
            ));
        }

        let parsed = match content_type {
            ContentType::Image => {
                serde_json::from_value::<ImageMetadata>(value).map(OutputMetadata::Image)
            }
            ContentType::Video => {
                serde_json::from_value::<VideoMetadata>(value).map(OutputMetadata::Video)
            }
        };
        parsed.map_err(|e| CoreError::Validation(format!("Invalid generation metadata: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_dimension_keys_are_accepted() {
        let meta =
            OutputMetadata::from_json(ContentType::Image, &serde_json::json!({"w": 512, "h": 512}))
                .unwrap();
        match meta {
            OutputMetadata::Image(m) => {
                assert_eq!(m.width, Some(512));
                assert_eq!(m.height, Some(512));
            }
            other => panic!("expected image metadata, got {other:?}"),
        }
    }

    #[test]
    fn unknown_keys_are_kept() {
        let meta = OutputMetadata::from_json(
            ContentType::Video,
            &serde_json::json!({"fps": 24, "sampler": "euler"}),
        )
        .unwrap();
        match meta {
            OutputMetadata::Video(m) => {
                assert_eq!(m.fps, Some(24));
                assert_eq!(m.extra["sampler"], "euler");
            }
            other => panic!("expected video metadata, got {other:?}"),
        }
    }

    #[test]
    fn non_object_is_rejected() {
        let err = OutputMetadata::from_json(ContentType::Image, &serde_json::json!([1, 2]))
            .unwrap_err();
        assert!(matches!(err, CoreError::Validation(_)));
    }

    #[test]
    fn null_is_empty() {
        let meta = OutputMetadata::from_json(ContentType::Image, &serde_json::Value::Null).unwrap();
        assert_eq!(meta, OutputMetadata::Image(ImageMetadata::default()));
    }
}
