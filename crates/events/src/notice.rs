//! Typed generation notices and their socket wire shape.
//!
//! Serialized as `{"event": "generation-complete", "data": {...}}` so the
//! event name and payload travel together.

use serde::{Deserialize, Serialize};
use animagen_core::generation::{ContentType, OutputStatus};
use animagen_core::job_events::{EVENT_GENERATION_COMPLETE, EVENT_GENERATION_FAILED};
use animagen_core::types::DbId;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data")]
pub enum GenerationNotice {
    #[serde(rename = "generation-complete")]
    Complete {
        #[serde(rename = "outputId")]
        output_id: DbId,
        #[serde(rename = "type")]
        content_type: ContentType,
        status: OutputStatus,
    },
    #[serde(rename = "generation-failed")]
    Failed {
        #[serde(rename = "outputId")]
        output_id: DbId,
        #[serde(rename = "type")]
        content_type: ContentType,
        error: String,
    },
}

impl GenerationNotice {
    pub fn completed(output_id: DbId, content_type: ContentType) -> Self {
        GenerationNotice::Complete {
            output_id,
            content_type,
            status: OutputStatus::Completed,
        }
    }

    pub fn failed(output_id: DbId, content_type: ContentType, error: impl Into<String>) -> Self {
        GenerationNotice::Failed {
            output_id,
            content_type,
            error: error.into(),
        }
    }

    /// Socket event name.
    pub fn event_name(&self) -> &'static str {
        match self {
            GenerationNotice::Complete { .. } => EVENT_GENERATION_COMPLETE,
            GenerationNotice::Failed { .. } => EVENT_GENERATION_FAILED,
        }
    }

    pub fn output_id(&self) -> DbId {
        match self {
            GenerationNotice::Complete { output_id, .. }
            | GenerationNotice::Failed { output_id, .. } => *output_id,
        }
    }
}
