//! Content types and the generated-output status machine.
//!
//! A generated output moves strictly forward:
//!
//! ```text
//! Pending -> Processing -> Completed
//!                      \-> Failed
//! ```
//!
//! Re-entering `Processing` from `Processing` is allowed because a retried
//! job marks its output again on every attempt. Nothing leaves a terminal
//! state.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Status ID type matching SMALLINT in the database.
pub type StatusId = i16;

// ---------------------------------------------------------------------------
// ContentType
// ---------------------------------------------------------------------------

/// Kind of media a generation request produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ContentType {
    Image,
    Video,
}

impl ContentType {
    /// All content types, in dispatch priority order.
    pub const ALL: [ContentType; 2] = [ContentType::Image, ContentType::Video];

    /// Database / wire representation (`IMAGE`, `VIDEO`).
    pub fn as_str(self) -> &'static str {
        match self {
            ContentType::Image => "IMAGE",
            ContentType::Video => "VIDEO",
        }
    }

    /// Name of the queue that carries jobs of this type.
    pub fn queue_name(self) -> &'static str {
        match self {
            ContentType::Image => "image-generation",
            ContentType::Video => "video-generation",
        }
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ContentType {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "IMAGE" => Ok(ContentType::Image),
            "VIDEO" => Ok(ContentType::Video),
            other => Err(CoreError::Validation(format!(
                "Unknown content type: \"{other}\""
            ))),
        }
    }
}

// ---------------------------------------------------------------------------
// OutputStatus
// ---------------------------------------------------------------------------

/// Lifecycle status of a generated output.
///
/// Discriminants match the seed order of the `output_statuses` table.
#[repr(i16)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OutputStatus {
    Pending = 1,
    Processing = 2,
    Completed = 3,
    Failed = 4,
}

impl OutputStatus {
    /// Return the database status ID.
    pub fn id(self) -> StatusId {
        self as StatusId
    }

    /// Map a database status ID back to the enum.
    pub fn from_id(id: StatusId) -> Option<Self> {
        match id {
            1 => Some(OutputStatus::Pending),
            2 => Some(OutputStatus::Processing),
            3 => Some(OutputStatus::Completed),
            4 => Some(OutputStatus::Failed),
            _ => None,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, OutputStatus::Completed | OutputStatus::Failed)
    }

    /// Whether moving from `self` to `next` keeps the lifecycle monotonic.
    pub fn can_transition_to(self, next: OutputStatus) -> bool {
        use OutputStatus::*;
        matches!(
            (self, next),
            (Pending, Processing)
                | (Processing, Processing)
                | (Processing, Completed)
                | (Processing, Failed)
        )
    }

    /// Statuses a row must currently hold for `next` to be written.
    pub fn allowed_predecessors(next: OutputStatus) -> &'static [OutputStatus] {
        match next {
            OutputStatus::Pending => &[],
            OutputStatus::Processing => &[OutputStatus::Pending, OutputStatus::Processing],
            OutputStatus::Completed | OutputStatus::Failed => &[OutputStatus::Processing],
        }
    }
}

impl fmt::Display for OutputStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            OutputStatus::Pending => "PENDING",
            OutputStatus::Processing => "PROCESSING",
            OutputStatus::Completed => "COMPLETED",
            OutputStatus::Failed => "FAILED",
        };
        f.write_str(s)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
