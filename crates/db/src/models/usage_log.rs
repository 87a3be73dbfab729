use serde::Serialize;
use sqlx::FromRow;
use animagen_core::types::{DbId, Timestamp};

/// A row from the append-only `usage_logs` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct UsageLog {
    pub id: DbId,
    pub user_id: DbId,
    pub output_id: DbId,
    pub content_type: String,
    pub processing_time_seconds: f64,
    pub metadata: serde_json::Value,
    pub created_at: Timestamp,
}
