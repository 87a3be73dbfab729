//! Socket event names and channel addressing for generation jobs.
//!
//! The processor publishes exactly one of these per job, to the channel of
//! the user that owns the output.

use crate::types::DbId;

/// Generation finished and the output row is `COMPLETED`.
pub const EVENT_GENERATION_COMPLETE: &str = "generation-complete";

/// Generation failed after every attempt and the output row is `FAILED`.
pub const EVENT_GENERATION_FAILED: &str = "generation-failed";

/// Prefix of per-user channel names.
pub const USER_CHANNEL_PREFIX: &str = "user-";

/// Channel name for a user, e.g. `user-42`.
pub fn user_channel(user_id: DbId) -> String {
    format!("{USER_CHANNEL_PREFIX}{user_id}")
}

/// Extract the user id from a channel name produced by [`user_channel`].
pub fn parse_user_channel(channel: &str) -> Option<DbId> {
    channel.strip_prefix(USER_CHANNEL_PREFIX)?.parse().ok()
}
