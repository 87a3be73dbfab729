//! Fixed queue policies per content type.
//!
//! Retry counts, backoff, priority, worker concurrency and the generation
//! budget are compile-time constants; they are not user-tunable.

use std::time::Duration;

use crate::generation::ContentType;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Total attempts (first try included) for image jobs.
pub const IMAGE_ATTEMPTS: u32 = 3;
/// First backoff delay for image jobs, doubled on each further failure.
pub const IMAGE_BACKOFF_BASE: Duration = Duration::from_secs(2);
/// Hard timeout for a single image generation call.
pub const IMAGE_TIMEOUT: Duration = Duration::from_secs(300);
/// Parallel image workers.
pub const IMAGE_CONCURRENCY: usize = 2;
/// Image jobs are claimed ahead of video jobs.
pub const IMAGE_PRIORITY: i32 = 10;

/// Total attempts (first try included) for video jobs.
pub const VIDEO_ATTEMPTS: u32 = 2;
/// First backoff delay for video jobs.
pub const VIDEO_BACKOFF_BASE: Duration = Duration::from_secs(5);
/// Hard timeout for a single video generation call.
pub const VIDEO_TIMEOUT: Duration = Duration::from_secs(600);
/// Parallel video workers.
pub const VIDEO_CONCURRENCY: usize = 1;
pub const VIDEO_PRIORITY: i32 = 5;

/// Completed jobs kept per queue for inspection before pruning.
pub const KEEP_COMPLETED: i64 = 100;
/// Failed jobs kept per queue for inspection before pruning.
pub const KEEP_FAILED: i64 = 50;

// ---------------------------------------------------------------------------
// QueuePolicy
// ---------------------------------------------------------------------------

/// Retry, ordering and resource limits for one queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueuePolicy {
    pub attempts: u32,
    pub backoff_base: Duration,
    pub priority: i32,
    pub concurrency: usize,
    pub timeout: Duration,
}

impl QueuePolicy {
    /// The default policy for a content type.
    pub const fn for_type(content_type: ContentType) -> Self {
        match content_type {
            ContentType::Image => Self {
                attempts: IMAGE_ATTEMPTS,
                backoff_base: IMAGE_BACKOFF_BASE,
                priority: IMAGE_PRIORITY,
                concurrency: IMAGE_CONCURRENCY,
                timeout: IMAGE_TIMEOUT,
            },
            ContentType::Video => Self {
                attempts: VIDEO_ATTEMPTS,
                backoff_base: VIDEO_BACKOFF_BASE,
                priority: VIDEO_PRIORITY,
                concurrency: VIDEO_CONCURRENCY,
                timeout: VIDEO_TIMEOUT,
            },
        }
    }
}

/// Delay before the next attempt after `attempts_made` failed tries.
///
/// Exponential: `base * 2^(attempts_made - 1)`, saturating. Zero attempts
/// yields no delay.
pub fn backoff_delay(base: Duration, attempts_made: u32) -> Duration {
    if attempts_made == 0 {
        return Duration::ZERO;
    }
    let exp = (attempts_made - 1).min(16);
    base.saturating_mul(1u32 << exp)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
