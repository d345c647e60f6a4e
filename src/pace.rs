//! Injectable timing and retry policies.
//!
//! Every fixed delay in the bench (poll intervals, settle times, retry
//! pauses) goes through a [`Sleeper`] so tests can run the same loops
//! without wall-clock time. Retry-forever is the deliberate default for
//! acquisition errors; [`RetryPolicy`] makes that contract explicit and
//! lets a caller cap it when a bounded run is wanted.

use async_trait::async_trait;
use std::time::Duration;

/// Abstraction over fixed-duration waits.
#[async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

/// Production sleeper backed by the Tokio timer.
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Test sleeper that yields to the scheduler but never waits.
pub struct NoopSleeper;

#[async_trait]
impl Sleeper for NoopSleeper {
    async fn sleep(&self, _duration: Duration) {
        tokio::task::yield_now().await;
    }
}

/// Cap on transient-error retries. The default retries forever, matching
/// the unattended-rig contract: eventual success is preferred over
/// availability.
#[derive(Debug, Clone, Copy, Default)]
pub struct RetryPolicy {
    pub max_attempts: Option<u32>,
}

impl RetryPolicy {
    /// Retry without limit (the default).
    pub fn unlimited() -> Self {
        Self { max_attempts: None }
    }

    /// Give up after `max_attempts` failed attempts.
    pub fn capped(max_attempts: u32) -> Self {
        Self {
            max_attempts: Some(max_attempts),
        }
    }

    /// Whether `failures` failed attempts have exhausted the policy.
    pub fn exhausted(&self, failures: u32) -> bool {
        self.max_attempts.is_some_and(|max| failures >= max)
    }
}
