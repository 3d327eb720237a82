//! Bounded retry executor for remote platform calls.
//!
//! Wraps a single idempotent remote call in an exponential-backoff loop that
//! classifies each failure via [`classify`](crate::error::classify): permanent
//! and conflict outcomes stop the loop at once, an expired credential triggers
//! a token refresh on the client handle and retries, and everything else
//! retries until the attempt bound is exhausted.
//!
//! The executor is a single synchronous call chain: it suspends only at the
//! inter-attempt delay and provides no internal concurrency, locking, or
//! cancellation. Callers that need a deadline wrap the whole [`execute`] call
//! externally.

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use rand::Rng;
use tracing::{debug, warn};

use crate::error::{ErrorClass, RemoteError};

/// Credential-refresh side effect on the client handle.
///
/// [`execute`] triggers this once per occurrence of an auth-refresh
/// condition. Refresh failures are swallowed; the retry loop's own attempt
/// bound governs termination, not the refresh outcome.
#[async_trait]
pub trait TokenRefresh: Send + Sync {
    async fn refresh_token(&self) -> Result<(), RemoteError>;
}

/// Bounded exponential-backoff policy for [`execute`].
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Upper bound on invocations of the operation.
    pub max_attempts: u32,
    /// Delay before the second attempt.
    pub initial_delay: Duration,
    /// Cap applied to every computed delay.
    pub max_delay: Duration,
    /// Per-attempt growth factor.
    pub multiplier: f64,
    /// Proportional jitter added on top of the computed delay, in `0.0..1.0`.
    /// Must stay below `multiplier - 1.0` to keep delays non-decreasing.
    pub jitter: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 8,
            initial_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(30),
            multiplier: 2.0,
            jitter: 0.25,
        }
    }
}

impl RetryPolicy {
    /// Policy without inter-attempt delays, for tests and latency-critical
    /// probes.
    pub fn immediate(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            initial_delay: Duration::ZERO,
            jitter: 0.0,
            ..Self::default()
        }
    }

    fn delay_for(&self, attempt: u32) -> Duration {
        let base = self
            .initial_delay
            .mul_f64(self.multiplier.powi(attempt as i32))
            .min(self.max_delay);
        if self.jitter <= 0.0 || base.is_zero() {
            return base;
        }
        let jitter = rand::thread_rng().gen_range(0.0..self.jitter);
        base.mul_f64(1.0 + jitter).min(self.max_delay)
    }
}

/// Runs a single idempotent remote call under a bounded retry policy.
///
/// A success returns immediately without consuming a retry or a delay. On
/// failure the error's classification decides:
///
/// - permanent or conflict: stop, surface the classified error as-is;
/// - requires-auth-refresh: refresh the token on `client`, then retry;
/// - retryable: sleep the backoff delay, then retry.
///
/// The operation is invoked at most `policy.max_attempts` times; exhaustion
/// surfaces the last classified error unchanged. The operation must be safe
/// to call more than once - the remote API is either naturally idempotent per
/// call or duplicate creations are absorbed later by reconciliation.
pub async fn execute<C, T, F, Fut>(
    client: &C,
    policy: &RetryPolicy,
    mut operation: F,
) -> Result<T, RemoteError>
where
    C: TokenRefresh + ?Sized,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, RemoteError>>,
{
    let mut attempt: u32 = 0;
    loop {
        let err = match operation().await {
            Ok(value) => return Ok(value),
            Err(err) => err,
        };
        attempt += 1;

        match err.class() {
            ErrorClass::Permanent | ErrorClass::Conflict => return Err(err),
            ErrorClass::RequiresAuthRefresh => {
                if let Err(refresh_err) = client.refresh_token().await {
                    warn!(error = %refresh_err, "token refresh failed, retry bound governs");
                }
            }
            ErrorClass::Retryable => {}
        }

        if attempt >= policy.max_attempts {
            return Err(err);
        }

        let delay = policy.delay_for(attempt - 1);
        debug!(
            attempt,
            delay_ms = delay.as_millis() as u64,
            error = %err,
            "retrying remote call"
        );
        tokio::time::sleep(delay).await;
    }
}
