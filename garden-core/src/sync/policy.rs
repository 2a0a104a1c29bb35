//! Deadline and retry policy for remote calls.
//!
//! Every remote call made by a repository goes through
//! [`RemoteCallPolicy::call`]. Each attempt races the call against a deadline.
//! Failed attempts are retried after a constant delay until `max_retries`
//! additional attempts have been made.

use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;
use tokio::time::{sleep, timeout};

use super::error::SyncError;

/// Default per-attempt deadline.
pub const DEFAULT_TIMEOUT_MS: u64 = 10_000;
/// Default number of retries after the first attempt.
pub const DEFAULT_MAX_RETRIES: u32 = 2;
/// Default constant spacing between attempts.
pub const DEFAULT_RETRY_DELAY_MS: u64 = 250;

/// Governs a single wrapped remote call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RemoteCallPolicy {
    /// Deadline for each attempt, in milliseconds.
    pub timeout_ms: u64,
    /// Retries after the first attempt; `2` allows up to 3 attempts.
    pub max_retries: u32,
    /// Pause between attempts, in milliseconds.
    pub retry_delay_ms: u64,
    /// Raise the last error when every attempt failed. When false the call
    /// settles with [`CallOutcome::SoftFailed`] instead.
    pub throw_on_timeout: bool,
}

impl Default for RemoteCallPolicy {
    fn default() -> Self {
        Self {
            timeout_ms: DEFAULT_TIMEOUT_MS,
            max_retries: DEFAULT_MAX_RETRIES,
            retry_delay_ms: DEFAULT_RETRY_DELAY_MS,
            throw_on_timeout: true,
        }
    }
}

/// Result of a wrapped remote call that did not raise.
#[must_use = "a soft failure has to be handled or discarded explicitly"]
#[derive(Debug)]
pub enum CallOutcome<T> {
    /// The call settled successfully.
    Completed(T),
    /// Every attempt failed, and the policy asked not to raise.
    SoftFailed(SyncError),
}

impl<T> CallOutcome<T> {
    pub fn is_completed(&self) -> bool {
        matches!(self, CallOutcome::Completed(_))
    }

    /// Returns the value, dropping a soft failure.
    pub fn completed(self) -> Option<T> {
        match self {
            CallOutcome::Completed(value) => Some(value),
            CallOutcome::SoftFailed(_) => None,
        }
    }

    /// Turns a soft failure back into an error.
    pub fn into_result(self) -> Result<T, SyncError> {
        match self {
            CallOutcome::Completed(value) => Ok(value),
            CallOutcome::SoftFailed(err) => Err(err),
        }
    }

    /// Acknowledges a best-effort call whose outcome does not matter.
    pub fn discard(self) {}
}

impl RemoteCallPolicy {
    /// A policy for writes that may fail silently (non-critical metadata).
    pub fn best_effort() -> Self {
        Self {
            throw_on_timeout: false,
            ..Self::default()
        }
    }

    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn with_retry_delay_ms(mut self, retry_delay_ms: u64) -> Self {
        self.retry_delay_ms = retry_delay_ms;
        self
    }

    pub fn with_throw_on_timeout(mut self, throw_on_timeout: bool) -> Self {
        self.throw_on_timeout = throw_on_timeout;
        self
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }

    /// Total attempts this policy allows.
    pub fn max_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }

    /// Runs `thunk` under this policy.
    ///
    /// A timed-out attempt is abandoned, not cancelled remotely: the future is
    /// dropped and the next attempt starts. Non-retryable errors stop early.
    pub async fn call<T, E, F, Fut>(&self, mut thunk: F) -> Result<CallOutcome<T>, SyncError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Into<SyncError>,
    {
        let mut attempt: u32 = 0;

        loop {
            let err = match timeout(self.timeout(), thunk()).await {
                Ok(Ok(value)) => return Ok(CallOutcome::Completed(value)),
                Ok(Err(e)) => e.into(),
                Err(_) => SyncError::NetworkTimeout {
                    attempts: attempt + 1,
                },
            };

            attempt += 1;
            let exhausted = attempt >= self.max_attempts() || !err.is_retryable();

            if exhausted {
                tracing::debug!(attempts = attempt, error = %err, "Remote call failed");
                return if self.throw_on_timeout {
                    Err(err)
                } else {
                    Ok(CallOutcome::SoftFailed(err))
                };
            }

            tracing::debug!(
                attempt,
                max_attempts = self.max_attempts(),
                error = %err,
                "Remote call failed, retrying"
            );

            if self.retry_delay_ms > 0 {
                sleep(self.retry_delay()).await;
            }
        }
    }
}

/// Policies used by a repository for each kind of remote call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RepositoryPolicies {
    /// Fetches, including the re-fetch after an update.
    pub read: RemoteCallPolicy,
    /// Inserts, updates and deletes.
    pub write: RemoteCallPolicy,
    /// Best-effort metadata writes.
    pub metadata: RemoteCallPolicy,
}

impl Default for RepositoryPolicies {
    fn default() -> Self {
        Self {
            read: RemoteCallPolicy::default(),
            write: RemoteCallPolicy::default(),
            metadata: RemoteCallPolicy::best_effort(),
        }
    }
}
