//! The single retry policy used by every network call site.
//!
//! Retries are driven purely by reason codes: only transient reasons
//! ([`Reason::is_transient`]) are retried, everything else fails fast.
//! Delays grow exponentially from a configured base, with rate-limit
//! responses waiting twice as long.

use std::future::Future;
use std::time::Duration;

use lexhound_shared::config::AppConfig;
use lexhound_shared::types::Reason;

/// Errors that can drive a retry decision expose their reason code.
/// Returning `None` means the failure is never retried.
pub trait Retryable {
    fn retry_reason(&self) -> Option<Reason>;
}

impl Retryable for Reason {
    fn retry_reason(&self) -> Option<Reason> {
        Some(*self)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_retries: u32, base_delay: Duration) -> Self {
        Self {
            max_retries,
            base_delay,
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            max_retries: config.defaults.max_retries,
            base_delay: Duration::from_millis(config.defaults.retry_base_ms),
        }
    }

    /// Policy that never retries. Used where a caller wants a single shot
    /// through the same code path.
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            base_delay: Duration::ZERO,
        }
    }

    fn delay_for(&self, attempt: u32, reason: Reason) -> Duration {
        let mut delay = self.base_delay * 2u32.saturating_pow(attempt);
        if reason == Reason::RateLimited {
            delay *= 2;
        }
        delay
    }

    /// Runs `op` until it succeeds, fails permanently, or retries run out.
    /// The closure receives the zero-based attempt number.
    pub async fn run<T, E, F, Fut>(&self, mut op: F) -> std::result::Result<T, E>
    where
        E: Retryable,
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = std::result::Result<T, E>>,
    {
        let mut attempt: u32 = 0;
        loop {
            match op(attempt).await {
                Ok(value) => return Ok(value),
                Err(error) => {
                    let transient = error
                        .retry_reason()
                        .filter(|reason| reason.is_transient());
                    match transient {
                        Some(reason) if attempt < self.max_retries => {
                            let delay = self.delay_for(attempt, reason);
                            tracing::debug!(
                                attempt,
                                reason = %reason,
                                delay_ms = delay.as_millis() as u64,
                                "transient failure, backing off"
                            );
                            tokio::time::sleep(delay).await;
                            attempt += 1;
                        }
                        _ => return Err(error),
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test]
    async fn transient_failures_are_retried_until_success() {
        let policy = RetryPolicy::new(3, Duration::from_millis(1));
        let calls = AtomicU32::new(0);

        let result: Result<u32, Reason> = policy
            .run(|_| {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                async move {
                    if n < 2 {
                        Err(Reason::Timeout)
                    } else {
                        Ok(n)
                    }
                }
            })
            .await;

        assert_eq!(result, Ok(2));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn permanent_failures_are_not_retried() {
        let policy = RetryPolicy::new(3, Duration::from_millis(1));
        let calls = AtomicU32::new(0);

        let result: Result<u32, Reason> = policy
            .run(|_| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(Reason::DeniedHost) }
            })
            .await;

        assert_eq!(result, Err(Reason::DeniedHost));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn retries_stop_at_the_configured_budget() {
        let policy = RetryPolicy::new(2, Duration::from_millis(1));
        let calls = AtomicU32::new(0);

        let result: Result<u32, Reason> = policy
            .run(|_| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(Reason::RateLimited) }
            })
            .await;

        assert_eq!(result, Err(Reason::RateLimited));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn rate_limits_wait_twice_as_long() {
        let policy = RetryPolicy::new(2, Duration::from_millis(100));
        assert_eq!(
            policy.delay_for(0, Reason::Timeout),
            Duration::from_millis(100)
        );
        assert_eq!(
            policy.delay_for(1, Reason::Timeout),
            Duration::from_millis(200)
        );
        assert_eq!(
            policy.delay_for(0, Reason::RateLimited),
            Duration::from_millis(200)
        );
    }
}
