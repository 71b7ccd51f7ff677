use crate::core::config::AnalysisSettings;
use std::fmt::Display;
use std::future::Future;
use std::time::Duration;
use tracing::debug;

/// How many times a request is attempted and how long to wait in between.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts, including the first.
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(2),
            max_delay: Duration::from_secs(10),
        }
    }
}

impl RetryPolicy {
    pub fn from_settings(settings: &AnalysisSettings) -> Self {
        Self {
            max_attempts: settings.max_retries.max(1),
            ..Self::default()
        }
    }

    /// Exponential delay after the given failed attempt (1-based), capped at `max_delay`.
    ///
    /// The first wait is `base_delay` and each later one doubles it (2s, 4s, 8s, 10s
    /// with the defaults), rather than clamping a 1s-based curve up to the minimum.
    pub fn delay(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
        self.base_delay.saturating_mul(factor).min(self.max_delay)
    }
}

/// Retries an async operation while `should_retry` accepts the error
///
/// # Parameters
/// - `operation`: Closure returning a future
/// - `policy`: Attempt limit and backoff
/// - `should_retry`: Decides whether an error is transient
///
/// # Returns
/// Either the successful result or the last error
pub async fn with_retry<F, Fut, T, E>(
    mut operation: F,
    policy: &RetryPolicy,
    should_retry: impl Fn(&E) -> bool,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Display,
{
    let mut attempt = 1;
    loop {
        match operation().await {
            Ok(val) => return Ok(val),
            Err(err) => {
                if attempt >= policy.max_attempts || !should_retry(&err) {
                    return Err(err);
                }
                let delay = policy.delay(attempt);
                debug!(
                    "Attempt {}/{} failed: {}. Retrying in {:?}...",
                    attempt, policy.max_attempts, err, delay
                );
                attempt += 1;
                tokio::time::sleep(delay).await;
            }
        }
    }
}

/// Transport failures worth another attempt.
pub fn is_transient(err: &reqwest::Error) -> bool {
    err.is_timeout() || err.is_connect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[derive(Debug)]
    enum TestError {
        Transient,
        Fatal,
    }

    impl Display for TestError {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            write!(f, "{self:?}")
        }
    }

    fn is_transient_test(err: &TestError) -> bool {
        matches!(err, TestError::Transient)
    }

    #[test]
    fn test_backoff_is_exponential_and_capped() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.delay(1), Duration::from_secs(2));
        assert_eq!(policy.delay(2), Duration::from_secs(4));
        assert_eq!(policy.delay(3), Duration::from_secs(8));
        assert_eq!(policy.delay(4), Duration::from_secs(10));
        assert_eq!(policy.delay(40), Duration::from_secs(10));
    }

    #[test]
    fn test_policy_from_settings() {
        let settings = AnalysisSettings {
            max_retries: 5,
            ..AnalysisSettings::default()
        };
        assert_eq!(RetryPolicy::from_settings(&settings).max_attempts, 5);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retries_transient_errors_until_success() {
        let calls = AtomicU32::new(0);
        let result = with_retry(
            || async {
                let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
                if n < 3 { Err(TestError::Transient) } else { Ok(n) }
            },
            &RetryPolicy::default(),
            is_transient_test,
        )
        .await;
        assert_eq!(result.unwrap(), 3);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_gives_up_after_max_attempts() {
        let calls = AtomicU32::new(0);
        let result: Result<(), _> = with_retry(
            || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(TestError::Transient)
            },
            &RetryPolicy::default(),
            is_transient_test,
        )
        .await;
        assert!(matches!(result, Err(TestError::Transient)));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_fatal_errors_are_not_retried() {
        let calls = AtomicU32::new(0);
        let result: Result<(), _> = with_retry(
            || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(TestError::Fatal)
            },
            &RetryPolicy::default(),
            is_transient_test,
        )
        .await;
        assert!(matches!(result, Err(TestError::Fatal)));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
