//! Per-call timeout and bounded retry around a Generation Port.
//!
//! Only single calls are retried. Nothing reaches a transcript until a call
//! returns, so a retry replaces the failed attempt instead of adding to it.

use crate::error::OrchestrationError;
use crate::generation::GenerationPort;
use crate::Result;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Extra attempts after the first call
    pub max_retries: u32,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
    /// Upper bound on one call; exceeding it counts as a failed attempt
    pub call_timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 2,
            initial_backoff: Duration::from_millis(500),
            max_backoff: Duration::from_secs(8),
            call_timeout: Duration::from_secs(60),
        }
    }
}

impl RetryPolicy {
    /// Exponential backoff before retry number `attempt + 1`
    pub fn backoff_for(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt);
        self.initial_backoff
            .saturating_mul(factor)
            .min(self.max_backoff)
    }
}

pub struct ResilientGenerator {
    inner: Arc<dyn GenerationPort>,
    policy: RetryPolicy,
}

impl ResilientGenerator {
    pub fn new(inner: Arc<dyn GenerationPort>, policy: RetryPolicy) -> Self {
        Self { inner, policy }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    async fn attempt(&self, prompt: &str) -> Result<String> {
        match tokio::time::timeout(self.policy.call_timeout, self.inner.generate(prompt)).await {
            Ok(Ok(text)) if text.trim().is_empty() => {
                Err(OrchestrationError::LlmError("empty response".to_string()))
            }
            Ok(result) => result,
            Err(_) => Err(OrchestrationError::LlmError(format!(
                "generation timed out after {:?}",
                self.policy.call_timeout
            ))),
        }
    }
}

#[async_trait]
impl GenerationPort for ResilientGenerator {
    async fn generate(&self, prompt: &str) -> Result<String> {
        let mut attempt = 0;

        loop {
            match self.attempt(prompt).await {
                Ok(text) => return Ok(text),
                Err(e) if e.is_retryable() && attempt < self.policy.max_retries => {
                    let delay = self.policy.backoff_for(attempt);
                    warn!(
                        attempt = attempt + 1,
                        max_retries = self.policy.max_retries,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "Generation attempt failed - retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio_test::{assert_err, assert_ok};

    /// Fails the first `failures` calls, then answers
    struct FlakyGenerator {
        failures: usize,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl GenerationPort for FlakyGenerator {
        async fn generate(&self, _prompt: &str) -> Result<String> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            if n < self.failures {
                Err(OrchestrationError::LlmError("503".into()))
            } else {
                Ok("recovered".into())
            }
        }
    }

    struct SlowGenerator;

    #[async_trait]
    impl GenerationPort for SlowGenerator {
        async fn generate(&self, _prompt: &str) -> Result<String> {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok("too late".into())
        }
    }

    fn fast_policy(max_retries: u32) -> RetryPolicy {
        RetryPolicy {
            max_retries,
            initial_backoff: Duration::from_millis(1),
            max_backoff: Duration::from_millis(4),
            call_timeout: Duration::from_millis(50),
        }
    }

    #[test]
    fn test_backoff_doubles_and_caps() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.backoff_for(0), Duration::from_millis(500));
        assert_eq!(policy.backoff_for(1), Duration::from_millis(1000));
        assert_eq!(policy.backoff_for(10), Duration::from_secs(8));
    }

    #[tokio::test]
    async fn test_retries_until_success() {
        let flaky = Arc::new(FlakyGenerator {
            failures: 2,
            calls: AtomicUsize::new(0),
        });
        let generator = ResilientGenerator::new(flaky.clone(), fast_policy(2));

        let text = assert_ok!(generator.generate("p").await);
        assert_eq!(text, "recovered");
        assert_eq!(flaky.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_retry_budget_is_bounded() {
        let flaky = Arc::new(FlakyGenerator {
            failures: 10,
            calls: AtomicUsize::new(0),
        });
        let generator = ResilientGenerator::new(flaky.clone(), fast_policy(1));

        assert_err!(generator.generate("p").await);
        assert_eq!(flaky.calls.load(Ordering::SeqCst), 2);
    }

    /// Rejects every call as a bad request
    struct RejectingGenerator {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl GenerationPort for RejectingGenerator {
        async fn generate(&self, _prompt: &str) -> Result<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Err(OrchestrationError::ConfigError("Gemini API returned 403".into()))
        }
    }

    #[tokio::test]
    async fn test_non_retryable_error_fails_immediately() {
        let rejecting = Arc::new(RejectingGenerator {
            calls: AtomicUsize::new(0),
        });
        let generator = ResilientGenerator::new(rejecting.clone(), fast_policy(3));
        assert_eq!(generator.policy().max_retries, 3);

        assert_err!(generator.generate("p").await);
        assert_eq!(rejecting.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_call_timeout_fails_instead_of_hanging() {
        let generator = ResilientGenerator::new(Arc::new(SlowGenerator), fast_policy(0));
        let err = generator.generate("p").await.unwrap_err();
        assert!(err.to_string().contains("timed out"));
    }
}
