use std::future::Future;
use std::time::Duration;
use rand::Rng;
use tracing::{debug, warn};
use super::classification::ErrorClassification;
use super::types::FlowscopeError;

const TIMEOUT_BACKOFF: Duration = Duration::from_secs(5);

/// Backoff for control-plane requests.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    pub max_retries: u32,
    /// Cap on a single backoff delay.
    pub max_delay: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 2,
            max_delay: Duration::from_secs(30),
        }
    }
}

impl RetryConfig {
    pub fn none() -> Self {
        Self { max_retries: 0, ..Default::default() }
    }

    /// Delay before retry number `attempt` (0-indexed).
    ///
    /// Timeouts wait a flat 5s. Everything else doubles from 1s and adds up
    /// to a second of jitter. Both are capped at `max_delay`.
    pub fn backoff(&self, class: &ErrorClassification, attempt: u32) -> Duration {
        let delay = if class.error_type == "TimeoutError" {
            TIMEOUT_BACKOFF
        } else {
            let doubled = Duration::from_secs(1u64 << attempt.min(16));
            doubled + Duration::from_millis(rand::thread_rng().gen_range(0..1000))
        };
        delay.min(self.max_delay)
    }
}

/// Run `factory` until it succeeds, fails with a non-retryable error, or
/// `max_retries` retries are used up. The last error is returned.
pub async fn with_retry<F, Fut, T>(
    operation_name: &str,
    config: &RetryConfig,
    mut factory: F,
) -> Result<T, FlowscopeError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, FlowscopeError>>,
{
    let mut attempt = 0;
    loop {
        let err = match factory().await {
            Ok(value) => return Ok(value),
            Err(e) => e,
        };
        let class = err.classify();
        if !class.retryable {
            debug!(operation = operation_name, error_type = class.error_type, "Not retrying");
            return Err(err);
        }
        if attempt >= config.max_retries {
            warn!(operation = operation_name, attempts = attempt + 1, error = %err, "Giving up after retries");
            return Err(err);
        }

        let delay = config.backoff(&class, attempt);
        warn!(
            operation = operation_name,
            attempt = attempt + 1,
            error_type = class.error_type,
            delay_ms = delay.as_millis() as u64,
            error = %err,
            "Retrying"
        );
        tokio::time::sleep(delay).await;
        attempt += 1;
    }
}
