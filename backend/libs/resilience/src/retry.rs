/// Retry policy with exponential backoff for transient gRPC failures
use rand::Rng;
use std::future::Future;
use std::time::Duration;
use tonic::{Code, Status};
use tracing::warn;

/// Codes worth another attempt. Everything else is returned immediately.
pub const DEFAULT_RETRYABLE_CODES: &[Code] = &[Code::Unavailable, Code::ResourceExhausted];

#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Retries after the first attempt; total attempts is `max_retries + 1`
    pub max_retries: u32,
    /// Delay before the first retry
    pub initial_backoff: Duration,
    /// Upper bound for any single delay
    pub max_backoff: Duration,
    /// Growth factor between consecutive delays
    pub backoff_multiplier: f64,
    /// Add random jitter to backoff (±30%)
    pub jitter: bool,
    /// Status codes treated as transient
    pub retryable_codes: Vec<Code>,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 4,
            initial_backoff: Duration::from_millis(100),
            max_backoff: Duration::from_secs(10),
            backoff_multiplier: 2.0,
            jitter: false,
            retryable_codes: DEFAULT_RETRYABLE_CODES.to_vec(),
        }
    }
}

impl RetryConfig {
    pub fn is_retryable(&self, status: &Status) -> bool {
        self.retryable_codes.contains(&status.code())
    }

    /// Delay to sleep before retry number `retry`, jitter applied.
    pub fn delay_for(&self, retry: u32) -> Duration {
        calculate_backoff(self.backoff_for(retry), self.jitter)
    }

    /// Delay before retry number `retry` (1-based), before jitter.
    pub fn backoff_for(&self, retry: u32) -> Duration {
        let exponent = retry.saturating_sub(1).min(63) as i32;
        let millis = self.initial_backoff.as_millis() as f64 * self.backoff_multiplier.powi(exponent);
        let capped = millis.min(self.max_backoff.as_millis() as f64);
        Duration::from_millis(capped as u64)
    }
}

/// Result of a retried operation together with how many attempts it took.
#[derive(Debug)]
pub struct Attempted<T> {
    pub value: T,
    pub attempts: u32,
}

/// Run `f` until it succeeds, fails with a non-retryable status, or the
/// retry budget is spent. The last observed status is returned on failure.
pub async fn with_retry<F, Fut, T>(config: &RetryConfig, mut f: F) -> Result<Attempted<T>, Status>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, Status>>,
{
    let mut attempt = 1;

    loop {
        match f(attempt).await {
            Ok(value) => {
                return Ok(Attempted {
                    value,
                    attempts: attempt,
                })
            }
            Err(status) => {
                if !config.is_retryable(&status) {
                    return Err(status);
                }

                let retry = attempt;
                if retry > config.max_retries {
                    warn!(
                        attempts = attempt,
                        code = ?status.code(),
                        "retries exhausted"
                    );
                    return Err(status);
                }

                let delay = config.delay_for(retry);

                warn!(
                    attempt,
                    max_retries = config.max_retries,
                    code = ?status.code(),
                    "transient failure, retrying in {:?}",
                    delay
                );

                tokio::time::sleep(delay).await;
                attempt += 1;
            }
        }
    }
}

fn calculate_backoff(base: Duration, jitter: bool) -> Duration {
    if jitter {
        let mut rng = rand::thread_rng();
        let jitter_factor = 1.0 + rng.gen_range(-0.3..0.3); // ±30%
        Duration::from_millis((base.as_millis() as f64 * jitter_factor) as u64)
    } else {
        base
    }
}
