/// Resilience patterns for outbound gRPC calls
///
/// - **Retry**: exponential backoff on transient status codes, bounded attempts
/// - **Tower Layer**: [`RetryLayer`] for composing retry into a client stack
/// - **Timeout**: per-call deadlines mapped onto `DeadlineExceeded`
///
/// # Example: retried call
///
/// ```rust,no_run
/// use resilience::{with_retry, RetryConfig};
/// use tonic::Status;
///
/// #[tokio::main]
/// async fn main() {
///     let outcome = with_retry(&RetryConfig::default(), |_attempt| async {
///         // Your gRPC call here
///         Ok::<_, Status>(())
///     })
///     .await;
/// }
/// ```

pub mod layer;
pub mod retry;
pub mod timeout;

// Re-export main types for convenience
pub use layer::{RetryAttempts, RetryLayer, RetryService};
pub use retry::{with_retry, Attempted, RetryConfig, DEFAULT_RETRYABLE_CODES};
pub use timeout::{with_deadline, with_timeout, TimeoutError};
