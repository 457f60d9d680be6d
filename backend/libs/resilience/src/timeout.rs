/// Deadlines for async operations
use std::future::Future;
use std::time::Duration;
use tokio::time::timeout;
use tonic::Status;

#[derive(Debug, thiserror::Error)]
pub enum TimeoutError {
    #[error("Operation timed out after {0:?}")]
    Elapsed(Duration),
}

impl From<TimeoutError> for Status {
    fn from(err: TimeoutError) -> Self {
        Status::deadline_exceeded(err.to_string())
    }
}

/// Execute a future with timeout
pub async fn with_timeout<F, T>(duration: Duration, future: F) -> Result<T, TimeoutError>
where
    F: Future<Output = T>,
{
    timeout(duration, future)
        .await
        .map_err(|_| TimeoutError::Elapsed(duration))
}

/// Run a gRPC call under a deadline measured from now.
///
/// On expiry the in-flight future is dropped and `DeadlineExceeded` returned;
/// a status produced by the call itself passes through unchanged.
pub async fn with_deadline<F, T>(duration: Duration, future: F) -> Result<T, Status>
where
    F: Future<Output = Result<T, Status>>,
{
    with_timeout(duration, future).await?
}

#[cfg(test)]
mod tests {
    use super::*;
    use tonic::Code;

    #[tokio::test]
    async fn test_timeout_success() {
        let result = with_timeout(Duration::from_secs(1), async { 42 }).await;
        assert_eq!(result.unwrap(), 42);
    }

    #[tokio::test]
    async fn test_timeout_elapsed() {
        let result = with_timeout(Duration::from_millis(10), async {
            tokio::time::sleep(Duration::from_secs(1)).await;
            42
        })
        .await;

        assert!(matches!(result, Err(TimeoutError::Elapsed(_))));
    }

    #[tokio::test]
    async fn test_deadline_maps_to_deadline_exceeded() {
        let err = with_deadline(Duration::from_millis(10), async {
            tokio::time::sleep(Duration::from_secs(1)).await;
            Ok::<_, Status>(())
        })
        .await
        .unwrap_err();

        assert_eq!(err.code(), Code::DeadlineExceeded);
    }

    #[tokio::test]
    async fn test_deadline_preserves_inner_status() {
        let err = with_deadline(Duration::from_secs(1), async {
            Err::<(), _>(Status::not_found("missing"))
        })
        .await
        .unwrap_err();

        assert_eq!(err.code(), Code::NotFound);
        assert_eq!(err.message(), "missing");
    }

    #[tokio::test]
    async fn test_deadline_drops_inner_future() {
        struct Flag(std::sync::Arc<std::sync::atomic::AtomicBool>);
        impl Drop for Flag {
            fn drop(&mut self) {
                self.0.store(true, std::sync::atomic::Ordering::SeqCst);
            }
        }

        let dropped = std::sync::Arc::new(std::sync::atomic::AtomicBool::new(false));
        let guard = Flag(dropped.clone());
        let _ = with_deadline(Duration::from_millis(5), async move {
            let _guard = guard;
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok::<_, Status>(())
        })
        .await;

        assert!(dropped.load(std::sync::atomic::Ordering::SeqCst));
    }
}
