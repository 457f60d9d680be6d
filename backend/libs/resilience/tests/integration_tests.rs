/// Integration tests for resilience library
use resilience::{with_deadline, with_retry, RetryAttempts, RetryConfig, RetryLayer};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tonic::{Code, Status};
use tower::{Layer, ServiceExt};

fn fast(max_retries: u32) -> RetryConfig {
    RetryConfig {
        max_retries,
        initial_backoff: Duration::from_millis(1),
        ..Default::default()
    }
}

// ==================== Retry Tests ====================

#[tokio::test]
async fn test_backend_invoked_n_plus_one_times() {
    for n in 0..4u32 {
        let calls = Arc::new(AtomicU32::new(0));
        let seen = calls.clone();
        let backend = tower::service_fn(move |req: u32| {
            let count = seen.fetch_add(1, Ordering::SeqCst);
            async move {
                if count < n {
                    Err(Status::unavailable("warming up"))
                } else {
                    Ok(tonic::Response::new(req * 2))
                }
            }
        });

        let resp = RetryLayer::new(fast(n)).layer(backend).oneshot(21).await;
        let resp = tokio_test::assert_ok!(resp);

        assert_eq!(*resp.get_ref(), 42);
        assert_eq!(resp.extensions().get::<RetryAttempts>(), Some(&RetryAttempts(n + 1)));
        assert_eq!(calls.load(Ordering::SeqCst), n + 1);
    }
}

#[tokio::test]
async fn test_resource_exhausted_is_retried() {
    let calls = Arc::new(AtomicU32::new(0));
    let seen = calls.clone();

    let outcome = with_retry(&fast(1), move |_| {
        let count = seen.fetch_add(1, Ordering::SeqCst);
        async move {
            if count == 0 {
                Err(Status::resource_exhausted("busy"))
            } else {
                Ok(())
            }
        }
    })
    .await;

    assert_eq!(tokio_test::assert_ok!(outcome).attempts, 2);
}

// ==================== Deadline Tests ====================

#[tokio::test]
async fn test_deadline_wraps_whole_retry_sequence() {
    let config = RetryConfig {
        max_retries: 10,
        initial_backoff: Duration::from_millis(50),
        ..Default::default()
    };

    let err = with_deadline(Duration::from_millis(80), async {
        with_retry(&config, |_| async { Err::<(), _>(Status::unavailable("down")) })
            .await
            .map(|o| o.value)
    })
    .await
    .unwrap_err();

    assert_eq!(err.code(), Code::DeadlineExceeded);
}
