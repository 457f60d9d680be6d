/// Tower layer applying [`with_retry`] to every call of a tonic-style service
use crate::retry::{with_retry, RetryConfig};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use tonic::Status;
use tower::{Layer, Service, ServiceExt};

/// Number of attempts a successful call needed, stored in the response extensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryAttempts(pub u32);

/// Retry Layer for Tower services
///
/// The request must be `Clone`: each attempt sends a fresh copy down the
/// inner stack, so anything below (for example credential propagation) runs
/// again per attempt.
#[derive(Clone, Debug)]
pub struct RetryLayer {
    config: Arc<RetryConfig>,
}

impl RetryLayer {
    pub fn new(config: RetryConfig) -> Self {
        Self {
            config: Arc::new(config),
        }
    }

    pub fn config(&self) -> &RetryConfig {
        &self.config
    }
}

impl<S> Layer<S> for RetryLayer {
    type Service = RetryService<S>;

    fn layer(&self, service: S) -> Self::Service {
        RetryService {
            inner: service,
            config: self.config.clone(),
        }
    }
}

#[derive(Clone, Debug)]
pub struct RetryService<S> {
    inner: S,
    config: Arc<RetryConfig>,
}

impl<S, Request, T> Service<Request> for RetryService<S>
where
    S: Service<Request, Response = tonic::Response<T>, Error = Status> + Clone + Send + 'static,
    S::Future: Send,
    Request: Clone + Send + 'static,
    T: Send + 'static,
{
    type Response = tonic::Response<T>;
    type Error = Status;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        // Readiness is awaited per attempt on a clone of the inner service.
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: Request) -> Self::Future {
        let config = self.config.clone();
        let inner = self.inner.clone();

        Box::pin(async move {
            let outcome = with_retry(&config, move |_| {
                let svc = inner.clone();
                let req = req.clone();
                async move { svc.oneshot(req).await }
            })
            .await?;

            let mut response = outcome.value;
            response
                .extensions_mut()
                .insert(RetryAttempts(outcome.attempts));
            Ok(response)
        })
    }
}
