//! Client-side call metrics
//!
//! Outermost link of the client chain. Wraps retry, so one logical call is
//! measured once, with the attempt count reported by the retry layer.
//!
//! The push runs on its own task: the call returns as soon as the inner
//! service does, whatever the sink is doing.

use crate::sink::{MetricsSink, Observation};
use resilience::RetryAttempts;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use tonic::Status;
use tower::{Layer, Service};
use tracing::warn;

/// Requests that can report their gRPC method and encoded payload size.
pub trait MeasuredRequest {
    /// Full method path, e.g. `/fetch.v1.FetchDataService/FetchData`.
    fn method_path(&self) -> &str;

    fn payload_size(&self) -> usize;
}

/// Last path segment, used to group pushed metrics.
pub fn method_name(path: &str) -> &str {
    path.rsplit('/').find(|s| !s.is_empty()).unwrap_or(path)
}

#[derive(Clone)]
pub struct MetricsLayer {
    sink: Arc<dyn MetricsSink>,
}

impl MetricsLayer {
    pub fn new(sink: Arc<dyn MetricsSink>) -> Self {
        Self { sink }
    }
}

impl<S> Layer<S> for MetricsLayer {
    type Service = MetricsService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        MetricsService {
            inner,
            sink: self.sink.clone(),
        }
    }
}

#[derive(Clone)]
pub struct MetricsService<S> {
    inner: S,
    sink: Arc<dyn MetricsSink>,
}

impl<S, R, T> Service<R> for MetricsService<S>
where
    S: Service<R, Response = tonic::Response<T>, Error = Status>,
    S::Future: Send + 'static,
    R: MeasuredRequest,
    T: prost::Message + 'static,
{
    type Response = tonic::Response<T>;
    type Error = Status;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: R) -> Self::Future {
        let method = method_name(req.method_path()).to_string();
        let request_size = req.payload_size();
        let sink = self.sink.clone();
        let fut = self.inner.call(req);

        Box::pin(async move {
            let result = fut.await;

            let mut observations = vec![Observation::new(
                "grpc_client_request_size_bytes",
                "Encoded size of the request message",
                request_size as f64,
            )];
            match &result {
                Ok(response) => {
                    observations.push(Observation::new(
                        "grpc_client_response_size_bytes",
                        "Encoded size of the response message",
                        response.get_ref().encoded_len() as f64,
                    ));
                    if let Some(RetryAttempts(attempts)) = response.extensions().get::<RetryAttempts>() {
                        observations.push(Observation::new(
                            "grpc_client_attempts",
                            "Transport attempts made for the call",
                            f64::from(*attempts),
                        ));
                    }
                }
                Err(status) => {
                    observations.push(Observation::new(
                        "grpc_client_last_status_code",
                        "gRPC status code of the failed call",
                        f64::from(status.code() as i32),
                    ));
                }
            }

            tokio::spawn(async move {
                if let Err(e) = sink.push(&method, &observations).await {
                    warn!(method = %method, error = %e, "failed to push client metrics");
                }
            });

            result
        })
    }
}
