//! Server-side call metrics
//!
//! Counts calls per method and status, keeps the last call time per method,
//! and observes handler latency. All series live in a registry supplied by
//! the caller.

use prometheus::{GaugeVec, HistogramOpts, HistogramVec, IntCounterVec, Opts, Registry};
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::{Instant, SystemTime, UNIX_EPOCH};
use tonic::body::BoxBody;
use tonic::Code;
use tower::{Layer, Service};

#[derive(Clone)]
pub struct ServerMetrics {
    calls_total: IntCounterVec,
    last_call_timestamp: GaugeVec,
    request_duration: HistogramVec,
}

impl ServerMetrics {
    pub fn register(registry: &Registry) -> Result<Self, prometheus::Error> {
        let calls_total = IntCounterVec::new(
            Opts::new("grpc_server_calls_total", "Total gRPC calls handled"),
            &["method", "code"],
        )?;
        let last_call_timestamp = GaugeVec::new(
            Opts::new(
                "grpc_server_last_call_timestamp_seconds",
                "Unix time of the most recent call",
            ),
            &["method"],
        )?;
        let request_duration = HistogramVec::new(
            HistogramOpts::new(
                "grpc_server_request_duration_seconds",
                "gRPC request latencies",
            )
            .buckets(vec![
                0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 15.0,
            ]),
            &["method"],
        )?;

        registry.register(Box::new(calls_total.clone()))?;
        registry.register(Box::new(last_call_timestamp.clone()))?;
        registry.register(Box::new(request_duration.clone()))?;

        Ok(Self {
            calls_total,
            last_call_timestamp,
            request_duration,
        })
    }

    fn record(&self, method: &str, code: Code, elapsed: f64) {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs_f64())
            .unwrap_or_default();

        self.calls_total
            .with_label_values(&[method, &format!("{code:?}")])
            .inc();
        self.last_call_timestamp
            .with_label_values(&[method])
            .set(now);
        self.request_duration
            .with_label_values(&[method])
            .observe(elapsed);
    }

    pub fn calls(&self, method: &str, code: Code) -> u64 {
        self.calls_total
            .with_label_values(&[method, &format!("{code:?}")])
            .get()
    }
}

#[derive(Clone)]
pub struct ServerMetricsLayer {
    metrics: ServerMetrics,
}

impl ServerMetricsLayer {
    pub fn new(metrics: ServerMetrics) -> Self {
        Self { metrics }
    }
}

impl<S> Layer<S> for ServerMetricsLayer {
    type Service = ServerMetricsService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        ServerMetricsService {
            inner,
            metrics: self.metrics.clone(),
        }
    }
}

#[derive(Clone)]
pub struct ServerMetricsService<S> {
    inner: S,
    metrics: ServerMetrics,
}

impl<S, B> Service<http::Request<B>> for ServerMetricsService<S>
where
    S: Service<http::Request<B>, Response = http::Response<BoxBody>>,
    S::Future: Send + 'static,
    S::Error: Send + 'static,
{
    type Response = http::Response<BoxBody>;
    type Error = S::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: http::Request<B>) -> Self::Future {
        let method = req.uri().path().to_string();
        let metrics = self.metrics.clone();
        let start = Instant::now();
        let fut = self.inner.call(req);

        Box::pin(async move {
            let result = fut.await;
            // Trailers-only responses carry the status in headers; a
            // normal unary response reports it in trailers, which means OK here.
            let code = match &result {
                Ok(resp) => tonic::Status::from_header_map(resp.headers())
                    .map(|s| s.code())
                    .unwrap_or(Code::Ok),
                Err(_) => Code::Unknown,
            };
            metrics.record(&method, code, start.elapsed().as_secs_f64());
            result
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::convert::Infallible;
    use tonic::Status;
    use tower::ServiceExt;

    const METHOD: &str = "/estimation.gateway.v1.PowerEstimationService/EstimatePower";

    fn request() -> http::Request<BoxBody> {
        http::Request::builder()
            .uri(METHOD)
            .body(tonic::body::empty_body())
            .unwrap()
    }

    #[test]
    fn test_register_twice_in_same_registry_fails() {
        let registry = Registry::new();
        assert!(ServerMetrics::register(&registry).is_ok());
        assert!(ServerMetrics::register(&registry).is_err());
    }

    #[tokio::test]
    async fn test_counts_ok_and_error_calls() {
        let registry = Registry::new();
        let metrics = ServerMetrics::register(&registry).unwrap();

        let ok = tower::service_fn(|_: http::Request<BoxBody>| async {
            Ok::<_, Infallible>(http::Response::new(tonic::body::empty_body()))
        });
        ServerMetricsLayer::new(metrics.clone())
            .layer(ok)
            .oneshot(request())
            .await
            .unwrap();

        let denied = tower::service_fn(|_: http::Request<BoxBody>| async {
            Ok::<_, Infallible>(Status::permission_denied("no").into_http())
        });
        ServerMetricsLayer::new(metrics.clone())
            .layer(denied)
            .oneshot(request())
            .await
            .unwrap();

        assert_eq!(metrics.calls(METHOD, Code::Ok), 1);
        assert_eq!(metrics.calls(METHOD, Code::PermissionDenied), 1);

        let families = registry.gather();
        let names: Vec<_> = families.iter().map(|f| f.get_name().to_string()).collect();
        assert!(names.contains(&"grpc_server_request_duration_seconds".to_string()));
        assert!(names.contains(&"grpc_server_last_call_timestamp_seconds".to_string()));
    }
}
