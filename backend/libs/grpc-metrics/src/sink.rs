//! Metrics sinks
//!
//! A sink receives named numeric observations grouped by the invoked method.
//! Pushing is best-effort: callers log a failed push and carry on.

use async_trait::async_trait;
use parking_lot::Mutex;
use prometheus::{Encoder, Gauge, Opts, Registry, TextEncoder};
use std::time::Duration;
use thiserror::Error;
use tokio::sync::Notify;

#[derive(Debug, Error)]
pub enum MetricsError {
    #[error("prometheus error: {0}")]
    Prometheus(#[from] prometheus::Error),

    #[error("push gateway request failed: {0}")]
    Http(#[from] reqwest::Error),
}

/// One named value destined for a sink.
#[derive(Debug, Clone, PartialEq)]
pub struct Observation {
    pub name: &'static str,
    pub help: &'static str,
    pub value: f64,
}

impl Observation {
    pub fn new(name: &'static str, help: &'static str, value: f64) -> Self {
        Self { name, help, value }
    }
}

#[async_trait]
pub trait MetricsSink: Send + Sync {
    /// Push observations for `method` (the last segment of the gRPC path).
    async fn push(&self, method: &str, observations: &[Observation]) -> Result<(), MetricsError>;
}

/// Prometheus Pushgateway client.
///
/// Each push replaces the group `job/{job}/service/{method}`.
#[derive(Clone, Debug)]
pub struct PushGatewaySink {
    client: reqwest::Client,
    base_url: String,
    job: String,
}

impl PushGatewaySink {
    pub fn new(
        base_url: impl Into<String>,
        job: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, MetricsError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            job: job.into(),
        })
    }

    pub fn group_url(&self, service: &str) -> String {
        format!(
            "{}/metrics/job/{}/service/{}",
            self.base_url,
            urlencoding::encode(&self.job),
            urlencoding::encode(service)
        )
    }

    /// Push every metric family gathered from `registry` under `service`.
    pub async fn push_registry(&self, service: &str, registry: &Registry) -> Result<(), MetricsError> {
        let encoder = TextEncoder::new();
        let mut buffer = Vec::new();
        encoder.encode(&registry.gather(), &mut buffer)?;

        self.client
            .put(self.group_url(service))
            .header(reqwest::header::CONTENT_TYPE, encoder.format_type())
            .body(buffer)
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }
}

#[async_trait]
impl MetricsSink for PushGatewaySink {
    async fn push(&self, method: &str, observations: &[Observation]) -> Result<(), MetricsError> {
        let registry = Registry::new();
        for obs in observations {
            let gauge = Gauge::with_opts(Opts::new(obs.name, obs.help))?;
            gauge.set(obs.value);
            registry.register(Box::new(gauge))?;
        }
        self.push_registry(method, &registry).await
    }
}

/// Discards everything; used when no push gateway is configured.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopSink;

#[async_trait]
impl MetricsSink for NoopSink {
    async fn push(&self, _method: &str, _observations: &[Observation]) -> Result<(), MetricsError> {
        Ok(())
    }
}

/// Keeps every push in memory.
#[derive(Debug, Default)]
pub struct RecordingSink {
    pushes: Mutex<Vec<(String, Vec<Observation>)>>,
    pushed: Notify,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pushes(&self) -> Vec<(String, Vec<Observation>)> {
        self.pushes.lock().clone()
    }

    /// Resolve once at least `count` pushes have been recorded.
    pub async fn wait_for_pushes(&self, count: usize) {
        loop {
            let notified = self.pushed.notified();
            if self.pushes.lock().len() >= count {
                return;
            }
            notified.await;
        }
    }

    /// Value of the latest observation called `name` pushed for `method`.
    pub fn last_value(&self, method: &str, name: &str) -> Option<f64> {
        self.pushes
            .lock()
            .iter()
            .rev()
            .filter(|(m, _)| m == method)
            .flat_map(|(_, obs)| obs.iter())
            .find(|o| o.name == name)
            .map(|o| o.value)
    }
}

#[async_trait]
impl MetricsSink for RecordingSink {
    async fn push(&self, method: &str, observations: &[Observation]) -> Result<(), MetricsError> {
        self.pushes
            .lock()
            .push((method.to_string(), observations.to_vec()));
        self.pushed.notify_waiters();
        Ok(())
    }
}
