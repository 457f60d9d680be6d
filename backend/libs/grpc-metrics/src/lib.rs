//! gRPC call metrics
//!
//! - [`MetricsLayer`]: client-side request/response sizes pushed to a [`MetricsSink`]
//! - [`ServerMetricsLayer`]: server-side counters, last-call time and latency
//!   recorded in an injected `prometheus::Registry`
//!
//! Nothing here touches the global prometheus registry.

pub mod client;
pub mod server;
pub mod sink;

pub use client::{method_name, MeasuredRequest, MetricsLayer, MetricsService};
pub use server::{ServerMetrics, ServerMetricsLayer, ServerMetricsService};
pub use sink::{MetricsError, MetricsSink, NoopSink, Observation, PushGatewaySink, RecordingSink};
