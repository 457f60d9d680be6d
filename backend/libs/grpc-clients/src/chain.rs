//! Client interceptor chain
//!
//! Every outbound call passes, outermost first, through:
//!
//! 1. metrics: one observation set per logical call
//! 2. retry: transient failures are resent with backoff
//! 3. auth propagation: the caller's token, stamped on every attempt
//!
//! and finally the raw [`GrpcTransport`].

use crate::call::{UnaryCall, UnaryMethod};
use crate::transport::GrpcTransport;
use grpc_jwt_propagation::{AuthPropagationLayer, AuthPropagationService};
use grpc_metrics::{MetricsLayer, MetricsService, MetricsSink};
use resilience::{RetryConfig, RetryLayer, RetryService};
use std::sync::Arc;
use std::time::Duration;
use tonic::metadata::MetadataMap;
use tonic::transport::Channel;
use tonic::Status;
use tower::{ServiceBuilder, ServiceExt};

type ChainedService = MetricsService<RetryService<AuthPropagationService<GrpcTransport>>>;

/// The caller-independent links: shared by every call in the process.
#[derive(Clone)]
pub struct ClientInterceptors {
    metrics: MetricsLayer,
    retry: RetryLayer,
}

impl ClientInterceptors {
    pub fn new(sink: Arc<dyn MetricsSink>, retry: RetryConfig) -> Self {
        Self {
            metrics: MetricsLayer::new(sink),
            retry: RetryLayer::new(retry),
        }
    }

    /// Complete the chain for one inbound call, forwarding its token.
    pub fn for_caller(&self, inbound: &MetadataMap) -> ClientChain {
        self.with_auth(AuthPropagationLayer::from_inbound(inbound))
    }

    pub fn with_auth(&self, auth: AuthPropagationLayer) -> ClientChain {
        ClientChain {
            metrics: self.metrics.clone(),
            retry: self.retry.clone(),
            auth,
        }
    }
}

/// A full metrics -> retry -> auth chain, ready to be bound to a channel.
#[derive(Clone)]
pub struct ClientChain {
    metrics: MetricsLayer,
    retry: RetryLayer,
    auth: AuthPropagationLayer,
}

impl ClientChain {
    /// Backoff shared by call retries and dial retries.
    pub fn retry_config(&self) -> &RetryConfig {
        self.retry.config()
    }

    pub fn bind(&self, channel: Channel) -> InterceptedChannel {
        let service = ServiceBuilder::new()
            .layer(self.metrics.clone())
            .layer(self.retry.clone())
            .layer(self.auth.clone())
            .service(GrpcTransport::new(channel));

        InterceptedChannel { service }
    }
}

/// A dialed connection with the chain applied to every call made through it.
///
/// Dropping it closes the connection once in-flight calls finish.
#[derive(Clone)]
pub struct InterceptedChannel {
    service: ChainedService,
}

impl std::fmt::Debug for InterceptedChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InterceptedChannel").finish_non_exhaustive()
    }
}

impl InterceptedChannel {
    pub async fn unary<M: UnaryMethod>(
        &self,
        message: M::Request,
        timeout: Option<Duration>,
    ) -> Result<M::Response, Status> {
        let call = UnaryCall::<M>::new(message).with_timeout(timeout);
        self.service
            .clone()
            .oneshot(call)
            .await
            .map(tonic::Response::into_inner)
    }
}
