//! Gateway Front Door
//!
//! One tonic server hosting `AuthService` and `PowerEstimationService`,
//! with every call passing server metrics first, then authorization.

use crate::config::Config;
use crate::error::StartupError;
use crate::orchestrator::Orchestrator;
use crate::service::PowerEstimationServer;
use crypto_core::TokenService;
use grpc_clients::estimation::gateway::power_estimation_service_server::PowerEstimationServiceServer;
use grpc_clients::ClientInterceptors;
use grpc_jwt_propagation::{AuthorizationLayer, Authorizer};
use grpc_metrics::{MetricsSink, NoopSink, PushGatewaySink, ServerMetrics, ServerMetricsLayer};
use grpc_tls::ServerCredentials;
use identity_service::{
    AuthServer, AuthServiceServer, IdentityService, InMemoryCredentialStore,
};
use prometheus::Registry;
use std::future::Future;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio_stream::wrappers::TcpListenerStream;
use tonic::transport::Server;
use tracing::{info, warn};

pub struct Gateway {
    authorizer: Authorizer,
    server_metrics: ServerMetrics,
    auth: AuthServer,
    estimation: PowerEstimationServer,
    tls: Option<ServerCredentials>,
}

impl Gateway {
    pub fn new(
        authorizer: Authorizer,
        server_metrics: ServerMetrics,
        auth: AuthServer,
        estimation: PowerEstimationServer,
    ) -> Self {
        Self {
            authorizer,
            server_metrics,
            auth,
            estimation,
            tls: None,
        }
    }

    pub fn with_tls(mut self, credentials: ServerCredentials) -> Self {
        self.tls = Some(credentials);
        self
    }

    /// Wire every component from configuration.
    ///
    /// Server metrics are registered in `registry`, which the caller owns.
    pub fn from_config(config: &Config, registry: &Registry) -> Result<Self, StartupError> {
        let tokens = Arc::new(TokenService::new(
            config.jwt.secret.as_bytes(),
            config.jwt.token_duration,
        )?);

        let store = InMemoryCredentialStore::from_seeds(&config.users)?;
        if store.is_empty() {
            warn!("GATEWAY_USERS is empty; every login will be rejected");
        }
        let identity = IdentityService::new(Arc::new(store), tokens.clone());

        info!(
            protected = ?config.policy.methods().collect::<Vec<_>>(),
            "access policy loaded"
        );
        let authorizer = Authorizer::new(Arc::new(config.policy.clone()), tokens);
        let server_metrics = ServerMetrics::register(registry)?;

        let sink: Arc<dyn MetricsSink> = match &config.metrics.pushgateway_url {
            Some(url) => {
                info!(url = %url, job = %config.metrics.job_name, "client metrics push enabled");
                Arc::new(PushGatewaySink::new(
                    url.clone(),
                    config.metrics.job_name.clone(),
                    config.metrics.push_timeout,
                )?)
            }
            None => Arc::new(NoopSink),
        };

        let factory = config.grpc.channel_factory()?;
        let orchestrator = Orchestrator::new(
            factory,
            ClientInterceptors::new(sink, config.grpc.retry_config()),
            config.stages.clone(),
            config.stage_timeout,
        );

        let gateway = Self::new(
            authorizer,
            server_metrics,
            AuthServer::new(identity),
            PowerEstimationServer::new(Arc::new(orchestrator)),
        );

        match &config.server.tls {
            Some(paths) => Ok(gateway.with_tls(ServerCredentials::from_paths(paths)?)),
            None => Ok(gateway),
        }
    }

    /// Serve on `listener` until `shutdown` resolves.
    pub async fn serve<F>(self, listener: TcpListener, shutdown: F) -> Result<(), tonic::transport::Error>
    where
        F: Future<Output = ()>,
    {
        let mut builder = Server::builder();
        if let Some(tls) = &self.tls {
            info!(mutual = tls.requires_client_cert(), "inbound TLS enabled");
            builder = builder.tls_config(tls.server_tls_config())?;
        }

        builder
            .layer(ServerMetricsLayer::new(self.server_metrics))
            .layer(AuthorizationLayer::new(self.authorizer))
            .add_service(AuthServiceServer::new(self.auth))
            .add_service(PowerEstimationServiceServer::new(self.estimation))
            .serve_with_incoming_shutdown(TcpListenerStream::new(listener), shutdown)
            .await
    }
}
