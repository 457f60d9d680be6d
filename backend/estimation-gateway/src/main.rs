/// Estimation Gateway Main Entry Point
///
/// Starts the gRPC front door with:
/// - In-process Login (credential store seeded from the environment)
/// - Authorization on every call against the access policy
/// - The fetch -> prepare -> estimate pipeline behind `EstimatePower`
use anyhow::{anyhow, Context, Result};
use estimation_gateway::{Config, Gateway};
use grpc_metrics::PushGatewaySink;
use prometheus::Registry;
use tokio::net::TcpListener;
use tokio::signal;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    // rustls 0.23 requires selecting a CryptoProvider at runtime
    if let Err(err) = rustls::crypto::aws_lc_rs::default_provider().install_default() {
        eprintln!("Failed to install rustls crypto provider: {:?}", err);
        return Err(anyhow!("Unable to install TLS crypto provider: {:?}", err));
    }

    tracing_subscriber::fmt()
        .with_env_filter(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "estimation_gateway=info,info".into()),
        )
        .with_target(false)
        .json()
        .init();

    info!("Starting Estimation Gateway");

    let config = Config::from_env().context("Failed to load configuration")?;
    info!(
        fetch = %config.stages.fetch,
        prepare = %config.stages.prepare,
        estimate = %config.stages.estimate,
        stage_timeout = ?config.stage_timeout,
        outbound_tls = config.grpc.tls_enabled,
        "Configuration loaded successfully"
    );

    let registry = Registry::new();
    let gateway =
        Gateway::from_config(&config, &registry).context("Failed to build gateway components")?;

    let listener = TcpListener::bind(config.server.addr)
        .await
        .with_context(|| format!("Failed to bind {}", config.server.addr))?;
    info!("Starting gRPC server on {}", config.server.addr);

    gateway
        .serve(listener, shutdown_signal())
        .await
        .context("gRPC server error")?;

    flush_server_metrics(&config, &registry).await;
    info!("Estimation gateway shutdown complete");

    Ok(())
}

/// Push the final server-side counters before exiting.
async fn flush_server_metrics(config: &Config, registry: &Registry) {
    let Some(url) = &config.metrics.pushgateway_url else {
        return;
    };

    let pushed = match PushGatewaySink::new(
        url.clone(),
        config.metrics.job_name.clone(),
        config.metrics.push_timeout,
    ) {
        Ok(sink) => sink.push_registry("gateway", registry).await,
        Err(e) => Err(e),
    };
    if let Err(e) = pushed {
        warn!(error = %e, "failed to flush server metrics");
    }
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C signal");
        },
        _ = terminate => {
            info!("Received SIGTERM signal");
        },
    }

    info!("Shutting down gracefully...");
}
