use crate::orchestrator::Stage;
use grpc_clients::DialError;
use std::time::Duration;
use thiserror::Error;
use tonic::{Code, Status};

pub type Result<T> = std::result::Result<T, GatewayError>;

/// Failures of one pipeline run.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// The stage answered with an error status.
    #[error("{stage} stage failed: {status}")]
    Stage { stage: Stage, status: Status },

    #[error("could not reach {stage} stage: {source}")]
    Dial {
        stage: Stage,
        #[source]
        source: DialError,
    },

    #[error("{stage} stage exceeded its {timeout:?} deadline")]
    StageTimeout { stage: Stage, timeout: Duration },
}

impl GatewayError {
    pub fn stage(&self) -> Stage {
        match self {
            GatewayError::Stage { stage, .. }
            | GatewayError::Dial { stage, .. }
            | GatewayError::StageTimeout { stage, .. } => *stage,
        }
    }

    /// Convert to gRPC Status for wire protocol
    pub fn to_status(&self) -> Status {
        match self {
            // Stage statuses pass through untouched.
            GatewayError::Stage { status, .. } => {
                Status::new(status.code(), status.message().to_string())
            }
            GatewayError::Dial { source, .. } => match source {
                DialError::Timeout(_) => {
                    Status::new(Code::DeadlineExceeded, "timed out connecting to stage")
                }
                _ => Status::new(Code::Unavailable, "stage unavailable"),
            },
            GatewayError::StageTimeout { .. } => {
                Status::new(Code::DeadlineExceeded, "stage deadline exceeded")
            }
        }
    }
}

// gRPC Status conversion
impl From<GatewayError> for Status {
    fn from(err: GatewayError) -> Self {
        match err {
            GatewayError::Stage { status, .. } => status,
            other => other.to_status(),
        }
    }
}

/// Failures while assembling the gateway at startup. All are fatal.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("token service: {0}")]
    Token(#[from] crypto_core::JwtError),

    #[error("credential store: {0}")]
    Users(#[from] identity_service::IdentityError),

    #[error("metrics registry: {0}")]
    Metrics(#[from] prometheus::Error),

    #[error("metrics sink: {0}")]
    MetricsSink(#[from] grpc_metrics::MetricsError),

    #[error("TLS: {0}")]
    Tls(#[from] grpc_tls::TlsError),
}
