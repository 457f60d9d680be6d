//! Secure Channel Factory
//!
//! Dials one backend per call. Each dial opens a fresh connection under a
//! bounded timeout, with mutual TLS when client credentials are configured,
//! and binds the caller's interceptor chain to it. Nothing is pooled: the
//! connection lives exactly as long as the returned channel.
//!
//! Refused connections and dial timeouts are retried with the chain's
//! [`RetryConfig`](resilience::RetryConfig) before the dial gives up.

use crate::chain::{ClientChain, InterceptedChannel};
use grpc_tls::ClientCredentials;
use std::time::Duration;
use tonic::transport::{Channel, Endpoint};
use tonic::Status;
use tracing::{debug, warn};

#[derive(Debug, thiserror::Error)]
pub enum DialError {
    #[error("invalid backend address: {0}")]
    InvalidAddress(String),

    #[error("TLS configuration rejected: {0}")]
    Tls(#[source] tonic::transport::Error),

    #[error("dial timed out after {0:?}")]
    Timeout(Duration),

    #[error("connect failed: {0}")]
    Connect(#[source] tonic::transport::Error),
}

impl DialError {
    /// Connect failures and timeouts may clear up; a bad address or TLS
    /// setup will not.
    pub fn is_transient(&self) -> bool {
        matches!(self, DialError::Connect(_) | DialError::Timeout(_))
    }

    /// Status returned to callers. Addresses stay in the logs only.
    pub fn to_status(&self) -> Status {
        match self {
            DialError::Timeout(_) => Status::deadline_exceeded("timed out connecting to backend"),
            _ => Status::unavailable("backend unavailable"),
        }
    }
}

impl From<DialError> for Status {
    fn from(err: DialError) -> Self {
        err.to_status()
    }
}

#[derive(Clone, Debug)]
pub struct SecureChannelFactory {
    credentials: Option<ClientCredentials>,
    dial_timeout: Duration,
}

impl SecureChannelFactory {
    pub fn new(credentials: Option<ClientCredentials>, dial_timeout: Duration) -> Self {
        Self {
            credentials,
            dial_timeout,
        }
    }

    /// Plaintext dialing, for local development and tests.
    pub fn insecure(dial_timeout: Duration) -> Self {
        Self::new(None, dial_timeout)
    }

    pub fn dial_timeout(&self) -> Duration {
        self.dial_timeout
    }

    pub fn is_secure(&self) -> bool {
        self.credentials.is_some()
    }

    /// Open a connection to `address` and bind `chain` to it.
    ///
    /// Each attempt is bounded by `dial_timeout`. Transient failures are
    /// retried with the chain's backoff; the last error is returned once
    /// the retries run out.
    pub async fn dial(
        &self,
        address: &str,
        chain: &ClientChain,
    ) -> Result<InterceptedChannel, DialError> {
        let retry = chain.retry_config();
        let mut attempt = 1;

        loop {
            match self.connect(address).await {
                Ok(channel) => {
                    debug!(address = %address, attempt, secure = self.is_secure(), "backend connected");
                    return Ok(chain.bind(channel));
                }
                Err(e) if e.is_transient() && attempt <= retry.max_retries => {
                    let delay = retry.delay_for(attempt);
                    warn!(
                        address = %address,
                        attempt,
                        max_retries = retry.max_retries,
                        error = %e,
                        "dial failed, retrying in {:?}",
                        delay
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn connect(&self, address: &str) -> Result<Channel, DialError> {
        let mut endpoint = Endpoint::from_shared(address.to_string())
            .map_err(|e| {
                warn!(address = %address, error = %e, "rejected backend address");
                DialError::InvalidAddress(address.to_string())
            })?
            .connect_timeout(self.dial_timeout)
            .tcp_nodelay(true);

        if let Some(credentials) = &self.credentials {
            endpoint = endpoint
                .tls_config(credentials.client_tls_config())
                .map_err(DialError::Tls)?;
        }

        match resilience::with_timeout(self.dial_timeout, endpoint.connect()).await {
            Ok(Ok(channel)) => Ok(channel),
            Ok(Err(e)) => Err(DialError::Connect(e)),
            Err(_) => Err(DialError::Timeout(self.dial_timeout)),
        }
    }
}
