/// gRPC Client Configuration
///
/// Dial, retry and TLS settings shared by every outbound call.
/// Supports environment-based configuration for different deployments.
use crate::channel::SecureChannelFactory;
use grpc_tls::{ClientCredentialPaths, ClientCredentials, TlsResult};
use resilience::RetryConfig;
use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum ClientConfigError {
    #[error("{name} has an invalid value {value:?}")]
    InvalidValue { name: &'static str, value: String },
}

#[derive(Debug, Clone)]
pub struct GrpcClientConfig {
    /// Bound on establishing a backend connection
    pub dial_timeout: Duration,

    /// Retries after the first attempt
    pub retry_max_retries: u32,

    /// Delay before the first retry
    pub retry_initial_backoff: Duration,

    /// Enable mutual TLS for outbound calls
    pub tls_enabled: bool,
    /// Optional domain name for TLS SNI/verification
    pub tls_domain_name: Option<String>,
    pub tls_paths: ClientCredentialPaths,
}

impl Default for GrpcClientConfig {
    fn default() -> Self {
        Self {
            dial_timeout: Duration::from_secs(5),
            retry_max_retries: 4,
            retry_initial_backoff: Duration::from_millis(100),
            tls_enabled: false,
            tls_domain_name: None,
            tls_paths: ClientCredentialPaths::default(),
        }
    }
}

impl GrpcClientConfig {
    /// Load configuration from environment variables
    /// Falls back to defaults for development
    pub fn from_env() -> Result<Self, ClientConfigError> {
        let defaults = Self::default();
        let tls_defaults = defaults.tls_paths.clone();

        Ok(Self {
            dial_timeout: Duration::from_secs(parse_or("GRPC_DIAL_TIMEOUT_SECS", 5)?),
            retry_max_retries: parse_or("GRPC_RETRY_MAX_RETRIES", defaults.retry_max_retries)?,
            retry_initial_backoff: Duration::from_millis(parse_or(
                "GRPC_RETRY_INITIAL_BACKOFF_MS",
                100,
            )?),

            // TLS/mTLS
            tls_enabled: env::var("GRPC_TLS_ENABLED")
                .map(|v| matches!(v.as_str(), "1" | "true" | "TRUE"))
                .unwrap_or(false),
            tls_domain_name: env::var("GRPC_TLS_DOMAIN_NAME").ok().filter(|s| !s.is_empty()),
            tls_paths: ClientCredentialPaths {
                ca_cert_path: path_or("GRPC_TLS_CA_CERT_PATH", tls_defaults.ca_cert_path),
                client_cert_path: path_or(
                    "GRPC_TLS_CLIENT_CERT_PATH",
                    tls_defaults.client_cert_path,
                ),
                client_key_path: path_or("GRPC_TLS_CLIENT_KEY_PATH", tls_defaults.client_key_path),
            },
        })
    }

    pub fn retry_config(&self) -> RetryConfig {
        RetryConfig {
            max_retries: self.retry_max_retries,
            initial_backoff: self.retry_initial_backoff,
            ..RetryConfig::default()
        }
    }

    /// Load client credentials when TLS is enabled.
    pub fn load_credentials(&self) -> TlsResult<Option<ClientCredentials>> {
        if !self.tls_enabled {
            return Ok(None);
        }

        let mut credentials = ClientCredentials::from_paths(&self.tls_paths)?;
        if let Some(domain) = &self.tls_domain_name {
            credentials = credentials.with_domain_name(domain.clone());
        }
        Ok(Some(credentials))
    }

    /// Build the channel factory. TLS loading errors are fatal to the caller.
    pub fn channel_factory(&self) -> TlsResult<SecureChannelFactory> {
        Ok(SecureChannelFactory::new(
            self.load_credentials()?,
            self.dial_timeout,
        ))
    }
}

fn parse_or<T: FromStr>(name: &'static str, default: T) -> Result<T, ClientConfigError> {
    match env::var(name) {
        Ok(value) if !value.trim().is_empty() => value
            .trim()
            .parse()
            .map_err(|_| ClientConfigError::InvalidValue { name, value }),
        _ => Ok(default),
    }
}

fn path_or(name: &str, default: PathBuf) -> PathBuf {
    env::var(name)
        .ok()
        .filter(|s| !s.is_empty())
        .map(PathBuf::from)
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    const VARS: &[&str] = &[
        "GRPC_DIAL_TIMEOUT_SECS",
        "GRPC_RETRY_MAX_RETRIES",
        "GRPC_RETRY_INITIAL_BACKOFF_MS",
        "GRPC_TLS_ENABLED",
        "GRPC_TLS_DOMAIN_NAME",
        "GRPC_TLS_CA_CERT_PATH",
    ];

    fn clear() {
        for var in VARS {
            env::remove_var(var);
        }
    }

    #[test]
    #[serial]
    fn test_defaults() {
        clear();
        let config = GrpcClientConfig::from_env().unwrap();
        assert_eq!(config.dial_timeout, Duration::from_secs(5));
        assert_eq!(config.retry_config().max_retries, 4);
        assert_eq!(config.retry_config().initial_backoff, Duration::from_millis(100));
        assert!(!config.tls_enabled);
        assert!(config.load_credentials().unwrap().is_none());
        assert_eq!(
            config.tls_paths.ca_cert_path,
            PathBuf::from("certification/ca-cert.pem")
        );
    }

    #[test]
    #[serial]
    fn test_overrides() {
        clear();
        env::set_var("GRPC_DIAL_TIMEOUT_SECS", "2");
        env::set_var("GRPC_RETRY_MAX_RETRIES", "1");
        env::set_var("GRPC_TLS_ENABLED", "true");
        env::set_var("GRPC_TLS_CA_CERT_PATH", "/etc/pki/ca.pem");

        let config = GrpcClientConfig::from_env().unwrap();
        clear();

        assert_eq!(config.dial_timeout, Duration::from_secs(2));
        assert_eq!(config.retry_max_retries, 1);
        assert!(config.tls_enabled);
        assert_eq!(config.tls_paths.ca_cert_path, PathBuf::from("/etc/pki/ca.pem"));
    }

    #[test]
    #[serial]
    fn test_invalid_number_rejected() {
        clear();
        env::set_var("GRPC_DIAL_TIMEOUT_SECS", "soon");
        let err = GrpcClientConfig::from_env().unwrap_err();
        clear();

        assert!(matches!(
            err,
            ClientConfigError::InvalidValue { name: "GRPC_DIAL_TIMEOUT_SECS", .. }
        ));
    }

    #[test]
    #[serial]
    fn test_missing_tls_material_is_an_error() {
        clear();
        let config = GrpcClientConfig {
            tls_enabled: true,
            tls_paths: ClientCredentialPaths {
                ca_cert_path: "/nonexistent/ca.pem".into(),
                client_cert_path: "/nonexistent/cert.pem".into(),
                client_key_path: "/nonexistent/key.pem".into(),
            },
            ..GrpcClientConfig::default()
        };
        assert!(config.channel_factory().is_err());
    }
}
