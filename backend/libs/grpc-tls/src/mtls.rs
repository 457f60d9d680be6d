//! Credential provider for mutual TLS
//!
//! Loads PEM material once at startup and hands out tonic TLS configs.
//! Any failure here is meant to stop the process: a service must not come
//! up half-secured.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use grpc_tls::mtls::{ClientCredentialPaths, ClientCredentials};
//!
//! # fn example() -> grpc_tls::TlsResult<()> {
//! let creds = ClientCredentials::from_paths(&ClientCredentialPaths::default())?;
//! let tls = creds.client_tls_config();
//! # Ok(())
//! # }
//! ```

use crate::error::{TlsError, TlsResult};
use crate::validate_cert_expiration;
use std::fs;
use std::path::{Path, PathBuf};
use tonic::transport::{Certificate, ClientTlsConfig, Identity, ServerTlsConfig};
use tracing::info;

/// Days before expiry at which loading starts warning.
const EXPIRY_WARNING_DAYS: u64 = 30;

/// Where the client-side material lives.
#[derive(Debug, Clone)]
pub struct ClientCredentialPaths {
    /// CA certificate used to verify servers
    pub ca_cert_path: PathBuf,
    /// Certificate presented to servers
    pub client_cert_path: PathBuf,
    /// Private key for `client_cert_path`
    pub client_key_path: PathBuf,
}

impl Default for ClientCredentialPaths {
    fn default() -> Self {
        Self {
            ca_cert_path: PathBuf::from("certification/ca-cert.pem"),
            client_cert_path: PathBuf::from("certification/client-cert.pem"),
            client_key_path: PathBuf::from("certification/client-key.pem"),
        }
    }
}

/// Client credentials for outbound mTLS.
#[derive(Clone)]
pub struct ClientCredentials {
    ca_cert_pem: String,
    client_cert_pem: String,
    client_key_pem: String,
    domain_name: Option<String>,
}

impl std::fmt::Debug for ClientCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientCredentials")
            .field("domain_name", &self.domain_name)
            .finish_non_exhaustive()
    }
}

impl ClientCredentials {
    pub fn from_paths(paths: &ClientCredentialPaths) -> TlsResult<Self> {
        let creds = Self::from_pem(
            read_file(&paths.ca_cert_path)?,
            read_file(&paths.client_cert_path)?,
            read_file(&paths.client_key_path)?,
        )?;

        info!(
            ca_cert = ?paths.ca_cert_path,
            client_cert = ?paths.client_cert_path,
            "mTLS client credentials loaded"
        );

        Ok(creds)
    }

    /// Validate already-loaded PEM material.
    pub fn from_pem(ca_cert_pem: String, client_cert_pem: String, client_key_pem: String) -> TlsResult<Self> {
        validate_cert_expiration("CA certificate", &ca_cert_pem, EXPIRY_WARNING_DAYS)?;
        validate_cert_expiration("client certificate", &client_cert_pem, EXPIRY_WARNING_DAYS)?;
        check_pem("client key", &client_key_pem)?;

        Ok(Self {
            ca_cert_pem,
            client_cert_pem,
            client_key_pem,
            domain_name: None,
        })
    }

    /// Override the name checked against the server certificate.
    pub fn with_domain_name(mut self, domain_name: impl Into<String>) -> Self {
        self.domain_name = Some(domain_name.into());
        self
    }

    pub fn client_tls_config(&self) -> ClientTlsConfig {
        let config = ClientTlsConfig::new()
            .ca_certificate(Certificate::from_pem(&self.ca_cert_pem))
            .identity(Identity::from_pem(&self.client_cert_pem, &self.client_key_pem));

        match &self.domain_name {
            Some(domain) => config.domain_name(domain.clone()),
            None => config,
        }
    }
}

/// Where the server-side material lives.
#[derive(Debug, Clone)]
pub struct ServerCredentialPaths {
    pub server_cert_path: PathBuf,
    pub server_key_path: PathBuf,
    /// When set, clients must present a certificate signed by this CA.
    pub client_ca_cert_path: Option<PathBuf>,
}

/// Server credentials for inbound TLS, optionally requiring client certificates.
#[derive(Clone)]
pub struct ServerCredentials {
    server_cert_pem: String,
    server_key_pem: String,
    client_ca_cert_pem: Option<String>,
}

impl std::fmt::Debug for ServerCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerCredentials").finish_non_exhaustive()
    }
}

impl ServerCredentials {
    pub fn from_paths(paths: &ServerCredentialPaths) -> TlsResult<Self> {
        let client_ca = paths
            .client_ca_cert_path
            .as_deref()
            .map(read_file)
            .transpose()?;

        let creds = Self::from_pem(
            read_file(&paths.server_cert_path)?,
            read_file(&paths.server_key_path)?,
            client_ca,
        )?;

        info!(
            server_cert = ?paths.server_cert_path,
            mutual = creds.requires_client_cert(),
            "server TLS credentials loaded"
        );

        Ok(creds)
    }

    pub fn from_pem(
        server_cert_pem: String,
        server_key_pem: String,
        client_ca_cert_pem: Option<String>,
    ) -> TlsResult<Self> {
        validate_cert_expiration("server certificate", &server_cert_pem, EXPIRY_WARNING_DAYS)?;
        check_pem("server key", &server_key_pem)?;
        if let Some(ca) = &client_ca_cert_pem {
            validate_cert_expiration("client CA certificate", ca, EXPIRY_WARNING_DAYS)?;
        }

        Ok(Self {
            server_cert_pem,
            server_key_pem,
            client_ca_cert_pem,
        })
    }

    pub fn requires_client_cert(&self) -> bool {
        self.client_ca_cert_pem.is_some()
    }

    pub fn server_tls_config(&self) -> ServerTlsConfig {
        let config = ServerTlsConfig::new()
            .identity(Identity::from_pem(&self.server_cert_pem, &self.server_key_pem));

        match &self.client_ca_cert_pem {
            Some(ca) => config.client_ca_root(Certificate::from_pem(ca)),
            None => config,
        }
    }
}

fn read_file(path: &Path) -> TlsResult<String> {
    fs::read_to_string(path).map_err(|e| TlsError::CertificateReadError {
        path: path.to_path_buf(),
        source: e,
    })
}

fn check_pem(what: &'static str, data: &str) -> TlsResult<()> {
    pem::parse(data)
        .map(|_| ())
        .map_err(|e| TlsError::InvalidPem {
            what,
            reason: e.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dev_certs::{generate_dev_certificates, write_cert_bundle};
    use tempfile::TempDir;

    fn bundle_dir() -> TempDir {
        let dir = TempDir::new().unwrap();
        write_cert_bundle(&generate_dev_certificates().unwrap(), dir.path()).unwrap();
        dir
    }

    fn client_paths(dir: &Path) -> ClientCredentialPaths {
        ClientCredentialPaths {
            ca_cert_path: dir.join("ca-cert.pem"),
            client_cert_path: dir.join("client-cert.pem"),
            client_key_path: dir.join("client-key.pem"),
        }
    }

    #[test]
    fn test_client_credentials_from_paths() {
        let dir = bundle_dir();
        let creds = ClientCredentials::from_paths(&client_paths(dir.path()))
            .unwrap()
            .with_domain_name("localhost");

        assert_eq!(creds.domain_name.as_deref(), Some("localhost"));
        let _ = creds.client_tls_config();
    }

    #[test]
    fn test_missing_file_is_read_error() {
        let dir = TempDir::new().unwrap();
        let err = ClientCredentials::from_paths(&client_paths(dir.path())).unwrap_err();

        match err {
            TlsError::CertificateReadError { path, .. } => {
                assert!(path.ends_with("ca-cert.pem"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_garbage_certificate_rejected() {
        let bundle = generate_dev_certificates().unwrap();
        let err = ClientCredentials::from_pem(
            "not a certificate".into(),
            bundle.client_cert,
            bundle.client_key,
        )
        .unwrap_err();

        assert!(matches!(err, TlsError::InvalidPem { what: "CA certificate", .. }));
    }

    #[test]
    fn test_server_credentials_mutual_flag() {
        let dir = bundle_dir();
        let base = ServerCredentialPaths {
            server_cert_path: dir.path().join("server-cert.pem"),
            server_key_path: dir.path().join("server-key.pem"),
            client_ca_cert_path: None,
        };

        let plain = ServerCredentials::from_paths(&base).unwrap();
        assert!(!plain.requires_client_cert());

        let mutual = ServerCredentials::from_paths(&ServerCredentialPaths {
            client_ca_cert_path: Some(dir.path().join("ca-cert.pem")),
            ..base
        })
        .unwrap();
        assert!(mutual.requires_client_cert());
        let _ = mutual.server_tls_config();
    }
}
