//! TLS material for gRPC clients and servers
//!
//! - [`ClientCredentials`]: CA plus client identity for outbound mutual TLS
//! - [`ServerCredentials`]: server identity, optionally requiring client certs
//! - `dev_certs` (feature `dev-certs`): throwaway CA and leaves for tests
//!
//! Loading failures are returned as [`TlsError`] and are meant to be fatal at
//! startup.

use tracing::{info, warn};

#[cfg(any(test, feature = "dev-certs"))]
pub mod dev_certs;
mod error;
pub mod mtls;

#[cfg(any(test, feature = "dev-certs"))]
pub use dev_certs::{
    generate_dev_certificates, write_cert_bundle, CertificateBundle, DevAuthority, IssuedCert,
};
pub use error::{TlsError, TlsResult};
pub use mtls::{ClientCredentialPaths, ClientCredentials, ServerCredentialPaths, ServerCredentials};

/// Parse a PEM certificate and reject it if already expired.
///
/// Logs a warning when fewer than `warn_days_before` days remain.
pub fn validate_cert_expiration(what: &'static str, cert_pem: &str, warn_days_before: u64) -> TlsResult<()> {
    use x509_parser::prelude::*;

    let pem = ::pem::parse(cert_pem).map_err(|e| TlsError::InvalidPem {
        what,
        reason: e.to_string(),
    })?;

    let (_, cert) = X509Certificate::from_der(pem.contents()).map_err(|e| {
        TlsError::InvalidCertificate {
            what,
            reason: e.to_string(),
        }
    })?;

    let expiry_timestamp = cert.validity().not_after.timestamp();
    let now = chrono::Utc::now().timestamp();
    let seconds_left = expiry_timestamp - now;

    if seconds_left <= 0 {
        return Err(TlsError::CertificateExpired {
            what,
            days: -seconds_left / 86400,
        });
    }

    let days_until_expiry = seconds_left / 86400;
    if days_until_expiry < warn_days_before as i64 {
        warn!(
            certificate = what,
            days_remaining = days_until_expiry,
            "Certificate expiring soon - rotation recommended"
        );
    }

    info!(
        certificate = what,
        days_until_expiry,
        "Certificate validity check passed"
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_cert_expiration() {
        let bundle = generate_dev_certificates().unwrap();
        assert!(validate_cert_expiration("server certificate", &bundle.server_cert, 30).is_ok());
    }

    #[test]
    fn test_key_is_not_a_certificate() {
        let bundle = generate_dev_certificates().unwrap();
        let err = validate_cert_expiration("server certificate", &bundle.server_key, 30).unwrap_err();
        assert!(matches!(err, TlsError::InvalidCertificate { .. }));
    }
}
