use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TlsError {
    #[error("failed to read {path:?}: {source}")]
    CertificateReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{what} is not valid PEM: {reason}")]
    InvalidPem { what: &'static str, reason: String },

    #[error("{what} is not a valid X.509 certificate: {reason}")]
    InvalidCertificate { what: &'static str, reason: String },

    #[error("{what} expired {days} day(s) ago")]
    CertificateExpired { what: &'static str, days: i64 },
}

pub type TlsResult<T> = Result<T, TlsError>;
