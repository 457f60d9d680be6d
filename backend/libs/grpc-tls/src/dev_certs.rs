//! Throwaway PKI for tests and local runs
//!
//! Only compiled with the `dev-certs` feature. A [`DevAuthority`] is a fresh
//! self-signed CA that issues server and client leaves with the matching
//! extended key usage, so both halves of a mutual TLS handshake can be
//! exercised without any files on disk.

use anyhow::{Context, Result};
use rcgen::{
    BasicConstraints, Certificate, CertificateParams, DnType, ExtendedKeyUsagePurpose, IsCa,
    KeyPair, KeyUsagePurpose,
};
use std::fs;
use std::path::Path;
use tracing::debug;

const ORGANIZATION: &str = "Estimation Pipeline";

/// PEM certificate with its private key.
#[derive(Clone)]
pub struct IssuedCert {
    pub cert_pem: String,
    pub key_pem: String,
}

/// A CA able to sign leaves for one test run.
pub struct DevAuthority {
    cert: Certificate,
    key: KeyPair,
    key_pem: String,
}

impl DevAuthority {
    pub fn new(common_name: &str) -> Result<Self> {
        let mut params = CertificateParams::default();
        params.distinguished_name.push(DnType::CommonName, common_name);
        params.distinguished_name.push(DnType::OrganizationName, ORGANIZATION);
        params.is_ca = IsCa::Ca(BasicConstraints::Constrained(0));
        params.key_usages = vec![KeyUsagePurpose::KeyCertSign, KeyUsagePurpose::CrlSign];

        let key = KeyPair::generate()?;
        let cert = params.self_signed(&key).context("self-signing dev CA")?;
        let key_pem = key.serialize_pem();
        Ok(Self { cert, key, key_pem })
    }

    pub fn ca_pem(&self) -> String {
        self.cert.pem()
    }

    /// Server leaf valid for every entry of `hosts` (DNS names or IPs).
    pub fn issue_server(&self, hosts: &[&str]) -> Result<IssuedCert> {
        let names: Vec<String> = hosts.iter().map(|h| h.to_string()).collect();
        let common_name = names.first().cloned().unwrap_or_default();
        let params = CertificateParams::new(names).context("server subject alt names")?;
        self.issue(params, &common_name, ExtendedKeyUsagePurpose::ServerAuth)
    }

    /// Client leaf identifying `name`.
    pub fn issue_client(&self, name: &str) -> Result<IssuedCert> {
        self.issue(
            CertificateParams::default(),
            name,
            ExtendedKeyUsagePurpose::ClientAuth,
        )
    }

    fn issue(
        &self,
        mut params: CertificateParams,
        common_name: &str,
        usage: ExtendedKeyUsagePurpose,
    ) -> Result<IssuedCert> {
        params.distinguished_name.push(DnType::CommonName, common_name);
        params.distinguished_name.push(DnType::OrganizationName, ORGANIZATION);
        params.key_usages = vec![KeyUsagePurpose::DigitalSignature];
        params.extended_key_usages = vec![usage];

        let key = KeyPair::generate()?;
        let cert = params
            .signed_by(&key, &self.cert, &self.key)
            .with_context(|| format!("signing leaf for {common_name}"))?;

        debug!(common_name, "issued dev certificate");
        Ok(IssuedCert {
            cert_pem: cert.pem(),
            key_pem: key.serialize_pem(),
        })
    }
}

/// Everything one gateway deployment needs for mutual TLS.
#[derive(Clone)]
pub struct CertificateBundle {
    pub ca_cert: String,
    pub ca_key: String,
    pub server_cert: String,
    pub server_key: String,
    pub client_cert: String,
    pub client_key: String,
}

/// Fresh CA plus a `localhost`/`127.0.0.1` server leaf and a gateway client leaf.
pub fn generate_dev_certificates() -> Result<CertificateBundle> {
    let authority = DevAuthority::new("Estimation Dev CA")?;
    let server = authority.issue_server(&["localhost", "127.0.0.1"])?;
    let client = authority.issue_client("estimation-gateway")?;

    Ok(CertificateBundle {
        ca_cert: authority.ca_pem(),
        ca_key: authority.key_pem.clone(),
        server_cert: server.cert_pem,
        server_key: server.key_pem,
        client_cert: client.cert_pem,
        client_key: client.key_pem,
    })
}

/// Write `bundle` under `dir` using the file names of the default
/// credential paths (`ca-cert.pem`, `client-key.pem`, ...).
pub fn write_cert_bundle(bundle: &CertificateBundle, dir: &Path) -> Result<()> {
    fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;

    let files = [
        ("ca-cert.pem", &bundle.ca_cert),
        ("ca-key.pem", &bundle.ca_key),
        ("server-cert.pem", &bundle.server_cert),
        ("server-key.pem", &bundle.server_key),
        ("client-cert.pem", &bundle.client_cert),
        ("client-key.pem", &bundle.client_key),
    ];
    for (name, contents) in files {
        let path = dir.join(name);
        fs::write(&path, contents).with_context(|| format!("writing {}", path.display()))?;
    }
    Ok(())
}
