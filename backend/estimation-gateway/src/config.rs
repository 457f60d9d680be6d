//! Configuration for the Estimation Gateway
//!
//! Loads settings from:
//! 1. Environment variables
//! 2. .env file (local development)

use crate::orchestrator::Stage;
use grpc_clients::{ClientConfigError, GrpcClientConfig, UnaryMethod};
use grpc_jwt_propagation::{AccessPolicy, AccessPolicyEntry, PolicyError};
use grpc_tls::ServerCredentialPaths;
use identity_service::{IdentityError, UserSeed};
use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

pub const ESTIMATE_POWER_METHOD: &str =
    "/estimation.gateway.v1.PowerEstimationService/EstimatePower";
pub const LOGIN_METHOD: &str = "/estimation.auth.v1.AuthService/Login";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("{name} is invalid: {reason}")]
    Invalid { name: &'static str, reason: String },

    #[error("ACCESS_POLICY is invalid: {0}")]
    Policy(#[from] PolicyError),

    #[error("GATEWAY_USERS is invalid: {0}")]
    Users(#[from] IdentityError),

    #[error(transparent)]
    Client(#[from] ClientConfigError),
}

#[derive(Debug, Clone)]
pub struct Config {
    /// Server configuration
    pub server: ServerConfig,

    /// Backend stage addresses
    pub stages: StageEndpoints,

    /// Deadline for each stage, dial included
    pub stage_timeout: Duration,

    /// JWT configuration
    pub jwt: JwtConfig,

    /// Dial, retry and outbound mTLS
    pub grpc: GrpcClientConfig,

    pub metrics: MetricsConfig,

    /// Users provisioned into the credential store at startup
    pub users: Vec<UserSeed>,

    pub policy: AccessPolicy,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub addr: SocketAddr,
    /// Inbound TLS; plaintext when `None`
    pub tls: Option<ServerCredentialPaths>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageEndpoints {
    pub fetch: String,
    pub prepare: String,
    pub estimate: String,
}

impl StageEndpoints {
    pub fn address(&self, stage: Stage) -> &str {
        match stage {
            Stage::Fetch => &self.fetch,
            Stage::Prepare => &self.prepare,
            Stage::Estimate => &self.estimate,
        }
    }
}

impl Default for StageEndpoints {
    fn default() -> Self {
        Self {
            fetch: "http://127.0.0.1:50051".to_string(),
            prepare: "http://127.0.0.1:50052".to_string(),
            estimate: "http://127.0.0.1:50053".to_string(),
        }
    }
}

#[derive(Clone)]
pub struct JwtConfig {
    pub secret: String,
    pub token_duration: Duration,
}

impl std::fmt::Debug for JwtConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtConfig")
            .field("secret", &"[REDACTED]")
            .field("token_duration", &self.token_duration)
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct MetricsConfig {
    /// Push gateway base URL; pushing is off when `None`
    pub pushgateway_url: Option<String>,
    pub job_name: String,
    pub push_timeout: Duration,
}

/// Policy used when `ACCESS_POLICY` is not set: every estimation method
/// needs `admin`, login is public.
pub fn default_access_policy() -> AccessPolicy {
    [
        ESTIMATE_POWER_METHOD,
        grpc_clients::FetchData::PATH,
        grpc_clients::PrepareData::PATH,
        grpc_clients::EstimatePower::PATH,
    ]
    .into_iter()
    .fold(AccessPolicy::new(), |policy, method| {
        policy.with_entry(AccessPolicyEntry::new(method, ["admin"]))
    })
    .with_authentication(LOGIN_METHOD, false)
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let secret = env::var("JWT_SECRET")
            .ok()
            .filter(|s| !s.trim().is_empty())
            .ok_or(ConfigError::Missing("JWT_SECRET"))?;

        let policy = match non_empty("ACCESS_POLICY") {
            Some(spec) => AccessPolicy::parse(&spec)?,
            None => default_access_policy(),
        };
        policy.validate()?;

        let stage_defaults = StageEndpoints::default();

        Ok(Self {
            server: ServerConfig {
                addr: parse_or("GATEWAY_ADDR", SocketAddr::from(([0, 0, 0, 0], 50201)))?,
                tls: server_tls_paths()?,
            },
            stages: StageEndpoints {
                fetch: non_empty("FETCH_SERVICE_URL").unwrap_or(stage_defaults.fetch),
                prepare: non_empty("PREPARE_SERVICE_URL").unwrap_or(stage_defaults.prepare),
                estimate: non_empty("ESTIMATE_SERVICE_URL").unwrap_or(stage_defaults.estimate),
            },
            stage_timeout: Duration::from_secs(parse_or("STAGE_TIMEOUT_SECS", 5)?),
            jwt: JwtConfig {
                secret,
                token_duration: Duration::from_secs(parse_or("JWT_TOKEN_DURATION_SECS", 900)?),
            },
            grpc: GrpcClientConfig::from_env()?,
            metrics: MetricsConfig {
                pushgateway_url: match env::var("METRICS_PUSHGATEWAY_URL") {
                    Ok(url) if url.trim().is_empty() => None,
                    Ok(url) => Some(url),
                    Err(_) => Some("http://127.0.0.1:9091".to_string()),
                },
                job_name: non_empty("METRICS_JOB_NAME")
                    .unwrap_or_else(|| "PowerEstimationSP".to_string()),
                push_timeout: Duration::from_secs(2),
            },
            users: match non_empty("GATEWAY_USERS") {
                Some(spec) => UserSeed::parse_list(&spec)?,
                None => Vec::new(),
            },
            policy,
        })
    }
}

fn server_tls_paths() -> Result<Option<ServerCredentialPaths>, ConfigError> {
    match (non_empty("GRPC_SERVER_CERT_PATH"), non_empty("GRPC_SERVER_KEY_PATH")) {
        (Some(cert), Some(key)) => Ok(Some(ServerCredentialPaths {
            server_cert_path: PathBuf::from(cert),
            server_key_path: PathBuf::from(key),
            client_ca_cert_path: non_empty("GRPC_CLIENT_CA_CERT_PATH").map(PathBuf::from),
        })),
        (None, None) => Ok(None),
        (Some(_), None) => Err(ConfigError::Missing("GRPC_SERVER_KEY_PATH")),
        (None, Some(_)) => Err(ConfigError::Missing("GRPC_SERVER_CERT_PATH")),
    }
}

fn non_empty(name: &str) -> Option<String> {
    env::var(name).ok().filter(|s| !s.trim().is_empty())
}

fn invalid<E: std::fmt::Display>(name: &'static str) -> impl Fn(E) -> ConfigError {
    move |e| ConfigError::Invalid {
        name,
        reason: e.to_string(),
    }
}

fn parse_or<T>(name: &'static str, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match non_empty(name) {
        Some(value) => value.trim().parse().map_err(invalid(name)),
        None => Ok(default),
    }
}
