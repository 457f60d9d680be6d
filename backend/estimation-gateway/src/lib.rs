//! Estimation Gateway Library
//! Re-exports modules for testing and integration

pub mod config;
pub mod error;
pub mod mapping;
pub mod orchestrator;
pub mod server;
pub mod service;

pub use config::Config;
pub use error::{GatewayError, StartupError};
pub use orchestrator::{Orchestrator, Stage};
pub use server::Gateway;
pub use service::PowerEstimationServer;
