//! JWT propagation and authorization for gRPC services
//!
//! ## Core Components
//!
//! - **AccessPolicy**: method path to allowed roles; absent methods are public
//! - **AuthorizationLayer**: server-side tower layer enforcing the policy
//! - **AuthPropagationLayer** / **JwtClientInterceptor**: forward the inbound
//!   bearer token on outbound calls
//! - **JwtClaimsExt**: handler access to the verified caller
//!
//! ## Server Side
//!
//! ```rust,no_run
//! use grpc_jwt_propagation::{AccessPolicy, AccessPolicyEntry, AuthorizationLayer, Authorizer};
//! use crypto_core::TokenService;
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! let policy = AccessPolicy::from_entries([AccessPolicyEntry::new(
//!     "/estimation.gateway.v1.PowerEstimationService/EstimatePower",
//!     ["admin"],
//! )]);
//! let tokens = TokenService::new(b"secret", Duration::from_secs(900)).unwrap();
//! let layer = AuthorizationLayer::new(Authorizer::new(Arc::new(policy), Arc::new(tokens)));
//! // tonic::transport::Server::builder().layer(layer) ...
//! ```
//!
//! ## Error Mapping
//!
//! - No token, bad signature, expired token: `Status::unauthenticated`
//! - Valid token, role not allowed: `Status::permission_denied`

mod claims;
mod client;
mod extensions;
mod policy;
mod server;

pub use claims::JwtClaims;
pub use client::{
    AuthPropagationLayer, AuthPropagationService, CarriesMetadata, JwtClientInterceptor,
    AUTHORIZATION_KEY,
};
pub use extensions::JwtClaimsExt;
pub use policy::{AccessPolicy, AccessPolicyEntry, PolicyError};
pub use server::{AuthDecision, AuthorizationLayer, AuthorizationService, Authorizer};

// Re-export tonic Status for convenience
pub use tonic::Status;
