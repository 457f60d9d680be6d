/// Identity Service Library
///
/// Credential checks and token issuance for the estimation gateway.
///
/// ## Modules
///
/// - `error`: Error types
/// - `grpc`: `AuthService` gRPC implementation (the `Login` RPC)
/// - `models`: User record
/// - `security`: Password hashing
/// - `service`: `authenticate` and `login_auth`
/// - `store`: Credential Store trait and in-memory implementation
pub mod error;
pub mod grpc;
pub mod models;
pub mod security;
pub mod service;
pub mod store;

// Re-export commonly used types
pub use error::{IdentityError, Result};
pub use grpc::{AuthServer, AuthServiceServer};
pub use models::{User, UserSeed};
pub use service::{IdentityService, LoginGrant};
pub use store::{CredentialStore, InMemoryCredentialStore};
