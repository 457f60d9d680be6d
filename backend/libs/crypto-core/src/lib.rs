//! Token primitives shared by the gateway and its backend stages.
//!
//! The [`jwt::TokenService`] is constructed once at startup with the shared
//! secret and handed to every component that issues or verifies tokens.

pub mod jwt;

pub use jwt::{JwtError, TokenClaims, TokenService, DEFAULT_TOKEN_DURATION};
