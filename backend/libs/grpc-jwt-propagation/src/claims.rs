//! Verified caller identity
//!
//! Built from the token claims once the authorization layer has verified the
//! token, and stored in request extensions for handlers.

use crypto_core::TokenClaims;
use serde::{Deserialize, Serialize};

/// Claims of a caller whose token passed verification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JwtClaims {
    /// Username the token was issued to
    pub subject: String,

    /// Role granted at login
    pub role: String,

    /// Expiration timestamp (Unix timestamp)
    pub exp: i64,
}

impl JwtClaims {
    /// Bridge from the token service's decoded claims.
    pub fn from_validated_claims(claims: &TokenClaims) -> Self {
        Self {
            subject: claims.sub.clone(),
            role: claims.role.clone(),
            exp: claims.exp,
        }
    }
}
