/// HS256 token service
///
/// Tokens carry `{sub, role, iat, exp}` and are signed with a shared secret
/// supplied at construction. Every verification re-checks the signature and
/// the expiry; nothing is cached.
///
/// ## Usage
///
/// ```rust
/// use crypto_core::jwt::TokenService;
/// use std::time::Duration;
///
/// let tokens = TokenService::new(b"shared-secret", Duration::from_secs(900)).unwrap();
/// let token = tokens.issue_token("admin", "admin").unwrap();
/// let claims = tokens.verify_token(&token).unwrap();
/// assert_eq!(claims.role, "admin");
/// ```
use chrono::Utc;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use thiserror::Error;
use tonic::Status;

// ============================================================================
// Constants
// ============================================================================

/// Lifetime of an issued token when none is configured.
pub const DEFAULT_TOKEN_DURATION: Duration = Duration::from_secs(15 * 60);

const JWT_ALGORITHM: Algorithm = Algorithm::HS256;

// ============================================================================
// Data Structures
// ============================================================================

/// Claims encoded into every token
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct TokenClaims {
    /// Subject (username)
    pub sub: String,
    /// Role assigned to the subject at login
    pub role: String,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
}

#[derive(Debug, Error)]
pub enum JwtError {
    #[error("token secret must not be empty")]
    EmptySecret,

    #[error("failed to sign token: {0}")]
    Signing(String),

    #[error("token is invalid: {0}")]
    Invalid(String),

    #[error("token has expired")]
    Expired,
}

impl JwtError {
    /// Signing faults are internal; everything else means the caller is not
    /// authenticated.
    pub fn to_status(&self) -> Status {
        match self {
            JwtError::EmptySecret | JwtError::Signing(_) => {
                Status::internal("Internal server error")
            }
            JwtError::Invalid(_) => Status::unauthenticated("access token is invalid"),
            JwtError::Expired => Status::unauthenticated("access token has expired"),
        }
    }
}

impl From<JwtError> for Status {
    fn from(err: JwtError) -> Self {
        err.to_status()
    }
}

// ============================================================================
// Token Service
// ============================================================================

/// Issues and verifies tokens with a single shared secret.
///
/// Cheap to clone; all state is read-only after construction.
#[derive(Clone)]
pub struct TokenService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    token_duration: Duration,
}

impl fmt::Debug for TokenService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenService")
            .field("token_duration", &self.token_duration)
            .finish_non_exhaustive()
    }
}

impl TokenService {
    pub fn new(secret: &[u8], token_duration: Duration) -> Result<Self, JwtError> {
        if secret.is_empty() {
            return Err(JwtError::EmptySecret);
        }

        let mut validation = Validation::new(JWT_ALGORITHM);
        validation.validate_exp = true;
        // Expiry is exact: no grace period past `exp`.
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "sub"]);

        Ok(Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            validation,
            token_duration,
        })
    }

    pub fn token_duration(&self) -> Duration {
        self.token_duration
    }

    /// Issue a token for `username` carrying `role`, valid for the configured duration.
    pub fn issue_token(&self, username: &str, role: &str) -> Result<String, JwtError> {
        let now = Utc::now().timestamp();
        let lifetime = i64::try_from(self.token_duration.as_secs())
            .map_err(|_| JwtError::Signing("token duration out of range".to_string()))?;

        let claims = TokenClaims {
            sub: username.to_string(),
            role: role.to_string(),
            iat: now,
            exp: now.saturating_add(lifetime),
        };

        self.sign(&claims)
    }

    /// Verify signature and expiry, returning the decoded claims.
    pub fn verify_token(&self, token: &str) -> Result<TokenClaims, JwtError> {
        let data = decode::<TokenClaims>(token, &self.decoding_key, &self.validation).map_err(
            |e| match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => JwtError::Expired,
                _ => JwtError::Invalid(e.to_string()),
            },
        )?;

        // The library accepts `exp == now`; a token is only valid strictly before expiry.
        if data.claims.exp <= Utc::now().timestamp() {
            return Err(JwtError::Expired);
        }

        Ok(data.claims)
    }

    fn sign(&self, claims: &TokenClaims) -> Result<String, JwtError> {
        encode(&Header::new(JWT_ALGORITHM), claims, &self.encoding_key)
            .map_err(|e| JwtError::Signing(e.to_string()))
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use tonic::Code;

    fn service() -> TokenService {
        TokenService::new(b"test-secret", DEFAULT_TOKEN_DURATION).expect("valid secret")
    }

    #[test]
    fn test_issue_then_verify_returns_subject_and_role() {
        let tokens = service();
        let token = tokens.issue_token("admin", "admin").expect("token issued");

        assert_eq!(token.matches('.').count(), 2);

        let claims = tokens.verify_token(&token).expect("token verifies");
        assert_eq!(claims.sub, "admin");
        assert_eq!(claims.role, "admin");
        assert_eq!(claims.exp - claims.iat, 15 * 60);
    }

    #[test]
    fn test_empty_secret_rejected() {
        assert!(matches!(
            TokenService::new(b"", DEFAULT_TOKEN_DURATION),
            Err(JwtError::EmptySecret)
        ));
    }

    #[test]
    fn test_zero_duration_token_is_already_expired() {
        let tokens = TokenService::new(b"test-secret", Duration::ZERO).unwrap();
        let token = tokens.issue_token("admin", "admin").unwrap();

        let err = tokens.verify_token(&token).unwrap_err();
        assert!(matches!(err, JwtError::Expired));
        assert_eq!(err.to_status().code(), Code::Unauthenticated);
    }

    #[test]
    fn test_token_past_expiry_rejected() {
        let tokens = service();
        let now = Utc::now().timestamp();
        let stale = TokenClaims {
            sub: "admin".to_string(),
            role: "admin".to_string(),
            iat: now - 16 * 60,
            exp: now - 60,
        };
        let token = tokens.sign(&stale).unwrap();

        assert!(matches!(tokens.verify_token(&token), Err(JwtError::Expired)));
    }

    #[test]
    fn test_token_signed_with_other_secret_rejected() {
        let forger = TokenService::new(b"attacker-secret", DEFAULT_TOKEN_DURATION).unwrap();
        let token = forger.issue_token("admin", "admin").unwrap();

        let err = service().verify_token(&token).unwrap_err();
        assert!(matches!(err, JwtError::Invalid(_)));
        assert_eq!(Status::from(err).code(), Code::Unauthenticated);
    }

    #[test]
    fn test_tampered_payload_rejected() {
        let tokens = service();
        let token = tokens.issue_token("guest", "guest").unwrap();

        let mut parts: Vec<&str> = token.split('.').collect();
        let forged_claims = TokenService::new(b"x", DEFAULT_TOKEN_DURATION)
            .unwrap()
            .issue_token("guest", "admin")
            .unwrap();
        let forged_payload = forged_claims.split('.').nth(1).unwrap().to_string();
        parts[1] = &forged_payload;

        assert!(tokens.verify_token(&parts.join(".")).is_err());
    }

    #[test]
    fn test_malformed_token_rejected() {
        assert!(matches!(
            service().verify_token("invalid.token.here"),
            Err(JwtError::Invalid(_))
        ));
        assert!(service().verify_token("").is_err());
    }

    #[test]
    fn test_signing_error_maps_to_internal() {
        let status = JwtError::Signing("boom".into()).to_status();
        assert_eq!(status.code(), Code::Internal);
        assert!(!status.message().contains("boom"));
    }
}
