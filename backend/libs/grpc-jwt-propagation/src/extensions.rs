//! Request Extension Trait for JWT Claims Access
//!
//! Handlers behind [`AuthorizationLayer`](crate::AuthorizationLayer) read the
//! verified caller from request extensions through this trait.

use crate::JwtClaims;
use tonic::{Request, Status};

/// Extension trait for accessing JWT claims from gRPC requests
///
/// Claims are only present when the invoked method is listed in the access
/// policy; public methods never carry them.
pub trait JwtClaimsExt {
    /// Verified claims stored by the authorization layer.
    ///
    /// Returns `Status::unauthenticated` when no claims were stored.
    fn jwt_claims(&self) -> Result<&JwtClaims, Status>;
}

impl<T> JwtClaimsExt for Request<T> {
    fn jwt_claims(&self) -> Result<&JwtClaims, Status> {
        self.extensions()
            .get::<JwtClaims>()
            .ok_or_else(|| Status::unauthenticated("caller is not authenticated"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tonic::Code;

    fn request_with_role(role: &str) -> Request<()> {
        let mut request = Request::new(());
        request.extensions_mut().insert(JwtClaims {
            subject: "alice".into(),
            role: role.into(),
            exp: i64::MAX,
        });
        request
    }

    #[test]
    fn test_missing_claims_is_unauthenticated() {
        let request = Request::new(());
        assert_eq!(request.jwt_claims().unwrap_err().code(), Code::Unauthenticated);
    }

    #[test]
    fn test_stored_claims_are_returned() {
        let request = request_with_role("admin");
        let claims = request.jwt_claims().unwrap();
        assert_eq!(claims.subject, "alice");
        assert_eq!(claims.role, "admin");
    }
}
