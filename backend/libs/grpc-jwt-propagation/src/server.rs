//! Server-side authorization layer
//!
//! Runs before every handler and decides, per inbound call:
//!
//! 1. **MethodLookup**: method absent from the [`AccessPolicy`] is public.
//! 2. **MetadataCheck**: an `authorization` value must be attached.
//! 3. **TokenVerify**: the token must verify against the [`TokenService`].
//! 4. **RoleCheck**: the verified role must be allowed for the method.
//!
//! Steps run in this order and a failure at any step returns the error
//! without invoking the handler. On success the caller's [`JwtClaims`] are
//! placed in the request extensions.
//!
//! This is a tower layer rather than a tonic `Interceptor` because the
//! decision depends on the method path, which interceptors cannot see.

use crate::client::AUTHORIZATION_KEY;
use crate::claims::JwtClaims;
use crate::policy::AccessPolicy;
use crypto_core::TokenService;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use tonic::body::BoxBody;
use tonic::metadata::MetadataMap;
use tonic::Status;
use tower::{Layer, Service};
use tracing::{debug, warn};

/// Outcome of a successful authorization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthDecision {
    /// Method is not in the policy; no token was inspected.
    Public,
    /// Token verified and its role is allowed.
    Authorized(JwtClaims),
}

/// Policy plus token verifier, shared by every inbound call.
#[derive(Clone)]
pub struct Authorizer {
    policy: Arc<AccessPolicy>,
    tokens: Arc<TokenService>,
}

impl Authorizer {
    pub fn new(policy: Arc<AccessPolicy>, tokens: Arc<TokenService>) -> Self {
        Self { policy, tokens }
    }

    pub fn policy(&self) -> &AccessPolicy {
        &self.policy
    }

    pub fn authorize(&self, method: &str, metadata: &MetadataMap) -> Result<AuthDecision, Status> {
        // MethodLookup
        let Some(allowed_roles) = self.policy.allowed_roles(method) else {
            debug!(method, "authorization not required");
            return Ok(AuthDecision::Public);
        };

        // MetadataCheck
        let token = bearer_token(metadata).ok_or_else(|| {
            warn!(method, "missing authorization metadata");
            Status::unauthenticated("authentication token has not been provided")
        })?;

        // TokenVerify
        let verified = self.tokens.verify_token(token).map_err(|e| {
            warn!(method, error = %e, "token verification failed");
            e.to_status()
        })?;

        // RoleCheck
        if !allowed_roles.contains(&verified.role) {
            warn!(method, subject = %verified.sub, role = %verified.role, "role not permitted");
            return Err(Status::permission_denied(
                "user does not have permission to access this RPC",
            ));
        }

        debug!(method, subject = %verified.sub, "request authorized");
        Ok(AuthDecision::Authorized(JwtClaims::from_validated_claims(
            &verified,
        )))
    }
}

/// Token from the `authorization` value, with or without a `Bearer ` prefix.
fn bearer_token(metadata: &MetadataMap) -> Option<&str> {
    let raw = metadata.get(AUTHORIZATION_KEY)?.to_str().ok()?.trim();
    let token = raw.strip_prefix("Bearer ").unwrap_or(raw).trim();
    (!token.is_empty()).then_some(token)
}

/// Tower layer applying [`Authorizer`] to every inbound gRPC request.
#[derive(Clone)]
pub struct AuthorizationLayer {
    authorizer: Authorizer,
}

impl AuthorizationLayer {
    pub fn new(authorizer: Authorizer) -> Self {
        Self { authorizer }
    }
}

impl<S> Layer<S> for AuthorizationLayer {
    type Service = AuthorizationService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        AuthorizationService {
            inner,
            authorizer: self.authorizer.clone(),
        }
    }
}

#[derive(Clone)]
pub struct AuthorizationService<S> {
    inner: S,
    authorizer: Authorizer,
}

impl<S, B> Service<http::Request<B>> for AuthorizationService<S>
where
    S: Service<http::Request<B>, Response = http::Response<BoxBody>>,
    S::Future: Send + 'static,
    S::Error: Send + 'static,
{
    type Response = http::Response<BoxBody>;
    type Error = S::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut req: http::Request<B>) -> Self::Future {
        let metadata = MetadataMap::from_headers(req.headers().clone());

        match self.authorizer.authorize(req.uri().path(), &metadata) {
            Ok(AuthDecision::Public) => Box::pin(self.inner.call(req)),
            Ok(AuthDecision::Authorized(claims)) => {
                req.extensions_mut().insert(claims);
                Box::pin(self.inner.call(req))
            }
            Err(status) => Box::pin(async move { Ok(status.into_http()) }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::AccessPolicyEntry;
    use std::convert::Infallible;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use tonic::metadata::MetadataValue;
    use tonic::Code;
    use tower::ServiceExt;

    const ESTIMATE: &str = "/estimation.gateway.v1.PowerEstimationService/EstimatePower";
    const LOGIN: &str = "/estimation.auth.v1.AuthService/Login";

    fn tokens() -> Arc<TokenService> {
        Arc::new(TokenService::new(b"server-test-secret", Duration::from_secs(900)).unwrap())
    }

    fn authorizer(tokens: Arc<TokenService>) -> Authorizer {
        let policy = AccessPolicy::from_entries([AccessPolicyEntry::new(ESTIMATE, ["admin"])]);
        Authorizer::new(Arc::new(policy), tokens)
    }

    fn metadata_with(value: &str) -> MetadataMap {
        let mut metadata = MetadataMap::new();
        metadata.insert(AUTHORIZATION_KEY, MetadataValue::try_from(value).unwrap());
        metadata
    }

    #[test]
    fn test_public_method_needs_no_token() {
        let auth = authorizer(tokens());
        assert_eq!(
            auth.authorize(LOGIN, &MetadataMap::new()).unwrap(),
            AuthDecision::Public
        );
    }

    #[test]
    fn test_missing_token_is_unauthenticated() {
        let auth = authorizer(tokens());
        let status = auth.authorize(ESTIMATE, &MetadataMap::new()).unwrap_err();
        assert_eq!(status.code(), Code::Unauthenticated);

        let status = auth.authorize(ESTIMATE, &metadata_with("Bearer ")).unwrap_err();
        assert_eq!(status.code(), Code::Unauthenticated);
    }

    #[test]
    fn test_invalid_token_is_unauthenticated() {
        let auth = authorizer(tokens());
        let status = auth
            .authorize(ESTIMATE, &metadata_with("Bearer not.a.token"))
            .unwrap_err();
        assert_eq!(status.code(), Code::Unauthenticated);
    }

    #[test]
    fn test_foreign_token_is_unauthenticated_even_with_admin_role() {
        let forged = TokenService::new(b"other", Duration::from_secs(900))
            .unwrap()
            .issue_token("mallory", "admin")
            .unwrap();

        let status = authorizer(tokens())
            .authorize(ESTIMATE, &metadata_with(&format!("Bearer {forged}")))
            .unwrap_err();
        assert_eq!(status.code(), Code::Unauthenticated);
    }

    #[test]
    fn test_role_check() {
        let tokens = tokens();
        let auth = authorizer(tokens.clone());

        let admin = tokens.issue_token("alice", "admin").unwrap();
        match auth
            .authorize(ESTIMATE, &metadata_with(&format!("Bearer {admin}")))
            .unwrap()
        {
            AuthDecision::Authorized(claims) => assert_eq!(claims.subject, "alice"),
            other => panic!("unexpected decision: {other:?}"),
        }

        let guest = tokens.issue_token("bob", "guest").unwrap();
        let status = auth
            .authorize(ESTIMATE, &metadata_with(&format!("Bearer {guest}")))
            .unwrap_err();
        assert_eq!(status.code(), Code::PermissionDenied);
    }

    #[test]
    fn test_raw_token_without_bearer_prefix_accepted() {
        let tokens = tokens();
        let token = tokens.issue_token("alice", "admin").unwrap();
        assert!(authorizer(tokens).authorize(ESTIMATE, &metadata_with(&token)).is_ok());
    }

    #[tokio::test]
    async fn test_layer_short_circuits_before_handler() {
        let tokens = tokens();
        let calls = Arc::new(AtomicUsize::new(0));
        let seen = calls.clone();
        let handler = tower::service_fn(move |req: http::Request<BoxBody>| {
            seen.fetch_add(1, Ordering::SeqCst);
            let subject = req
                .extensions()
                .get::<JwtClaims>()
                .map(|c| c.subject.clone())
                .unwrap_or_default();
            async move {
                let mut resp = http::Response::new(tonic::body::empty_body());
                resp.headers_mut()
                    .insert("x-subject", subject.parse().unwrap());
                Ok::<_, Infallible>(resp)
            }
        });
        let svc = AuthorizationLayer::new(authorizer(tokens.clone())).layer(handler);

        let denied = http::Request::builder()
            .uri(ESTIMATE)
            .body(tonic::body::empty_body())
            .unwrap();
        let resp = svc.clone().oneshot(denied).await.unwrap();
        assert_eq!(resp.headers()["content-type"], "application/grpc");
        let status = Status::from_header_map(resp.headers()).unwrap();
        assert_eq!(status.code(), Code::Unauthenticated);
        assert_eq!(calls.load(Ordering::SeqCst), 0);

        let token = tokens.issue_token("alice", "admin").unwrap();
        let allowed = http::Request::builder()
            .uri(ESTIMATE)
            .header(AUTHORIZATION_KEY, format!("Bearer {token}"))
            .body(tonic::body::empty_body())
            .unwrap();
        let resp = svc.oneshot(allowed).await.unwrap();
        assert_eq!(resp.headers()["x-subject"], "alice");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
