//! Integration Tests for JWT Propagation
//!
//! Verifies the complete flow:
//! inbound token -> propagation layer -> wire headers -> authorization layer -> handler

use crypto_core::TokenService;
use grpc_jwt_propagation::{
    AccessPolicy, AccessPolicyEntry, AuthPropagationLayer, AuthorizationLayer, Authorizer,
    JwtClaims, AUTHORIZATION_KEY,
};
use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;
use tonic::body::BoxBody;
use tonic::metadata::MetadataMap;
use tonic::{Code, Request, Status};
use tower::{Layer, ServiceExt};

const FETCH: &str = "/estimation.fetch.v1.FetchDataService/FetchData";
const HEALTH: &str = "/grpc.health.v1.Health/Check";

fn tokens() -> Arc<TokenService> {
    Arc::new(TokenService::new(b"integration-secret", Duration::from_secs(900)).unwrap())
}

/// Run an outbound request through the propagation layer, put its metadata on
/// the wire as HTTP headers, and let the downstream authorization layer decide.
async fn simulate_grpc_flow(
    inbound: &MetadataMap,
    method: &str,
    tokens: Arc<TokenService>,
) -> Result<JwtClaims, Status> {
    let policy = AccessPolicy::from_entries([AccessPolicyEntry::new(FETCH, ["admin"])]);

    // CLIENT SIDE
    let capture = tower::service_fn(|req: Request<()>| async move {
        Ok::<_, Infallible>(req.into_parts().0)
    });
    let outbound_metadata = AuthPropagationLayer::from_inbound(inbound)
        .layer(capture)
        .oneshot(Request::new(()))
        .await
        .unwrap();

    // WIRE
    let mut wire = http::Request::builder()
        .uri(method)
        .body(tonic::body::empty_body())
        .unwrap();
    *wire.headers_mut() = outbound_metadata.into_headers();

    // SERVER SIDE
    let handler = tower::service_fn(|req: http::Request<BoxBody>| async move {
        let claims = req.extensions().get::<JwtClaims>().cloned();
        let mut resp = http::Response::new(tonic::body::empty_body());
        resp.extensions_mut().insert(claims);
        Ok::<_, Infallible>(resp)
    });
    let resp = AuthorizationLayer::new(Authorizer::new(Arc::new(policy), tokens))
        .layer(handler)
        .oneshot(wire)
        .await
        .unwrap();

    if let Some(status) = Status::from_header_map(resp.headers()) {
        return Err(status);
    }
    Ok(resp
        .extensions()
        .get::<Option<JwtClaims>>()
        .cloned()
        .flatten()
        .unwrap_or(JwtClaims {
            subject: String::new(),
            role: String::new(),
            exp: 0,
        }))
}

fn inbound_with(token: &str) -> MetadataMap {
    let mut md = MetadataMap::new();
    md.insert(AUTHORIZATION_KEY, format!("Bearer {token}").parse().unwrap());
    md
}

#[tokio::test]
async fn test_end_to_end_admin_token_reaches_handler() {
    let tokens = tokens();
    let token = tokens.issue_token("admin", "admin").unwrap();

    let claims = simulate_grpc_flow(&inbound_with(&token), FETCH, tokens)
        .await
        .expect("flow should succeed");
    assert_eq!(claims.subject, "admin");
    assert_eq!(claims.role, "admin");
}

#[tokio::test]
async fn test_end_to_end_guest_token_denied() {
    let tokens = tokens();
    let token = tokens.issue_token("visitor", "guest").unwrap();

    let status = simulate_grpc_flow(&inbound_with(&token), FETCH, tokens)
        .await
        .unwrap_err();
    assert_eq!(status.code(), Code::PermissionDenied);
}

#[tokio::test]
async fn test_end_to_end_missing_token() {
    let status = simulate_grpc_flow(&MetadataMap::new(), FETCH, tokens())
        .await
        .unwrap_err();
    assert_eq!(status.code(), Code::Unauthenticated);
}

#[tokio::test]
async fn test_end_to_end_expired_token() {
    let short = TokenService::new(b"integration-secret", Duration::ZERO).unwrap();
    let token = short.issue_token("admin", "admin").unwrap();

    let status = simulate_grpc_flow(&inbound_with(&token), FETCH, tokens())
        .await
        .unwrap_err();
    assert_eq!(status.code(), Code::Unauthenticated);
}

#[tokio::test]
async fn test_end_to_end_public_method_without_token() {
    let claims = simulate_grpc_flow(&MetadataMap::new(), HEALTH, tokens())
        .await
        .expect("public method should pass");
    assert!(claims.subject.is_empty());
}
