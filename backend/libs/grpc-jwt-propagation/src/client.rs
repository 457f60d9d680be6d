//! Client-side token propagation
//!
//! Forwards the caller's bearer token, taken verbatim from the inbound call,
//! onto every outbound call so downstream services can run their own
//! authorization. Tokens are never minted here.

use std::task::{Context, Poll};
use tonic::metadata::{AsciiMetadataValue, MetadataMap};
use tonic::service::Interceptor;
use tonic::{Request, Status};
use tower::{Layer, Service};

/// Metadata key carrying the bearer token.
pub const AUTHORIZATION_KEY: &str = "authorization";

/// Holds a pre-parsed `authorization` value and stamps it onto requests.
///
/// Usable directly as a tonic [`Interceptor`] or through [`AuthPropagationLayer`].
#[derive(Clone, Debug)]
pub struct JwtClientInterceptor {
    auth_header: AsciiMetadataValue,
}

impl JwtClientInterceptor {
    /// Build from a bare token; the `Bearer ` prefix is added here.
    pub fn new(jwt_token: impl AsRef<str>) -> Result<Self, Status> {
        let auth_header = AsciiMetadataValue::try_from(format!("Bearer {}", jwt_token.as_ref()))
            .map_err(|_| Status::unauthenticated("access token is invalid"))?;
        Ok(Self { auth_header })
    }

    pub fn from_header(auth_header: AsciiMetadataValue) -> Self {
        Self { auth_header }
    }

    /// Reuse the `authorization` value of an inbound request.
    pub fn from_inbound(metadata: &MetadataMap) -> Result<Self, Status> {
        Self::extract_from_metadata(metadata).map(|h| Self::from_header(h.clone()))
    }

    pub fn extract_from_metadata(metadata: &MetadataMap) -> Result<&AsciiMetadataValue, Status> {
        metadata
            .get(AUTHORIZATION_KEY)
            .ok_or_else(|| Status::unauthenticated("Missing authorization header"))
    }

    pub fn header(&self) -> &AsciiMetadataValue {
        &self.auth_header
    }

    /// Insert the header, replacing any value already present.
    pub fn apply(&self, metadata: &mut MetadataMap) {
        metadata.insert(AUTHORIZATION_KEY, self.auth_header.clone());
    }
}

impl Interceptor for JwtClientInterceptor {
    fn call(&mut self, mut request: Request<()>) -> Result<Request<()>, Status> {
        self.apply(request.metadata_mut());
        Ok(request)
    }
}

/// Outbound request types that expose mutable call metadata.
pub trait CarriesMetadata {
    fn metadata_mut(&mut self) -> &mut MetadataMap;
}

impl<T> CarriesMetadata for Request<T> {
    fn metadata_mut(&mut self) -> &mut MetadataMap {
        Request::metadata_mut(self)
    }
}

/// Innermost link of the client chain: runs on every attempt, so retried
/// calls carry the token too.
#[derive(Clone, Debug, Default)]
pub struct AuthPropagationLayer {
    credentials: Option<JwtClientInterceptor>,
}

impl AuthPropagationLayer {
    pub fn new(credentials: JwtClientInterceptor) -> Self {
        Self {
            credentials: Some(credentials),
        }
    }

    /// Forward whatever the inbound call carried; nothing when it had no token.
    pub fn from_inbound(metadata: &MetadataMap) -> Self {
        Self {
            credentials: JwtClientInterceptor::from_inbound(metadata).ok(),
        }
    }

    pub fn disabled() -> Self {
        Self::default()
    }
}

impl<S> Layer<S> for AuthPropagationLayer {
    type Service = AuthPropagationService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        AuthPropagationService {
            inner,
            credentials: self.credentials.clone(),
        }
    }
}

#[derive(Clone, Debug)]
pub struct AuthPropagationService<S> {
    inner: S,
    credentials: Option<JwtClientInterceptor>,
}

impl<S, R> Service<R> for AuthPropagationService<S>
where
    S: Service<R>,
    R: CarriesMetadata,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = S::Future;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut request: R) -> Self::Future {
        if let Some(credentials) = &self.credentials {
            credentials.apply(request.metadata_mut());
        }
        self.inner.call(request)
    }
}
