//! Raw unary transport over a tonic [`Channel`]
//!
//! Innermost service of the client chain. Does what generated client stubs
//! do, but for any [`UnaryMethod`], so the chain can be written once.

use crate::call::{UnaryCall, UnaryMethod};
use http::uri::PathAndQuery;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use tonic::transport::Channel;
use tonic::Status;
use tower::Service;
use tracing::debug;

#[derive(Clone, Debug)]
pub struct GrpcTransport {
    channel: Channel,
}

impl GrpcTransport {
    pub fn new(channel: Channel) -> Self {
        Self { channel }
    }
}

impl<M: UnaryMethod> Service<UnaryCall<M>> for GrpcTransport {
    type Response = tonic::Response<M::Response>;
    type Error = Status;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        // Channel readiness is awaited inside the call future.
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, call: UnaryCall<M>) -> Self::Future {
        let mut grpc = tonic::client::Grpc::new(self.channel.clone());

        Box::pin(async move {
            grpc.ready().await.map_err(|e| {
                debug!(method = M::PATH, error = %e, "channel not ready");
                Status::unavailable("service was not ready")
            })?;

            let mut request =
                tonic::Request::from_parts(call.metadata, tonic::Extensions::new(), call.message);
            if let Some(timeout) = call.timeout {
                request.set_timeout(timeout);
            }

            let codec = tonic::codec::ProstCodec::default();
            let path = PathAndQuery::from_static(M::PATH);
            grpc.unary(request, path, codec).await
        })
    }
}
