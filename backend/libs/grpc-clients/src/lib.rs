/// gRPC Clients Library
///
/// Centralizes protocol code generation for the estimation pipeline and
/// provides the outbound half of every inter-service call.
///
/// This library:
/// - Generates client and server stubs for the gateway, auth and stage services
/// - Binds the client interceptor chain (metrics, retry, auth propagation)
///   to a raw gRPC transport
/// - Dials stage backends through [`SecureChannelFactory`], one connection
///   per call, never pooled
pub mod call;
pub mod chain;
pub mod channel;
pub mod config;
pub mod transport;

pub use call::{EstimatePower, FetchData, PrepareData, UnaryCall, UnaryMethod};
pub use chain::{ClientChain, ClientInterceptors, InterceptedChannel};
pub use channel::{DialError, SecureChannelFactory};
pub use config::{ClientConfigError, GrpcClientConfig};
pub use transport::GrpcTransport;

// Re-export generated proto modules
pub mod estimation {
    pub mod common {
        pub mod v1 {
            tonic::include_proto!("estimation.common.v1");
        }
        pub use v1::*;
    }
    pub mod auth {
        pub mod v1 {
            tonic::include_proto!("estimation.auth.v1");
        }
        pub use v1::*;
    }
    pub mod gateway {
        pub mod v1 {
            tonic::include_proto!("estimation.gateway.v1");
        }
        pub use v1::*;
    }
    pub mod fetch {
        pub mod v1 {
            tonic::include_proto!("estimation.fetch.v1");
        }
        pub use v1::*;
    }
    pub mod prepare {
        pub mod v1 {
            tonic::include_proto!("estimation.prepare.v1");
        }
        pub use v1::*;
    }
    pub mod estimate {
        pub mod v1 {
            tonic::include_proto!("estimation.estimate.v1");
        }
        pub use v1::*;
    }
}
