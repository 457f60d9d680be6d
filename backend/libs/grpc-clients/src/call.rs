//! Typed unary calls
//!
//! A [`UnaryCall`] is what travels down the client chain: the request
//! message plus its outbound metadata. It is cheap to clone so the retry
//! layer can resend it.

use crate::estimation::{estimate, fetch, prepare};
use grpc_jwt_propagation::CarriesMetadata;
use grpc_metrics::MeasuredRequest;
use std::time::Duration;
use tonic::metadata::MetadataMap;

/// A single request/response gRPC method.
pub trait UnaryMethod: Send + Sync + 'static {
    /// Full method path, as seen by the server's authorization step.
    const PATH: &'static str;

    type Request: prost::Message + Clone + Default + Send + Sync + 'static;
    type Response: prost::Message + Default + Send + Sync + 'static;
}

/// `FetchDataService/FetchData`
#[derive(Debug, Clone, Copy)]
pub struct FetchData;

impl UnaryMethod for FetchData {
    const PATH: &'static str = "/estimation.fetch.v1.FetchDataService/FetchData";
    type Request = fetch::FetchDataRequest;
    type Response = fetch::FetchDataResponse;
}

/// `PrepareDataService/PrepareData`
#[derive(Debug, Clone, Copy)]
pub struct PrepareData;

impl UnaryMethod for PrepareData {
    const PATH: &'static str = "/estimation.prepare.v1.PrepareDataService/PrepareData";
    type Request = prepare::PrepareRequest;
    type Response = prepare::PrepareResponse;
}

/// `EstimatePowerService/EstimatePower`
#[derive(Debug, Clone, Copy)]
pub struct EstimatePower;

impl UnaryMethod for EstimatePower {
    const PATH: &'static str = "/estimation.estimate.v1.EstimatePowerService/EstimatePower";
    type Request = estimate::EstimateRequest;
    type Response = estimate::EstimateResponse;
}

pub struct UnaryCall<M: UnaryMethod> {
    pub message: M::Request,
    pub metadata: MetadataMap,
    /// Sent as `grpc-timeout` so the server can give up too.
    pub timeout: Option<Duration>,
}

impl<M: UnaryMethod> UnaryCall<M> {
    pub fn new(message: M::Request) -> Self {
        Self {
            message,
            metadata: MetadataMap::new(),
            timeout: None,
        }
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn path(&self) -> &'static str {
        M::PATH
    }
}

impl<M: UnaryMethod> Clone for UnaryCall<M> {
    fn clone(&self) -> Self {
        Self {
            message: self.message.clone(),
            metadata: self.metadata.clone(),
            timeout: self.timeout,
        }
    }
}

impl<M: UnaryMethod> std::fmt::Debug for UnaryCall<M> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Metadata carries the bearer token.
        f.debug_struct("UnaryCall")
            .field("path", &M::PATH)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl<M: UnaryMethod> CarriesMetadata for UnaryCall<M> {
    fn metadata_mut(&mut self) -> &mut MetadataMap {
        &mut self.metadata
    }
}

impl<M: UnaryMethod> MeasuredRequest for UnaryCall<M> {
    fn method_path(&self) -> &str {
        M::PATH
    }

    fn payload_size(&self) -> usize {
        prost::Message::encoded_len(&self.message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paths_match_generated_services() {
        assert_eq!(
            FetchData::PATH,
            "/estimation.fetch.v1.FetchDataService/FetchData"
        );
        assert!(PrepareData::PATH.ends_with("/PrepareData"));
        assert!(EstimatePower::PATH.starts_with("/estimation.estimate.v1."));
    }

    #[test]
    fn test_payload_size_is_encoded_len() {
        let call = UnaryCall::<FetchData>::new(fetch::FetchDataRequest {
            input_file: "voyage.csv".into(),
        });
        // tag + length prefix + bytes
        assert_eq!(call.payload_size(), 2 + "voyage.csv".len());
        assert_eq!(call.method_path(), FetchData::PATH);
    }

    #[test]
    fn test_clone_keeps_metadata() {
        let mut call = UnaryCall::<PrepareData>::new(prepare::PrepareRequest::default())
            .with_timeout(Some(Duration::from_secs(5)));
        call.metadata_mut()
            .insert("authorization", "Bearer abc".parse().unwrap());

        let copy = call.clone();
        assert_eq!(copy.metadata.get("authorization").unwrap(), "Bearer abc");
        assert_eq!(copy.timeout, Some(Duration::from_secs(5)));
    }

    #[test]
    fn test_debug_hides_metadata() {
        let mut call = UnaryCall::<EstimatePower>::new(estimate::EstimateRequest::default());
        call.metadata_mut()
            .insert("authorization", "Bearer secret-token".parse().unwrap());
        assert!(!format!("{call:?}").contains("secret-token"));
    }
}
