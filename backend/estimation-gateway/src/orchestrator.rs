//! Estimation pipeline
//!
//! Runs fetch -> prepare -> estimate for one inbound request. Each stage is
//! dialed fresh, called once through the client chain, and its connection
//! dropped before the next stage starts. The first failure ends the run.

use crate::config::StageEndpoints;
use crate::error::{GatewayError, Result};
use crate::mapping::{
    estimate_request_from, estimation_response_from, normalize_model_type,
    prepare_request_from_fetch, Passthrough,
};
use grpc_clients::estimation::fetch::FetchDataRequest;
use grpc_clients::estimation::gateway::{EstimationRequest, EstimationResponse};
use grpc_clients::{
    ClientChain, ClientInterceptors, EstimatePower, FetchData, PrepareData, SecureChannelFactory,
    UnaryMethod,
};
use std::fmt;
use std::time::{Duration, Instant};
use tonic::metadata::MetadataMap;
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Fetch,
    Prepare,
    Estimate,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Fetch => "fetch",
            Stage::Prepare => "prepare",
            Stage::Estimate => "estimate",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone)]
pub struct Orchestrator {
    factory: SecureChannelFactory,
    interceptors: ClientInterceptors,
    endpoints: StageEndpoints,
    stage_timeout: Duration,
}

impl Orchestrator {
    pub fn new(
        factory: SecureChannelFactory,
        interceptors: ClientInterceptors,
        endpoints: StageEndpoints,
        stage_timeout: Duration,
    ) -> Self {
        Self {
            factory,
            interceptors,
            endpoints,
            stage_timeout,
        }
    }

    /// Run the pipeline on behalf of the caller whose metadata is `inbound`.
    ///
    /// The caller's bearer token is forwarded to every stage as-is.
    pub async fn run(
        &self,
        request: EstimationRequest,
        inbound: &MetadataMap,
    ) -> Result<EstimationResponse> {
        let started = Instant::now();
        let chain = self.interceptors.for_caller(inbound);
        let model_type = normalize_model_type(request.model_type);

        let fetched = self
            .call_stage::<FetchData>(
                Stage::Fetch,
                &chain,
                FetchDataRequest {
                    input_file: request.input_file,
                },
            )
            .await?;

        let passthrough = Passthrough::from_fetch(&fetched);
        let prepared = self
            .call_stage::<PrepareData>(Stage::Prepare, &chain, prepare_request_from_fetch(fetched))
            .await?;

        let estimated = self
            .call_stage::<EstimatePower>(
                Stage::Estimate,
                &chain,
                estimate_request_from(prepared, passthrough, model_type),
            )
            .await?;

        info!(
            model_type = ?model_type,
            samples = estimated.power_estimate.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "estimation pipeline completed"
        );

        Ok(estimation_response_from(estimated))
    }

    /// Dial, call and drop one stage, all under the stage deadline.
    async fn call_stage<M: UnaryMethod>(
        &self,
        stage: Stage,
        chain: &ClientChain,
        message: M::Request,
    ) -> Result<M::Response> {
        let address = self.endpoints.address(stage);
        let timeout = self.stage_timeout;

        let attempt = async {
            let channel = self
                .factory
                .dial(address, chain)
                .await
                .map_err(|source| GatewayError::Dial { stage, source })?;

            channel
                .unary::<M>(message, Some(timeout))
                .await
                .map_err(|status| GatewayError::Stage { stage, status })
        };

        let outcome = match resilience::with_timeout(timeout, attempt).await {
            Ok(outcome) => outcome,
            Err(_) => Err(GatewayError::StageTimeout { stage, timeout }),
        };

        if let Err(e) = &outcome {
            warn!(stage = %stage, address = %address, error = %e, "stage failed, aborting pipeline");
        }
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_names() {
        assert_eq!(Stage::Fetch.to_string(), "fetch");
        assert_eq!(Stage::Prepare.as_str(), "prepare");
        assert_eq!(format!("{}", Stage::Estimate), "estimate");
    }
}
