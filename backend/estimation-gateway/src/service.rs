/// gRPC handler for `PowerEstimationService`
///
/// Authorization has already run by the time a call lands here; the handler
/// only hands the request and the caller's metadata to the orchestrator.
use crate::orchestrator::Orchestrator;
use grpc_clients::estimation::gateway::power_estimation_service_server::PowerEstimationService;
use grpc_clients::estimation::gateway::{EstimationRequest, EstimationResponse};
use grpc_jwt_propagation::JwtClaimsExt;
use std::sync::Arc;
use tonic::{Request, Response, Status};
use tracing::info;

#[derive(Clone)]
pub struct PowerEstimationServer {
    orchestrator: Arc<Orchestrator>,
}

impl PowerEstimationServer {
    pub fn new(orchestrator: Arc<Orchestrator>) -> Self {
        Self { orchestrator }
    }
}

#[tonic::async_trait]
impl PowerEstimationService for PowerEstimationServer {
    async fn estimate_power(
        &self,
        request: Request<EstimationRequest>,
    ) -> Result<Response<EstimationResponse>, Status> {
        let subject = request
            .jwt_claims()
            .map(|claims| claims.subject.clone())
            .unwrap_or_default();
        let metadata = request.metadata().clone();
        let req = request.into_inner();

        info!(
            subject = %subject,
            input_file = %req.input_file,
            model_type = req.model_type,
            "estimation requested"
        );

        let response = self.orchestrator.run(req, &metadata).await?;
        Ok(Response::new(response))
    }
}
