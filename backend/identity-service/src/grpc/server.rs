/// gRPC server implementation for identity-service
///
/// Implements `AuthService` from auth_service.proto:
/// - Login: username/password in, access token and role out
use crate::service::IdentityService;
use grpc_clients::estimation::auth::auth_service_server::AuthService;
use grpc_clients::estimation::auth::{LoginRequest, LoginResponse};
use tonic::{Request, Response, Status};

/// Identity service gRPC server
#[derive(Clone)]
pub struct AuthServer {
    identity: IdentityService,
}

impl AuthServer {
    pub fn new(identity: IdentityService) -> Self {
        Self { identity }
    }
}

#[tonic::async_trait]
impl AuthService for AuthServer {
    async fn login(
        &self,
        request: Request<LoginRequest>,
    ) -> std::result::Result<Response<LoginResponse>, Status> {
        let req = request.into_inner();

        let grant = self
            .identity
            .login_auth(&req.username, &req.password)
            .await
            .map_err(|e| e.to_status())?;

        Ok(Response::new(LoginResponse {
            access_token: grant.access_token,
            role: grant.role,
        }))
    }
}
