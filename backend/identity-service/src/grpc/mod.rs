mod server;

pub use grpc_clients::estimation::auth::auth_service_server::AuthServiceServer;
pub use server::AuthServer;
