use crypto_core::JwtError;
use thiserror::Error;
use tonic::{Code, Status};

pub type Result<T> = std::result::Result<T, IdentityError>;

#[derive(Debug, Error)]
pub enum IdentityError {
    /// Unknown username or wrong password. Deliberately one variant.
    #[error("User not found")]
    UserNotFound,

    #[error("Username already exists")]
    UsernameAlreadyExists,

    #[error("Invalid username: {0}")]
    InvalidUsername(String),

    #[error("Invalid user definition: {0}")]
    InvalidUserSeed(String),

    #[error("Token error: {0}")]
    Token(#[from] JwtError),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl IdentityError {
    /// Convert to gRPC Status for wire protocol
    pub fn to_status(&self) -> Status {
        match self {
            IdentityError::UserNotFound => {
                Status::new(Code::NotFound, "incorrect username/password")
            }
            IdentityError::UsernameAlreadyExists => {
                Status::new(Code::AlreadyExists, "Username already exists")
            }
            IdentityError::InvalidUsername(msg) => {
                Status::new(Code::InvalidArgument, format!("Invalid username: {}", msg))
            }
            IdentityError::InvalidUserSeed(msg) => {
                Status::new(Code::InvalidArgument, format!("Invalid user definition: {}", msg))
            }
            IdentityError::Token(err) => err.to_status(),
            IdentityError::Internal(_) => {
                // Don't leak internal details in production
                Status::new(Code::Internal, "Internal server error")
            }
        }
    }
}

// gRPC Status conversion
impl From<IdentityError> for Status {
    fn from(err: IdentityError) -> Self {
        err.to_status()
    }
}
