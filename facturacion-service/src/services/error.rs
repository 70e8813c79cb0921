use service_core::error::AppError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ServiceError {
    #[error(transparent)]
    App(#[from] AppError),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Email not verified. Please check your email for the verification link.")]
    EmailNotVerified,

    #[error("Email already registered")]
    EmailAlreadyRegistered,

    #[error("Passwords do not match")]
    PasswordMismatch,

    #[error("Invalid token")]
    InvalidToken,

    #[error("Token expired")]
    TokenExpired,

    #[error("User not found")]
    UserNotFound,

    #[error("Redirect must point to this application")]
    InvalidRedirect,

    #[error("Session has been revoked")]
    SessionRevoked,
}

impl From<ServiceError> for AppError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::App(e) => e,
            ServiceError::Internal(e) => AppError::InternalError(e),
            ServiceError::InvalidCredentials => {
                AppError::AuthError(anyhow::anyhow!("Invalid credentials"))
            }
            ServiceError::EmailNotVerified => AppError::Forbidden(anyhow::anyhow!(
                "Email not verified. Please check your email for the verification link."
            )),
            ServiceError::EmailAlreadyRegistered => {
                AppError::Conflict(anyhow::anyhow!("Email already registered"))
            }
            ServiceError::PasswordMismatch => {
                AppError::UnprocessableEntity(anyhow::anyhow!("Passwords do not match"))
            }
            ServiceError::InvalidToken => AppError::BadRequest(anyhow::anyhow!("Invalid token")),
            ServiceError::TokenExpired => AppError::BadRequest(anyhow::anyhow!("Token expired")),
            ServiceError::UserNotFound => AppError::NotFound(anyhow::anyhow!("User not found")),
            ServiceError::InvalidRedirect => AppError::BadRequest(anyhow::anyhow!(
                "Redirect must point to this application"
            )),
            ServiceError::SessionRevoked => {
                AppError::Unauthorized(anyhow::anyhow!("Session has been revoked"))
            }
        }
    }
}
