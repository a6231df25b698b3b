//! Service-layer error type for burton-confirm
//!
//! `ServiceError` carries either a confirmation failure or an already-built
//! `AppError` and turns both into the `ApiResponse` error JSON.

use axum::response::IntoResponse;
use burton_client::ConfirmError;
use shared::error::{AppError, ErrorCode};

#[derive(Debug)]
pub enum ServiceError {
    /// Confirmation failed against the auth admin API
    Confirm { email: String, source: ConfirmError },
    /// Request-level error (already an AppError with the correct ErrorCode)
    App(AppError),
}

impl From<AppError> for ServiceError {
    fn from(e: AppError) -> Self {
        ServiceError::App(e)
    }
}

impl From<ServiceError> for AppError {
    fn from(e: ServiceError) -> Self {
        match e {
            ServiceError::App(app_err) => app_err,
            ServiceError::Confirm { email, source } => {
                tracing::error!(email = %email, error = %source, "email confirmation failed");
                let code = match source {
                    ConfirmError::NotFound(_) => ErrorCode::ConfirmationUserNotFound,
                    ConfirmError::UpdateFailed(_) | ConfirmError::StillUnconfirmed => {
                        ErrorCode::EmailConfirmationFailed
                    }
                    ConfirmError::Unavailable(_) => ErrorCode::NetworkError,
                };
                AppError::new(code).with_detail("email", email)
            }
        }
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> axum::response::Response {
        let app_error: AppError = self.into();
        app_error.into_response()
    }
}

pub type ServiceResult<T> = Result<T, ServiceError>;
