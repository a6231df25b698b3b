//! Email confirmation escalation
//!
//! When the provider refuses a sign-in because the account email is not
//! confirmed, the client asks a privileged capability to mark it confirmed.
//! That capability runs server-side (see the `burton-confirm` service).

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Serialize;
use thiserror::Error;

use crate::http::RestClient;
use crate::{ClientConfig, ClientError, ClientResult};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfirmError {
    /// No account exists for the address, even after retries
    #[error("no account found for {0}")]
    NotFound(String),

    /// The account was found but could not be updated
    #[error("confirmation update failed: {0}")]
    UpdateFailed(String),

    /// Sign-in still reported the email as unconfirmed afterwards
    #[error("email still unconfirmed after confirmation")]
    StillUnconfirmed,

    #[error("confirmation service unavailable: {0}")]
    Unavailable(String),
}

#[async_trait]
pub trait EmailConfirmer: Send + Sync {
    async fn confirm_email(&self, email: &str) -> Result<(), ConfirmError>;
}

#[derive(Serialize)]
struct ConfirmRequest<'a> {
    email: &'a str,
}

/// Confirmer that calls the functions gateway
#[derive(Debug, Clone)]
pub struct FunctionEmailConfirmer {
    rest: RestClient,
    path: String,
}

impl FunctionEmailConfirmer {
    pub fn new(config: &ClientConfig) -> ClientResult<Self> {
        Ok(Self::with_client(
            RestClient::new(config)?,
            &config.confirm_function,
        ))
    }

    pub fn with_client(rest: RestClient, function: &str) -> Self {
        Self {
            rest,
            path: format!("functions/v1/{}", function),
        }
    }
}

#[async_trait]
impl EmailConfirmer for FunctionEmailConfirmer {
    async fn confirm_email(&self, email: &str) -> Result<(), ConfirmError> {
        let result: ClientResult<serde_json::Value> =
            self.rest.post(&self.path, &[], &ConfirmRequest { email }).await;
        match result {
            Ok(_) => {
                tracing::info!(email = %email, "email confirmed");
                Ok(())
            }
            Err(e) => Err(map_err(email, e)),
        }
    }
}

fn map_err(email: &str, err: ClientError) -> ConfirmError {
    match err.status() {
        Some(StatusCode::NOT_FOUND) => ConfirmError::NotFound(email.to_string()),
        Some(status) if status.is_client_error() && status != StatusCode::TOO_MANY_REQUESTS => {
            ConfirmError::UpdateFailed(err.to_string())
        }
        Some(StatusCode::BAD_GATEWAY) => ConfirmError::UpdateFailed(err.to_string()),
        _ => ConfirmError::Unavailable(err.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status(code: u16) -> ClientError {
        ClientError::Status {
            status: StatusCode::from_u16(code).unwrap(),
            body: String::new(),
        }
    }

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            map_err("a@b.c", status(404)),
            ConfirmError::NotFound("a@b.c".into())
        );
        assert!(matches!(map_err("a@b.c", status(502)), ConfirmError::UpdateFailed(_)));
        assert!(matches!(map_err("a@b.c", status(400)), ConfirmError::UpdateFailed(_)));
        assert!(matches!(map_err("a@b.c", status(503)), ConfirmError::Unavailable(_)));
        assert!(matches!(map_err("a@b.c", status(429)), ConfirmError::Unavailable(_)));
    }
}
