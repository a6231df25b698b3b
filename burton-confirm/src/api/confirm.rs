//! POST /confirm-user-email

use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::Json;
use serde::{Deserialize, Serialize};
use shared::error::{ApiResponse, AppError};

use crate::confirm;
use crate::error::{ServiceError, ServiceResult};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ConfirmRequest {
    #[serde(default)]
    pub email: Option<String>,
}

/// Caller is unauthenticated, so no account identifiers go back
#[derive(Debug, Serialize)]
pub struct ConfirmResponse {
    pub already_confirmed: bool,
}

pub async fn confirm_user_email(
    State(state): State<AppState>,
    body: Result<Json<ConfirmRequest>, JsonRejection>,
) -> ServiceResult<ApiResponse<ConfirmResponse>> {
    let Json(req) = body.map_err(|e| AppError::validation(e.body_text()))?;
    let email = req
        .email
        .as_deref()
        .map(str::trim)
        .filter(|e| !e.is_empty())
        .ok_or_else(|| AppError::required("email"))?;

    tracing::info!(email = %email, "confirming email");

    let confirmed = confirm::confirm_user_email(state.admin.as_ref(), email, &state.lookup_retry)
        .await
        .map_err(|source| ServiceError::Confirm {
            email: email.to_string(),
            source,
        })?;

    Ok(ApiResponse::success_with_message(
        "Email confirmed successfully",
        ConfirmResponse {
            already_confirmed: confirmed.already_confirmed,
        },
    ))
}
