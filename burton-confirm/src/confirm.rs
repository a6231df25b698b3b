//! Confirm an account email by address

use burton_client::{ConfirmError, RetryPolicy};

use crate::admin::{AdminError, AdminUsers};

/// What the confirmation did
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Confirmed {
    /// The account was confirmed before this call, no update was sent
    pub already_confirmed: bool,
}

enum Lookup {
    Missing,
    Failed(AdminError),
}

impl Lookup {
    fn is_retryable(&self) -> bool {
        match self {
            Self::Missing => true,
            Self::Failed(e) => e.is_transient(),
        }
    }
}

/// Find the account for `email` and mark it confirmed
///
/// The lookup is retried under `retry` because an account created moments
/// ago may not be listed yet. The update itself is attempted once.
pub async fn confirm_user_email(
    admin: &dyn AdminUsers,
    email: &str,
    retry: &RetryPolicy,
) -> Result<Confirmed, ConfirmError> {
    let user = retry
        .run(
            move |attempt| async move {
                match admin.find_user_by_email(email).await {
                    Ok(Some(user)) => Ok(user),
                    Ok(None) => {
                        tracing::debug!(email = %email, attempt, "account not listed yet");
                        Err(Lookup::Missing)
                    }
                    Err(e) => {
                        tracing::warn!(email = %email, attempt, error = %e, "account lookup failed");
                        Err(Lookup::Failed(e))
                    }
                }
            },
            Lookup::is_retryable,
        )
        .await
        .map_err(|e| match e {
            Lookup::Missing => ConfirmError::NotFound(email.to_string()),
            Lookup::Failed(AdminError::Unavailable(msg)) => ConfirmError::Unavailable(msg),
            // A refused lookup says nothing about whether the account exists
            Lookup::Failed(AdminError::Rejected(msg)) => ConfirmError::UpdateFailed(msg),
        })?;

    tracing::info!(user_id = %user.id, "found account to confirm");

    if user.is_confirmed() {
        tracing::info!(user_id = %user.id, "email already confirmed");
        return Ok(Confirmed {
            already_confirmed: true,
        });
    }

    admin.mark_email_confirmed(&user.id).await.map_err(|e| {
        tracing::error!(user_id = %user.id, error = %e, "confirmation update failed");
        ConfirmError::UpdateFailed(e.to_string())
    })?;

    tracing::info!(user_id = %user.id, "email confirmed");
    Ok(Confirmed {
        already_confirmed: false,
    })
}
