//! Identity provider port
//!
//! The provider owns accounts and passwords. Callers only ever see the
//! classified [`ProviderError`] kinds, never raw provider messages.

mod gotrue;

pub use gotrue::{GoTrueProvider, classify_status};

use async_trait::async_trait;
use serde::Serialize;
use shared::models::{AuthAccount, Session};
use std::future::Future;
use std::time::Duration;
use thiserror::Error;

use crate::retry::{Timed, timed};

/// Classified provider failure
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProviderError {
    #[error("invalid login credentials")]
    InvalidCredentials,
    #[error("email not confirmed")]
    NotConfirmed,
    #[error("account not found")]
    NotFound,
    #[error("account already registered")]
    AlreadyExists,
    #[error("rate limited by identity provider")]
    RateLimited,
    #[error("identity provider timed out")]
    Timeout,
    #[error("network error: {0}")]
    Network(String),
    #[error("unexpected provider response (status {status}, code {code:?})")]
    Unexpected { status: u16, code: Option<String> },
}

impl ProviderError {
    pub fn is_transient(&self) -> bool {
        match self {
            Self::RateLimited | Self::Timeout | Self::Network(_) => true,
            Self::Unexpected { status, .. } => *status >= 500,
            _ => false,
        }
    }
}

/// Metadata stored on a freshly created account
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SignUpMetadata {
    pub member_number: String,
    pub member_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedIn {
    pub account: AuthAccount,
    pub session: Session,
}

/// Result of account creation
///
/// `session` is `None` when the provider requires confirmation before
/// issuing one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedUp {
    pub account: AuthAccount,
    pub session: Option<Session>,
}

#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn sign_in(&self, email: &str, password: &str) -> Result<SignedIn, ProviderError>;

    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        metadata: &SignUpMetadata,
    ) -> Result<SignedUp, ProviderError>;

    /// Exchange a refresh token for a new session
    async fn refresh(&self, refresh_token: &str) -> Result<SignedIn, ProviderError>;

    /// Revoke the session behind `access_token`
    async fn sign_out(&self, access_token: &str) -> Result<(), ProviderError>;
}

/// Run a provider call with a deadline; running out counts as `Timeout`
pub async fn with_deadline<T, F>(limit: Duration, fut: F) -> Result<T, ProviderError>
where
    F: Future<Output = Result<T, ProviderError>>,
{
    timed(limit, fut).await.map_err(|e| match e {
        Timed::Elapsed => ProviderError::Timeout,
        Timed::Failed(e) => e,
    })
}
