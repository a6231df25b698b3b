//! Auth admin API access
//!
//! Only the two calls the confirmation flow needs: find an account by email
//! and flip its confirmation flag. Both run with the service-role key.

use async_trait::async_trait;
use burton_client::ClientError;
use burton_client::http::RestClient;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::Config;

/// Accounts fetched per admin listing page
const PAGE_SIZE: usize = 200;
/// Hard stop for the page walk
const MAX_PAGES: usize = 50;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AdminUser {
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub email_confirmed_at: Option<String>,
}

impl AdminUser {
    pub fn is_confirmed(&self) -> bool {
        self.email_confirmed_at.is_some()
    }

    fn has_email(&self, email: &str) -> bool {
        self.email
            .as_deref()
            .is_some_and(|e| e.eq_ignore_ascii_case(email))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AdminError {
    #[error("auth admin API unavailable: {0}")]
    Unavailable(String),
    #[error("auth admin API rejected the request: {0}")]
    Rejected(String),
}

impl AdminError {
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Unavailable(_))
    }
}

impl From<ClientError> for AdminError {
    fn from(e: ClientError) -> Self {
        if e.is_transient() {
            Self::Unavailable(e.to_string())
        } else {
            Self::Rejected(e.to_string())
        }
    }
}

#[async_trait]
pub trait AdminUsers: Send + Sync {
    /// Case-insensitive match on the account email
    async fn find_user_by_email(&self, email: &str) -> Result<Option<AdminUser>, AdminError>;

    async fn mark_email_confirmed(&self, user_id: &str) -> Result<(), AdminError>;
}

#[derive(Deserialize)]
struct UserPage {
    #[serde(default)]
    users: Vec<AdminUser>,
}

#[derive(Serialize)]
struct ConfirmUpdate {
    email_confirm: bool,
}

/// Admin API of the hosted auth service
#[derive(Debug, Clone)]
pub struct GoTrueAdmin {
    rest: RestClient,
}

impl GoTrueAdmin {
    pub fn new(config: &Config) -> Result<Self, ClientError> {
        let rest = RestClient::from_parts(
            &config.supabase_url,
            &config.service_role_key,
            config.request_timeout(),
        )?;
        Ok(Self { rest })
    }
}

#[async_trait]
impl AdminUsers for GoTrueAdmin {
    async fn find_user_by_email(&self, email: &str) -> Result<Option<AdminUser>, AdminError> {
        // the admin listing has no server-side email filter
        for page in 1..=MAX_PAGES {
            let batch: UserPage = self
                .rest
                .get(
                    "auth/v1/admin/users",
                    &[
                        ("page", page.to_string()),
                        ("per_page", PAGE_SIZE.to_string()),
                    ],
                )
                .await?;
            let count = batch.users.len();
            if let Some(user) = batch.users.into_iter().find(|u| u.has_email(email)) {
                return Ok(Some(user));
            }
            if count < PAGE_SIZE {
                break;
            }
        }
        Ok(None)
    }

    async fn mark_email_confirmed(&self, user_id: &str) -> Result<(), AdminError> {
        let _: serde_json::Value = self
            .rest
            .put(
                &format!("auth/v1/admin/users/{user_id}"),
                &ConfirmUpdate {
                    email_confirm: true,
                },
            )
            .await?;
        Ok(())
    }
}
