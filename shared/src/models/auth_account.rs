//! Identity-provider account and session models

use serde::{Deserialize, Serialize};

/// Account owned by the identity provider, referenced by `Member::auth_account_id`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthAccount {
    pub account_id: String,
    pub email: String,
    pub confirmed: bool,
}

/// Authenticated session issued by the identity provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub account_id: String,
    pub email: String,
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    /// Unix seconds
    #[serde(default)]
    pub expires_at: Option<i64>,
    #[serde(default)]
    pub member_number: Option<String>,
}

impl Session {
    pub fn is_expired(&self) -> bool {
        self.expires_at
            .is_some_and(|exp| exp <= crate::util::now_secs())
    }

    pub fn with_member_number(mut self, member_number: impl Into<String>) -> Self {
        self.member_number = Some(member_number.into());
        self
    }
}
