//! Member directory port
//!
//! The directory is the system of record for members. It is only read by
//! member number or email, and written through a single conditional link
//! update that never replaces an existing account id with a different one.

mod rest;

pub use rest::RestMemberDirectory;

use async_trait::async_trait;
use shared::models::{Member, MemberLinkUpdate, MemberNumber};
use std::time::Duration;
use thiserror::Error;

use crate::error::{BootstrapError, LookupKey, TransientKind};
use crate::retry::{Timed, timed};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DirectoryError {
    /// Directory could not be reached or answered with a server error
    #[error("directory unavailable: {0}")]
    Unavailable(String),

    /// Directory refused the request
    #[error("directory rejected request: {0}")]
    Rejected(String),

    /// More than one member matched a key that must be unique
    #[error("{count} members match {key}")]
    Ambiguous { key: String, count: usize },

    /// A row the write expected to exist is gone
    #[error("member {0} no longer exists")]
    Missing(String),
}

pub type DirectoryResult<T> = Result<T, DirectoryError>;

/// Result of the conditional link write
#[derive(Debug, Clone, PartialEq)]
pub enum LinkOutcome {
    /// Row now carries the requested account id (written now or earlier)
    Linked(Member),
    /// Row is already linked to a different account
    LinkedToOther(String),
}

#[async_trait]
pub trait MemberDirectory: Send + Sync {
    async fn lookup_by_number(&self, number: &MemberNumber) -> DirectoryResult<Option<Member>>;

    /// `email` is compared lowercased
    async fn lookup_by_email(&self, email: &str) -> DirectoryResult<Option<Member>>;

    /// Write `update` only if the row's account id is null or already equal
    async fn link_account(
        &self,
        member_id: &str,
        update: &MemberLinkUpdate,
    ) -> DirectoryResult<LinkOutcome>;

    /// Create the profile row for an account if it does not exist yet
    async fn ensure_profile(&self, account_id: &str, email: &str) -> DirectoryResult<()>;
}

/// Canonicalise `raw` and fetch the member it names
pub async fn resolve_member(
    directory: &dyn MemberDirectory,
    raw: &str,
    limit: Duration,
) -> Result<Member, BootstrapError> {
    let number = parse_member_number(raw)?;
    find_member(directory, &number, limit).await
}

/// Unparseable input can never name a member
pub fn parse_member_number(raw: &str) -> Result<MemberNumber, BootstrapError> {
    MemberNumber::parse(raw).map_err(|e| {
        tracing::debug!(error = %e, "rejected member number input");
        BootstrapError::NotFound {
            key: LookupKey::MemberNumber(raw.trim().to_string()),
        }
    })
}

/// Fetch the member with an already canonical number
pub async fn find_member(
    directory: &dyn MemberDirectory,
    number: &MemberNumber,
    limit: Duration,
) -> Result<Member, BootstrapError> {
    match timed(limit, directory.lookup_by_number(number)).await {
        Ok(Some(member)) => Ok(member),
        Ok(None) => {
            tracing::info!(member_number = %number, "member not found");
            Err(BootstrapError::NotFound {
                key: LookupKey::MemberNumber(number.to_string()),
            })
        }
        Err(Timed::Elapsed) => Err(BootstrapError::timed_out("member lookup")),
        Err(Timed::Failed(e)) => Err(lookup_failure(e)),
    }
}

/// Fetch the member registered under `email`
pub async fn resolve_member_by_email(
    directory: &dyn MemberDirectory,
    email: &str,
    limit: Duration,
) -> Result<Member, BootstrapError> {
    let email = email.trim().to_lowercase();
    let not_found = || BootstrapError::NotFound {
        key: LookupKey::Email(email.clone()),
    };
    if email.is_empty() {
        return Err(not_found());
    }

    match timed(limit, directory.lookup_by_email(&email)).await {
        Ok(Some(member)) => Ok(member),
        Ok(None) => {
            tracing::info!(email = %email, "no member with this email");
            Err(not_found())
        }
        Err(Timed::Elapsed) => Err(BootstrapError::timed_out("member lookup")),
        Err(Timed::Failed(e)) => Err(lookup_failure(e)),
    }
}

/// Only an unreachable directory is worth retrying
fn lookup_failure(err: DirectoryError) -> BootstrapError {
    match err {
        DirectoryError::Unavailable(detail) => {
            tracing::warn!(error = %detail, "member lookup unavailable");
            BootstrapError::transient(TransientKind::Unavailable, detail)
        }
        other => {
            tracing::error!(error = %other, support_followup = true, "member lookup failed");
            BootstrapError::Directory {
                reason: other.to_string(),
            }
        }
    }
}
