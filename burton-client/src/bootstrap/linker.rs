//! Account linker
//!
//! Records an auth account on a member row with one conditional write.

use shared::models::{Member, MemberLinkUpdate};
use std::sync::Arc;
use std::time::Duration;

use crate::directory::{LinkOutcome, MemberDirectory};
use crate::error::BootstrapError;
use crate::retry::{Timed, timed};

/// A link write that has not been applied yet
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingLink {
    pub member_id: String,
    pub update: MemberLinkUpdate,
}

impl PendingLink {
    pub fn new(member_id: impl Into<String>, update: MemberLinkUpdate) -> Self {
        Self {
            member_id: member_id.into(),
            update,
        }
    }

    pub fn account_id(&self) -> &str {
        &self.update.auth_account_id
    }
}

#[derive(Clone)]
pub struct AccountLinker {
    directory: Arc<dyn MemberDirectory>,
    placeholder_domain: String,
    timeout: Duration,
}

impl AccountLinker {
    pub fn new(
        directory: Arc<dyn MemberDirectory>,
        placeholder_domain: impl Into<String>,
        timeout: Duration,
    ) -> Self {
        Self {
            directory,
            placeholder_domain: placeholder_domain.into(),
            timeout,
        }
    }

    /// Update written after first-time login
    ///
    /// The address is only recorded when the member had no real email.
    pub fn bootstrap_update(
        &self,
        member: &Member,
        account_id: &str,
        address_used: &str,
    ) -> MemberLinkUpdate {
        let email = match member.real_email(&self.placeholder_domain) {
            Some(_) => None,
            None => Some(address_used.to_string()),
        };
        MemberLinkUpdate::bootstrap(account_id, email)
    }

    /// Link `account_id` to `member` and clear the first-login flags
    pub async fn link(
        &self,
        member: &Member,
        account_id: &str,
        address_used: &str,
    ) -> Result<Member, BootstrapError> {
        let update = self.bootstrap_update(member, account_id, address_used);
        self.apply(PendingLink::new(&member.id, update)).await
    }

    /// Re-apply a link that failed earlier, without touching the provider
    pub async fn retry_link(&self, pending: &PendingLink) -> Result<Member, BootstrapError> {
        tracing::info!(member_id = %pending.member_id, account_id = %pending.account_id(), "retrying member link");
        self.apply(pending.clone()).await
    }

    /// Record a missing account id found during a regular login
    pub async fn backfill(&self, member: &Member, account_id: &str) -> Result<Member, BootstrapError> {
        self.apply(PendingLink::new(
            &member.id,
            MemberLinkUpdate::backfill(account_id),
        ))
        .await
    }

    async fn apply(&self, pending: PendingLink) -> Result<Member, BootstrapError> {
        let result = timed(
            self.timeout,
            self.directory.link_account(&pending.member_id, &pending.update),
        )
        .await;

        let reason = match result {
            Ok(LinkOutcome::Linked(member)) => {
                tracing::info!(
                    member_id = %pending.member_id,
                    account_id = %pending.account_id(),
                    "member linked to auth account"
                );
                return Ok(member);
            }
            Ok(LinkOutcome::LinkedToOther(existing)) => {
                format!("member already linked to account {existing}")
            }
            Err(Timed::Elapsed) => "directory update timed out".to_string(),
            Err(Timed::Failed(e)) => e.to_string(),
        };

        tracing::error!(
            member_id = %pending.member_id,
            account_id = %pending.account_id(),
            reason = %reason,
            support_followup = true,
            "member link failed"
        );
        Err(BootstrapError::LinkUpdate { pending, reason })
    }
}
