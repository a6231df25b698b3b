//! Directory over the relational REST surface

use async_trait::async_trait;
use serde::Serialize;
use shared::models::{Member, MemberLinkUpdate, MemberNumber};

use super::{DirectoryError, DirectoryResult, LinkOutcome, MemberDirectory};
use crate::http::RestClient;
use crate::{ClientConfig, ClientError, ClientResult};

const MEMBERS_PATH: &str = "rest/v1/members";
const PROFILES_PATH: &str = "rest/v1/profiles";
const CREATE_PROFILE_RPC: &str = "rest/v1/rpc/create_profile";

const MEMBER_COLUMNS: &str = "id,member_number,full_name,email,auth_user_id,first_time_login,\
password_changed,email_verified,profile_completed,registration_completed";

#[derive(Serialize)]
struct CreateProfile<'a> {
    p_id: &'a str,
    p_email: &'a str,
    p_user_id: &'a str,
}

#[derive(Debug, Clone)]
pub struct RestMemberDirectory {
    rest: RestClient,
}

impl RestMemberDirectory {
    pub fn new(config: &ClientConfig) -> ClientResult<Self> {
        Ok(Self {
            rest: RestClient::new(config)?,
        })
    }

    pub fn with_client(rest: RestClient) -> Self {
        Self { rest }
    }

    async fn select_one(&self, column: &str, value: &str) -> DirectoryResult<Option<Member>> {
        let rows: Vec<Member> = self
            .rest
            .get(
                MEMBERS_PATH,
                &[
                    (column, format!("eq.{}", value)),
                    ("select", MEMBER_COLUMNS.to_string()),
                    ("limit", "2".to_string()),
                ],
            )
            .await
            .map_err(map_err)?;
        single(rows, || format!("{column}={value}"))
    }
}

fn single(mut rows: Vec<Member>, key: impl FnOnce() -> String) -> DirectoryResult<Option<Member>> {
    match rows.len() {
        0 => Ok(None),
        1 => Ok(rows.pop()),
        count => Err(DirectoryError::Ambiguous { key: key(), count }),
    }
}

fn map_err(err: ClientError) -> DirectoryError {
    if err.is_transient() {
        DirectoryError::Unavailable(err.to_string())
    } else {
        DirectoryError::Rejected(err.to_string())
    }
}

#[async_trait]
impl MemberDirectory for RestMemberDirectory {
    async fn lookup_by_number(&self, number: &MemberNumber) -> DirectoryResult<Option<Member>> {
        self.select_one("member_number", number.as_str()).await
    }

    async fn lookup_by_email(&self, email: &str) -> DirectoryResult<Option<Member>> {
        self.select_one("email", &email.trim().to_lowercase()).await
    }

    async fn link_account(
        &self,
        member_id: &str,
        update: &MemberLinkUpdate,
    ) -> DirectoryResult<LinkOutcome> {
        let rows: Vec<Member> = self
            .rest
            .patch(
                MEMBERS_PATH,
                &[
                    ("id", format!("eq.{}", member_id)),
                    (
                        "or",
                        format!(
                            "(auth_user_id.is.null,auth_user_id.eq.{})",
                            update.auth_account_id
                        ),
                    ),
                    ("select", MEMBER_COLUMNS.to_string()),
                ],
                update,
            )
            .await
            .map_err(map_err)?;

        if let Some(member) = rows.into_iter().next() {
            return Ok(LinkOutcome::Linked(member));
        }

        // Nothing matched the condition: the row is gone or linked elsewhere
        let current = self.select_one("id", member_id).await?;
        match current.and_then(|m| m.auth_account_id) {
            Some(existing) if existing != update.auth_account_id => {
                Ok(LinkOutcome::LinkedToOther(existing))
            }
            Some(_) => Err(DirectoryError::Rejected(format!(
                "conditional update on member {member_id} matched no rows"
            ))),
            None => Err(DirectoryError::Missing(member_id.to_string())),
        }
    }

    async fn ensure_profile(&self, account_id: &str, email: &str) -> DirectoryResult<()> {
        let existing: Vec<serde_json::Value> = self
            .rest
            .get(
                PROFILES_PATH,
                &[
                    ("id", format!("eq.{}", account_id)),
                    ("select", "id".to_string()),
                ],
            )
            .await
            .map_err(map_err)?;
        if !existing.is_empty() {
            return Ok(());
        }

        let _: serde_json::Value = self
            .rest
            .post(
                CREATE_PROFILE_RPC,
                &[],
                &CreateProfile {
                    p_id: account_id,
                    p_email: email,
                    p_user_id: account_id,
                },
            )
            .await
            .map_err(map_err)?;
        tracing::info!(account_id = %account_id, "profile created");
        Ok(())
    }
}
