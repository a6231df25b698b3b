//! Member Model

use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use thiserror::Error;

/// Default domain for synthesized member addresses
pub const DEFAULT_PLACEHOLDER_DOMAIN: &str = "temp.pwaburton.org";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MemberNumberError {
    #[error("Member number must not be empty")]
    Empty,
    #[error("Member number contains invalid character '{0}'")]
    InvalidCharacter(char),
}

/// Canonical member number (trimmed, uppercased)
///
/// Every lookup, comparison, placeholder derivation and first-login password
/// check goes through this form.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct MemberNumber(String);

impl MemberNumber {
    pub fn parse(raw: &str) -> Result<Self, MemberNumberError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(MemberNumberError::Empty);
        }
        if let Some(c) = trimmed
            .chars()
            .find(|c| c.is_whitespace() || c.is_control() || *c == '@')
        {
            return Err(MemberNumberError::InvalidCharacter(c));
        }
        Ok(Self(trimmed.to_uppercase()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Case-insensitive comparison against raw user input
    pub fn matches(&self, raw: &str) -> bool {
        raw.trim().to_uppercase() == self.0
    }

    /// Synthesized address used when the member has no real email on file
    pub fn placeholder_email(&self, domain: &str) -> String {
        format!("{}@{}", self.0.to_lowercase(), domain)
    }
}

impl fmt::Display for MemberNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for MemberNumber {
    type Error = MemberNumberError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<MemberNumber> for String {
    fn from(value: MemberNumber) -> Self {
        value.0
    }
}

/// Whether `email` is an address synthesized on `domain`
pub fn is_placeholder_email(email: &str, domain: &str) -> bool {
    email
        .rsplit_once('@')
        .is_some_and(|(_, host)| host.eq_ignore_ascii_case(domain))
}

/// Member entity as stored in the `members` table
///
/// Only the columns the login flows touch are modeled.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Member {
    pub id: String,
    pub member_number: MemberNumber,
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    /// Weak reference to the identity-provider account
    #[serde(rename = "auth_user_id", default)]
    pub auth_account_id: Option<String>,
    /// NULL reads as false, so such a member takes the regular login
    #[serde(default, deserialize_with = "null_as_false")]
    pub first_time_login: bool,
    #[serde(default, deserialize_with = "null_as_false")]
    pub password_changed: bool,
    #[serde(default, deserialize_with = "null_as_false")]
    pub email_verified: bool,
    #[serde(default, deserialize_with = "null_as_false")]
    pub profile_completed: bool,
    #[serde(default, deserialize_with = "null_as_false")]
    pub registration_completed: bool,
}

/// Flag columns are nullable in the members table
fn null_as_false<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<bool>::deserialize(deserializer)?.unwrap_or_default())
}

impl Member {
    /// Email on file that is a real mailbox (not empty, not a placeholder)
    pub fn real_email(&self, placeholder_domain: &str) -> Option<&str> {
        self.email
            .as_deref()
            .map(str::trim)
            .filter(|e| !e.is_empty() && !is_placeholder_email(e, placeholder_domain))
    }

    /// Address used against the identity provider
    pub fn login_address(&self, placeholder_domain: &str) -> String {
        match self.real_email(placeholder_domain) {
            Some(email) => email.to_lowercase(),
            None => self.member_number.placeholder_email(placeholder_domain),
        }
    }

    pub fn is_linked(&self) -> bool {
        self.auth_account_id.as_deref().is_some_and(|id| !id.is_empty())
    }
}

/// Fields written onto the member row once an auth account is linked
///
/// The write is conditional on `auth_user_id` being null or already equal to
/// `auth_account_id`, so replaying it is harmless and a different account is
/// never overwritten.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberLinkUpdate {
    #[serde(rename = "auth_user_id")]
    pub auth_account_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_time_login: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password_changed: Option<bool>,
    /// Only set when the member had no real email on file
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

impl MemberLinkUpdate {
    /// Update written when first-time login completes
    pub fn bootstrap(auth_account_id: impl Into<String>, email: Option<String>) -> Self {
        Self {
            auth_account_id: auth_account_id.into(),
            first_time_login: Some(false),
            password_changed: Some(false),
            email,
        }
    }

    /// Update written when a regular login finds the account id missing
    pub fn backfill(auth_account_id: impl Into<String>) -> Self {
        Self {
            auth_account_id: auth_account_id.into(),
            first_time_login: None,
            password_changed: None,
            email: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn member(email: Option<&str>) -> Member {
        Member {
            id: "a1".to_string(),
            member_number: MemberNumber::parse("m1001").unwrap(),
            full_name: None,
            email: email.map(str::to_string),
            auth_account_id: None,
            first_time_login: true,
            password_changed: false,
            email_verified: false,
            profile_completed: false,
            registration_completed: false,
        }
    }

    #[test]
    fn test_member_number_canonical_form() {
        let a = MemberNumber::parse("abc123").unwrap();
        let b = MemberNumber::parse("ABC123 ").unwrap();
        let c = MemberNumber::parse(" abc123").unwrap();
        assert_eq!(a, b);
        assert_eq!(b, c);
        assert_eq!(a.as_str(), "ABC123");
    }

    #[test]
    fn test_member_number_rejects_bad_input() {
        assert_eq!(MemberNumber::parse("   "), Err(MemberNumberError::Empty));
        assert_eq!(
            MemberNumber::parse("M 1001"),
            Err(MemberNumberError::InvalidCharacter(' '))
        );
        assert_eq!(
            MemberNumber::parse("m1@x"),
            Err(MemberNumberError::InvalidCharacter('@'))
        );
    }

    #[test]
    fn test_matches_is_case_insensitive() {
        let n = MemberNumber::parse("M1001").unwrap();
        assert!(n.matches("m1001"));
        assert!(n.matches(" M1001 "));
        assert!(!n.matches("M1002"));
    }

    #[test]
    fn test_placeholder_email() {
        let n = MemberNumber::parse("M1001").unwrap();
        assert_eq!(
            n.placeholder_email(DEFAULT_PLACEHOLDER_DOMAIN),
            "m1001@temp.pwaburton.org"
        );
        assert!(is_placeholder_email(
            "m1001@TEMP.pwaburton.org",
            DEFAULT_PLACEHOLDER_DOMAIN
        ));
        assert!(!is_placeholder_email("jo@example.com", DEFAULT_PLACEHOLDER_DOMAIN));
    }

    #[test]
    fn test_login_address_prefers_real_email() {
        let m = member(Some("Jo@Example.com"));
        assert_eq!(m.real_email(DEFAULT_PLACEHOLDER_DOMAIN), Some("Jo@Example.com"));
        assert_eq!(m.login_address(DEFAULT_PLACEHOLDER_DOMAIN), "jo@example.com");

        let m = member(Some("m1001@temp.pwaburton.org"));
        assert_eq!(m.real_email(DEFAULT_PLACEHOLDER_DOMAIN), None);

        let m = member(Some("  "));
        assert_eq!(
            m.login_address(DEFAULT_PLACEHOLDER_DOMAIN),
            "m1001@temp.pwaburton.org"
        );
    }

    #[test]
    fn test_member_deserialize_from_row() {
        let json = r#"{
            "id": "6f1c",
            "member_number": "m1001",
            "email": null,
            "auth_user_id": null,
            "first_time_login": true
        }"#;
        let m: Member = serde_json::from_str(json).unwrap();
        assert_eq!(m.member_number.as_str(), "M1001");
        assert!(m.first_time_login);
        assert!(!m.password_changed);
        assert!(!m.is_linked());
    }

    #[test]
    fn test_member_row_with_null_flags() {
        let json = r#"{
            "id": "6f1c",
            "member_number": "M1002",
            "full_name": null,
            "email": "jo@example.com",
            "auth_user_id": "acct-1",
            "first_time_login": null,
            "password_changed": null,
            "email_verified": null,
            "profile_completed": null,
            "registration_completed": null
        }"#;
        let m: Member = serde_json::from_str(json).unwrap();
        assert!(!m.first_time_login);
        assert!(!m.password_changed);
        assert!(!m.email_verified);
        assert!(!m.profile_completed);
        assert!(!m.registration_completed);
        assert!(m.is_linked());
    }

    #[test]
    fn test_link_update_serialization() {
        let json = serde_json::to_value(MemberLinkUpdate::bootstrap("u-1", None)).unwrap();
        assert_eq!(json["auth_user_id"], "u-1");
        assert_eq!(json["first_time_login"], false);
        assert_eq!(json["password_changed"], false);
        assert!(json.get("email").is_none());

        let json = serde_json::to_value(MemberLinkUpdate::backfill("u-2")).unwrap();
        assert_eq!(json, serde_json::json!({ "auth_user_id": "u-2" }));
    }
}
