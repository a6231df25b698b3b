//! GoTrue-style auth REST implementation

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use shared::models::{AuthAccount, Session};

use super::{IdentityProvider, ProviderError, SignUpMetadata, SignedIn, SignedUp};
use crate::http::RestClient;
use crate::{ClientConfig, ClientError, ClientResult};

const TOKEN_PATH: &str = "auth/v1/token";
const SIGNUP_PATH: &str = "auth/v1/signup";
const LOGOUT_PATH: &str = "auth/v1/logout";

#[derive(Debug, Deserialize)]
struct UserResponse {
    id: String,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    email_confirmed_at: Option<String>,
    #[serde(default)]
    confirmed_at: Option<String>,
}

impl UserResponse {
    fn into_account(self, fallback_email: &str) -> AuthAccount {
        let confirmed = self.email_confirmed_at.is_some() || self.confirmed_at.is_some();
        AuthAccount {
            account_id: self.id,
            email: self.email.unwrap_or_else(|| fallback_email.to_string()),
            confirmed,
        }
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    expires_at: Option<i64>,
    #[serde(default)]
    expires_in: Option<i64>,
    user: UserResponse,
}

impl TokenResponse {
    fn into_signed_in(self, fallback_email: &str) -> SignedIn {
        let expires_at = self
            .expires_at
            .or_else(|| self.expires_in.map(|secs| shared::util::now_secs() + secs));
        let account = self.user.into_account(fallback_email);
        let session = Session {
            account_id: account.account_id.clone(),
            email: account.email.clone(),
            access_token: self.access_token,
            refresh_token: self.refresh_token,
            expires_at,
            member_number: None,
        };
        SignedIn { account, session }
    }
}

/// Sign-up answers with a session when auto-confirm is on, a bare user otherwise
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum SignUpResponse {
    Session(TokenResponse),
    User(UserResponse),
}

#[derive(Serialize)]
struct PasswordGrant<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Serialize)]
struct RefreshGrant<'a> {
    refresh_token: &'a str,
}

#[derive(Serialize)]
struct SignUpRequest<'a> {
    email: &'a str,
    password: &'a str,
    data: &'a SignUpMetadata,
}

/// Identity provider backed by the hosted auth service
#[derive(Debug, Clone)]
pub struct GoTrueProvider {
    rest: RestClient,
}

impl GoTrueProvider {
    pub fn new(config: &ClientConfig) -> ClientResult<Self> {
        Ok(Self {
            rest: RestClient::new(config)?,
        })
    }

    pub fn with_client(rest: RestClient) -> Self {
        Self { rest }
    }
}

#[async_trait]
impl IdentityProvider for GoTrueProvider {
    async fn sign_in(&self, email: &str, password: &str) -> Result<SignedIn, ProviderError> {
        let response: TokenResponse = self
            .rest
            .post(
                TOKEN_PATH,
                &[("grant_type", "password".to_string())],
                &PasswordGrant { email, password },
            )
            .await
            .map_err(classify)?;
        Ok(response.into_signed_in(email))
    }

    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        metadata: &SignUpMetadata,
    ) -> Result<SignedUp, ProviderError> {
        let response: SignUpResponse = self
            .rest
            .post(
                SIGNUP_PATH,
                &[],
                &SignUpRequest {
                    email,
                    password,
                    data: metadata,
                },
            )
            .await
            .map_err(classify)?;

        Ok(match response {
            SignUpResponse::Session(token) => {
                let signed_in = token.into_signed_in(email);
                SignedUp {
                    account: signed_in.account,
                    session: Some(signed_in.session),
                }
            }
            SignUpResponse::User(user) => SignedUp {
                account: user.into_account(email),
                session: None,
            },
        })
    }

    async fn refresh(&self, refresh_token: &str) -> Result<SignedIn, ProviderError> {
        let response: TokenResponse = self
            .rest
            .post(
                TOKEN_PATH,
                &[("grant_type", "refresh_token".to_string())],
                &RefreshGrant { refresh_token },
            )
            .await
            .map_err(classify)?;
        Ok(response.into_signed_in(""))
    }

    async fn sign_out(&self, access_token: &str) -> Result<(), ProviderError> {
        self.rest
            .post_as(LOGOUT_PATH, access_token, &serde_json::json!({}))
            .await
            .map_err(classify)
    }
}

fn classify(err: ClientError) -> ProviderError {
    match &err {
        ClientError::Http(e) if e.is_timeout() => ProviderError::Timeout,
        ClientError::Http(e) => match e.status() {
            Some(status) => classify_status(status.as_u16(), None),
            None => ProviderError::Network(e.to_string()),
        },
        ClientError::Status { status, .. } => {
            let code = err.body_code();
            let kind = classify_status(status.as_u16(), code.as_deref());
            if matches!(kind, ProviderError::Unexpected { .. }) {
                tracing::warn!(status = %status, code = ?code, "unclassified identity provider error");
            }
            kind
        }
        ClientError::InvalidResponse(_) | ClientError::Serialization(_) => {
            tracing::warn!(error = %err, "malformed identity provider response");
            ProviderError::Unexpected {
                status: 200,
                code: Some("invalid_response".to_string()),
            }
        }
        ClientError::Config(_) => ProviderError::Unexpected {
            status: 0,
            code: None,
        },
    }
}

/// Map an auth-service status and error code onto a [`ProviderError`] kind
pub fn classify_status(status: u16, code: Option<&str>) -> ProviderError {
    match code {
        Some("invalid_credentials" | "invalid_grant") => ProviderError::InvalidCredentials,
        Some("email_not_confirmed") => ProviderError::NotConfirmed,
        Some("user_not_found") => ProviderError::NotFound,
        Some("user_already_exists" | "email_exists") => ProviderError::AlreadyExists,
        Some("over_request_rate_limit" | "over_email_send_rate_limit") => {
            ProviderError::RateLimited
        }
        _ if status == 429 => ProviderError::RateLimited,
        _ if status == 504 => ProviderError::Timeout,
        _ => ProviderError::Unexpected {
            status,
            code: code.map(str::to_string),
        },
    }
}
