//! Client error types
//!
//! [`ClientError`] is the transport-level failure of a single request.
//! [`BootstrapError`] is what the login flows hand back to a UI: every
//! variant carries exactly one user-facing message and one [`ErrorCode`].

use reqwest::StatusCode;
use serde::Deserialize;
use shared::error::{AppError, ErrorCode};
use thiserror::Error;

use crate::bootstrap::PendingLink;
use crate::confirm::ConfirmError;
use crate::identity::ProviderError;

/// Client error type
#[derive(Debug, Error)]
pub enum ClientError {
    /// HTTP request failed
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Non-success status with the raw body
    #[error("Unexpected status {status}: {body}")]
    Status { status: StatusCode, body: String },

    /// Invalid response format
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Configuration missing or malformed
    #[error("Configuration error: {0}")]
    Config(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type for client operations
pub type ClientResult<T> = Result<T, ClientError>;

#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    error_code: Option<String>,
    #[serde(default)]
    code: Option<serde_json::Value>,
    #[serde(default)]
    error: Option<String>,
}

impl ClientError {
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Self::Status { status, .. } => Some(*status),
            Self::Http(e) => e.status(),
            _ => None,
        }
    }

    /// Machine-readable error code from the response body, if any
    ///
    /// Checks `error_code`, then a string `code`, then `error`.
    pub fn body_code(&self) -> Option<String> {
        let Self::Status { body, .. } = self else {
            return None;
        };
        let parsed: ErrorBody = serde_json::from_str(body).unwrap_or_default();
        parsed
            .error_code
            .or_else(|| match parsed.code {
                Some(serde_json::Value::String(s)) => Some(s),
                _ => None,
            })
            .or(parsed.error)
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Http(e) if e.is_timeout())
    }

    /// Worth retrying: timeouts, connection failures, 429 and 5xx
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Http(e) => e.is_timeout() || e.is_connect() || e.is_request(),
            Self::Status { status, .. } => {
                *status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
            }
            _ => false,
        }
    }
}

/// Which key a lookup was made with
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LookupKey {
    MemberNumber(String),
    Email(String),
}

/// Why a credential was refused
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CredentialFailure {
    /// First-login password is not the member number
    FirstLoginPassword,
    /// Provider rejected the member-id login
    Rejected,
    /// Provider rejected the email login
    EmailRejected,
    /// Email login attempted before first-time login
    FirstLoginRequired,
    /// Provider refused for a reason outside the classified kinds
    ProviderRefused { status: u16, code: Option<String> },
}

/// Transient failure flavour
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransientKind {
    Timeout,
    Network,
    RateLimited,
    Unavailable,
}

/// Failure of a login flow, one variant per user-visible outcome
#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error("no member found for {key:?}")]
    NotFound { key: LookupKey },

    #[error("credential refused: {reason:?}")]
    InvalidCredential { reason: CredentialFailure },

    #[error("member {member_number} already completed first-time login")]
    AlreadyBootstrapped { member_number: String },

    #[error("email confirmation failed for {email}: {source}")]
    Confirmation {
        email: String,
        #[source]
        source: ConfirmError,
    },

    #[error("account {} could not be linked to member {}: {reason}", .pending.account_id(), .pending.member_id)]
    LinkUpdate { pending: PendingLink, reason: String },

    /// The directory answered, but not with a usable member
    #[error("member directory failure: {reason}")]
    Directory { reason: String },

    #[error("transient failure ({kind:?}): {detail}")]
    Transient { kind: TransientKind, detail: String },
}

impl BootstrapError {
    pub fn invalid(reason: CredentialFailure) -> Self {
        Self::InvalidCredential { reason }
    }

    pub fn transient(kind: TransientKind, detail: impl Into<String>) -> Self {
        Self::Transient {
            kind,
            detail: detail.into(),
        }
    }

    pub fn timed_out(operation: &str) -> Self {
        Self::transient(TransientKind::Timeout, format!("{operation} timed out"))
    }

    /// Fallback mapping for provider errors the caller has no special case for
    pub fn from_provider(err: ProviderError) -> Self {
        match err {
            ProviderError::Timeout => Self::transient(TransientKind::Timeout, err.to_string()),
            ProviderError::RateLimited => {
                Self::transient(TransientKind::RateLimited, err.to_string())
            }
            ProviderError::Network(_) => Self::transient(TransientKind::Network, err.to_string()),
            ProviderError::Unexpected { status, .. } if status >= 500 => {
                Self::transient(TransientKind::Unavailable, err.to_string())
            }
            ProviderError::Unexpected { status, code } => {
                Self::invalid(CredentialFailure::ProviderRefused { status, code })
            }
            ProviderError::InvalidCredentials
            | ProviderError::NotFound
            | ProviderError::AlreadyExists
            | ProviderError::NotConfirmed => Self::invalid(CredentialFailure::Rejected),
        }
    }

    /// The single message shown to the member
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::NotFound {
                key: LookupKey::MemberNumber(_),
            } => "Invalid Member ID. Please check your Member ID and try again.",
            Self::NotFound {
                key: LookupKey::Email(_),
            } => "No account found with this email address.",
            Self::InvalidCredential { reason } => match reason {
                CredentialFailure::FirstLoginPassword => {
                    "Invalid password. For your first login, use your Member ID as the password."
                }
                CredentialFailure::Rejected => {
                    "Invalid credentials. Please check your Member ID and password."
                }
                CredentialFailure::EmailRejected => "Invalid email or password.",
                CredentialFailure::FirstLoginRequired => {
                    "Please use the Member ID tab for your first login."
                }
                CredentialFailure::ProviderRefused { .. } => {
                    "Your account could not be signed in. Please contact support."
                }
            },
            Self::AlreadyBootstrapped { .. } => {
                "This member has already completed first-time login. Please use the regular login."
            }
            Self::Confirmation { .. } => {
                "We could not confirm your account email. Please contact support."
            }
            Self::LinkUpdate { .. } => {
                "Your account was created but could not be linked to your membership. Please try again or contact support."
            }
            Self::Directory { .. } => {
                "We could not read your membership record. Please contact support."
            }
            Self::Transient {
                kind: TransientKind::RateLimited,
                ..
            } => "Too many attempts. Please wait a few minutes before trying again.",
            Self::Transient { .. } => "The service is temporarily unavailable. Please try again.",
        }
    }

    pub fn error_code(&self) -> ErrorCode {
        match self {
            Self::NotFound { .. } => ErrorCode::MemberNotFound,
            Self::InvalidCredential {
                reason: CredentialFailure::FirstLoginRequired,
            } => ErrorCode::FirstLoginRequired,
            Self::InvalidCredential { .. } => ErrorCode::InvalidCredentials,
            Self::AlreadyBootstrapped { .. } => ErrorCode::AlreadyBootstrapped,
            Self::Confirmation { .. } => ErrorCode::EmailConfirmationFailed,
            Self::LinkUpdate { .. } => ErrorCode::MemberLinkFailed,
            Self::Directory { .. } => ErrorCode::DirectoryError,
            Self::Transient { kind, .. } => match kind {
                TransientKind::Timeout => ErrorCode::TimeoutError,
                TransientKind::RateLimited => ErrorCode::RateLimited,
                TransientKind::Network | TransientKind::Unavailable => ErrorCode::NetworkError,
            },
        }
    }

    /// Only transient failures may be retried automatically
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Transient { .. })
    }

    /// Failures an operator has to look at
    pub fn needs_support_followup(&self) -> bool {
        matches!(
            self,
            Self::Confirmation { .. } | Self::LinkUpdate { .. } | Self::Directory { .. }
        )
    }
}

impl From<BootstrapError> for AppError {
    fn from(err: BootstrapError) -> Self {
        let app = AppError::with_message(err.error_code(), err.user_message());
        match &err {
            BootstrapError::LinkUpdate { pending, .. } => {
                app.with_detail("account_id", pending.account_id())
            }
            BootstrapError::AlreadyBootstrapped { member_number } => {
                app.with_detail("member_number", member_number.as_str())
            }
            _ => app,
        }
    }
}
