//! Unified error codes for the Burton member services
//!
//! Error codes are organized by category:
//! - 0xxx: General errors
//! - 1xxx: Authentication errors
//! - 2xxx: Member directory errors
//! - 3xxx: Email confirmation errors
//! - 9xxx: System errors

use serde::{Deserialize, Serialize};
use std::fmt;

/// Unified error code enum
///
/// All error codes are represented as u16 values so the dashboard and the
/// services agree on a single numeric vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "u16", try_from = "u16")]
#[repr(u16)]
pub enum ErrorCode {
    // ==================== 0xxx: General ====================
    /// Operation completed successfully
    Success = 0,
    /// Unknown error
    Unknown = 1,
    /// Validation failed
    ValidationFailed = 2,
    /// Resource not found
    NotFound = 3,
    /// Resource already exists
    AlreadyExists = 4,
    /// Invalid request
    InvalidRequest = 5,
    /// Required field missing
    RequiredField = 7,

    // ==================== 1xxx: Auth ====================
    /// User is not authenticated
    NotAuthenticated = 1001,
    /// Invalid credentials (member number / email and password)
    InvalidCredentials = 1002,
    /// Session has expired
    SessionExpired = 1005,
    /// First-time login was already completed for this member
    AlreadyBootstrapped = 1010,
    /// Member must complete first-time login with the member number
    FirstLoginRequired = 1011,
    /// Identity provider rate limit hit
    RateLimited = 1012,

    // ==================== 2xxx: Member ====================
    /// No member with this member number or email
    MemberNotFound = 2001,
    /// Auth account created but member row could not be updated
    MemberLinkFailed = 2002,
    /// Member is already linked to a different auth account
    MemberAlreadyLinked = 2003,
    /// Member number is empty or malformed
    InvalidMemberNumber = 2004,

    // ==================== 3xxx: Confirmation ====================
    /// Email confirmation could not be completed
    EmailConfirmationFailed = 3001,
    /// No auth account found for the email to confirm
    ConfirmationUserNotFound = 3002,

    // ==================== 9xxx: System ====================
    /// Internal server error
    InternalError = 9001,
    /// Member directory (REST surface) error
    DirectoryError = 9002,
    /// Network error
    NetworkError = 9003,
    /// Operation timed out
    TimeoutError = 9004,
    /// Configuration error
    ConfigError = 9005,
    /// Identity provider returned an unexpected response
    IdentityProviderError = 9006,
}

impl ErrorCode {
    /// Get the numeric code value
    #[inline]
    pub const fn code(&self) -> u16 {
        *self as u16
    }

    /// Check if this is a success code
    #[inline]
    pub const fn is_success(&self) -> bool {
        matches!(self, ErrorCode::Success)
    }

    /// Get the developer-facing English message for this error code
    pub const fn message(&self) -> &'static str {
        match self {
            // General
            ErrorCode::Success => "Operation completed successfully",
            ErrorCode::Unknown => "An unknown error occurred",
            ErrorCode::ValidationFailed => "Validation failed",
            ErrorCode::NotFound => "Resource not found",
            ErrorCode::AlreadyExists => "Resource already exists",
            ErrorCode::InvalidRequest => "Invalid request",
            ErrorCode::RequiredField => "Required field is missing",

            // Auth
            ErrorCode::NotAuthenticated => "User is not authenticated",
            ErrorCode::InvalidCredentials => "Invalid member ID, email or password",
            ErrorCode::SessionExpired => "Session has expired",
            ErrorCode::AlreadyBootstrapped => "First-time login already completed",
            ErrorCode::FirstLoginRequired => "First-time login with member ID required",
            ErrorCode::RateLimited => "Too many requests to the identity provider",

            // Member
            ErrorCode::MemberNotFound => "Member not found",
            ErrorCode::MemberLinkFailed => "Failed to link auth account to member",
            ErrorCode::MemberAlreadyLinked => "Member is linked to another auth account",
            ErrorCode::InvalidMemberNumber => "Invalid member number",

            // Confirmation
            ErrorCode::EmailConfirmationFailed => "Email confirmation failed",
            ErrorCode::ConfirmationUserNotFound => "User not found",

            // System
            ErrorCode::InternalError => "Internal server error",
            ErrorCode::DirectoryError => "Member directory error",
            ErrorCode::NetworkError => "Network error",
            ErrorCode::TimeoutError => "Operation timed out",
            ErrorCode::ConfigError => "Configuration error",
            ErrorCode::IdentityProviderError => "Identity provider error",
        }
    }
}

impl From<ErrorCode> for u16 {
    #[inline]
    fn from(code: ErrorCode) -> Self {
        code.code()
    }
}

/// Error when converting from an invalid u16 to ErrorCode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidErrorCode(pub u16);

impl fmt::Display for InvalidErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid error code: {}", self.0)
    }
}

impl std::error::Error for InvalidErrorCode {}

impl TryFrom<u16> for ErrorCode {
    type Error = InvalidErrorCode;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        match value {
            // General
            0 => Ok(ErrorCode::Success),
            1 => Ok(ErrorCode::Unknown),
            2 => Ok(ErrorCode::ValidationFailed),
            3 => Ok(ErrorCode::NotFound),
            4 => Ok(ErrorCode::AlreadyExists),
            5 => Ok(ErrorCode::InvalidRequest),
            7 => Ok(ErrorCode::RequiredField),

            // Auth
            1001 => Ok(ErrorCode::NotAuthenticated),
            1002 => Ok(ErrorCode::InvalidCredentials),
            1005 => Ok(ErrorCode::SessionExpired),
            1010 => Ok(ErrorCode::AlreadyBootstrapped),
            1011 => Ok(ErrorCode::FirstLoginRequired),
            1012 => Ok(ErrorCode::RateLimited),

            // Member
            2001 => Ok(ErrorCode::MemberNotFound),
            2002 => Ok(ErrorCode::MemberLinkFailed),
            2003 => Ok(ErrorCode::MemberAlreadyLinked),
            2004 => Ok(ErrorCode::InvalidMemberNumber),

            // Confirmation
            3001 => Ok(ErrorCode::EmailConfirmationFailed),
            3002 => Ok(ErrorCode::ConfirmationUserNotFound),

            // System
            9001 => Ok(ErrorCode::InternalError),
            9002 => Ok(ErrorCode::DirectoryError),
            9003 => Ok(ErrorCode::NetworkError),
            9004 => Ok(ErrorCode::TimeoutError),
            9005 => Ok(ErrorCode::ConfigError),
            9006 => Ok(ErrorCode::IdentityProviderError),

            _ => Err(InvalidErrorCode(value)),
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}
