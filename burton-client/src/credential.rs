//! First-login credential check
//!
//! On first login the password is the member number itself. The comparison
//! is case-insensitive; the secret handed to the identity provider is always
//! the canonical (uppercase) number so every casing maps to one account
//! password.

use shared::models::MemberNumber;

use crate::error::{BootstrapError, CredentialFailure};

/// Check a first-login password. Pure, never touches the provider.
pub fn validate_first_login(number: &MemberNumber, password: &str) -> Result<(), BootstrapError> {
    if number.matches(password) {
        Ok(())
    } else {
        tracing::info!(member_number = %number, "first-login password does not match member number");
        Err(BootstrapError::invalid(CredentialFailure::FirstLoginPassword))
    }
}

/// Password used for the bootstrap account
pub fn bootstrap_secret(number: &MemberNumber) -> &str {
    number.as_str()
}
