//! Domain models shared by the client core and the confirmation service

pub mod auth_account;
pub mod member;

pub use auth_account::{AuthAccount, Session};
pub use member::{
    DEFAULT_PLACEHOLDER_DOMAIN, Member, MemberLinkUpdate, MemberNumber, MemberNumberError,
    is_placeholder_email,
};
