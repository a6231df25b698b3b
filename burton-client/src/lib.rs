//! Burton Client - member login core for the hosted backend
//!
//! Member-number first-time login (identity bootstrap), account linking,
//! email confirmation escalation and the regular login paths, written
//! against three ports with REST implementations for the hosted backend.

pub mod bootstrap;
pub mod config;
pub mod confirm;
pub mod credential;
pub mod directory;
pub mod error;
pub mod http;
pub mod identity;
pub mod login;
pub mod ports;
pub mod retry;
pub mod session;

pub use bootstrap::{AccountLinker, BootstrapOutcome, BootstrapState, IdentityBootstrap, PendingLink};
pub use config::ClientConfig;
pub use confirm::{ConfirmError, EmailConfirmer};
pub use directory::{DirectoryError, LinkOutcome, MemberDirectory};
pub use error::{BootstrapError, ClientError, ClientResult, CredentialFailure, LookupKey};
pub use identity::{IdentityProvider, ProviderError};
pub use login::{LoginOutcome, LoginService};
pub use ports::AuthPorts;
pub use retry::RetryPolicy;
pub use session::{SessionEvent, SessionHub, SessionState, SessionStorage};

// Re-export shared types for convenience
pub use shared::models::{AuthAccount, Member, MemberLinkUpdate, MemberNumber, Session};
