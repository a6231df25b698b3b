//! Shared types for the Burton member services
//!
//! Member and account models, the canonical member number, and the unified
//! error vocabulary used by both the client core and the confirmation service.

pub mod error;
pub mod models;
pub mod util;

// Re-exports
pub use http;
pub use serde::{Deserialize, Serialize};

pub use error::{ApiResponse, AppError, ErrorCode};
pub use models::{AuthAccount, Member, MemberNumber, Session};
