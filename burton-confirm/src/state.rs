//! Application state for burton-confirm

use std::sync::Arc;

use burton_client::RetryPolicy;

use crate::admin::{AdminUsers, GoTrueAdmin};
use crate::config::Config;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Auth admin API
    pub admin: Arc<dyn AdminUsers>,
    /// Backoff for the user lookup
    pub lookup_retry: RetryPolicy,
}

impl AppState {
    pub fn new(config: &Config) -> Result<Self, BoxError> {
        let admin = GoTrueAdmin::new(config)?;
        Ok(Self::with_admin(Arc::new(admin), config.lookup_retry()))
    }

    pub fn with_admin(admin: Arc<dyn AdminUsers>, lookup_retry: RetryPolicy) -> Self {
        Self {
            admin,
            lookup_retry,
        }
    }
}
