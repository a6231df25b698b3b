//! Client configuration

use std::path::PathBuf;
use std::time::Duration;

use shared::models::DEFAULT_PLACEHOLDER_DOMAIN;

use crate::error::{ClientError, ClientResult};

/// Name of the functions-gateway endpoint that force-confirms an account email
pub const DEFAULT_CONFIRM_FUNCTION: &str = "confirm-user-email";

/// Client configuration for the hosted backend
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Backend base URL (e.g., "https://xyz.supabase.co")
    pub base_url: String,

    /// Public (anon) API key sent as `apikey` on every request
    pub anon_key: String,

    /// Domain used to synthesize addresses for members without an email
    pub placeholder_domain: String,

    /// Per-request timeout in seconds
    pub timeout: u64,

    /// Functions-gateway name of the email confirmation capability
    pub confirm_function: String,

    /// Where the current session is persisted between runs
    pub session_path: Option<PathBuf>,

    /// Total attempts for flows that fail transiently (1 = no retry)
    pub transient_attempts: u32,

    /// Delay before the first transient retry, in milliseconds
    pub retry_base_delay_ms: u64,
}

impl ClientConfig {
    pub fn new(base_url: impl Into<String>, anon_key: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            anon_key: anon_key.into(),
            placeholder_domain: DEFAULT_PLACEHOLDER_DOMAIN.to_string(),
            timeout: 5,
            confirm_function: DEFAULT_CONFIRM_FUNCTION.to_string(),
            session_path: None,
            transient_attempts: 2,
            retry_base_delay_ms: 250,
        }
    }

    /// Load from environment variables
    ///
    /// | Variable | Default |
    /// |----------|---------|
    /// | SUPABASE_URL | (required) |
    /// | SUPABASE_ANON_KEY | (required) |
    /// | BURTON_PLACEHOLDER_DOMAIN | temp.pwaburton.org |
    /// | BURTON_REQUEST_TIMEOUT_SECS | 5 |
    /// | BURTON_SESSION_PATH | (none) |
    pub fn from_env() -> ClientResult<Self> {
        let base_url = require("SUPABASE_URL")?;
        let anon_key = require("SUPABASE_ANON_KEY")?;

        let mut config = Self::new(base_url, anon_key);
        if let Ok(domain) = std::env::var("BURTON_PLACEHOLDER_DOMAIN")
            && !domain.trim().is_empty()
        {
            config.placeholder_domain = domain.trim().to_lowercase();
        }
        if let Ok(raw) = std::env::var("BURTON_REQUEST_TIMEOUT_SECS") {
            config.timeout = raw.parse().map_err(|_| {
                ClientError::Config(format!("BURTON_REQUEST_TIMEOUT_SECS is not a number: {raw}"))
            })?;
        }
        config.session_path = std::env::var("BURTON_SESSION_PATH").ok().map(PathBuf::from);
        Ok(config)
    }

    pub fn with_placeholder_domain(mut self, domain: impl Into<String>) -> Self {
        self.placeholder_domain = domain.into();
        self
    }

    /// Set the request timeout
    pub fn with_timeout(mut self, seconds: u64) -> Self {
        self.timeout = seconds;
        self
    }

    pub fn with_confirm_function(mut self, name: impl Into<String>) -> Self {
        self.confirm_function = name.into();
        self
    }

    pub fn with_session_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.session_path = Some(path.into());
        self
    }

    /// Set transient retry behaviour
    pub fn with_transient_retry(mut self, attempts: u32, base_delay_ms: u64) -> Self {
        self.transient_attempts = attempts.max(1);
        self.retry_base_delay_ms = base_delay_ms;
        self
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.timeout)
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::new("http://localhost:54321", "")
    }
}

fn require(name: &str) -> ClientResult<String> {
    std::env::var(name)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| ClientError::Config(format!("{name} must be set")))
}
