//! Confirmation service configuration

use std::time::Duration;

use burton_client::RetryPolicy;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Confirmation service configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Hosted backend base URL
    pub supabase_url: String,
    /// Service-role key for the auth admin API
    pub service_role_key: String,
    pub http_port: u16,
    /// Environment: development | staging | production
    pub environment: String,
    /// User lookup attempts before giving up (including the first)
    pub max_attempts: u32,
    /// First backoff delay, doubled per attempt
    pub base_delay_ms: u64,
    /// Per-request timeout against the admin API
    pub request_timeout_secs: u64,
}

impl Config {
    /// Require a secret env var: must be set and non-empty in non-development environments.
    fn require_secret(name: &str, environment: &str) -> Result<String, BoxError> {
        let val = match std::env::var(name) {
            Ok(v) => v,
            Err(_) => {
                if environment != "development" {
                    return Err(format!("{name} must be set in {environment} environment").into());
                }
                format!("dev-{name}-not-for-production")
            }
        };
        if val.is_empty() && environment != "development" {
            return Err(format!("{name} must not be empty in {environment} environment").into());
        }
        Ok(val)
    }

    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, BoxError> {
        let environment = std::env::var("ENVIRONMENT").unwrap_or_else(|_| "development".into());

        Ok(Self {
            supabase_url: std::env::var("SUPABASE_URL").map_err(|_| "SUPABASE_URL must be set")?,
            service_role_key: Self::require_secret("SUPABASE_SERVICE_ROLE_KEY", &environment)?,
            http_port: parse_env("HTTP_PORT", 8787),
            environment,
            max_attempts: parse_env("CONFIRM_MAX_ATTEMPTS", 3),
            base_delay_ms: parse_env("CONFIRM_BASE_DELAY_MS", 500),
            request_timeout_secs: parse_env("CONFIRM_REQUEST_TIMEOUT_SECS", 10),
        })
    }

    /// Backoff applied to the user lookup
    pub fn lookup_retry(&self) -> RetryPolicy {
        RetryPolicy::new(self.max_attempts, Duration::from_millis(self.base_delay_ms))
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

fn parse_env<T: std::str::FromStr>(name: &str, default: T) -> T {
    std::env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
