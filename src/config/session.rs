//! Payment session configuration

use serde::Deserialize;
use std::time::Duration;

use super::error::{check_url, ValidationError};

/// Session lifecycle and cost resolution settings
#[derive(Debug, Clone, Deserialize)]
pub struct SessionConfig {
    /// Minutes after creation before an unpaid session expires
    #[serde(default = "default_expiry_minutes")]
    pub expiry_minutes: i64,

    /// Hosts cost resources may be fetched from (comma-separated)
    #[serde(default)]
    pub allowed_cost_domains: String,

    /// Public base URL of this API; used for session self links and
    /// provider return URLs
    pub api_base_url: String,

    /// Bound on each outbound call (cost resources, providers), in seconds
    #[serde(default = "default_outbound_timeout")]
    pub outbound_timeout_secs: u64,
}

impl SessionConfig {
    pub fn allowed_cost_domains_list(&self) -> Vec<String> {
        self.allowed_cost_domains
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect()
    }

    pub fn outbound_timeout(&self) -> Duration {
        Duration::from_secs(self.outbound_timeout_secs)
    }

    pub fn validate(&self, production: bool) -> Result<(), ValidationError> {
        if self.expiry_minutes <= 0 {
            return Err(ValidationError::InvalidSessionExpiry);
        }
        if self.allowed_cost_domains_list().is_empty() {
            return Err(ValidationError::EmptyCostAllowList);
        }
        check_url(&self.api_base_url, "SESSION_API_BASE_URL", production)?;
        if self.outbound_timeout_secs == 0 || self.outbound_timeout_secs > 120 {
            return Err(ValidationError::InvalidTimeout);
        }
        Ok(())
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            expiry_minutes: default_expiry_minutes(),
            allowed_cost_domains: String::new(),
            api_base_url: String::new(),
            outbound_timeout_secs: default_outbound_timeout(),
        }
    }
}

fn default_expiry_minutes() -> i64 {
    90
}

fn default_outbound_timeout() -> u64 {
    10
}
