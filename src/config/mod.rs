//! Application configuration module
//!
//! Type-safe configuration loaded from environment variables using the
//! `config` and `dotenvy` crates. Variables carry the `PAYMENT_ORCHESTRATOR`
//! prefix and nested values are separated by double underscores.
//!
//! # Example
//!
//! ```no_run
//! use payment_orchestrator::config::AppConfig;
//!
//! let config = AppConfig::load().expect("Failed to load configuration");
//! config.validate().expect("Invalid configuration");
//! ```

mod authorization;
mod database;
mod error;
mod providers;
mod redis;
mod server;
mod session;

pub use authorization::AuthorizationConfig;
pub use database::DatabaseConfig;
pub use error::{ConfigError, ValidationError};
pub use providers::{GovPayApiConfig, PayPalApiConfig};
pub use redis::RedisConfig;
pub use server::{Environment, ServerConfig};
pub use session::SessionConfig;

use serde::Deserialize;

/// Root application configuration
///
/// Load using [`AppConfig::load()`], then call [`AppConfig::validate()`]
/// before wiring anything from it.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Server configuration (host, port, environment)
    #[serde(default)]
    pub server: ServerConfig,

    /// Session store (PostgreSQL)
    pub database: DatabaseConfig,

    /// Event channel (Redis pub/sub)
    pub redis: RedisConfig,

    /// Session lifecycle and cost resolution
    pub session: SessionConfig,

    /// GOV.UK Pay; card payments are unavailable without it
    #[serde(default)]
    pub govpay: Option<GovPayApiConfig>,

    /// PayPal; PayPal payments are unavailable without it
    #[serde(default)]
    pub paypal: Option<PayPalApiConfig>,

    /// Gateway role names
    #[serde(default)]
    pub authorization: AuthorizationConfig,
}

impl AppConfig {
    /// Load configuration from environment variables
    ///
    /// 1. Loads `.env` file if present (for development)
    /// 2. Reads environment variables with `PAYMENT_ORCHESTRATOR` prefix
    /// 3. Uses `__` (double underscore) to separate nested values
    ///
    /// - `PAYMENT_ORCHESTRATOR__SERVER__PORT=8080` -> `server.port = 8080`
    /// - `PAYMENT_ORCHESTRATOR__GOVPAY__API_KEY=...` -> `govpay.api_key = ...`
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let config = config::Config::builder()
            .add_source(
                config::Environment::default()
                    .prefix("PAYMENT_ORCHESTRATOR")
                    .separator("__"),
            )
            .build()?
            .try_deserialize()?;

        Ok(config)
    }

    /// Validate all configuration values
    ///
    /// Production additionally requires HTTPS for every outbound and
    /// public URL.
    pub fn validate(&self) -> Result<(), ValidationError> {
        let production = self.is_production();
        self.server.validate()?;
        self.database.validate()?;
        self.redis.validate()?;
        self.session.validate(production)?;
        self.authorization.validate()?;

        if self.govpay.is_none() && self.paypal.is_none() {
            return Err(ValidationError::NoProviderConfigured);
        }
        if let Some(govpay) = &self.govpay {
            govpay.validate(production)?;
        }
        if let Some(paypal) = &self.paypal {
            paypal.validate(production)?;
        }
        Ok(())
    }

    /// Check if running in production environment
    pub fn is_production(&self) -> bool {
        self.server.is_production()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;
    use std::env;
    use std::sync::Mutex;

    // Mutex to ensure tests don't run in parallel (env vars are global)
    static ENV_MUTEX: Mutex<()> = Mutex::new(());

    const VARS: &[(&str, &str)] = &[
        ("PAYMENT_ORCHESTRATOR__DATABASE__URL", "postgresql://test@localhost/payments"),
        ("PAYMENT_ORCHESTRATOR__REDIS__URL", "redis://localhost:6379"),
        ("PAYMENT_ORCHESTRATOR__SESSION__API_BASE_URL", "https://payments.example.com"),
        ("PAYMENT_ORCHESTRATOR__SESSION__ALLOWED_COST_DOMAINS", "api.example.com"),
        ("PAYMENT_ORCHESTRATOR__GOVPAY__API_KEY", "api_test_xxx"),
    ];

    const OPTIONAL_VARS: &[&str] = &[
        "PAYMENT_ORCHESTRATOR__SERVER__PORT",
        "PAYMENT_ORCHESTRATOR__SERVER__ENVIRONMENT",
        "PAYMENT_ORCHESTRATOR__GOVPAY__WEBHOOK_SECRET",
        "PAYMENT_ORCHESTRATOR__PAYPAL__CLIENT_ID",
        "PAYMENT_ORCHESTRATOR__PAYPAL__CLIENT_SECRET",
    ];

    fn set_minimal_env() {
        for (key, value) in VARS {
            env::set_var(key, value);
        }
    }

    fn clear_env() {
        for (key, _) in VARS {
            env::remove_var(key);
        }
        for key in OPTIONAL_VARS {
            env::remove_var(key);
        }
    }

    #[test]
    fn test_load_from_environment() {
        let _guard = ENV_MUTEX.lock().unwrap();
        set_minimal_env();
        let result = AppConfig::load();
        clear_env();

        assert!(result.is_ok(), "Failed to load config: {:?}", result.err());
        let config = result.unwrap();
        assert_eq!(config.database.url, "postgresql://test@localhost/payments");
        assert_eq!(config.session.allowed_cost_domains_list(), vec!["api.example.com"]);
        assert_eq!(
            config.govpay.as_ref().unwrap().api_key.expose_secret(),
            "api_test_xxx"
        );
        assert!(config.paypal.is_none());
        assert_eq!(config.authorization.bulk_refund_role, "payment-bulk-refund");
    }

    #[test]
    fn test_validate_minimal_config() {
        let _guard = ENV_MUTEX.lock().unwrap();
        set_minimal_env();
        let result = AppConfig::load();
        clear_env();

        assert!(result.unwrap().validate().is_ok());
    }

    #[test]
    fn test_nested_provider_sections() {
        let _guard = ENV_MUTEX.lock().unwrap();
        set_minimal_env();
        env::set_var("PAYMENT_ORCHESTRATOR__GOVPAY__WEBHOOK_SECRET", "whsec");
        env::set_var("PAYMENT_ORCHESTRATOR__PAYPAL__CLIENT_ID", "client");
        env::set_var("PAYMENT_ORCHESTRATOR__PAYPAL__CLIENT_SECRET", "secret");
        let result = AppConfig::load();
        clear_env();

        let config = result.unwrap();
        assert!(config.govpay.unwrap().webhook_secret.is_some());
        let paypal = config.paypal.unwrap();
        assert_eq!(paypal.client_id, "client");
        assert_eq!(paypal.currency, "GBP");
    }

    #[test]
    fn test_server_defaults_and_overrides() {
        let _guard = ENV_MUTEX.lock().unwrap();
        set_minimal_env();
        env::set_var("PAYMENT_ORCHESTRATOR__SERVER__PORT", "3000");
        env::set_var("PAYMENT_ORCHESTRATOR__SERVER__ENVIRONMENT", "production");
        let result = AppConfig::load();
        clear_env();

        let config = result.unwrap();
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.port, 3000);
        assert!(config.is_production());
    }

    #[test]
    fn test_no_provider_fails_validation() {
        let _guard = ENV_MUTEX.lock().unwrap();
        set_minimal_env();
        env::remove_var("PAYMENT_ORCHESTRATOR__GOVPAY__API_KEY");
        let result = AppConfig::load();
        clear_env();

        let config = result.unwrap();
        assert_eq!(config.validate(), Err(ValidationError::NoProviderConfigured));
    }
}
