//! Payment provider configuration (GOV.UK Pay, PayPal)

use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

use super::error::{check_url, ValidationError};

/// GOV.UK Pay credentials
#[derive(Debug, Clone, Deserialize)]
pub struct GovPayApiConfig {
    #[serde(default = "default_govpay_url")]
    pub api_url: String,

    pub api_key: SecretString,

    /// Webhook signing secret; the webhook endpoint is disabled without it
    #[serde(default)]
    pub webhook_secret: Option<SecretString>,
}

impl GovPayApiConfig {
    pub fn validate(&self, production: bool) -> Result<(), ValidationError> {
        if self.api_key.expose_secret().is_empty() {
            return Err(ValidationError::MissingRequired("GOVPAY_API_KEY"));
        }
        if let Some(secret) = &self.webhook_secret {
            if secret.expose_secret().is_empty() {
                return Err(ValidationError::MissingRequired("GOVPAY_WEBHOOK_SECRET"));
            }
        }
        check_url(&self.api_url, "GOVPAY_API_URL", production)
    }
}

/// PayPal REST credentials
#[derive(Debug, Clone, Deserialize)]
pub struct PayPalApiConfig {
    #[serde(default = "default_paypal_url")]
    pub api_url: String,

    pub client_id: String,

    pub client_secret: SecretString,

    #[serde(default = "default_currency")]
    pub currency: String,

    /// Shown on PayPal's checkout pages
    #[serde(default)]
    pub brand_name: Option<String>,
}

impl PayPalApiConfig {
    pub fn validate(&self, production: bool) -> Result<(), ValidationError> {
        if self.client_id.is_empty() {
            return Err(ValidationError::MissingRequired("PAYPAL_CLIENT_ID"));
        }
        if self.client_secret.expose_secret().is_empty() {
            return Err(ValidationError::MissingRequired("PAYPAL_CLIENT_SECRET"));
        }
        if self.currency.len() != 3 {
            return Err(ValidationError::MissingRequired("PAYPAL_CURRENCY"));
        }
        check_url(&self.api_url, "PAYPAL_API_URL", production)
    }
}

fn default_govpay_url() -> String {
    "https://publicapi.payments.service.gov.uk".to_string()
}

fn default_paypal_url() -> String {
    "https://api-m.paypal.com".to_string()
}

fn default_currency() -> String {
    "GBP".to_string()
}
