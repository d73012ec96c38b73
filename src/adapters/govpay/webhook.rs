//! GOV.UK Pay webhook verification.
//!
//! GOV.UK Pay signs the raw body with HMAC-SHA256 and sends the hex digest
//! in the `Pay-Signature` header.

use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use sha2::Sha256;
use subtle::ConstantTimeEq;

use crate::ports::ProviderError;

use super::types::normalize_payment_status;
use super::PROVIDER;
use crate::domain::payment::NormalizedStatus;

type HmacSha256 = Hmac<Sha256>;

/// Header carrying the signature.
pub const SIGNATURE_HEADER: &str = "Pay-Signature";

/// Parsed webhook notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GovPayWebhookEvent {
    pub event_type: String,
    /// GOV.UK Pay payment id.
    pub payment_id: String,
    /// Our reference, which is the payment session id.
    pub reference: Option<String>,
    pub status: NormalizedStatus,
}

#[derive(Debug, Deserialize)]
struct WebhookBody {
    event_type: String,
    resource_id: String,
    #[serde(default)]
    resource: Option<WebhookResource>,
}

#[derive(Debug, Deserialize)]
struct WebhookResource {
    #[serde(default)]
    reference: Option<String>,
    state: WebhookState,
}

#[derive(Debug, Deserialize)]
struct WebhookState {
    status: String,
}

/// Verifies and parses GOV.UK Pay webhooks.
#[derive(Clone)]
pub struct GovPayWebhookVerifier {
    secret: SecretString,
}

impl GovPayWebhookVerifier {
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: SecretString::new(secret.into()),
        }
    }

    pub fn from_secret(secret: SecretString) -> Self {
        Self { secret }
    }

    /// Checks the signature in constant time, then decodes the body.
    pub fn verify(&self, payload: &[u8], signature: &str) -> Result<GovPayWebhookEvent, ProviderError> {
        let provided = hex_decode(signature.trim())
            .ok_or_else(|| ProviderError::invalid_webhook(PROVIDER, "signature is not hex"))?;

        let mut mac = HmacSha256::new_from_slice(self.secret.expose_secret().as_bytes())
            .map_err(|e| ProviderError::invalid_webhook(PROVIDER, e.to_string()))?;
        mac.update(payload);
        let expected = mac.finalize().into_bytes();

        if expected.as_slice().ct_eq(&provided).unwrap_u8() != 1 {
            tracing::warn!("Invalid GOV.UK Pay webhook signature");
            return Err(ProviderError::invalid_webhook(PROVIDER, "Invalid signature"));
        }

        let body: WebhookBody = serde_json::from_slice(payload).map_err(|e| {
            tracing::warn!(error = %e, "Failed to parse webhook payload");
            ProviderError::invalid_webhook(PROVIDER, format!("Invalid JSON: {}", e))
        })?;
        let resource = body
            .resource
            .ok_or_else(|| ProviderError::invalid_webhook(PROVIDER, "webhook has no resource"))?;

        Ok(GovPayWebhookEvent {
            event_type: body.event_type,
            payment_id: body.resource_id,
            reference: resource.reference,
            status: normalize_payment_status(&resource.state.status)?,
        })
    }
}

/// Lowercase hex of a byte slice.
pub fn hex_encode(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

fn hex_decode(s: &str) -> Option<Vec<u8>> {
    if s.len() % 2 != 0 {
        return None;
    }
    (0..s.len())
        .step_by(2)
        .map(|i| s.get(i..i + 2).and_then(|pair| u8::from_str_radix(pair, 16).ok()))
        .collect()
}
