//! GOV.UK Pay payment provider adapter.
//!
//! Implements the `PaymentProvider` port for card payments through GOV.UK Pay:
//! - Hosted payment journeys
//! - Status checks and refund summaries
//! - Refund submission and status
//! - Webhook signature verification
//!
//! # Security
//!
//! - Webhook signatures use HMAC-SHA256 with constant-time comparison
//! - The API key and webhook secret are held as `secrecy::SecretString`

mod govpay_adapter;
mod types;
mod webhook;

/// Provider name used in errors and logs.
pub(crate) const PROVIDER: &str = "govpay";

pub use govpay_adapter::{GovPayAdapter, GovPayConfig};
pub use webhook::{hex_encode, GovPayWebhookEvent, GovPayWebhookVerifier, SIGNATURE_HEADER};
