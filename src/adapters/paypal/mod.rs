//! PayPal payment provider adapter.
//!
//! Implements the `PaymentProvider` port on the PayPal Orders v2 and
//! Payments v2 APIs:
//! - Order creation with a payer-approval redirect
//! - Capture once the payer has approved
//! - Refunds against the capture
//!
//! # Security
//!
//! - The client secret and cached access tokens are held as `secrecy::SecretString`

mod paypal_adapter;
mod types;

/// Provider name used in errors and logs.
pub(crate) const PROVIDER: &str = "paypal";

pub use paypal_adapter::{PayPalAdapter, PayPalConfig};
