//! Test doubles for the provider port.

mod mock_payment_provider;

pub use mock_payment_provider::{MethodCall, MockPaymentProvider};
