//! Payment provider port.
//!
//! One contract, implemented once per provider (GOV.UK Pay, PayPal), so the
//! session manager and refund orchestrator never special-case a provider.
//!
//! # Design
//!
//! - **Normalized statuses**: adapters map provider vocabularies into
//!   `NormalizedStatus` / `RefundStatus` through exhaustive tables; unknown
//!   values are `UnrecognisedStatus` errors, never defaults
//! - **Errors stay at the boundary**: provider error payloads are reduced to
//!   a `ProviderError`, which converts into the application taxonomy
//! - **Bounded calls**: every call is subject to the adapter's HTTP timeout;
//!   a timeout is reported as a network error

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::foundation::{Amount, RefundId};
use crate::domain::payment::{
    NormalizedStatus, PaymentMethod, PaymentSession, PaymentSessionError, RefundRecord,
    RefundStatus,
};

#[async_trait]
pub trait PaymentProvider: Send + Sync {
    /// Payment method this provider serves.
    fn method(&self) -> PaymentMethod;

    /// Starts a hosted payment journey.
    ///
    /// The caller must persist the returned status URL and journey URL
    /// before handing the redirect to the payer.
    async fn initiate_payment(&self, session: &PaymentSession) -> Result<ExternalJourney, ProviderError>;

    /// Queries the authoritative payment status.
    async fn check_status(&self, session: &PaymentSession) -> Result<ProviderStatus, ProviderError>;

    /// How much of the session may still be refunded, per the provider.
    async fn refund_summary(&self, session: &PaymentSession) -> Result<Amount, ProviderError>;

    /// Submits a refund. The caller has already checked the amount against
    /// `refund_summary`.
    async fn create_refund(
        &self,
        session: &PaymentSession,
        amount: Amount,
    ) -> Result<RefundRecord, ProviderError>;

    /// Queries the status of a submitted refund.
    async fn refund_status(
        &self,
        session: &PaymentSession,
        refund_id: &RefundId,
    ) -> Result<RefundStatus, ProviderError>;

    /// Captures an approved payment. Providers without an approval step
    /// return `CaptureResult::not_required()`.
    async fn capture(&self, session: &PaymentSession) -> Result<CaptureResult, ProviderError>;
}

/// Result of starting a provider journey.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExternalJourney {
    /// Where the payer's browser goes next.
    pub redirect_url: String,

    /// Provider URL for later status checks.
    pub status_url: String,

    /// Provider's identifier for the payment / order.
    pub provider_payment_id: String,
}

/// Normalized payment status plus the provider's own reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderStatus {
    pub status: NormalizedStatus,
    pub provider_reference: Option<String>,
}

/// Outcome of a capture call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureResult {
    pub status: NormalizedStatus,
    pub capture_id: Option<String>,
}

impl CaptureResult {
    /// For providers that settle without a separate capture.
    pub fn not_required() -> Self {
        Self {
            status: NormalizedStatus::Success,
            capture_id: None,
        }
    }
}

/// Errors from payment provider operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderError {
    pub code: ProviderErrorCode,

    /// Which provider raised it ("govpay", "paypal").
    pub provider: &'static str,

    pub message: String,

    /// Provider's own error code or offending status value.
    pub provider_code: Option<String>,

    pub retryable: bool,
}

impl ProviderError {
    pub fn new(provider: &'static str, code: ProviderErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            provider,
            message: message.into(),
            provider_code: None,
            retryable: code.is_retryable(),
        }
    }

    pub fn with_provider_code(mut self, code: impl Into<String>) -> Self {
        self.provider_code = Some(code.into());
        self
    }

    /// Transport failure, including timeouts.
    pub fn network(provider: &'static str, message: impl Into<String>) -> Self {
        Self::new(provider, ProviderErrorCode::NetworkError, message)
    }

    /// Non-2xx response.
    pub fn rejected(provider: &'static str, status: u16, body: impl Into<String>) -> Self {
        Self::new(provider, ProviderErrorCode::Rejected, body).with_provider_code(status.to_string())
    }

    pub fn authentication(provider: &'static str, message: impl Into<String>) -> Self {
        Self::new(provider, ProviderErrorCode::AuthenticationError, message)
    }

    pub fn decode(provider: &'static str, message: impl Into<String>) -> Self {
        Self::new(provider, ProviderErrorCode::DecodeError, message)
    }

    pub fn unrecognised_status(provider: &'static str, status: impl Into<String>) -> Self {
        let status = status.into();
        Self::new(
            provider,
            ProviderErrorCode::UnrecognisedStatus,
            format!("unrecognised status '{}'", status),
        )
        .with_provider_code(status)
    }

    /// The session lacks provider handles the call needs.
    pub fn missing_reference(provider: &'static str, what: &str) -> Self {
        Self::new(
            provider,
            ProviderErrorCode::MissingReference,
            format!("session has no {}", what),
        )
    }

    pub fn invalid_webhook(provider: &'static str, message: impl Into<String>) -> Self {
        Self::new(provider, ProviderErrorCode::InvalidWebhook, message)
    }

    /// Amount cannot be expressed in the provider's units.
    pub fn invalid_amount(provider: &'static str, message: impl Into<String>) -> Self {
        Self::new(provider, ProviderErrorCode::InvalidAmount, message)
    }
}

impl std::fmt::Display for ProviderError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}: {}", self.provider, self.code, self.message)
    }
}

impl std::error::Error for ProviderError {}

impl From<ProviderError> for PaymentSessionError {
    fn from(err: ProviderError) -> Self {
        let context = format!("{}: {}", err.provider, err.message);
        match err.code {
            ProviderErrorCode::NetworkError => PaymentSessionError::UpstreamUnreachable(context),
            ProviderErrorCode::Rejected | ProviderErrorCode::AuthenticationError => {
                PaymentSessionError::UpstreamRejected(context)
            }
            ProviderErrorCode::DecodeError => PaymentSessionError::DecodeError(context),
            ProviderErrorCode::UnrecognisedStatus => {
                PaymentSessionError::UnrecognisedProviderStatus {
                    provider: err.provider.to_string(),
                    status: err.provider_code.unwrap_or_default(),
                }
            }
            ProviderErrorCode::MissingReference | ProviderErrorCode::InvalidAmount => {
                PaymentSessionError::InvalidData(context)
            }
            ProviderErrorCode::InvalidWebhook => PaymentSessionError::Unauthorized(context),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderErrorCode {
    /// Connection failure or timeout.
    NetworkError,

    /// Credentials refused.
    AuthenticationError,

    /// Provider answered with a non-success status.
    Rejected,

    /// Response body did not match the expected shape.
    DecodeError,

    /// Status value outside the mapping table.
    UnrecognisedStatus,

    /// Session is missing the provider handle needed for the call.
    MissingReference,

    /// Webhook signature or payload rejected.
    InvalidWebhook,

    /// Outgoing amount does not fit the provider's representation.
    InvalidAmount,
}

impl ProviderErrorCode {
    pub fn is_retryable(&self) -> bool {
        matches!(self, ProviderErrorCode::NetworkError | ProviderErrorCode::Rejected)
    }
}

impl std::fmt::Display for ProviderErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ProviderErrorCode::NetworkError => "network_error",
            ProviderErrorCode::AuthenticationError => "authentication_error",
            ProviderErrorCode::Rejected => "rejected",
            ProviderErrorCode::DecodeError => "decode_error",
            ProviderErrorCode::UnrecognisedStatus => "unrecognised_status",
            ProviderErrorCode::MissingReference => "missing_reference",
            ProviderErrorCode::InvalidWebhook => "invalid_webhook",
            ProviderErrorCode::InvalidAmount => "invalid_amount",
        };
        write!(f, "{}", s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[allow(dead_code)]
    fn _accepts_dyn_provider(_: &dyn PaymentProvider) {}

    #[test]
    fn network_errors_are_retryable_and_unreachable() {
        let err = ProviderError::network("govpay", "connection refused");
        assert!(err.retryable);

        let mapped: PaymentSessionError = err.into();
        assert_eq!(
            mapped,
            PaymentSessionError::UpstreamUnreachable("govpay: connection refused".into())
        );
    }

    #[test]
    fn rejection_keeps_http_status() {
        let err = ProviderError::rejected("paypal", 422, "UNPROCESSABLE_ENTITY");
        assert_eq!(err.provider_code.as_deref(), Some("422"));
        assert!(matches!(
            PaymentSessionError::from(err),
            PaymentSessionError::UpstreamRejected(_)
        ));
    }

    #[test]
    fn invalid_amount_is_invalid_data() {
        let err = ProviderError::invalid_amount("govpay", "too large");
        assert!(!err.retryable);
        assert!(matches!(
            PaymentSessionError::from(err),
            PaymentSessionError::InvalidData(_)
        ));
    }

    #[test]
    fn unrecognised_status_surfaces_the_value() {
        let err = ProviderError::unrecognised_status("paypal", "ON_HOLD");
        assert!(!err.retryable);
        assert_eq!(
            PaymentSessionError::from(err),
            PaymentSessionError::UnrecognisedProviderStatus {
                provider: "paypal".into(),
                status: "ON_HOLD".into()
            }
        );
    }

    #[test]
    fn decode_and_missing_reference_mapping() {
        assert!(matches!(
            PaymentSessionError::from(ProviderError::decode("govpay", "eof")),
            PaymentSessionError::DecodeError(_)
        ));
        assert!(matches!(
            PaymentSessionError::from(ProviderError::missing_reference("govpay", "status url")),
            PaymentSessionError::InvalidData(_)
        ));
    }

    #[test]
    fn not_required_capture_is_success() {
        let capture = CaptureResult::not_required();
        assert_eq!(capture.status, NormalizedStatus::Success);
        assert!(capture.capture_id.is_none());
    }

    #[test]
    fn display_includes_provider_and_code() {
        let err = ProviderError::authentication("paypal", "invalid_client");
        assert_eq!(err.to_string(), "paypal authentication_error: invalid_client");
    }
}
