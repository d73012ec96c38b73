//! Payment-specific error types.
//!
//! One variant per failure kind callers must distinguish. Upstream and
//! infrastructure variants keep the context they were raised with (which
//! call, which provider) so logs can say where things went wrong; the HTTP
//! layer decides how much of that to show.

use thiserror::Error;

use crate::domain::foundation::{DomainError, ErrorCode, ValidationError};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PaymentSessionError {
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Invalid data: {0}")]
    InvalidData(String),

    #[error("Resource host is not allow-listed: {0}")]
    InvalidDomain(String),

    #[error("Invalid cost: {0}")]
    InvalidCost(String),

    #[error("Costs span more than one class of payment")]
    MixedClassOfPayment,

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Payment method mismatch: session uses {stored}, callback came from {channel}")]
    MethodMismatch { stored: String, channel: String },

    #[error("No provider registered for payment method '{0}'")]
    UnsupportedProviderOnJourney(String),

    #[error("{provider} reported unrecognised status '{status}'")]
    UnrecognisedProviderStatus { provider: String, status: String },

    #[error("Upstream unreachable: {0}")]
    UpstreamUnreachable(String),

    #[error("Upstream rejected the request: {0}")]
    UpstreamRejected(String),

    #[error("Could not decode upstream response: {0}")]
    DecodeError(String),

    #[error("Refund of {requested} exceeds the {available} available")]
    InsufficientRefundable { requested: String, available: String },

    #[error("Persistence failure: {0}")]
    Persistence(String),

    #[error("Event delivery failed: {0}")]
    EventDelivery(String),
}

impl PaymentSessionError {
    pub fn invalid_request(message: impl Into<String>) -> Self {
        PaymentSessionError::InvalidRequest(message.into())
    }
    pub fn invalid_data(message: impl Into<String>) -> Self {
        PaymentSessionError::InvalidData(message.into())
    }
    pub fn forbidden(message: impl Into<String>) -> Self {
        PaymentSessionError::Forbidden(message.into())
    }
    pub fn unauthorized(message: impl Into<String>) -> Self {
        PaymentSessionError::Unauthorized(message.into())
    }
    pub fn not_found(message: impl Into<String>) -> Self {
        PaymentSessionError::NotFound(message.into())
    }
    pub fn conflict(message: impl Into<String>) -> Self {
        PaymentSessionError::Conflict(message.into())
    }
    pub fn event_delivery(err: impl std::fmt::Display) -> Self {
        PaymentSessionError::EventDelivery(err.to_string())
    }

    pub fn code(&self) -> ErrorCode {
        match self {
            PaymentSessionError::InvalidRequest(_) => ErrorCode::InvalidRequest,
            PaymentSessionError::InvalidData(_) => ErrorCode::InvalidData,
            PaymentSessionError::InsufficientRefundable { .. } => ErrorCode::InvalidData,
            PaymentSessionError::InvalidDomain(_) => ErrorCode::InvalidDomain,
            PaymentSessionError::InvalidCost(_) => ErrorCode::InvalidCost,
            PaymentSessionError::MixedClassOfPayment => ErrorCode::MixedClassOfPayment,
            PaymentSessionError::Unauthorized(_) => ErrorCode::Unauthorized,
            PaymentSessionError::Forbidden(_) => ErrorCode::Forbidden,
            PaymentSessionError::NotFound(_) => ErrorCode::NotFound,
            PaymentSessionError::Conflict(_) => ErrorCode::Conflict,
            PaymentSessionError::MethodMismatch { .. } => ErrorCode::MethodMismatch,
            PaymentSessionError::UnsupportedProviderOnJourney(_) => ErrorCode::UnsupportedProvider,
            PaymentSessionError::UnrecognisedProviderStatus { .. } => {
                ErrorCode::UnrecognisedProviderStatus
            }
            PaymentSessionError::UpstreamUnreachable(_) => ErrorCode::UpstreamUnreachable,
            PaymentSessionError::UpstreamRejected(_) => ErrorCode::UpstreamRejected,
            PaymentSessionError::DecodeError(_) => ErrorCode::DecodeError,
            PaymentSessionError::Persistence(_) => ErrorCode::DatabaseError,
            PaymentSessionError::EventDelivery(_) => ErrorCode::EventDeliveryFailed,
        }
    }

    /// Transient failures a caller may retry with backoff.
    ///
    /// `EventDelivery` is included: the state change already persisted and
    /// only the notification is outstanding.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            PaymentSessionError::UpstreamUnreachable(_)
                | PaymentSessionError::UpstreamRejected(_)
                | PaymentSessionError::EventDelivery(_)
        )
    }

    /// Contract violations that must be logged loudly.
    pub fn is_contract_violation(&self) -> bool {
        matches!(
            self,
            PaymentSessionError::UnrecognisedProviderStatus { .. }
                | PaymentSessionError::MethodMismatch { .. }
        )
    }
}

impl From<DomainError> for PaymentSessionError {
    fn from(err: DomainError) -> Self {
        match err.code {
            ErrorCode::NotFound => PaymentSessionError::NotFound(err.message),
            ErrorCode::Conflict => PaymentSessionError::Conflict(err.message),
            ErrorCode::EventDeliveryFailed => PaymentSessionError::EventDelivery(err.message),
            _ => PaymentSessionError::Persistence(err.to_string()),
        }
    }
}

impl From<ValidationError> for PaymentSessionError {
    fn from(err: ValidationError) -> Self {
        PaymentSessionError::InvalidData(err.to_string())
    }
}
