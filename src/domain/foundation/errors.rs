//! Error types for the domain layer.

use std::collections::HashMap;
use std::error::Error;
use std::fmt;
use thiserror::Error;

/// Errors that occur during value object construction.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Field '{field}' cannot be empty")]
    EmptyField { field: String },

    #[error("Field '{field}' has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },
}

impl ValidationError {
    /// Creates an empty field validation error.
    pub fn empty_field(field: impl Into<String>) -> Self {
        ValidationError::EmptyField { field: field.into() }
    }

    /// Creates an invalid format validation error.
    pub fn invalid_format(field: impl Into<String>, reason: impl Into<String>) -> Self {
        ValidationError::InvalidFormat {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Name of the offending field.
    pub fn field(&self) -> &str {
        match self {
            ValidationError::EmptyField { field } => field,
            ValidationError::InvalidFormat { field, .. } => field,
        }
    }
}

/// Error codes organized by category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    // Caller input
    InvalidRequest,
    InvalidData,

    // Configuration / security
    InvalidDomain,
    InvalidCost,
    MixedClassOfPayment,

    // Authorization and drift detection
    Unauthorized,
    Forbidden,

    // Absence and collisions
    NotFound,
    Conflict,

    // Provider contract violations
    MethodMismatch,
    UnsupportedProvider,
    UnrecognisedProviderStatus,

    // Upstream
    UpstreamUnreachable,
    UpstreamRejected,
    DecodeError,

    // Infrastructure
    DatabaseError,
    EventDeliveryFailed,
    InternalError,
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ErrorCode::InvalidRequest => "INVALID_REQUEST",
            ErrorCode::InvalidData => "INVALID_DATA",
            ErrorCode::InvalidDomain => "INVALID_DOMAIN",
            ErrorCode::InvalidCost => "INVALID_COST",
            ErrorCode::MixedClassOfPayment => "MIXED_CLASS_OF_PAYMENT",
            ErrorCode::Unauthorized => "UNAUTHORIZED",
            ErrorCode::Forbidden => "FORBIDDEN",
            ErrorCode::NotFound => "NOT_FOUND",
            ErrorCode::Conflict => "CONFLICT",
            ErrorCode::MethodMismatch => "METHOD_MISMATCH",
            ErrorCode::UnsupportedProvider => "UNSUPPORTED_PROVIDER",
            ErrorCode::UnrecognisedProviderStatus => "UNRECOGNISED_PROVIDER_STATUS",
            ErrorCode::UpstreamUnreachable => "UPSTREAM_UNREACHABLE",
            ErrorCode::UpstreamRejected => "UPSTREAM_REJECTED",
            ErrorCode::DecodeError => "DECODE_ERROR",
            ErrorCode::DatabaseError => "DATABASE_ERROR",
            ErrorCode::EventDeliveryFailed => "EVENT_DELIVERY_FAILED",
            ErrorCode::InternalError => "INTERNAL_ERROR",
        };
        write!(f, "{}", s)
    }
}

/// Standard domain error with code, message, and optional details.
///
/// Infrastructure ports (persistence, event publishing) report failures
/// with this type; application handlers translate it into their own
/// error enums.
#[derive(Debug, Clone)]
pub struct DomainError {
    pub code: ErrorCode,
    pub message: String,
    pub details: HashMap<String, String>,
}

impl DomainError {
    /// Creates a new domain error.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            details: HashMap::new(),
        }
    }

    /// Creates a database error.
    pub fn database(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::DatabaseError, message)
    }

    /// Creates a version-conflict error for an optimistic write.
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Conflict, message)
    }

    /// Adds a detail to the error.
    pub fn with_detail(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.details.insert(key.into(), value.into());
        self
    }
}

impl fmt::Display for DomainError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

impl Error for DomainError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_error_empty_field_displays_correctly() {
        let err = ValidationError::empty_field("redirect_uri");
        assert_eq!(format!("{}", err), "Field 'redirect_uri' cannot be empty");
        assert_eq!(err.field(), "redirect_uri");
    }

    #[test]
    fn validation_error_invalid_format_displays_correctly() {
        let err = ValidationError::invalid_format("amount", "expected two decimal places");
        assert_eq!(
            format!("{}", err),
            "Field 'amount' has invalid format: expected two decimal places"
        );
    }

    #[test]
    fn domain_error_displays_code_and_message() {
        let err = DomainError::new(ErrorCode::NotFound, "Payment session not found");
        assert_eq!(format!("{}", err), "[NOT_FOUND] Payment session not found");
    }

    #[test]
    fn domain_error_with_detail_adds_detail() {
        let err = DomainError::conflict("version mismatch")
            .with_detail("expected", "3")
            .with_detail("actual", "4");

        assert_eq!(err.code, ErrorCode::Conflict);
        assert_eq!(err.details.get("expected"), Some(&"3".to_string()));
        assert_eq!(err.details.get("actual"), Some(&"4".to_string()));
    }

    #[test]
    fn error_code_display_formats_correctly() {
        assert_eq!(format!("{}", ErrorCode::MixedClassOfPayment), "MIXED_CLASS_OF_PAYMENT");
        assert_eq!(format!("{}", ErrorCode::InternalError), "INTERNAL_ERROR");
    }
}
