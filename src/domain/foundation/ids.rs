//! Strongly-typed identifier value objects.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use super::ValidationError;

/// Unique identifier for a payment session.
///
/// Generated once at creation and never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PaymentSessionId(Uuid);

impl PaymentSessionId {
    /// Creates a new random PaymentSessionId.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates a PaymentSessionId from an existing UUID.
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Returns the inner UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for PaymentSessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for PaymentSessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for PaymentSessionId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

/// Identifier of a refund.
///
/// Provider-assigned for submitted refunds; locally generated for bulk
/// refund rows that have not reached the provider yet.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RefundId(String);

impl RefundId {
    /// Creates a RefundId, returning error if empty.
    pub fn new(id: impl Into<String>) -> Result<Self, ValidationError> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err(ValidationError::empty_field("refund_id"));
        }
        Ok(Self(id))
    }

    /// Generates a local placeholder identifier for a refund not yet submitted.
    pub fn generate() -> Self {
        Self(format!("local-{}", Uuid::new_v4().simple()))
    }

    /// Returns true if this id was generated locally rather than by a provider.
    pub fn is_local(&self) -> bool {
        self.0.starts_with("local-")
    }

    /// Returns the inner string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RefundId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of the caller, as asserted by the upstream gateway.
///
/// For interactive users this is the user id; for machine callers it is the API key id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IdentityId(String);

impl IdentityId {
    /// Creates a new IdentityId, returning error if empty.
    pub fn new(id: impl Into<String>) -> Result<Self, ValidationError> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err(ValidationError::empty_field("identity_id"));
        }
        Ok(Self(id))
    }

    /// Returns the inner string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for IdentityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payment_session_id_generates_unique_values() {
        let id1 = PaymentSessionId::new();
        let id2 = PaymentSessionId::new();
        assert_ne!(id1, id2);
    }

    #[test]
    fn payment_session_id_parses_from_valid_string() {
        let uuid_str = "550e8400-e29b-41d4-a716-446655440000";
        let id: PaymentSessionId = uuid_str.parse().unwrap();
        assert_eq!(id.to_string(), uuid_str);
    }

    #[test]
    fn payment_session_id_rejects_garbage() {
        assert!("not-a-uuid".parse::<PaymentSessionId>().is_err());
    }

    #[test]
    fn payment_session_id_serializes_to_json() {
        let uuid_str = "550e8400-e29b-41d4-a716-446655440000";
        let id: PaymentSessionId = uuid_str.parse().unwrap();
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, format!("\"{}\"", uuid_str));
    }

    #[test]
    fn refund_id_rejects_blank() {
        assert!(RefundId::new("").is_err());
        assert!(RefundId::new("   ").is_err());
        assert_eq!(RefundId::new("re_123").unwrap().as_str(), "re_123");
    }

    #[test]
    fn generated_refund_ids_are_local_and_unique() {
        let a = RefundId::generate();
        let b = RefundId::generate();
        assert!(a.is_local());
        assert_ne!(a, b);
        assert!(!RefundId::new("abc").unwrap().is_local());
    }

    #[test]
    fn identity_id_rejects_empty() {
        assert!(IdentityId::new("").is_err());
        assert_eq!(IdentityId::new("user-1").unwrap().to_string(), "user-1");
    }
}
