//! Partial session updates.

use serde::Deserialize;

use super::{PaymentMethod, PaymentStatus};

/// Fields a caller may change on a session. `None` leaves a field untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct SessionPatch {
    #[serde(default)]
    pub payment_method: Option<PaymentMethod>,
    #[serde(default)]
    pub status: Option<PaymentStatus>,
    #[serde(default)]
    pub reference: Option<String>,
}

impl SessionPatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_payment_method(mut self, method: PaymentMethod) -> Self {
        self.payment_method = Some(method);
        self
    }

    pub fn with_status(mut self, status: PaymentStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_reference(mut self, reference: impl Into<String>) -> Self {
        self.reference = Some(reference.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.payment_method.is_none() && self.status.is_none() && self.reference.is_none()
    }
}
