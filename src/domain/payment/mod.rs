//! Payment module - sessions, costs, refunds and their lifecycles.

mod aggregate;
pub mod cost;
mod errors;
mod events;
mod expiry;
mod method;
mod patch;
mod provider_status;
mod refund;
mod status;

pub use aggregate::{
    CreatedBy, ExternalReference, NewPaymentSession, PaymentSession, SessionLinks, SESSION_KIND,
};
pub use cost::{CostItem, CostLinks};
pub use errors::PaymentSessionError;
pub use events::{PaymentProcessed, RefundCreated};
pub use expiry::{is_expired, ExpiryPolicy, DEFAULT_SESSION_TTL_MINUTES};
pub use method::PaymentMethod;
pub use patch::SessionPatch;
pub use provider_status::NormalizedStatus;
pub use refund::{RefundRecord, RefundStatus};
pub use status::PaymentStatus;

#[cfg(test)]
pub(crate) mod fixtures {
    pub use super::aggregate::fixtures::*;
    pub use super::cost::fixtures::*;
}
