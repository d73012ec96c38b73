//! Foundation module - Shared domain primitives.
//!
//! Contains value objects, identifiers, and error types
//! that form the vocabulary of the payments domain.

mod auth;
mod command;
mod errors;
mod events;
mod ids;
mod money;
mod state_machine;
mod timestamp;

pub use auth::{AuthorizedIdentity, IdentityClass};
pub use command::CommandMetadata;
pub use errors::{DomainError, ErrorCode, ValidationError};
pub use events::{
    DomainEvent, EventEnvelope, EventId, EventMetadata, SerializableDomainEvent,
};
pub use ids::{IdentityId, PaymentSessionId, RefundId};
pub use money::{Amount, MAX_WHOLE_DIGITS};
pub use state_machine::StateMachine;
pub use timestamp::Timestamp;
