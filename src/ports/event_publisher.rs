//! EventPublisher port - Interface for publishing domain events.
//!
//! The application emits `payment.processed` and `payment.refund_created`
//! through this port without knowing the transport (Redis, in-memory).

use async_trait::async_trait;

use crate::domain::foundation::{DomainError, EventEnvelope};

/// Port for publishing domain events.
///
/// Implementations must:
/// - Deliver at-least-once (consumers dedupe on `event_id`)
/// - Report send failures synchronously, so callers can surface them
///
/// ```ignore
/// publisher.publish(PaymentProcessed::settled(id, status).to_envelope()).await?;
/// ```
#[async_trait]
pub trait EventPublisher: Send + Sync {
    /// Publish a single event.
    async fn publish(&self, event: EventEnvelope) -> Result<(), DomainError>;

    /// Publish several events in order, stopping at the first failure.
    async fn publish_all(&self, events: Vec<EventEnvelope>) -> Result<(), DomainError> {
        for event in events {
            self.publish(event).await?;
        }
        Ok(())
    }
}
