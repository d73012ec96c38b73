//! Redis event publisher for production deployments.
//!
//! Each envelope is serialized to JSON and sent with `PUBLISH` on
//! `{prefix}.{event_type}`, e.g. `payments.payment.processed.v1`.

use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use redis::AsyncCommands;
use std::time::Duration;

use crate::domain::foundation::{DomainError, ErrorCode, EventEnvelope};
use crate::ports::EventPublisher;

/// Publishes envelopes to Redis pub/sub channels.
#[derive(Clone)]
pub struct RedisEventPublisher {
    conn: MultiplexedConnection,
    channel_prefix: String,
    timeout: Duration,
}

impl RedisEventPublisher {
    pub fn new(conn: MultiplexedConnection, channel_prefix: impl Into<String>) -> Self {
        Self {
            conn,
            channel_prefix: channel_prefix.into(),
            timeout: Duration::from_secs(5),
        }
    }

    /// Bound on a single publish round trip.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn channel_for(&self, event_type: &str) -> String {
        channel_name(&self.channel_prefix, event_type)
    }
}

fn channel_name(prefix: &str, event_type: &str) -> String {
    if prefix.is_empty() {
        event_type.to_string()
    } else {
        format!("{}.{}", prefix, event_type)
    }
}

fn delivery_error(message: impl Into<String>) -> DomainError {
    DomainError::new(ErrorCode::EventDeliveryFailed, message)
}

#[async_trait]
impl EventPublisher for RedisEventPublisher {
    async fn publish(&self, event: EventEnvelope) -> Result<(), DomainError> {
        let channel = self.channel_for(&event.event_type);
        let body = serde_json::to_string(&event)
            .map_err(|e| delivery_error(format!("failed to serialize event: {}", e)))?;

        let mut conn = self.conn.clone();
        let send = conn.publish::<_, _, i64>(&channel, body);

        let receivers = tokio::time::timeout(self.timeout, send)
            .await
            .map_err(|_| delivery_error(format!("publish to {} timed out", channel)))?
            .map_err(|e: redis::RedisError| {
                tracing::error!(error = %e, channel = %channel, "Redis publish failed");
                delivery_error(e.to_string())
            })?;

        tracing::debug!(
            event_id = %event.event_id,
            channel = %channel,
            receivers,
            "Event published"
        );
        Ok(())
    }
}

impl std::fmt::Debug for RedisEventPublisher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisEventPublisher")
            .field("channel_prefix", &self.channel_prefix)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}
