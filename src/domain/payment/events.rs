//! Payment domain events.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{EventId, PaymentSessionId, RefundId, Timestamp};
use crate::domain_event;

use super::PaymentStatus;

/// A session reached a terminal outcome, or one of its refunds settled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentProcessed {
    pub event_id: EventId,
    pub session_id: PaymentSessionId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refund_id: Option<RefundId>,
    pub status: PaymentStatus,
    pub occurred_at: Timestamp,
}

impl PaymentProcessed {
    pub fn settled(session_id: PaymentSessionId, status: PaymentStatus) -> Self {
        Self {
            event_id: EventId::new(),
            session_id,
            refund_id: None,
            status,
            occurred_at: Timestamp::now(),
        }
    }

    pub fn refund_settled(session_id: PaymentSessionId, refund_id: RefundId) -> Self {
        Self {
            event_id: EventId::new(),
            session_id,
            refund_id: Some(refund_id),
            status: PaymentStatus::Paid,
            occurred_at: Timestamp::now(),
        }
    }
}

domain_event!(
    PaymentProcessed,
    event_type = "payment.processed.v1",
    schema_version = 1,
    aggregate_id = session_id,
    aggregate_type = "PaymentSession",
    occurred_at = occurred_at,
    event_id = event_id
);

/// A refund was submitted to the provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefundCreated {
    pub event_id: EventId,
    pub session_id: PaymentSessionId,
    pub refund_id: RefundId,
    pub occurred_at: Timestamp,
}

impl RefundCreated {
    pub fn new(session_id: PaymentSessionId, refund_id: RefundId) -> Self {
        Self {
            event_id: EventId::new(),
            session_id,
            refund_id,
            occurred_at: Timestamp::now(),
        }
    }
}

domain_event!(
    RefundCreated,
    event_type = "payment.refund_created.v1",
    schema_version = 1,
    aggregate_id = session_id,
    aggregate_type = "PaymentSession",
    occurred_at = occurred_at,
    event_id = event_id
);
