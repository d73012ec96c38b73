//! Refund records and their lifecycle.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::foundation::{Amount, RefundId, StateMachine, Timestamp, ValidationError};

/// Status of a single refund.
///
/// `Requested` means accepted locally but not yet submitted to the provider
/// (bulk refunds); `Pending` means submitted and awaiting settlement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RefundStatus {
    #[serde(rename = "refund-requested")]
    Requested,
    #[serde(rename = "refund-pending")]
    Pending,
    #[serde(rename = "refund-success")]
    Success,
    #[serde(rename = "refund-error")]
    Error,
}

impl RefundStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RefundStatus::Requested => "refund-requested",
            RefundStatus::Pending => "refund-pending",
            RefundStatus::Success => "refund-success",
            RefundStatus::Error => "refund-error",
        }
    }

    /// Requested or pending: still needs reconciliation.
    pub fn is_outstanding(&self) -> bool {
        matches!(self, RefundStatus::Requested | RefundStatus::Pending)
    }
}

impl StateMachine for RefundStatus {
    fn can_transition_to(&self, target: &Self) -> bool {
        self.valid_transitions().contains(target)
    }

    fn valid_transitions(&self) -> Vec<Self> {
        use RefundStatus::*;
        match self {
            Requested => vec![Pending, Success, Error],
            Pending => vec![Success, Error],
            Success | Error => vec![],
        }
    }
}

impl fmt::Display for RefundStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A tracked refund against a settled session. Never deleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefundRecord {
    pub refund_id: RefundId,
    pub amount: Amount,
    pub status: RefundStatus,
    pub created_at: Timestamp,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider_reference: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_url: Option<String>,
    #[serde(default)]
    pub attempts: u32,
}

impl RefundRecord {
    /// A refund the provider has accepted.
    pub fn submitted(
        refund_id: RefundId,
        amount: Amount,
        status: RefundStatus,
        provider_reference: Option<String>,
        status_url: Option<String>,
    ) -> Self {
        Self {
            refund_id,
            amount,
            status,
            created_at: Timestamp::now(),
            provider_reference,
            status_url,
            attempts: 1,
        }
    }

    /// A refund recorded locally for later submission.
    pub fn requested(amount: Amount) -> Self {
        Self {
            refund_id: RefundId::generate(),
            amount,
            status: RefundStatus::Requested,
            created_at: Timestamp::now(),
            provider_reference: None,
            status_url: None,
            attempts: 0,
        }
    }

    /// Moves to `status`. Same-status updates are accepted as no-ops.
    ///
    /// Returns true if the status changed.
    pub fn apply_status(&mut self, status: RefundStatus) -> Result<bool, ValidationError> {
        if self.status == status {
            return Ok(false);
        }
        self.status = self.status.transition_to(status)?;
        Ok(true)
    }

    /// Replaces a local placeholder with the provider's refund.
    pub fn mark_submitted(
        &mut self,
        refund_id: RefundId,
        status: RefundStatus,
        provider_reference: Option<String>,
        status_url: Option<String>,
    ) -> Result<(), ValidationError> {
        self.attempts += 1;
        self.refund_id = refund_id;
        self.provider_reference = provider_reference;
        self.status_url = status_url;
        self.apply_status(status)?;
        Ok(())
    }

    /// Counts a failed submission or status query.
    pub fn record_attempt(&mut self) {
        self.attempts += 1;
    }

    /// True once the refund settled successfully.
    pub fn is_settled(&self) -> bool {
        self.status == RefundStatus::Success
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(status: RefundStatus) -> RefundRecord {
        RefundRecord::submitted(
            RefundId::new("r-1").unwrap(),
            Amount::parse("5").unwrap(),
            status,
            None,
            None,
        )
    }

    #[test]
    fn refunds_only_move_forward() {
        let mut r = record(RefundStatus::Pending);
        assert_eq!(r.apply_status(RefundStatus::Success), Ok(true));
        assert!(r.apply_status(RefundStatus::Pending).is_err());
        assert!(r.apply_status(RefundStatus::Error).is_err());
        assert_eq!(r.status, RefundStatus::Success);
    }

    #[test]
    fn same_status_is_a_no_op() {
        let mut r = record(RefundStatus::Pending);
        assert_eq!(r.apply_status(RefundStatus::Pending), Ok(false));
    }

    #[test]
    fn requested_refund_gets_provider_identity_on_submission() {
        let mut r = RefundRecord::requested(Amount::parse("2.50").unwrap());
        assert!(r.refund_id.is_local());
        assert_eq!(r.attempts, 0);

        r.mark_submitted(
            RefundId::new("prov-9").unwrap(),
            RefundStatus::Pending,
            Some("ref".into()),
            Some("https://pay/refunds/prov-9".into()),
        )
        .unwrap();

        assert_eq!(r.refund_id.as_str(), "prov-9");
        assert_eq!(r.status, RefundStatus::Pending);
        assert_eq!(r.attempts, 1);
    }

    #[test]
    fn serializes_with_prefixed_statuses() {
        let json = serde_json::to_value(record(RefundStatus::Error)).unwrap();
        assert_eq!(json["status"], "refund-error");
        assert_eq!(json["amount"], "5.00");
        assert!(json.get("status_url").is_none());
    }

    #[test]
    fn outstanding_statuses() {
        assert!(RefundStatus::Requested.is_outstanding());
        assert!(RefundStatus::Pending.is_outstanding());
        assert!(!RefundStatus::Success.is_outstanding());
        assert!(!RefundStatus::Error.is_outstanding());
    }
}
