//! Payment session aggregate.
//!
//! A session is a payment intent for one or more cost items, tracked from
//! creation through the provider journey to a terminal outcome, plus any
//! refunds issued against it afterwards.
//!
//! # Invariants
//!
//! - `amount == sum(costs.amount)` at creation; re-checked against fresh
//!   costs on every read by the session manager
//! - every cost shares one class of payment
//! - `Paid`, `Failed` and `Expired` are terminal: no further status writes
//! - `links.journey` is set at most once
//! - refunds are append-only and only move forward

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{
    Amount, IdentityId, PaymentSessionId, RefundId, StateMachine, Timestamp,
};

use super::cost::{single_class_of_payment, total_amount};
use super::{
    CostItem, ExpiryPolicy, NormalizedStatus, PaymentMethod, PaymentSessionError, PaymentStatus,
    RefundRecord, RefundStatus, SessionPatch,
};

/// Resource kind stamped on every session document.
pub const SESSION_KIND: &str = "payment-session#payment-session";

/// Who created the session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreatedBy {
    pub id: IdentityId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub forename: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub surname: Option<String>,
}

impl CreatedBy {
    /// "Forename Surname", falling back to whichever part exists, then email.
    pub fn display_name(&self) -> Option<String> {
        let parts: Vec<&str> = [self.forename.as_deref(), self.surname.as_deref()]
            .into_iter()
            .flatten()
            .filter(|p| !p.is_empty())
            .collect();
        if parts.is_empty() {
            self.email.clone()
        } else {
            Some(parts.join(" "))
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionLinks {
    /// Provider redirect target. Set once, when the journey starts.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub journey: Option<String>,
    /// Where the cost items come from.
    pub resource: String,
    #[serde(rename = "self")]
    pub self_url: String,
}

/// Provider-side handles for the session.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExternalReference {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider_payment_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub capture_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider_reference: Option<String>,
}

/// Inputs for a brand new session.
#[derive(Debug, Clone)]
pub struct NewPaymentSession {
    pub id: PaymentSessionId,
    pub costs: Vec<CostItem>,
    pub created_by: CreatedBy,
    pub redirect_uri: String,
    pub resource_url: String,
    pub state: String,
    pub reference: String,
    pub self_url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentSession {
    id: PaymentSessionId,
    amount: Amount,
    costs: Vec<CostItem>,
    class_of_payment: String,
    description: String,
    status: PaymentStatus,
    created_at: Timestamp,
    #[serde(default)]
    completed_at: Option<Timestamp>,
    created_by: CreatedBy,
    redirect_uri: String,
    state: String,
    reference: String,
    #[serde(default)]
    payment_method: Option<PaymentMethod>,
    links: SessionLinks,
    #[serde(default)]
    external: ExternalReference,
    #[serde(default)]
    refunds: Vec<RefundRecord>,
    kind: String,
    #[serde(default)]
    version: u64,
}

impl PaymentSession {
    /// Builds a pending session from freshly resolved costs.
    ///
    /// # Errors
    ///
    /// - `InvalidCost` if there are no costs or their total overflows
    /// - `MixedClassOfPayment` if costs span several classes
    pub fn create(new: NewPaymentSession, now: Timestamp) -> Result<Self, PaymentSessionError> {
        if new.costs.is_empty() {
            return Err(PaymentSessionError::InvalidCost(
                "cost resource returned no items".to_string(),
            ));
        }
        let class_of_payment =
            single_class_of_payment(&new.costs).ok_or(PaymentSessionError::MixedClassOfPayment)?;

        let amount = total_amount(&new.costs)?;
        let description = new.costs[0].description.clone();

        Ok(Self {
            id: new.id,
            amount,
            costs: new.costs,
            class_of_payment,
            description,
            status: PaymentStatus::Pending,
            created_at: now,
            completed_at: None,
            created_by: new.created_by,
            redirect_uri: new.redirect_uri,
            state: new.state,
            reference: new.reference,
            payment_method: None,
            links: SessionLinks {
                journey: None,
                resource: new.resource_url,
                self_url: new.self_url,
            },
            external: ExternalReference::default(),
            refunds: Vec::new(),
            kind: SESSION_KIND.to_string(),
            version: 0,
        })
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Accessors
    // ─────────────────────────────────────────────────────────────────────────

    pub fn id(&self) -> &PaymentSessionId {
        &self.id
    }

    pub fn amount(&self) -> Amount {
        self.amount
    }

    pub fn costs(&self) -> &[CostItem] {
        &self.costs
    }

    pub fn class_of_payment(&self) -> &str {
        &self.class_of_payment
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn status(&self) -> PaymentStatus {
        self.status
    }

    pub fn created_at(&self) -> &Timestamp {
        &self.created_at
    }

    pub fn completed_at(&self) -> Option<&Timestamp> {
        self.completed_at.as_ref()
    }

    pub fn created_by(&self) -> &CreatedBy {
        &self.created_by
    }

    pub fn redirect_uri(&self) -> &str {
        &self.redirect_uri
    }

    pub fn state(&self) -> &str {
        &self.state
    }

    pub fn reference(&self) -> &str {
        &self.reference
    }

    pub fn payment_method(&self) -> Option<PaymentMethod> {
        self.payment_method
    }

    pub fn links(&self) -> &SessionLinks {
        &self.links
    }

    pub fn external(&self) -> &ExternalReference {
        &self.external
    }

    pub fn refunds(&self) -> &[RefundRecord] {
        &self.refunds
    }

    pub fn kind(&self) -> &str {
        &self.kind
    }

    /// Version read from storage; writes must present it unchanged.
    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    pub fn is_created_by(&self, identity: &IdentityId) -> bool {
        &self.created_by.id == identity
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Invariant checks
    // ─────────────────────────────────────────────────────────────────────────

    /// Verifies the stored amount against freshly fetched costs.
    ///
    /// A mismatch means the cost resource changed under the session and is
    /// treated as tampering, not as stale data to refresh.
    pub fn ensure_amount_matches(&self, fresh_costs: &[CostItem]) -> Result<(), PaymentSessionError> {
        let fresh_total = total_amount(fresh_costs)?;
        if fresh_total != self.amount {
            return Err(PaymentSessionError::forbidden(format!(
                "session amount {} does not match current costs {}",
                self.amount, fresh_total
            )));
        }
        Ok(())
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Lifecycle
    // ─────────────────────────────────────────────────────────────────────────

    /// Expires the session if it outlived the policy while non-terminal.
    ///
    /// Returns true if the status changed.
    pub fn expire_if_due(&mut self, policy: &ExpiryPolicy, now: Timestamp) -> bool {
        if self.is_terminal() || !policy.is_expired(now, self.created_at) {
            return false;
        }
        self.status = PaymentStatus::Expired;
        self.completed_at = Some(now);
        true
    }

    /// Merges the supplied fields.
    ///
    /// # Errors
    ///
    /// - `Conflict` if the session is terminal, or the method would change
    ///   after a journey started
    /// - `InvalidData` for a status move the lifecycle does not allow
    pub fn apply_patch(&mut self, patch: SessionPatch, now: Timestamp) -> Result<(), PaymentSessionError> {
        if self.is_terminal() {
            return Err(PaymentSessionError::conflict(format!(
                "session is {} and can no longer be modified",
                self.status
            )));
        }

        if let Some(method) = patch.payment_method {
            if self.links.journey.is_some() && self.payment_method != Some(method) {
                return Err(PaymentSessionError::conflict(
                    "payment method cannot change once the journey has started",
                ));
            }
        }

        let next_status = match patch.status {
            Some(target) if target != self.status => Some(
                self.status
                    .transition_to(target)
                    .map_err(|e| PaymentSessionError::invalid_data(e.to_string()))?,
            ),
            _ => None,
        };

        if let Some(method) = patch.payment_method {
            self.payment_method = Some(method);
        }
        if let Some(reference) = patch.reference {
            self.reference = reference;
        }
        if let Some(status) = next_status {
            self.set_status(status, now);
        }
        Ok(())
    }

    /// Records the provider journey for this session.
    pub fn record_journey(
        &mut self,
        journey_url: String,
        status_url: String,
        provider_payment_id: String,
    ) -> Result<(), PaymentSessionError> {
        if self.links.journey.is_some() {
            return Err(PaymentSessionError::conflict("journey already started"));
        }
        self.links.journey = Some(journey_url);
        self.external.status_url = Some(status_url);
        self.external.provider_payment_id = Some(provider_payment_id);
        Ok(())
    }

    /// Applies a provider status report.
    ///
    /// Returns the new terminal status when this report settled the session.
    pub fn apply_provider_status(
        &mut self,
        status: NormalizedStatus,
        provider_reference: Option<String>,
        now: Timestamp,
    ) -> Result<Option<PaymentStatus>, PaymentSessionError> {
        if self.is_terminal() {
            return Err(PaymentSessionError::conflict(format!(
                "session already {}",
                self.status
            )));
        }
        if provider_reference.is_some() {
            self.external.provider_reference = provider_reference;
        }
        let Some(target) = status.settles_to() else {
            return Ok(None);
        };
        let next = self.status.transition_to(target).map_err(|_| {
            PaymentSessionError::conflict(format!(
                "provider reported {} for a {} session",
                status, self.status
            ))
        })?;
        self.set_status(next, now);
        Ok(Some(next))
    }

    /// Stores the capture id returned by an approve-then-capture provider.
    pub fn record_capture(&mut self, capture_id: Option<String>) {
        if capture_id.is_some() {
            self.external.capture_id = capture_id;
        }
    }

    fn set_status(&mut self, status: PaymentStatus, now: Timestamp) {
        self.status = status;
        if status.is_terminal() {
            self.completed_at = Some(now);
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Refunds
    // ─────────────────────────────────────────────────────────────────────────

    /// Refunds are only issued against paid sessions.
    pub fn ensure_refundable(&self) -> Result<(), PaymentSessionError> {
        if self.status != PaymentStatus::Paid {
            return Err(PaymentSessionError::invalid_data(format!(
                "cannot refund a {} session",
                self.status
            )));
        }
        Ok(())
    }

    pub fn append_refund(&mut self, refund: RefundRecord) {
        self.refunds.push(refund);
    }

    pub fn refund(&self, refund_id: &RefundId) -> Option<&RefundRecord> {
        self.refunds.iter().find(|r| &r.refund_id == refund_id)
    }

    pub fn refund_mut(&mut self, refund_id: &RefundId) -> Option<&mut RefundRecord> {
        self.refunds.iter_mut().find(|r| &r.refund_id == refund_id)
    }

    /// Ids of refunds still awaiting settlement, in insertion order.
    pub fn outstanding_refund_ids(&self) -> Vec<RefundId> {
        self.refunds
            .iter()
            .filter(|r| r.status.is_outstanding())
            .map(|r| r.refund_id.clone())
            .collect()
    }

    pub fn has_refund_in(&self, status: RefundStatus) -> bool {
        self.refunds.iter().any(|r| r.status == status)
    }

    /// Sum of refunds the provider has accepted and not failed.
    ///
    /// Locally requested refunds are excluded until they are submitted.
    pub fn committed_refund_total(&self) -> Amount {
        Amount::saturating_sum(
            self.refunds
                .iter()
                .filter(|r| matches!(r.status, RefundStatus::Pending | RefundStatus::Success))
                .map(|r| r.amount),
        )
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Persistence support
    // ─────────────────────────────────────────────────────────────────────────

    /// Called after a successful versioned write.
    pub fn advance_version(&mut self) {
        self.version += 1;
    }
}


#[cfg(test)]
mod tests {
    use super::fixtures::*;
    use super::*;
    use crate::domain::payment::cost::fixtures::cost;

    #[test]
    fn create_sums_costs_and_starts_pending() {
        let session = PaymentSession::create(
            new_session(vec![cost("10.00", "penalty"), cost("20.00", "penalty")]),
            Timestamp::now(),
        )
        .unwrap();

        assert_eq!(session.amount().to_string(), "30.00");
        assert_eq!(session.status(), PaymentStatus::Pending);
        assert_eq!(session.class_of_payment(), "penalty");
        assert_eq!(session.kind(), SESSION_KIND);
        assert!(session.completed_at().is_none());
        assert_eq!(session.version(), 0);
    }

    #[test]
    fn create_rejects_mixed_classes() {
        let result = PaymentSession::create(
            new_session(vec![cost("1", "penalty"), cost("1", "orderable-item")]),
            Timestamp::now(),
        );
        assert_eq!(result.unwrap_err(), PaymentSessionError::MixedClassOfPayment);
    }

    #[test]
    fn create_rejects_empty_costs() {
        let result = PaymentSession::create(new_session(vec![]), Timestamp::now());
        assert!(matches!(result, Err(PaymentSessionError::InvalidCost(_))));
    }

    #[test]
    fn amount_drift_is_forbidden() {
        let session = PaymentSession::create(
            new_session(vec![cost("10.00", "penalty"), cost("20.00", "penalty")]),
            Timestamp::now(),
        )
        .unwrap();

        let same = vec![cost("10.00", "penalty"), cost("20.00", "penalty")];
        assert!(session.ensure_amount_matches(&same).is_ok());

        let drifted = vec![cost("10.00", "penalty"), cost("19.00", "penalty")];
        assert!(matches!(
            session.ensure_amount_matches(&drifted),
            Err(PaymentSessionError::Forbidden(_))
        ));
    }

    #[test]
    fn expiry_only_applies_to_non_terminal_sessions() {
        let policy = ExpiryPolicy::from_minutes(90);
        let mut session = pending_session("5");
        let later = session.created_at().plus_minutes(91);

        assert!(!session.expire_if_due(&policy, session.created_at().plus_minutes(10)));
        assert!(session.expire_if_due(&policy, later));
        assert_eq!(session.status(), PaymentStatus::Expired);
        assert_eq!(session.completed_at(), Some(&later));

        let mut paid = paid_session("5", PaymentMethod::GovPay);
        assert!(!paid.expire_if_due(&policy, paid.created_at().plus_minutes(500)));
        assert_eq!(paid.status(), PaymentStatus::Paid);
    }

    #[test]
    fn patch_cannot_touch_terminal_session() {
        let mut session = paid_session("5", PaymentMethod::GovPay);
        let err = session
            .apply_patch(SessionPatch::new().with_status(PaymentStatus::InProgress), Timestamp::now())
            .unwrap_err();
        assert!(matches!(err, PaymentSessionError::Conflict(_)));
        assert_eq!(session.status(), PaymentStatus::Paid);
    }

    #[test]
    fn patch_rejects_disallowed_transition() {
        let mut session = pending_session("5");
        let err = session
            .apply_patch(SessionPatch::new().with_status(PaymentStatus::Paid), Timestamp::now())
            .unwrap_err();
        assert!(matches!(err, PaymentSessionError::InvalidData(_)));
        assert_eq!(session.status(), PaymentStatus::Pending);
    }

    #[test]
    fn patch_merges_only_supplied_fields() {
        let mut session = pending_session("5");
        session
            .apply_patch(SessionPatch::new().with_payment_method(PaymentMethod::PayPal), Timestamp::now())
            .unwrap();
        assert_eq!(session.payment_method(), Some(PaymentMethod::PayPal));
        assert_eq!(session.status(), PaymentStatus::Pending);
        assert_eq!(session.reference(), "ref-1");
    }

    #[test]
    fn method_is_frozen_once_journey_exists() {
        let mut session = in_progress_session("5", PaymentMethod::GovPay);
        session
            .record_journey("https://j".into(), "https://s".into(), "p".into())
            .unwrap();
        let err = session
            .apply_patch(SessionPatch::new().with_payment_method(PaymentMethod::PayPal), Timestamp::now())
            .unwrap_err();
        assert!(matches!(err, PaymentSessionError::Conflict(_)));
    }

    #[test]
    fn journey_is_set_once() {
        let mut session = in_progress_session("5", PaymentMethod::GovPay);
        session
            .record_journey("https://j".into(), "https://s".into(), "p".into())
            .unwrap();
        assert!(session
            .record_journey("https://j2".into(), "https://s2".into(), "p2".into())
            .is_err());
        assert_eq!(session.links().journey.as_deref(), Some("https://j"));
        assert_eq!(session.external().status_url.as_deref(), Some("https://s"));
    }

    #[test]
    fn provider_status_settles_once() {
        let mut session = in_progress_session("5", PaymentMethod::GovPay);

        let outcome = session
            .apply_provider_status(NormalizedStatus::InProgress, None, Timestamp::now())
            .unwrap();
        assert_eq!(outcome, None);

        let outcome = session
            .apply_provider_status(NormalizedStatus::Cancelled, Some("ref-x".into()), Timestamp::now())
            .unwrap();
        assert_eq!(outcome, Some(PaymentStatus::Failed));
        assert_eq!(session.external().provider_reference.as_deref(), Some("ref-x"));
        assert!(session.completed_at().is_some());

        let again = session.apply_provider_status(NormalizedStatus::Success, None, Timestamp::now());
        assert!(matches!(again, Err(PaymentSessionError::Conflict(_))));
        assert_eq!(session.status(), PaymentStatus::Failed);
    }

    #[test]
    fn refund_helpers_track_outstanding_and_committed() {
        let mut session = paid_session("10", PaymentMethod::GovPay);
        assert!(session.ensure_refundable().is_ok());

        session.append_refund(RefundRecord::submitted(
            RefundId::new("r-1").unwrap(),
            Amount::parse("3").unwrap(),
            RefundStatus::Pending,
            None,
            None,
        ));
        session.append_refund(RefundRecord::submitted(
            RefundId::new("r-2").unwrap(),
            Amount::parse("2").unwrap(),
            RefundStatus::Error,
            None,
            None,
        ));

        assert_eq!(session.outstanding_refund_ids(), vec![RefundId::new("r-1").unwrap()]);
        assert_eq!(session.committed_refund_total().to_string(), "3.00");
        assert!(session.has_refund_in(RefundStatus::Pending));
        assert!(session.refund(&RefundId::new("r-2").unwrap()).is_some());
        assert!(session.refund(&RefundId::new("r-3").unwrap()).is_none());
    }

    #[test]
    fn unpaid_sessions_are_not_refundable() {
        assert!(pending_session("5").ensure_refundable().is_err());
    }

    #[test]
    fn document_round_trips_through_json() {
        let session = paid_session("12.50", PaymentMethod::PayPal);
        let json = serde_json::to_value(&session).unwrap();

        assert_eq!(json["amount"], "12.50");
        assert_eq!(json["status"], "paid");
        assert_eq!(json["payment_method"], "PayPal");
        assert!(json["links"]["self"].is_string());

        let back: PaymentSession = serde_json::from_value(json).unwrap();
        assert_eq!(back, session);
    }

    #[test]
    fn display_name_falls_back_to_email() {
        let mut by = creator();
        assert_eq!(by.display_name().as_deref(), Some("Ada Lovelace"));
        by.forename = None;
        by.surname = None;
        assert_eq!(by.display_name().as_deref(), Some("ada@example.com"));
    }
}
