//! Mock payment provider for testing.
//!
//! Provides a configurable `PaymentProvider` for unit and integration tests.
//! Supports:
//! - Pre-configured statuses, refund summaries and capture results
//! - Error injection (next call, or per method)
//! - Call tracking

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::domain::foundation::{Amount, RefundId};
use crate::domain::payment::{
    NormalizedStatus, PaymentMethod, PaymentSession, RefundRecord, RefundStatus,
};
use crate::ports::{CaptureResult, ExternalJourney, PaymentProvider, ProviderError, ProviderStatus};

/// Mock payment provider for testing.
///
/// ```ignore
/// let mock = MockPaymentProvider::new(PaymentMethod::GovPay);
/// mock.set_status(NormalizedStatus::Success);
/// mock.set_method_error("create_refund", ProviderError::network("govpay", "down"));
///
/// assert_eq!(mock.calls_to("check_status"), 1);
/// ```
#[derive(Clone)]
pub struct MockPaymentProvider {
    method: PaymentMethod,
    inner: Arc<Mutex<MockState>>,
}

#[derive(Default)]
struct MockState {
    /// Journey to hand out; generated from the session id when unset.
    journey: Option<ExternalJourney>,

    status: Option<NormalizedStatus>,

    provider_reference: Option<String>,

    /// Refundable amount; defaults to the session amount minus its refunds.
    refund_available: Option<Amount>,

    /// Status given to newly created refunds.
    new_refund_status: Option<RefundStatus>,

    /// Status returned for a refund id on query.
    refund_statuses: HashMap<String, RefundStatus>,

    capture: Option<CaptureResult>,

    refund_counter: u32,

    /// Error to return on next call.
    next_error: Option<ProviderError>,

    /// Specific errors by method name.
    method_errors: HashMap<String, ProviderError>,

    call_log: Vec<MethodCall>,
}

/// Recorded method call for assertions.
#[derive(Debug, Clone)]
pub struct MethodCall {
    pub method: String,
    pub args: Vec<String>,
}

impl MockPaymentProvider {
    pub fn new(method: PaymentMethod) -> Self {
        Self {
            method,
            inner: Arc::new(Mutex::new(MockState::default())),
        }
    }

    pub fn govpay() -> Self {
        Self::new(PaymentMethod::GovPay)
    }

    pub fn paypal() -> Self {
        Self::new(PaymentMethod::PayPal)
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Configuration Methods
    // ════════════════════════════════════════════════════════════════════════════

    pub fn set_journey(&self, journey: ExternalJourney) {
        self.inner.lock().unwrap().journey = Some(journey);
    }

    /// Status returned by `check_status`.
    pub fn set_status(&self, status: NormalizedStatus) {
        self.inner.lock().unwrap().status = Some(status);
    }

    pub fn set_provider_reference(&self, reference: impl Into<String>) {
        self.inner.lock().unwrap().provider_reference = Some(reference.into());
    }

    pub fn set_refund_available(&self, amount: Amount) {
        self.inner.lock().unwrap().refund_available = Some(amount);
    }

    pub fn set_new_refund_status(&self, status: RefundStatus) {
        self.inner.lock().unwrap().new_refund_status = Some(status);
    }

    pub fn set_refund_status(&self, refund_id: impl Into<String>, status: RefundStatus) {
        self.inner
            .lock()
            .unwrap()
            .refund_statuses
            .insert(refund_id.into(), status);
    }

    pub fn set_capture(&self, capture: CaptureResult) {
        self.inner.lock().unwrap().capture = Some(capture);
    }

    /// Fail the next call, whatever it is.
    pub fn set_error(&self, error: ProviderError) {
        self.inner.lock().unwrap().next_error = Some(error);
    }

    /// Fail every call to `method` until cleared.
    pub fn set_method_error(&self, method: &str, error: ProviderError) {
        self.inner
            .lock()
            .unwrap()
            .method_errors
            .insert(method.to_string(), error);
    }

    pub fn clear_errors(&self) {
        let mut state = self.inner.lock().unwrap();
        state.next_error = None;
        state.method_errors.clear();
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Inspection Methods
    // ════════════════════════════════════════════════════════════════════════════

    pub fn calls(&self) -> Vec<MethodCall> {
        self.inner.lock().unwrap().call_log.clone()
    }

    pub fn calls_to(&self, method: &str) -> usize {
        self.inner
            .lock()
            .unwrap()
            .call_log
            .iter()
            .filter(|c| c.method == method)
            .count()
    }

    pub fn total_calls(&self) -> usize {
        self.inner.lock().unwrap().call_log.len()
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Internal Helpers
    // ════════════════════════════════════════════════════════════════════════════

    fn record(&self, method: &str, args: Vec<String>) -> Result<(), ProviderError> {
        let mut state = self.inner.lock().unwrap();
        state.call_log.push(MethodCall {
            method: method.to_string(),
            args,
        });

        if let Some(err) = state.method_errors.get(method) {
            return Err(err.clone());
        }
        if let Some(err) = state.next_error.take() {
            return Err(err);
        }
        Ok(())
    }
}

#[async_trait]
impl PaymentProvider for MockPaymentProvider {
    fn method(&self) -> PaymentMethod {
        self.method
    }

    async fn initiate_payment(&self, session: &PaymentSession) -> Result<ExternalJourney, ProviderError> {
        self.record("initiate_payment", vec![session.id().to_string()])?;

        let state = self.inner.lock().unwrap();
        Ok(state.journey.clone().unwrap_or_else(|| ExternalJourney {
            redirect_url: format!("https://provider.test/pay/{}", session.id()),
            status_url: format!("https://provider.test/v1/payments/{}", session.id()),
            provider_payment_id: format!("mock-{}", session.id()),
        }))
    }

    async fn check_status(&self, session: &PaymentSession) -> Result<ProviderStatus, ProviderError> {
        self.record("check_status", vec![session.id().to_string()])?;

        let state = self.inner.lock().unwrap();
        Ok(ProviderStatus {
            status: state.status.unwrap_or(NormalizedStatus::InProgress),
            provider_reference: state.provider_reference.clone(),
        })
    }

    async fn refund_summary(&self, session: &PaymentSession) -> Result<Amount, ProviderError> {
        self.record("refund_summary", vec![session.id().to_string()])?;

        let state = self.inner.lock().unwrap();
        Ok(state.refund_available.unwrap_or_else(|| {
            session
                .amount()
                .saturating_sub(session.committed_refund_total())
        }))
    }

    async fn create_refund(
        &self,
        session: &PaymentSession,
        amount: Amount,
    ) -> Result<RefundRecord, ProviderError> {
        self.record(
            "create_refund",
            vec![session.id().to_string(), amount.to_string()],
        )?;

        let mut state = self.inner.lock().unwrap();
        state.refund_counter += 1;
        let refund_id = RefundId::new(format!("mock-refund-{}", state.refund_counter))
            .map_err(|e| ProviderError::decode("mock", e.to_string()))?;
        let status = state.new_refund_status.unwrap_or(RefundStatus::Pending);

        Ok(RefundRecord::submitted(refund_id, amount, status, None, None))
    }

    async fn refund_status(
        &self,
        session: &PaymentSession,
        refund_id: &RefundId,
    ) -> Result<RefundStatus, ProviderError> {
        self.record(
            "refund_status",
            vec![session.id().to_string(), refund_id.to_string()],
        )?;

        let state = self.inner.lock().unwrap();
        Ok(state
            .refund_statuses
            .get(refund_id.as_str())
            .copied()
            .unwrap_or(RefundStatus::Pending))
    }

    async fn capture(&self, session: &PaymentSession) -> Result<CaptureResult, ProviderError> {
        self.record("capture", vec![session.id().to_string()])?;

        let state = self.inner.lock().unwrap();
        Ok(state.capture.clone().unwrap_or_else(|| CaptureResult {
            status: NormalizedStatus::Success,
            capture_id: Some(format!("mock-capture-{}", session.id())),
        }))
    }
}
