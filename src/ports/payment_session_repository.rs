//! Payment session repository port - Write side persistence.
//!
//! Every call is atomic for one session; nothing spans sessions.

use async_trait::async_trait;

use crate::domain::foundation::{DomainError, PaymentSessionId};
use crate::domain::payment::{PaymentMethod, PaymentSession, RefundRecord, RefundStatus};

/// Repository port for PaymentSession aggregates.
///
/// # Contract
///
/// - `update` is a versioned write: it succeeds only when the stored version
///   equals `session.version()`, and bumps the stored version by one.
///   A mismatch fails with `ErrorCode::Conflict`; a missing session with
///   `ErrorCode::NotFound`.
/// - `append_bulk_refund` appends without a version check.
#[async_trait]
pub trait PaymentSessionRepository: Send + Sync {
    /// Insert a new session.
    async fn create(&self, session: &PaymentSession) -> Result<(), DomainError>;

    /// Find by id. `Ok(None)` when absent.
    async fn find_by_id(&self, id: &PaymentSessionId) -> Result<Option<PaymentSession>, DomainError>;

    /// Versioned full-document write.
    async fn update(&self, session: &PaymentSession) -> Result<(), DomainError>;

    /// Sessions holding at least one refund in any of `statuses`.
    async fn find_by_refund_status(
        &self,
        statuses: &[RefundStatus],
    ) -> Result<Vec<PaymentSession>, DomainError>;

    /// Find by the provider's payment identifier.
    async fn find_by_provider_payment_id(
        &self,
        method: PaymentMethod,
        provider_payment_id: &str,
    ) -> Result<Option<PaymentSession>, DomainError>;

    /// Append a refund record to a session.
    async fn append_bulk_refund(
        &self,
        id: &PaymentSessionId,
        refund: &RefundRecord,
    ) -> Result<(), DomainError>;
}
