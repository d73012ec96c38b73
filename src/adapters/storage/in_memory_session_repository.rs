//! In-Memory Payment Session Repository
//!
//! Keeps session documents in a map with the same versioning rules as the
//! Postgres adapter. Used by tests and local development.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::domain::foundation::{DomainError, ErrorCode, PaymentSessionId};
use crate::domain::payment::{PaymentMethod, PaymentSession, RefundRecord, RefundStatus};
use crate::ports::PaymentSessionRepository;

/// In-memory storage for payment sessions.
#[derive(Debug, Clone, Default)]
pub struct InMemoryPaymentSessionRepository {
    sessions: Arc<RwLock<HashMap<PaymentSessionId, PaymentSession>>>,
    /// Insertion order, so scans are deterministic.
    order: Arc<RwLock<Vec<PaymentSessionId>>>,
    unavailable: Arc<AtomicBool>,
}

impl InMemoryPaymentSessionRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// A repository whose every call fails with a database error.
    pub fn failing() -> Self {
        let repo = Self::new();
        repo.set_unavailable(true);
        repo
    }

    /// Toggle simulated outage.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Stored copy of a session, bypassing outage simulation.
    pub async fn get(&self, id: &PaymentSessionId) -> Option<PaymentSession> {
        self.sessions.read().await.get(id).cloned()
    }

    /// Number of stored sessions.
    pub async fn count(&self) -> usize {
        self.sessions.read().await.len()
    }

    /// Overwrites a stored session without version checks (test setup).
    pub async fn put(&self, session: PaymentSession) {
        let id = *session.id();
        let mut sessions = self.sessions.write().await;
        if sessions.insert(id, session).is_none() {
            self.order.write().await.push(id);
        }
    }

    fn ensure_available(&self) -> Result<(), DomainError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(DomainError::database("session store unavailable"));
        }
        Ok(())
    }
}

#[async_trait]
impl PaymentSessionRepository for InMemoryPaymentSessionRepository {
    async fn create(&self, session: &PaymentSession) -> Result<(), DomainError> {
        self.ensure_available()?;
        let mut sessions = self.sessions.write().await;
        if sessions.contains_key(session.id()) {
            return Err(DomainError::conflict(format!(
                "session {} already exists",
                session.id()
            )));
        }
        sessions.insert(*session.id(), session.clone());
        self.order.write().await.push(*session.id());
        Ok(())
    }

    async fn find_by_id(&self, id: &PaymentSessionId) -> Result<Option<PaymentSession>, DomainError> {
        self.ensure_available()?;
        Ok(self.sessions.read().await.get(id).cloned())
    }

    async fn update(&self, session: &PaymentSession) -> Result<(), DomainError> {
        self.ensure_available()?;
        let mut sessions = self.sessions.write().await;
        let stored = sessions.get_mut(session.id()).ok_or_else(|| {
            DomainError::new(
                ErrorCode::NotFound,
                format!("session {} not found", session.id()),
            )
        })?;

        if stored.version() != session.version() {
            return Err(DomainError::conflict(format!(
                "session {} was modified concurrently",
                session.id()
            ))
            .with_detail("expected_version", session.version().to_string())
            .with_detail("stored_version", stored.version().to_string()));
        }

        let mut next = session.clone();
        next.advance_version();
        *stored = next;
        Ok(())
    }

    async fn find_by_refund_status(
        &self,
        statuses: &[RefundStatus],
    ) -> Result<Vec<PaymentSession>, DomainError> {
        self.ensure_available()?;
        let sessions = self.sessions.read().await;
        let order = self.order.read().await;
        Ok(order
            .iter()
            .filter_map(|id| sessions.get(id))
            .filter(|s| statuses.iter().any(|st| s.has_refund_in(*st)))
            .cloned()
            .collect())
    }

    async fn find_by_provider_payment_id(
        &self,
        method: PaymentMethod,
        provider_payment_id: &str,
    ) -> Result<Option<PaymentSession>, DomainError> {
        self.ensure_available()?;
        Ok(self
            .sessions
            .read()
            .await
            .values()
            .find(|s| {
                s.payment_method() == Some(method)
                    && s.external().provider_payment_id.as_deref() == Some(provider_payment_id)
            })
            .cloned())
    }

    async fn append_bulk_refund(
        &self,
        id: &PaymentSessionId,
        refund: &RefundRecord,
    ) -> Result<(), DomainError> {
        self.ensure_available()?;
        let mut sessions = self.sessions.write().await;
        let stored = sessions.get_mut(id).ok_or_else(|| {
            DomainError::new(ErrorCode::NotFound, format!("session {} not found", id))
        })?;
        stored.append_refund(refund.clone());
        stored.advance_version();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::foundation::Amount;
    use crate::domain::payment::fixtures::{paid_session, pending_session};

    #[tokio::test]
    async fn create_then_find() {
        let repo = InMemoryPaymentSessionRepository::new();
        let session = pending_session("10");

        repo.create(&session).await.unwrap();

        let found = repo.find_by_id(session.id()).await.unwrap();
        assert_eq!(found, Some(session));
        assert_eq!(repo.count().await, 1);
    }

    #[tokio::test]
    async fn missing_session_is_none() {
        let repo = InMemoryPaymentSessionRepository::new();
        assert!(repo.find_by_id(&PaymentSessionId::new()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn duplicate_create_conflicts() {
        let repo = InMemoryPaymentSessionRepository::new();
        let session = pending_session("10");
        repo.create(&session).await.unwrap();

        let err = repo.create(&session).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::Conflict);
    }

    #[tokio::test]
    async fn stale_update_conflicts() {
        let repo = InMemoryPaymentSessionRepository::new();
        let session = pending_session("10");
        repo.create(&session).await.unwrap();

        let first = repo.find_by_id(session.id()).await.unwrap().unwrap();
        let second = first.clone();

        repo.update(&first).await.unwrap();
        let err = repo.update(&second).await.unwrap_err();

        assert_eq!(err.code, ErrorCode::Conflict);
        assert_eq!(repo.get(session.id()).await.unwrap().version(), 1);
    }

    #[tokio::test]
    async fn update_of_unknown_session_is_not_found() {
        let repo = InMemoryPaymentSessionRepository::new();
        let err = repo.update(&pending_session("1")).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::NotFound);
    }

    #[tokio::test]
    async fn refund_status_scan_and_bulk_append() {
        let repo = InMemoryPaymentSessionRepository::new();
        let with_refund = paid_session("10", PaymentMethod::GovPay);
        let without = paid_session("10", PaymentMethod::GovPay);
        repo.create(&with_refund).await.unwrap();
        repo.create(&without).await.unwrap();

        repo.append_bulk_refund(
            with_refund.id(),
            &RefundRecord::requested(Amount::parse("2").unwrap()),
        )
        .await
        .unwrap();

        let found = repo
            .find_by_refund_status(&[RefundStatus::Requested, RefundStatus::Pending])
            .await
            .unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id(), with_refund.id());
        assert_eq!(found[0].version(), 1);
    }

    #[tokio::test]
    async fn find_by_provider_payment_id_matches_method() {
        let repo = InMemoryPaymentSessionRepository::new();
        let session = paid_session("10", PaymentMethod::GovPay);
        repo.create(&session).await.unwrap();

        let hit = repo
            .find_by_provider_payment_id(PaymentMethod::GovPay, "p-1")
            .await
            .unwrap();
        assert!(hit.is_some());

        let miss = repo
            .find_by_provider_payment_id(PaymentMethod::PayPal, "p-1")
            .await
            .unwrap();
        assert!(miss.is_none());
    }

    #[tokio::test]
    async fn failing_repository_reports_database_error() {
        let repo = InMemoryPaymentSessionRepository::failing();
        let err = repo.create(&pending_session("1")).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::DatabaseError);
    }
}
