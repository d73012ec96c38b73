//! UpdateRefundHandler - refreshes one refund's status from the provider.

use std::sync::Arc;

use crate::application::authorization::{Access, AuthorizationPolicy};
use crate::application::ProviderRegistry;
use crate::domain::foundation::{
    AuthorizedIdentity, CommandMetadata, PaymentSessionId, RefundId, SerializableDomainEvent,
};
use crate::domain::payment::{PaymentProcessed, PaymentSession, PaymentSessionError, RefundRecord};
use crate::ports::{EventPublisher, PaymentSessionRepository};

#[derive(Debug, Clone)]
pub struct UpdateRefundCommand {
    pub session_id: PaymentSessionId,
    pub refund_id: RefundId,
    pub requester: AuthorizedIdentity,
}

#[derive(Debug, Clone)]
pub struct UpdateRefundResult {
    pub refund: RefundRecord,
    pub session: PaymentSession,
    /// True when this query moved the refund to a new status.
    pub changed: bool,
}

pub struct UpdateRefundHandler {
    repository: Arc<dyn PaymentSessionRepository>,
    providers: ProviderRegistry,
    event_publisher: Arc<dyn EventPublisher>,
    policy: AuthorizationPolicy,
}

impl UpdateRefundHandler {
    pub fn new(
        repository: Arc<dyn PaymentSessionRepository>,
        providers: ProviderRegistry,
        event_publisher: Arc<dyn EventPublisher>,
        policy: AuthorizationPolicy,
    ) -> Self {
        Self {
            repository,
            providers,
            event_publisher,
            policy,
        }
    }

    pub async fn handle(
        &self,
        cmd: UpdateRefundCommand,
        metadata: CommandMetadata,
    ) -> Result<UpdateRefundResult, PaymentSessionError> {
        // 1. Load, authorize, locate the refund
        let mut session = self
            .repository
            .find_by_id(&cmd.session_id)
            .await?
            .ok_or_else(|| PaymentSessionError::not_found(format!("session {}", cmd.session_id)))?;
        self.policy
            .authorize_session(&cmd.requester, &session, Access::Write)?;

        if session.refund(&cmd.refund_id).is_none() {
            return Err(PaymentSessionError::not_found(format!("refund {}", cmd.refund_id)));
        }
        let method = session
            .payment_method()
            .ok_or_else(|| PaymentSessionError::invalid_data("session has no payment method"))?;
        let provider = self.providers.provider_for(method)?;

        // 2. Query and update only that record
        let status = provider.refund_status(&session, &cmd.refund_id).await?;
        let refund = session
            .refund_mut(&cmd.refund_id)
            .ok_or_else(|| PaymentSessionError::not_found(format!("refund {}", cmd.refund_id)))?;
        let changed = refund.apply_status(status)?;
        let refund = refund.clone();

        // 3. Persist
        if changed {
            self.repository.update(&session).await?;
            session.advance_version();
            tracing::info!(
                session_id = %session.id(),
                refund_id = %refund.refund_id,
                status = %refund.status,
                "refund status updated"
            );
        }

        // 4. A newly settled refund is announced
        if changed && refund.is_settled() {
            let envelope = PaymentProcessed::refund_settled(*session.id(), refund.refund_id.clone())
                .to_envelope()
                .with_correlation_id(metadata.correlation_id())
                .with_user_id(cmd.requester.id.to_string());
            self.event_publisher
                .publish(envelope)
                .await
                .map_err(PaymentSessionError::event_delivery)?;
        }

        Ok(UpdateRefundResult {
            refund,
            session,
            changed,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::events::InMemoryEventBus;
    use crate::adapters::mock::MockPaymentProvider;
    use crate::adapters::storage::InMemoryPaymentSessionRepository;
    use crate::domain::foundation::{Amount, IdentityId};
    use crate::domain::payment::fixtures::paid_session;
    use crate::domain::payment::{PaymentMethod, RefundStatus};

    struct Fixture {
        repo: InMemoryPaymentSessionRepository,
        provider: MockPaymentProvider,
        bus: Arc<InMemoryEventBus>,
        handler: UpdateRefundHandler,
    }

    fn fixture() -> Fixture {
        let repo = InMemoryPaymentSessionRepository::new();
        let provider = MockPaymentProvider::govpay();
        let bus = Arc::new(InMemoryEventBus::new());
        let handler = UpdateRefundHandler::new(
            Arc::new(repo.clone()),
            ProviderRegistry::new().with_provider(Arc::new(provider.clone())),
            bus.clone(),
            AuthorizationPolicy::default(),
        );
        Fixture {
            repo,
            provider,
            bus,
            handler,
        }
    }

    fn owner() -> AuthorizedIdentity {
        AuthorizedIdentity::user(IdentityId::new("user-1").unwrap(), "ada@example.com", None)
    }

    async fn session_with_refund(repo: &InMemoryPaymentSessionRepository) -> PaymentSession {
        let mut session = paid_session("10.00", PaymentMethod::GovPay);
        session.append_refund(RefundRecord::submitted(
            RefundId::new("r-1").unwrap(),
            Amount::parse("3").unwrap(),
            RefundStatus::Pending,
            None,
            None,
        ));
        repo.create(&session).await.unwrap();
        session
    }

    #[tokio::test]
    async fn settled_refund_is_saved_and_announced() {
        let f = fixture();
        let session = session_with_refund(&f.repo).await;
        f.provider.set_refund_status("r-1", RefundStatus::Success);

        let result = f
            .handler
            .handle(
                UpdateRefundCommand {
                    session_id: *session.id(),
                    refund_id: RefundId::new("r-1").unwrap(),
                    requester: owner(),
                },
                CommandMetadata::test_fixture(),
            )
            .await
            .unwrap();

        assert!(result.changed);
        assert_eq!(result.refund.status, RefundStatus::Success);
        let stored = f.repo.get(session.id()).await.unwrap();
        assert_eq!(stored.refunds()[0].status, RefundStatus::Success);
        let events = f.bus.events_of_type("payment.processed.v1");
        assert_eq!(events.len(), 1);
        let event: PaymentProcessed = events[0].payload_as().unwrap();
        assert_eq!(event.refund_id, Some(RefundId::new("r-1").unwrap()));
    }

    #[tokio::test]
    async fn unchanged_status_writes_nothing() {
        let f = fixture();
        let session = session_with_refund(&f.repo).await;

        let result = f
            .handler
            .handle(
                UpdateRefundCommand {
                    session_id: *session.id(),
                    refund_id: RefundId::new("r-1").unwrap(),
                    requester: owner(),
                },
                CommandMetadata::test_fixture(),
            )
            .await
            .unwrap();

        assert!(!result.changed);
        assert_eq!(f.repo.get(session.id()).await.unwrap().version(), 0);
        assert_eq!(f.bus.event_count(), 0);
    }

    #[tokio::test]
    async fn unknown_refund_is_not_found_without_provider_call() {
        let f = fixture();
        let session = session_with_refund(&f.repo).await;

        let err = f
            .handler
            .handle(
                UpdateRefundCommand {
                    session_id: *session.id(),
                    refund_id: RefundId::new("r-404").unwrap(),
                    requester: owner(),
                },
                CommandMetadata::test_fixture(),
            )
            .await
            .unwrap_err();

        assert!(matches!(err, PaymentSessionError::NotFound(_)));
        assert_eq!(f.provider.total_calls(), 0);
    }

    #[tokio::test]
    async fn backwards_status_is_invalid_data() {
        let f = fixture();
        let session = session_with_refund(&f.repo).await;
        f.provider.set_refund_status("r-1", RefundStatus::Requested);

        let err = f
            .handler
            .handle(
                UpdateRefundCommand {
                    session_id: *session.id(),
                    refund_id: RefundId::new("r-1").unwrap(),
                    requester: owner(),
                },
                CommandMetadata::test_fixture(),
            )
            .await
            .unwrap_err();

        assert!(matches!(err, PaymentSessionError::InvalidData(_)));
    }
}
