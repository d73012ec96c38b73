//! CreateRefundHandler - submits a refund against a paid session.

use std::sync::Arc;

use crate::application::authorization::{Access, AuthorizationPolicy};
use crate::application::ProviderRegistry;
use crate::domain::foundation::{
    Amount, AuthorizedIdentity, CommandMetadata, PaymentSessionId, SerializableDomainEvent,
};
use crate::domain::payment::{PaymentSession, PaymentSessionError, RefundCreated, RefundRecord};
use crate::ports::{EventPublisher, PaymentSessionRepository};

#[derive(Debug, Clone)]
pub struct CreateRefundCommand {
    pub session_id: PaymentSessionId,
    pub amount: Amount,
    pub requester: AuthorizedIdentity,
}

#[derive(Debug, Clone)]
pub struct CreateRefundResult {
    pub refund: RefundRecord,
    pub session: PaymentSession,
}

pub struct CreateRefundHandler {
    repository: Arc<dyn PaymentSessionRepository>,
    providers: ProviderRegistry,
    event_publisher: Arc<dyn EventPublisher>,
    policy: AuthorizationPolicy,
}

impl CreateRefundHandler {
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
        cmd: CreateRefundCommand,
        metadata: CommandMetadata,
    ) -> Result<CreateRefundResult, PaymentSessionError> {
        if cmd.amount.is_zero() {
            return Err(PaymentSessionError::invalid_request("refund amount must be positive"));
        }

        // 1. Load and authorize
        let mut session = self
            .repository
            .find_by_id(&cmd.session_id)
            .await?
            .ok_or_else(|| PaymentSessionError::not_found(format!("session {}", cmd.session_id)))?;
        self.policy
            .authorize_session(&cmd.requester, &session, Access::Write)?;

        // 2. Only paid sessions are refundable
        session.ensure_refundable()?;
        let method = session
            .payment_method()
            .ok_or_else(|| PaymentSessionError::invalid_data("session has no payment method"))?;
        let provider = self.providers.provider_for(method)?;

        // 3. The provider says how much is left
        let available = provider.refund_summary(&session).await?;
        if cmd.amount > available {
            tracing::info!(
                session_id = %session.id(),
                requested = %cmd.amount,
                available = %available,
                "refund exceeds refundable amount"
            );
            return Err(PaymentSessionError::InsufficientRefundable {
                requested: cmd.amount.to_string(),
                available: available.to_string(),
            });
        }

        // 4. Submit, append, persist
        let refund = provider.create_refund(&session, cmd.amount).await.map_err(|e| {
            tracing::error!(session_id = %session.id(), provider = e.provider, error = %e, "refund submission failed");
            PaymentSessionError::from(e)
        })?;
        session.append_refund(refund.clone());
        self.repository.update(&session).await?;
        session.advance_version();

        tracing::info!(
            session_id = %session.id(),
            refund_id = %refund.refund_id,
            amount = %refund.amount,
            status = %refund.status,
            "refund created"
        );

        // 5. Announce
        let envelope = RefundCreated::new(*session.id(), refund.refund_id.clone())
            .to_envelope()
            .with_correlation_id(metadata.correlation_id())
            .with_user_id(cmd.requester.id.to_string());
        self.event_publisher
            .publish(envelope)
            .await
            .map_err(PaymentSessionError::event_delivery)?;

        Ok(CreateRefundResult { refund, session })
    }
}
