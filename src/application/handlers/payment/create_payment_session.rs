//! CreatePaymentSessionHandler - Command handler for opening payment sessions.

use std::sync::Arc;

use crate::domain::foundation::{CommandMetadata, PaymentSessionId, Timestamp};
use crate::domain::payment::{CreatedBy, NewPaymentSession, PaymentSession, PaymentSessionError};
use crate::ports::{CostResolver, PaymentSessionRepository};

use super::SessionSettings;

/// Command to open a session for the costs behind `resource`.
#[derive(Debug, Clone)]
pub struct CreatePaymentSessionCommand {
    pub redirect_uri: String,
    pub resource: String,
    pub state: String,
    pub reference: String,
    pub created_by: CreatedBy,
}

/// Handler for creating payment sessions.
pub struct CreatePaymentSessionHandler {
    repository: Arc<dyn PaymentSessionRepository>,
    cost_resolver: Arc<dyn CostResolver>,
    settings: SessionSettings,
}

impl CreatePaymentSessionHandler {
    pub fn new(
        repository: Arc<dyn PaymentSessionRepository>,
        cost_resolver: Arc<dyn CostResolver>,
        settings: SessionSettings,
    ) -> Self {
        Self {
            repository,
            cost_resolver,
            settings,
        }
    }

    pub async fn handle(
        &self,
        cmd: CreatePaymentSessionCommand,
        metadata: CommandMetadata,
    ) -> Result<PaymentSession, PaymentSessionError> {
        // 1. Validate request shape
        require_field("redirect_uri", &cmd.redirect_uri)?;
        require_field("resource", &cmd.resource)?;
        require_field("state", &cmd.state)?;

        // 2. Resolve costs from the allow-listed resource
        let costs = self
            .cost_resolver
            .resolve(&cmd.resource, &self.settings.allow_list)
            .await
            .map_err(|e| {
                tracing::warn!(resource = %cmd.resource, error = %e, "cost resolution failed");
                PaymentSessionError::from(e)
            })?;

        // 3. Build the aggregate (amount, single class of payment)
        let id = PaymentSessionId::new();
        let session = PaymentSession::create(
            NewPaymentSession {
                id,
                costs,
                created_by: cmd.created_by,
                redirect_uri: cmd.redirect_uri,
                resource_url: cmd.resource,
                state: cmd.state,
                reference: cmd.reference,
                self_url: self.settings.self_link(&id),
            },
            Timestamp::now(),
        )?;

        // 4. Persist; nothing is returned unless this succeeds
        self.repository.create(&session).await?;

        tracing::info!(
            session_id = %session.id(),
            amount = %session.amount(),
            class_of_payment = session.class_of_payment(),
            correlation_id = %metadata.correlation_id(),
            "payment session created"
        );

        Ok(session)
    }
}

fn require_field(name: &str, value: &str) -> Result<(), PaymentSessionError> {
    if value.trim().is_empty() {
        return Err(PaymentSessionError::invalid_request(format!("{} is required", name)));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::cost::StaticCostResolver;
    use crate::adapters::storage::InMemoryPaymentSessionRepository;
    use crate::application::handlers::payment::settings::test_settings;
    use crate::domain::foundation::Amount;
    use crate::domain::payment::fixtures::{cost, creator};
    use crate::domain::payment::PaymentStatus;
    use crate::ports::CostResolutionError;

    const RESOURCE: &str = "https://api.example.com/transactions/1/payment";

    fn command() -> CreatePaymentSessionCommand {
        CreatePaymentSessionCommand {
            redirect_uri: "https://service.example.com/done".to_string(),
            resource: RESOURCE.to_string(),
            state: "state-token".to_string(),
            reference: "ref-1".to_string(),
            created_by: creator(),
        }
    }

    fn handler(
        repo: &InMemoryPaymentSessionRepository,
        resolver: &StaticCostResolver,
    ) -> CreatePaymentSessionHandler {
        CreatePaymentSessionHandler::new(
            Arc::new(repo.clone()),
            Arc::new(resolver.clone()),
            test_settings(),
        )
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Success Cases
    // ════════════════════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn creates_pending_session_for_single_cost() {
        let repo = InMemoryPaymentSessionRepository::new();
        let resolver = StaticCostResolver::new().with_costs(RESOURCE, vec![cost("10.00", "penalty")]);

        let session = handler(&repo, &resolver)
            .handle(command(), CommandMetadata::test_fixture())
            .await
            .unwrap();

        assert_eq!(session.status(), PaymentStatus::Pending);
        assert_eq!(session.amount().to_string(), "10.00");
        assert_eq!(repo.count().await, 1);
    }

    #[tokio::test]
    async fn sums_multiple_costs() {
        let repo = InMemoryPaymentSessionRepository::new();
        let resolver = StaticCostResolver::new().with_costs(
            RESOURCE,
            vec![cost("10.00", "penalty"), cost("20.00", "penalty")],
        );

        let session = handler(&repo, &resolver)
            .handle(command(), CommandMetadata::test_fixture())
            .await
            .unwrap();

        assert_eq!(session.amount(), Amount::parse("30.00").unwrap());
        assert_eq!(session.costs().len(), 2);
    }

    #[tokio::test]
    async fn stamps_creator_and_self_link() {
        let repo = InMemoryPaymentSessionRepository::new();
        let resolver = StaticCostResolver::new().with_costs(RESOURCE, vec![cost("5.00", "penalty")]);

        let session = handler(&repo, &resolver)
            .handle(command(), CommandMetadata::test_fixture())
            .await
            .unwrap();

        assert_eq!(session.created_by(), &creator());
        assert_eq!(
            session.links().self_url,
            format!("https://payments.example.com/payments/{}", session.id())
        );
        assert_eq!(session.links().resource, RESOURCE);
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Failure Cases
    // ════════════════════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn missing_state_is_invalid_request_without_fetch() {
        let repo = InMemoryPaymentSessionRepository::new();
        let resolver = StaticCostResolver::new().with_costs(RESOURCE, vec![cost("5.00", "penalty")]);
        let mut cmd = command();
        cmd.state = "  ".to_string();

        let err = handler(&repo, &resolver)
            .handle(cmd, CommandMetadata::test_fixture())
            .await
            .unwrap_err();

        assert!(matches!(err, PaymentSessionError::InvalidRequest(_)));
        assert_eq!(resolver.call_count(), 0);
    }

    #[tokio::test]
    async fn resource_outside_allow_list_is_invalid_domain() {
        let repo = InMemoryPaymentSessionRepository::new();
        let resolver = StaticCostResolver::new();
        let mut cmd = command();
        cmd.resource = "https://internal.example.org/costs".to_string();

        let err = handler(&repo, &resolver)
            .handle(cmd, CommandMetadata::test_fixture())
            .await
            .unwrap_err();

        assert!(matches!(err, PaymentSessionError::InvalidDomain(_)));
        assert_eq!(repo.count().await, 0);
    }

    #[tokio::test]
    async fn mixed_classes_are_rejected() {
        let repo = InMemoryPaymentSessionRepository::new();
        let resolver = StaticCostResolver::new().with_costs(
            RESOURCE,
            vec![cost("10.00", "penalty"), cost("20.00", "data-maintenance")],
        );

        let err = handler(&repo, &resolver)
            .handle(command(), CommandMetadata::test_fixture())
            .await
            .unwrap_err();

        assert_eq!(err, PaymentSessionError::MixedClassOfPayment);
        assert_eq!(repo.count().await, 0);
    }

    #[tokio::test]
    async fn upstream_failure_keeps_its_kind() {
        let repo = InMemoryPaymentSessionRepository::new();
        let resolver = StaticCostResolver::new();
        resolver.set_error(RESOURCE, CostResolutionError::UpstreamRejected { status: 503 });

        let err = handler(&repo, &resolver)
            .handle(command(), CommandMetadata::test_fixture())
            .await
            .unwrap_err();

        assert!(matches!(err, PaymentSessionError::UpstreamRejected(_)));
    }

    #[tokio::test]
    async fn persistence_failure_returns_no_session() {
        let repo = InMemoryPaymentSessionRepository::failing();
        let resolver = StaticCostResolver::new().with_costs(RESOURCE, vec![cost("5.00", "penalty")]);

        let err = handler(&repo, &resolver)
            .handle(command(), CommandMetadata::test_fixture())
            .await
            .unwrap_err();

        assert!(matches!(err, PaymentSessionError::Persistence(_)));
    }
}
