//! CreateExternalJourneyHandler - starts the provider-hosted payment journey.

use std::sync::Arc;

use crate::application::ProviderRegistry;
use crate::domain::foundation::{CommandMetadata, PaymentSessionId};
use crate::domain::payment::cost::{method_available_for_all, single_class_of_payment};
use crate::domain::payment::{PaymentSession, PaymentSessionError, PaymentStatus};
use crate::ports::PaymentSessionRepository;

#[derive(Debug, Clone)]
pub struct CreateExternalJourneyCommand {
    pub session_id: PaymentSessionId,
}

#[derive(Debug, Clone)]
pub struct CreateExternalJourneyResult {
    /// Where the payer's browser goes next.
    pub redirect_url: String,
    pub session: PaymentSession,
}

pub struct CreateExternalJourneyHandler {
    repository: Arc<dyn PaymentSessionRepository>,
    providers: ProviderRegistry,
}

impl CreateExternalJourneyHandler {
    pub fn new(repository: Arc<dyn PaymentSessionRepository>, providers: ProviderRegistry) -> Self {
        Self {
            repository,
            providers,
        }
    }

    pub async fn handle(
        &self,
        cmd: CreateExternalJourneyCommand,
        metadata: CommandMetadata,
    ) -> Result<CreateExternalJourneyResult, PaymentSessionError> {
        // 1. Load
        let mut session = self
            .repository
            .find_by_id(&cmd.session_id)
            .await?
            .ok_or_else(|| PaymentSessionError::not_found(format!("session {}", cmd.session_id)))?;

        // 2. Preconditions, checked before any provider call
        if session.status() != PaymentStatus::InProgress {
            return Err(PaymentSessionError::invalid_data(format!(
                "journey requires an in-progress session, found {}",
                session.status()
            )));
        }
        if single_class_of_payment(session.costs()).is_none() {
            return Err(PaymentSessionError::MixedClassOfPayment);
        }
        let method = session
            .payment_method()
            .ok_or_else(|| PaymentSessionError::invalid_data("session has no payment method"))?;
        if !method_available_for_all(session.costs(), method) {
            return Err(PaymentSessionError::invalid_data(format!(
                "payment method {} is not available for every cost",
                method
            )));
        }

        // 3. A started journey is handed back as is
        if let Some(journey) = session.links().journey.clone() {
            return Ok(CreateExternalJourneyResult {
                redirect_url: journey,
                session,
            });
        }

        // 4. Start with the provider; on failure the session stays in progress
        let provider = self.providers.provider_for(method)?;
        let journey = provider.initiate_payment(&session).await.map_err(|e| {
            tracing::error!(
                session_id = %session.id(),
                provider = e.provider,
                error = %e,
                "journey start failed"
            );
            PaymentSessionError::from(e)
        })?;

        // 5. Persist the provider handles before the redirect leaves
        session.record_journey(
            journey.redirect_url.clone(),
            journey.status_url,
            journey.provider_payment_id,
        )?;
        self.repository.update(&session).await?;
        session.advance_version();

        tracing::info!(
            session_id = %session.id(),
            provider = method.provider_name(),
            correlation_id = %metadata.correlation_id(),
            "external journey started"
        );

        Ok(CreateExternalJourneyResult {
            redirect_url: journey.redirect_url,
            session,
        })
    }
}
