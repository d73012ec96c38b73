//! GetPaymentSessionHandler - Query handler for reading a session.
//!
//! Reads are not side-effect free: an overdue session is expired and saved,
//! and the stored amount is re-verified against freshly fetched costs.

use std::sync::Arc;

use crate::application::authorization::{Access, AuthorizationPolicy};
use crate::domain::foundation::{AuthorizedIdentity, PaymentSessionId, Timestamp};
use crate::domain::payment::{PaymentSession, PaymentSessionError};
use crate::ports::{CostResolver, PaymentSessionRepository};

use super::SessionSettings;

/// Query to get a session by ID.
#[derive(Debug, Clone)]
pub struct GetPaymentSessionQuery {
    pub session_id: PaymentSessionId,
    pub requester: AuthorizedIdentity,
}

/// Handler for retrieving sessions.
pub struct GetPaymentSessionHandler {
    repository: Arc<dyn PaymentSessionRepository>,
    cost_resolver: Arc<dyn CostResolver>,
    policy: AuthorizationPolicy,
    settings: SessionSettings,
}

impl GetPaymentSessionHandler {
    pub fn new(
        repository: Arc<dyn PaymentSessionRepository>,
        cost_resolver: Arc<dyn CostResolver>,
        policy: AuthorizationPolicy,
        settings: SessionSettings,
    ) -> Self {
        Self {
            repository,
            cost_resolver,
            policy,
            settings,
        }
    }

    /// Returns `Ok(None)` when no session has this id.
    pub async fn handle(
        &self,
        query: GetPaymentSessionQuery,
    ) -> Result<Option<PaymentSession>, PaymentSessionError> {
        // Fetch the session
        let Some(mut session) = self.repository.find_by_id(&query.session_id).await? else {
            return Ok(None);
        };

        // Authorization check - creator or lookup admin
        self.policy
            .authorize_session(&query.requester, &session, Access::Read)?;

        // Lazy expiry
        if session.expire_if_due(&self.settings.expiry, Timestamp::now()) {
            self.repository.update(&session).await?;
            session.advance_version();
            tracing::info!(session_id = %session.id(), "payment session expired on read");
        }

        // Drift check against the cost resource
        let costs = self
            .cost_resolver
            .resolve(&session.links().resource, &self.settings.allow_list)
            .await?;
        if let Err(err) = session.ensure_amount_matches(&costs) {
            tracing::warn!(session_id = %session.id(), error = %err, "session amount drifted from cost resource");
            return Err(err);
        }

        Ok(Some(session))
    }
}
