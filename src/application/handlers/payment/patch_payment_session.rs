//! PatchPaymentSessionHandler - Command handler for partial session updates.

use std::sync::Arc;

use crate::domain::foundation::{CommandMetadata, PaymentSessionId, Timestamp};
use crate::domain::payment::{PaymentSession, PaymentSessionError, SessionPatch};
use crate::ports::PaymentSessionRepository;

use super::SessionSettings;

/// Command to merge `patch` into a session.
#[derive(Debug, Clone)]
pub struct PatchPaymentSessionCommand {
    pub session_id: PaymentSessionId,
    pub patch: SessionPatch,
}

pub struct PatchPaymentSessionHandler {
    repository: Arc<dyn PaymentSessionRepository>,
    settings: SessionSettings,
}

impl PatchPaymentSessionHandler {
    pub fn new(repository: Arc<dyn PaymentSessionRepository>, settings: SessionSettings) -> Self {
        Self {
            repository,
            settings,
        }
    }

    pub async fn handle(
        &self,
        cmd: PatchPaymentSessionCommand,
        metadata: CommandMetadata,
    ) -> Result<PaymentSession, PaymentSessionError> {
        if cmd.patch.is_empty() {
            return Err(PaymentSessionError::invalid_request("patch contains no fields"));
        }

        // 1. Load
        let mut session = self
            .repository
            .find_by_id(&cmd.session_id)
            .await?
            .ok_or_else(|| PaymentSessionError::not_found(format!("session {}", cmd.session_id)))?;

        let now = Timestamp::now();

        // 2. Lazy expiry; an expired session then refuses the patch as terminal
        if session.expire_if_due(&self.settings.expiry, now) {
            self.repository.update(&session).await?;
            tracing::info!(session_id = %session.id(), "payment session expired on patch");
            return Err(PaymentSessionError::conflict("session has expired"));
        }

        // 3. Merge and persist
        session.apply_patch(cmd.patch, now)?;
        self.repository.update(&session).await?;
        session.advance_version();

        tracing::info!(
            session_id = %session.id(),
            status = %session.status(),
            source = metadata.source().unwrap_or("internal"),
            correlation_id = %metadata.correlation_id(),
            "payment session patched"
        );

        Ok(session)
    }
}
