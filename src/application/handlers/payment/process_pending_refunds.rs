//! ProcessPendingRefundsHandler - batch reconciliation of outstanding refunds.
//!
//! Walks every session holding a requested or pending refund. Requested
//! refunds (from bulk uploads) are submitted to the provider; pending ones
//! are re-queried. Each session is an independent failure domain: errors
//! are collected, never allowed to stop the batch.
//!
//! A submission is saved as soon as the provider accepts it. Status changes
//! from re-queries are batched into one write per session.

use std::sync::Arc;

use crate::application::ProviderRegistry;
use crate::domain::foundation::{
    CommandMetadata, ErrorCode, PaymentSessionId, RefundId, SerializableDomainEvent,
};
use crate::domain::payment::{
    PaymentProcessed, PaymentSession, PaymentSessionError, RefundRecord, RefundStatus,
};
use crate::ports::{EventPublisher, PaymentProvider, PaymentSessionRepository};

/// One failed item in a batch run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefundProcessingError {
    pub session_id: PaymentSessionId,
    /// `None` when the failure concerns the whole session (e.g. the save).
    pub refund_id: Option<RefundId>,
    pub error: PaymentSessionError,
}

#[derive(Debug, Clone, Default)]
pub struct ProcessPendingRefundsResult {
    /// Sessions with at least one refund moved, as saved.
    pub updated: Vec<PaymentSession>,
    pub errors: Vec<RefundProcessingError>,
}

impl ProcessPendingRefundsResult {
    pub fn is_empty(&self) -> bool {
        self.updated.is_empty() && self.errors.is_empty()
    }
}

pub struct ProcessPendingRefundsHandler {
    repository: Arc<dyn PaymentSessionRepository>,
    providers: ProviderRegistry,
    event_publisher: Arc<dyn EventPublisher>,
}

/// Saves attempted after a provider accepted a refund.
const SUBMISSION_SAVE_ATTEMPTS: u32 = 3;

/// Outcome of working through one session's refunds.
struct SessionPass {
    changed: bool,
    dirty: bool,
    settled: Vec<RefundId>,
}

impl ProcessPendingRefundsHandler {
    pub fn new(
        repository: Arc<dyn PaymentSessionRepository>,
        providers: ProviderRegistry,
        event_publisher: Arc<dyn EventPublisher>,
    ) -> Self {
        Self {
            repository,
            providers,
            event_publisher,
        }
    }

    /// Only the initial scan can fail the whole run.
    pub async fn handle(
        &self,
        metadata: CommandMetadata,
    ) -> Result<ProcessPendingRefundsResult, PaymentSessionError> {
        let sessions = self
            .repository
            .find_by_refund_status(&[RefundStatus::Requested, RefundStatus::Pending])
            .await?;

        tracing::info!(sessions = sessions.len(), "processing pending refunds");

        let mut result = ProcessPendingRefundsResult::default();
        for session in sessions {
            self.process_session(session, &metadata, &mut result).await;
        }

        tracing::info!(
            updated = result.updated.len(),
            errors = result.errors.len(),
            "pending refund run finished"
        );
        Ok(result)
    }

    async fn process_session(
        &self,
        mut session: PaymentSession,
        metadata: &CommandMetadata,
        result: &mut ProcessPendingRefundsResult,
    ) {
        let session_id = *session.id();

        let provider = match session
            .payment_method()
            .ok_or_else(|| PaymentSessionError::invalid_data("session has no payment method"))
            .and_then(|m| self.providers.provider_for(m))
        {
            Ok(provider) => provider,
            Err(error) => {
                result.errors.push(RefundProcessingError {
                    session_id,
                    refund_id: None,
                    error,
                });
                return;
            }
        };

        // 1. Work through each outstanding refund
        let pass = self
            .reconcile_refunds(&mut session, provider.as_ref(), &mut result.errors)
            .await;
        if !pass.dirty && !pass.changed {
            return;
        }

        // 2. One versioned write for whatever submissions did not already save
        if pass.dirty {
            if let Err(e) = self.repository.update(&session).await {
                tracing::error!(session_id = %session_id, error = %e, "saving reconciled refunds failed");
                result.errors.push(RefundProcessingError {
                    session_id,
                    refund_id: None,
                    error: e.into(),
                });
                return;
            }
            session.advance_version();
        }

        // 3. One event per settled refund
        let settled = pass
            .settled
            .into_iter()
            .filter(|id| session.refund(id).map_or(false, |r| r.is_settled()));
        for refund_id in settled {
            let envelope = PaymentProcessed::refund_settled(session_id, refund_id.clone())
                .to_envelope()
                .with_correlation_id(metadata.correlation_id());
            if let Err(e) = self.event_publisher.publish(envelope).await {
                tracing::error!(session_id = %session_id, refund_id = %refund_id, error = %e, "refund settled event not delivered");
                result.errors.push(RefundProcessingError {
                    session_id,
                    refund_id: Some(refund_id),
                    error: PaymentSessionError::event_delivery(e),
                });
            }
        }

        if pass.changed {
            result.updated.push(session);
        }
    }

    async fn reconcile_refunds(
        &self,
        session: &mut PaymentSession,
        provider: &dyn PaymentProvider,
        errors: &mut Vec<RefundProcessingError>,
    ) -> SessionPass {
        let mut pass = SessionPass {
            changed: false,
            dirty: false,
            settled: Vec::new(),
        };

        for refund_id in session.outstanding_refund_ids() {
            let (outcome, saved) = match session.refund(&refund_id).map(|r| r.status) {
                Some(RefundStatus::Requested) => {
                    (self.submit(session, provider, &refund_id).await, true)
                }
                Some(_) => (self.refresh(session, provider, &refund_id).await, false),
                None => continue,
            };

            match outcome {
                Ok(Some(current_id)) => {
                    pass.changed = true;
                    // A saved submission carries every earlier change with it
                    pass.dirty = !saved;
                    if session.refund(&current_id).map_or(false, |r| r.is_settled()) {
                        pass.settled.push(current_id);
                    }
                }
                Ok(None) => {}
                Err(error) => {
                    tracing::warn!(
                        session_id = %session.id(),
                        refund_id = %refund_id,
                        error = %error,
                        "refund reconciliation failed"
                    );
                    if let Some(refund) = session.refund_mut(&refund_id) {
                        refund.record_attempt();
                        pass.dirty = true;
                    }
                    errors.push(RefundProcessingError {
                        session_id: *session.id(),
                        refund_id: Some(refund_id),
                        error,
                    });
                }
            }
        }

        pass
    }

    /// Submits a locally requested refund and saves the session straight
    /// away, so a later run never submits it twice. Returns the provider's
    /// refund id.
    async fn submit(
        &self,
        session: &mut PaymentSession,
        provider: &dyn PaymentProvider,
        refund_id: &RefundId,
    ) -> Result<Option<RefundId>, PaymentSessionError> {
        let amount = session
            .refund(refund_id)
            .map(|r| r.amount)
            .ok_or_else(|| PaymentSessionError::not_found(format!("refund {}", refund_id)))?;

        let available = provider.refund_summary(session).await?;
        if amount > available {
            return Err(PaymentSessionError::InsufficientRefundable {
                requested: amount.to_string(),
                available: available.to_string(),
            });
        }

        let submitted = provider.create_refund(session, amount).await?;
        apply_submission(session, refund_id, &submitted)?;

        tracing::info!(
            session_id = %session.id(),
            refund_id = %submitted.refund_id,
            "requested refund submitted"
        );

        if let Err(e) = self.save_submission(session, refund_id, &submitted).await {
            tracing::error!(
                session_id = %session.id(),
                refund_id = %submitted.refund_id,
                error = %e,
                "submitted refund could not be saved"
            );
            return Err(e);
        }
        Ok(Some(submitted.refund_id))
    }

    /// Writes a freshly submitted refund, retrying a few times. On a version
    /// conflict the session is reloaded and the submission re-applied.
    async fn save_submission(
        &self,
        session: &mut PaymentSession,
        local_id: &RefundId,
        submitted: &RefundRecord,
    ) -> Result<(), PaymentSessionError> {
        let mut attempt = 1;
        loop {
            let error = match self.repository.update(session).await {
                Ok(()) => {
                    session.advance_version();
                    return Ok(());
                }
                Err(e) => e,
            };
            if attempt >= SUBMISSION_SAVE_ATTEMPTS {
                return Err(error.into());
            }
            tracing::warn!(
                session_id = %session.id(),
                attempt,
                error = %error,
                "retrying save of submitted refund"
            );

            if error.code == ErrorCode::Conflict {
                let mut fresh = self
                    .repository
                    .find_by_id(session.id())
                    .await?
                    .ok_or_else(|| PaymentSessionError::not_found(format!("session {}", session.id())))?;
                apply_submission(&mut fresh, local_id, submitted)?;
                *session = fresh;
            }
            attempt += 1;
        }
    }

    /// Re-queries a pending refund. Returns its id if the status moved.
    async fn refresh(
        &self,
        session: &mut PaymentSession,
        provider: &dyn PaymentProvider,
        refund_id: &RefundId,
    ) -> Result<Option<RefundId>, PaymentSessionError> {
        let status = provider.refund_status(session, refund_id).await?;
        let refund = session
            .refund_mut(refund_id)
            .ok_or_else(|| PaymentSessionError::not_found(format!("refund {}", refund_id)))?;
        if refund.apply_status(status)? {
            Ok(Some(refund_id.clone()))
        } else {
            Ok(None)
        }
    }
}

/// Replaces the local placeholder with the provider's refund. A refund the
/// stored copy already moved past `Requested` is left as stored.
fn apply_submission(
    session: &mut PaymentSession,
    local_id: &RefundId,
    submitted: &RefundRecord,
) -> Result<(), PaymentSessionError> {
    match session.refund(local_id).map(|r| r.status) {
        Some(RefundStatus::Requested) => {}
        Some(_) => return Ok(()),
        None if session.refund(&submitted.refund_id).is_some() => return Ok(()),
        None => return Err(PaymentSessionError::not_found(format!("refund {}", local_id))),
    }
    let refund = session
        .refund_mut(local_id)
        .ok_or_else(|| PaymentSessionError::not_found(format!("refund {}", local_id)))?;
    refund.mark_submitted(
        submitted.refund_id.clone(),
        submitted.status,
        submitted.provider_reference.clone(),
        submitted.status_url.clone(),
    )?;
    Ok(())
}
