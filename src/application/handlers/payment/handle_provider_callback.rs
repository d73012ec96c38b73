//! HandleProviderCallbackHandler - reconciles a session with its provider.
//!
//! Runs once per provider notification, whether the payer's browser came
//! back through the return URL or the provider sent a signed webhook. The
//! provider's own status report is authoritative; the callback only says
//! "go and look".

use std::str::FromStr;
use std::sync::Arc;

use reqwest::Url;

use crate::application::ProviderRegistry;
use crate::domain::foundation::{CommandMetadata, PaymentSessionId, SerializableDomainEvent, Timestamp};
use crate::domain::payment::{
    NormalizedStatus, PaymentMethod, PaymentProcessed, PaymentSession, PaymentSessionError,
};
use crate::ports::{EventPublisher, PaymentSessionRepository};

use super::SessionSettings;

/// Return-redirect callback for one session.
#[derive(Debug, Clone)]
pub struct ProviderCallbackCommand {
    pub session_id: PaymentSessionId,
    /// Provider the callback arrived from.
    pub channel: PaymentMethod,
}

/// Verified webhook naming a provider payment.
#[derive(Debug, Clone)]
pub struct ProviderWebhookCommand {
    pub channel: PaymentMethod,
    pub provider_payment_id: String,
    /// Our reference as echoed by the provider (the session id).
    pub reference: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ProviderCallbackResult {
    /// Caller's redirect URI with `state`, `ref` and `status` appended.
    pub redirect_url: String,
    pub provider_status: NormalizedStatus,
    pub session: PaymentSession,
}

pub struct HandleProviderCallbackHandler {
    repository: Arc<dyn PaymentSessionRepository>,
    providers: ProviderRegistry,
    event_publisher: Arc<dyn EventPublisher>,
    settings: SessionSettings,
}

impl HandleProviderCallbackHandler {
    pub fn new(
        repository: Arc<dyn PaymentSessionRepository>,
        providers: ProviderRegistry,
        event_publisher: Arc<dyn EventPublisher>,
        settings: SessionSettings,
    ) -> Self {
        Self {
            repository,
            providers,
            event_publisher,
            settings,
        }
    }

    pub async fn handle(
        &self,
        cmd: ProviderCallbackCommand,
        metadata: CommandMetadata,
    ) -> Result<ProviderCallbackResult, PaymentSessionError> {
        let session = self
            .repository
            .find_by_id(&cmd.session_id)
            .await?
            .ok_or_else(|| PaymentSessionError::not_found(format!("session {}", cmd.session_id)))?;

        self.reconcile(session, cmd.channel, metadata).await
    }

    /// Resolves the session named by a webhook, then reconciles it.
    ///
    /// The provider payment id is tried first, then the echoed reference.
    pub async fn handle_webhook(
        &self,
        cmd: ProviderWebhookCommand,
        metadata: CommandMetadata,
    ) -> Result<ProviderCallbackResult, PaymentSessionError> {
        let mut session = self
            .repository
            .find_by_provider_payment_id(cmd.channel, &cmd.provider_payment_id)
            .await?;

        if session.is_none() {
            if let Some(id) = cmd
                .reference
                .as_deref()
                .and_then(|r| PaymentSessionId::from_str(r).ok())
            {
                session = self.repository.find_by_id(&id).await?;
            }
        }

        let session = session.ok_or_else(|| {
            PaymentSessionError::not_found(format!(
                "no session for {} payment {}",
                cmd.channel.provider_name(),
                cmd.provider_payment_id
            ))
        })?;

        self.reconcile(session, cmd.channel, metadata).await
    }

    async fn reconcile(
        &self,
        mut session: PaymentSession,
        channel: PaymentMethod,
        metadata: CommandMetadata,
    ) -> Result<ProviderCallbackResult, PaymentSessionError> {
        // 1. Channel must match the stored method
        if session.payment_method() != Some(channel) {
            let err = PaymentSessionError::MethodMismatch {
                stored: session
                    .payment_method()
                    .map(|m| m.as_str().to_string())
                    .unwrap_or_else(|| "none".to_string()),
                channel: channel.as_str().to_string(),
            };
            tracing::error!(session_id = %session.id(), error = %err, "callback channel mismatch");
            return Err(err);
        }

        // 2. Only one terminal transition is accepted
        if session.is_terminal() {
            return Err(PaymentSessionError::conflict(format!(
                "session already {}",
                session.status()
            )));
        }

        let now = Timestamp::now();

        // 3. Overdue sessions expire without asking the provider
        if session.expire_if_due(&self.settings.expiry, now) {
            self.repository.update(&session).await?;
            tracing::info!(session_id = %session.id(), "payment session expired on callback");
            return Err(PaymentSessionError::forbidden("session has expired"));
        }

        // 4. Ask the provider; approved payments are captured first
        let provider = self.providers.provider_for(channel)?;
        let report = provider.check_status(&session).await.map_err(|e| {
            tracing::error!(session_id = %session.id(), provider = e.provider, error = %e, "status check failed");
            PaymentSessionError::from(e)
        })?;

        let mut status = report.status;
        if status == NormalizedStatus::Approved {
            let capture = provider.capture(&session).await?;
            session.record_capture(capture.capture_id);
            status = capture.status;
            tracing::info!(session_id = %session.id(), status = %status, "approved payment captured");
        }

        // 5. Apply and persist
        let settled = session.apply_provider_status(status, report.provider_reference, now)?;
        self.repository.update(&session).await?;
        session.advance_version();

        // 6. Announce a terminal outcome; the status change stands either way
        if let Some(final_status) = settled {
            tracing::info!(
                session_id = %session.id(),
                status = %final_status,
                provider = channel.provider_name(),
                "payment session settled"
            );
            let envelope = PaymentProcessed::settled(*session.id(), final_status)
                .to_envelope()
                .with_correlation_id(metadata.correlation_id());
            if let Err(e) = self.event_publisher.publish(envelope).await {
                tracing::error!(session_id = %session.id(), error = %e, "payment processed event not delivered");
                return Err(PaymentSessionError::event_delivery(e));
            }
        }

        // 7. Send the payer back to the caller
        let redirect_url = build_redirect(&session, status)?;

        Ok(ProviderCallbackResult {
            redirect_url,
            provider_status: status,
            session,
        })
    }
}

/// Appends `state`, `ref` and `status` to the session's redirect URI.
fn build_redirect(session: &PaymentSession, status: NormalizedStatus) -> Result<String, PaymentSessionError> {
    let mut url = Url::parse(session.redirect_uri()).map_err(|e| {
        PaymentSessionError::invalid_data(format!("redirect uri {}: {}", session.redirect_uri(), e))
    })?;
    url.query_pairs_mut()
        .append_pair("state", session.state())
        .append_pair("ref", session.reference())
        .append_pair("status", status.redirect_status());
    Ok(url.to_string())
}
