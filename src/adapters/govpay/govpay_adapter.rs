//! GOV.UK Pay payment provider adapter.
//!
//! Card payments are settled by GOV.UK Pay itself, so there is no capture
//! step. Amounts cross the wire in pence.
//!
//! # Configuration
//!
//! ```ignore
//! let config = GovPayConfig::new(api_key, "https://payments.example.gov.uk");
//! let adapter = GovPayAdapter::new(config);
//! ```

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use std::time::Duration;

use crate::domain::foundation::{Amount, RefundId};
use crate::domain::payment::{PaymentMethod, PaymentSession, RefundRecord, RefundStatus};
use crate::ports::{
    CaptureResult, ExternalJourney, PaymentProvider, ProviderError, ProviderStatus,
};

use super::types::{
    normalize_payment_status, normalize_refund_status, CreatePaymentRequest, CreateRefundRequest,
    GovPayPayment, GovPayRefund,
};
use super::PROVIDER;

/// GOV.UK Pay API configuration.
#[derive(Clone)]
pub struct GovPayConfig {
    api_key: SecretString,

    /// Base URL for the GOV.UK Pay API (default: https://publicapi.payments.service.gov.uk).
    api_base_url: String,

    /// Our own public base URL; payers come back to `{callback_base_url}/callback/payments/govpay/{id}`.
    callback_base_url: String,

    timeout: Duration,
}

impl GovPayConfig {
    pub fn new(api_key: SecretString, callback_base_url: impl Into<String>) -> Self {
        Self {
            api_key,
            api_base_url: "https://publicapi.payments.service.gov.uk".to_string(),
            callback_base_url: callback_base_url.into(),
            timeout: Duration::from_secs(10),
        }
    }

    /// Set a custom API base URL (for testing).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.api_base_url = url.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn return_url(&self, session: &PaymentSession) -> String {
        format!(
            "{}/callback/payments/govpay/{}",
            self.callback_base_url.trim_end_matches('/'),
            session.id()
        )
    }
}

/// GOV.UK Pay adapter.
pub struct GovPayAdapter {
    config: GovPayConfig,
    http_client: reqwest::Client,
}

impl GovPayAdapter {
    pub fn new(config: GovPayConfig) -> Self {
        let http_client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self {
            config,
            http_client,
        }
    }

    fn status_url<'s>(&self, session: &'s PaymentSession) -> Result<&'s str, ProviderError> {
        session
            .external()
            .status_url
            .as_deref()
            .ok_or_else(|| ProviderError::missing_reference(PROVIDER, "GOV.UK Pay status url"))
    }

    async fn fetch_payment(&self, session: &PaymentSession) -> Result<GovPayPayment, ProviderError> {
        let url = self.status_url(session)?;

        let response = self
            .http_client
            .get(url)
            .bearer_auth(self.config.api_key.expose_secret())
            .send()
            .await
            .map_err(|e| ProviderError::network(PROVIDER, e.to_string()))?;

        read_json(response, "get payment").await
    }

    async fn fetch_refund_available(&self, session: &PaymentSession) -> Result<i64, ProviderError> {
        let payment = self.fetch_payment(session).await?;
        payment
            .refund_summary
            .map(|s| s.amount_available)
            .ok_or_else(|| ProviderError::decode(PROVIDER, "payment has no refund_summary"))
    }
}

/// Checks the status code, then decodes the body.
async fn read_json<T: DeserializeOwned>(
    response: reqwest::Response,
    operation: &str,
) -> Result<T, ProviderError> {
    let status = response.status();

    if status == reqwest::StatusCode::UNAUTHORIZED {
        tracing::error!(operation, "GOV.UK Pay rejected API key");
        return Err(ProviderError::authentication(PROVIDER, "API key rejected"));
    }

    if !status.is_success() {
        let error_text = response.text().await.unwrap_or_default();
        tracing::error!(error = %error_text, status = status.as_u16(), operation, "GOV.UK Pay call failed");
        return Err(ProviderError::rejected(PROVIDER, status.as_u16(), error_text));
    }

    response.json().await.map_err(|e| {
        ProviderError::decode(
            PROVIDER,
            format!("Failed to parse GOV.UK Pay response: {}", e),
        )
    })
}

fn pence(amount: Amount) -> Result<i64, ProviderError> {
    amount
        .to_minor_units()
        .map_err(|e| ProviderError::invalid_amount(PROVIDER, e.to_string()))
}

fn from_pence(minor: i64) -> Result<Amount, ProviderError> {
    Amount::from_minor_units(minor)
        .map_err(|e| ProviderError::decode(PROVIDER, format!("bad amount {}: {}", minor, e)))
}

#[async_trait]
impl PaymentProvider for GovPayAdapter {
    fn method(&self) -> PaymentMethod {
        PaymentMethod::GovPay
    }

    async fn initiate_payment(&self, session: &PaymentSession) -> Result<ExternalJourney, ProviderError> {
        let url = format!("{}/v1/payments", self.config.api_base_url);
        let reference = session.id().to_string();
        let body = CreatePaymentRequest {
            amount: pence(session.amount())?,
            reference: &reference,
            description: session.description(),
            return_url: self.config.return_url(session),
        };

        let response = self
            .http_client
            .post(&url)
            .bearer_auth(self.config.api_key.expose_secret())
            .json(&body)
            .send()
            .await
            .map_err(|e| ProviderError::network(PROVIDER, e.to_string()))?;

        let payment: GovPayPayment = read_json(response, "create payment").await?;

        let redirect_url = payment
            .links
            .next_url
            .map(|l| l.href)
            .ok_or_else(|| ProviderError::decode(PROVIDER, "payment has no next_url link"))?;
        let status_url = payment
            .links
            .self_link
            .map(|l| l.href)
            .ok_or_else(|| ProviderError::decode(PROVIDER, "payment has no self link"))?;

        tracing::info!(
            session_id = %session.id(),
            payment_id = %payment.payment_id,
            "GOV.UK Pay payment created"
        );

        Ok(ExternalJourney {
            redirect_url,
            status_url,
            provider_payment_id: payment.payment_id,
        })
    }

    async fn check_status(&self, session: &PaymentSession) -> Result<ProviderStatus, ProviderError> {
        let payment = self.fetch_payment(session).await?;
        let status = normalize_payment_status(&payment.state.status)?;

        Ok(ProviderStatus {
            status,
            provider_reference: payment.provider_id,
        })
    }

    async fn refund_summary(&self, session: &PaymentSession) -> Result<Amount, ProviderError> {
        from_pence(self.fetch_refund_available(session).await?)
    }

    async fn create_refund(
        &self,
        session: &PaymentSession,
        amount: Amount,
    ) -> Result<RefundRecord, ProviderError> {
        let available = self.fetch_refund_available(session).await?;
        let url = format!("{}/refunds", self.status_url(session)?);
        let body = CreateRefundRequest {
            amount: pence(amount)?,
            refund_amount_available: available,
        };

        let response = self
            .http_client
            .post(&url)
            .bearer_auth(self.config.api_key.expose_secret())
            .json(&body)
            .send()
            .await
            .map_err(|e| ProviderError::network(PROVIDER, e.to_string()))?;

        let refund: GovPayRefund = read_json(response, "create refund").await?;
        let status = normalize_refund_status(&refund.status)?;
        let refund_id = RefundId::new(refund.refund_id)
            .map_err(|e| ProviderError::decode(PROVIDER, e.to_string()))?;

        Ok(RefundRecord::submitted(
            refund_id,
            from_pence(refund.amount)?,
            status,
            None,
            refund.links.self_link.map(|l| l.href),
        ))
    }

    async fn refund_status(
        &self,
        session: &PaymentSession,
        refund_id: &RefundId,
    ) -> Result<RefundStatus, ProviderError> {
        let url = format!("{}/refunds/{}", self.status_url(session)?, refund_id);

        let response = self
            .http_client
            .get(&url)
            .bearer_auth(self.config.api_key.expose_secret())
            .send()
            .await
            .map_err(|e| ProviderError::network(PROVIDER, e.to_string()))?;

        let refund: GovPayRefund = read_json(response, "get refund").await?;
        normalize_refund_status(&refund.status)
    }

    async fn capture(&self, _session: &PaymentSession) -> Result<CaptureResult, ProviderError> {
        Ok(CaptureResult::not_required())
    }
}
