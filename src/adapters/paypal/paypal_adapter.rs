//! PayPal payment provider adapter.
//!
//! PayPal orders are approved by the payer and then captured by us, so the
//! callback sees `APPROVED` before anything is settled. Refunds are issued
//! against the capture, not the order.
//!
//! Access tokens come from the client-credentials grant and are cached until
//! shortly before they expire.

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tokio::sync::Mutex;

use crate::domain::foundation::{Amount, RefundId, Timestamp};
use crate::domain::payment::{PaymentMethod, PaymentSession, RefundRecord, RefundStatus};
use crate::ports::{
    CaptureResult, ExternalJourney, PaymentProvider, ProviderError, ProviderStatus,
};

use super::types::{
    normalize_order_status, normalize_refund_status, AccessToken, CreateOrderRequest,
    ExperienceContext, Money, Order, PayPalSource, PaymentSource, PurchaseUnitRequest, Refund,
    RefundRequest,
};
use super::PROVIDER;

/// Tokens are refreshed this many seconds before PayPal says they expire.
const TOKEN_EXPIRY_MARGIN_SECS: i64 = 60;

/// PayPal API configuration.
#[derive(Clone)]
pub struct PayPalConfig {
    client_id: String,
    client_secret: SecretString,

    /// Base URL for the PayPal REST API (default: https://api-m.paypal.com).
    api_base_url: String,

    /// Our own public base URL; payers come back to `{callback_base_url}/callback/payments/paypal/orders/{id}`.
    callback_base_url: String,

    currency: String,
    brand_name: String,
    timeout: Duration,
}

impl PayPalConfig {
    pub fn new(
        client_id: impl Into<String>,
        client_secret: SecretString,
        callback_base_url: impl Into<String>,
    ) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret,
            api_base_url: "https://api-m.paypal.com".to_string(),
            callback_base_url: callback_base_url.into(),
            currency: "GBP".to_string(),
            brand_name: String::new(),
            timeout: Duration::from_secs(10),
        }
    }

    /// Set a custom API base URL (sandbox, tests).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.api_base_url = url.into();
        self
    }

    pub fn with_currency(mut self, currency: impl Into<String>) -> Self {
        self.currency = currency.into();
        self
    }

    pub fn with_brand_name(mut self, brand_name: impl Into<String>) -> Self {
        self.brand_name = brand_name.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn return_url(&self, session: &PaymentSession) -> String {
        format!(
            "{}/callback/payments/paypal/orders/{}",
            self.callback_base_url.trim_end_matches('/'),
            session.id()
        )
    }
}

struct CachedToken {
    value: SecretString,
    expires_at: Timestamp,
}

/// PayPal adapter.
pub struct PayPalAdapter {
    config: PayPalConfig,
    http_client: reqwest::Client,
    token: Mutex<Option<CachedToken>>,
}

impl PayPalAdapter {
    pub fn new(config: PayPalConfig) -> Self {
        let http_client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self {
            config,
            http_client,
            token: Mutex::new(None),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.api_base_url.trim_end_matches('/'), path)
    }

    /// Returns a valid access token, fetching a new one when needed.
    async fn access_token(&self) -> Result<String, ProviderError> {
        let mut cached = self.token.lock().await;
        let now = Timestamp::now();
        if let Some(token) = cached.as_ref() {
            if now.is_before(&token.expires_at) {
                return Ok(token.value.expose_secret().clone());
            }
        }

        let response = self
            .http_client
            .post(self.url("/v1/oauth2/token"))
            .basic_auth(&self.config.client_id, Some(self.config.client_secret.expose_secret()))
            .form(&[("grant_type", "client_credentials")])
            .send()
            .await
            .map_err(|e| ProviderError::network(PROVIDER, e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            tracing::error!(status, "PayPal token request failed");
            return Err(ProviderError::authentication(
                PROVIDER,
                format!("token request answered {}", status),
            ));
        }

        let token: AccessToken = response.json().await.map_err(|e| {
            ProviderError::decode(PROVIDER, format!("Failed to parse PayPal token: {}", e))
        })?;

        let lifetime = (token.expires_in - TOKEN_EXPIRY_MARGIN_SECS).max(0);
        let value = token.access_token;
        *cached = Some(CachedToken {
            value: SecretString::new(value.clone()),
            expires_at: Timestamp::from_datetime(
                *now.as_datetime() + chrono::Duration::seconds(lifetime),
            ),
        });
        Ok(value)
    }

    async fn get<T: DeserializeOwned>(&self, path: &str, operation: &str) -> Result<T, ProviderError> {
        let token = self.access_token().await?;
        let response = self
            .http_client
            .get(self.url(path))
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| ProviderError::network(PROVIDER, e.to_string()))?;
        read_json(response, operation).await
    }

    async fn post<B: serde::Serialize + Sync, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
        operation: &str,
    ) -> Result<T, ProviderError> {
        let token = self.access_token().await?;
        let response = self
            .http_client
            .post(self.url(path))
            .bearer_auth(token)
            .json(body)
            .send()
            .await
            .map_err(|e| ProviderError::network(PROVIDER, e.to_string()))?;
        read_json(response, operation).await
    }

    fn order_id<'s>(&self, session: &'s PaymentSession) -> Result<&'s str, ProviderError> {
        session
            .external()
            .provider_payment_id
            .as_deref()
            .ok_or_else(|| ProviderError::missing_reference(PROVIDER, "PayPal order id"))
    }

    fn capture_id<'s>(&self, session: &'s PaymentSession) -> Result<&'s str, ProviderError> {
        session
            .external()
            .capture_id
            .as_deref()
            .ok_or_else(|| ProviderError::missing_reference(PROVIDER, "PayPal capture id"))
    }

    fn money(&self, amount: Amount) -> Money {
        Money {
            currency_code: self.config.currency.clone(),
            value: amount.to_string(),
        }
    }
}

async fn read_json<T: DeserializeOwned>(
    response: reqwest::Response,
    operation: &str,
) -> Result<T, ProviderError> {
    let status = response.status();

    if status == reqwest::StatusCode::UNAUTHORIZED {
        tracing::error!(operation, "PayPal rejected access token");
        return Err(ProviderError::authentication(PROVIDER, "access token rejected"));
    }

    if !status.is_success() {
        let error_text = response.text().await.unwrap_or_default();
        tracing::error!(error = %error_text, status = status.as_u16(), operation, "PayPal call failed");
        return Err(ProviderError::rejected(PROVIDER, status.as_u16(), error_text));
    }

    response.json().await.map_err(|e| {
        ProviderError::decode(PROVIDER, format!("Failed to parse PayPal response: {}", e))
    })
}

fn parse_money(money: &Money) -> Result<Amount, ProviderError> {
    Amount::parse(&money.value)
        .map_err(|e| ProviderError::decode(PROVIDER, format!("bad amount {}: {}", money.value, e)))
}

#[async_trait]
impl PaymentProvider for PayPalAdapter {
    fn method(&self) -> PaymentMethod {
        PaymentMethod::PayPal
    }

    async fn initiate_payment(&self, session: &PaymentSession) -> Result<ExternalJourney, ProviderError> {
        let return_url = self.config.return_url(session);
        let request = CreateOrderRequest {
            intent: "CAPTURE",
            purchase_units: vec![PurchaseUnitRequest {
                reference_id: session.id().to_string(),
                description: session.description().to_string(),
                amount: self.money(session.amount()),
            }],
            payment_source: PaymentSource {
                paypal: PayPalSource {
                    experience_context: ExperienceContext {
                        brand_name: self.config.brand_name.clone(),
                        user_action: "PAY_NOW",
                        cancel_url: return_url.clone(),
                        return_url,
                    },
                },
            },
        };

        let order: Order = self
            .post("/v2/checkout/orders", &request, "create order")
            .await?;

        let redirect_url = order
            .link("payer-action")
            .or_else(|| order.link("approve"))
            .map(str::to_string)
            .ok_or_else(|| ProviderError::decode(PROVIDER, "order has no approval link"))?;
        let status_url = order
            .link("self")
            .map(str::to_string)
            .unwrap_or_else(|| self.url(&format!("/v2/checkout/orders/{}", order.id)));

        tracing::info!(session_id = %session.id(), order_id = %order.id, "PayPal order created");

        Ok(ExternalJourney {
            redirect_url,
            status_url,
            provider_payment_id: order.id,
        })
    }

    async fn check_status(&self, session: &PaymentSession) -> Result<ProviderStatus, ProviderError> {
        let order_id = self.order_id(session)?;
        let order: Order = self
            .get(&format!("/v2/checkout/orders/{}", order_id), "get order")
            .await?;

        Ok(ProviderStatus {
            status: normalize_order_status(&order.status)?,
            provider_reference: order.capture_id(),
        })
    }

    /// Captured amount less every refund PayPal holds against the order,
    /// including refunds issued outside this service.
    async fn refund_summary(&self, session: &PaymentSession) -> Result<Amount, ProviderError> {
        let capture_id = self.capture_id(session)?;
        let order_id = self.order_id(session)?;
        let order: Order = self
            .get(&format!("/v2/checkout/orders/{}", order_id), "get order")
            .await?;

        let capture = order.capture(capture_id).ok_or_else(|| {
            ProviderError::decode(PROVIDER, format!("order has no capture {}", capture_id))
        })?;
        if capture.status.as_deref() == Some("REFUNDED") {
            return Ok(Amount::zero());
        }

        let captured = match capture.amount.as_ref() {
            Some(money) => parse_money(money)?,
            None => session.amount(),
        };
        let refunded = order
            .committed_refunds()
            .filter_map(|r| r.amount.as_ref())
            .map(parse_money)
            .collect::<Result<Vec<_>, _>>()?;
        let refunded = Amount::checked_sum(refunded)
            .ok_or_else(|| ProviderError::decode(PROVIDER, "refund total overflows"))?;

        Ok(captured.saturating_sub(refunded))
    }

    async fn create_refund(
        &self,
        session: &PaymentSession,
        amount: Amount,
    ) -> Result<RefundRecord, ProviderError> {
        let capture_id = self.capture_id(session)?;
        let request = RefundRequest {
            amount: self.money(amount),
        };

        let refund: Refund = self
            .post(
                &format!("/v2/payments/captures/{}/refund", capture_id),
                &request,
                "refund capture",
            )
            .await?;

        let status = normalize_refund_status(&refund.status)?;
        let refunded = match refund.amount.as_ref() {
            Some(money) => parse_money(money)?,
            None => amount,
        };
        let status_url = refund
            .links
            .iter()
            .find(|l| l.rel == "self")
            .map(|l| l.href.clone());
        let refund_id =
            RefundId::new(refund.id).map_err(|e| ProviderError::decode(PROVIDER, e.to_string()))?;

        Ok(RefundRecord::submitted(
            refund_id,
            refunded,
            status,
            Some(capture_id.to_string()),
            status_url,
        ))
    }

    async fn refund_status(
        &self,
        _session: &PaymentSession,
        refund_id: &RefundId,
    ) -> Result<RefundStatus, ProviderError> {
        let refund: Refund = self
            .get(&format!("/v2/payments/refunds/{}", refund_id), "get refund")
            .await?;
        normalize_refund_status(&refund.status)
    }

    async fn capture(&self, session: &PaymentSession) -> Result<CaptureResult, ProviderError> {
        let order_id = self.order_id(session)?;
        let order: Order = self
            .post(
                &format!("/v2/checkout/orders/{}/capture", order_id),
                &serde_json::json!({}),
                "capture order",
            )
            .await?;

        let status = normalize_order_status(&order.status)?;
        tracing::info!(session_id = %session.id(), order_id, status = %status, "PayPal order captured");

        Ok(CaptureResult {
            status,
            capture_id: order.capture_id(),
        })
    }
}
