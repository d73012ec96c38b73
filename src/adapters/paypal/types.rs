//! PayPal Orders v2 / Payments v2 wire types and status tables.

use serde::{Deserialize, Serialize};

use crate::domain::payment::{NormalizedStatus, RefundStatus};
use crate::ports::ProviderError;

use super::PROVIDER;

#[derive(Debug, Deserialize)]
pub struct AccessToken {
    pub access_token: String,
    /// Seconds.
    #[serde(default)]
    pub expires_in: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Money {
    pub currency_code: String,
    pub value: String,
}

#[derive(Debug, Serialize)]
pub struct CreateOrderRequest {
    pub intent: &'static str,
    pub purchase_units: Vec<PurchaseUnitRequest>,
    pub payment_source: PaymentSource,
}

#[derive(Debug, Serialize)]
pub struct PurchaseUnitRequest {
    pub reference_id: String,
    pub description: String,
    pub amount: Money,
}

#[derive(Debug, Serialize)]
pub struct PaymentSource {
    pub paypal: PayPalSource,
}

#[derive(Debug, Serialize)]
pub struct PayPalSource {
    pub experience_context: ExperienceContext,
}

#[derive(Debug, Serialize)]
pub struct ExperienceContext {
    pub brand_name: String,
    pub user_action: &'static str,
    pub return_url: String,
    pub cancel_url: String,
}

#[derive(Debug, Deserialize)]
pub struct Order {
    pub id: String,
    pub status: String,
    #[serde(default)]
    pub links: Vec<LinkDescription>,
    #[serde(default)]
    pub purchase_units: Vec<PurchaseUnit>,
}

impl Order {
    pub fn link(&self, rel: &str) -> Option<&str> {
        self.links
            .iter()
            .find(|l| l.rel == rel)
            .map(|l| l.href.as_str())
    }

    /// First capture id in the order, if it has been captured.
    pub fn capture_id(&self) -> Option<String> {
        self.purchase_units
            .iter()
            .filter_map(|u| u.payments.as_ref())
            .flat_map(|p| p.captures.iter())
            .map(|c| c.id.clone())
            .next()
    }

    /// Capture with the given id, if the order holds it.
    pub fn capture(&self, capture_id: &str) -> Option<&Capture> {
        self.payments().flat_map(|p| p.captures.iter()).find(|c| c.id == capture_id)
    }

    /// Refunds PayPal has accepted against the order and not failed.
    pub fn committed_refunds(&self) -> impl Iterator<Item = &Refund> {
        self.payments()
            .flat_map(|p| p.refunds.iter())
            .filter(|r| matches!(r.status.as_str(), "COMPLETED" | "PENDING"))
    }

    fn payments(&self) -> impl Iterator<Item = &Payments> {
        self.purchase_units.iter().filter_map(|u| u.payments.as_ref())
    }
}

#[derive(Debug, Deserialize)]
pub struct LinkDescription {
    pub href: String,
    pub rel: String,
}

#[derive(Debug, Deserialize)]
pub struct PurchaseUnit {
    #[serde(default)]
    pub payments: Option<Payments>,
}

#[derive(Debug, Deserialize)]
pub struct Payments {
    #[serde(default)]
    pub captures: Vec<Capture>,
    #[serde(default)]
    pub refunds: Vec<Refund>,
}

#[derive(Debug, Deserialize)]
pub struct Capture {
    pub id: String,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub amount: Option<Money>,
}

#[derive(Debug, Serialize)]
pub struct RefundRequest {
    pub amount: Money,
}

#[derive(Debug, Deserialize)]
pub struct Refund {
    pub id: String,
    pub status: String,
    #[serde(default)]
    pub amount: Option<Money>,
    #[serde(default)]
    pub links: Vec<LinkDescription>,
}

/// Maps a PayPal order status.
pub fn normalize_order_status(status: &str) -> Result<NormalizedStatus, ProviderError> {
    match status {
        "CREATED" => Ok(NormalizedStatus::Created),
        "SAVED" | "PAYER_ACTION_REQUIRED" => Ok(NormalizedStatus::InProgress),
        "APPROVED" => Ok(NormalizedStatus::Approved),
        "COMPLETED" => Ok(NormalizedStatus::Success),
        "VOIDED" => Ok(NormalizedStatus::Cancelled),
        other => Err(ProviderError::unrecognised_status(PROVIDER, other)),
    }
}

/// Maps a PayPal refund status.
pub fn normalize_refund_status(status: &str) -> Result<RefundStatus, ProviderError> {
    match status {
        "PENDING" => Ok(RefundStatus::Pending),
        "COMPLETED" => Ok(RefundStatus::Success),
        "FAILED" | "CANCELLED" => Ok(RefundStatus::Error),
        other => Err(ProviderError::unrecognised_status(PROVIDER, other)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn approved_is_not_success() {
        assert_eq!(normalize_order_status("APPROVED").unwrap(), NormalizedStatus::Approved);
        assert_eq!(normalize_order_status("COMPLETED").unwrap(), NormalizedStatus::Success);
        assert_eq!(
            normalize_order_status("PAYER_ACTION_REQUIRED").unwrap(),
            NormalizedStatus::InProgress
        );
        assert_eq!(normalize_order_status("VOIDED").unwrap(), NormalizedStatus::Cancelled);
        assert!(normalize_order_status("completed").is_err());
    }

    #[test]
    fn refund_statuses_map() {
        assert_eq!(normalize_refund_status("PENDING").unwrap(), RefundStatus::Pending);
        assert_eq!(normalize_refund_status("COMPLETED").unwrap(), RefundStatus::Success);
        assert_eq!(normalize_refund_status("CANCELLED").unwrap(), RefundStatus::Error);
        assert!(normalize_refund_status("UNKNOWN").is_err());
    }

    #[test]
    fn order_exposes_links_and_capture() {
        let order: Order = serde_json::from_value(serde_json::json!({
            "id": "ORDER-1",
            "status": "COMPLETED",
            "links": [
                {"href": "https://api/v2/checkout/orders/ORDER-1", "rel": "self", "method": "GET"},
                {"href": "https://paypal/checkoutnow?token=ORDER-1", "rel": "payer-action", "method": "GET"}
            ],
            "purchase_units": [{"payments": {"captures": [{"id": "CAP-1", "status": "COMPLETED"}]}}]
        }))
        .unwrap();

        assert_eq!(order.link("payer-action"), Some("https://paypal/checkoutnow?token=ORDER-1"));
        assert_eq!(order.link("approve"), None);
        assert_eq!(order.capture_id().as_deref(), Some("CAP-1"));
    }

    #[test]
    fn committed_refunds_skip_failed_ones() {
        let order: Order = serde_json::from_value(serde_json::json!({
            "id": "ORDER-1",
            "status": "COMPLETED",
            "purchase_units": [{"payments": {
                "captures": [{"id": "CAP-1", "status": "PARTIALLY_REFUNDED"}],
                "refunds": [
                    {"id": "RF-1", "status": "COMPLETED", "amount": {"currency_code": "GBP", "value": "2.00"}},
                    {"id": "RF-2", "status": "PENDING", "amount": {"currency_code": "GBP", "value": "1.00"}},
                    {"id": "RF-3", "status": "FAILED", "amount": {"currency_code": "GBP", "value": "5.00"}}
                ]
            }}]
        }))
        .unwrap();

        let ids: Vec<&str> = order.committed_refunds().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["RF-1", "RF-2"]);
        assert!(order.capture("CAP-1").is_some());
        assert!(order.capture("CAP-2").is_none());
    }
}
