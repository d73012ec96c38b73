//! GOV.UK Pay wire types and status tables.

use serde::{Deserialize, Serialize};

use crate::domain::payment::{NormalizedStatus, RefundStatus};
use crate::ports::ProviderError;

use super::PROVIDER;

/// Body of `POST /v1/payments`.
#[derive(Debug, Serialize)]
pub struct CreatePaymentRequest<'a> {
    /// Pence.
    pub amount: i64,
    pub reference: &'a str,
    pub description: &'a str,
    pub return_url: String,
}

/// Payment resource as returned by create and get.
#[derive(Debug, Deserialize)]
pub struct GovPayPayment {
    pub payment_id: String,
    #[serde(default)]
    pub reference: Option<String>,
    pub state: GovPayState,
    #[serde(default)]
    pub provider_id: Option<String>,
    #[serde(default)]
    pub refund_summary: Option<RefundSummary>,
    #[serde(rename = "_links", default)]
    pub links: PaymentLinks,
}

#[derive(Debug, Deserialize)]
pub struct GovPayState {
    pub status: String,
    #[serde(default)]
    pub finished: bool,
}

#[derive(Debug, Deserialize)]
pub struct RefundSummary {
    #[serde(default)]
    pub status: Option<String>,
    /// Pence.
    pub amount_available: i64,
    #[serde(default)]
    pub amount_submitted: i64,
}

#[derive(Debug, Default, Deserialize)]
pub struct PaymentLinks {
    #[serde(rename = "self", default)]
    pub self_link: Option<Link>,
    #[serde(default)]
    pub next_url: Option<Link>,
}

#[derive(Debug, Deserialize)]
pub struct Link {
    pub href: String,
}

/// Body of `POST {payment}/refunds`.
#[derive(Debug, Serialize)]
pub struct CreateRefundRequest {
    pub amount: i64,
    pub refund_amount_available: i64,
}

#[derive(Debug, Deserialize)]
pub struct GovPayRefund {
    pub refund_id: String,
    /// Pence.
    pub amount: i64,
    pub status: String,
    #[serde(rename = "_links", default)]
    pub links: RefundLinks,
}

#[derive(Debug, Default, Deserialize)]
pub struct RefundLinks {
    #[serde(rename = "self", default)]
    pub self_link: Option<Link>,
}

/// Maps a GOV.UK Pay payment status.
pub fn normalize_payment_status(status: &str) -> Result<NormalizedStatus, ProviderError> {
    match status {
        "created" => Ok(NormalizedStatus::Created),
        "started" | "submitted" | "capturable" => Ok(NormalizedStatus::InProgress),
        "success" => Ok(NormalizedStatus::Success),
        "failed" | "error" => Ok(NormalizedStatus::Failed),
        "cancelled" => Ok(NormalizedStatus::Cancelled),
        other => Err(ProviderError::unrecognised_status(PROVIDER, other)),
    }
}

/// Maps a GOV.UK Pay refund status.
pub fn normalize_refund_status(status: &str) -> Result<RefundStatus, ProviderError> {
    match status {
        "submitted" => Ok(RefundStatus::Pending),
        "success" => Ok(RefundStatus::Success),
        "error" => Ok(RefundStatus::Error),
        other => Err(ProviderError::unrecognised_status(PROVIDER, other)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::ProviderErrorCode;

    #[test]
    fn payment_statuses_map_exhaustively() {
        assert_eq!(normalize_payment_status("created").unwrap(), NormalizedStatus::Created);
        assert_eq!(normalize_payment_status("capturable").unwrap(), NormalizedStatus::InProgress);
        assert_eq!(normalize_payment_status("success").unwrap(), NormalizedStatus::Success);
        assert_eq!(normalize_payment_status("error").unwrap(), NormalizedStatus::Failed);
        assert_eq!(normalize_payment_status("cancelled").unwrap(), NormalizedStatus::Cancelled);
    }

    #[test]
    fn unknown_payment_status_is_an_error() {
        let err = normalize_payment_status("teleported").unwrap_err();
        assert_eq!(err.code, ProviderErrorCode::UnrecognisedStatus);
        assert_eq!(err.provider_code.as_deref(), Some("teleported"));
    }

    #[test]
    fn refund_statuses_map() {
        assert_eq!(normalize_refund_status("submitted").unwrap(), RefundStatus::Pending);
        assert_eq!(normalize_refund_status("success").unwrap(), RefundStatus::Success);
        assert!(normalize_refund_status("SUCCESS").is_err());
    }

    #[test]
    fn payment_resource_decodes() {
        let json = r#"{
            "payment_id": "pay-1",
            "reference": "ref",
            "state": {"status": "success", "finished": true},
            "provider_id": "prov-7",
            "refund_summary": {"status": "available", "amount_available": 1000, "amount_submitted": 0},
            "_links": {"self": {"href": "https://pay/v1/payments/pay-1", "method": "GET"},
                       "next_url": {"href": "https://pay/secure/abc", "method": "GET"}}
        }"#;

        let payment: GovPayPayment = serde_json::from_str(json).unwrap();

        assert_eq!(payment.state.status, "success");
        assert_eq!(payment.refund_summary.unwrap().amount_available, 1000);
        assert_eq!(payment.links.next_url.unwrap().href, "https://pay/secure/abc");
    }
}
