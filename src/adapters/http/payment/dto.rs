//! HTTP DTOs for payment session and refund endpoints.

use serde::{Deserialize, Serialize};

use crate::application::handlers::payment::{
    BulkRefundRowError, IngestBulkRefundsResult, ProcessPendingRefundsResult,
};
use crate::domain::payment::{
    CostItem, CreatedBy, PaymentSession, RefundRecord, SessionLinks,
};

// ════════════════════════════════════════════════════════════════════════════
// Request DTOs
// ════════════════════════════════════════════════════════════════════════════

/// Request to open a payment session.
#[derive(Debug, Clone, Deserialize)]
pub struct CreatePaymentSessionRequest {
    #[serde(default)]
    pub redirect_uri: String,
    #[serde(default)]
    pub resource: String,
    #[serde(default)]
    pub state: String,
    #[serde(default)]
    pub reference: String,
}

/// Request to refund part or all of a paid session.
///
/// The amount stays a string so malformed values get a proper 400 body
/// instead of a deserialisation rejection.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateRefundRequest {
    pub amount: String,
}

// ════════════════════════════════════════════════════════════════════════════
// Response DTOs
// ════════════════════════════════════════════════════════════════════════════

/// Payer-facing view of a session.
#[derive(Debug, Clone, Serialize)]
pub struct PaymentSessionResponse {
    pub id: String,
    pub amount: String,
    pub costs: Vec<CostItem>,
    pub class_of_payment: String,
    pub description: String,
    pub status: String,
    pub created_at: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<String>,
    pub created_by: CreatedBy,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_method: Option<String>,
    pub reference: String,
    pub links: SessionLinks,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub refunds: Vec<RefundResponse>,
    pub kind: String,
}

impl From<PaymentSession> for PaymentSessionResponse {
    fn from(session: PaymentSession) -> Self {
        Self {
            id: session.id().to_string(),
            amount: session.amount().to_string(),
            costs: session.costs().to_vec(),
            class_of_payment: session.class_of_payment().to_string(),
            description: session.description().to_string(),
            status: session.status().as_str().to_string(),
            created_at: session.created_at().as_datetime().to_rfc3339(),
            completed_at: session
                .completed_at()
                .map(|t| t.as_datetime().to_rfc3339()),
            created_by: session.created_by().clone(),
            payment_method: session.payment_method().map(|m| m.as_str().to_string()),
            reference: session.reference().to_string(),
            links: session.links().clone(),
            refunds: session.refunds().iter().map(RefundResponse::from).collect(),
            kind: session.kind().to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RefundResponse {
    pub refund_id: String,
    pub amount: String,
    pub status: String,
    pub created_at: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider_reference: Option<String>,
}

impl From<&RefundRecord> for RefundResponse {
    fn from(refund: &RefundRecord) -> Self {
        Self {
            refund_id: refund.refund_id.to_string(),
            amount: refund.amount.to_string(),
            status: refund.status.as_str().to_string(),
            created_at: refund.created_at.as_datetime().to_rfc3339(),
            provider_reference: refund.provider_reference.clone(),
        }
    }
}

/// Where to send the payer to continue with the provider.
#[derive(Debug, Clone, Serialize)]
pub struct ExternalJourneyResponse {
    pub redirect_url: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct RefundFailureResponse {
    pub session_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refund_id: Option<String>,
    pub code: String,
    pub message: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProcessPendingRefundsResponse {
    pub updated_sessions: Vec<String>,
    pub errors: Vec<RefundFailureResponse>,
}

impl From<ProcessPendingRefundsResult> for ProcessPendingRefundsResponse {
    fn from(result: ProcessPendingRefundsResult) -> Self {
        Self {
            updated_sessions: result
                .updated
                .iter()
                .map(|s| s.id().to_string())
                .collect(),
            errors: result
                .errors
                .into_iter()
                .map(|e| RefundFailureResponse {
                    session_id: e.session_id.to_string(),
                    refund_id: e.refund_id.map(|r| r.to_string()),
                    code: e.error.code().to_string(),
                    message: e.error.to_string(),
                })
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct AcceptedRowResponse {
    pub line: u64,
    pub session_id: String,
    pub refund_id: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct RejectedRowResponse {
    pub line: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_id: Option<String>,
    pub code: String,
    pub message: String,
}

impl From<BulkRefundRowError> for RejectedRowResponse {
    fn from(row: BulkRefundRowError) -> Self {
        Self {
            line: row.line,
            payment_id: row.payment_id,
            code: row.error.code().to_string(),
            message: row.error.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct BulkRefundResponse {
    pub accepted: Vec<AcceptedRowResponse>,
    pub rejected: Vec<RejectedRowResponse>,
}

impl From<IngestBulkRefundsResult> for BulkRefundResponse {
    fn from(result: IngestBulkRefundsResult) -> Self {
        Self {
            accepted: result
                .accepted
                .into_iter()
                .map(|a| AcceptedRowResponse {
                    line: a.line,
                    session_id: a.session_id.to_string(),
                    refund_id: a.refund_id.to_string(),
                })
                .collect(),
            rejected: result.rejected.into_iter().map(Into::into).collect(),
        }
    }
}

/// Error response body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ErrorResponse {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            details: None,
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new("BAD_REQUEST", message)
    }

    pub fn not_found(resource_type: &str, id: &str) -> Self {
        Self::new("NOT_FOUND", format!("{} not found: {}", resource_type, id))
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new("INTERNAL_ERROR", message)
    }

    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::foundation::{Amount, RefundId};
    use crate::domain::payment::fixtures::paid_session;
    use crate::domain::payment::{PaymentMethod, RefundStatus};

    #[test]
    fn create_request_tolerates_missing_fields() {
        let req: CreatePaymentSessionRequest =
            serde_json::from_str(r#"{"resource":"https://api.example.com/costs"}"#).unwrap();
        assert_eq!(req.resource, "https://api.example.com/costs");
        assert!(req.redirect_uri.is_empty());
    }

    #[test]
    fn session_response_uses_wire_names() {
        let mut session = paid_session("10.00", PaymentMethod::GovPay);
        session.append_refund(RefundRecord::submitted(
            RefundId::new("r-1").unwrap(),
            Amount::parse("2").unwrap(),
            RefundStatus::Pending,
            None,
            None,
        ));

        let json = serde_json::to_value(PaymentSessionResponse::from(session)).unwrap();

        assert_eq!(json["amount"], "10.00");
        assert_eq!(json["status"], "paid");
        assert_eq!(json["payment_method"], "credit-card");
        assert_eq!(json["refunds"][0]["status"], "refund-pending");
        assert_eq!(json["refunds"][0]["amount"], "2.00");
    }

    #[test]
    fn error_response_omits_empty_details() {
        let json = serde_json::to_value(ErrorResponse::bad_request("Invalid input")).unwrap();
        assert_eq!(json["code"], "BAD_REQUEST");
        assert!(json.get("details").is_none());
    }
}
