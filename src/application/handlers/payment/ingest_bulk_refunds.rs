//! IngestBulkRefundsHandler - records refunds from an uploaded CSV file.
//!
//! The file has a `payment_id,refund_amount` header and one row per refund.
//! Valid rows become `refund-requested` records for the pending-refund run
//! to submit; invalid rows are reported with their line number.

use std::sync::Arc;

use serde::Deserialize;

use crate::domain::foundation::{Amount, CommandMetadata, PaymentSessionId, RefundId};
use crate::domain::payment::{PaymentMethod, PaymentSessionError, RefundRecord};
use crate::ports::PaymentSessionRepository;

#[derive(Debug, Clone)]
pub struct IngestBulkRefundsCommand {
    /// Provider whose payment ids the file uses.
    pub method: PaymentMethod,
    pub file: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AcceptedBulkRefund {
    pub line: u64,
    pub session_id: PaymentSessionId,
    pub refund_id: RefundId,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BulkRefundRowError {
    pub line: u64,
    pub payment_id: Option<String>,
    pub error: PaymentSessionError,
}

#[derive(Debug, Clone, Default)]
pub struct IngestBulkRefundsResult {
    pub accepted: Vec<AcceptedBulkRefund>,
    pub rejected: Vec<BulkRefundRowError>,
}

#[derive(Debug, Deserialize)]
struct BulkRefundRow {
    payment_id: String,
    refund_amount: String,
}

pub struct IngestBulkRefundsHandler {
    repository: Arc<dyn PaymentSessionRepository>,
}

impl IngestBulkRefundsHandler {
    pub fn new(repository: Arc<dyn PaymentSessionRepository>) -> Self {
        Self { repository }
    }

    pub async fn handle(
        &self,
        cmd: IngestBulkRefundsCommand,
        metadata: CommandMetadata,
    ) -> Result<IngestBulkRefundsResult, PaymentSessionError> {
        let mut reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(cmd.file.as_slice());

        // The header decides whether this is a bulk refund file at all
        let headers = reader
            .headers()
            .map_err(|e| PaymentSessionError::invalid_request(format!("unreadable file: {}", e)))?
            .clone();
        for required in ["payment_id", "refund_amount"] {
            if !headers.iter().any(|h| h == required) {
                return Err(PaymentSessionError::invalid_request(format!(
                    "missing column '{}'",
                    required
                )));
            }
        }

        let mut result = IngestBulkRefundsResult::default();
        for record in reader.records() {
            let (line, row) = match record {
                Ok(record) => {
                    let line = record.position().map_or(0, |p| p.line());
                    match record.deserialize::<BulkRefundRow>(Some(&headers)) {
                        Ok(row) => (line, row),
                        Err(e) => {
                            result.rejected.push(BulkRefundRowError {
                                line,
                                payment_id: None,
                                error: PaymentSessionError::invalid_data(e.to_string()),
                            });
                            continue;
                        }
                    }
                }
                Err(e) => {
                    result.rejected.push(BulkRefundRowError {
                        line: e.position().map_or(0, |p| p.line()),
                        payment_id: None,
                        error: PaymentSessionError::invalid_data(e.to_string()),
                    });
                    continue;
                }
            };

            match self.accept_row(cmd.method, &row).await {
                Ok((session_id, refund_id)) => result.accepted.push(AcceptedBulkRefund {
                    line,
                    session_id,
                    refund_id,
                }),
                Err(error) => result.rejected.push(BulkRefundRowError {
                    line,
                    payment_id: Some(row.payment_id),
                    error,
                }),
            }
        }

        tracing::info!(
            provider = cmd.method.provider_name(),
            accepted = result.accepted.len(),
            rejected = result.rejected.len(),
            correlation_id = %metadata.correlation_id(),
            "bulk refund file ingested"
        );

        Ok(result)
    }

    async fn accept_row(
        &self,
        method: PaymentMethod,
        row: &BulkRefundRow,
    ) -> Result<(PaymentSessionId, RefundId), PaymentSessionError> {
        let amount = Amount::parse(&row.refund_amount)?;
        if amount.is_zero() {
            return Err(PaymentSessionError::invalid_data("refund amount must be positive"));
        }

        let session = self
            .repository
            .find_by_provider_payment_id(method, &row.payment_id)
            .await?
            .ok_or_else(|| {
                PaymentSessionError::not_found(format!("no session for payment {}", row.payment_id))
            })?;
        session.ensure_refundable()?;
        if amount > session.amount() {
            return Err(PaymentSessionError::invalid_data(format!(
                "refund {} exceeds payment amount {}",
                amount,
                session.amount()
            )));
        }

        let refund = RefundRecord::requested(amount);
        self.repository
            .append_bulk_refund(session.id(), &refund)
            .await?;

        Ok((*session.id(), refund.refund_id))
    }
}
