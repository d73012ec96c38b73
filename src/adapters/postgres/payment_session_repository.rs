//! PostgreSQL implementation of PaymentSessionRepository.
//!
//! Sessions are stored as JSONB documents. A handful of columns are lifted
//! out of the document for lookups and the optimistic version check.

use async_trait::async_trait;
use sqlx::types::Json;
use sqlx::{PgPool, Row};

use crate::domain::foundation::{DomainError, ErrorCode, PaymentSessionId};
use crate::domain::payment::{PaymentMethod, PaymentSession, RefundRecord, RefundStatus};
use crate::ports::PaymentSessionRepository;

/// PostgreSQL implementation of PaymentSessionRepository.
#[derive(Clone)]
pub struct PostgresPaymentSessionRepository {
    pool: PgPool,
}

impl PostgresPaymentSessionRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn db_error(action: &str, e: sqlx::Error) -> DomainError {
    DomainError::new(
        ErrorCode::DatabaseError,
        format!("Failed to {}: {}", action, e),
    )
}

fn row_to_session(row: sqlx::postgres::PgRow) -> Result<PaymentSession, DomainError> {
    let Json(session): Json<PaymentSession> = row
        .try_get("document")
        .map_err(|e| db_error("decode session document", e))?;
    Ok(session)
}

#[async_trait]
impl PaymentSessionRepository for PostgresPaymentSessionRepository {
    async fn create(&self, session: &PaymentSession) -> Result<(), DomainError> {
        let result = sqlx::query(
            r#"
            INSERT INTO payment_sessions (
                id, status, payment_method, provider_payment_id, version, document, created_at, updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, NOW())
            ON CONFLICT (id) DO NOTHING
            "#,
        )
        .bind(session.id().as_uuid())
        .bind(session.status().as_str())
        .bind(session.payment_method().map(|m| m.as_str()))
        .bind(session.external().provider_payment_id.as_deref())
        .bind(session.version() as i64)
        .bind(Json(session))
        .bind(session.created_at().as_datetime())
        .execute(&self.pool)
        .await
        .map_err(|e| db_error("insert payment session", e))?;

        if result.rows_affected() == 0 {
            return Err(DomainError::conflict(format!(
                "session {} already exists",
                session.id()
            )));
        }

        Ok(())
    }

    async fn find_by_id(&self, id: &PaymentSessionId) -> Result<Option<PaymentSession>, DomainError> {
        let row = sqlx::query("SELECT document FROM payment_sessions WHERE id = $1")
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| db_error("fetch payment session", e))?;

        row.map(row_to_session).transpose()
    }

    async fn update(&self, session: &PaymentSession) -> Result<(), DomainError> {
        let mut next = session.clone();
        next.advance_version();

        let result = sqlx::query(
            r#"
            UPDATE payment_sessions SET
                status = $3,
                payment_method = $4,
                provider_payment_id = $5,
                version = $6,
                document = $7,
                updated_at = NOW()
            WHERE id = $1 AND version = $2
            "#,
        )
        .bind(session.id().as_uuid())
        .bind(session.version() as i64)
        .bind(next.status().as_str())
        .bind(next.payment_method().map(|m| m.as_str()))
        .bind(next.external().provider_payment_id.as_deref())
        .bind(next.version() as i64)
        .bind(Json(&next))
        .execute(&self.pool)
        .await
        .map_err(|e| db_error("update payment session", e))?;

        if result.rows_affected() == 1 {
            return Ok(());
        }

        // Nothing matched: either the row is gone or someone else wrote first.
        let exists: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM payment_sessions WHERE id = $1")
            .bind(session.id().as_uuid())
            .fetch_one(&self.pool)
            .await
            .map_err(|e| db_error("check payment session existence", e))?;

        if exists.0 == 0 {
            Err(DomainError::new(
                ErrorCode::NotFound,
                format!("session {} not found", session.id()),
            ))
        } else {
            Err(DomainError::conflict(format!(
                "session {} was modified concurrently",
                session.id()
            ))
            .with_detail("expected_version", session.version().to_string()))
        }
    }

    async fn find_by_refund_status(
        &self,
        statuses: &[RefundStatus],
    ) -> Result<Vec<PaymentSession>, DomainError> {
        let wanted: Vec<String> = statuses.iter().map(|s| s.as_str().to_string()).collect();

        let rows = sqlx::query(
            r#"
            SELECT document FROM payment_sessions
            WHERE EXISTS (
                SELECT 1 FROM jsonb_array_elements(document->'refunds') AS r
                WHERE r->>'status' = ANY($1)
            )
            ORDER BY created_at
            "#,
        )
        .bind(&wanted)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| db_error("fetch sessions by refund status", e))?;

        rows.into_iter().map(row_to_session).collect()
    }

    async fn find_by_provider_payment_id(
        &self,
        method: PaymentMethod,
        provider_payment_id: &str,
    ) -> Result<Option<PaymentSession>, DomainError> {
        let row = sqlx::query(
            "SELECT document FROM payment_sessions WHERE payment_method = $1 AND provider_payment_id = $2",
        )
        .bind(method.as_str())
        .bind(provider_payment_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_error("fetch session by provider payment id", e))?;

        row.map(row_to_session).transpose()
    }

    async fn append_bulk_refund(
        &self,
        id: &PaymentSessionId,
        refund: &RefundRecord,
    ) -> Result<(), DomainError> {
        let result = sqlx::query(
            r#"
            UPDATE payment_sessions SET
                document = jsonb_set(
                    jsonb_set(
                        document,
                        '{refunds}',
                        COALESCE(document->'refunds', '[]'::jsonb) || jsonb_build_array($2::jsonb)
                    ),
                    '{version}',
                    to_jsonb(version + 1)
                ),
                version = version + 1,
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id.as_uuid())
        .bind(Json(refund))
        .execute(&self.pool)
        .await
        .map_err(|e| db_error("append bulk refund", e))?;

        if result.rows_affected() == 0 {
            return Err(DomainError::new(
                ErrorCode::NotFound,
                format!("session {} not found", id),
            ));
        }

        Ok(())
    }
}
