//! PostgreSQL adapters - Database implementations for repository ports.
//!
//! - `PostgresPaymentSessionRepository` - payment session documents (JSONB)

mod payment_session_repository;

pub use payment_session_repository::PostgresPaymentSessionRepository;
