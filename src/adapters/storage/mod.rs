//! Storage Adapters
//!
//! - **InMemoryPaymentSessionRepository** - sessions in memory (tests, local runs)
//!
//! The production store lives in `adapters::postgres`.

mod in_memory_session_repository;

pub use in_memory_session_repository::InMemoryPaymentSessionRepository;
