//! Payment Orchestrator - payment sessions and refunds across GOV.UK Pay and PayPal
//!
//! Payers are sent to an external provider to pay for costs owned by other
//! services. This crate tracks each attempt as a payment session, reconciles
//! it with the provider when the payer returns, and manages refunds against
//! settled sessions.

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;
