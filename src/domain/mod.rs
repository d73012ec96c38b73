//! Domain layer containing business logic and domain types.
//!
//! # Module Organization
//!
//! - `foundation` - Shared domain primitives (ids, money, identity, errors, events)
//! - `payment` - Payment sessions, cost items, refunds and their lifecycles

pub mod foundation;
pub mod payment;
