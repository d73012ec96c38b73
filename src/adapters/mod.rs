//! Adapters - Implementations of port interfaces.
//!
//! Adapters connect the domain to external systems:
//! - `cost` - Cost resource fetching (HTTP, static)
//! - `events` - Event bus implementations (in-memory, Redis)
//! - `govpay`, `paypal` - Payment provider integrations
//! - `mock` - Scriptable provider for tests and local runs
//! - `postgres`, `storage` - Session persistence
//! - `http` - axum REST surface

pub mod cost;
pub mod events;
pub mod govpay;
pub mod http;
pub mod mock;
pub mod paypal;
pub mod postgres;
pub mod storage;

#[cfg(test)]
mod test_server;

pub use events::{InMemoryEventBus, RedisEventPublisher};
