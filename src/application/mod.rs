//! Application layer - Commands, Queries, and Handlers.
//!
//! This layer orchestrates domain operations and coordinates between ports.
//! Handlers receive their ports and settings at construction and never look
//! anything up from ambient state.

pub mod authorization;
pub mod handlers;
mod provider_registry;

pub use authorization::{Access, AuthorizationPolicy, AuthorizationRoles};
pub use handlers::*;
pub use provider_registry::ProviderRegistry;
