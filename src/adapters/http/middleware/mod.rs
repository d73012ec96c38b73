//! HTTP middleware for axum.
//!
//! - `identity` - Gateway identity middleware, extractor and role gates

pub mod identity;

pub use identity::{
    identity_middleware, require_bulk_refund, require_internal_app, GatewayIdentity,
    IdentityRejection, RequireIdentity,
};
