//! Cost resolver adapters.
//!
//! - `HttpCostResolver` - fetches cost items from the owning service
//! - `StaticCostResolver` - canned responses for tests and local runs

mod http_cost_resolver;
mod static_cost_resolver;

pub use http_cost_resolver::HttpCostResolver;
pub use static_cost_resolver::StaticCostResolver;
