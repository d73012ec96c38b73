//! Ports - Interfaces between the application core and the outside world.
//!
//! - `PaymentSessionRepository` - session persistence
//! - `EventPublisher` - outbound completion / refund events
//! - `CostResolver` - external cost resources
//! - `PaymentProvider` - GOV.UK Pay, PayPal

mod cost_resolver;
mod event_publisher;
mod payment_provider;
mod payment_session_repository;

pub use cost_resolver::{AllowList, CostResolutionError, CostResolver};
pub use event_publisher::EventPublisher;
pub use payment_provider::{
    CaptureResult, ExternalJourney, PaymentProvider, ProviderError, ProviderErrorCode,
    ProviderStatus,
};
pub use payment_session_repository::PaymentSessionRepository;
