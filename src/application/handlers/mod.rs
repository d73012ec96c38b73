//! Application handlers.
//!
//! Command and query handlers that orchestrate domain operations.

pub mod payment;

pub use payment::{
    // Session lifecycle
    CreatePaymentSessionCommand, CreatePaymentSessionHandler,
    GetPaymentSessionHandler, GetPaymentSessionQuery,
    PatchPaymentSessionCommand, PatchPaymentSessionHandler,
    SessionSettings,
    // Provider journey and callbacks
    CreateExternalJourneyCommand, CreateExternalJourneyHandler, CreateExternalJourneyResult,
    HandleProviderCallbackHandler, ProviderCallbackCommand, ProviderCallbackResult,
    ProviderWebhookCommand,
    // Refunds
    CreateRefundCommand, CreateRefundHandler, CreateRefundResult,
    UpdateRefundCommand, UpdateRefundHandler, UpdateRefundResult,
    ProcessPendingRefundsHandler, ProcessPendingRefundsResult, RefundProcessingError,
    AcceptedBulkRefund, BulkRefundRowError, IngestBulkRefundsCommand, IngestBulkRefundsHandler,
    IngestBulkRefundsResult,
};
