//! Payment session and refund command/query handlers.

mod create_external_journey;
mod create_payment_session;
mod create_refund;
mod get_payment_session;
mod handle_provider_callback;
mod ingest_bulk_refunds;
mod patch_payment_session;
mod process_pending_refunds;
pub(crate) mod settings;
mod update_refund;

pub use create_external_journey::{
    CreateExternalJourneyCommand, CreateExternalJourneyHandler, CreateExternalJourneyResult,
};
pub use create_payment_session::{CreatePaymentSessionCommand, CreatePaymentSessionHandler};
pub use create_refund::{CreateRefundCommand, CreateRefundHandler, CreateRefundResult};
pub use get_payment_session::{GetPaymentSessionHandler, GetPaymentSessionQuery};
pub use handle_provider_callback::{
    HandleProviderCallbackHandler, ProviderCallbackCommand, ProviderCallbackResult,
    ProviderWebhookCommand,
};
pub use ingest_bulk_refunds::{
    AcceptedBulkRefund, BulkRefundRowError, IngestBulkRefundsCommand, IngestBulkRefundsHandler,
    IngestBulkRefundsResult,
};
pub use patch_payment_session::{PatchPaymentSessionCommand, PatchPaymentSessionHandler};
pub use process_pending_refunds::{
    ProcessPendingRefundsHandler, ProcessPendingRefundsResult, RefundProcessingError,
};
pub use settings::SessionSettings;
pub use update_refund::{UpdateRefundCommand, UpdateRefundHandler, UpdateRefundResult};
