//! HTTP adapter for payment session and refund endpoints.

mod dto;
mod handlers;
mod routes;

pub use dto::{
    BulkRefundResponse, CreatePaymentSessionRequest, CreateRefundRequest, ErrorResponse,
    ExternalJourneyResponse, PaymentSessionResponse, ProcessPendingRefundsResponse,
    RefundResponse,
};
pub use handlers::{handle_payment_error, PaymentHandlers};
pub use routes::payment_routes;
