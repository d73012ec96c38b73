//! HTTP routes for payment session and refund endpoints.

use axum::{
    middleware::{from_fn, from_fn_with_state},
    routing::{get, patch, post},
    Router,
};

use crate::adapters::http::middleware::{
    identity_middleware, require_bulk_refund, require_internal_app,
};
use crate::application::AuthorizationPolicy;

use super::handlers::{
    create_external_journey, create_payment_session, create_refund, get_payment_session,
    govpay_callback, govpay_webhook, healthcheck, ingest_govpay_bulk_refunds,
    patch_payment_session, paypal_callback, process_pending_refunds, update_refund,
    PaymentHandlers,
};

/// Creates the payment router with all endpoints.
///
/// Role gates are applied with `layer` rather than `route_layer` so that a
/// wrong verb on a gated path is refused with 401 before method matching.
pub fn payment_routes(handlers: PaymentHandlers, policy: AuthorizationPolicy) -> Router {
    let public = Router::new()
        .route("/payments", post(create_payment_session))
        .route("/payments/:id", get(get_payment_session))
        .route("/payments/:id/refunds", post(create_refund))
        .route("/payments/:id/refunds/:refund_id", patch(update_refund))
        .route("/callback/payments/govpay/webhook", post(govpay_webhook))
        .route("/callback/payments/govpay/:id", get(govpay_callback))
        .route("/callback/payments/paypal/orders/:id", get(paypal_callback))
        .route("/healthcheck", get(healthcheck));

    let internal = Router::new()
        .route("/private/payments/:id", patch(patch_payment_session))
        .route(
            "/private/payments/:id/external-journey",
            post(create_external_journey),
        )
        .layer(from_fn_with_state(policy.clone(), require_internal_app));

    let admin = Router::new()
        .route(
            "/admin/payments/bulk-refunds/process-pending",
            post(process_pending_refunds),
        )
        .route(
            "/admin/payments/bulk-refunds/govpay",
            post(ingest_govpay_bulk_refunds),
        )
        .layer(from_fn_with_state(policy, require_bulk_refund));

    public
        .merge(internal)
        .merge(admin)
        .layer(from_fn(identity_middleware))
        .with_state(handlers)
}
