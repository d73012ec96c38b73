//! HTTP handlers for payment session and refund endpoints.

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Redirect, Response},
    Json,
};

use crate::adapters::govpay::{GovPayWebhookVerifier, SIGNATURE_HEADER};
use crate::adapters::http::middleware::{GatewayIdentity, RequireIdentity};
use crate::application::handlers::payment::{
    CreateExternalJourneyCommand, CreateExternalJourneyHandler, CreatePaymentSessionCommand,
    CreatePaymentSessionHandler, CreateRefundCommand, CreateRefundHandler,
    GetPaymentSessionHandler, GetPaymentSessionQuery, HandleProviderCallbackHandler,
    IngestBulkRefundsCommand, IngestBulkRefundsHandler, PatchPaymentSessionCommand,
    PatchPaymentSessionHandler, ProcessPendingRefundsHandler, ProviderCallbackCommand,
    ProviderWebhookCommand, SessionSettings, UpdateRefundCommand, UpdateRefundHandler,
};
use crate::application::{AuthorizationPolicy, ProviderRegistry};
use crate::domain::foundation::{Amount, CommandMetadata, PaymentSessionId, RefundId};
use crate::domain::payment::{PaymentMethod, PaymentSessionError, SessionPatch};
use crate::ports::{CostResolver, EventPublisher, PaymentSessionRepository};

use super::dto::{
    BulkRefundResponse, CreatePaymentSessionRequest, CreateRefundRequest, ErrorResponse,
    ExternalJourneyResponse, PaymentSessionResponse, ProcessPendingRefundsResponse,
    RefundResponse,
};

/// Header set by the request-id layer; reused as the correlation id.
const REQUEST_ID_HEADER: &str = "x-request-id";

// ════════════════════════════════════════════════════════════════════════════
// Handler state
// ════════════════════════════════════════════════════════════════════════════

#[derive(Clone)]
pub struct PaymentHandlers {
    create_handler: Arc<CreatePaymentSessionHandler>,
    get_handler: Arc<GetPaymentSessionHandler>,
    patch_handler: Arc<PatchPaymentSessionHandler>,
    journey_handler: Arc<CreateExternalJourneyHandler>,
    callback_handler: Arc<HandleProviderCallbackHandler>,
    create_refund_handler: Arc<CreateRefundHandler>,
    update_refund_handler: Arc<UpdateRefundHandler>,
    process_pending_handler: Arc<ProcessPendingRefundsHandler>,
    bulk_refund_handler: Arc<IngestBulkRefundsHandler>,
    webhook_verifier: Option<Arc<GovPayWebhookVerifier>>,
}

impl PaymentHandlers {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        create_handler: Arc<CreatePaymentSessionHandler>,
        get_handler: Arc<GetPaymentSessionHandler>,
        patch_handler: Arc<PatchPaymentSessionHandler>,
        journey_handler: Arc<CreateExternalJourneyHandler>,
        callback_handler: Arc<HandleProviderCallbackHandler>,
        create_refund_handler: Arc<CreateRefundHandler>,
        update_refund_handler: Arc<UpdateRefundHandler>,
        process_pending_handler: Arc<ProcessPendingRefundsHandler>,
        bulk_refund_handler: Arc<IngestBulkRefundsHandler>,
    ) -> Self {
        Self {
            create_handler,
            get_handler,
            patch_handler,
            journey_handler,
            callback_handler,
            create_refund_handler,
            update_refund_handler,
            process_pending_handler,
            bulk_refund_handler,
            webhook_verifier: None,
        }
    }

    /// Builds every handler from one set of ports.
    pub fn from_ports(
        repository: Arc<dyn PaymentSessionRepository>,
        cost_resolver: Arc<dyn CostResolver>,
        providers: ProviderRegistry,
        event_publisher: Arc<dyn EventPublisher>,
        policy: AuthorizationPolicy,
        settings: SessionSettings,
    ) -> Self {
        Self::new(
            Arc::new(CreatePaymentSessionHandler::new(
                repository.clone(),
                cost_resolver.clone(),
                settings.clone(),
            )),
            Arc::new(GetPaymentSessionHandler::new(
                repository.clone(),
                cost_resolver,
                policy.clone(),
                settings.clone(),
            )),
            Arc::new(PatchPaymentSessionHandler::new(
                repository.clone(),
                settings.clone(),
            )),
            Arc::new(CreateExternalJourneyHandler::new(
                repository.clone(),
                providers.clone(),
            )),
            Arc::new(HandleProviderCallbackHandler::new(
                repository.clone(),
                providers.clone(),
                event_publisher.clone(),
                settings,
            )),
            Arc::new(CreateRefundHandler::new(
                repository.clone(),
                providers.clone(),
                event_publisher.clone(),
                policy.clone(),
            )),
            Arc::new(UpdateRefundHandler::new(
                repository.clone(),
                providers.clone(),
                event_publisher.clone(),
                policy,
            )),
            Arc::new(ProcessPendingRefundsHandler::new(
                repository.clone(),
                providers,
                event_publisher,
            )),
            Arc::new(IngestBulkRefundsHandler::new(repository)),
        )
    }

    /// Enables the GOV.UK Pay webhook endpoint.
    pub fn with_webhook_verifier(mut self, verifier: GovPayWebhookVerifier) -> Self {
        self.webhook_verifier = Some(Arc::new(verifier));
        self
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Session endpoints
// ════════════════════════════════════════════════════════════════════════════

/// POST /payments - Open a payment session
pub async fn create_payment_session(
    State(handlers): State<PaymentHandlers>,
    RequireIdentity(caller): RequireIdentity,
    headers: HeaderMap,
    Json(req): Json<CreatePaymentSessionRequest>,
) -> Response {
    let cmd = CreatePaymentSessionCommand {
        redirect_uri: req.redirect_uri,
        resource: req.resource,
        state: req.state,
        reference: req.reference,
        created_by: caller.created_by(),
    };

    match handlers
        .create_handler
        .handle(cmd, metadata(&headers, Some(&caller), "api"))
        .await
    {
        Ok(session) => {
            let response: PaymentSessionResponse = session.into();
            (StatusCode::CREATED, Json(response)).into_response()
        }
        Err(e) => handle_payment_error(e),
    }
}

/// GET /payments/:id - Read a session
pub async fn get_payment_session(
    State(handlers): State<PaymentHandlers>,
    RequireIdentity(caller): RequireIdentity,
    Path(session_id): Path<String>,
) -> Response {
    let session_id = match parse_session_id(&session_id) {
        Ok(id) => id,
        Err(response) => return response,
    };

    let query = GetPaymentSessionQuery {
        session_id,
        requester: caller.identity,
    };

    match handlers.get_handler.handle(query).await {
        Ok(Some(session)) => {
            let response: PaymentSessionResponse = session.into();
            (StatusCode::OK, Json(response)).into_response()
        }
        Ok(None) => (
            StatusCode::NOT_FOUND,
            Json(ErrorResponse::not_found("Payment session", &session_id.to_string())),
        )
            .into_response(),
        Err(e) => handle_payment_error(e),
    }
}

/// PATCH /private/payments/:id - Internal status / method update
pub async fn patch_payment_session(
    State(handlers): State<PaymentHandlers>,
    RequireIdentity(caller): RequireIdentity,
    Path(session_id): Path<String>,
    headers: HeaderMap,
    Json(patch): Json<SessionPatch>,
) -> Response {
    let session_id = match parse_session_id(&session_id) {
        Ok(id) => id,
        Err(response) => return response,
    };

    let cmd = PatchPaymentSessionCommand { session_id, patch };

    match handlers
        .patch_handler
        .handle(cmd, metadata(&headers, Some(&caller), "internal"))
        .await
    {
        Ok(session) => {
            let response: PaymentSessionResponse = session.into();
            (StatusCode::OK, Json(response)).into_response()
        }
        Err(e) => handle_payment_error(e),
    }
}

/// POST /private/payments/:id/external-journey - Start the provider journey
pub async fn create_external_journey(
    State(handlers): State<PaymentHandlers>,
    RequireIdentity(caller): RequireIdentity,
    Path(session_id): Path<String>,
    headers: HeaderMap,
) -> Response {
    let session_id = match parse_session_id(&session_id) {
        Ok(id) => id,
        Err(response) => return response,
    };

    match handlers
        .journey_handler
        .handle(
            CreateExternalJourneyCommand { session_id },
            metadata(&headers, Some(&caller), "internal"),
        )
        .await
    {
        Ok(result) => {
            let response = ExternalJourneyResponse {
                redirect_url: result.redirect_url,
            };
            (StatusCode::OK, Json(response)).into_response()
        }
        Err(e) => handle_payment_error(e),
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Provider callbacks
// ════════════════════════════════════════════════════════════════════════════

/// GET /callback/payments/govpay/:id - GOV.UK Pay return URL
pub async fn govpay_callback(
    State(handlers): State<PaymentHandlers>,
    Path(session_id): Path<String>,
    headers: HeaderMap,
) -> Response {
    provider_callback(handlers, session_id, PaymentMethod::GovPay, headers).await
}

/// GET /callback/payments/paypal/orders/:id - PayPal return URL
pub async fn paypal_callback(
    State(handlers): State<PaymentHandlers>,
    Path(session_id): Path<String>,
    headers: HeaderMap,
) -> Response {
    provider_callback(handlers, session_id, PaymentMethod::PayPal, headers).await
}

async fn provider_callback(
    handlers: PaymentHandlers,
    session_id: String,
    channel: PaymentMethod,
    headers: HeaderMap,
) -> Response {
    let session_id = match parse_session_id(&session_id) {
        Ok(id) => id,
        Err(response) => return response,
    };

    let cmd = ProviderCallbackCommand {
        session_id,
        channel,
    };

    match handlers
        .callback_handler
        .handle(cmd, metadata(&headers, None, "callback"))
        .await
    {
        Ok(result) => Redirect::to(&result.redirect_url).into_response(),
        Err(e) => handle_callback_error(e),
    }
}

/// POST /callback/payments/govpay/webhook - Signed GOV.UK Pay notification
pub async fn govpay_webhook(
    State(handlers): State<PaymentHandlers>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let Some(verifier) = handlers.webhook_verifier.as_ref() else {
        return (
            StatusCode::NOT_FOUND,
            Json(ErrorResponse::not_found("Webhook endpoint", "govpay")),
        )
            .into_response();
    };

    let Some(signature) = headers.get(SIGNATURE_HEADER).and_then(|h| h.to_str().ok()) else {
        return handle_payment_error(PaymentSessionError::unauthorized("missing webhook signature"));
    };

    let event = match verifier.verify(&body, signature) {
        Ok(event) => event,
        Err(e) => return handle_payment_error(e.into()),
    };

    tracing::info!(
        event_type = %event.event_type,
        provider_payment_id = %event.payment_id,
        "GOV.UK Pay webhook received"
    );

    let cmd = ProviderWebhookCommand {
        channel: PaymentMethod::GovPay,
        provider_payment_id: event.payment_id,
        reference: event.reference,
    };

    match handlers
        .callback_handler
        .handle_webhook(cmd, metadata(&headers, None, "webhook"))
        .await
    {
        Ok(result) => (
            StatusCode::OK,
            Json(serde_json::json!({
                "session_id": result.session.id().to_string(),
                "status": result.session.status().as_str(),
            })),
        )
            .into_response(),
        // The provider retries anything but 2xx; a settled session needs no retry
        Err(PaymentSessionError::Conflict(message)) => {
            tracing::debug!(message = %message, "webhook for settled session ignored");
            StatusCode::OK.into_response()
        }
        Err(e) => handle_payment_error(e),
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Refund endpoints
// ════════════════════════════════════════════════════════════════════════════

/// POST /payments/:id/refunds - Refund a paid session
pub async fn create_refund(
    State(handlers): State<PaymentHandlers>,
    RequireIdentity(caller): RequireIdentity,
    Path(session_id): Path<String>,
    headers: HeaderMap,
    Json(req): Json<CreateRefundRequest>,
) -> Response {
    let session_id = match parse_session_id(&session_id) {
        Ok(id) => id,
        Err(response) => return response,
    };
    let amount = match Amount::parse(&req.amount) {
        Ok(amount) => amount,
        Err(e) => return handle_payment_error(e.into()),
    };

    let metadata = metadata(&headers, Some(&caller), "api");
    let cmd = CreateRefundCommand {
        session_id,
        amount,
        requester: caller.identity,
    };

    match handlers.create_refund_handler.handle(cmd, metadata).await {
        Ok(result) => {
            let response = RefundResponse::from(&result.refund);
            (StatusCode::CREATED, Json(response)).into_response()
        }
        Err(e) => handle_payment_error(e),
    }
}

/// PATCH /payments/:id/refunds/:refund_id - Refresh a refund's status
pub async fn update_refund(
    State(handlers): State<PaymentHandlers>,
    RequireIdentity(caller): RequireIdentity,
    Path((session_id, refund_id)): Path<(String, String)>,
    headers: HeaderMap,
) -> Response {
    let session_id = match parse_session_id(&session_id) {
        Ok(id) => id,
        Err(response) => return response,
    };
    let refund_id = match RefundId::new(refund_id) {
        Ok(id) => id,
        Err(_) => {
            return (
                StatusCode::BAD_REQUEST,
                Json(ErrorResponse::bad_request("Invalid refund ID")),
            )
                .into_response()
        }
    };

    let metadata = metadata(&headers, Some(&caller), "api");
    let cmd = UpdateRefundCommand {
        session_id,
        refund_id,
        requester: caller.identity,
    };

    match handlers.update_refund_handler.handle(cmd, metadata).await {
        Ok(result) => {
            let response = RefundResponse::from(&result.refund);
            (StatusCode::OK, Json(response)).into_response()
        }
        Err(e) => handle_payment_error(e),
    }
}

/// POST /admin/payments/bulk-refunds/process-pending - Reconcile outstanding refunds
pub async fn process_pending_refunds(
    State(handlers): State<PaymentHandlers>,
    RequireIdentity(caller): RequireIdentity,
    headers: HeaderMap,
) -> Response {
    match handlers
        .process_pending_handler
        .handle(metadata(&headers, Some(&caller), "admin"))
        .await
    {
        Ok(result) => {
            let response: ProcessPendingRefundsResponse = result.into();
            (StatusCode::OK, Json(response)).into_response()
        }
        Err(e) => handle_payment_error(e),
    }
}

/// POST /admin/payments/bulk-refunds/govpay - Upload a GOV.UK Pay refund file
pub async fn ingest_govpay_bulk_refunds(
    State(handlers): State<PaymentHandlers>,
    RequireIdentity(caller): RequireIdentity,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    if body.is_empty() {
        return handle_payment_error(PaymentSessionError::invalid_request("empty refund file"));
    }

    let cmd = IngestBulkRefundsCommand {
        method: PaymentMethod::GovPay,
        file: body.to_vec(),
    };

    match handlers
        .bulk_refund_handler
        .handle(cmd, metadata(&headers, Some(&caller), "admin"))
        .await
    {
        Ok(result) => {
            let response: BulkRefundResponse = result.into();
            (StatusCode::OK, Json(response)).into_response()
        }
        Err(e) => handle_payment_error(e),
    }
}

/// GET /healthcheck
pub async fn healthcheck() -> Response {
    (StatusCode::OK, Json(serde_json::json!({ "status": "ok" }))).into_response()
}

// ════════════════════════════════════════════════════════════════════════════
// Helpers
// ════════════════════════════════════════════════════════════════════════════

fn parse_session_id(raw: &str) -> Result<PaymentSessionId, Response> {
    raw.parse::<PaymentSessionId>().map_err(|_| {
        (
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse::bad_request("Invalid payment session ID")),
        )
            .into_response()
    })
}

fn metadata(
    headers: &HeaderMap,
    caller: Option<&GatewayIdentity>,
    source: &str,
) -> CommandMetadata {
    let base = match caller {
        Some(caller) => CommandMetadata::for_actor(caller.identity.id.clone()),
        None => CommandMetadata::anonymous(),
    };
    let base = base.with_source(source);
    match headers.get(REQUEST_ID_HEADER).and_then(|h| h.to_str().ok()) {
        Some(request_id) => base.with_correlation_id(request_id),
        None => base,
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Error handling
// ════════════════════════════════════════════════════════════════════════════

/// Maps an application error onto the fixed set of HTTP outcomes.
///
/// 4xx bodies carry the error message; 5xx bodies are generic and the
/// detail only goes to the log.
pub fn handle_payment_error(error: PaymentSessionError) -> Response {
    let status = error_status(&error);

    if error.is_contract_violation() {
        tracing::warn!(error = %error, code = %error.code(), "provider contract violation");
    }

    let body = if status.is_server_error() {
        tracing::error!(error = %error, code = %error.code(), "request failed");
        ErrorResponse::new(error.code().to_string(), generic_message(status))
    } else {
        ErrorResponse::new(error.code().to_string(), error.to_string())
    };

    (status, Json(body)).into_response()
}

/// Error mapping for the browser-facing callback routes.
///
/// Anyone holding a session id can hit these, so 4xx bodies are generic
/// too and the detail only goes to the log.
pub fn handle_callback_error(error: PaymentSessionError) -> Response {
    let status = error_status(&error);
    if status.is_server_error() {
        return handle_payment_error(error);
    }

    tracing::warn!(error = %error, code = %error.code(), "provider callback refused");
    let body = ErrorResponse::new(error.code().to_string(), callback_message(status));
    (status, Json(body)).into_response()
}

fn error_status(error: &PaymentSessionError) -> StatusCode {
    match error {
        PaymentSessionError::InvalidRequest(_)
        | PaymentSessionError::InvalidData(_)
        | PaymentSessionError::InvalidDomain(_)
        | PaymentSessionError::InvalidCost(_)
        | PaymentSessionError::MixedClassOfPayment
        | PaymentSessionError::InsufficientRefundable { .. }
        | PaymentSessionError::UnsupportedProviderOnJourney(_) => StatusCode::BAD_REQUEST,
        PaymentSessionError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
        PaymentSessionError::Forbidden(_) => StatusCode::FORBIDDEN,
        PaymentSessionError::NotFound(_) => StatusCode::NOT_FOUND,
        PaymentSessionError::Conflict(_) | PaymentSessionError::MethodMismatch { .. } => {
            StatusCode::CONFLICT
        }
        PaymentSessionError::UpstreamRejected(_)
        | PaymentSessionError::DecodeError(_)
        | PaymentSessionError::UnrecognisedProviderStatus { .. } => StatusCode::BAD_GATEWAY,
        PaymentSessionError::UpstreamUnreachable(_) => StatusCode::SERVICE_UNAVAILABLE,
        PaymentSessionError::Persistence(_) | PaymentSessionError::EventDelivery(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

fn callback_message(status: StatusCode) -> &'static str {
    match status {
        StatusCode::NOT_FOUND => "Payment session not found",
        StatusCode::CONFLICT => "Payment session cannot accept this callback",
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => "Payment could not be verified",
        _ => "Invalid payment callback",
    }
}

fn generic_message(status: StatusCode) -> &'static str {
    match status {
        StatusCode::BAD_GATEWAY => "Payment provider returned an unexpected response",
        StatusCode::SERVICE_UNAVAILABLE => "Payment provider is unavailable, try again later",
        _ => "Internal server error",
    }
}
