//! HTTP-level identity and role gate tests.
//!
//! Drives the full payment router with `oneshot` requests carrying (or
//! omitting) the gateway's `ERIC-*` headers.

use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::http::{Method, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tower::ServiceExt;

use payment_orchestrator::adapters::cost::StaticCostResolver;
use payment_orchestrator::adapters::http::{payment_routes, PaymentHandlers};
use payment_orchestrator::adapters::mock::MockPaymentProvider;
use payment_orchestrator::adapters::storage::InMemoryPaymentSessionRepository;
use payment_orchestrator::adapters::InMemoryEventBus;
use payment_orchestrator::application::handlers::payment::SessionSettings;
use payment_orchestrator::application::{AuthorizationPolicy, ProviderRegistry};
use payment_orchestrator::domain::payment::{CostItem, ExpiryPolicy};
use payment_orchestrator::ports::AllowList;

const RESOURCE: &str = "https://api.example.com/transactions/1/payment";
const SESSION_ID: &str = "6f1c2a7e-3b1d-4c8e-9a55-0d2f7b9e4c31";

// ════════════════════════════════════════════════════════════════════════════
// Test Infrastructure
// ════════════════════════════════════════════════════════════════════════════

fn app() -> Router {
    let cost: CostItem = serde_json::from_value(json!({
        "amount": "10.00",
        "available_payment_methods": ["credit-card"],
        "class_of_payment": ["data-maintenance"],
        "description": "Certified copy",
    }))
    .unwrap();
    let resolver = StaticCostResolver::new().with_costs(RESOURCE, vec![cost]);

    let policy = AuthorizationPolicy::default();
    let handlers = PaymentHandlers::from_ports(
        Arc::new(InMemoryPaymentSessionRepository::new()),
        Arc::new(resolver),
        ProviderRegistry::new().with_provider(Arc::new(MockPaymentProvider::govpay())),
        Arc::new(InMemoryEventBus::new()),
        policy.clone(),
        SessionSettings::new(
            AllowList::new(["api.example.com"]),
            ExpiryPolicy::from_minutes(90),
            "https://payments.example.com",
        ),
    );
    payment_routes(handlers, policy)
}

fn user_request(method: Method, uri: &str, user: &str) -> axum::http::request::Builder {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("ERIC-Identity", user)
        .header("ERIC-Identity-Type", "oauth2")
        .header("ERIC-Authorised-User", "ada@example.com;forename=Ada;surname=Lovelace")
}

fn key_request(method: Method, uri: &str, roles: &str) -> axum::http::request::Builder {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("ERIC-Identity", "api-key-1")
        .header("ERIC-Identity-Type", "key")
        .header("ERIC-Authorised-Key-Roles", roles)
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn create_body() -> Body {
    Body::from(
        json!({
            "redirect_uri": "https://caller.example.com/done",
            "resource": RESOURCE,
            "state": "opaque-state",
            "reference": "ref-1",
        })
        .to_string(),
    )
}

// ════════════════════════════════════════════════════════════════════════════
// Identity
// ════════════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn create_without_identity_is_401() {
    let request = Request::builder()
        .method(Method::POST)
        .uri("/payments")
        .header("content-type", "application/json")
        .body(create_body())
        .unwrap();

    let response = app().oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_json(response).await["code"], "UNAUTHORIZED");
}

#[tokio::test]
async fn unknown_identity_type_is_401() {
    let request = Request::builder()
        .method(Method::GET)
        .uri(format!("/payments/{}", SESSION_ID))
        .header("ERIC-Identity", "user-1")
        .header("ERIC-Identity-Type", "session-cookie")
        .body(Body::empty())
        .unwrap();

    let response = app().oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn creator_can_read_back_their_session() {
    let app = app();
    let create = user_request(Method::POST, "/payments", "user-1")
        .header("content-type", "application/json")
        .body(create_body())
        .unwrap();

    let response = app.clone().oneshot(create).await.unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let created = body_json(response).await;
    assert_eq!(created["amount"], "10.00");
    assert_eq!(created["status"], "pending");
    let id = created["id"].as_str().unwrap().to_string();

    let read = user_request(Method::GET, &format!("/payments/{}", id), "user-1")
        .body(Body::empty())
        .unwrap();
    let response = app.clone().oneshot(read).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["id"], id.as_str());

    let stranger = user_request(Method::GET, &format!("/payments/{}", id), "user-2")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(stranger).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn unknown_session_is_404() {
    let request = user_request(Method::GET, &format!("/payments/{}", SESSION_ID), "user-1")
        .body(Body::empty())
        .unwrap();

    let response = app().oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn callback_on_wrong_channel_does_not_echo_details() {
    let app = app();
    let create = user_request(Method::POST, "/payments", "user-1")
        .header("content-type", "application/json")
        .body(create_body())
        .unwrap();
    let created = body_json(app.clone().oneshot(create).await.unwrap()).await;
    let id = created["id"].as_str().unwrap().to_string();

    let callback = Request::builder()
        .uri(format!("/callback/payments/paypal/orders/{}", id))
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(callback).await.unwrap();

    assert_eq!(response.status(), StatusCode::CONFLICT);
    let body = body_json(response).await;
    assert_eq!(body["code"], "METHOD_MISMATCH");
    let message = body["message"].as_str().unwrap();
    assert!(!message.contains("PayPal"));
    assert!(!message.contains("none"));
}

// ════════════════════════════════════════════════════════════════════════════
// Internal application gate
// ════════════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn private_patch_by_user_is_401() {
    let request = user_request(
        Method::PATCH,
        &format!("/private/payments/{}", SESSION_ID),
        "user-1",
    )
    .header("content-type", "application/json")
    .body(Body::from(json!({ "payment_method": "credit-card" }).to_string()))
    .unwrap();

    let response = app().oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn private_journey_by_key_without_role_is_401() {
    let request = key_request(
        Method::POST,
        &format!("/private/payments/{}/external-journey", SESSION_ID),
        "some-other-role",
    )
    .body(Body::empty())
    .unwrap();

    let response = app().oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn private_patch_by_internal_key_reaches_handler() {
    let request = key_request(
        Method::PATCH,
        &format!("/private/payments/{}", SESSION_ID),
        "internal-app",
    )
    .header("content-type", "application/json")
    .body(Body::from(json!({ "payment_method": "credit-card" }).to_string()))
    .unwrap();

    let response = app().oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

// ════════════════════════════════════════════════════════════════════════════
// Bulk refund gate
// ════════════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn bulk_route_read_is_401_even_with_role() {
    let request = key_request(
        Method::GET,
        "/admin/payments/bulk-refunds/process-pending",
        "payment-bulk-refund",
    )
    .body(Body::empty())
    .unwrap();

    let response = app().oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn bulk_route_by_user_is_401() {
    let request = user_request(
        Method::POST,
        "/admin/payments/bulk-refunds/process-pending",
        "user-1",
    )
    .body(Body::empty())
    .unwrap();

    let response = app().oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn bulk_key_can_process_pending_refunds() {
    let request = key_request(
        Method::POST,
        "/admin/payments/bulk-refunds/process-pending",
        "payment-bulk-refund",
    )
    .body(Body::empty())
    .unwrap();

    let response = app().oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["updated_sessions"], json!([]));
    assert_eq!(body["errors"], json!([]));
}

#[tokio::test]
async fn healthcheck_needs_no_identity() {
    let request = Request::builder()
        .uri("/healthcheck")
        .body(Body::empty())
        .unwrap();

    let response = app().oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}
