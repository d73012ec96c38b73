//! Gateway identity middleware, extractors and role gates.
//!
//! The API gateway in front of this service authenticates callers and
//! forwards who they are in `ERIC-*` headers. This module turns those
//! headers into an [`AuthorizedIdentity`] and provides the route-level gates:
//!
//! ```text
//! Request → identity_middleware → injects GatewayIdentity into extensions
//!                 ↓
//!         require_internal_app / require_bulk_refund (route groups)
//!                 ↓
//!         Handler → RequireIdentity extractor reads from extensions
//! ```
//!
//! A request without a recognised identity type passes the middleware
//! untouched; the extractor and gates reject it with 401.

use axum::{
    extract::{Request, State},
    http::{HeaderMap, Method, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};

use crate::application::AuthorizationPolicy;
use crate::domain::foundation::{AuthorizedIdentity, IdentityClass, IdentityId};
use crate::domain::payment::{CreatedBy, PaymentSessionError};

pub const IDENTITY_HEADER: &str = "ERIC-Identity";
pub const IDENTITY_TYPE_HEADER: &str = "ERIC-Identity-Type";
pub const AUTHORISED_USER_HEADER: &str = "ERIC-Authorised-User";
pub const AUTHORISED_ROLES_HEADER: &str = "ERIC-Authorised-Roles";
pub const AUTHORISED_KEY_ROLES_HEADER: &str = "ERIC-Authorised-Key-Roles";

/// Identity forwarded by the gateway for one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewayIdentity {
    pub identity: AuthorizedIdentity,
    pub forename: Option<String>,
    pub surname: Option<String>,
}

impl GatewayIdentity {
    /// Creator block stamped on sessions this caller creates.
    pub fn created_by(&self) -> CreatedBy {
        CreatedBy {
            id: self.identity.id.clone(),
            email: self.identity.email.clone(),
            forename: self.forename.clone(),
            surname: self.surname.clone(),
        }
    }

    /// Reads the gateway headers. `None` when the identity or its type is
    /// missing or unrecognised.
    pub fn from_headers(headers: &HeaderMap) -> Option<Self> {
        let class = IdentityClass::from_header(header_str(headers, IDENTITY_TYPE_HEADER)?)?;
        let id = IdentityId::new(header_str(headers, IDENTITY_HEADER)?.trim()).ok()?;

        match class {
            IdentityClass::User => {
                let user = header_str(headers, AUTHORISED_USER_HEADER)
                    .map(AuthorisedUser::parse)
                    .unwrap_or_default();
                let display_name = user.display_name();
                let mut identity =
                    AuthorizedIdentity::user(id, user.email.clone().unwrap_or_default(), display_name)
                        .with_roles(split_roles(headers, AUTHORISED_ROLES_HEADER));
                identity.email = user.email;
                Some(Self {
                    identity,
                    forename: user.forename,
                    surname: user.surname,
                })
            }
            IdentityClass::Key => Some(Self {
                identity: AuthorizedIdentity::key(id)
                    .with_roles(split_roles(headers, AUTHORISED_KEY_ROLES_HEADER)),
                forename: None,
                surname: None,
            }),
        }
    }
}

/// Parsed `ERIC-Authorised-User` value: `email;forename=..;surname=..`.
#[derive(Debug, Default, PartialEq, Eq)]
struct AuthorisedUser {
    email: Option<String>,
    forename: Option<String>,
    surname: Option<String>,
}

impl AuthorisedUser {
    fn parse(raw: &str) -> Self {
        let mut parts = raw.split(';').map(str::trim);
        let mut user = AuthorisedUser {
            email: parts.next().filter(|e| !e.is_empty()).map(String::from),
            ..Default::default()
        };
        for part in parts {
            match part.split_once('=') {
                Some(("forename", value)) if !value.is_empty() => {
                    user.forename = Some(value.to_string())
                }
                Some(("surname", value)) if !value.is_empty() => {
                    user.surname = Some(value.to_string())
                }
                _ => {}
            }
        }
        user
    }

    fn display_name(&self) -> Option<String> {
        match (&self.forename, &self.surname) {
            (Some(f), Some(s)) => Some(format!("{} {}", f, s)),
            (Some(n), None) | (None, Some(n)) => Some(n.clone()),
            (None, None) => None,
        }
    }
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|h| h.to_str().ok())
        .filter(|v| !v.trim().is_empty())
}

fn split_roles(headers: &HeaderMap, name: &str) -> Vec<String> {
    header_str(headers, name)
        .map(|v| v.split_whitespace().map(String::from).collect())
        .unwrap_or_default()
}

/// Injects the gateway identity into request extensions when present.
pub async fn identity_middleware(mut request: Request, next: Next) -> Response {
    if let Some(identity) = GatewayIdentity::from_headers(request.headers()) {
        request.extensions_mut().insert(identity);
    }
    next.run(request).await
}

/// Gate for `/private` routes: an internal application key.
pub async fn require_internal_app(
    State(policy): State<AuthorizationPolicy>,
    request: Request,
    next: Next,
) -> Response {
    let identity = request
        .extensions()
        .get::<GatewayIdentity>()
        .map(|g| &g.identity);
    match policy
        .require_identity(identity)
        .and_then(|identity| policy.authorize_internal(identity))
    {
        Ok(()) => next.run(request).await,
        Err(e) => reject(e),
    }
}

/// Gate for `/admin` bulk refund routes: a key with the bulk refund role,
/// on a mutating request.
pub async fn require_bulk_refund(
    State(policy): State<AuthorizationPolicy>,
    request: Request,
    next: Next,
) -> Response {
    let is_mutation = !matches!(
        *request.method(),
        Method::GET | Method::HEAD | Method::OPTIONS
    );
    let identity = request
        .extensions()
        .get::<GatewayIdentity>()
        .map(|g| &g.identity);
    match policy
        .require_identity(identity)
        .and_then(|identity| policy.authorize_bulk_refund(identity, is_mutation))
    {
        Ok(()) => next.run(request).await,
        Err(e) => reject(e),
    }
}

fn reject(error: PaymentSessionError) -> Response {
    tracing::info!(error = %error, "request refused by role gate");
    IdentityRejection::Unauthorized.into_response()
}

/// Extractor that requires a recognised gateway identity.
#[derive(Debug, Clone)]
pub struct RequireIdentity(pub GatewayIdentity);

impl<S> axum::extract::FromRequestParts<S> for RequireIdentity
where
    S: Send + Sync,
{
    type Rejection = IdentityRejection;

    fn from_request_parts<'life0, 'life1, 'async_trait>(
        parts: &'life0 mut axum::http::request::Parts,
        _state: &'life1 S,
    ) -> std::pin::Pin<
        Box<dyn std::future::Future<Output = Result<Self, Self::Rejection>> + Send + 'async_trait>,
    >
    where
        'life0: 'async_trait,
        'life1: 'async_trait,
        Self: 'async_trait,
    {
        Box::pin(async move {
            parts
                .extensions
                .get::<GatewayIdentity>()
                .cloned()
                .map(RequireIdentity)
                .ok_or(IdentityRejection::Unauthorized)
        })
    }
}

/// Rejection for requests without a usable identity.
#[derive(Debug, Clone)]
pub enum IdentityRejection {
    Unauthorized,
}

impl IntoResponse for IdentityRejection {
    fn into_response(self) -> Response {
        match self {
            IdentityRejection::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                Json(serde_json::json!({
                    "code": "UNAUTHORIZED",
                    "message": "Unauthorized"
                })),
            )
                .into_response(),
        }
    }
}
