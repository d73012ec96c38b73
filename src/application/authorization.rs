//! Authorization chain for payment routes.
//!
//! Each gate either lets the request through or ends it with `Unauthorized`.
//! The HTTP layer runs the identity, internal-app and bulk-refund gates
//! before a handler is reached; the session gate needs the loaded session,
//! so handlers run it themselves after the lookup.
//!
//! ```text
//! identity gate ─► internal-app gate ─► patch / external journey
//!               ─► bulk-refund gate  ─► admin refund batch
//!               ─► handler ─► session gate (Read / Write)
//! ```

use crate::domain::foundation::AuthorizedIdentity;
use crate::domain::payment::{PaymentSession, PaymentSessionError};

/// What the caller wants to do with a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Read,
    Write,
}

/// Role names granted by the gateway.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorizationRoles {
    /// User role allowing reads of any session.
    pub lookup_admin: String,
    /// Key role for internal applications (patch, journey start).
    pub internal_app: String,
    /// Key role for the bulk refund endpoints.
    pub bulk_refund: String,
}

impl Default for AuthorizationRoles {
    fn default() -> Self {
        Self {
            lookup_admin: "/admin/payment-lookup".to_string(),
            internal_app: "internal-app".to_string(),
            bulk_refund: "payment-bulk-refund".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct AuthorizationPolicy {
    roles: AuthorizationRoles,
}

impl AuthorizationPolicy {
    pub fn new(roles: AuthorizationRoles) -> Self {
        Self { roles }
    }

    pub fn roles(&self) -> &AuthorizationRoles {
        &self.roles
    }

    /// Identity gate: a recognised caller must be present.
    pub fn require_identity<'a>(
        &self,
        identity: Option<&'a AuthorizedIdentity>,
    ) -> Result<&'a AuthorizedIdentity, PaymentSessionError> {
        identity.ok_or_else(|| PaymentSessionError::unauthorized("no recognised identity"))
    }

    /// Session gate.
    ///
    /// Reads pass for the creator or a lookup admin. Writes pass for the
    /// creator only; roles never grant write access to someone else's session.
    pub fn authorize_session(
        &self,
        identity: &AuthorizedIdentity,
        session: &PaymentSession,
        access: Access,
    ) -> Result<(), PaymentSessionError> {
        let is_creator = session.is_created_by(&identity.id);
        let allowed = match access {
            Access::Read => is_creator || identity.has_role(&self.roles.lookup_admin),
            Access::Write => is_creator,
        };

        if !allowed {
            tracing::info!(
                session_id = %session.id(),
                identity = %identity.id,
                access = ?access,
                "session access denied"
            );
            return Err(PaymentSessionError::unauthorized(format!(
                "identity may not {} this session",
                match access {
                    Access::Read => "read",
                    Access::Write => "modify",
                }
            )));
        }
        Ok(())
    }

    /// Internal-app gate: a machine key holding the internal-app role.
    pub fn authorize_internal(&self, identity: &AuthorizedIdentity) -> Result<(), PaymentSessionError> {
        if identity.is_key() && identity.has_role(&self.roles.internal_app) {
            return Ok(());
        }
        Err(PaymentSessionError::unauthorized("internal application key required"))
    }

    /// Bulk-refund gate.
    ///
    /// Requires a machine key, the bulk-refund role and a mutating request.
    /// Read-only requests are refused even when the role is present.
    pub fn authorize_bulk_refund(
        &self,
        identity: &AuthorizedIdentity,
        is_mutation: bool,
    ) -> Result<(), PaymentSessionError> {
        if !identity.is_key() {
            return Err(PaymentSessionError::unauthorized("bulk refunds require an API key"));
        }
        if !identity.has_role(&self.roles.bulk_refund) {
            return Err(PaymentSessionError::unauthorized("bulk refund role required"));
        }
        if !is_mutation {
            return Err(PaymentSessionError::unauthorized(
                "bulk refund role does not grant read access",
            ));
        }
        Ok(())
    }
}
