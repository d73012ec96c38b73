//! Caller identity types for the domain layer.
//!
//! An `AuthorizedIdentity` is derived per request from the headers asserted
//! by the upstream API gateway. It is never persisted; the pieces that need
//! to outlive the request are copied into a `CreatedBy` on the session.
//!
//! ```ignore
//! let identity = AuthorizedIdentity::user(IdentityId::new("u-1")?, "a@b.com", Some("Ada Lovelace".into()));
//! request.extensions_mut().insert(identity);
//! ```

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

use super::IdentityId;

/// Class of caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IdentityClass {
    /// Interactive user authenticated through OAuth2.
    User,
    /// Machine caller authenticated with an API key.
    Key,
}

impl IdentityClass {
    /// Parses the gateway's identity-type header value.
    pub fn from_header(value: &str) -> Option<Self> {
        match value.trim() {
            "oauth2" => Some(IdentityClass::User),
            "key" => Some(IdentityClass::Key),
            _ => None,
        }
    }
}

impl fmt::Display for IdentityClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IdentityClass::User => write!(f, "oauth2"),
            IdentityClass::Key => write!(f, "key"),
        }
    }
}

/// Caller identity established for one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorizedIdentity {
    pub id: IdentityId,
    pub class: IdentityClass,
    pub email: Option<String>,
    pub display_name: Option<String>,
    pub roles: BTreeSet<String>,
}

impl AuthorizedIdentity {
    /// Creates an interactive user identity.
    pub fn user(id: IdentityId, email: impl Into<String>, display_name: Option<String>) -> Self {
        Self {
            id,
            class: IdentityClass::User,
            email: Some(email.into()),
            display_name,
            roles: BTreeSet::new(),
        }
    }

    /// Creates a machine key identity.
    pub fn key(id: IdentityId) -> Self {
        Self {
            id,
            class: IdentityClass::Key,
            email: None,
            display_name: None,
            roles: BTreeSet::new(),
        }
    }

    /// Adds granted roles.
    pub fn with_roles<I, S>(mut self, roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.roles.extend(roles.into_iter().map(Into::into));
        self
    }

    pub fn has_role(&self, role: &str) -> bool {
        self.roles.contains(role)
    }

    pub fn is_key(&self) -> bool {
        self.class == IdentityClass::Key
    }
}
