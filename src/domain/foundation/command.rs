//! Command context shared by application handlers.
//!
//! Handlers take a `CommandMetadata` alongside their command instead of
//! separate correlation / actor parameters, and copy it onto emitted events.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::IdentityId;

/// Metadata context for command handlers.
///
/// ```ignore
/// let envelope = PaymentProcessed::settled(id, status)
///     .to_envelope()
///     .with_correlation_id(metadata.correlation_id());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandMetadata {
    /// Who is acting. `None` for provider callbacks and webhooks.
    #[serde(skip_serializing_if = "Option::is_none")]
    actor: Option<IdentityId>,

    /// Links related operations across a single request.
    #[serde(skip_serializing_if = "Option::is_none")]
    correlation_id: Option<String>,

    /// Entry point, e.g. "api", "callback", "webhook", "admin".
    #[serde(skip_serializing_if = "Option::is_none")]
    source: Option<String>,
}

impl CommandMetadata {
    /// Metadata for a command issued by an identified caller.
    pub fn for_actor(actor: IdentityId) -> Self {
        Self {
            actor: Some(actor),
            ..Self::default()
        }
    }

    /// Metadata for a command with no authenticated caller.
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn with_correlation_id(mut self, id: impl Into<String>) -> Self {
        self.correlation_id = Some(id.into());
        self
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    pub fn actor(&self) -> Option<&IdentityId> {
        self.actor.as_ref()
    }

    /// Returns the correlation ID, generating one if not set.
    pub fn correlation_id(&self) -> String {
        self.correlation_id
            .clone()
            .unwrap_or_else(|| Uuid::new_v4().to_string())
    }

    pub fn source(&self) -> Option<&str> {
        self.source.as_deref()
    }
}

#[cfg(test)]
impl CommandMetadata {
    /// Test fixture with a fixed actor and correlation id.
    pub fn test_fixture() -> Self {
        Self::for_actor(IdentityId::new("user-1").unwrap())
            .with_correlation_id("test-correlation-id")
            .with_source("test")
    }
}
