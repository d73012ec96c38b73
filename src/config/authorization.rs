//! Authorization role configuration

use serde::Deserialize;

use super::error::ValidationError;

/// Role names granted by the gateway
#[derive(Debug, Clone, Deserialize)]
pub struct AuthorizationConfig {
    /// User role allowed to read any session
    #[serde(default = "default_lookup_admin_role")]
    pub lookup_admin_role: String,

    /// Key role required for `/private` routes
    #[serde(default = "default_internal_app_role")]
    pub internal_app_role: String,

    /// Key role required for `/admin` bulk refund routes
    #[serde(default = "default_bulk_refund_role")]
    pub bulk_refund_role: String,
}

impl AuthorizationConfig {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.lookup_admin_role.trim().is_empty() {
            return Err(ValidationError::EmptyRoleName("lookup admin"));
        }
        if self.internal_app_role.trim().is_empty() {
            return Err(ValidationError::EmptyRoleName("internal app"));
        }
        if self.bulk_refund_role.trim().is_empty() {
            return Err(ValidationError::EmptyRoleName("bulk refund"));
        }
        Ok(())
    }
}

impl Default for AuthorizationConfig {
    fn default() -> Self {
        Self {
            lookup_admin_role: default_lookup_admin_role(),
            internal_app_role: default_internal_app_role(),
            bulk_refund_role: default_bulk_refund_role(),
        }
    }
}

fn default_lookup_admin_role() -> String {
    "/admin/payment-lookup".to_string()
}

fn default_internal_app_role() -> String {
    "internal-app".to_string()
}

fn default_bulk_refund_role() -> String {
    "payment-bulk-refund".to_string()
}
