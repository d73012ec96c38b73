//! Settings shared by the session handlers.

use crate::domain::foundation::PaymentSessionId;
use crate::domain::payment::ExpiryPolicy;
use crate::ports::AllowList;

/// Process-wide session settings, loaded once at startup.
#[derive(Debug, Clone)]
pub struct SessionSettings {
    /// Hosts cost resources may be fetched from.
    pub allow_list: AllowList,
    pub expiry: ExpiryPolicy,
    /// Public base URL of this API, used for `links.self`.
    pub api_base_url: String,
}

impl SessionSettings {
    pub fn new(allow_list: AllowList, expiry: ExpiryPolicy, api_base_url: impl Into<String>) -> Self {
        Self {
            allow_list,
            expiry,
            api_base_url: api_base_url.into(),
        }
    }

    pub fn self_link(&self, id: &PaymentSessionId) -> String {
        format!("{}/payments/{}", self.api_base_url.trim_end_matches('/'), id)
    }
}

#[cfg(test)]
pub(crate) fn test_settings() -> SessionSettings {
    SessionSettings::new(
        AllowList::new(["api.example.com"]),
        ExpiryPolicy::default(),
        "https://payments.example.com/",
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn self_link_joins_without_double_slash() {
        let settings = test_settings();
        let id = PaymentSessionId::new();

        assert_eq!(
            settings.self_link(&id),
            format!("https://payments.example.com/payments/{}", id)
        );
    }
}
