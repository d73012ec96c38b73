//! ProviderRegistry - resolves the provider adapter for a payment method.
//!
//! Handlers never name a concrete provider; they ask the registry for the
//! adapter serving the session's method.

use std::collections::HashMap;
use std::sync::Arc;

use crate::domain::payment::{PaymentMethod, PaymentSessionError};
use crate::ports::PaymentProvider;

#[derive(Clone, Default)]
pub struct ProviderRegistry {
    providers: HashMap<PaymentMethod, Arc<dyn PaymentProvider>>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a provider under the method it reports serving.
    ///
    /// A later registration for the same method replaces the earlier one.
    pub fn with_provider(mut self, provider: Arc<dyn PaymentProvider>) -> Self {
        self.providers.insert(provider.method(), provider);
        self
    }

    /// Looks up the provider for `method`.
    ///
    /// # Errors
    ///
    /// `UnsupportedProviderOnJourney` if nothing is registered for it.
    pub fn provider_for(
        &self,
        method: PaymentMethod,
    ) -> Result<Arc<dyn PaymentProvider>, PaymentSessionError> {
        self.providers.get(&method).cloned().ok_or_else(|| {
            PaymentSessionError::UnsupportedProviderOnJourney(method.as_str().to_string())
        })
    }

    pub fn methods(&self) -> Vec<PaymentMethod> {
        let mut methods: Vec<_> = self.providers.keys().copied().collect();
        methods.sort_by_key(|m| m.as_str());
        methods
    }
}

impl std::fmt::Debug for ProviderRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderRegistry")
            .field("methods", &self.methods())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::mock::MockPaymentProvider;

    #[test]
    fn resolves_registered_methods() {
        let registry = ProviderRegistry::new()
            .with_provider(Arc::new(MockPaymentProvider::govpay()))
            .with_provider(Arc::new(MockPaymentProvider::paypal()));

        assert_eq!(
            registry.provider_for(PaymentMethod::GovPay).unwrap().method(),
            PaymentMethod::GovPay
        );
        assert_eq!(
            registry.provider_for(PaymentMethod::PayPal).unwrap().method(),
            PaymentMethod::PayPal
        );
        assert_eq!(registry.methods(), vec![PaymentMethod::PayPal, PaymentMethod::GovPay]);
    }

    #[test]
    fn unregistered_method_is_unsupported() {
        let registry = ProviderRegistry::new().with_provider(Arc::new(MockPaymentProvider::govpay()));

        let err = registry.provider_for(PaymentMethod::PayPal).err().unwrap();
        assert_eq!(
            err,
            PaymentSessionError::UnsupportedProviderOnJourney("PayPal".to_string())
        );
    }
}
