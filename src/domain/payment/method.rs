//! Payment methods, one per supported provider.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::domain::foundation::ValidationError;

/// How the payer pays. Each method is served by exactly one provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PaymentMethod {
    /// Hosted card journey on GOV.UK Pay.
    #[serde(rename = "credit-card")]
    GovPay,
    /// PayPal checkout order with approve-then-capture.
    #[serde(rename = "PayPal")]
    PayPal,
}

impl PaymentMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::GovPay => "credit-card",
            PaymentMethod::PayPal => "PayPal",
        }
    }

    /// Short name used in logs and callback routes.
    pub fn provider_name(&self) -> &'static str {
        match self {
            PaymentMethod::GovPay => "govpay",
            PaymentMethod::PayPal => "paypal",
        }
    }
}

impl fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PaymentMethod {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "credit-card" => Ok(PaymentMethod::GovPay),
            "PayPal" => Ok(PaymentMethod::PayPal),
            other => Err(ValidationError::invalid_format(
                "payment_method",
                format!("unsupported payment method '{}'", other),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_wire_names() {
        assert_eq!("credit-card".parse::<PaymentMethod>().unwrap(), PaymentMethod::GovPay);
        assert_eq!("PayPal".parse::<PaymentMethod>().unwrap(), PaymentMethod::PayPal);
        assert!("paypal".parse::<PaymentMethod>().is_err());
        assert!("cheque".parse::<PaymentMethod>().is_err());
    }

    #[test]
    fn serde_matches_wire_names() {
        assert_eq!(serde_json::to_string(&PaymentMethod::GovPay).unwrap(), "\"credit-card\"");
        let m: PaymentMethod = serde_json::from_str("\"PayPal\"").unwrap();
        assert_eq!(m, PaymentMethod::PayPal);
        assert_eq!(m.provider_name(), "paypal");
    }
}
