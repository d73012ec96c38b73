//! Cost items: the payable lines a session is built from.
//!
//! Costs are owned by an external resource and fetched on demand. Once copied
//! into a session they are never edited.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::domain::foundation::Amount;

use super::{PaymentMethod, PaymentSessionError};

/// One payable line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CostItem {
    pub amount: Amount,
    #[serde(default)]
    pub available_payment_methods: Vec<String>,
    #[serde(default)]
    pub class_of_payment: Vec<String>,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub description_identifier: String,
    #[serde(default)]
    pub description_values: BTreeMap<String, String>,
    #[serde(default)]
    pub links: CostLinks,
    #[serde(default)]
    pub product_type: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CostLinks {
    #[serde(default)]
    pub resource: String,
    #[serde(default, rename = "self")]
    pub self_url: String,
}

impl CostItem {
    /// Returns true if this item may be paid with the given method.
    pub fn accepts(&self, method: PaymentMethod) -> bool {
        self.available_payment_methods
            .iter()
            .any(|m| m == method.as_str())
    }
}

/// Sum of all cost amounts.
///
/// The total must stay expressible in minor units, since that is what the
/// card provider is sent.
pub fn total_amount(costs: &[CostItem]) -> Result<Amount, PaymentSessionError> {
    let total = Amount::checked_sum(costs.iter().map(|c| c.amount))
        .ok_or_else(|| PaymentSessionError::InvalidCost("cost total overflows".to_string()))?;
    total
        .to_minor_units()
        .map_err(|e| PaymentSessionError::InvalidCost(e.to_string()))?;
    Ok(total)
}

/// Returns the single class of payment shared by every item.
///
/// `None` if the items name zero or several distinct classes.
pub fn single_class_of_payment(costs: &[CostItem]) -> Option<String> {
    let classes: BTreeSet<&str> = costs
        .iter()
        .flat_map(|c| c.class_of_payment.iter().map(String::as_str))
        .collect();
    if classes.len() == 1 {
        classes.into_iter().next().map(str::to_string)
    } else {
        None
    }
}

/// Returns true if every item accepts the method.
pub fn method_available_for_all(costs: &[CostItem], method: PaymentMethod) -> bool {
    !costs.is_empty() && costs.iter().all(|c| c.accepts(method))
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;

    /// Cost item accepting both methods in the given class.
    pub fn cost(amount: &str, class: &str) -> CostItem {
        CostItem {
            amount: Amount::parse(amount).unwrap(),
            available_payment_methods: vec!["credit-card".to_string(), "PayPal".to_string()],
            class_of_payment: vec![class.to_string()],
            description: "Certified copy".to_string(),
            description_identifier: "certified-copy".to_string(),
            description_values: BTreeMap::new(),
            links: CostLinks::default(),
            product_type: "certified-copy".to_string(),
        }
    }
}
