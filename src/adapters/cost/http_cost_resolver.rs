//! HTTP cost resolver.
//!
//! Reads cost items with a plain GET. The body is either a JSON array of
//! items or an object carrying them under `items`.

use async_trait::async_trait;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::time::Duration;

use crate::domain::foundation::Amount;
use crate::domain::payment::{CostItem, CostLinks};
use crate::ports::{AllowList, CostResolutionError, CostResolver};

/// Cost item as it arrives on the wire, before amount validation.
#[derive(Debug, Deserialize)]
struct WireCostItem {
    #[serde(default)]
    amount: Option<String>,
    #[serde(default)]
    available_payment_methods: Vec<String>,
    #[serde(default)]
    class_of_payment: Vec<String>,
    #[serde(default)]
    description: String,
    #[serde(default)]
    description_identifier: String,
    #[serde(default)]
    description_values: BTreeMap<String, String>,
    #[serde(default)]
    links: CostLinks,
    #[serde(default)]
    product_type: String,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum WireCosts {
    List(Vec<WireCostItem>),
    Wrapped { items: Vec<WireCostItem> },
}

impl WireCosts {
    fn into_items(self) -> Vec<WireCostItem> {
        match self {
            WireCosts::List(items) | WireCosts::Wrapped { items } => items,
        }
    }
}

impl WireCostItem {
    fn validate(self, index: usize) -> Result<CostItem, CostResolutionError> {
        let raw = self
            .amount
            .filter(|a| !a.is_empty())
            .ok_or_else(|| CostResolutionError::InvalidCost(format!("item {} has no amount", index)))?;
        let amount = Amount::parse(&raw).map_err(|_| {
            CostResolutionError::InvalidCost(format!("item {} amount {:?} is malformed", index, raw))
        })?;

        Ok(CostItem {
            amount,
            available_payment_methods: self.available_payment_methods,
            class_of_payment: self.class_of_payment,
            description: self.description,
            description_identifier: self.description_identifier,
            description_values: self.description_values,
            links: self.links,
            product_type: self.product_type,
        })
    }
}

/// Resolves costs over HTTP.
pub struct HttpCostResolver {
    http_client: reqwest::Client,
}

impl HttpCostResolver {
    pub fn new(timeout: Duration) -> Self {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self { http_client }
    }

    pub fn with_client(http_client: reqwest::Client) -> Self {
        Self { http_client }
    }
}

#[async_trait]
impl CostResolver for HttpCostResolver {
    async fn resolve(
        &self,
        resource_url: &str,
        allow_list: &AllowList,
    ) -> Result<Vec<CostItem>, CostResolutionError> {
        let url = allow_list.check(resource_url)?;

        let response = self
            .http_client
            .get(url)
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await
            .map_err(|e| {
                tracing::warn!(error = %e, resource = %resource_url, "Cost resource unreachable");
                CostResolutionError::UpstreamUnreachable(e.to_string())
            })?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            tracing::warn!(status, resource = %resource_url, "Cost resource rejected request");
            return Err(CostResolutionError::UpstreamRejected { status });
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| CostResolutionError::UpstreamUnreachable(e.to_string()))?;
        let wire: WireCosts = serde_json::from_slice(&body)
            .map_err(|e| CostResolutionError::DecodeError(e.to_string()))?;

        wire.into_items()
            .into_iter()
            .enumerate()
            .map(|(index, item)| item.validate(index))
            .collect()
    }
}
