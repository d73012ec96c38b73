//! Cost resolver port.
//!
//! Fetches the payable items for a session from an external resource. The
//! resource host must be allow-listed; this is the guard against the service
//! being pointed at arbitrary internal URLs.

use async_trait::async_trait;
use reqwest::Url;
use std::collections::BTreeSet;
use thiserror::Error;

use crate::domain::payment::{CostItem, PaymentSessionError};

#[async_trait]
pub trait CostResolver: Send + Sync {
    /// Resolves the ordered cost items behind `resource_url`.
    ///
    /// Idempotent and safe to retry: the only side effect is one network read.
    async fn resolve(
        &self,
        resource_url: &str,
        allow_list: &AllowList,
    ) -> Result<Vec<CostItem>, CostResolutionError>;
}

/// Hostnames permitted as cost resource origins. Exact, case-insensitive match.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AllowList {
    hosts: BTreeSet<String>,
}

impl AllowList {
    pub fn new<I, S>(hosts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            hosts: hosts
                .into_iter()
                .map(|h| h.as_ref().trim().to_ascii_lowercase())
                .filter(|h| !h.is_empty())
                .collect(),
        }
    }

    pub fn permits(&self, host: &str) -> bool {
        self.hosts.contains(&host.to_ascii_lowercase())
    }

    pub fn is_empty(&self) -> bool {
        self.hosts.is_empty()
    }

    /// Parses `resource_url` and checks its host.
    pub fn check(&self, resource_url: &str) -> Result<Url, CostResolutionError> {
        let url = Url::parse(resource_url)
            .map_err(|e| CostResolutionError::InvalidDomain(format!("{}: {}", resource_url, e)))?;
        match url.host_str() {
            Some(host) if self.permits(host) => Ok(url),
            Some(host) => Err(CostResolutionError::InvalidDomain(host.to_string())),
            None => Err(CostResolutionError::InvalidDomain(resource_url.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CostResolutionError {
    #[error("host not allow-listed: {0}")]
    InvalidDomain(String),

    #[error("cost resource answered {status}")]
    UpstreamRejected { status: u16 },

    #[error("cost resource unreachable: {0}")]
    UpstreamUnreachable(String),

    #[error("cost resource body malformed: {0}")]
    DecodeError(String),

    #[error("invalid cost item: {0}")]
    InvalidCost(String),
}

impl From<CostResolutionError> for PaymentSessionError {
    fn from(err: CostResolutionError) -> Self {
        match err {
            CostResolutionError::InvalidDomain(host) => PaymentSessionError::InvalidDomain(host),
            CostResolutionError::UpstreamRejected { status } => PaymentSessionError::UpstreamRejected(
                format!("cost resource answered {}", status),
            ),
            CostResolutionError::UpstreamUnreachable(msg) => {
                PaymentSessionError::UpstreamUnreachable(format!("cost resource: {}", msg))
            }
            CostResolutionError::DecodeError(msg) => {
                PaymentSessionError::DecodeError(format!("cost resource: {}", msg))
            }
            CostResolutionError::InvalidCost(msg) => PaymentSessionError::InvalidCost(msg),
        }
    }
}
