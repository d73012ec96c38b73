//! Static cost resolver for tests.
//!
//! Serves configured responses per resource URL while still enforcing the
//! allow-list, so handler tests see the same domain errors as production.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::domain::payment::CostItem;
use crate::ports::{AllowList, CostResolutionError, CostResolver};

#[derive(Default)]
struct StaticState {
    responses: HashMap<String, Result<Vec<CostItem>, CostResolutionError>>,
    calls: Vec<String>,
}

/// Cost resolver backed by a map of canned responses.
#[derive(Clone, Default)]
pub struct StaticCostResolver {
    state: Arc<Mutex<StaticState>>,
}

impl StaticCostResolver {
    pub fn new() -> Self {
        Self::default()
    }

    // ════════════════════════════════════════════════════════════════════════
    // Configuration
    // ════════════════════════════════════════════════════════════════════════

    /// Serve `costs` for `resource_url`, replacing any earlier response.
    pub fn with_costs(self, resource_url: impl Into<String>, costs: Vec<CostItem>) -> Self {
        self.set_costs(resource_url, costs);
        self
    }

    pub fn set_costs(&self, resource_url: impl Into<String>, costs: Vec<CostItem>) {
        self.state
            .lock()
            .unwrap()
            .responses
            .insert(resource_url.into(), Ok(costs));
    }

    pub fn set_error(&self, resource_url: impl Into<String>, error: CostResolutionError) {
        self.state
            .lock()
            .unwrap()
            .responses
            .insert(resource_url.into(), Err(error));
    }

    // ════════════════════════════════════════════════════════════════════════
    // Inspection
    // ════════════════════════════════════════════════════════════════════════

    /// Resource URLs fetched so far, in order.
    pub fn calls(&self) -> Vec<String> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn call_count(&self) -> usize {
        self.state.lock().unwrap().calls.len()
    }
}

#[async_trait]
impl CostResolver for StaticCostResolver {
    async fn resolve(
        &self,
        resource_url: &str,
        allow_list: &AllowList,
    ) -> Result<Vec<CostItem>, CostResolutionError> {
        allow_list.check(resource_url)?;

        let mut state = self.state.lock().unwrap();
        state.calls.push(resource_url.to_string());
        state
            .responses
            .get(resource_url)
            .cloned()
            .unwrap_or(Err(CostResolutionError::UpstreamRejected { status: 404 }))
    }
}
