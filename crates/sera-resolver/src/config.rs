//! Resolver configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use sera_core::DEFAULT_APP_NAME;

/// How events within one tier are ordered before the first is taken.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderingPolicy {
    /// Keep the query collaborator's most-recent-first order.
    #[default]
    TrustQueryOrder,
    /// Sort locally: pending events first, then block height descending.
    /// Ties keep the collaborator's order.
    SortByBlockHeight,
}

/// Configuration for resolution behavior.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolverConfig {
    /// Application namespace every query is scoped to.
    pub app_name: String,
    /// Deadline for each call into the query collaborator.
    pub query_timeout: Duration,
    /// Maximum concurrent resolutions in batch operations.
    pub max_concurrency: usize,
    pub ordering: OrderingPolicy,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            app_name: DEFAULT_APP_NAME.to_owned(),
            query_timeout: Duration::from_secs(30),
            max_concurrency: 8,
            ordering: OrderingPolicy::default(),
        }
    }
}
