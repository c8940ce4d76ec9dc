//! Rate-limit records and the Developer Analytics wire format
//!
//! `GET /developer/analytics/v1_beta/rate_limit/` groups rates by API
//! (context, name, version) and then by resource. Each rate entry becomes
//! one flat [`RateRecord`].

use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

// ============================================================================
// API Response
// ============================================================================

/// Response body of the rate-limit endpoint
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RateLimitsResponse {
    #[serde(default)]
    pub rate_limits: Vec<ApiRateLimit>,
}

/// Rates for one API
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiRateLimit {
    pub api_context: String,
    pub api_name: String,
    pub api_version: String,
    #[serde(default)]
    pub resources: Vec<RateLimitResource>,
}

/// Rates for one resource of an API
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RateLimitResource {
    pub name: String,
    #[serde(default)]
    pub rates: Vec<Rate>,
}

/// One enforced window
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Rate {
    #[serde(default)]
    pub count: Option<u64>,
    pub limit: u64,
    pub remaining: u64,
    pub reset: DateTime<Utc>,
    /// Seconds
    pub time_window: u64,
}

impl RateLimitsResponse {
    /// Flatten into records, one per (context, name, version, resource)
    ///
    /// When eBay reports several windows for the same resource, the one
    /// with the fewest remaining calls is kept.
    pub fn into_records(self) -> Vec<RateRecord> {
        let mut by_key: HashMap<String, RateRecord> = HashMap::new();

        for api in self.rate_limits {
            for resource in api.resources {
                for rate in resource.rates {
                    let record = RateRecord::new(
                        &api.api_context,
                        &api.api_name,
                        &api.api_version,
                        &resource.name,
                        rate.limit,
                        rate.remaining,
                        rate.reset,
                        rate.time_window,
                    );
                    let key = record.key();
                    match by_key.get(&key) {
                        Some(existing) if existing.remaining <= record.remaining => {}
                        _ => {
                            by_key.insert(key, record);
                        }
                    }
                }
            }
        }

        let mut records: Vec<RateRecord> = by_key.into_values().collect();
        records.sort_by(|a, b| a.key().cmp(&b.key()));
        records
    }
}

// ============================================================================
// Rate Record
// ============================================================================

/// Call budget for one resource in the current window
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateRecord {
    pub api_context: String,
    pub api_name: String,
    pub api_version: String,
    pub resource_name: String,
    /// Maximum calls in the window
    pub limit: u64,
    /// Calls still available, never above `limit`
    pub remaining: u64,
    /// Instant at which `remaining` is restored to `limit`
    pub reset: DateTime<Utc>,
    /// Window length in seconds
    pub time_window: u64,
}

impl RateRecord {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        api_context: &str,
        api_name: &str,
        api_version: &str,
        resource_name: &str,
        limit: u64,
        remaining: u64,
        reset: DateTime<Utc>,
        time_window: u64,
    ) -> Self {
        RateRecord {
            api_context: api_context.to_string(),
            api_name: api_name.to_string(),
            api_version: api_version.to_string(),
            resource_name: resource_name.to_string(),
            limit,
            remaining: remaining.min(limit),
            reset,
            time_window,
        }
    }

    /// Base path of the API this record belongs to, e.g. `/buy/browse/v1`
    pub fn base_path(&self) -> String {
        base_path_for(&self.api_context, &self.api_name, &self.api_version)
    }

    /// Compound cache key `base_path|resource_name`
    pub fn key(&self) -> String {
        compound_key(&self.base_path(), &self.resource_name)
    }

    /// Restore the budget if the window has passed
    ///
    /// `reset` is advanced by whole windows so it lands in the future again.
    pub fn roll_window(&mut self, now: DateTime<Utc>) {
        if now < self.reset {
            return;
        }
        self.remaining = self.limit;
        if self.time_window == 0 {
            self.reset = now;
            return;
        }
        let window = self.time_window as i64;
        let behind = (now - self.reset).num_seconds();
        let windows = behind / window + 1;
        self.reset += Duration::seconds(windows * window);
    }

    /// Take one call from the budget, clamped at zero
    pub fn take(&mut self) {
        self.remaining = self.remaining.saturating_sub(1);
    }
}

/// Base path built from an API's context, name and version
pub fn base_path_for(context: &str, name: &str, version: &str) -> String {
    let name = name.trim().to_lowercase().replace(' ', "_");
    format!("/{}/{}/{}", context.trim().to_lowercase(), name, version.trim())
}

/// Governor cache key
pub fn compound_key(base_path: &str, resource_name: &str) -> String {
    format!("{}|{}", base_path, resource_name)
}
