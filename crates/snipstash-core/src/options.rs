// Application options.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::logger::LoggerConfig;
use crate::plan::{default_plan_table, PlanLimits, PlanType};

fn default_app_name() -> String {
    "Snipstash".to_string()
}

fn default_base_path() -> String {
    "/api".to_string()
}

/// Top-level application options.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppOptions {
    /// Display name used in logs and default metadata.
    #[serde(default = "default_app_name")]
    pub app_name: String,

    /// Public base URL of the deployment (e.g. "https://snipstash.example").
    /// Falls back to the SNIPSTASH_URL environment variable when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,

    /// Path prefix all API routes are mounted under.
    #[serde(default = "default_base_path")]
    pub base_path: String,

    /// Plan limit table, keyed by plan tier.
    #[serde(default = "default_plan_table")]
    pub plans: HashMap<PlanType, PlanLimits>,

    /// Logger configuration (not serializable; holds an optional handler).
    #[serde(skip)]
    pub logger: LoggerConfig,
}

impl Default for AppOptions {
    fn default() -> Self {
        Self {
            app_name: default_app_name(),
            base_url: crate::env::get_url_from_env(),
            base_path: default_base_path(),
            plans: default_plan_table(),
            logger: LoggerConfig::default(),
        }
    }
}

impl AppOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    pub fn base_path(mut self, path: impl Into<String>) -> Self {
        self.base_path = path.into();
        self
    }

    /// Override the limits for one plan tier.
    pub fn plan(mut self, tier: PlanType, limits: PlanLimits) -> Self {
        self.plans.insert(tier, limits);
        self
    }

    /// Limits for the given tier, falling back to the built-in table.
    pub fn limits_for(&self, tier: PlanType) -> PlanLimits {
        self.plans
            .get(&tier)
            .copied()
            .unwrap_or_else(|| default_plan_table()[&tier])
    }
}
