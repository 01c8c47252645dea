// Plan tiers and usage limits.
//
// The limit table is immutable configuration, keyed by plan, and injected
// wherever quota checks run. A limit of `UNLIMITED` (-1) always passes.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Sentinel meaning "no ceiling" for a limit.
pub const UNLIMITED: i64 = -1;

/// Subscription plan tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PlanType {
    Free,
    Pro,
}

impl PlanType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Free => "FREE",
            Self::Pro => "PRO",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "FREE" => Some(Self::Free),
            "PRO" => Some(Self::Pro),
            _ => None,
        }
    }
}

impl Default for PlanType {
    fn default() -> Self {
        Self::Free
    }
}

impl std::fmt::Display for PlanType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Usage ceilings for a plan tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanLimits {
    pub max_projects: i64,
    pub max_snippets_per_project: i64,
}

impl PlanLimits {
    /// Whether a user with `current` projects may create another one.
    pub fn allows_another_project(&self, current: i64) -> bool {
        self.max_projects == UNLIMITED || current < self.max_projects
    }

    /// Whether a project bucket with `current` snippets may take another one.
    pub fn allows_another_snippet(&self, current: i64) -> bool {
        self.max_snippets_per_project == UNLIMITED || current < self.max_snippets_per_project
    }
}

/// The built-in plan table: FREE gets 3 projects and 10 snippets per project,
/// PRO is unlimited.
pub fn default_plan_table() -> HashMap<PlanType, PlanLimits> {
    let mut plans = HashMap::new();
    plans.insert(
        PlanType::Free,
        PlanLimits {
            max_projects: 3,
            max_snippets_per_project: 10,
        },
    );
    plans.insert(
        PlanType::Pro,
        PlanLimits {
            max_projects: UNLIMITED,
            max_snippets_per_project: UNLIMITED,
        },
    );
    plans
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_plan_table_limits() {
        let plans = default_plan_table();
        let free = plans[&PlanType::Free];
        assert_eq!(free.max_projects, 3);
        assert_eq!(free.max_snippets_per_project, 10);

        let pro = plans[&PlanType::Pro];
        assert_eq!(pro.max_projects, UNLIMITED);
        assert_eq!(pro.max_snippets_per_project, UNLIMITED);
    }

    #[test]
    fn test_free_plan_boundaries() {
        let plans = default_plan_table();
        let free = plans[&PlanType::Free];
        assert!(free.allows_another_project(2));
        assert!(!free.allows_another_project(3));
        assert!(free.allows_another_snippet(9));
        assert!(!free.allows_another_snippet(10));
    }

    #[test]
    fn test_unlimited_always_passes() {
        let plans = default_plan_table();
        let pro = plans[&PlanType::Pro];
        assert!(pro.allows_another_project(0));
        assert!(pro.allows_another_project(10_000));
        assert!(pro.allows_another_snippet(10_000));
    }

    #[test]
    fn test_plan_type_round_trip() {
        assert_eq!(PlanType::from_str("FREE"), Some(PlanType::Free));
        assert_eq!(PlanType::from_str("PRO"), Some(PlanType::Pro));
        assert_eq!(PlanType::from_str("pro"), None);
        assert_eq!(PlanType::Pro.as_str(), "PRO");
    }

    #[test]
    fn test_plan_type_serde() {
        let json = serde_json::to_string(&PlanType::Pro).unwrap();
        assert_eq!(json, "\"PRO\"");
        let parsed: PlanType = serde_json::from_str("\"FREE\"").unwrap();
        assert_eq!(parsed, PlanType::Free);
    }
}
