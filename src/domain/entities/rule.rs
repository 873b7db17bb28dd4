//! Routing rule entity owned by a short link.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::conditions::RoutingConditions;

/// Maximum number of routing rules a single link may own.
pub const MAX_RULES_PER_LINK: i64 = 50;

/// Highest accepted rule priority. Higher priorities evaluate first.
pub const MAX_RULE_PRIORITY: i32 = 10_000;

/// A named, prioritized (conditions → target) mapping owned by a short link.
///
/// `match_count` is an eventually-consistent counter maintained by the
/// write-behind batcher; it may lag true match volume.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoutingRule {
    pub id: i64,
    pub url_id: i64,
    pub name: String,
    pub target_url: String,
    pub priority: i32,
    pub is_active: bool,
    pub conditions: RoutingConditions,
    pub match_count: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input data for creating a routing rule.
#[derive(Debug, Clone)]
pub struct NewRule {
    pub url_id: i64,
    pub name: String,
    pub target_url: String,
    pub priority: i32,
    pub is_active: bool,
    pub conditions: RoutingConditions,
}

/// Partial update for an existing rule. `None` fields are left unchanged.
#[derive(Debug, Clone, Default)]
pub struct RulePatch {
    pub name: Option<String>,
    pub target_url: Option<String>,
    pub priority: Option<i32>,
    pub is_active: Option<bool>,
    pub conditions: Option<RoutingConditions>,
}

impl RulePatch {
    /// Returns true when the patch carries no changes.
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.target_url.is_none()
            && self.priority.is_none()
            && self.is_active.is_none()
            && self.conditions.is_none()
    }
}
