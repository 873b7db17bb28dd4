//! DTOs for routing rule management.

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::application::services::TemplateOverrides;
use crate::domain::conditions::RoutingConditions;
use crate::domain::entities::{NewRule, RoutingRule, RulePatch};

/// Request to create a routing rule for a link.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateRuleRequest {
    #[validate(length(min = 1, max = 255))]
    pub name: String,

    /// Destination for visitors matching this rule (must be valid HTTP/HTTPS).
    #[validate(url(message = "Invalid URL format"))]
    pub target_url: String,

    /// Higher priority wins; ties break by creation time.
    #[validate(range(min = 0, max = 10000))]
    #[serde(default)]
    pub priority: i32,

    #[serde(default = "default_active")]
    pub is_active: bool,

    pub conditions: RoutingConditions,
}

fn default_active() -> bool {
    true
}

impl CreateRuleRequest {
    pub fn into_new_rule(self, url_id: i64) -> NewRule {
        NewRule {
            url_id,
            name: self.name,
            target_url: self.target_url,
            priority: self.priority,
            is_active: self.is_active,
            conditions: self.conditions,
        }
    }
}

/// Request body for a rule update.
///
/// All fields are optional — only provided fields are changed.
#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateRuleRequest {
    #[validate(length(min = 1, max = 255))]
    pub name: Option<String>,

    #[validate(url(message = "Invalid URL format"))]
    pub target_url: Option<String>,

    #[validate(range(min = 0, max = 10000))]
    pub priority: Option<i32>,

    pub is_active: Option<bool>,

    pub conditions: Option<RoutingConditions>,
}

impl UpdateRuleRequest {
    pub fn into_patch(self) -> RulePatch {
        RulePatch {
            name: self.name,
            target_url: self.target_url,
            priority: self.priority,
            is_active: self.is_active,
            conditions: self.conditions,
        }
    }
}

/// Request to seed a rule from a named template.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateFromTemplateRequest {
    #[validate(length(min = 1, max = 255))]
    pub name: Option<String>,

    #[validate(url(message = "Invalid URL format"))]
    pub target_url: String,

    #[validate(range(min = 0, max = 10000))]
    pub priority: Option<i32>,
}

impl CreateFromTemplateRequest {
    pub fn into_overrides(self) -> TemplateOverrides {
        TemplateOverrides {
            name: self.name,
            target_url: self.target_url,
            priority: self.priority,
        }
    }
}

/// Rule representation returned to callers.
#[derive(Debug, Serialize)]
pub struct RuleResponse {
    pub id: i64,
    pub url_id: i64,
    pub name: String,
    pub target_url: String,
    pub priority: i32,
    pub is_active: bool,
    pub conditions: RoutingConditions,
    pub match_count: i64,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

impl From<RoutingRule> for RuleResponse {
    fn from(rule: RoutingRule) -> Self {
        Self {
            id: rule.id,
            url_id: rule.url_id,
            name: rule.name,
            target_url: rule.target_url,
            priority: rule.priority,
            is_active: rule.is_active,
            conditions: rule.conditions,
            match_count: rule.match_count,
            created_at: rule.created_at,
            updated_at: rule.updated_at,
        }
    }
}
