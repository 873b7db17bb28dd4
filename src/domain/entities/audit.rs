//! Audit trail entry recorded for every rule mutation.

use serde_json::Value;

/// New audit entry. Old/new values are JSON snapshots of the affected rule so
/// the trail can reconstruct what changed without joining other tables.
#[derive(Debug, Clone)]
pub struct NewAuditEntry {
    pub user_id: i64,
    pub action: String,
    pub entity_type: String,
    pub entity_id: i64,
    pub old_value: Option<Value>,
    pub new_value: Option<Value>,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

impl NewAuditEntry {
    /// Entry for a routing-rule action with no request metadata attached.
    pub fn for_rule(user_id: i64, action: &str, rule_id: i64) -> Self {
        Self {
            user_id,
            action: action.to_string(),
            entity_type: "routing_rule".to_string(),
            entity_id: rule_id,
            old_value: None,
            new_value: None,
            ip_address: None,
            user_agent: None,
        }
    }

    pub fn with_old_value(mut self, value: Value) -> Self {
        self.old_value = Some(value);
        self
    }

    pub fn with_new_value(mut self, value: Value) -> Self {
        self.new_value = Some(value);
        self
    }
}
