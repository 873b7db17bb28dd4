//! Repository trait for routing rule data access.

use std::collections::HashMap;

use async_trait::async_trait;

use crate::domain::entities::{NewRule, RoutingRule, RulePatch};
use crate::error::AppError;

/// Repository interface for routing rules.
///
/// # Implementations
///
/// - [`crate::infrastructure::persistence::PgRuleRepository`] - PostgreSQL implementation
/// - Test mocks available with `cfg(test)`
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RuleRepository: Send + Sync {
    /// Persists a new rule and returns it with generated id and timestamps.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Internal`] on database errors.
    async fn create(&self, new_rule: NewRule) -> Result<RoutingRule, AppError>;

    /// Finds a rule by id.
    async fn find_by_id(&self, rule_id: i64) -> Result<Option<RoutingRule>, AppError>;

    /// Lists the **active** rules of a link, ordered by `priority DESC,
    /// created_at ASC` — the exact order the resolver evaluates them in.
    async fn list_active_by_url(&self, url_id: i64) -> Result<Vec<RoutingRule>, AppError>;

    /// Counts all rules (active or not) owned by a link.
    async fn count_by_url(&self, url_id: i64) -> Result<i64, AppError>;

    /// Partially updates a rule. Only `Some` fields in [`RulePatch`] change.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::NotFound`] if no rule matches `rule_id`.
    async fn update(&self, rule_id: i64, patch: RulePatch) -> Result<RoutingRule, AppError>;

    /// Deletes a rule. Returns `true` if a row was removed.
    async fn delete(&self, rule_id: i64) -> Result<bool, AppError>;

    /// Applies a batch of match-count increments in one transaction.
    ///
    /// Each entry adds `count` to the rule's `match_count`. The whole batch
    /// commits or rolls back atomically so a partial flush can never double
    /// count on retry.
    async fn increment_match_counts(&self, counts: &HashMap<i64, i64>) -> Result<(), AppError>;
}
