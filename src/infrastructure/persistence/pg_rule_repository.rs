//! PostgreSQL implementation of the rule repository.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};

use crate::domain::conditions::RoutingConditions;
use crate::domain::entities::{NewRule, RoutingRule, RulePatch};
use crate::domain::repositories::RuleRepository;
use crate::error::AppError;

/// PostgreSQL repository for routing rules.
///
/// Conditions are stored as JSONB and round-trip through `serde_json`. All
/// queries are runtime-bound prepared statements.
pub struct PgRuleRepository {
    pool: Arc<PgPool>,
}

impl PgRuleRepository {
    /// Creates a new repository with a database connection pool.
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self { pool }
    }
}

const RULE_COLUMNS: &str =
    "id, url_id, name, target_url, priority, is_active, conditions, match_count, created_at, updated_at";

fn map_rule(row: PgRow) -> Result<RoutingRule, AppError> {
    let conditions: serde_json::Value = row.try_get("conditions")?;
    let conditions: RoutingConditions = serde_json::from_value(conditions).map_err(|e| {
        AppError::internal(
            "Stored routing conditions are corrupt",
            json!({ "reason": e.to_string() }),
        )
    })?;

    Ok(RoutingRule {
        id: row.try_get("id")?,
        url_id: row.try_get("url_id")?,
        name: row.try_get("name")?,
        target_url: row.try_get("target_url")?,
        priority: row.try_get("priority")?,
        is_active: row.try_get("is_active")?,
        conditions,
        match_count: row.try_get("match_count")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

#[async_trait]
impl RuleRepository for PgRuleRepository {
    async fn create(&self, new_rule: NewRule) -> Result<RoutingRule, AppError> {
        let conditions = serde_json::to_value(&new_rule.conditions).map_err(|e| {
            AppError::internal(
                "Failed to serialize routing conditions",
                json!({ "reason": e.to_string() }),
            )
        })?;

        let row = sqlx::query(&format!(
            r#"
            INSERT INTO routing_rules (url_id, name, target_url, priority, is_active, conditions)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {RULE_COLUMNS}
            "#
        ))
        .bind(new_rule.url_id)
        .bind(&new_rule.name)
        .bind(&new_rule.target_url)
        .bind(new_rule.priority)
        .bind(new_rule.is_active)
        .bind(conditions)
        .fetch_one(self.pool.as_ref())
        .await?;

        map_rule(row)
    }

    async fn find_by_id(&self, rule_id: i64) -> Result<Option<RoutingRule>, AppError> {
        let row = sqlx::query(&format!(
            "SELECT {RULE_COLUMNS} FROM routing_rules WHERE id = $1"
        ))
        .bind(rule_id)
        .fetch_optional(self.pool.as_ref())
        .await?;

        row.map(map_rule).transpose()
    }

    async fn list_active_by_url(&self, url_id: i64) -> Result<Vec<RoutingRule>, AppError> {
        let rows = sqlx::query(&format!(
            r#"
            SELECT {RULE_COLUMNS}
            FROM routing_rules
            WHERE url_id = $1 AND is_active = TRUE
            ORDER BY priority DESC, created_at ASC
            "#
        ))
        .bind(url_id)
        .fetch_all(self.pool.as_ref())
        .await?;

        rows.into_iter().map(map_rule).collect()
    }

    async fn count_by_url(&self, url_id: i64) -> Result<i64, AppError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM routing_rules WHERE url_id = $1")
            .bind(url_id)
            .fetch_one(self.pool.as_ref())
            .await?;

        Ok(count)
    }

    async fn update(&self, rule_id: i64, patch: RulePatch) -> Result<RoutingRule, AppError> {
        let conditions = patch
            .conditions
            .as_ref()
            .map(serde_json::to_value)
            .transpose()
            .map_err(|e| {
                AppError::internal(
                    "Failed to serialize routing conditions",
                    json!({ "reason": e.to_string() }),
                )
            })?;

        let row = sqlx::query(&format!(
            r#"
            UPDATE routing_rules
            SET name       = COALESCE($2, name),
                target_url = COALESCE($3, target_url),
                priority   = COALESCE($4, priority),
                is_active  = COALESCE($5, is_active),
                conditions = COALESCE($6, conditions),
                updated_at = now()
            WHERE id = $1
            RETURNING {RULE_COLUMNS}
            "#
        ))
        .bind(rule_id)
        .bind(patch.name)
        .bind(patch.target_url)
        .bind(patch.priority)
        .bind(patch.is_active)
        .bind(conditions)
        .fetch_optional(self.pool.as_ref())
        .await?;

        match row {
            Some(row) => map_rule(row),
            None => Err(AppError::not_found(
                "Routing rule not found",
                json!({ "rule_id": rule_id }),
            )),
        }
    }

    async fn delete(&self, rule_id: i64) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM routing_rules WHERE id = $1")
            .bind(rule_id)
            .execute(self.pool.as_ref())
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn increment_match_counts(&self, counts: &HashMap<i64, i64>) -> Result<(), AppError> {
        if counts.is_empty() {
            return Ok(());
        }

        let mut tx = self.pool.begin().await?;

        for (rule_id, count) in counts {
            sqlx::query(
                r#"
                UPDATE routing_rules
                SET match_count = match_count + $2
                WHERE id = $1
                "#,
            )
            .bind(rule_id)
            .bind(count)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }
}
