//! PostgreSQL audit log writer.

use std::sync::Arc;

use async_trait::async_trait;
use sqlx::PgPool;

use crate::domain::entities::NewAuditEntry;
use crate::domain::repositories::AuditLog;
use crate::error::AppError;

/// Appends rule-mutation entries to the `audit_logs` table.
pub struct PgAuditLog {
    pool: Arc<PgPool>,
}

impl PgAuditLog {
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AuditLog for PgAuditLog {
    async fn record(&self, entry: NewAuditEntry) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO audit_logs
                (user_id, action, entity_type, entity_id, old_value, new_value, ip_address, user_agent)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(entry.user_id)
        .bind(&entry.action)
        .bind(&entry.entity_type)
        .bind(entry.entity_id)
        .bind(entry.old_value)
        .bind(entry.new_value)
        .bind(entry.ip_address)
        .bind(entry.user_agent)
        .execute(self.pool.as_ref())
        .await?;

        Ok(())
    }
}
