//! Audit log writer trait.

use async_trait::async_trait;

use crate::domain::entities::NewAuditEntry;
use crate::error::AppError;

/// Writes audit entries for rule mutations.
///
/// Recording must complete before the management call returns success; a
/// mutation without a trail entry is treated as a failed mutation.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AuditLog: Send + Sync {
    async fn record(&self, entry: NewAuditEntry) -> Result<(), AppError>;
}
