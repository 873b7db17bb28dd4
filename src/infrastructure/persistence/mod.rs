//! PostgreSQL-backed repository implementations.

mod pg_audit_log;
mod pg_link_repository;
mod pg_rule_repository;

pub use pg_audit_log::PgAuditLog;
pub use pg_link_repository::PgLinkRepository;
pub use pg_rule_repository::PgRuleRepository;
