//! Repository traits decoupling the domain from persistence.

mod audit_log;
mod link_repository;
mod rule_repository;

pub use audit_log::AuditLog;
pub use link_repository::LinkRepository;
pub use rule_repository::RuleRepository;

#[cfg(test)]
pub use audit_log::MockAuditLog;
#[cfg(test)]
pub use link_repository::MockLinkRepository;
#[cfg(test)]
pub use rule_repository::MockRuleRepository;
