//! Core business entities.

mod audit;
mod link;
mod rule;

pub use audit::NewAuditEntry;
pub use link::ShortLink;
pub use rule::{MAX_RULE_PRIORITY, MAX_RULES_PER_LINK, NewRule, RoutingRule, RulePatch};
