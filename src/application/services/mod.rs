mod rule_service;

pub use rule_service::{Requester, Role, RouteDecision, RuleService, TemplateOverrides};
