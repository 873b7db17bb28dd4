//! Data transfer objects for the rule management surface.
//!
//! All DTOs use Serde for JSON serialization/deserialization and validator
//! for declarative input validation.

mod rule;

pub use rule::{CreateFromTemplateRequest, CreateRuleRequest, RuleResponse, UpdateRuleRequest};
