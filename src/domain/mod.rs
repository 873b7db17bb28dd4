//! Domain layer: entities, the condition model, the evaluator, and the
//! repository traits that decouple business logic from infrastructure.

pub mod conditions;
pub mod entities;
pub mod evaluator;
pub mod events;
pub mod match_batcher;
pub mod repositories;
pub mod templates;
pub mod visitor;
