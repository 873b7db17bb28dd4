//! Infrastructure layer: database, cache, and event plumbing.

pub mod cache;
pub mod persistence;
