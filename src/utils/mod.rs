//! Shared utilities.

pub mod url_safety;

pub use url_safety::{check_public_url, is_safe_url};
