//! Short-link projection consumed by the routing subsystem.
//!
//! The full link entity (long URL, expiry, soft delete) is owned by the link
//! management side; routing only needs ownership, the redirect cache key, and
//! the smart-routing flag.

/// The slice of a short link the routing engine reads and flips flags on.
#[derive(Debug, Clone)]
pub struct ShortLink {
    pub id: i64,
    /// Short code; the redirect path caches resolutions under `url:slug:{slug}`.
    pub slug: String,
    pub owner_id: i64,
    /// True while the link owns at least one routing rule.
    pub is_smart_routing: bool,
}
