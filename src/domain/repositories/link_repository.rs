//! Repository trait for the short-link slice the routing engine touches.

use async_trait::async_trait;

use crate::domain::entities::ShortLink;
use crate::error::AppError;

/// Read/flag access to short links.
///
/// Link CRUD itself belongs to the link management side; routing only checks
/// existence/ownership and flips the smart-routing flag.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait LinkRepository: Send + Sync {
    /// Finds a link by id. `Ok(None)` when the link does not exist.
    async fn find_by_id(&self, url_id: i64) -> Result<Option<ShortLink>, AppError>;

    /// Sets the link's `is_smart_routing` flag.
    async fn set_smart_routing(&self, url_id: i64, enabled: bool) -> Result<(), AppError>;
}
