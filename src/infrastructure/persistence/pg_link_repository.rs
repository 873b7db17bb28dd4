//! PostgreSQL implementation of the link repository slice.

use std::sync::Arc;

use async_trait::async_trait;
use sqlx::{PgPool, Row};

use crate::domain::entities::ShortLink;
use crate::domain::repositories::LinkRepository;
use crate::error::AppError;

/// Read/flag access to the `links` table owned by the link management side.
pub struct PgLinkRepository {
    pool: Arc<PgPool>,
}

impl PgLinkRepository {
    /// Creates a new repository with a database connection pool.
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl LinkRepository for PgLinkRepository {
    async fn find_by_id(&self, url_id: i64) -> Result<Option<ShortLink>, AppError> {
        let row = sqlx::query(
            r#"
            SELECT id, slug, owner_id, is_smart_routing
            FROM links
            WHERE id = $1
            "#,
        )
        .bind(url_id)
        .fetch_optional(self.pool.as_ref())
        .await?;

        row.map(|r| {
            Ok(ShortLink {
                id: r.try_get("id")?,
                slug: r.try_get("slug")?,
                owner_id: r.try_get("owner_id")?,
                is_smart_routing: r.try_get("is_smart_routing")?,
            })
        })
        .transpose()
    }

    async fn set_smart_routing(&self, url_id: i64, enabled: bool) -> Result<(), AppError> {
        sqlx::query("UPDATE links SET is_smart_routing = $2 WHERE id = $1")
            .bind(url_id)
            .bind(enabled)
            .execute(self.pool.as_ref())
            .await?;

        Ok(())
    }
}
