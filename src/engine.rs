//! Engine initialization and runtime setup.
//!
//! Handles database connections, cache setup, and background worker spawning
//! for the smart routing engine.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use sqlx::postgres::PgPoolOptions;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

use crate::application::services::RuleService;
use crate::config::Config;
use crate::domain::events::{ChannelEventEmitter, RuleEvent};
use crate::domain::match_batcher::{MatchCountBuffer, run_match_count_flusher};
use crate::infrastructure::cache::{CacheService, NullCache, RedisCache};
use crate::infrastructure::persistence::{PgAuditLog, PgLinkRepository, PgRuleRepository};

/// A fully wired routing engine with its background workers running.
///
/// Created by [`RoutingEngine::start`]; the host application embeds the
/// [`RuleService`] into its request handling and calls
/// [`RoutingEngine::shutdown`] during graceful teardown so buffered match
/// counts get a final flush.
pub struct RoutingEngine {
    service: Arc<RuleService<PgRuleRepository, PgLinkRepository>>,
    shutdown_tx: watch::Sender<bool>,
    flusher: JoinHandle<()>,
}

impl RoutingEngine {
    /// Starts the engine with the given configuration.
    ///
    /// Initializes:
    /// - PostgreSQL connection pool
    /// - Apply migrations
    /// - Redis cache (or NullCache fallback)
    /// - Background match-count flusher
    ///
    /// Returns the engine and the receiving end of the rule event channel;
    /// the host consumes rule lifecycle events from it (webhooks, analytics).
    ///
    /// # Errors
    ///
    /// Returns an error if the database connection or migrations fail.
    /// A Redis failure is not fatal: the engine degrades to NullCache.
    pub async fn start(config: Config) -> Result<(Self, mpsc::Receiver<RuleEvent>)> {
        let pool = PgPoolOptions::new()
            .max_connections(config.db_max_connections)
            .acquire_timeout(Duration::from_secs(config.db_connect_timeout))
            .idle_timeout(Duration::from_secs(config.db_idle_timeout))
            .max_lifetime(Duration::from_secs(config.db_max_lifetime))
            .connect(&config.database_url)
            .await?;
        tracing::info!("Connected to database");

        sqlx::migrate!("./migrations").run(&pool).await?;

        let cache: Arc<dyn CacheService> = if let Some(redis_url) = &config.redis_url {
            match RedisCache::connect(redis_url).await {
                Ok(redis) => {
                    tracing::info!("Cache enabled (Redis)");
                    Arc::new(redis)
                }
                Err(e) => {
                    tracing::warn!("Failed to connect to Redis: {}. Using NullCache.", e);
                    Arc::new(NullCache::new())
                }
            }
        } else {
            tracing::info!("Cache disabled (NullCache)");
            Arc::new(NullCache::new())
        };

        let pool = Arc::new(pool);
        let rule_repository = Arc::new(PgRuleRepository::new(pool.clone()));
        let link_repository = Arc::new(PgLinkRepository::new(pool.clone()));
        let audit_log = Arc::new(PgAuditLog::new(pool));

        let (event_tx, event_rx) = mpsc::channel(config.event_queue_capacity);
        let events = Arc::new(ChannelEventEmitter::new(event_tx));

        let match_counts = Arc::new(MatchCountBuffer::new());
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let flusher = tokio::spawn(run_match_count_flusher(
            match_counts.clone(),
            rule_repository.clone(),
            Duration::from_secs(config.flush_interval_seconds),
            shutdown_rx,
        ));
        tracing::info!("Match count flusher started");

        let service = Arc::new(RuleService::new(
            rule_repository,
            link_repository,
            cache,
            audit_log,
            events,
            match_counts,
            config.cache_ttl_seconds,
        ));

        Ok((
            Self {
                service,
                shutdown_tx,
                flusher,
            },
            event_rx,
        ))
    }

    /// The rule service backing both the management surface and the
    /// redirect-time resolution path.
    pub fn service(&self) -> Arc<RuleService<PgRuleRepository, PgLinkRepository>> {
        self.service.clone()
    }

    /// Stops the background flusher, giving buffered match counts one final
    /// best-effort flush.
    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(true);
        if let Err(e) = self.flusher.await {
            tracing::error!("Match count flusher task panicked: {e}");
        }
        tracing::info!("Routing engine stopped");
    }
}
