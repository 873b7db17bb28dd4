//! Write-behind batching of rule match counters.
//!
//! Redirects increment an in-memory buffer; a periodic task flushes the
//! aggregated counts to the store in one transaction. Counts are process-local
//! and eventually consistent — a deliberate throughput/simplicity tradeoff
//! over exact distributed counting.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use crate::domain::repositories::RuleRepository;

/// Failed flush attempts per rule before its pending count is dropped.
/// Bounds buffer growth under a sustained store outage.
pub const MAX_FLUSH_RETRIES: u32 = 3;

/// Default interval between flushes.
pub const DEFAULT_FLUSH_INTERVAL: Duration = Duration::from_secs(30);

/// How many lost entries a shutdown-failure log line names before truncating.
const LOST_ENTRY_LOG_LIMIT: usize = 20;

#[derive(Default)]
struct BufferState {
    pending: HashMap<i64, i64>,
    retries: HashMap<i64, u32>,
}

/// In-memory accumulator of per-rule match increments.
///
/// An explicit owned structure rather than module-level state so tests can
/// construct isolated instances. The mutex guards only map operations; no
/// lock is held across await points.
#[derive(Default)]
pub struct MatchCountBuffer {
    state: Mutex<BufferState>,
}

impl MatchCountBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// O(1) increment; never touches the store.
    pub fn increment(&self, rule_id: i64) {
        let mut state = self.state.lock().expect("match buffer poisoned");
        *state.pending.entry(rule_id).or_insert(0) += 1;
    }

    /// Number of rules with pending increments.
    pub fn pending_rules(&self) -> usize {
        self.state.lock().expect("match buffer poisoned").pending.len()
    }

    /// Atomically swaps the pending map for an empty one.
    fn take_pending(&self) -> HashMap<i64, i64> {
        let mut state = self.state.lock().expect("match buffer poisoned");
        std::mem::take(&mut state.pending)
    }

    /// Clears retry counters for successfully flushed rules.
    fn clear_retries(&self, flushed: &HashMap<i64, i64>) {
        let mut state = self.state.lock().expect("match buffer poisoned");
        for rule_id in flushed.keys() {
            state.retries.remove(rule_id);
        }
    }

    /// Re-merges a failed batch into the live buffer, bumping each rule's
    /// retry counter. Rules at the retry ceiling are dropped and logged as
    /// lost data.
    fn restore_failed(&self, failed: HashMap<i64, i64>) {
        let mut state = self.state.lock().expect("match buffer poisoned");
        for (rule_id, count) in failed {
            let attempts = state.retries.entry(rule_id).or_insert(0);
            *attempts += 1;
            if *attempts >= MAX_FLUSH_RETRIES {
                error!(
                    rule_id,
                    lost = count,
                    attempts = *attempts,
                    "Dropping match counts after repeated flush failures"
                );
                state.retries.remove(&rule_id);
            } else {
                *state.pending.entry(rule_id).or_insert(0) += count;
            }
        }
    }

    /// Takes the current buffer and attempts one batched store update.
    ///
    /// On failure the batch is re-merged for the next cycle (subject to the
    /// retry ceiling). Never returns an error: flush failures are a concern
    /// of the batcher, not its callers.
    pub async fn flush_once(&self, repo: &dyn RuleRepository) -> bool {
        let batch = self.take_pending();
        if batch.is_empty() {
            return true;
        }

        let rules = batch.len();
        let total: i64 = batch.values().sum();

        match repo.increment_match_counts(&batch).await {
            Ok(()) => {
                debug!(rules, total, "Flushed match counts");
                self.clear_retries(&batch);
                true
            }
            Err(e) => {
                warn!(rules, total, "Match count flush failed, re-buffering: {e}");
                self.restore_failed(batch);
                false
            }
        }
    }

    /// Best-effort flush during shutdown. A failure is logged with the lost
    /// entries (truncated) but never blocks shutdown.
    pub async fn final_flush(&self, repo: &dyn RuleRepository) {
        let batch = self.take_pending();
        if batch.is_empty() {
            return;
        }

        if let Err(e) = repo.increment_match_counts(&batch).await {
            let mut lost: Vec<String> = batch
                .iter()
                .take(LOST_ENTRY_LOG_LIMIT)
                .map(|(rule_id, count)| format!("{rule_id}:{count}"))
                .collect();
            if batch.len() > LOST_ENTRY_LOG_LIMIT {
                lost.push(format!("... {} more", batch.len() - LOST_ENTRY_LOG_LIMIT));
            }
            error!(
                entries = lost.join(", "),
                "Final match count flush failed, counts lost: {e}"
            );
        }
    }
}

/// Periodic flush task. Runs until `shutdown` flips to `true`, then performs
/// a final best-effort flush and exits.
pub async fn run_match_count_flusher(
    buffer: Arc<MatchCountBuffer>,
    repo: Arc<dyn RuleRepository>,
    interval: Duration,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut ticker = tokio::time::interval(interval);
    // The first tick fires immediately; skip it so an empty fresh buffer
    // isn't flushed at startup.
    ticker.tick().await;

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                buffer.flush_once(repo.as_ref()).await;
            }
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    break;
                }
            }
        }
    }

    buffer.final_flush(repo.as_ref()).await;
    info!("Match count flusher stopped");
}
