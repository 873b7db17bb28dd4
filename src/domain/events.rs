//! Domain events emitted on rule mutations.
//!
//! Events are consumed asynchronously by the webhook fan-out, which lives
//! outside this crate. Emission is fire-and-forget: a full or closed channel
//! is logged and dropped, never surfaced to the management caller.

use async_trait::async_trait;
use serde::Serialize;
use tokio::sync::mpsc;
use tracing::warn;

use crate::domain::entities::RoutingRule;

/// Payload shared by all rule lifecycle events.
#[derive(Debug, Clone, Serialize)]
pub struct RuleEventPayload {
    pub rule_id: i64,
    pub url_id: i64,
    pub name: String,
    pub target_url: String,
    pub priority: i32,
    pub user_id: i64,
}

impl RuleEventPayload {
    pub fn from_rule(rule: &RoutingRule, user_id: i64) -> Self {
        Self {
            rule_id: rule.id,
            url_id: rule.url_id,
            name: rule.name.clone(),
            target_url: rule.target_url.clone(),
            priority: rule.priority,
            user_id,
        }
    }
}

/// Rule lifecycle event.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum RuleEvent {
    RuleCreated(RuleEventPayload),
    RuleUpdated(RuleEventPayload),
    RuleDeleted(RuleEventPayload),
}

/// Seam between the rule service and the downstream notification pipeline.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait EventEmitter: Send + Sync {
    /// Emits an event. Must not fail the caller; delivery is best effort.
    async fn emit(&self, event: RuleEvent);
}

/// Channel-backed emitter; the receiving half is handed to the webhook
/// subsystem at startup.
pub struct ChannelEventEmitter {
    tx: mpsc::Sender<RuleEvent>,
}

impl ChannelEventEmitter {
    pub fn new(tx: mpsc::Sender<RuleEvent>) -> Self {
        Self { tx }
    }
}

#[async_trait]
impl EventEmitter for ChannelEventEmitter {
    async fn emit(&self, event: RuleEvent) {
        if let Err(e) = self.tx.try_send(event) {
            warn!("Dropping rule event, queue unavailable: {e}");
        }
    }
}

/// No-op emitter for deployments without the webhook pipeline.
#[derive(Debug, Default)]
pub struct NullEmitter;

#[async_trait]
impl EventEmitter for NullEmitter {
    async fn emit(&self, _event: RuleEvent) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_channel_emitter_delivers() {
        let (tx, mut rx) = mpsc::channel(4);
        let emitter = ChannelEventEmitter::new(tx);

        emitter
            .emit(RuleEvent::RuleCreated(RuleEventPayload {
                rule_id: 1,
                url_id: 2,
                name: "r".into(),
                target_url: "https://example.com".into(),
                priority: 0,
                user_id: 3,
            }))
            .await;

        let event = rx.recv().await.unwrap();
        assert!(matches!(event, RuleEvent::RuleCreated(p) if p.rule_id == 1));
    }

    #[tokio::test]
    async fn test_channel_emitter_drops_when_full() {
        let (tx, _rx) = mpsc::channel(1);
        let emitter = ChannelEventEmitter::new(tx);
        let payload = RuleEventPayload {
            rule_id: 1,
            url_id: 2,
            name: "r".into(),
            target_url: "https://example.com".into(),
            priority: 0,
            user_id: 3,
        };

        emitter.emit(RuleEvent::RuleUpdated(payload.clone())).await;
        // Queue is full now; the second emit must not hang or panic.
        emitter.emit(RuleEvent::RuleUpdated(payload)).await;
    }
}
