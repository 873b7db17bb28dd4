#![allow(dead_code)]

//! In-memory fakes for the engine's storage and notification seams.
//!
//! The production repositories need PostgreSQL; these fakes implement the
//! same traits over plain maps so the service stack can be exercised
//! end-to-end in-process.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{Duration, TimeZone, Utc};
use serde_json::json;
use smart_router::application::services::RuleService;
use smart_router::domain::conditions::{
    ConditionItem, ConditionKind, ConditionLogic, ConditionOperator, ConditionValue,
    RoutingConditions,
};
use smart_router::domain::entities::{NewAuditEntry, NewRule, RoutingRule, RulePatch, ShortLink};
use smart_router::domain::events::{EventEmitter, RuleEvent};
use smart_router::domain::match_batcher::MatchCountBuffer;
use smart_router::domain::repositories::{AuditLog, LinkRepository, RuleRepository};
use smart_router::error::AppError;
use smart_router::infrastructure::cache::{CacheService, MemoryCache};

#[derive(Default)]
struct RuleStore {
    next_id: i64,
    seq: i64,
    rules: HashMap<i64, RoutingRule>,
}

/// Map-backed [`RuleRepository`].
#[derive(Default)]
pub struct FakeRuleRepository {
    store: Mutex<RuleStore>,
}

impl FakeRuleRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn match_count(&self, rule_id: i64) -> i64 {
        self.store
            .lock()
            .unwrap()
            .rules
            .get(&rule_id)
            .map(|r| r.match_count)
            .unwrap_or(0)
    }
}

#[async_trait]
impl RuleRepository for FakeRuleRepository {
    async fn create(&self, new_rule: NewRule) -> Result<RoutingRule, AppError> {
        let mut store = self.store.lock().unwrap();
        store.next_id += 1;
        store.seq += 1;
        // Strictly increasing timestamps make the created_at tie-break
        // deterministic regardless of how fast rules are inserted.
        let created_at =
            Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap() + Duration::seconds(store.seq);

        let rule = RoutingRule {
            id: store.next_id,
            url_id: new_rule.url_id,
            name: new_rule.name,
            target_url: new_rule.target_url,
            priority: new_rule.priority,
            is_active: new_rule.is_active,
            conditions: new_rule.conditions,
            match_count: 0,
            created_at,
            updated_at: created_at,
        };
        store.rules.insert(rule.id, rule.clone());
        Ok(rule)
    }

    async fn find_by_id(&self, rule_id: i64) -> Result<Option<RoutingRule>, AppError> {
        Ok(self.store.lock().unwrap().rules.get(&rule_id).cloned())
    }

    async fn list_active_by_url(&self, url_id: i64) -> Result<Vec<RoutingRule>, AppError> {
        let store = self.store.lock().unwrap();
        let mut rules: Vec<RoutingRule> = store
            .rules
            .values()
            .filter(|r| r.url_id == url_id && r.is_active)
            .cloned()
            .collect();
        rules.sort_by(|a, b| {
            b.priority
                .cmp(&a.priority)
                .then(a.created_at.cmp(&b.created_at))
        });
        Ok(rules)
    }

    async fn count_by_url(&self, url_id: i64) -> Result<i64, AppError> {
        let store = self.store.lock().unwrap();
        Ok(store.rules.values().filter(|r| r.url_id == url_id).count() as i64)
    }

    async fn update(&self, rule_id: i64, patch: RulePatch) -> Result<RoutingRule, AppError> {
        let mut store = self.store.lock().unwrap();
        let rule = store.rules.get_mut(&rule_id).ok_or_else(|| {
            AppError::not_found("Routing rule not found", json!({ "rule_id": rule_id }))
        })?;

        if let Some(name) = patch.name {
            rule.name = name;
        }
        if let Some(target_url) = patch.target_url {
            rule.target_url = target_url;
        }
        if let Some(priority) = patch.priority {
            rule.priority = priority;
        }
        if let Some(is_active) = patch.is_active {
            rule.is_active = is_active;
        }
        if let Some(conditions) = patch.conditions {
            rule.conditions = conditions;
        }
        rule.updated_at = Utc::now();

        Ok(rule.clone())
    }

    async fn delete(&self, rule_id: i64) -> Result<bool, AppError> {
        Ok(self.store.lock().unwrap().rules.remove(&rule_id).is_some())
    }

    async fn increment_match_counts(&self, counts: &HashMap<i64, i64>) -> Result<(), AppError> {
        let mut store = self.store.lock().unwrap();
        for (rule_id, count) in counts {
            if let Some(rule) = store.rules.get_mut(rule_id) {
                rule.match_count += count;
            }
        }
        Ok(())
    }
}

/// Map-backed [`LinkRepository`].
#[derive(Default)]
pub struct FakeLinkRepository {
    links: Mutex<HashMap<i64, ShortLink>>,
}

impl FakeLinkRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, id: i64, slug: &str, owner_id: i64) {
        self.links.lock().unwrap().insert(
            id,
            ShortLink {
                id,
                slug: slug.to_string(),
                owner_id,
                is_smart_routing: false,
            },
        );
    }

    pub fn is_smart_routing(&self, id: i64) -> bool {
        self.links
            .lock()
            .unwrap()
            .get(&id)
            .map(|l| l.is_smart_routing)
            .unwrap_or(false)
    }
}

#[async_trait]
impl LinkRepository for FakeLinkRepository {
    async fn find_by_id(&self, url_id: i64) -> Result<Option<ShortLink>, AppError> {
        Ok(self.links.lock().unwrap().get(&url_id).cloned())
    }

    async fn set_smart_routing(&self, url_id: i64, enabled: bool) -> Result<(), AppError> {
        if let Some(link) = self.links.lock().unwrap().get_mut(&url_id) {
            link.is_smart_routing = enabled;
        }
        Ok(())
    }
}

/// Audit log that records entries in memory.
#[derive(Default)]
pub struct RecordingAuditLog {
    entries: Mutex<Vec<NewAuditEntry>>,
}

impl RecordingAuditLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn actions(&self) -> Vec<String> {
        self.entries
            .lock()
            .unwrap()
            .iter()
            .map(|e| e.action.clone())
            .collect()
    }
}

#[async_trait]
impl AuditLog for RecordingAuditLog {
    async fn record(&self, entry: NewAuditEntry) -> Result<(), AppError> {
        self.entries.lock().unwrap().push(entry);
        Ok(())
    }
}

/// Emitter that collects events in memory.
#[derive(Default)]
pub struct CollectingEmitter {
    events: Mutex<Vec<RuleEvent>>,
}

impl CollectingEmitter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<RuleEvent> {
        self.events.lock().unwrap().clone()
    }
}

#[async_trait]
impl EventEmitter for CollectingEmitter {
    async fn emit(&self, event: RuleEvent) {
        self.events.lock().unwrap().push(event);
    }
}

/// The fully wired service plus handles to its fakes for assertions.
pub struct TestStack {
    pub service: RuleService<FakeRuleRepository, FakeLinkRepository>,
    pub rules: Arc<FakeRuleRepository>,
    pub links: Arc<FakeLinkRepository>,
    pub cache: Arc<MemoryCache>,
    pub audit: Arc<RecordingAuditLog>,
    pub events: Arc<CollectingEmitter>,
    pub match_counts: Arc<MatchCountBuffer>,
}

pub fn test_stack() -> TestStack {
    let rules = Arc::new(FakeRuleRepository::new());
    let links = Arc::new(FakeLinkRepository::new());
    let cache = Arc::new(MemoryCache::new());
    let audit = Arc::new(RecordingAuditLog::new());
    let events = Arc::new(CollectingEmitter::new());
    let match_counts = Arc::new(MatchCountBuffer::new());

    let service = RuleService::new(
        rules.clone(),
        links.clone(),
        cache.clone() as Arc<dyn CacheService>,
        audit.clone(),
        events.clone(),
        match_counts.clone(),
        3600,
    );

    TestStack {
        service,
        rules,
        links,
        cache,
        audit,
        events,
        match_counts,
    }
}

pub fn device_rule(name: &str, device: &str, target: &str, priority: i32) -> NewRule {
    NewRule {
        url_id: 0,
        name: name.to_string(),
        target_url: target.to_string(),
        priority,
        is_active: true,
        conditions: RoutingConditions {
            operator: ConditionLogic::And,
            conditions: vec![ConditionItem {
                kind: ConditionKind::Device,
                operator: ConditionOperator::Equals,
                value: ConditionValue::Single(device.to_string()),
            }],
        },
    }
}

pub fn country_rule(name: &str, countries: &[&str], target: &str, priority: i32) -> NewRule {
    NewRule {
        url_id: 0,
        name: name.to_string(),
        target_url: target.to_string(),
        priority,
        is_active: true,
        conditions: RoutingConditions {
            operator: ConditionLogic::And,
            conditions: vec![ConditionItem {
                kind: ConditionKind::Country,
                operator: ConditionOperator::In,
                value: ConditionValue::Many(countries.iter().map(|c| c.to_string()).collect()),
            }],
        },
    }
}
