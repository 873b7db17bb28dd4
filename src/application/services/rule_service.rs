//! Smart-routing rule management and redirect-time resolution.

use std::sync::Arc;

use serde_json::json;
use tracing::{debug, warn};

use crate::domain::entities::{
    MAX_RULE_PRIORITY, MAX_RULES_PER_LINK, NewAuditEntry, NewRule, RoutingRule, RulePatch,
    ShortLink,
};
use crate::domain::evaluator::evaluate;
use crate::domain::events::{EventEmitter, RuleEvent, RuleEventPayload};
use crate::domain::match_batcher::MatchCountBuffer;
use crate::domain::repositories::{AuditLog, LinkRepository, RuleRepository};
use crate::domain::templates::{self, RuleTemplate};
use crate::domain::visitor::VisitorContext;
use crate::error::AppError;
use crate::infrastructure::cache::CacheService;
use crate::utils::is_safe_url;

/// Role of the caller performing a management operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    User,
    Admin,
}

/// The authenticated caller of a management operation.
#[derive(Debug, Clone, Copy)]
pub struct Requester {
    pub user_id: i64,
    pub role: Role,
}

impl Requester {
    pub fn user(user_id: i64) -> Self {
        Self {
            user_id,
            role: Role::User,
        }
    }

    pub fn admin(user_id: i64) -> Self {
        Self {
            user_id,
            role: Role::Admin,
        }
    }
}

/// Outcome of redirect-time rule resolution.
///
/// Both fields are `None` when no rule matched; the caller falls back to the
/// link's default destination.
#[derive(Debug, Default)]
pub struct RouteDecision {
    pub rule: Option<RoutingRule>,
    pub target_url: Option<String>,
}

impl RouteDecision {
    fn none() -> Self {
        Self::default()
    }

    fn matched(rule: RoutingRule) -> Self {
        let target_url = Some(rule.target_url.clone());
        Self {
            rule: Some(rule),
            target_url,
        }
    }
}

/// Caller-supplied overrides when seeding a rule from a template.
#[derive(Debug, Clone)]
pub struct TemplateOverrides {
    pub name: Option<String>,
    pub target_url: String,
    pub priority: Option<i32>,
}

/// Service owning rule CRUD, the per-link rule cache, and redirect-time
/// resolution.
///
/// All management operations are scoped to `(url_id, requester)`: the link
/// must exist and belong to the requester unless the requester is an
/// administrator. Every mutation invalidates both the rule-set cache entry
/// and the slug-keyed redirect-resolution entry, records an audit entry, and
/// emits a domain event.
pub struct RuleService<R: RuleRepository, L: LinkRepository> {
    rule_repository: Arc<R>,
    link_repository: Arc<L>,
    cache: Arc<dyn CacheService>,
    audit_log: Arc<dyn AuditLog>,
    events: Arc<dyn EventEmitter>,
    match_counts: Arc<MatchCountBuffer>,
    cache_ttl_seconds: u64,
}

impl<R: RuleRepository, L: LinkRepository> RuleService<R, L> {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        rule_repository: Arc<R>,
        link_repository: Arc<L>,
        cache: Arc<dyn CacheService>,
        audit_log: Arc<dyn AuditLog>,
        events: Arc<dyn EventEmitter>,
        match_counts: Arc<MatchCountBuffer>,
        cache_ttl_seconds: u64,
    ) -> Self {
        Self {
            rule_repository,
            link_repository,
            cache,
            audit_log,
            events,
            match_counts,
            cache_ttl_seconds,
        }
    }

    /// Creates a routing rule for a link.
    ///
    /// The first rule on a link flips its `is_smart_routing` flag on.
    ///
    /// # Errors
    ///
    /// - [`AppError::NotFound`] if the link does not exist
    /// - [`AppError::Forbidden`] if the requester neither owns the link nor
    ///   is an administrator
    /// - [`AppError::LimitExceeded`] at the 50-rule ceiling
    /// - [`AppError::Validation`] for malformed conditions, an out-of-range
    ///   priority, or an unsafe target URL
    pub async fn create_rule(
        &self,
        url_id: i64,
        requester: Requester,
        mut new_rule: NewRule,
    ) -> Result<RoutingRule, AppError> {
        let link = self.authorize(url_id, requester).await?;

        let existing = self.rule_repository.count_by_url(url_id).await?;
        if existing >= MAX_RULES_PER_LINK {
            return Err(AppError::limit_exceeded(
                "Rule limit exceeded for this link",
                json!({ "url_id": url_id, "max": MAX_RULES_PER_LINK }),
            ));
        }

        new_rule.url_id = url_id;
        validate_priority(new_rule.priority)?;
        new_rule.conditions.validate()?;
        validate_target(&new_rule.target_url)?;

        let rule = self.rule_repository.create(new_rule).await?;

        if existing == 0 {
            self.link_repository.set_smart_routing(url_id, true).await?;
        }

        self.invalidate_caches(url_id, &link.slug).await;

        self.audit_log
            .record(
                NewAuditEntry::for_rule(requester.user_id, "rule_created", rule.id)
                    .with_new_value(rule_snapshot(&rule)),
            )
            .await?;

        self.events
            .emit(RuleEvent::RuleCreated(RuleEventPayload::from_rule(
                &rule,
                requester.user_id,
            )))
            .await;

        Ok(rule)
    }

    /// Updates a rule, re-validating any changed conditions.
    pub async fn update_rule(
        &self,
        url_id: i64,
        rule_id: i64,
        requester: Requester,
        patch: RulePatch,
    ) -> Result<RoutingRule, AppError> {
        let link = self.authorize(url_id, requester).await?;
        let existing = self.find_owned_rule(url_id, rule_id).await?;

        if let Some(priority) = patch.priority {
            validate_priority(priority)?;
        }
        if let Some(conditions) = &patch.conditions {
            conditions.validate()?;
        }
        if let Some(target_url) = &patch.target_url {
            validate_target(target_url)?;
        }

        let updated = self.rule_repository.update(rule_id, patch).await?;

        self.invalidate_caches(url_id, &link.slug).await;

        self.audit_log
            .record(
                NewAuditEntry::for_rule(requester.user_id, "rule_updated", rule_id)
                    .with_old_value(rule_snapshot(&existing))
                    .with_new_value(rule_snapshot(&updated)),
            )
            .await?;

        self.events
            .emit(RuleEvent::RuleUpdated(RuleEventPayload::from_rule(
                &updated,
                requester.user_id,
            )))
            .await;

        Ok(updated)
    }

    /// Deletes a rule. Removing a link's last rule flips its
    /// `is_smart_routing` flag off.
    pub async fn delete_rule(
        &self,
        url_id: i64,
        rule_id: i64,
        requester: Requester,
    ) -> Result<(), AppError> {
        let link = self.authorize(url_id, requester).await?;
        let existing = self.find_owned_rule(url_id, rule_id).await?;

        self.rule_repository.delete(rule_id).await?;

        let remaining = self.rule_repository.count_by_url(url_id).await?;
        if remaining == 0 {
            self.link_repository
                .set_smart_routing(url_id, false)
                .await?;
        }

        self.invalidate_caches(url_id, &link.slug).await;

        self.audit_log
            .record(
                NewAuditEntry::for_rule(requester.user_id, "rule_deleted", rule_id)
                    .with_old_value(rule_snapshot(&existing)),
            )
            .await?;

        self.events
            .emit(RuleEvent::RuleDeleted(RuleEventPayload::from_rule(
                &existing,
                requester.user_id,
            )))
            .await;

        Ok(())
    }

    /// Redirect-time resolution: loads the link's active rules (cache first),
    /// evaluates them in priority order, and returns the first match whose
    /// destination passes the public-URL safety check.
    ///
    /// Unsafe destinations are skipped, not treated as fatal: evaluation
    /// continues with the next candidate. No match returns an empty
    /// [`RouteDecision`] so the caller falls back to the link's default URL.
    pub async fn evaluate_rules(
        &self,
        url_id: i64,
        context: &VisitorContext,
    ) -> Result<RouteDecision, AppError> {
        let rules = self.load_rules(url_id).await?;

        for rule in rules {
            if !rule.is_active {
                continue;
            }
            if !evaluate(&rule.conditions, context) {
                continue;
            }
            if !is_safe_url(&rule.target_url) {
                warn!(
                    rule_id = rule.id,
                    url_id, "Skipping matched rule with unsafe target URL"
                );
                continue;
            }
            debug!(rule_id = rule.id, url_id, "Routing rule matched");
            return Ok(RouteDecision::matched(rule));
        }

        Ok(RouteDecision::none())
    }

    /// Records a rule match in the write-behind buffer. O(1), never touches
    /// the store synchronously.
    pub fn increment_match_count(&self, rule_id: i64) {
        self.match_counts.increment(rule_id);
    }

    /// Returns the static template catalogue.
    pub fn get_templates(&self) -> &'static [RuleTemplate] {
        templates::all()
    }

    /// Creates a rule from a named template, applying caller overrides for
    /// name, target URL, and priority.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::NotFound`] for an unknown template key, then the
    /// same errors as [`Self::create_rule`].
    pub async fn create_from_template(
        &self,
        url_id: i64,
        requester: Requester,
        template_key: &str,
        overrides: TemplateOverrides,
    ) -> Result<RoutingRule, AppError> {
        let template = templates::find(template_key).ok_or_else(|| {
            AppError::not_found("Unknown rule template", json!({ "key": template_key }))
        })?;

        let new_rule = NewRule {
            url_id,
            name: overrides
                .name
                .unwrap_or_else(|| template.name.to_string()),
            target_url: overrides.target_url,
            priority: overrides.priority.unwrap_or(0),
            is_active: true,
            conditions: template.conditions.clone(),
        };

        self.create_rule(url_id, requester, new_rule).await
    }

    /// Loads the link's active rules, cache first, refilling the cache on a
    /// miss with a non-empty result. Cache failures (including corrupt
    /// entries) degrade to a direct store read.
    async fn load_rules(&self, url_id: i64) -> Result<Vec<RoutingRule>, AppError> {
        let cache_key = rules_cache_key(url_id);

        if let Ok(Some(cached)) = self.cache.get(&cache_key).await {
            match serde_json::from_str::<Vec<RoutingRule>>(&cached) {
                Ok(rules) => return Ok(rules),
                Err(e) => {
                    warn!(url_id, "Corrupt rule cache entry, reloading from store: {e}");
                }
            }
        }

        let rules = self.rule_repository.list_active_by_url(url_id).await?;

        if !rules.is_empty()
            && let Ok(serialized) = serde_json::to_string(&rules)
        {
            let _ = self
                .cache
                .set(&cache_key, &serialized, self.cache_ttl_seconds)
                .await;
        }

        Ok(rules)
    }

    /// Checks link existence and ownership for a management operation.
    async fn authorize(&self, url_id: i64, requester: Requester) -> Result<ShortLink, AppError> {
        let link = self
            .link_repository
            .find_by_id(url_id)
            .await?
            .ok_or_else(|| {
                AppError::not_found("Short link not found", json!({ "url_id": url_id }))
            })?;

        if requester.role != Role::Admin && link.owner_id != requester.user_id {
            return Err(AppError::forbidden(
                "You do not own this link",
                json!({ "url_id": url_id }),
            ));
        }

        Ok(link)
    }

    async fn find_owned_rule(&self, url_id: i64, rule_id: i64) -> Result<RoutingRule, AppError> {
        self.rule_repository
            .find_by_id(rule_id)
            .await?
            .filter(|rule| rule.url_id == url_id)
            .ok_or_else(|| {
                AppError::not_found(
                    "Routing rule not found",
                    json!({ "url_id": url_id, "rule_id": rule_id }),
                )
            })
    }

    /// Clears both the rule-set entry and the slug-keyed redirect-resolution
    /// entry. A stale copy of either defeats rule updates.
    async fn invalidate_caches(&self, url_id: i64, slug: &str) {
        let _ = self.cache.del(&rules_cache_key(url_id)).await;
        let _ = self.cache.del(&resolution_cache_key(slug)).await;
    }
}

fn rules_cache_key(url_id: i64) -> String {
    format!("routing:{url_id}")
}

fn resolution_cache_key(slug: &str) -> String {
    format!("url:slug:{slug}")
}

fn validate_priority(priority: i32) -> Result<(), AppError> {
    if !(0..=MAX_RULE_PRIORITY).contains(&priority) {
        return Err(AppError::bad_request(
            "Rule priority out of range",
            json!({ "field": "priority", "min": 0, "max": MAX_RULE_PRIORITY }),
        ));
    }
    Ok(())
}

fn validate_target(target_url: &str) -> Result<(), AppError> {
    if !is_safe_url(target_url) {
        return Err(AppError::bad_request(
            "Target URL is not publicly reachable",
            json!({ "field": "target_url" }),
        ));
    }
    Ok(())
}

fn rule_snapshot(rule: &RoutingRule) -> serde_json::Value {
    serde_json::to_value(rule).unwrap_or_else(|_| json!({ "id": rule.id }))
}
