//! Per-request visitor snapshot used for rule evaluation.

use chrono::{DateTime, Utc};

use crate::domain::conditions::ConditionKind;

/// Request-derived signals for one redirect: geo, parsed user agent, referrer,
/// UTM query parameters, and the current instant. Ephemeral; never persisted
/// by this subsystem.
#[derive(Debug, Clone, Default)]
pub struct VisitorContext {
    pub country: Option<String>,
    pub region: Option<String>,
    pub city: Option<String>,
    pub device: Option<String>,
    pub os: Option<String>,
    pub browser: Option<String>,
    pub language: Option<String>,
    pub referer: Option<String>,
    pub utm_source: Option<String>,
    pub utm_medium: Option<String>,
    pub utm_campaign: Option<String>,
    pub utm_term: Option<String>,
    pub utm_content: Option<String>,
    /// Instant the redirect request arrived.
    pub now: Option<DateTime<Utc>>,
    /// IANA timezone hint derived from the request (e.g. CDN geo headers).
    pub timezone: Option<String>,
}

impl VisitorContext {
    /// Snapshot with `now` pinned to the current instant.
    pub fn at_now() -> Self {
        Self {
            now: Some(Utc::now()),
            ..Self::default()
        }
    }

    /// Fetches the context field for a condition kind, normalized for
    /// comparison: country upper-cased, device lower-cased, everything else
    /// as-is. `time` and `day_of_week` have no string field and yield `None`.
    pub fn field(&self, kind: ConditionKind) -> Option<String> {
        match kind {
            ConditionKind::Country => self.country.as_deref().map(str::to_uppercase),
            ConditionKind::Region => self.region.clone(),
            ConditionKind::City => self.city.clone(),
            ConditionKind::Device => self.device.as_deref().map(str::to_lowercase),
            ConditionKind::Os => self.os.clone(),
            ConditionKind::Browser => self.browser.clone(),
            ConditionKind::Language => self.language.clone(),
            ConditionKind::Referer => self.referer.clone(),
            ConditionKind::UtmSource => self.utm_source.clone(),
            ConditionKind::UtmMedium => self.utm_medium.clone(),
            ConditionKind::UtmCampaign => self.utm_campaign.clone(),
            ConditionKind::UtmTerm => self.utm_term.clone(),
            ConditionKind::UtmContent => self.utm_content.clone(),
            ConditionKind::Time | ConditionKind::DayOfWeek => None,
        }
    }
}
