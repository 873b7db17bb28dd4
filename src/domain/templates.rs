//! Built-in rule templates.
//!
//! A fixed, process-wide catalogue of pre-built condition sets usable to seed
//! new rules. Read-only constant data; addressed by string key.

use std::sync::LazyLock;

use crate::domain::conditions::{
    ConditionItem, ConditionKind, ConditionLogic, ConditionOperator, ConditionValue,
    RoutingConditions, TimeRange,
};

/// A named, pre-built condition set.
#[derive(Debug, Clone)]
pub struct RuleTemplate {
    /// Stable lookup key, e.g. `"ios-app-download"`.
    pub key: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub conditions: RoutingConditions,
}

fn single(kind: ConditionKind, operator: ConditionOperator, value: &str) -> ConditionItem {
    ConditionItem {
        kind,
        operator,
        value: ConditionValue::Single(value.to_string()),
    }
}

fn many(kind: ConditionKind, operator: ConditionOperator, values: &[&str]) -> ConditionItem {
    ConditionItem {
        kind,
        operator,
        value: ConditionValue::Many(values.iter().map(|v| v.to_string()).collect()),
    }
}

static TEMPLATES: LazyLock<Vec<RuleTemplate>> = LazyLock::new(|| {
    vec![
        RuleTemplate {
            key: "ios-app-download",
            name: "iOS App Download",
            description: "Send iPhone and iPad visitors to the App Store",
            conditions: RoutingConditions {
                operator: ConditionLogic::And,
                conditions: vec![
                    single(ConditionKind::Device, ConditionOperator::Equals, "mobile"),
                    single(ConditionKind::Os, ConditionOperator::Equals, "iOS"),
                ],
            },
        },
        RuleTemplate {
            key: "android-app-download",
            name: "Android App Download",
            description: "Send Android visitors to the Play Store",
            conditions: RoutingConditions {
                operator: ConditionLogic::And,
                conditions: vec![
                    single(ConditionKind::Device, ConditionOperator::Equals, "mobile"),
                    single(ConditionKind::Os, ConditionOperator::Equals, "Android"),
                ],
            },
        },
        RuleTemplate {
            key: "business-hours",
            name: "Business Hours",
            description: "Match weekday visits between 09:00 and 18:00 local time",
            conditions: RoutingConditions {
                operator: ConditionLogic::And,
                conditions: vec![
                    ConditionItem {
                        kind: ConditionKind::Time,
                        operator: ConditionOperator::Between,
                        value: ConditionValue::Time(TimeRange {
                            start: "09:00".to_string(),
                            end: Some("18:00".to_string()),
                            timezone: None,
                        }),
                    },
                    many(
                        ConditionKind::DayOfWeek,
                        ConditionOperator::In,
                        &["1", "2", "3", "4", "5"],
                    ),
                ],
            },
        },
        RuleTemplate {
            key: "weekend-traffic",
            name: "Weekend Traffic",
            description: "Match Saturday and Sunday visits",
            conditions: RoutingConditions {
                operator: ConditionLogic::And,
                conditions: vec![many(
                    ConditionKind::DayOfWeek,
                    ConditionOperator::In,
                    &["0", "6"],
                )],
            },
        },
        RuleTemplate {
            key: "mobile-visitors",
            name: "Mobile Visitors",
            description: "Match any mobile device",
            conditions: RoutingConditions {
                operator: ConditionLogic::And,
                conditions: vec![single(
                    ConditionKind::Device,
                    ConditionOperator::Equals,
                    "mobile",
                )],
            },
        },
        RuleTemplate {
            key: "social-media",
            name: "Social Media Referrals",
            description: "Match visits referred from major social networks",
            conditions: RoutingConditions {
                operator: ConditionLogic::Or,
                conditions: vec![
                    single(ConditionKind::Referer, ConditionOperator::Contains, "facebook"),
                    single(ConditionKind::Referer, ConditionOperator::Contains, "instagram"),
                    single(ConditionKind::Referer, ConditionOperator::Contains, "twitter"),
                    single(ConditionKind::Referer, ConditionOperator::Contains, "t.co"),
                    single(ConditionKind::Referer, ConditionOperator::Contains, "linkedin"),
                ],
            },
        },
    ]
});

/// Returns the full template catalogue.
pub fn all() -> &'static [RuleTemplate] {
    &TEMPLATES
}

/// Looks up a template by key.
pub fn find(key: &str) -> Option<&'static RuleTemplate> {
    TEMPLATES.iter().find(|t| t.key == key)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_templates_are_valid() {
        for template in all() {
            template
                .conditions
                .validate()
                .unwrap_or_else(|e| panic!("template {} invalid: {e}", template.key));
        }
    }

    #[test]
    fn test_keys_are_unique() {
        let mut keys: Vec<_> = all().iter().map(|t| t.key).collect();
        keys.sort_unstable();
        keys.dedup();
        assert_eq!(keys.len(), all().len());
    }

    #[test]
    fn test_find_by_key() {
        assert!(find("business-hours").is_some());
        assert!(find("no-such-template").is_none());
    }
}
