//! Routing condition model: typed match conditions and their validation.
//!
//! A [`ConditionItem`] is an atomic predicate over one visitor-context field.
//! Validation is type-dependent and happens before anything is persisted: a
//! `time` condition must carry a [`TimeRange`], `day_of_week` an integer (or
//! list of integers) in `0..=6`, and `in`/`not_in` a non-empty collection.

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::str::FromStr;
use std::sync::LazyLock;

use crate::error::AppError;

/// Compiled regex for `HH:mm` clock values.
static CLOCK_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([01]\d|2[0-3]):[0-5]\d$").unwrap());

/// Maximum number of conditions a single rule may carry.
pub const MAX_CONDITIONS_PER_RULE: usize = 20;

/// The visitor-context field a condition matches against.
///
/// Closed set: new kinds are added by extending this enum and the evaluator's
/// exhaustive match, not by open-ended polymorphism.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConditionKind {
    Country,
    Region,
    City,
    Device,
    Os,
    Browser,
    Language,
    Referer,
    Time,
    DayOfWeek,
    UtmSource,
    UtmMedium,
    UtmCampaign,
    UtmTerm,
    UtmContent,
}

impl ConditionKind {
    /// Wire name, used in validation error details and logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Country => "country",
            Self::Region => "region",
            Self::City => "city",
            Self::Device => "device",
            Self::Os => "os",
            Self::Browser => "browser",
            Self::Language => "language",
            Self::Referer => "referer",
            Self::Time => "time",
            Self::DayOfWeek => "day_of_week",
            Self::UtmSource => "utm_source",
            Self::UtmMedium => "utm_medium",
            Self::UtmCampaign => "utm_campaign",
            Self::UtmTerm => "utm_term",
            Self::UtmContent => "utm_content",
        }
    }
}

/// Comparison operator applied between a condition value and a context field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConditionOperator {
    Equals,
    NotEquals,
    Contains,
    NotContains,
    In,
    NotIn,
    StartsWith,
    EndsWith,
    Between,
    Before,
    After,
}

/// A local-time window with an optional IANA timezone override.
///
/// `start` and `end` use 24-hour `HH:mm` notation. When `start > end` the
/// window is treated as spanning midnight (e.g. `22:00`–`06:00`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeRange {
    pub start: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timezone: Option<String>,
}

/// Condition payload: a single string, a list, or a time range.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ConditionValue {
    Time(TimeRange),
    Single(String),
    Many(Vec<String>),
}

impl ConditionValue {
    /// Flattens string payloads into a list. `Time` yields an empty list.
    pub fn as_list(&self) -> Vec<&str> {
        match self {
            Self::Single(s) => vec![s.as_str()],
            Self::Many(items) => items.iter().map(String::as_str).collect(),
            Self::Time(_) => Vec::new(),
        }
    }
}

/// An atomic predicate over one visitor-context field.
///
/// Immutable once constructed; [`ConditionItem::validate`] must pass before a
/// condition is accepted into a rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConditionItem {
    #[serde(rename = "type")]
    pub kind: ConditionKind,
    pub operator: ConditionOperator,
    pub value: ConditionValue,
}

impl ConditionItem {
    /// Validates the value shape against the condition kind's grammar.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Validation`] naming the offending field when:
    /// - a `time` condition carries a non-`TimeRange` value, a malformed
    ///   `HH:mm` clock, or an unknown IANA timezone;
    /// - a `day_of_week` value is not an integer (or list of integers) in
    ///   `0..=6`;
    /// - an `in`/`not_in` operator carries an empty collection or string;
    /// - any other kind carries a `TimeRange` payload.
    pub fn validate(&self, index: usize) -> Result<(), AppError> {
        match self.kind {
            ConditionKind::Time => self.validate_time(index),
            ConditionKind::DayOfWeek => self.validate_day_of_week(index),
            _ => self.validate_generic(index),
        }
    }

    fn validate_time(&self, index: usize) -> Result<(), AppError> {
        let ConditionValue::Time(range) = &self.value else {
            return Err(field_error(
                index,
                "value",
                "time conditions require a {start, end?, timezone?} object",
            ));
        };

        if !CLOCK_REGEX.is_match(&range.start) {
            return Err(field_error(
                index,
                "value.start",
                "expected 24-hour HH:mm clock value",
            ));
        }

        if let Some(end) = &range.end
            && !CLOCK_REGEX.is_match(end)
        {
            return Err(field_error(
                index,
                "value.end",
                "expected 24-hour HH:mm clock value",
            ));
        }

        if self.operator == ConditionOperator::Between && range.end.is_none() {
            return Err(field_error(
                index,
                "value.end",
                "between requires both start and end",
            ));
        }

        if let Some(tz) = &range.timezone
            && chrono_tz::Tz::from_str(tz).is_err()
        {
            return Err(field_error(
                index,
                "value.timezone",
                "unknown IANA timezone name",
            ));
        }

        Ok(())
    }

    fn validate_day_of_week(&self, index: usize) -> Result<(), AppError> {
        let days = match &self.value {
            ConditionValue::Single(_) | ConditionValue::Many(_) => self.value.as_list(),
            ConditionValue::Time(_) => {
                return Err(field_error(
                    index,
                    "value",
                    "day_of_week conditions take an integer 0-6 or a list thereof",
                ));
            }
        };

        if days.is_empty() {
            return Err(field_error(index, "value", "day list must not be empty"));
        }

        for day in days {
            match day.trim().parse::<u8>() {
                Ok(0..=6) => {}
                _ => {
                    return Err(field_error(
                        index,
                        "value",
                        "days must be integers 0 (Sunday) through 6 (Saturday)",
                    ));
                }
            }
        }

        Ok(())
    }

    fn validate_generic(&self, index: usize) -> Result<(), AppError> {
        if matches!(self.value, ConditionValue::Time(_)) {
            return Err(field_error(
                index,
                "value",
                "only time conditions accept a time range value",
            ));
        }

        if matches!(
            self.operator,
            ConditionOperator::In | ConditionOperator::NotIn
        ) {
            let non_empty = match &self.value {
                ConditionValue::Single(s) => !s.trim().is_empty(),
                ConditionValue::Many(items) => {
                    !items.is_empty() && items.iter().any(|s| !s.trim().is_empty())
                }
                ConditionValue::Time(_) => false,
            };
            if !non_empty {
                return Err(field_error(
                    index,
                    "value",
                    "in/not_in require a non-empty list or non-empty string",
                ));
            }
        }

        Ok(())
    }
}

/// How a rule's conditions combine into a single boolean.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConditionLogic {
    #[serde(rename = "AND")]
    And,
    #[serde(rename = "OR")]
    Or,
}

/// The full trigger of a routing rule: a conjunction or disjunction of
/// between 1 and 20 condition items.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoutingConditions {
    pub operator: ConditionLogic,
    pub conditions: Vec<ConditionItem>,
}

impl RoutingConditions {
    /// Validates the condition count and every item's value shape.
    ///
    /// Item order does not affect the boolean result; it only determines
    /// which index a validation error reports.
    pub fn validate(&self) -> Result<(), AppError> {
        if self.conditions.is_empty() {
            return Err(AppError::bad_request(
                "Routing conditions must contain at least one condition",
                json!({ "field": "conditions" }),
            ));
        }

        if self.conditions.len() > MAX_CONDITIONS_PER_RULE {
            return Err(AppError::bad_request(
                "Too many conditions in a single rule",
                json!({
                    "field": "conditions",
                    "max": MAX_CONDITIONS_PER_RULE,
                    "actual": self.conditions.len(),
                }),
            ));
        }

        for (index, condition) in self.conditions.iter().enumerate() {
            condition.validate(index)?;
        }

        Ok(())
    }
}

fn field_error(index: usize, field: &str, reason: &str) -> AppError {
    AppError::bad_request(
        "Invalid routing condition",
        json!({
            "field": format!("conditions[{index}].{field}"),
            "reason": reason,
        }),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(kind: ConditionKind, operator: ConditionOperator, value: ConditionValue) -> ConditionItem {
        ConditionItem {
            kind,
            operator,
            value,
        }
    }

    #[test]
    fn test_generic_condition_accepts_string_value() {
        let c = item(
            ConditionKind::Country,
            ConditionOperator::Equals,
            ConditionValue::Single("US".into()),
        );
        assert!(c.validate(0).is_ok());
    }

    #[test]
    fn test_generic_condition_rejects_time_range() {
        let c = item(
            ConditionKind::Country,
            ConditionOperator::Equals,
            ConditionValue::Time(TimeRange {
                start: "09:00".into(),
                end: None,
                timezone: None,
            }),
        );
        assert!(matches!(
            c.validate(0).unwrap_err(),
            AppError::Validation { .. }
        ));
    }

    #[test]
    fn test_in_operator_rejects_empty_list() {
        let c = item(
            ConditionKind::Language,
            ConditionOperator::In,
            ConditionValue::Many(vec![]),
        );
        assert!(c.validate(0).is_err());
    }

    #[test]
    fn test_in_operator_rejects_blank_string() {
        let c = item(
            ConditionKind::Language,
            ConditionOperator::In,
            ConditionValue::Single("   ".into()),
        );
        assert!(c.validate(0).is_err());
    }

    #[test]
    fn test_time_condition_requires_range() {
        let c = item(
            ConditionKind::Time,
            ConditionOperator::Between,
            ConditionValue::Single("09:00".into()),
        );
        assert!(c.validate(0).is_err());
    }

    #[test]
    fn test_time_condition_valid_range() {
        let c = item(
            ConditionKind::Time,
            ConditionOperator::Between,
            ConditionValue::Time(TimeRange {
                start: "09:00".into(),
                end: Some("18:00".into()),
                timezone: Some("Europe/Berlin".into()),
            }),
        );
        assert!(c.validate(0).is_ok());
    }

    #[test]
    fn test_time_condition_rejects_bad_clock() {
        let c = item(
            ConditionKind::Time,
            ConditionOperator::After,
            ConditionValue::Time(TimeRange {
                start: "25:00".into(),
                end: None,
                timezone: None,
            }),
        );
        let err = c.validate(3).unwrap_err();
        let AppError::Validation { details, .. } = err else {
            panic!("expected validation error");
        };
        assert_eq!(details["field"], "conditions[3].value.start");
    }

    #[test]
    fn test_time_between_requires_end() {
        let c = item(
            ConditionKind::Time,
            ConditionOperator::Between,
            ConditionValue::Time(TimeRange {
                start: "09:00".into(),
                end: None,
                timezone: None,
            }),
        );
        assert!(c.validate(0).is_err());
    }

    #[test]
    fn test_time_condition_rejects_unknown_timezone() {
        let c = item(
            ConditionKind::Time,
            ConditionOperator::After,
            ConditionValue::Time(TimeRange {
                start: "09:00".into(),
                end: None,
                timezone: Some("Mars/Olympus_Mons".into()),
            }),
        );
        assert!(c.validate(0).is_err());
    }

    #[test]
    fn test_day_of_week_accepts_singleton_and_list() {
        let single = item(
            ConditionKind::DayOfWeek,
            ConditionOperator::Equals,
            ConditionValue::Single("3".into()),
        );
        assert!(single.validate(0).is_ok());

        let many = item(
            ConditionKind::DayOfWeek,
            ConditionOperator::In,
            ConditionValue::Many(vec!["1".into(), "2".into(), "5".into()]),
        );
        assert!(many.validate(0).is_ok());
    }

    #[test]
    fn test_day_of_week_rejects_out_of_range() {
        let c = item(
            ConditionKind::DayOfWeek,
            ConditionOperator::In,
            ConditionValue::Many(vec!["7".into()]),
        );
        assert!(c.validate(0).is_err());
    }

    #[test]
    fn test_routing_conditions_bounds() {
        let empty = RoutingConditions {
            operator: ConditionLogic::And,
            conditions: vec![],
        };
        assert!(empty.validate().is_err());

        let item = item(
            ConditionKind::Device,
            ConditionOperator::Equals,
            ConditionValue::Single("mobile".into()),
        );
        let too_many = RoutingConditions {
            operator: ConditionLogic::Or,
            conditions: vec![item.clone(); MAX_CONDITIONS_PER_RULE + 1],
        };
        assert!(too_many.validate().is_err());

        let ok = RoutingConditions {
            operator: ConditionLogic::And,
            conditions: vec![item],
        };
        assert!(ok.validate().is_ok());
    }

    #[test]
    fn test_serde_wire_format() {
        let json = serde_json::json!({
            "operator": "AND",
            "conditions": [
                { "type": "country", "operator": "in", "value": ["US", "CA"] },
                { "type": "time", "operator": "between",
                  "value": { "start": "22:00", "end": "06:00", "timezone": "America/New_York" } },
                { "type": "day_of_week", "operator": "in", "value": ["1", "2"] }
            ]
        });

        let parsed: RoutingConditions = serde_json::from_value(json.clone()).unwrap();
        assert_eq!(parsed.operator, ConditionLogic::And);
        assert_eq!(parsed.conditions.len(), 3);
        assert_eq!(parsed.conditions[0].kind, ConditionKind::Country);
        assert!(matches!(
            parsed.conditions[1].value,
            ConditionValue::Time(_)
        ));
        assert!(parsed.validate().is_ok());

        // Round-trips without losing the untagged value shapes.
        let back = serde_json::to_value(&parsed).unwrap();
        assert_eq!(back, json);
    }
}
