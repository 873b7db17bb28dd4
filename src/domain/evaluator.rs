//! Pure condition evaluation against a visitor context.
//!
//! [`evaluate`] is synchronous and CPU-only; it never suspends, never mutates
//! anything, and never fails the caller. A malformed condition logs a warning
//! and counts as a non-match (fail-closed) so one bad condition cannot take
//! down matching for an entire rule set.

use chrono::{DateTime, Datelike, Timelike, Utc};
use chrono_tz::Tz;
use std::str::FromStr;
use tracing::warn;

use crate::domain::conditions::{
    ConditionItem, ConditionKind, ConditionLogic, ConditionOperator, ConditionValue,
    RoutingConditions, TimeRange,
};
use crate::domain::visitor::VisitorContext;

/// Evaluates a rule's condition tree against a visitor snapshot.
///
/// An empty condition list never matches. `AND` requires every item to match;
/// `OR` requires at least one.
pub fn evaluate(conditions: &RoutingConditions, context: &VisitorContext) -> bool {
    if conditions.conditions.is_empty() {
        return false;
    }

    match conditions.operator {
        ConditionLogic::And => conditions
            .conditions
            .iter()
            .all(|c| evaluate_condition(c, context)),
        ConditionLogic::Or => conditions
            .conditions
            .iter()
            .any(|c| evaluate_condition(c, context)),
    }
}

/// Evaluates a single condition. Dispatches on the condition kind.
pub fn evaluate_condition(condition: &ConditionItem, context: &VisitorContext) -> bool {
    match condition.kind {
        ConditionKind::Time => evaluate_time(condition, context),
        ConditionKind::DayOfWeek => evaluate_day_of_week(condition, context),
        _ => evaluate_generic(condition, context),
    }
}

/// String comparison over a context field.
///
/// Absent context fields match only the negated operators; present values are
/// compared case-insensitively after trimming.
fn evaluate_generic(condition: &ConditionItem, context: &VisitorContext) -> bool {
    let Some(actual) = context.field(condition.kind) else {
        return matches!(
            condition.operator,
            ConditionOperator::NotEquals | ConditionOperator::NotIn
        );
    };

    let actual = normalize(&actual);
    let expected: Vec<String> = condition
        .value
        .as_list()
        .iter()
        .map(|v| normalize(v))
        .collect();
    let first = expected.first().map(String::as_str).unwrap_or("");

    match condition.operator {
        ConditionOperator::Equals => actual == first,
        ConditionOperator::NotEquals => actual != first,
        ConditionOperator::Contains => actual.contains(first),
        ConditionOperator::NotContains => !actual.contains(first),
        ConditionOperator::StartsWith => actual.starts_with(first),
        ConditionOperator::EndsWith => actual.ends_with(first),
        // An empty list matches nothing in either direction rather than
        // degenerating into "match everything".
        ConditionOperator::In => !expected.is_empty() && expected.iter().any(|v| *v == actual),
        ConditionOperator::NotIn => !expected.is_empty() && !expected.iter().any(|v| *v == actual),
        _ => {
            warn!(
                kind = condition.kind.as_str(),
                "Unsupported operator for string condition, treating as non-match"
            );
            false
        }
    }
}

/// Local-clock window check in minutes since midnight.
fn evaluate_time(condition: &ConditionItem, context: &VisitorContext) -> bool {
    let ConditionValue::Time(range) = &condition.value else {
        warn!("Time condition without a time range value, treating as non-match");
        return false;
    };

    let tz = resolve_timezone(range.timezone.as_deref(), context);
    let now_minutes = local_minutes(context_now(context), tz);

    let Some(start) = parse_clock(&range.start) else {
        warn!(start = %range.start, "Time condition with unparseable start, treating as non-match");
        return false;
    };

    match condition.operator {
        ConditionOperator::Between => {
            let Some(end) = range.end.as_deref().and_then(parse_clock) else {
                warn!("between condition missing a valid end, treating as non-match");
                return false;
            };
            if start <= end {
                start <= now_minutes && now_minutes <= end
            } else {
                // Window spans midnight, e.g. 22:00-06:00.
                now_minutes >= start || now_minutes <= end
            }
        }
        ConditionOperator::Before => now_minutes < start,
        ConditionOperator::After => now_minutes > start,
        _ => {
            warn!("Unsupported operator for time condition, treating as non-match");
            false
        }
    }
}

/// Weekday membership check (0 = Sunday … 6 = Saturday) in the visitor's
/// timezone. Unlike `time`, there is no condition-level timezone override.
fn evaluate_day_of_week(condition: &ConditionItem, context: &VisitorContext) -> bool {
    let tz = resolve_timezone(None, context);
    let weekday = context_now(context)
        .with_timezone(&tz)
        .weekday()
        .num_days_from_sunday() as u8;

    let days: Vec<u8> = condition
        .value
        .as_list()
        .iter()
        .filter_map(|d| d.trim().parse::<u8>().ok())
        .collect();

    if days.is_empty() {
        warn!("day_of_week condition without parseable days, treating as non-match");
        return false;
    }

    match condition.operator {
        ConditionOperator::In | ConditionOperator::Equals => days.contains(&weekday),
        ConditionOperator::NotIn | ConditionOperator::NotEquals => !days.contains(&weekday),
        _ => {
            warn!("Unsupported operator for day_of_week condition, treating as non-match");
            false
        }
    }
}

/// Timezone precedence: condition-level override, then the context hint, then
/// UTC. Shared by the `time` and `day_of_week` paths so the fallback order
/// cannot drift between them.
fn resolve_timezone(condition_override: Option<&str>, context: &VisitorContext) -> Tz {
    condition_override
        .or(context.timezone.as_deref())
        .and_then(|name| match Tz::from_str(name) {
            Ok(tz) => Some(tz),
            Err(_) => {
                warn!(timezone = name, "Unknown timezone, falling back to UTC");
                None
            }
        })
        .unwrap_or(Tz::UTC)
}

fn context_now(context: &VisitorContext) -> DateTime<Utc> {
    context.now.unwrap_or_else(Utc::now)
}

/// Minutes since local midnight for the given instant in the given timezone.
fn local_minutes(now: DateTime<Utc>, tz: Tz) -> u32 {
    let local = now.with_timezone(&tz);
    local.hour() * 60 + local.minute()
}

fn parse_clock(value: &str) -> Option<u32> {
    let (hours, minutes) = value.split_once(':')?;
    let hours: u32 = hours.parse().ok()?;
    let minutes: u32 = minutes.parse().ok()?;
    if hours > 23 || minutes > 59 {
        return None;
    }
    Some(hours * 60 + minutes)
}

fn normalize(value: &str) -> String {
    value.trim().to_lowercase()
}
