//! Operating window calculation.
//!
//! Polling only happens inside configured hours-of-day and days-of-week.
//! Days are numbered from Monday (`0`) to Sunday (`6`). All calculations use
//! naive local wall-clock time and ignore daylight-saving transitions.

use std::collections::BTreeSet;

use chrono::{Datelike, NaiveDateTime, Timelike};
use thiserror::Error;

/// Highest valid hour-of-day.
pub const MAX_HOUR: u32 = 23;

/// Highest valid day-of-week (Sunday).
pub const MAX_DAY: u32 = 6;

/// Largest value [`parse_range`] accepts when the caller gives no bound.
pub const MAX_SPEC_VALUE: u32 = u16::MAX as u32;

/// Default hours when the spec is `*` or empty.
pub const ALL_HOURS: &str = "0-23";

/// Default days when the spec is `*` or empty.
pub const ALL_DAYS: &str = "0-6";

const SECS_PER_HOUR: u64 = 60 * 60;
const HOURS_PER_WEEK: u64 = 7 * 24;

/// Errors raised while parsing a window specification.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WindowError {
    /// The specification string is malformed or out of range.
    #[error("invalid spec '{spec}': {reason}")]
    InvalidSpec { spec: String, reason: String },
}

impl WindowError {
    fn invalid(spec: &str, reason: impl Into<String>) -> Self {
        Self::InvalidSpec {
            spec: spec.to_string(),
            reason: reason.into(),
        }
    }
}

/// Parse a comma-separated list of integers and inclusive `a-b` ranges.
///
/// `*` or an empty string selects `default`, which is parsed the same way.
/// Without a default such input is rejected: the parser never invents an
/// unrestricted set.
///
/// # Examples
///
/// ```
/// use cimon::window::parse_range;
///
/// let hours = parse_range("4-6,9", None).unwrap();
/// assert_eq!(hours.into_iter().collect::<Vec<_>>(), vec![4, 5, 6, 9]);
///
/// let all = parse_range("*", Some("0-6")).unwrap();
/// assert_eq!(all.len(), 7);
///
/// assert!(parse_range("21-3", None).is_err());
/// ```
pub fn parse_range(spec: &str, default: Option<&str>) -> Result<BTreeSet<u32>, WindowError> {
    parse_range_within(spec, default, MAX_SPEC_VALUE)
}

/// [`parse_range`] with every value limited to `max`.
///
/// Endpoints are checked before a range is expanded, so an oversized spec
/// fails without allocating.
pub fn parse_range_within(
    spec: &str,
    default: Option<&str>,
    max: u32,
) -> Result<BTreeSet<u32>, WindowError> {
    let trimmed = spec.trim();
    if trimmed.is_empty() || trimmed == "*" {
        return match default {
            Some(default) => parse_range_within(default, None, max),
            None => Err(WindowError::invalid(spec, "no default for '*' or empty spec")),
        };
    }

    let mut values = BTreeSet::new();
    for token in trimmed.split(',') {
        let bounds = token
            .split('-')
            .map(|part| parse_value(spec, part, max))
            .collect::<Result<Vec<_>, _>>()?;

        match bounds.as_slice() {
            [single] => {
                values.insert(*single);
            }
            [from, to] if from <= to => values.extend(*from..=*to),
            [from, to] => {
                return Err(WindowError::invalid(
                    spec,
                    format!("descending range {from}-{to}"),
                ));
            }
            _ => {
                return Err(WindowError::invalid(
                    spec,
                    format!("range '{}' has more than two endpoints", token.trim()),
                ));
            }
        }
    }
    Ok(values)
}

fn parse_value(spec: &str, part: &str, max: u32) -> Result<u32, WindowError> {
    let part = part.trim();
    let value = part
        .parse::<u32>()
        .map_err(|_| WindowError::invalid(spec, format!("'{part}' is not a number")))?;
    if value > max {
        return Err(WindowError::invalid(
            spec,
            format!("value {value} exceeds {max}"),
        ));
    }
    Ok(value)
}

/// Allowed hours and days for polling.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperatingWindow {
    hours: BTreeSet<u32>,
    days: BTreeSet<u32>,
}

impl OperatingWindow {
    /// Build a window from explicit sets.
    ///
    /// # Errors
    /// Returns `WindowError::InvalidSpec` if a set is empty or holds a value
    /// out of range.
    pub fn new(hours: BTreeSet<u32>, days: BTreeSet<u32>) -> Result<Self, WindowError> {
        check_bounds("hours", &hours, MAX_HOUR)?;
        check_bounds("days", &days, MAX_DAY)?;
        Ok(Self { hours, days })
    }

    /// Parse hour and day specs, defaulting to every hour and every day.
    pub fn parse(hours: &str, days: &str) -> Result<Self, WindowError> {
        Self::new(
            parse_range_within(hours, Some(ALL_HOURS), MAX_HOUR)?,
            parse_range_within(days, Some(ALL_DAYS), MAX_DAY)?,
        )
    }

    /// A window that is always open.
    pub fn always() -> Self {
        Self {
            hours: (0..=MAX_HOUR).collect(),
            days: (0..=MAX_DAY).collect(),
        }
    }

    pub fn hours(&self) -> &BTreeSet<u32> {
        &self.hours
    }

    pub fn days(&self) -> &BTreeSet<u32> {
        &self.days
    }

    /// True if `now` falls in an allowed hour on an allowed day.
    pub fn is_operating(&self, now: NaiveDateTime) -> bool {
        self.contains(now.hour(), now.weekday().num_days_from_monday())
    }

    /// Whole seconds until the window next opens, `0` if it is open now.
    pub fn seconds_to_next_operating(&self, now: NaiveDateTime) -> u64 {
        if self.is_operating(now) {
            return 0;
        }

        let hour = u64::from(now.hour());
        let day = u64::from(now.weekday().num_days_from_monday());
        let into_hour = u64::from(now.minute() * 60 + now.second());
        let to_next_boundary = SECS_PER_HOUR - into_hour;

        // Walk hour boundaries forward; a full week always reaches every
        // (hour, day) pair, and both sets are non-empty.
        for step in 0..HOURS_PER_WEEK {
            let absolute = hour + 1 + step;
            let candidate_hour = (absolute % 24) as u32;
            let candidate_day = ((day + absolute / 24) % 7) as u32;
            if self.contains(candidate_hour, candidate_day) {
                return to_next_boundary + step * SECS_PER_HOUR;
            }
        }
        to_next_boundary + HOURS_PER_WEEK * SECS_PER_HOUR
    }

    fn contains(&self, hour: u32, day: u32) -> bool {
        self.hours.contains(&hour) && self.days.contains(&day)
    }
}

impl Default for OperatingWindow {
    fn default() -> Self {
        Self::always()
    }
}

fn check_bounds(label: &str, values: &BTreeSet<u32>, max: u32) -> Result<(), WindowError> {
    let spec = format!("{values:?}");
    if values.is_empty() {
        return Err(WindowError::invalid(&spec, format!("{label} must not be empty")));
    }
    match values.last() {
        Some(&highest) if highest > max => Err(WindowError::invalid(
            &spec,
            format!("{label} value {highest} exceeds {max}"),
        )),
        _ => Ok(()),
    }
}
