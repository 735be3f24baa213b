//! Variables every dashboard provides from its time range.

use chrono::{DateTime, Utc};

use super::state::{VariableState, VariableStateMap};

/// Start and end of the dashboard's current time range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AbsoluteTimeRange {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl AbsoluteTimeRange {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self { start, end }
    }

    /// Length of the range in milliseconds; negative ranges clamp to zero.
    pub fn duration_ms(&self) -> i64 {
        (self.end - self.start).num_milliseconds().max(0)
    }
}

pub const BUILTIN_FROM: &str = "__from";
pub const BUILTIN_TO: &str = "__to";
pub const BUILTIN_RANGE: &str = "__range";
pub const BUILTIN_RANGE_S: &str = "__range_s";
pub const BUILTIN_RANGE_MS: &str = "__range_ms";

/// `__from`, `__to` (unix ms), `__range`, `__range_s` and `__range_ms`.
pub fn builtin_variables(range: &AbsoluteTimeRange) -> VariableStateMap {
    let range_ms = range.duration_ms();
    let range_s = range_ms as f64 / 1000.0;

    [
        (BUILTIN_FROM, range.start.timestamp_millis().to_string()),
        (BUILTIN_TO, range.end.timestamp_millis().to_string()),
        (BUILTIN_RANGE, format_prometheus_duration(range_ms)),
        (BUILTIN_RANGE_S, range_s.to_string()),
        (BUILTIN_RANGE_MS, range_ms.to_string()),
    ]
    .into_iter()
    .map(|(name, value)| (name.to_string(), VariableState::with_value(value)))
    .collect()
}

const UNITS: [(&str, i64); 7] = [
    ("y", 365 * 24 * 60 * 60 * 1000),
    ("w", 7 * 24 * 60 * 60 * 1000),
    ("d", 24 * 60 * 60 * 1000),
    ("h", 60 * 60 * 1000),
    ("m", 60 * 1000),
    ("s", 1000),
    ("ms", 1),
];

/// Render milliseconds as a Prometheus duration such as `1h30m` or `1d255ms`.
pub fn format_prometheus_duration(ms: i64) -> String {
    if ms <= 0 {
        return "0s".to_string();
    }

    let mut remaining = ms;
    let mut out = String::new();
    for (unit, size) in UNITS {
        let count = remaining / size;
        if count > 0 {
            out.push_str(&count.to_string());
            out.push_str(unit);
            remaining -= count * size;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn range(start_ms: i64, end_ms: i64) -> AbsoluteTimeRange {
        AbsoluteTimeRange::new(
            Utc.timestamp_millis_opt(start_ms).unwrap(),
            Utc.timestamp_millis_opt(end_ms).unwrap(),
        )
    }

    fn value_of(states: &VariableStateMap, name: &str) -> String {
        states[name]
            .value
            .as_ref()
            .and_then(|v| v.as_single())
            .unwrap()
            .to_string()
    }

    #[test]
    fn test_builtin_values() {
        let states = builtin_variables(&range(1_700_000_000_000, 1_700_005_400_000));

        assert_eq!(value_of(&states, BUILTIN_FROM), "1700000000000");
        assert_eq!(value_of(&states, BUILTIN_TO), "1700005400000");
        assert_eq!(value_of(&states, BUILTIN_RANGE), "1h30m");
        assert_eq!(value_of(&states, BUILTIN_RANGE_S), "5400");
        assert_eq!(value_of(&states, BUILTIN_RANGE_MS), "5400000");
    }

    #[test]
    fn test_fractional_seconds() {
        let states = builtin_variables(&range(0, 1_500));
        assert_eq!(value_of(&states, BUILTIN_RANGE_S), "1.5");
        assert_eq!(value_of(&states, BUILTIN_RANGE), "1s500ms");
    }

    #[test]
    fn test_format_prometheus_duration() {
        assert_eq!(format_prometheus_duration(24 * 3_600_000), "1d");
        assert_eq!(format_prometheus_duration(30 * 24 * 3_600_000), "4w2d");
        assert_eq!(format_prometheus_duration(24 * 3_600_000 + 255), "1d255ms");
        assert_eq!(format_prometheus_duration(0), "0s");
    }
}
