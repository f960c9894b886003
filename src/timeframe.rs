use std::fmt;
use std::time::Duration;

/// Shortest allowed polling interval, bounded by the ingestion API's rate limit
pub const MIN_INTERVAL_SECS: u64 = 120;

pub const DEFAULT_INTERVAL_SECS: u64 = MIN_INTERVAL_SECS;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Unit {
    Seconds,
    Minutes,
    Hours,
    Days,
}

impl Unit {
    fn from_char(c: char) -> Option<Self> {
        match c {
            's' => Some(Unit::Seconds),
            'm' => Some(Unit::Minutes),
            'h' => Some(Unit::Hours),
            'd' => Some(Unit::Days),
            _ => None,
        }
    }

    fn multiplier(self) -> u64 {
        match self {
            Unit::Seconds => 1,
            Unit::Minutes => 60,
            Unit::Hours => 3600,
            Unit::Days => 86400,
        }
    }

    fn label(self, value: u64) -> &'static str {
        let plural = value != 1;
        match (self, plural) {
            (Unit::Seconds, false) => "second",
            (Unit::Seconds, true) => "seconds",
            (Unit::Minutes, false) => "minute",
            (Unit::Minutes, true) => "minutes",
            (Unit::Hours, false) => "hour",
            (Unit::Hours, true) => "hours",
            (Unit::Days, false) => "day",
            (Unit::Days, true) => "days",
        }
    }
}

/// Resolved polling interval
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntervalConfig {
    pub seconds: u64,
    pub label: String,
}

impl IntervalConfig {
    pub fn duration(&self) -> Duration {
        Duration::from_secs(self.seconds)
    }
}

impl Default for IntervalConfig {
    fn default() -> Self {
        Self {
            seconds: DEFAULT_INTERVAL_SECS,
            label: format!("{} minutes", DEFAULT_INTERVAL_SECS / 60),
        }
    }
}

impl fmt::Display for IntervalConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TimeframeReason {
    Malformed,
    BelowMinimum(u64),
    Overflow,
}

impl fmt::Display for TimeframeReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TimeframeReason::Malformed => {
                write!(f, "expected <number><unit> with unit one of s, m, h, d")
            }
            TimeframeReason::BelowMinimum(secs) => write!(
                f,
                "{} seconds is below the minimum of {} seconds",
                secs, MIN_INTERVAL_SECS
            ),
            TimeframeReason::Overflow => write!(f, "interval is too large"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid timeframe '{token}': {reason}")]
pub struct InvalidTimeframe {
    pub token: String,
    pub reason: TimeframeReason,
}

/// Parse an interval token such as `5m`, `--1h` or `2d`.
///
/// Leading dashes are ignored and the token is case-insensitive. The resolved
/// interval must be at least [`MIN_INTERVAL_SECS`].
pub fn parse(token: &str) -> Result<IntervalConfig, InvalidTimeframe> {
    let invalid = |reason| InvalidTimeframe {
        token: token.to_string(),
        reason,
    };

    let body = token.trim().trim_start_matches('-').to_lowercase();
    let mut chars = body.chars();
    let unit = chars
        .next_back()
        .and_then(Unit::from_char)
        .ok_or_else(|| invalid(TimeframeReason::Malformed))?;
    let digits = chars.as_str();

    if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
        return Err(invalid(TimeframeReason::Malformed));
    }

    let value: u64 = digits
        .parse()
        .map_err(|_| invalid(TimeframeReason::Overflow))?;
    let seconds = value
        .checked_mul(unit.multiplier())
        .ok_or_else(|| invalid(TimeframeReason::Overflow))?;

    if seconds < MIN_INTERVAL_SECS {
        return Err(invalid(TimeframeReason::BelowMinimum(seconds)));
    }

    Ok(IntervalConfig {
        seconds,
        label: format!("{} {}", value, unit.label(value)),
    })
}

/// True when an argument has the shape of an interval flag (`--` followed by a digit)
pub fn looks_like_timeframe(arg: &str) -> bool {
    arg.strip_prefix("--")
        .and_then(|rest| rest.chars().next())
        .is_some_and(|c| c.is_ascii_digit())
}
