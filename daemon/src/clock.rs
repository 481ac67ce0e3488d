/// Wall-clock access and the time/duration formatting used in notification text.
///
/// The clock is a trait so the notifier can be driven with fixed instants in
/// tests; the daemon uses [`SystemClock`].
use std::fmt::{self, Write as _};

use chrono::format::{Item, StrftimeItems};
use chrono::{DateTime, FixedOffset, Local, TimeDelta, Utc};
use serde::Deserialize;

/// 12-hour clock with seconds and an AM/PM marker, e.g. `09:41:07 PM`.
pub const DEFAULT_TIME_FORMAT: &str = "%I:%M:%S %p";

const SECS_PER_DAY: i64 = 86_400;

/// Source of "now" for the notifier.
pub trait Clock {
    fn now(&self) -> DateTime<FixedOffset>;
}

/// Reads the host's local wall clock.
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<FixedOffset> {
        Local::now().fixed_offset()
    }
}

/// A validated strftime pattern used to render wall-clock times.
///
/// Construction rejects patterns chrono cannot parse or cannot render (some
/// specifiers such as `%#z` are parse-only), so formatting never fails.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(try_from = "String")]
pub struct TimeFormat(String);

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
#[error("invalid time format {0:?}")]
pub struct InvalidTimeFormat(pub String);

impl TimeFormat {
    pub fn new(pattern: &str) -> Result<Self, InvalidTimeFormat> {
        let valid = !pattern.is_empty()
            && StrftimeItems::new(pattern).all(|item| !matches!(item, Item::Error))
            && renders(pattern);
        if valid {
            Ok(Self(pattern.to_string()))
        } else {
            Err(InvalidTimeFormat(pattern.to_string()))
        }
    }

    /// 24-hour clock with seconds, e.g. `21:41:07`.
    #[cfg(test)]
    pub fn twenty_four_hour() -> Self {
        Self("%H:%M:%S".to_string())
    }

    pub fn render(&self, time: &DateTime<FixedOffset>) -> String {
        time.format(&self.0).to_string()
    }
}

/// Formats a fixed instant with `pattern`; chrono reports unrenderable
/// specifiers as a `fmt::Error`.
fn renders(pattern: &str) -> bool {
    let sample = DateTime::<Utc>::default().fixed_offset();
    let mut out = String::new();
    write!(out, "{}", sample.format(pattern)).is_ok()
}

impl Default for TimeFormat {
    fn default() -> Self {
        Self(DEFAULT_TIME_FORMAT.to_string())
    }
}

impl TryFrom<String> for TimeFormat {
    type Error = InvalidTimeFormat;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(&value)
    }
}

impl fmt::Display for TimeFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Renders an elapsed time as `H:MM:SS`, dropping any sub-second part.
///
/// Hours are not zero-padded. Spans of a day or more are prefixed with the day
/// count (`1 day, 2:03:04`, `3 days, 0:00:00`). Negative spans render as zero.
pub fn format_duration(elapsed: TimeDelta) -> String {
    // num_seconds truncates toward zero.
    let total = elapsed.num_seconds().max(0);
    let days = total / SECS_PER_DAY;
    let rem = total % SECS_PER_DAY;
    let clock = format!("{}:{:02}:{:02}", rem / 3600, rem % 3600 / 60, rem % 60);
    match days {
        0 => clock,
        1 => format!("1 day, {clock}"),
        n => format!("{n} days, {clock}"),
    }
}
