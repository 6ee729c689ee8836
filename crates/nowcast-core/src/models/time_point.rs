//! Minute-granular instant used as the join key across all series
//!
//! Backend payloads carry full RFC 3339 timestamps (`2024-06-01T10:30:00+00:00`,
//! `2024-06-01T10:30:00.000Z`). Charts and lookups only care about the minute,
//! so every timestamp is normalized to UTC with seconds and fractions dropped.

use chrono::{DateTime, Duration, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Canonical key format (`2024-06-01T10:30`)
const KEY_FORMAT: &str = "%Y-%m-%dT%H:%M";

/// Error returned when a timestamp string cannot be normalized
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("Invalid timestamp '{input}'")]
pub struct TimePointParseError {
    pub input: String,
}

/// An instant truncated to the minute, always UTC
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TimePoint(DateTime<Utc>);

impl TimePoint {
    /// Build from any UTC instant, dropping seconds and sub-seconds
    pub fn from_datetime(dt: DateTime<Utc>) -> Self {
        let minute_secs = dt.timestamp().div_euclid(60) * 60;
        Self(DateTime::from_timestamp(minute_secs, 0).unwrap_or(dt))
    }

    /// Current wall-clock minute
    pub fn now() -> Self {
        Self::from_datetime(Utc::now())
    }

    /// Current time floored to the given step (30 minutes for the dashboard)
    pub fn now_floored(step: Duration) -> Self {
        Self::now().floor_to(step)
    }

    /// Floor to a multiple of `step` since the Unix epoch.
    ///
    /// Steps shorter than a minute leave the value unchanged.
    pub fn floor_to(self, step: Duration) -> Self {
        let step_secs = step.num_seconds();
        if step_secs < 60 {
            return self;
        }
        let secs = self.0.timestamp().div_euclid(step_secs) * step_secs;
        DateTime::from_timestamp(secs, 0).map(Self).unwrap_or(self)
    }

    /// Add a (possibly negative) duration, `None` on overflow
    pub fn checked_add(self, delta: Duration) -> Option<Self> {
        self.0.checked_add_signed(delta).map(Self::from_datetime)
    }

    /// Subtract a duration, `None` on overflow
    pub fn checked_sub(self, delta: Duration) -> Option<Self> {
        self.0.checked_sub_signed(delta).map(Self::from_datetime)
    }

    /// Underlying UTC instant
    pub fn as_datetime(&self) -> DateTime<Utc> {
        self.0
    }

    /// Full ISO form used by the web front-end (`2024-06-01T10:30:00.000Z`)
    pub fn to_iso_millis(&self) -> String {
        self.0.format("%Y-%m-%dT%H:%M:00.000Z").to_string()
    }

    /// Wall-clock label (`HH:MM`, UTC)
    pub fn time_label(&self) -> String {
        self.0.format("%H:%M").to_string()
    }
}

impl fmt::Display for TimePoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format(KEY_FORMAT))
    }
}

impl FromStr for TimePoint {
    type Err = TimePointParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();

        if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
            return Ok(Self::from_datetime(dt.with_timezone(&Utc)));
        }

        // Zone-less forms are taken as UTC
        for format in [KEY_FORMAT, "%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S"] {
            if let Ok(naive) = NaiveDateTime::parse_from_str(trimmed, format) {
                return Ok(Self::from_datetime(naive.and_utc()));
            }
        }

        Err(TimePointParseError {
            input: s.to_string(),
        })
    }
}

impl TryFrom<String> for TimePoint {
    type Error = TimePointParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<TimePoint> for String {
    fn from(value: TimePoint) -> Self {
        value.to_string()
    }
}

impl From<DateTime<Utc>> for TimePoint {
    fn from(value: DateTime<Utc>) -> Self {
        Self::from_datetime(value)
    }
}
