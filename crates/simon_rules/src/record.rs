//! The best-score record.

use std::num::NonZeroU32;

use chrono::{DateTime, Local, TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// Best round ever reached, with the moment it was captured.
///
/// Records are immutable: a better game produces a new `Record` that replaces
/// the old one. "No record yet" is `Option::<Record>::None`, never a zero round.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    max_round: NonZeroU32,
    captured_at: DateTime<Utc>,
}

impl Record {
    /// Creates a record.
    ///
    /// The capture time is truncated to whole milliseconds, the precision it
    /// is persisted with.
    pub fn new(max_round: NonZeroU32, captured_at: DateTime<Utc>) -> Self {
        let captured_at = DateTime::<Utc>::from_timestamp_millis(captured_at.timestamp_millis())
            .unwrap_or(captured_at);
        Self {
            max_round,
            captured_at,
        }
    }

    /// Rebuilds a record from its persisted pair.
    ///
    /// A non-positive round means nothing was stored and yields `None`, as
    /// does a timestamp chrono cannot represent.
    pub fn from_parts(max_round: i64, captured_at_millis: i64) -> Option<Self> {
        let max_round = u32::try_from(max_round).ok().and_then(NonZeroU32::new)?;
        let captured_at = DateTime::<Utc>::from_timestamp_millis(captured_at_millis)?;
        Some(Self::new(max_round, captured_at))
    }

    /// The best round reached. Always at least 1.
    pub fn max_round(&self) -> u32 {
        self.max_round.get()
    }

    /// When the record was set.
    pub fn captured_at(&self) -> DateTime<Utc> {
        self.captured_at
    }

    /// Capture time as milliseconds since the Unix epoch.
    pub fn captured_at_millis(&self) -> i64 {
        self.captured_at.timestamp_millis()
    }

    /// Capture time as `YYYY-MM-DD HH:MM:SS` in the local time zone.
    pub fn formatted_captured_at(&self) -> String {
        self.formatted_captured_at_in(&Local)
    }

    /// Capture time as `YYYY-MM-DD HH:MM:SS` in the given time zone.
    pub fn formatted_captured_at_in<Tz>(&self, zone: &Tz) -> String
    where
        Tz: TimeZone,
        Tz::Offset: std::fmt::Display,
    {
        self.captured_at
            .with_timezone(zone)
            .format("%Y-%m-%d %H:%M:%S")
            .to_string()
    }
}

impl std::fmt::Display for Record {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "level {} ({})", self.max_round, self.formatted_captured_at())
    }
}
