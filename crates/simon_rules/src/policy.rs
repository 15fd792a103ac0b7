//! Deciding whether a finished game sets a new record.

use std::num::NonZeroU32;

use chrono::{DateTime, Utc};
use tracing::{debug, instrument};

use crate::Record;

/// Compares a finished game against the current record.
///
/// Stateless: the only input besides the arguments is the wall clock, and
/// [`RecordPolicy::evaluate_at`] takes even that explicitly.
#[derive(Debug, Clone, Copy, Default)]
pub struct RecordPolicy;

impl RecordPolicy {
    /// Returns a new record stamped with the current time if `completed_round`
    /// beats `current`, otherwise `None`.
    pub fn evaluate(completed_round: u32, current: Option<&Record>) -> Option<Record> {
        Self::evaluate_at(completed_round, current, Utc::now())
    }

    /// Like [`RecordPolicy::evaluate`] with an explicit capture time.
    #[instrument(skip(current), fields(best = ?current.map(Record::max_round)))]
    pub fn evaluate_at(
        completed_round: u32,
        current: Option<&Record>,
        now: DateTime<Utc>,
    ) -> Option<Record> {
        let best = current.map_or(0, Record::max_round);
        if completed_round <= best {
            debug!(completed_round, best, "Record stands");
            return None;
        }
        // completed_round > best >= 0, so it is non-zero.
        let max_round = NonZeroU32::new(completed_round)?;
        debug!(completed_round, previous = best, "New record");
        Some(Record::new(max_round, now))
    }
}
