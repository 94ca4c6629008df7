//! Recording-time accounting across pause/resume segments.
//!
//! The accountant persists the absolute wall-clock start of the in-progress
//! segment, never a pre-computed elapsed value. A reopened popup can therefore
//! show the correct total immediately from `current_total(now)` without any
//! tick having elapsed, and a stale elapsed value can never be added back in
//! twice.

use chrono::{DateTime, Utc};
use tracing::warn;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DurationAccountant {
    /// Total seconds from all completed segments of the current session.
    accumulated_secs: i64,
    /// Wall-clock start of the current segment, `None` when not recording.
    segment_start: Option<DateTime<Utc>>,
}

impl DurationAccountant {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuilds the accountant from persisted fields.
    pub fn restore(accumulated_secs: i64, segment_start: Option<DateTime<Utc>>) -> Self {
        Self {
            accumulated_secs,
            segment_start,
        }
    }

    /// Opens a new segment. Called on fresh start and on resume.
    pub fn start_segment(&mut self, now: DateTime<Utc>) {
        self.segment_start = Some(now);
    }

    /// Closes the current segment, folding its elapsed time into the
    /// accumulator. Calling without an open segment is a programming error;
    /// it logs and no-ops rather than corrupting the total.
    pub fn end_segment(&mut self, now: DateTime<Utc>) {
        match self.segment_start.take() {
            Some(start) => self.accumulated_secs += elapsed_secs(start, now),
            None => warn!("end_segment called with no active segment; ignoring"),
        }
    }

    /// Total recorded seconds as of `now`, including the open segment.
    /// Pure with respect to state; safe to call on every display tick.
    pub fn current_total(&self, now: DateTime<Utc>) -> i64 {
        let in_progress = self
            .segment_start
            .map(|start| elapsed_secs(start, now))
            .unwrap_or(0);
        self.accumulated_secs + in_progress
    }

    pub fn accumulated_secs(&self) -> i64 {
        self.accumulated_secs
    }

    pub fn segment_start(&self) -> Option<DateTime<Utc>> {
        self.segment_start
    }

    pub fn is_running(&self) -> bool {
        self.segment_start.is_some()
    }

    /// Zeroes both fields. Only for starting a brand-new session, never on
    /// pause.
    pub fn reset(&mut self) {
        self.accumulated_secs = 0;
        self.segment_start = None;
    }

    /// Replaces the accumulator with a stored total and closes any segment.
    /// Used when loading a historical session for viewing.
    pub fn load_total(&mut self, total_secs: i64) {
        self.accumulated_secs = total_secs;
        self.segment_start = None;
    }
}

/// Whole elapsed seconds, clamped to zero so a restored segment start that
/// sits ahead of a skewed wall clock cannot produce a negative contribution.
fn elapsed_secs(start: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    now.signed_duration_since(start).num_seconds().max(0)
}
