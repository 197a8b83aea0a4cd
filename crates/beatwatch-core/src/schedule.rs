//! Officer calendar arithmetic: half-open windows and overlap detection
//!
//! Pure functions over already-loaded visits. The engine loads the
//! officer's calendar and calls these inside the same transaction that
//! writes the new visit.

use chrono::{DateTime, Duration, Utc};

use crate::model::{Visit, VisitType};
use crate::workflow::VisitStatus;

pub const DEFAULT_VISIT_DURATION_MINUTES: u32 = 30;

/// Half-open interval `[start, end)`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeWindow {
    pub fn from_start(start: DateTime<Utc>, minutes: u32) -> Self {
        Self {
            start,
            end: start + Duration::minutes(i64::from(minutes)),
        }
    }

    /// `A.start < B.end && A.end > B.start`; touching ends do not overlap
    pub fn overlaps(&self, other: &TimeWindow) -> bool {
        self.start < other.end && self.end > other.start
    }

    pub fn duration_minutes(&self) -> i64 {
        (self.end - self.start).num_minutes()
    }
}

/// Visits on the calendar that collide with the candidate window
///
/// Cancelled visits never block. Emergency visits are exempt on both sides:
/// an Emergency candidate conflicts with nothing, and an existing Emergency
/// visit blocks nothing. `exclude_id` skips the visit being rescheduled.
pub fn find_conflicts<'a>(
    candidate: &TimeWindow,
    candidate_type: VisitType,
    calendar: &'a [Visit],
    exclude_id: Option<&str>,
) -> Vec<&'a Visit> {
    if candidate_type.is_conflict_exempt() {
        return Vec::new();
    }

    calendar
        .iter()
        .filter(|v| v.status != VisitStatus::Cancelled)
        .filter(|v| !v.visit_type.is_conflict_exempt())
        .filter(|v| exclude_id != Some(v.id.as_str()))
        .filter(|v| candidate.overlaps(&v.window()))
        .collect()
}

/// First window of `minutes` at or after `desired` that collides with nothing
///
/// Slides forward one duration at a time, trying at most `max_attempts`
/// positions.
pub fn first_free_window(
    desired: DateTime<Utc>,
    minutes: u32,
    visit_type: VisitType,
    calendar: &[Visit],
    max_attempts: u32,
) -> Option<TimeWindow> {
    (0..max_attempts)
        .map(|i| {
            TimeWindow::from_start(
                desired + Duration::minutes(i64::from(minutes) * i64::from(i)),
                minutes,
            )
        })
        .find(|w| find_conflicts(w, visit_type, calendar, None).is_empty())
}
