use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use quillcast_core::types::{RunKind, ScheduleId};

/// One rendered calendar entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "entry", rename_all = "snake_case")]
pub enum CalendarEntry {
    /// A computed-but-not-yet-realized occurrence of an active schedule.
    Planned {
        schedule_id: ScheduleId,
        /// Predicted subject — the schedule's display name.
        subject: String,
        at: DateTime<Utc>,
        /// True when the date is marked skipped; the UI renders it
        /// struck-through instead of dropping it.
        skipped: bool,
    },
    /// An execution record standing in for an occurrence that actually ran.
    Realized {
        schedule_id: ScheduleId,
        subject: String,
        at: DateTime<Utc>,
        success: bool,
        error: Option<String>,
        /// Generated post, when the pipeline got that far.
        post_id: Option<String>,
        run_kind: RunKind,
    },
}

impl CalendarEntry {
    /// The instant entries sort on within a day.
    pub fn at(&self) -> DateTime<Utc> {
        match self {
            CalendarEntry::Planned { at, .. } | CalendarEntry::Realized { at, .. } => *at,
        }
    }

    pub fn schedule_id(&self) -> &ScheduleId {
        match self {
            CalendarEntry::Planned { schedule_id, .. }
            | CalendarEntry::Realized { schedule_id, .. } => schedule_id,
        }
    }

    pub fn is_realized(&self) -> bool {
        matches!(self, CalendarEntry::Realized { .. })
    }
}

/// All entries for one calendar day, ordered by instant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalendarDay {
    pub date: NaiveDate,
    pub entries: Vec<CalendarEntry>,
}

impl CalendarDay {
    pub fn empty(date: NaiveDate) -> Self {
        Self {
            date,
            entries: Vec::new(),
        }
    }
}
