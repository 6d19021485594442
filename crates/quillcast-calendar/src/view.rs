use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use chrono::{DateTime, Duration, NaiveDate, Utc};
use tracing::instrument;

use quillcast_core::types::RunKind;
use quillcast_recurrence::expand;
use quillcast_registry::{ExecutionRecord, ScheduleRegistry};

use crate::error::{CalendarError, Result};
use crate::types::{CalendarDay, CalendarEntry};

/// Read-only aggregator over the registry.
pub struct CalendarView {
    registry: Arc<ScheduleRegistry>,
}

impl CalendarView {
    pub fn new(registry: Arc<ScheduleRegistry>) -> Self {
        Self { registry }
    }

    /// Merge planned occurrences and recorded executions into a complete
    /// day-keyed view of `[start, end)`.
    ///
    /// - Records are shown for every schedule, active or not.
    /// - Planned occurrences come only from active schedules, flagged
    ///   skipped where the exception set says so.
    /// - A scheduled record for a (schedule, date) suppresses the planned
    ///   entry for exactly that date; manual records ride alongside instead
    ///   of displacing anything.
    /// - Duplicate records for the same (schedule, date, kind) collapse to
    ///   the most recently executed one.
    ///
    /// Every date in range gets a `CalendarDay`, empty or not. The query
    /// mutates nothing.
    #[instrument(skip(self))]
    pub fn query(&self, start: NaiveDate, end: NaiveDate) -> Result<BTreeMap<NaiveDate, CalendarDay>> {
        if start > end {
            return Err(CalendarError::InvalidRange { start, end });
        }

        let mut days: BTreeMap<NaiveDate, CalendarDay> = BTreeMap::new();
        let mut date = start;
        while date < end {
            days.insert(date, CalendarDay::empty(date));
            date = match date.succ_opt() {
                Some(next) => next,
                None => break,
            };
        }
        if days.is_empty() {
            return Ok(days);
        }

        let schedules = self.registry.list()?;
        let records = self.registry.executions_in_range(start, end)?;

        // Collapse duplicates: newest execution wins per (schedule, date, kind).
        let mut latest: HashMap<(String, NaiveDate, RunKind), ExecutionRecord> = HashMap::new();
        for record in records {
            let key = (
                record.schedule_id.to_string(),
                record.occurrence_date,
                record.kind,
            );
            match latest.get(&key) {
                Some(existing) if existing.executed_at >= record.executed_at => {}
                _ => {
                    latest.insert(key, record);
                }
            }
        }

        // Planned occurrences for active schedules. The expansion window is
        // padded by a day on each side: a schedule-local date can map to a
        // UTC instant up to a zone offset away.
        let (window_start, window_end) = expansion_window(start, end);
        for schedule in &schedules {
            if !schedule.is_active {
                continue;
            }
            let occurrences = expand(
                &schedule.rule,
                &schedule.exceptions,
                window_start,
                window_end,
            );
            for occ in occurrences {
                if occ.local_date < start || occ.local_date >= end {
                    continue;
                }
                let realized_key = (
                    schedule.id.to_string(),
                    occ.local_date,
                    RunKind::Scheduled,
                );
                if latest.contains_key(&realized_key) {
                    // The day already ran — the record will stand in for it.
                    continue;
                }
                if let Some(day) = days.get_mut(&occ.local_date) {
                    day.entries.push(CalendarEntry::Planned {
                        schedule_id: schedule.id.clone(),
                        subject: schedule.name.clone(),
                        at: occ.at,
                        skipped: occ.skipped,
                    });
                }
            }
        }

        // Realized entries, for every schedule regardless of activation.
        let names: HashMap<&str, &str> = schedules
            .iter()
            .map(|s| (s.id.as_str(), s.name.as_str()))
            .collect();
        for record in latest.into_values() {
            let subject = names
                .get(record.schedule_id.as_str())
                .map(|n| n.to_string())
                .unwrap_or_else(|| record.schedule_id.to_string());
            if let Some(day) = days.get_mut(&record.occurrence_date) {
                day.entries.push(CalendarEntry::Realized {
                    schedule_id: record.schedule_id,
                    subject,
                    at: record.executed_at,
                    success: record.success,
                    error: record.error,
                    post_id: record.post_id,
                    run_kind: record.kind,
                });
            }
        }

        for day in days.values_mut() {
            day.entries.sort_by_key(CalendarEntry::at);
        }

        Ok(days)
    }
}

/// UTC instant window wide enough to catch every occurrence whose
/// schedule-local date falls in `[start, end)`.
fn expansion_window(start: NaiveDate, end: NaiveDate) -> (DateTime<Utc>, DateTime<Utc>) {
    let start_instant = start
        .and_hms_opt(0, 0, 0)
        .map(|dt| dt.and_utc())
        .unwrap_or_default();
    let end_instant = end
        .and_hms_opt(0, 0, 0)
        .map(|dt| dt.and_utc())
        .unwrap_or_default();
    (
        start_instant - Duration::days(1),
        end_instant + Duration::days(1),
    )
}
