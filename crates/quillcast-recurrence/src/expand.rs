//! Occurrence expansion — rule + exceptions + window → concrete instants.

use chrono::{DateTime, Datelike, Duration, LocalResult, NaiveDate, TimeZone, Utc};
use chrono_tz::Tz;

use crate::exceptions::ExceptionSet;
use crate::rule::{Cadence, RecurrenceRule, TimeOfDay};

/// A single computed instant at which a rule is due.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Occurrence {
    /// Absolute firing instant.
    pub at: DateTime<Utc>,
    /// Schedule-local calendar date — the key exceptions and execution
    /// records are matched on.
    pub local_date: NaiveDate,
    /// True when the local date is marked skipped. The occurrence stays in
    /// the output so callers can render it dimmed instead of losing it.
    pub skipped: bool,
}

/// Expand `rule` into every occurrence with `start <= at < end`, ascending.
///
/// Candidates are built on the rule's local calendar and converted through
/// its timezone: a wall-clock time inside a spring-forward gap has no
/// instant, so that day produces nothing; a time inside a fall-back overlap
/// resolves to the earlier of the two instants. Deterministic — `expand`
/// never reads a clock, so identical inputs give identical output.
pub fn expand(
    rule: &RecurrenceRule,
    exceptions: &ExceptionSet,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> Vec<Occurrence> {
    if start >= end {
        return Vec::new();
    }

    let tz = rule.timezone();
    let mut out = Vec::new();

    match rule.cadence() {
        Cadence::Custom { cron } => {
            // `after` is exclusive; back up one second so an occurrence
            // landing exactly on `start` is kept.
            let from = (start - Duration::seconds(1)).with_timezone(&tz);
            for at in cron.schedule().after(&from) {
                let at_utc = at.with_timezone(&Utc);
                if at_utc >= end {
                    break;
                }
                let local_date = at.date_naive();
                out.push(Occurrence {
                    at: at_utc,
                    local_date,
                    skipped: exceptions.is_skipped(local_date),
                });
            }
        }
        cadence => {
            // Walk local calendar days covering the window. The window edges
            // are converted to local dates so a day straddling midnight UTC
            // is still considered.
            let first = start.with_timezone(&tz).date_naive();
            let last = end.with_timezone(&tz).date_naive();
            let mut date = first;
            while date <= last {
                if matches_date(cadence, date) {
                    if let Some(at) = resolve_local(tz, date, rule.time_of_day()) {
                        if at >= start && at < end {
                            out.push(Occurrence {
                                at,
                                local_date: date,
                                skipped: exceptions.is_skipped(date),
                            });
                        }
                    }
                }
                date = match date.succ_opt() {
                    Some(next) => next,
                    None => break,
                };
            }
        }
    }

    out
}

/// Does the rule's cadence name this local calendar date?
///
/// Only meaningful for the calendar-walk cadences; `Custom` enumerates
/// through its cron schedule instead.
pub(crate) fn matches_date(cadence: &Cadence, date: NaiveDate) -> bool {
    match cadence {
        Cadence::Daily => true,
        Cadence::Weekly { days_of_week } => {
            let ordinal = date.weekday().num_days_from_sunday() as u8;
            days_of_week.contains(&ordinal)
        }
        Cadence::Monthly { day_of_month } => date.day() == u32::from(*day_of_month),
        Cadence::Custom { .. } => false,
    }
}

/// Resolve a schedule-local wall-clock time to an absolute instant.
///
/// Spring-forward gap: no representable instant, the day is dropped.
/// Fall-back overlap: the earlier of the two instants wins.
pub(crate) fn resolve_local(tz: Tz, date: NaiveDate, time: TimeOfDay) -> Option<DateTime<Utc>> {
    let naive = date.and_hms_opt(u32::from(time.hour), u32::from(time.minute), 0)?;
    match tz.from_local_datetime(&naive) {
        LocalResult::Single(at) => Some(at.with_timezone(&Utc)),
        LocalResult::Ambiguous(earlier, _later) => Some(earlier.with_timezone(&Utc)),
        LocalResult::None => None,
    }
}
