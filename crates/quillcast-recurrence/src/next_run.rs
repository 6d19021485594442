//! Next-run resolution — the earliest future, non-skipped occurrence.

use chrono::{DateTime, Duration, Utc};

use crate::exceptions::ExceptionSet;
use crate::expand::{matches_date, resolve_local};
use crate::rule::{Cadence, RecurrenceRule};

/// How far forward to search before concluding a rule has no upcoming run.
/// Two years covers every monthly/weekly gap an exception set can punch;
/// past it the schedule is treated as having no next run.
pub const NEXT_RUN_HORIZON_DAYS: i64 = 731;

/// Resolve the first occurrence strictly after `after` whose date is not
/// skipped, or `None` when the bounded horizon is exhausted.
///
/// The bound is what keeps a pathological cron expression (one that matches
/// no real instant) from hanging the caller — "nothing within two years" is
/// an expected terminal state, not an error.
pub fn next_run(
    rule: &RecurrenceRule,
    exceptions: &ExceptionSet,
    after: DateTime<Utc>,
) -> Option<DateTime<Utc>> {
    let horizon = after + Duration::days(NEXT_RUN_HORIZON_DAYS);
    let tz = rule.timezone();

    match rule.cadence() {
        Cadence::Custom { cron } => {
            let from = after.with_timezone(&tz);
            for at in cron.schedule().after(&from) {
                let at_utc = at.with_timezone(&Utc);
                if at_utc > horizon {
                    return None;
                }
                if !exceptions.is_skipped(at.date_naive()) {
                    return Some(at_utc);
                }
            }
            None
        }
        cadence => {
            let mut date = after.with_timezone(&tz).date_naive();
            for _ in 0..=NEXT_RUN_HORIZON_DAYS {
                if matches_date(cadence, date) && !exceptions.is_skipped(date) {
                    if let Some(at) = resolve_local(tz, date, rule.time_of_day()) {
                        if at > after {
                            return Some(at);
                        }
                    }
                }
                date = date.succ_opt()?;
            }
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rule::{Frequency, RuleSpec, TimeOfDay};
    use chrono::TimeZone;

    fn utc(y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, min, 0).unwrap()
    }

    fn daily_9_utc() -> RecurrenceRule {
        RecurrenceRule::try_from(RuleSpec {
            frequency: Frequency::Daily,
            time_of_day: Some(TimeOfDay { hour: 9, minute: 0 }),
            ..RuleSpec::default()
        })
        .unwrap()
    }

    #[test]
    fn same_day_time_still_ahead_resolves_today() {
        let next = next_run(&daily_9_utc(), &ExceptionSet::new(), utc(2024, 1, 5, 6, 0));
        assert_eq!(next, Some(utc(2024, 1, 5, 9, 0)));
    }

    #[test]
    fn same_day_time_already_passed_resolves_tomorrow() {
        let next = next_run(&daily_9_utc(), &ExceptionSet::new(), utc(2024, 1, 5, 10, 0));
        assert_eq!(next, Some(utc(2024, 1, 6, 9, 0)));
    }

    #[test]
    fn exactly_at_occurrence_resolves_to_next_one() {
        // "strictly after"
        let next = next_run(&daily_9_utc(), &ExceptionSet::new(), utc(2024, 1, 5, 9, 0));
        assert_eq!(next, Some(utc(2024, 1, 6, 9, 0)));
    }

    #[test]
    fn skipping_tomorrow_advances_past_it() {
        let mut ex = ExceptionSet::new();
        ex.skip("2024-01-06".parse().unwrap());
        let next = next_run(&daily_9_utc(), &ex, utc(2024, 1, 5, 10, 0));
        assert_eq!(next, Some(utc(2024, 1, 7, 9, 0)));
    }

    #[test]
    fn restore_pulls_next_run_back() {
        let mut ex = ExceptionSet::new();
        ex.skip("2024-01-06".parse().unwrap());
        ex.restore("2024-01-06".parse().unwrap());
        let next = next_run(&daily_9_utc(), &ex, utc(2024, 1, 5, 10, 0));
        assert_eq!(next, Some(utc(2024, 1, 6, 9, 0)));
    }

    #[test]
    fn weekly_resolves_next_matching_weekday() {
        let r = RecurrenceRule::try_from(RuleSpec {
            frequency: Frequency::Weekly,
            time_of_day: Some(TimeOfDay { hour: 9, minute: 0 }),
            // Monday and Friday
            days_of_week: vec![1, 5],
            ..RuleSpec::default()
        })
        .unwrap();
        // 2024-01-02 is a Tuesday — next match is Friday the 5th.
        let next = next_run(&r, &ExceptionSet::new(), utc(2024, 1, 2, 12, 0));
        assert_eq!(next, Some(utc(2024, 1, 5, 9, 0)));
    }

    #[test]
    fn custom_cron_resolves_in_rule_timezone() {
        let r = RecurrenceRule::try_from(RuleSpec {
            frequency: Frequency::Custom,
            timezone: "America/Los_Angeles".to_string(),
            cron_expression: Some("0 12 * * *".to_string()),
            ..RuleSpec::default()
        })
        .unwrap();
        let next = next_run(&r, &ExceptionSet::new(), utc(2026, 2, 17, 0, 0));
        assert_eq!(next, Some(utc(2026, 2, 17, 20, 0)));
    }

    #[test]
    fn impossible_cron_returns_none_within_horizon() {
        // February 30th never exists; the bounded search must give up, not hang.
        let r = RecurrenceRule::try_from(RuleSpec {
            frequency: Frequency::Custom,
            cron_expression: Some("0 0 30 2 *".to_string()),
            ..RuleSpec::default()
        })
        .unwrap();
        assert_eq!(next_run(&r, &ExceptionSet::new(), utc(2024, 1, 1, 0, 0)), None);
    }

    #[test]
    fn everything_skipped_returns_none() {
        let r = RecurrenceRule::try_from(RuleSpec {
            frequency: Frequency::Monthly,
            time_of_day: Some(TimeOfDay { hour: 9, minute: 0 }),
            day_of_month: Some(15),
            ..RuleSpec::default()
        })
        .unwrap();
        let mut ex = ExceptionSet::new();
        // Skip every 15th inside the horizon.
        let mut date: chrono::NaiveDate = "2024-01-15".parse().unwrap();
        for _ in 0..26 {
            ex.skip(date);
            date = date.checked_add_months(chrono::Months::new(1)).unwrap();
        }
        assert_eq!(next_run(&r, &ex, utc(2024, 1, 1, 0, 0)), None);
    }
}
