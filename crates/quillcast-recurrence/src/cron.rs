//! Five-field cron support for `Custom` rules.

use std::fmt;
use std::str::FromStr;

use cron::Schedule;

use crate::error::InvalidRuleError;

/// Prepend a seconds field so the `cron` crate accepts the expression.
///
/// The `cron` crate requires 6 fields: `sec min hour day-of-month month day-of-week`.
/// Rules carry standard 5-field cron: `min hour day-of-month month day-of-week`.
fn normalize(cron_5field: &str) -> String {
    format!("0 {cron_5field}")
}

/// A validated custom recurrence expression.
///
/// Holds both the original five-field string (for round-tripping back to the
/// UI) and the parsed schedule used for enumeration.
#[derive(Clone)]
pub struct CronRule {
    expression: String,
    schedule: Schedule,
}

impl CronRule {
    /// Parse a standard five-field expression: `minute hour day month weekday`.
    ///
    /// Rejects any other arity — seconds and year fields are not part of the
    /// schedule vocabulary.
    pub fn parse(expression: &str) -> Result<Self, InvalidRuleError> {
        let trimmed = expression.trim();
        let fields = trimmed.split_whitespace().count();
        if fields != 5 {
            return Err(InvalidRuleError::InvalidCron {
                expression: trimmed.to_string(),
                reason: format!("expected 5 fields, got {fields}"),
            });
        }

        let schedule =
            Schedule::from_str(&normalize(trimmed)).map_err(|e| InvalidRuleError::InvalidCron {
                expression: trimmed.to_string(),
                reason: e.to_string(),
            })?;

        Ok(Self {
            expression: trimmed.to_string(),
            schedule,
        })
    }

    /// The original five-field expression.
    pub fn expression(&self) -> &str {
        &self.expression
    }

    pub(crate) fn schedule(&self) -> &Schedule {
        &self.schedule
    }
}

impl fmt::Debug for CronRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("CronRule").field(&self.expression).finish()
    }
}

// Two rules with the same expression enumerate the same instants.
impl PartialEq for CronRule {
    fn eq(&self, other: &Self) -> bool {
        self.expression == other.expression
    }
}

impl Eq for CronRule {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_standard_five_field() {
        let rule = CronRule::parse("30 9 * * 1-5").expect("parse failed");
        assert_eq!(rule.expression(), "30 9 * * 1-5");
    }

    #[test]
    fn trims_surrounding_whitespace() {
        let rule = CronRule::parse("  0 12 1 * *  ").expect("parse failed");
        assert_eq!(rule.expression(), "0 12 1 * *");
    }

    #[test]
    fn rejects_wrong_arity() {
        assert!(matches!(
            CronRule::parse("* * * *"),
            Err(InvalidRuleError::InvalidCron { .. })
        ));
        // 6-field (with seconds) is not the schedule vocabulary either.
        assert!(CronRule::parse("0 30 9 * * 1").is_err());
    }

    #[test]
    fn rejects_garbage_fields() {
        assert!(CronRule::parse("not a cron at all!").is_err());
        assert!(CronRule::parse("99 * * * *").is_err());
    }
}
