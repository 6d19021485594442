use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::cron::CronRule;
use crate::error::InvalidRuleError;

/// How often a rule fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Frequency {
    Daily,
    Weekly,
    Monthly,
    Custom,
}

impl fmt::Display for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Frequency::Daily => "daily",
            Frequency::Weekly => "weekly",
            Frequency::Monthly => "monthly",
            Frequency::Custom => "custom",
        };
        write!(f, "{s}")
    }
}

/// Wall-clock firing time, interpreted in the rule's timezone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeOfDay {
    pub hour: u8,
    pub minute: u8,
}

impl TimeOfDay {
    pub fn new(hour: u8, minute: u8) -> Result<Self, InvalidRuleError> {
        if hour > 23 || minute > 59 {
            return Err(InvalidRuleError::TimeOutOfRange { hour, minute });
        }
        Ok(Self { hour, minute })
    }
}

impl fmt::Display for TimeOfDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.hour, self.minute)
    }
}

/// The frequency-specific payload of a validated rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Cadence {
    /// Every calendar day.
    Daily,
    /// Days of week as ordinals, 0=Sunday..6=Saturday. Never empty.
    Weekly { days_of_week: BTreeSet<u8> },
    /// Day of month, 1-28. Capped so every month has the date.
    Monthly { day_of_month: u8 },
    /// Standard five-field cron expression.
    Custom { cron: CronRule },
}

/// The raw rule shape the admin UI submits and round-trips.
///
/// Everything optional beyond `frequency`; fields irrelevant to the chosen
/// frequency are carried along untouched but ignored by validation. A
/// single-weekday source value is just a one-element `days_of_week`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleSpec {
    pub frequency: Frequency,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_of_day: Option<TimeOfDay>,
    /// IANA zone identifier. Defaults to UTC.
    #[serde(default = "default_timezone")]
    pub timezone: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub days_of_week: Vec<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub day_of_month: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cron_expression: Option<String>,
}

fn default_timezone() -> String {
    "UTC".to_string()
}

impl Default for RuleSpec {
    fn default() -> Self {
        Self {
            frequency: Frequency::Daily,
            time_of_day: None,
            timezone: default_timezone(),
            days_of_week: Vec::new(),
            day_of_month: None,
            cron_expression: None,
        }
    }
}

/// An immutable, validated description of "how often".
///
/// Constructible only through validation ([`TryFrom<RuleSpec>`], which serde
/// also routes deserialization through), so a held `RecurrenceRule` is always
/// internally consistent. "Editing" a schedule's recurrence means replacing
/// the whole rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RuleSpec", into = "RuleSpec")]
pub struct RecurrenceRule {
    cadence: Cadence,
    /// Ignored for `Custom` (the cron expression carries its own minute/hour).
    time_of_day: TimeOfDay,
    timezone: Tz,
}

impl RecurrenceRule {
    pub fn cadence(&self) -> &Cadence {
        &self.cadence
    }

    pub fn time_of_day(&self) -> TimeOfDay {
        self.time_of_day
    }

    pub fn timezone(&self) -> Tz {
        self.timezone
    }

    pub fn frequency(&self) -> Frequency {
        match self.cadence {
            Cadence::Daily => Frequency::Daily,
            Cadence::Weekly { .. } => Frequency::Weekly,
            Cadence::Monthly { .. } => Frequency::Monthly,
            Cadence::Custom { .. } => Frequency::Custom,
        }
    }
}

impl TryFrom<RuleSpec> for RecurrenceRule {
    type Error = InvalidRuleError;

    fn try_from(spec: RuleSpec) -> Result<Self, Self::Error> {
        let timezone = Tz::from_str(&spec.timezone).map_err(|_| {
            InvalidRuleError::UnknownTimezone {
                name: spec.timezone.clone(),
            }
        })?;

        let time_of_day = match spec.frequency {
            // Cron carries its own minute/hour; a submitted time is ignored.
            Frequency::Custom => spec
                .time_of_day
                .unwrap_or(TimeOfDay { hour: 0, minute: 0 }),
            _ => spec.time_of_day.ok_or(InvalidRuleError::MissingTimeOfDay)?,
        };
        TimeOfDay::new(time_of_day.hour, time_of_day.minute)?;

        let cadence = match spec.frequency {
            Frequency::Daily => Cadence::Daily,
            Frequency::Weekly => {
                if spec.days_of_week.is_empty() {
                    return Err(InvalidRuleError::EmptyWeekdaySet);
                }
                let mut days_of_week = BTreeSet::new();
                for ordinal in spec.days_of_week {
                    if ordinal > 6 {
                        return Err(InvalidRuleError::WeekdayOutOfRange { ordinal });
                    }
                    days_of_week.insert(ordinal);
                }
                Cadence::Weekly { days_of_week }
            }
            Frequency::Monthly => {
                let day_of_month = spec.day_of_month.ok_or(InvalidRuleError::MissingDayOfMonth)?;
                if !(1..=28).contains(&day_of_month) {
                    return Err(InvalidRuleError::DayOfMonthOutOfRange { day: day_of_month });
                }
                Cadence::Monthly { day_of_month }
            }
            Frequency::Custom => {
                let expression = spec
                    .cron_expression
                    .as_deref()
                    .ok_or(InvalidRuleError::MissingCronExpression)?;
                Cadence::Custom {
                    cron: CronRule::parse(expression)?,
                }
            }
        };

        Ok(Self {
            cadence,
            time_of_day,
            timezone,
        })
    }
}

impl From<RecurrenceRule> for RuleSpec {
    fn from(rule: RecurrenceRule) -> Self {
        let frequency = rule.frequency();
        let mut spec = RuleSpec {
            frequency,
            timezone: rule.timezone.name().to_string(),
            ..RuleSpec::default()
        };
        match rule.cadence {
            Cadence::Daily => spec.time_of_day = Some(rule.time_of_day),
            Cadence::Weekly { days_of_week } => {
                spec.time_of_day = Some(rule.time_of_day);
                spec.days_of_week = days_of_week.into_iter().collect();
            }
            Cadence::Monthly { day_of_month } => {
                spec.time_of_day = Some(rule.time_of_day);
                spec.day_of_month = Some(day_of_month);
            }
            Cadence::Custom { cron } => {
                spec.cron_expression = Some(cron.expression().to_string());
            }
        }
        spec
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn weekly_spec(days: &[u8]) -> RuleSpec {
        RuleSpec {
            frequency: Frequency::Weekly,
            time_of_day: Some(TimeOfDay { hour: 9, minute: 0 }),
            days_of_week: days.to_vec(),
            ..RuleSpec::default()
        }
    }

    #[test]
    fn weekly_requires_nonempty_day_set() {
        assert_eq!(
            RecurrenceRule::try_from(weekly_spec(&[])),
            Err(InvalidRuleError::EmptyWeekdaySet)
        );
    }

    #[test]
    fn weekly_rejects_ordinal_above_six() {
        assert_eq!(
            RecurrenceRule::try_from(weekly_spec(&[1, 7])),
            Err(InvalidRuleError::WeekdayOutOfRange { ordinal: 7 })
        );
    }

    #[test]
    fn weekly_dedupes_days() {
        let rule = RecurrenceRule::try_from(weekly_spec(&[1, 3, 1])).expect("validation failed");
        match rule.cadence() {
            Cadence::Weekly { days_of_week } => assert_eq!(days_of_week.len(), 2),
            other => panic!("expected weekly cadence, got {other:?}"),
        }
    }

    #[test]
    fn monthly_caps_day_at_28() {
        let spec = RuleSpec {
            frequency: Frequency::Monthly,
            time_of_day: Some(TimeOfDay { hour: 6, minute: 30 }),
            day_of_month: Some(29),
            ..RuleSpec::default()
        };
        assert_eq!(
            RecurrenceRule::try_from(spec),
            Err(InvalidRuleError::DayOfMonthOutOfRange { day: 29 })
        );
    }

    #[test]
    fn daily_requires_time_of_day() {
        let spec = RuleSpec {
            frequency: Frequency::Daily,
            ..RuleSpec::default()
        };
        assert_eq!(
            RecurrenceRule::try_from(spec),
            Err(InvalidRuleError::MissingTimeOfDay)
        );
    }

    #[test]
    fn unknown_timezone_is_rejected() {
        let spec = RuleSpec {
            timezone: "Mars/Olympus_Mons".to_string(),
            time_of_day: Some(TimeOfDay { hour: 9, minute: 0 }),
            ..RuleSpec::default()
        };
        assert!(matches!(
            RecurrenceRule::try_from(spec),
            Err(InvalidRuleError::UnknownTimezone { .. })
        ));
    }

    #[test]
    fn custom_requires_expression() {
        let spec = RuleSpec {
            frequency: Frequency::Custom,
            ..RuleSpec::default()
        };
        assert_eq!(
            RecurrenceRule::try_from(spec),
            Err(InvalidRuleError::MissingCronExpression)
        );
    }

    #[test]
    fn irrelevant_fields_are_ignored_not_rejected() {
        // A daily rule submitted with leftover weekly/monthly fields from the
        // UI form still validates; the extras simply don't make it into the rule.
        let spec = RuleSpec {
            frequency: Frequency::Daily,
            time_of_day: Some(TimeOfDay { hour: 7, minute: 15 }),
            days_of_week: vec![1, 2],
            day_of_month: Some(12),
            ..RuleSpec::default()
        };
        let rule = RecurrenceRule::try_from(spec).expect("validation failed");
        assert_eq!(rule.cadence(), &Cadence::Daily);
    }

    #[test]
    fn serde_round_trip_preserves_rule() {
        let spec = RuleSpec {
            frequency: Frequency::Weekly,
            time_of_day: Some(TimeOfDay { hour: 9, minute: 0 }),
            timezone: "Europe/Berlin".to_string(),
            days_of_week: vec![1, 3, 5],
            ..RuleSpec::default()
        };
        let rule = RecurrenceRule::try_from(spec).expect("validation failed");
        let json = serde_json::to_string(&rule).unwrap();
        let back: RecurrenceRule = serde_json::from_str(&json).unwrap();
        assert_eq!(back, rule);
    }

    #[test]
    fn deserialization_cannot_bypass_validation() {
        let json = r#"{"frequency":"weekly","time_of_day":{"hour":9,"minute":0},"days_of_week":[]}"#;
        assert!(serde_json::from_str::<RecurrenceRule>(json).is_err());
    }
}
