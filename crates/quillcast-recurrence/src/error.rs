use thiserror::Error;

/// Why a rule failed validation. Each variant names the violated constraint
/// so the admin UI can point at the offending field.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvalidRuleError {
    /// A weekly rule needs at least one weekday.
    #[error("weekly rule requires a non-empty weekday set")]
    EmptyWeekdaySet,

    /// Weekday ordinals run 0=Sunday through 6=Saturday.
    #[error("weekday ordinal {ordinal} out of range (0=Sunday..6=Saturday)")]
    WeekdayOutOfRange { ordinal: u8 },

    /// Day of month is capped to 28 so every month has the date.
    #[error("day of month {day} out of range (1-28)")]
    DayOfMonthOutOfRange { day: u8 },

    /// A monthly rule without a day of month is meaningless.
    #[error("monthly rule requires a day of month")]
    MissingDayOfMonth,

    /// Hour must be 0-23, minute 0-59.
    #[error("time of day {hour:02}:{minute:02} out of range")]
    TimeOutOfRange { hour: u8, minute: u8 },

    /// Daily, weekly and monthly rules all fire at a wall-clock time.
    #[error("rule requires a time of day")]
    MissingTimeOfDay,

    /// A custom rule without an expression is meaningless.
    #[error("custom rule requires a cron expression")]
    MissingCronExpression,

    /// The expression is not standard five-field cron.
    #[error("invalid cron expression {expression:?}: {reason}")]
    InvalidCron { expression: String, reason: String },

    /// The timezone string is not a known IANA zone identifier.
    #[error("unknown timezone: {name}")]
    UnknownTimezone { name: String },
}

pub type Result<T> = std::result::Result<T, InvalidRuleError>;
