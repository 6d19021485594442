use thiserror::Error;

use quillcast_recurrence::InvalidRuleError;

/// Errors that can occur in the schedule registry.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// No schedule with the given id exists in the store.
    #[error("unknown schedule: {id}")]
    UnknownSchedule { id: String },

    /// Another active schedule on the same publish target already claims the
    /// same (frequency-class, day) slot.
    #[error("slot {slot:?} already claimed by active schedule {with_name:?} ({with_id})")]
    ScheduleConflict {
        slot: String,
        with_id: String,
        with_name: String,
    },

    /// The submitted recurrence fields failed validation. The stored
    /// schedule, if any, is untouched.
    #[error("invalid rule: {0}")]
    InvalidRule(#[from] InvalidRuleError),

    /// A SQLite operation failed.
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// A JSON column failed to encode.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, RegistryError>;
