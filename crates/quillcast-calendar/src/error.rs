use chrono::NaiveDate;
use thiserror::Error;

use quillcast_registry::RegistryError;

/// Errors that can occur while building a calendar view.
///
/// Missing data is never one of them: a schedule with no history simply
/// contributes nothing to the affected days.
#[derive(Debug, Error)]
pub enum CalendarError {
    /// The range start lies after its end.
    #[error("invalid range: {start} is after {end}")]
    InvalidRange { start: NaiveDate, end: NaiveDate },

    /// An underlying registry read failed.
    #[error("registry error: {0}")]
    Registry(#[from] RegistryError),
}

pub type Result<T> = std::result::Result<T, CalendarError>;
