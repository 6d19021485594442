//! `quillcast-calendar` — the merged, day-keyed calendar view.
//!
//! The aggregator overlays what *actually happened* (execution records, for
//! every schedule) on top of what *is planned* (expanded occurrences, for
//! active schedules only): where a scheduled run was recorded for a date,
//! the record replaces the phantom occurrence. The result covers every day
//! in the queried range, empty days included, so callers never special-case
//! gaps. Querying is a pure read — it mutates nothing and returns identical
//! output for identical underlying state.

pub mod error;
pub mod types;
pub mod view;

pub use error::{CalendarError, Result};
pub use types::{CalendarDay, CalendarEntry};
pub use view::CalendarView;
