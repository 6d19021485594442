//! `quillcast-registry` — owns the set of schedules and mediates every
//! mutation on them.
//!
//! Schedules are persisted to a SQLite `schedules` table; executions the
//! pipeline reports back land in `executions`. All mutations go through
//! [`ScheduleRegistry`], which serializes them per schedule id and runs each
//! one inside a single transaction, so a failed call leaves the schedule
//! exactly as it was.

pub mod db;
pub mod error;
pub mod registry;
pub mod types;

pub use db::init_db;
pub use error::{RegistryError, Result};
pub use registry::ScheduleRegistry;
pub use types::{ExecutionRecord, NewExecution, NewSchedule, Schedule};
