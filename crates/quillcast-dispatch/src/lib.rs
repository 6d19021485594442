//! `quillcast-dispatch` — turns due occurrences into generation requests.
//!
//! The engine polls the registry for schedules whose cached `next_run_at`
//! has arrived and hands each one to the external content pipeline as a
//! [`quillcast_core::GenerationRequest`] over an mpsc channel. Advancing the
//! schedule happens at hand-off time, so an occurrence fires exactly once
//! even when the consumer is slow; the pipeline reports the outcome later
//! through `ScheduleRegistry::record_execution`.

pub mod engine;
pub mod error;

pub use engine::DispatchEngine;
pub use error::{DispatchError, Result};
