//! `quillcast-recurrence` — recurrence rules and occurrence computation.
//!
//! # Overview
//!
//! A [`RecurrenceRule`] describes *how often* a schedule fires; it is
//! validated at construction and immutable afterwards. The expander turns a
//! rule plus an [`ExceptionSet`] into concrete occurrence instants for a
//! date window, and the next-run resolver answers "when is this rule due
//! next". Everything here is pure computation over supplied inputs — no
//! clock reads, no I/O.
//!
//! # Frequencies
//!
//! | Frequency | Behaviour                                                |
//! |-----------|----------------------------------------------------------|
//! | `Daily`   | Fire at HH:MM every day                                  |
//! | `Weekly`  | Fire at HH:MM on a set of weekdays (0=Sunday..6=Saturday)|
//! | `Monthly` | Fire at HH:MM on a day of month (1–28)                   |
//! | `Custom`  | Fire per a standard five-field cron expression           |
//!
//! Wall-clock times are interpreted in the rule's IANA timezone. A time that
//! falls in a spring-forward gap skips that day; one in a fall-back overlap
//! resolves to the earlier of the two instants.

pub mod cron;
pub mod error;
pub mod exceptions;
pub mod expand;
pub mod next_run;
pub mod rule;

pub use cron::CronRule;
pub use error::{InvalidRuleError, Result};
pub use exceptions::ExceptionSet;
pub use expand::{expand, Occurrence};
pub use next_run::{next_run, NEXT_RUN_HORIZON_DAYS};
pub use rule::{Cadence, Frequency, RecurrenceRule, RuleSpec, TimeOfDay};
