use std::sync::{Arc, Mutex};

use chrono::{DateTime, NaiveDate, Utc};
use dashmap::DashMap;
use rusqlite::Connection;
use tracing::{info, instrument};
use uuid::Uuid;

use quillcast_core::request::GenerationRequest;
use quillcast_core::types::{RunKind, ScheduleId, ScheduleOverrides, SiteId};
use quillcast_recurrence::rule::Cadence;
use quillcast_recurrence::{next_run, ExceptionSet, RecurrenceRule, RuleSpec};

use crate::db::{init_db, row_to_execution, row_to_schedule, EXECUTION_SELECT, SCHEDULE_SELECT};
use crate::error::{RegistryError, Result};
use crate::types::{ExecutionRecord, NewExecution, NewSchedule, Schedule};

/// Thread-safe owner of all persisted schedules.
///
/// Wraps a single SQLite connection in a `Mutex`; mutations additionally
/// take a per-schedule-id lock so a concurrent `skip` and `update_rule` on
/// the same schedule cannot interleave between read and write — the
/// connection mutex only covers single statements. Each mutation runs inside
/// one transaction: either the whole change (field swap + next-run
/// recompute) commits, or none of it does.
///
/// Every mutation that can move `next_run_at` recomputes it before commit:
/// rule edits, activation toggles, skip/restore, successful scheduled runs.
pub struct ScheduleRegistry {
    db: Mutex<Connection>,
    locks: DashMap<String, Arc<Mutex<()>>>,
}

impl ScheduleRegistry {
    /// Wrap a connection, initialising the schema if needed.
    pub fn new(conn: Connection) -> Result<Self> {
        init_db(&conn)?;
        Ok(Self {
            db: Mutex::new(conn),
            locks: DashMap::new(),
        })
    }

    // --- creation ----------------------------------------------------------

    /// Validate and persist a new schedule. See [`Self::create_at`].
    pub fn create(&self, new: NewSchedule) -> Result<Schedule> {
        self.create_at(new, Utc::now())
    }

    /// Deterministic variant of [`Self::create`] for tests and replay.
    #[instrument(skip(self, new), fields(name = %new.name))]
    pub fn create_at(&self, new: NewSchedule, now: DateTime<Utc>) -> Result<Schedule> {
        // Validate before touching the database — a bad rule leaves no trace.
        let rule = RecurrenceRule::try_from(new.rule)?;
        let id = ScheduleId::new();
        let exceptions = ExceptionSet::new();
        let next_run_at = if new.active {
            next_run(&rule, &exceptions, now)
        } else {
            None
        };

        let schedule = Schedule {
            id: id.clone(),
            name: new.name,
            rule,
            is_active: new.active,
            template_id: new.template_id,
            site_id: new.site_id,
            overrides: new.overrides,
            post_status: new.post_status,
            exceptions,
            last_run_at: None,
            next_run_at,
            created_at: now,
            updated_at: now,
        };

        let mut db = self.db.lock().unwrap();
        let tx = db.transaction()?;
        if schedule.is_active {
            check_slot_conflicts(&tx, &schedule.site_id, &schedule.id, &schedule.rule)?;
        }
        tx.execute(
            "INSERT INTO schedules
             (id, name, rule, is_active, template_id, site_id, overrides,
              post_status, exceptions, last_run_at, next_run_at, created_at, updated_at)
             VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9,NULL,?10,?11,?11)",
            rusqlite::params![
                schedule.id.as_str(),
                schedule.name,
                serde_json::to_string(&schedule.rule)?,
                schedule.is_active as i64,
                schedule.template_id.as_str(),
                schedule.site_id.as_str(),
                serde_json::to_string(&schedule.overrides)?,
                schedule.post_status.to_string(),
                serde_json::to_string(&schedule.exceptions)?,
                schedule.next_run_at.map(|t| t.to_rfc3339()),
                now.to_rfc3339(),
            ],
        )?;
        tx.commit()?;

        info!(schedule_id = %schedule.id, active = schedule.is_active, "schedule created");
        Ok(schedule)
    }

    // --- reads -------------------------------------------------------------

    /// Fetch a schedule by id.
    pub fn get(&self, id: &ScheduleId) -> Result<Schedule> {
        let db = self.db.lock().unwrap();
        get_schedule(&db, id)
    }

    /// All schedules, oldest first.
    pub fn list(&self) -> Result<Vec<Schedule>> {
        let db = self.db.lock().unwrap();
        let mut stmt = db.prepare(&format!("{SCHEDULE_SELECT} ORDER BY created_at"))?;
        let schedules = stmt
            .query_map([], row_to_schedule)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(schedules)
    }

    /// The cached next due instant for a schedule, if any.
    pub fn next_run_at(&self, id: &ScheduleId) -> Result<Option<DateTime<Utc>>> {
        Ok(self.get(id)?.next_run_at)
    }

    /// Active schedules whose cached next run has arrived, soonest first.
    pub fn due_schedules(&self, now: DateTime<Utc>) -> Result<Vec<Schedule>> {
        let db = self.db.lock().unwrap();
        let mut stmt = db.prepare(&format!(
            "{SCHEDULE_SELECT} WHERE is_active = 1 AND next_run_at IS NOT NULL
               AND next_run_at <= ?1
             ORDER BY next_run_at"
        ))?;
        let schedules = stmt
            .query_map([now.to_rfc3339()], row_to_schedule)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(schedules)
    }

    /// Execution records whose occurrence date falls in `[start, end)`,
    /// across all schedules, oldest execution first.
    pub fn executions_in_range(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<ExecutionRecord>> {
        let db = self.db.lock().unwrap();
        let mut stmt = db.prepare(&format!(
            "{EXECUTION_SELECT} WHERE occurrence_date >= ?1 AND occurrence_date < ?2
             ORDER BY executed_at"
        ))?;
        let records = stmt
            .query_map([start.to_string(), end.to_string()], row_to_execution)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(records)
    }

    // --- activation --------------------------------------------------------

    /// Activate a schedule. Idempotent. See [`Self::activate_at`].
    pub fn activate(&self, id: &ScheduleId) -> Result<Schedule> {
        self.activate_at(id, Utc::now())
    }

    /// Flip a schedule active, re-checking slot uniqueness and recomputing
    /// `next_run_at`. Activating an already-active schedule is a no-op.
    #[instrument(skip(self), fields(schedule_id = %id))]
    pub fn activate_at(&self, id: &ScheduleId, now: DateTime<Utc>) -> Result<Schedule> {
        let lock = self.lock_schedule(id);
        let _guard = lock.lock().unwrap();

        let mut db = self.db.lock().unwrap();
        let tx = db.transaction()?;
        let mut schedule = get_schedule(&tx, id)?;
        if schedule.is_active {
            return Ok(schedule);
        }
        check_slot_conflicts(&tx, &schedule.site_id, id, &schedule.rule)?;

        schedule.is_active = true;
        schedule.next_run_at = next_run(&schedule.rule, &schedule.exceptions, now);
        schedule.updated_at = now;
        tx.execute(
            "UPDATE schedules SET is_active = 1, next_run_at = ?1, updated_at = ?2 WHERE id = ?3",
            rusqlite::params![
                schedule.next_run_at.map(|t| t.to_rfc3339()),
                now.to_rfc3339(),
                id.as_str()
            ],
        )?;
        tx.commit()?;

        info!(schedule_id = %id, "schedule activated");
        Ok(schedule)
    }

    /// Deactivate a schedule. Idempotent. See [`Self::deactivate_at`].
    pub fn deactivate(&self, id: &ScheduleId) -> Result<Schedule> {
        self.deactivate_at(id, Utc::now())
    }

    /// Flip a schedule inactive and clear its cached next run. Its past
    /// executions stay visible in the calendar; it just stops producing
    /// future occurrences.
    #[instrument(skip(self), fields(schedule_id = %id))]
    pub fn deactivate_at(&self, id: &ScheduleId, now: DateTime<Utc>) -> Result<Schedule> {
        let lock = self.lock_schedule(id);
        let _guard = lock.lock().unwrap();

        let mut db = self.db.lock().unwrap();
        let tx = db.transaction()?;
        let mut schedule = get_schedule(&tx, id)?;
        if !schedule.is_active {
            return Ok(schedule);
        }

        schedule.is_active = false;
        schedule.next_run_at = None;
        schedule.updated_at = now;
        tx.execute(
            "UPDATE schedules SET is_active = 0, next_run_at = NULL, updated_at = ?1 WHERE id = ?2",
            rusqlite::params![now.to_rfc3339(), id.as_str()],
        )?;
        tx.commit()?;

        info!(schedule_id = %id, "schedule deactivated");
        Ok(schedule)
    }

    // --- exceptions --------------------------------------------------------

    /// Mark one occurrence date skipped. Idempotent. See [`Self::skip_at`].
    pub fn skip(&self, id: &ScheduleId, date: NaiveDate) -> Result<Schedule> {
        self.skip_at(id, date, Utc::now())
    }

    #[instrument(skip(self), fields(schedule_id = %id, %date))]
    pub fn skip_at(&self, id: &ScheduleId, date: NaiveDate, now: DateTime<Utc>) -> Result<Schedule> {
        self.mutate_exceptions(id, date, now, true)
    }

    /// Clear the skip mark on one date. Idempotent. See [`Self::restore_at`].
    pub fn restore(&self, id: &ScheduleId, date: NaiveDate) -> Result<Schedule> {
        self.restore_at(id, date, Utc::now())
    }

    #[instrument(skip(self), fields(schedule_id = %id, %date))]
    pub fn restore_at(
        &self,
        id: &ScheduleId,
        date: NaiveDate,
        now: DateTime<Utc>,
    ) -> Result<Schedule> {
        self.mutate_exceptions(id, date, now, false)
    }

    fn mutate_exceptions(
        &self,
        id: &ScheduleId,
        date: NaiveDate,
        now: DateTime<Utc>,
        skip: bool,
    ) -> Result<Schedule> {
        let lock = self.lock_schedule(id);
        let _guard = lock.lock().unwrap();

        let mut db = self.db.lock().unwrap();
        let tx = db.transaction()?;
        let mut schedule = get_schedule(&tx, id)?;

        let changed = if skip {
            schedule.exceptions.skip(date)
        } else {
            schedule.exceptions.restore(date)
        };
        if !changed {
            // Already in the requested state — succeed without a write.
            return Ok(schedule);
        }

        // Recomputing unconditionally covers both directions: skipping the
        // cached next-run date advances it, restoring an earlier date pulls
        // it back.
        if schedule.is_active {
            schedule.next_run_at = next_run(&schedule.rule, &schedule.exceptions, now);
        }
        schedule.updated_at = now;
        tx.execute(
            "UPDATE schedules SET exceptions = ?1, next_run_at = ?2, updated_at = ?3 WHERE id = ?4",
            rusqlite::params![
                serde_json::to_string(&schedule.exceptions)?,
                schedule.next_run_at.map(|t| t.to_rfc3339()),
                now.to_rfc3339(),
                id.as_str()
            ],
        )?;
        tx.commit()?;

        info!(schedule_id = %id, %date, skipped = skip, "exception updated");
        Ok(schedule)
    }

    // --- rule & field updates ----------------------------------------------

    /// Replace a schedule's recurrence rule. See [`Self::update_rule_at`].
    pub fn update_rule(&self, id: &ScheduleId, spec: RuleSpec) -> Result<Schedule> {
        self.update_rule_at(id, spec, Utc::now())
    }

    /// Atomically swap the rule: validate, re-check slot uniqueness, and
    /// recompute `next_run_at` in one transaction. On any failure the stored
    /// schedule keeps its previous rule — never half-updated.
    #[instrument(skip(self, spec), fields(schedule_id = %id))]
    pub fn update_rule_at(
        &self,
        id: &ScheduleId,
        spec: RuleSpec,
        now: DateTime<Utc>,
    ) -> Result<Schedule> {
        // Validation happens before the schedule row is even read.
        let rule = RecurrenceRule::try_from(spec)?;

        let lock = self.lock_schedule(id);
        let _guard = lock.lock().unwrap();

        let mut db = self.db.lock().unwrap();
        let tx = db.transaction()?;
        let mut schedule = get_schedule(&tx, id)?;
        if schedule.is_active {
            check_slot_conflicts(&tx, &schedule.site_id, id, &rule)?;
        }

        schedule.rule = rule;
        if schedule.is_active {
            schedule.next_run_at = next_run(&schedule.rule, &schedule.exceptions, now);
        }
        schedule.updated_at = now;
        tx.execute(
            "UPDATE schedules SET rule = ?1, next_run_at = ?2, updated_at = ?3 WHERE id = ?4",
            rusqlite::params![
                serde_json::to_string(&schedule.rule)?,
                schedule.next_run_at.map(|t| t.to_rfc3339()),
                now.to_rfc3339(),
                id.as_str()
            ],
        )?;
        tx.commit()?;

        info!(schedule_id = %id, "rule replaced");
        Ok(schedule)
    }

    /// Update the generation overrides. Next run is unaffected.
    #[instrument(skip(self, overrides), fields(schedule_id = %id))]
    pub fn update_overrides(
        &self,
        id: &ScheduleId,
        overrides: ScheduleOverrides,
    ) -> Result<()> {
        let lock = self.lock_schedule(id);
        let _guard = lock.lock().unwrap();

        let db = self.db.lock().unwrap();
        let rows_changed = db.execute(
            "UPDATE schedules SET overrides = ?1, updated_at = ?2 WHERE id = ?3",
            rusqlite::params![
                serde_json::to_string(&overrides)?,
                Utc::now().to_rfc3339(),
                id.as_str()
            ],
        )?;
        if rows_changed == 0 {
            return Err(RegistryError::UnknownSchedule { id: id.to_string() });
        }
        Ok(())
    }

    /// Rename a schedule. Next run is unaffected.
    #[instrument(skip(self), fields(schedule_id = %id))]
    pub fn rename(&self, id: &ScheduleId, name: &str) -> Result<()> {
        let lock = self.lock_schedule(id);
        let _guard = lock.lock().unwrap();

        let db = self.db.lock().unwrap();
        let rows_changed = db.execute(
            "UPDATE schedules SET name = ?1, updated_at = ?2 WHERE id = ?3",
            rusqlite::params![name, Utc::now().to_rfc3339(), id.as_str()],
        )?;
        if rows_changed == 0 {
            return Err(RegistryError::UnknownSchedule { id: id.to_string() });
        }
        Ok(())
    }

    // --- runs --------------------------------------------------------------

    /// Build a manual, out-of-band generation request dated today in the
    /// schedule's timezone. See [`Self::trigger_run_now_at`].
    pub fn trigger_run_now(&self, id: &ScheduleId) -> Result<GenerationRequest> {
        self.trigger_run_now_at(id, Utc::now())
    }

    /// A manual run rides alongside the recurrence: it touches neither
    /// `next_run_at` nor `last_run_at`, and its eventual execution record is
    /// `Manual`, so it never displaces the scheduled occurrence for the day.
    #[instrument(skip(self), fields(schedule_id = %id))]
    pub fn trigger_run_now_at(
        &self,
        id: &ScheduleId,
        now: DateTime<Utc>,
    ) -> Result<GenerationRequest> {
        let schedule = self.get(id)?;
        let occurrence_date = now.with_timezone(&schedule.rule.timezone()).date_naive();
        info!(schedule_id = %id, %occurrence_date, "manual run requested");
        Ok(schedule.generation_request(occurrence_date, RunKind::Manual))
    }

    /// Stamp `last_run_at` and advance `next_run_at` past the occurrence
    /// that just fired, so one occurrence never dispatches twice. Returns
    /// the new next run.
    #[instrument(skip(self), fields(schedule_id = %id))]
    pub fn mark_dispatched(
        &self,
        id: &ScheduleId,
        now: DateTime<Utc>,
    ) -> Result<Option<DateTime<Utc>>> {
        let lock = self.lock_schedule(id);
        let _guard = lock.lock().unwrap();

        let mut db = self.db.lock().unwrap();
        let tx = db.transaction()?;
        let schedule = get_schedule(&tx, id)?;
        let next = if schedule.is_active {
            next_run(&schedule.rule, &schedule.exceptions, now)
        } else {
            None
        };
        tx.execute(
            "UPDATE schedules SET last_run_at = ?1, next_run_at = ?2, updated_at = ?1 WHERE id = ?3",
            rusqlite::params![
                now.to_rfc3339(),
                next.map(|t| t.to_rfc3339()),
                id.as_str()
            ],
        )?;
        tx.commit()?;
        Ok(next)
    }

    /// Record an execution the pipeline reported. A successful scheduled run
    /// also stamps `last_run_at` and re-derives `next_run_at`; failures and
    /// manual runs only add the record.
    #[instrument(skip(self, new), fields(schedule_id = %new.schedule_id, kind = %new.kind, success = new.success))]
    pub fn record_execution(&self, new: NewExecution) -> Result<ExecutionRecord> {
        let lock = self.lock_schedule(&new.schedule_id);
        let _guard = lock.lock().unwrap();

        let mut db = self.db.lock().unwrap();
        let tx = db.transaction()?;
        let schedule = get_schedule(&tx, &new.schedule_id)?;

        let record = ExecutionRecord {
            id: Uuid::now_v7().to_string(),
            schedule_id: new.schedule_id,
            occurrence_date: new.occurrence_date,
            success: new.success,
            error: new.error,
            post_id: new.post_id,
            kind: new.kind,
            executed_at: new.executed_at,
        };
        tx.execute(
            "INSERT INTO executions
             (id, schedule_id, occurrence_date, success, error, post_id, kind, executed_at)
             VALUES (?1,?2,?3,?4,?5,?6,?7,?8)",
            rusqlite::params![
                record.id,
                record.schedule_id.as_str(),
                record.occurrence_date.to_string(),
                record.success as i64,
                record.error,
                record.post_id,
                record.kind.to_string(),
                record.executed_at.to_rfc3339(),
            ],
        )?;

        if record.kind == RunKind::Scheduled && record.success {
            let next = if schedule.is_active {
                next_run(&schedule.rule, &schedule.exceptions, record.executed_at)
            } else {
                None
            };
            tx.execute(
                "UPDATE schedules SET last_run_at = ?1, next_run_at = ?2, updated_at = ?1 WHERE id = ?3",
                rusqlite::params![
                    record.executed_at.to_rfc3339(),
                    next.map(|t| t.to_rfc3339()),
                    record.schedule_id.as_str()
                ],
            )?;
        }
        tx.commit()?;

        info!(execution_id = %record.id, "execution recorded");
        Ok(record)
    }

    // --- private helpers ---------------------------------------------------

    /// Mutations on the same schedule id serialize on this lock; the
    /// connection mutex only covers single statements.
    fn lock_schedule(&self, id: &ScheduleId) -> Arc<Mutex<()>> {
        self.locks.entry(id.to_string()).or_default().clone()
    }
}

fn get_schedule(conn: &Connection, id: &ScheduleId) -> Result<Schedule> {
    match conn.query_row(
        &format!("{SCHEDULE_SELECT} WHERE id = ?1"),
        [id.as_str()],
        row_to_schedule,
    ) {
        Ok(s) => Ok(s),
        Err(rusqlite::Error::QueryReturnedNoRows) => Err(RegistryError::UnknownSchedule {
            id: id.to_string(),
        }),
        Err(e) => Err(e.into()),
    }
}

/// The (frequency-class, day) slots an active rule claims on its publish
/// target. Two custom rules collide only on an identical expression.
fn claimed_slots(rule: &RecurrenceRule) -> Vec<String> {
    match rule.cadence() {
        Cadence::Daily => vec!["daily".to_string()],
        Cadence::Weekly { days_of_week } => days_of_week
            .iter()
            .map(|day| format!("weekly:{day}"))
            .collect(),
        Cadence::Monthly { day_of_month } => vec![format!("monthly:{day_of_month}")],
        Cadence::Custom { cron } => vec![format!("custom:{}", cron.expression())],
    }
}

/// Fail if another active schedule on `site_id` claims any slot of `rule`.
fn check_slot_conflicts(
    conn: &Connection,
    site_id: &SiteId,
    own_id: &ScheduleId,
    rule: &RecurrenceRule,
) -> Result<()> {
    let mut stmt = conn.prepare(&format!(
        "{SCHEDULE_SELECT} WHERE site_id = ?1 AND is_active = 1"
    ))?;
    let others = stmt
        .query_map([site_id.as_str()], row_to_schedule)?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    let slots = claimed_slots(rule);
    for other in others {
        if other.id == *own_id {
            continue;
        }
        let other_slots = claimed_slots(&other.rule);
        if let Some(slot) = slots.iter().find(|s| other_slots.contains(s)) {
            return Err(RegistryError::ScheduleConflict {
                slot: slot.clone(),
                with_id: other.id.to_string(),
                with_name: other.name,
            });
        }
    }
    Ok(())
}
