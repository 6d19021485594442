use std::str::FromStr;

use chrono::{DateTime, Utc};
use rusqlite::types::Type;
use rusqlite::Connection;

use quillcast_core::types::{PostStatus, RunKind};

use crate::types::{ExecutionRecord, Schedule};

/// Column order shared by every schedule query in this crate. Centralised so
/// `row_to_schedule` stays consistent with each SELECT.
pub(crate) const SCHEDULE_SELECT: &str = "SELECT id, name, rule, is_active, template_id, site_id,
        overrides, post_status, exceptions, last_run_at, next_run_at,
        created_at, updated_at
 FROM schedules";

pub(crate) const EXECUTION_SELECT: &str = "SELECT id, schedule_id, occurrence_date, success,
        error, post_id, kind, executed_at
 FROM executions";

/// Initialise the registry schema in `conn`.
///
/// Creates the `schedules` and `executions` tables (idempotent). The index
/// on `next_run_at` keeps the dispatcher's due-scan cheap; the one on
/// `(schedule_id, occurrence_date)` serves the calendar merge.
pub fn init_db(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS schedules (
            id            TEXT    NOT NULL PRIMARY KEY,
            name          TEXT    NOT NULL,
            rule          TEXT    NOT NULL,   -- JSON-encoded rule spec
            is_active     INTEGER NOT NULL DEFAULT 0,
            template_id   TEXT    NOT NULL,
            site_id       TEXT    NOT NULL,
            overrides     TEXT    NOT NULL DEFAULT '{}',  -- JSON object
            post_status   TEXT    NOT NULL DEFAULT 'review_first',
            exceptions    TEXT    NOT NULL DEFAULT '[]',  -- JSON array of YYYY-MM-DD
            last_run_at   TEXT,               -- RFC3339 or NULL
            next_run_at   TEXT,               -- RFC3339 or NULL
            created_at    TEXT    NOT NULL,
            updated_at    TEXT    NOT NULL
        ) STRICT;

        -- Efficient due-scan: SELECT … WHERE next_run_at <= ?  ORDER BY next_run_at
        CREATE INDEX IF NOT EXISTS idx_schedules_next_run ON schedules (next_run_at);
        CREATE INDEX IF NOT EXISTS idx_schedules_site ON schedules (site_id);

        CREATE TABLE IF NOT EXISTS executions (
            id              TEXT    NOT NULL PRIMARY KEY,
            schedule_id     TEXT    NOT NULL,
            occurrence_date TEXT    NOT NULL,   -- YYYY-MM-DD, schedule-local
            success         INTEGER NOT NULL,
            error           TEXT,
            post_id         TEXT,
            kind            TEXT    NOT NULL,   -- 'scheduled' | 'manual'
            executed_at     TEXT    NOT NULL
        ) STRICT;

        CREATE INDEX IF NOT EXISTS idx_executions_schedule_date
            ON executions (schedule_id, occurrence_date);
        CREATE INDEX IF NOT EXISTS idx_executions_date ON executions (occurrence_date);
        ",
    )
}

/// Map a SELECT row (column order from SCHEDULE_SELECT) to a Schedule.
pub(crate) fn row_to_schedule(row: &rusqlite::Row<'_>) -> rusqlite::Result<Schedule> {
    let rule = json_column(row, 2)?;
    let overrides = json_column(row, 6)?;
    let exceptions = json_column(row, 8)?;
    let post_status = PostStatus::from_str(&row.get::<_, String>(7)?)
        .map_err(|e| conversion_err(7, e))?;

    Ok(Schedule {
        id: row.get::<_, String>(0)?.into(),
        name: row.get(1)?,
        rule,
        is_active: row.get::<_, i64>(3)? != 0,
        template_id: row.get::<_, String>(4)?.into(),
        site_id: row.get::<_, String>(5)?.into(),
        overrides,
        post_status,
        exceptions,
        last_run_at: optional_instant(row, 9)?,
        next_run_at: optional_instant(row, 10)?,
        created_at: instant(row, 11)?,
        updated_at: instant(row, 12)?,
    })
}

/// Map a SELECT row (column order from EXECUTION_SELECT) to an ExecutionRecord.
pub(crate) fn row_to_execution(row: &rusqlite::Row<'_>) -> rusqlite::Result<ExecutionRecord> {
    let occurrence_date = row
        .get::<_, String>(2)?
        .parse()
        .map_err(|e| conversion_err(2, e))?;
    let kind = RunKind::from_str(&row.get::<_, String>(6)?).map_err(|e| conversion_err(6, e))?;

    Ok(ExecutionRecord {
        id: row.get(0)?,
        schedule_id: row.get::<_, String>(1)?.into(),
        occurrence_date,
        success: row.get::<_, i64>(3)? != 0,
        error: row.get(4)?,
        post_id: row.get(5)?,
        kind,
        executed_at: instant(row, 7)?,
    })
}

fn json_column<T: serde::de::DeserializeOwned>(
    row: &rusqlite::Row<'_>,
    idx: usize,
) -> rusqlite::Result<T> {
    let raw: String = row.get(idx)?;
    serde_json::from_str(&raw).map_err(|e| conversion_err(idx, e))
}

fn instant(row: &rusqlite::Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let raw: String = row.get(idx)?;
    DateTime::parse_from_rfc3339(&raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| conversion_err(idx, e))
}

fn optional_instant(row: &rusqlite::Row<'_>, idx: usize) -> rusqlite::Result<Option<DateTime<Utc>>> {
    match row.get::<_, Option<String>>(idx)? {
        Some(raw) => DateTime::parse_from_rfc3339(&raw)
            .map(|dt| Some(dt.with_timezone(&Utc)))
            .map_err(|e| conversion_err(idx, e)),
        None => Ok(None),
    }
}

fn conversion_err(
    idx: usize,
    e: impl Into<Box<dyn std::error::Error + Send + Sync + 'static>>,
) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, e.into())
}
