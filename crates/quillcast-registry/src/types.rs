use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use quillcast_core::types::{PostStatus, RunKind, ScheduleId, ScheduleOverrides, SiteId, TemplateId};
use quillcast_recurrence::{ExceptionSet, RecurrenceRule, RuleSpec};

/// A persisted recurring content schedule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Schedule {
    /// UUIDv7 string — primary key.
    pub id: ScheduleId,
    /// Human-readable label, also used as the predicted post subject.
    pub name: String,
    /// The validated recurrence rule. Replaced wholesale on edit.
    pub rule: RecurrenceRule,
    /// Inactive schedules contribute no future occurrences, but their past
    /// executions stay visible in the calendar.
    pub is_active: bool,
    /// Content template generation starts from.
    pub template_id: TemplateId,
    /// Publish target the finished post lands on.
    pub site_id: SiteId,
    /// Per-schedule generation overrides.
    pub overrides: ScheduleOverrides,
    /// Draft-vs-publish behaviour for generated posts.
    pub post_status: PostStatus,
    /// Skipped occurrence dates.
    pub exceptions: ExceptionSet,
    /// When the last scheduled run was dispatched or recorded, if any.
    pub last_run_at: Option<DateTime<Utc>>,
    /// Cached next due instant. `None` when inactive or when the rule has no
    /// upcoming occurrence within the search horizon. Recomputed on every
    /// mutation that can move it.
    pub next_run_at: Option<DateTime<Utc>>,
    /// Creation instant.
    pub created_at: DateTime<Utc>,
    /// Last metadata update.
    pub updated_at: DateTime<Utc>,
}

impl Schedule {
    /// Build the pipeline hand-off payload for one occurrence of this
    /// schedule.
    pub fn generation_request(
        &self,
        occurrence_date: NaiveDate,
        kind: RunKind,
    ) -> quillcast_core::request::GenerationRequest {
        quillcast_core::request::GenerationRequest {
            schedule_id: self.id.clone(),
            schedule_name: self.name.clone(),
            template_id: self.template_id.clone(),
            site_id: self.site_id.clone(),
            overrides: self.overrides.clone(),
            post_status: self.post_status,
            occurrence_date,
            kind,
        }
    }
}

/// Parameters for creating a schedule. The rule arrives as a raw
/// [`RuleSpec`] and is validated by the registry before anything persists.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewSchedule {
    pub name: String,
    pub rule: RuleSpec,
    pub template_id: TemplateId,
    pub site_id: SiteId,
    #[serde(default)]
    pub overrides: ScheduleOverrides,
    pub post_status: PostStatus,
    /// Whether the schedule starts active. Active creation is subject to the
    /// slot-uniqueness check.
    pub active: bool,
}

/// One reported execution of a schedule — scheduled or manual.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionRecord {
    /// UUIDv7 string — primary key.
    pub id: String,
    pub schedule_id: ScheduleId,
    /// The schedule-local occurrence date this run fulfils — the key the
    /// calendar uses to match it against the virtual occurrence it replaces.
    /// Distinct from `executed_at`: a run can start late.
    pub occurrence_date: NaiveDate,
    pub success: bool,
    /// Pipeline error detail when `success` is false.
    pub error: Option<String>,
    /// Id of the produced post, when generation got that far.
    pub post_id: Option<String>,
    pub kind: RunKind,
    /// Wall-clock instant the run happened.
    pub executed_at: DateTime<Utc>,
}

/// Parameters for recording an execution; the registry assigns the id.
#[derive(Debug, Clone)]
pub struct NewExecution {
    pub schedule_id: ScheduleId,
    pub occurrence_date: NaiveDate,
    pub success: bool,
    pub error: Option<String>,
    pub post_id: Option<String>,
    pub kind: RunKind,
    pub executed_at: DateTime<Utc>,
}
