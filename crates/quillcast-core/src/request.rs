//! Generation hand-off types — shared between the dispatch engine and the
//! external content pipeline.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::types::{PostStatus, RunKind, ScheduleId, ScheduleOverrides, SiteId, TemplateId};

/// Emitted by the dispatcher when a schedule's occurrence becomes due (or a
/// manual run is triggered); consumed by the generation pipeline, which runs
/// its title/outline/draft/review/image stages and reports back through
/// `ScheduleRegistry::record_execution`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationRequest {
    /// The schedule this request fulfils.
    pub schedule_id: ScheduleId,
    /// Display name — used for logging and as the predicted post subject.
    pub schedule_name: String,
    /// Content template to generate from.
    pub template_id: TemplateId,
    /// Publish target for the finished post.
    pub site_id: SiteId,
    /// Per-schedule overrides layered on top of the template.
    pub overrides: ScheduleOverrides,
    /// Draft-vs-publish behaviour once generation completes.
    pub post_status: PostStatus,
    /// Schedule-local occurrence date this run fulfils. The execution record
    /// the pipeline writes back must carry the same date so the calendar can
    /// match it against the virtual occurrence it replaces.
    pub occurrence_date: NaiveDate,
    /// Scheduled occurrence or out-of-band manual trigger.
    pub kind: RunKind,
}
