use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Unique identifier for a schedule (UUIDv7 — time-sortable for easier log correlation).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ScheduleId(pub String);

impl ScheduleId {
    pub fn new() -> Self {
        // UUIDv7 includes timestamp — sortable and traceable in logs
        Self(Uuid::now_v7().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ScheduleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Default for ScheduleId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<String> for ScheduleId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for ScheduleId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Identifier of the content template a schedule generates from.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TemplateId(pub String);

impl TemplateId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TemplateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for TemplateId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for TemplateId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Identifier of the publish target (the connected site a post lands on).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SiteId(pub String);

impl SiteId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SiteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for SiteId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for SiteId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// What happens to a generated post once the pipeline finishes it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PostStatus {
    /// Park the post as a draft until a human approves it.
    ReviewFirst,
    /// Publish immediately without review.
    AutoPublish,
}

impl fmt::Display for PostStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PostStatus::ReviewFirst => "review_first",
            PostStatus::AutoPublish => "auto_publish",
        };
        write!(f, "{s}")
    }
}

impl std::str::FromStr for PostStatus {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "review_first" => Ok(PostStatus::ReviewFirst),
            "auto_publish" => Ok(PostStatus::AutoPublish),
            other => Err(format!("unknown post status: {other}")),
        }
    }
}

/// Whether an execution came from the recurrence rule or a manual trigger.
///
/// A manual run is never reconciled with the scheduled occurrence for the
/// same date — both may exist side by side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunKind {
    Scheduled,
    Manual,
}

impl fmt::Display for RunKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RunKind::Scheduled => "scheduled",
            RunKind::Manual => "manual",
        };
        write!(f, "{s}")
    }
}

impl std::str::FromStr for RunKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "scheduled" => Ok(RunKind::Scheduled),
            "manual" => Ok(RunKind::Manual),
            other => Err(format!("unknown run kind: {other}")),
        }
    }
}

/// Per-schedule generation overrides layered on top of the template defaults.
///
/// All fields optional; `None` means "use whatever the template says".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleOverrides {
    /// Target word count for the generated draft.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub word_count: Option<u32>,
    /// Writing tone, e.g. "conversational" or "technical".
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tone: Option<String>,
    /// Category slugs applied to the published post.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub categories: Vec<String>,
    /// Tag slugs applied to the published post.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn post_status_round_trip() {
        for status in [PostStatus::ReviewFirst, PostStatus::AutoPublish] {
            let parsed = PostStatus::from_str(&status.to_string()).expect("parse failed");
            assert_eq!(parsed, status);
        }
    }

    #[test]
    fn run_kind_rejects_unknown() {
        assert!(RunKind::from_str("retry").is_err());
    }

    #[test]
    fn overrides_skip_empty_fields_in_json() {
        let json = serde_json::to_string(&ScheduleOverrides::default()).unwrap();
        assert_eq!(json, "{}");
    }
}
