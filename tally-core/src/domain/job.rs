//! Job domain types

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::descriptor::JobDescriptor;
use crate::timestamp;

/// Backend identifier of a parsing job (the id of its parsing log row)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(pub i64);

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for JobId {
    fn from(id: i64) -> Self {
        JobId(id)
    }
}

/// Job status as reported by the backend
///
/// `completed`, `failed` and `cancelled` are terminal. Status strings the
/// console does not know decode as `Unknown`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Starting,
    #[serde(alias = "in_progress")]
    Running,
    Completed,
    Failed,
    #[serde(alias = "canceled")]
    Cancelled,
    #[default]
    #[serde(other)]
    Unknown,
}

impl JobStatus {
    /// Whether no further transition is possible from this status
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            JobStatus::Completed | JobStatus::Failed | JobStatus::Cancelled
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            JobStatus::Starting => "starting",
            JobStatus::Running => "running",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
            JobStatus::Cancelled => "cancelled",
            JobStatus::Unknown => "unknown",
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Point-in-time report for one job
///
/// Field names on the wire follow the backend's status endpoint
/// (`log_id`, `items_processed`, `current_item`, ...). The push feed uses
/// the shorter `current`/`total`/`elapsed_time` spellings, accepted as
/// aliases. The status endpoint nests the live counters under `details`;
/// those fill in whatever the top level leaves out.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "WireSnapshot")]
pub struct StatusSnapshot {
    #[serde(rename = "log_id")]
    pub job_id: JobId,
    pub status: JobStatus,
    #[serde(rename = "items_processed")]
    pub processed: u64,
    #[serde(rename = "items_added")]
    pub added: u64,
    #[serde(rename = "items_updated")]
    pub updated: u64,
    #[serde(rename = "items_failed")]
    pub failed: u64,
    /// Explicit progress in percent (0-100), when the backend computes it
    pub progress: Option<f64>,
    #[serde(rename = "current_item")]
    pub current: Option<u64>,
    #[serde(rename = "total_items")]
    pub total: Option<u64>,
    #[serde(rename = "elapsed_time")]
    pub elapsed_secs: Option<f64>,
    pub message: Option<String>,
    /// Label of the step currently being worked on
    pub task: Option<String>,
    pub errors: Vec<String>,
    #[serde(rename = "start_time")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(rename = "end_time")]
    pub ended_at: Option<DateTime<Utc>>,
}

#[derive(Deserialize)]
struct WireSnapshot {
    #[serde(rename = "log_id", alias = "job_id")]
    job_id: JobId,
    #[serde(default)]
    status: JobStatus,
    #[serde(rename = "items_processed", default)]
    processed: u64,
    #[serde(rename = "items_added", default)]
    added: u64,
    #[serde(rename = "items_updated", default)]
    updated: u64,
    #[serde(rename = "items_failed", default)]
    failed: u64,
    #[serde(default)]
    progress: Option<f64>,
    #[serde(rename = "current_item", alias = "current", default)]
    current: Option<u64>,
    #[serde(rename = "total_items", alias = "total", default)]
    total: Option<u64>,
    #[serde(rename = "elapsed_time", default)]
    elapsed_secs: Option<f64>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    task: Option<String>,
    #[serde(default)]
    errors: Vec<String>,
    #[serde(rename = "start_time", default, deserialize_with = "timestamp::deserialize_opt")]
    started_at: Option<DateTime<Utc>>,
    #[serde(rename = "end_time", default, deserialize_with = "timestamp::deserialize_opt")]
    ended_at: Option<DateTime<Utc>>,
    #[serde(default)]
    details: Option<WireDetails>,
}

/// In-memory parser state the status endpoint reports under `details`
#[derive(Default, Deserialize)]
struct WireDetails {
    #[serde(default)]
    progress: Option<f64>,
    #[serde(rename = "current_item", alias = "current", default)]
    current: Option<u64>,
    #[serde(rename = "total_items", alias = "total", default)]
    total: Option<u64>,
    #[serde(rename = "elapsed_time", default)]
    elapsed_secs: Option<f64>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    task: Option<String>,
}

impl From<WireSnapshot> for StatusSnapshot {
    fn from(wire: WireSnapshot) -> Self {
        let details = wire.details.unwrap_or_default();

        Self {
            job_id: wire.job_id,
            status: wire.status,
            processed: wire.processed,
            added: wire.added,
            updated: wire.updated,
            failed: wire.failed,
            progress: wire.progress.or(details.progress),
            current: wire.current.or(details.current),
            total: wire.total.or(details.total),
            elapsed_secs: wire.elapsed_secs.or(details.elapsed_secs),
            message: wire.message.or(details.message),
            task: wire.task.or(details.task),
            errors: wire.errors,
            started_at: wire.started_at,
            ended_at: wire.ended_at,
        }
    }
}

impl StatusSnapshot {
    /// Creates an empty snapshot for a job in the given status
    pub fn new(job_id: JobId, status: JobStatus) -> Self {
        Self {
            job_id,
            status,
            processed: 0,
            added: 0,
            updated: 0,
            failed: 0,
            progress: None,
            current: None,
            total: None,
            elapsed_secs: None,
            message: None,
            task: None,
            errors: Vec::new(),
            started_at: None,
            ended_at: None,
        }
    }

    /// Sets the `current`/`total` item counters
    pub fn with_items(mut self, current: u64, total: u64) -> Self {
        self.current = Some(current);
        self.total = Some(total);
        self
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    /// Progress in whole percent
    ///
    /// The backend's explicit ratio wins; otherwise `current / total` is
    /// used, with a zero or missing total reported as 0%.
    pub fn derived_progress(&self) -> u32 {
        if let Some(explicit) = self.progress {
            return explicit.round().max(0.0) as u32;
        }

        match (self.current, self.total) {
            (Some(current), Some(total)) if total > 0 => {
                (current as f64 / total as f64 * 100.0).round() as u32
            }
            _ => 0,
        }
    }

    /// Elapsed seconds, falling back to the start/end timestamps
    pub fn elapsed(&self) -> Option<f64> {
        self.elapsed_secs.or_else(|| match (self.started_at, self.ended_at) {
            (Some(start), Some(end)) => Some((end - start).num_milliseconds() as f64 / 1000.0),
            _ => None,
        })
    }
}

/// Fixed import triggers that bypass the general launch form
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpecialImport {
    Orders,
    GoogleSheets,
}

impl SpecialImport {
    pub fn label(self) -> &'static str {
        match self {
            SpecialImport::Orders => "orders import",
            SpecialImport::GoogleSheets => "Google Sheets import",
        }
    }
}

/// Everything a UI entry point can ask the controller to launch
#[derive(Debug, Clone, PartialEq)]
pub enum LaunchRequest {
    General(JobDescriptor),
    Special(SpecialImport),
}

impl LaunchRequest {
    pub fn origin(&self) -> LaunchOrigin {
        match self {
            LaunchRequest::General(_) => LaunchOrigin::General,
            LaunchRequest::Special(SpecialImport::Orders) => LaunchOrigin::Orders,
            LaunchRequest::Special(SpecialImport::GoogleSheets) => LaunchOrigin::GoogleSheets,
        }
    }
}

impl From<JobDescriptor> for LaunchRequest {
    fn from(descriptor: JobDescriptor) -> Self {
        LaunchRequest::General(descriptor)
    }
}

impl From<SpecialImport> for LaunchRequest {
    fn from(import: SpecialImport) -> Self {
        LaunchRequest::Special(import)
    }
}

/// Which entry point started tracking a job
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LaunchOrigin {
    General,
    Orders,
    GoogleSheets,
    /// Tracking resumed for a job started elsewhere
    Attached,
}

impl fmt::Display for LaunchOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LaunchOrigin::General => "general",
            LaunchOrigin::Orders => "orders",
            LaunchOrigin::GoogleSheets => "googlesheets",
            LaunchOrigin::Attached => "attached",
        };
        f.write_str(name)
    }
}

/// Identifier of a tracked job, as handed out by a controller
#[derive(Debug, Clone, PartialEq)]
pub struct JobHandle {
    pub job_id: JobId,
    pub origin: LaunchOrigin,
    /// Message returned by the backend when the job was started
    pub message: Option<String>,
    pub launched_at: DateTime<Utc>,
}

impl JobHandle {
    pub fn new(job_id: JobId, origin: LaunchOrigin, message: Option<String>) -> Self {
        Self {
            job_id,
            origin,
            message,
            launched_at: Utc::now(),
        }
    }
}

/// Health of a status channel's push transport
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Closed,
    Connecting,
    Open,
    Reconnecting,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ConnectionState::Closed => "closed",
            ConnectionState::Connecting => "connecting",
            ConnectionState::Open => "open",
            ConnectionState::Reconnecting => "reconnecting",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_wire_names() {
        let running: JobStatus = serde_json::from_str("\"in_progress\"").unwrap();
        assert_eq!(running, JobStatus::Running);

        let other: JobStatus = serde_json::from_str("\"paused\"").unwrap();
        assert_eq!(other, JobStatus::Unknown);

        assert_eq!(serde_json::to_string(&JobStatus::Cancelled).unwrap(), "\"cancelled\"");
    }

    #[test]
    fn test_terminal_statuses() {
        assert!(JobStatus::Completed.is_terminal());
        assert!(JobStatus::Failed.is_terminal());
        assert!(JobStatus::Cancelled.is_terminal());
        assert!(!JobStatus::Starting.is_terminal());
        assert!(!JobStatus::Running.is_terminal());
        assert!(!JobStatus::Unknown.is_terminal());
    }

    #[test]
    fn test_snapshot_from_status_endpoint() {
        let json = r#"{
            "log_id": 42,
            "status": "in_progress",
            "items_processed": 10,
            "items_added": 4,
            "items_updated": 5,
            "items_failed": 1,
            "start_time": "2024-03-01T12:00:00.000001",
            "end_time": null,
            "message": null,
            "details": null
        }"#;

        let snapshot: StatusSnapshot = serde_json::from_str(json).unwrap();
        assert_eq!(snapshot.job_id, JobId(42));
        assert_eq!(snapshot.status, JobStatus::Running);
        assert_eq!(snapshot.processed, 10);
        assert_eq!(snapshot.failed, 1);
        assert!(snapshot.started_at.is_some());
        assert!(snapshot.ended_at.is_none());
    }

    #[test]
    fn test_snapshot_reads_counters_from_details() {
        let json = r#"{
            "log_id": 42,
            "status": "in_progress",
            "items_processed": 50,
            "items_added": 20,
            "items_updated": 30,
            "items_failed": 0,
            "start_time": "2024-03-01T12:00:00",
            "end_time": null,
            "message": null,
            "details": {"total_items": 200, "current_item": 50, "progress": 25, "task": "Page 3"}
        }"#;

        let snapshot: StatusSnapshot = serde_json::from_str(json).unwrap();
        assert_eq!(snapshot.current, Some(50));
        assert_eq!(snapshot.total, Some(200));
        assert_eq!(snapshot.progress, Some(25.0));
        assert_eq!(snapshot.task.as_deref(), Some("Page 3"));
        assert_eq!(snapshot.derived_progress(), 25);

        let json = r#"{"log_id": 42, "status": "in_progress", "message": null,
            "details": {"status": "in_progress", "message": "Fetching items from shop...", "progress": 0}}"#;
        let snapshot: StatusSnapshot = serde_json::from_str(json).unwrap();
        assert_eq!(snapshot.message.as_deref(), Some("Fetching items from shop..."));
        assert_eq!(snapshot.derived_progress(), 0);
    }

    #[test]
    fn test_top_level_counters_win_over_details() {
        let json = r#"{"log_id": 1, "current": 3, "total": 4, "details": {"current_item": 1, "total_items": 9}}"#;
        let snapshot: StatusSnapshot = serde_json::from_str(json).unwrap();
        assert_eq!(snapshot.current, Some(3));
        assert_eq!(snapshot.total, Some(4));
        assert_eq!(snapshot.derived_progress(), 75);
    }

    #[test]
    fn test_snapshot_push_aliases() {
        let json = r#"{"job_id": 7, "status": "running", "current": 3, "total": 12, "elapsed_time": 4.5}"#;
        let snapshot: StatusSnapshot = serde_json::from_str(json).unwrap();
        assert_eq!(snapshot.current, Some(3));
        assert_eq!(snapshot.total, Some(12));
        assert_eq!(snapshot.elapsed(), Some(4.5));
    }

    #[test]
    fn test_derived_progress() {
        let snapshot = StatusSnapshot::new(JobId(1), JobStatus::Running).with_items(50, 200);
        assert_eq!(snapshot.derived_progress(), 25);

        let zero_total = StatusSnapshot::new(JobId(1), JobStatus::Running).with_items(5, 0);
        assert_eq!(zero_total.derived_progress(), 0);

        let missing = StatusSnapshot::new(JobId(1), JobStatus::Starting);
        assert_eq!(missing.derived_progress(), 0);

        let rounding = StatusSnapshot::new(JobId(1), JobStatus::Running).with_items(1, 3);
        assert_eq!(rounding.derived_progress(), 33);
    }

    #[test]
    fn test_explicit_progress_wins() {
        let mut snapshot = StatusSnapshot::new(JobId(1), JobStatus::Running).with_items(1, 10);
        snapshot.progress = Some(62.6);
        assert_eq!(snapshot.derived_progress(), 63);
    }

    #[test]
    fn test_launch_request_origin() {
        let request = LaunchRequest::from(SpecialImport::GoogleSheets);
        assert_eq!(request.origin(), LaunchOrigin::GoogleSheets);

        let request = LaunchRequest::from(JobDescriptor::new(1, 2));
        assert_eq!(request.origin(), LaunchOrigin::General);
    }
}
