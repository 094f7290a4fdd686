//! Parsing log domain types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::catalog::ParsingSource;
use crate::domain::job::{JobId, JobStatus};
use crate::timestamp;

/// Backend record of a past or running parsing job
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParsingLog {
    pub id: JobId,
    pub source_id: i64,
    #[serde(default)]
    pub status: JobStatus,
    #[serde(default)]
    pub items_processed: u64,
    #[serde(default)]
    pub items_added: u64,
    #[serde(default)]
    pub items_updated: u64,
    #[serde(default)]
    pub items_failed: u64,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default, deserialize_with = "timestamp::deserialize_opt")]
    pub start_time: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "timestamp::deserialize_opt")]
    pub end_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub source: Option<ParsingSource>,
}
