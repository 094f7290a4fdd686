//! Job DTOs for backend communication

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::domain::descriptor::{JobDescriptor, OptionValue};
use crate::domain::job::JobId;

/// Body of `POST /api/parsing/start`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StartParsingRequest {
    pub source_id: i64,
    pub style_id: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mode: Option<String>,
    pub custom_options: BTreeMap<String, OptionValue>,
}

impl From<&JobDescriptor> for StartParsingRequest {
    fn from(descriptor: &JobDescriptor) -> Self {
        Self {
            source_id: descriptor.source_id,
            style_id: descriptor.style_id,
            mode: descriptor.mode.clone(),
            custom_options: descriptor.options.clone(),
        }
    }
}

/// Response of every start endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StartedJob {
    #[serde(rename = "log_id", alias = "job_id")]
    pub job_id: JobId,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

/// Response of `POST /api/parsing/stop/{job_id}`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CancelAck {
    #[serde(default)]
    pub message: Option<String>,
}
