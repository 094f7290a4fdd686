//! Live status subscription
//!
//! The backend pushes status frames for a job over a WebSocket. Each text
//! frame is a snapshot-shaped JSON object; frames that cannot be decoded are
//! logged and skipped rather than tearing the connection down.

use futures::StreamExt;
use futures::stream::BoxStream;
use tally_core::domain::job::{JobId, StatusSnapshot};
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::{self, Message};

use crate::BackendClient;
use crate::error::{ClientError, Result};

/// Stream of pushed snapshots; ends when the server closes the socket
pub type SnapshotStream = BoxStream<'static, Result<StatusSnapshot>>;

impl BackendClient {
    /// WebSocket URL of a job's status feed
    pub fn status_socket_url(&self, job_id: JobId) -> String {
        format!("{}/api/parsing/ws/{}", self.ws_base_url(), job_id)
    }

    /// Open the push subscription for one job
    ///
    /// Resolves once the socket handshake completes. Transport errors after
    /// that surface as `Err` items on the stream.
    pub async fn subscribe_status(&self, job_id: JobId) -> Result<SnapshotStream> {
        let url = self.status_socket_url(job_id);

        let (ws_stream, _response) = connect_async(&url).await.map_err(|e| {
            ClientError::Subscription(format!("Failed to connect to {}: {e}", url))
        })?;

        tracing::debug!(job_id = %job_id, "Connected to status feed at {}", url);

        let stream = ws_stream
            .filter_map(move |frame| async move { decode_frame(job_id, frame) })
            .boxed();

        Ok(stream)
    }
}

fn decode_frame(
    job_id: JobId,
    frame: std::result::Result<Message, tungstenite::Error>,
) -> Option<Result<StatusSnapshot>> {
    match frame {
        Ok(Message::Text(text)) => match decode_snapshot(job_id, &text) {
            Ok(Some(snapshot)) => Some(Ok(snapshot)),
            Ok(None) => {
                tracing::debug!(job_id = %job_id, raw_message = %text, "Skipping status frame without a status");
                None
            }
            Err(e) => {
                tracing::warn!(job_id = %job_id, error = %e, raw_message = %text, "Skipping undecodable status frame");
                None
            }
        },
        Ok(Message::Close(frame)) => {
            tracing::debug!(job_id = %job_id, ?frame, "Status feed closed by server");
            None
        }
        // Pings are answered by tungstenite; binary frames are not used.
        Ok(_) => None,
        Err(e) => Some(Err(ClientError::Subscription(e.to_string()))),
    }
}

/// Decode one pushed frame for `job_id`
///
/// Frames that omit the job id are attributed to the subscribed job. Older
/// feeds report `is_running` instead of a status; `true` reads as running.
/// A frame with neither a status nor a running flag decodes as `None`.
pub fn decode_snapshot(job_id: JobId, text: &str) -> Result<Option<StatusSnapshot>> {
    let mut value: serde_json::Value = serde_json::from_str(text)
        .map_err(|e| ClientError::ParseError(format!("Invalid status frame: {}", e)))?;

    if let Some(object) = value.as_object_mut() {
        if !object.contains_key("log_id") && !object.contains_key("job_id") {
            object.insert("log_id".to_string(), job_id.0.into());
        }

        if !object.contains_key("status") {
            if object.get("is_running") != Some(&serde_json::Value::Bool(true)) {
                return Ok(None);
            }
            object.insert("status".to_string(), "running".into());
        }
    }

    serde_json::from_value(value)
        .map(Some)
        .map_err(|e| ClientError::ParseError(format!("Invalid status frame: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tally_core::domain::job::JobStatus;

    #[test]
    fn test_status_socket_url() {
        let client = BackendClient::new("https://console.example");
        assert_eq!(
            client.status_socket_url(JobId(42)),
            "wss://console.example/api/parsing/ws/42"
        );
    }

    #[test]
    fn test_decode_fills_missing_job_id() {
        let snapshot = decode_snapshot(JobId(42), r#"{"status": "running", "current": 5, "total": 20}"#)
            .unwrap()
            .unwrap();
        assert_eq!(snapshot.job_id, JobId(42));
        assert_eq!(snapshot.status, JobStatus::Running);
        assert_eq!(snapshot.derived_progress(), 25);
    }

    #[test]
    fn test_decode_keeps_explicit_job_id() {
        let snapshot = decode_snapshot(JobId(42), r#"{"log_id": 7, "status": "completed"}"#)
            .unwrap()
            .unwrap();
        assert_eq!(snapshot.job_id, JobId(7));
    }

    #[test]
    fn test_decode_legacy_running_flag() {
        let frame = r#"{"is_running": true, "task": "Sheet 3", "current": 1, "total": 4, "elapsed_time": 12.0, "errors": []}"#;
        let snapshot = decode_snapshot(JobId(3), frame).unwrap().unwrap();
        assert_eq!(snapshot.status, JobStatus::Running);
        assert_eq!(snapshot.task.as_deref(), Some("Sheet 3"));
        assert_eq!(snapshot.elapsed_secs, Some(12.0));
    }

    #[test]
    fn test_decode_skips_frames_without_status() {
        let idle = r#"{"current": 4, "total": 4, "is_running": false}"#;
        assert_eq!(decode_snapshot(JobId(3), idle).unwrap(), None);

        let bare = r#"{"current": 1, "total": 4}"#;
        assert_eq!(decode_snapshot(JobId(3), bare).unwrap(), None);
    }

    #[test]
    fn test_decode_rejects_non_json() {
        assert!(matches!(
            decode_snapshot(JobId(1), "not json"),
            Err(ClientError::ParseError(_))
        ));
    }
}
