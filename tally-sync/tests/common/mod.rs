#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use serde_json::json;
use tally_client::{ClientError, ParsingBackend, Result, SnapshotStream};
use tally_core::domain::catalog::ReferenceCatalog;
use tally_core::domain::job::{JobHandle, JobId, JobStatus, LaunchRequest, StatusSnapshot};
use tally_core::dto::job::{CancelAck, StartedJob};
use tally_sync::{NotificationBridge, TransitionEvent};
use tokio::sync::mpsc;

type Feed = mpsc::UnboundedSender<Result<StatusSnapshot>>;

/// In-process backend with scripted responses and recorded calls
#[derive(Default)]
pub struct FakeBackend {
    inner: Mutex<Inner>,
}

#[derive(Default)]
struct Inner {
    next_job_id: i64,
    start_delay: Option<Duration>,
    start_error: Option<(u16, String)>,
    cancel_error: Option<(u16, String)>,
    subscribe_failures: u32,
    start_calls: Vec<LaunchRequest>,
    cancel_calls: Vec<JobId>,
    subscribe_calls: Vec<JobId>,
    status_calls: Vec<JobId>,
    feeds: HashMap<JobId, Feed>,
    statuses: HashMap<JobId, StatusSnapshot>,
}

impl FakeBackend {
    pub fn new() -> Arc<Self> {
        let backend = Self::default();
        backend.lock().next_job_id = 1;
        Arc::new(backend)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        self.inner.lock().unwrap()
    }

    pub fn set_next_job_id(&self, id: i64) {
        self.lock().next_job_id = id;
    }

    pub fn delay_start(&self, delay: Duration) {
        self.lock().start_delay = Some(delay);
    }

    pub fn fail_start(&self, status: u16, detail: &str) {
        self.lock().start_error = Some((status, detail.to_string()));
    }

    pub fn fail_cancel(&self, status: u16, detail: &str) {
        self.lock().cancel_error = Some((status, detail.to_string()));
    }

    pub fn refuse_subscriptions(&self, times: u32) {
        self.lock().subscribe_failures = times;
    }

    /// Status returned by polls for `job_id`
    pub fn set_status(&self, snapshot: StatusSnapshot) {
        self.lock().statuses.insert(snapshot.job_id, snapshot);
    }

    /// Push a snapshot on the latest feed of its job
    pub fn push(&self, snapshot: StatusSnapshot) -> bool {
        let inner = self.lock();
        match inner.feeds.get(&snapshot.job_id) {
            Some(feed) => feed.send(Ok(snapshot)).is_ok(),
            None => false,
        }
    }

    /// End the current feed of a job as if the server closed the socket
    pub fn drop_connection(&self, job_id: JobId) {
        self.lock().feeds.remove(&job_id);
    }

    /// Emit a transport error on the current feed of a job
    pub fn break_connection(&self, job_id: JobId) {
        if let Some(feed) = self.lock().feeds.get(&job_id) {
            let _ = feed.send(Err(ClientError::Subscription("connection reset".to_string())));
        }
    }

    /// Whether the subscriber of the current feed went away
    pub fn feed_closed(&self, job_id: JobId) -> bool {
        self.lock()
            .feeds
            .get(&job_id)
            .is_none_or(|feed| feed.is_closed())
    }

    pub fn start_calls(&self) -> Vec<LaunchRequest> {
        self.lock().start_calls.clone()
    }

    pub fn cancel_calls(&self) -> Vec<JobId> {
        self.lock().cancel_calls.clone()
    }

    pub fn subscriptions(&self, job_id: JobId) -> usize {
        self.lock()
            .subscribe_calls
            .iter()
            .filter(|id| **id == job_id)
            .count()
    }

    pub fn status_calls(&self) -> usize {
        self.lock().status_calls.len()
    }
}

fn api_error(status: u16, detail: &str) -> ClientError {
    ClientError::api_error(status, json!({ "detail": detail }).to_string())
}

#[async_trait]
impl ParsingBackend for FakeBackend {
    async fn fetch_catalog(&self) -> Result<ReferenceCatalog> {
        Ok(catalog())
    }

    async fn start(&self, request: &LaunchRequest) -> Result<StartedJob> {
        let delay = self.lock().start_delay;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let mut inner = self.lock();
        inner.start_calls.push(request.clone());
        if let Some((status, detail)) = &inner.start_error {
            return Err(api_error(*status, detail));
        }

        let id = inner.next_job_id;
        inner.next_job_id += 1;
        Ok(StartedJob {
            job_id: JobId(id),
            status: Some("started".to_string()),
            message: Some(format!("Parsing task {} started", id)),
        })
    }

    async fn cancel(&self, job_id: JobId) -> Result<CancelAck> {
        let mut inner = self.lock();
        inner.cancel_calls.push(job_id);
        if let Some((status, detail)) = &inner.cancel_error {
            return Err(api_error(*status, detail));
        }
        Ok(CancelAck {
            message: Some("Parsing task stopped successfully".to_string()),
        })
    }

    async fn status(&self, job_id: JobId) -> Result<StatusSnapshot> {
        let mut inner = self.lock();
        inner.status_calls.push(job_id);
        inner
            .statuses
            .get(&job_id)
            .cloned()
            .ok_or_else(|| api_error(404, "Parsing log not found"))
    }

    async fn subscribe(&self, job_id: JobId) -> Result<SnapshotStream> {
        let mut inner = self.lock();
        inner.subscribe_calls.push(job_id);
        if inner.subscribe_failures > 0 {
            inner.subscribe_failures -= 1;
            return Err(ClientError::Subscription("connection refused".to_string()));
        }

        let (tx, rx) = mpsc::unbounded_channel();
        inner.feeds.insert(job_id, tx);

        let stream = futures::stream::unfold(rx, |mut rx| async move {
            rx.recv().await.map(|item| (item, rx))
        });
        Ok(stream.boxed())
    }
}

/// Records every notification it receives
#[derive(Default)]
pub struct RecordingBridge {
    pub transitions: Mutex<Vec<(JobId, JobStatus, JobStatus)>>,
    pub retired: Mutex<Vec<(JobId, JobId)>>,
}

impl NotificationBridge for RecordingBridge {
    fn transition(&self, event: &TransitionEvent) {
        self.transitions
            .lock()
            .unwrap()
            .push((event.job_id(), event.from, event.to));
    }

    fn retired(&self, previous: &JobHandle, replacement: &JobHandle) {
        self.retired
            .lock()
            .unwrap()
            .push((previous.job_id, replacement.job_id));
    }
}

/// Catalog with one enabled source, one disabled source, one style and the
/// full/incremental modes
pub fn catalog() -> ReferenceCatalog {
    serde_json::from_value(json!({
        "sources": [
            {"id": 1, "name": "shop", "url": "https://shop.example", "enabled": true},
            {"id": 2, "name": "archive", "url": "https://archive.example", "enabled": false}
        ],
        "styles": [
            {"id": 1, "name": "basic", "include_images": false, "deep_details": false}
        ],
        "modes": [
            {"id": "full", "name": "Full", "description": "Everything"},
            {"id": "incremental", "name": "Incremental", "description": "Recent changes",
             "params": {"days": {"type": "number", "default": 7, "min": 1, "max": 30}}}
        ]
    }))
    .unwrap()
}

pub fn snapshot(job_id: i64, status: JobStatus) -> StatusSnapshot {
    StatusSnapshot::new(JobId(job_id), status)
}

/// Let spawned tasks run until `condition` holds
pub async fn until(mut condition: impl FnMut() -> bool) {
    for _ in 0..1000 {
        if condition() {
            return;
        }
        tokio::task::yield_now().await;
    }
    panic!("condition not reached");
}

/// Let spawned tasks drain their queues
pub async fn settle() {
    for _ in 0..50 {
        tokio::task::yield_now().await;
    }
}
