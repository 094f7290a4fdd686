//! Backend abstraction
//!
//! The synchronization layer talks to the backend only through this trait,
//! so it can be exercised against an in-process fake.

use async_trait::async_trait;
use tally_core::domain::catalog::ReferenceCatalog;
use tally_core::domain::job::{JobId, LaunchRequest, StatusSnapshot};
use tally_core::dto::job::{CancelAck, StartedJob};

use crate::BackendClient;
use crate::error::Result;
use crate::stream::SnapshotStream;

/// Operations needed to launch, track and cancel parsing jobs
#[async_trait]
pub trait ParsingBackend: Send + Sync {
    /// Fetches the reference lists a descriptor is validated against
    async fn fetch_catalog(&self) -> Result<ReferenceCatalog>;

    /// Starts a job and returns its id
    async fn start(&self, request: &LaunchRequest) -> Result<StartedJob>;

    /// Requests cancellation of a running job
    async fn cancel(&self, job_id: JobId) -> Result<CancelAck>;

    /// Pulls the current status of a job
    async fn status(&self, job_id: JobId) -> Result<StatusSnapshot>;

    /// Opens a push subscription for a job
    async fn subscribe(&self, job_id: JobId) -> Result<SnapshotStream>;
}

#[async_trait]
impl ParsingBackend for BackendClient {
    async fn fetch_catalog(&self) -> Result<ReferenceCatalog> {
        BackendClient::fetch_catalog(self).await
    }

    async fn start(&self, request: &LaunchRequest) -> Result<StartedJob> {
        match request {
            LaunchRequest::General(descriptor) => self.start_parsing(descriptor).await,
            LaunchRequest::Special(import) => self.start_special(*import).await,
        }
    }

    async fn cancel(&self, job_id: JobId) -> Result<CancelAck> {
        self.stop_parsing(job_id).await
    }

    async fn status(&self, job_id: JobId) -> Result<StatusSnapshot> {
        self.parsing_status(job_id).await
    }

    async fn subscribe(&self, job_id: JobId) -> Result<SnapshotStream> {
        self.subscribe_status(job_id).await
    }
}
