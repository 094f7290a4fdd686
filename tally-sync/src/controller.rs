//! Job controller
//!
//! Owns the single "current job" of one console session. Every entry point
//! (the general launch form, the orders import and the Google Sheets import)
//! goes through [`JobController::launch`], so starting one job while another
//! is tracked is handled in one place.
//!
//! The controller is driven by its owner: [`JobController::next_update`]
//! waits for the next snapshot of the tracked job, folds it into the state
//! machine and publishes the result.
//!
//! `launch` holds the controller mutably while the start request is in
//! flight, so other tasks follow the phase through [`JobController::watch_state`].

use std::sync::Arc;

use tally_client::ParsingBackend;
use tally_core::domain::catalog::ReferenceCatalog;
use tally_core::domain::descriptor::DescriptorError;
use tally_core::domain::job::{JobHandle, JobId, LaunchOrigin, LaunchRequest, StatusSnapshot};
use tokio::sync::{broadcast, mpsc, watch};

use crate::bridge::{NoopBridge, NotificationBridge};
use crate::channel::StatusChannel;
use crate::config::{LaunchPolicy, SyncConfig};
use crate::error::{CancelError, LaunchError};
use crate::machine::{JobStateMachine, TransitionEvent};

const BROADCAST_CAPACITY: usize = 64;

/// Coarse phase of a controller
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControllerState {
    Idle,
    /// A start request is in flight
    Launching,
    Tracking,
}

/// Result of folding one snapshot into the tracked job
#[derive(Debug, Clone)]
pub struct JobUpdate {
    pub handle: JobHandle,
    pub snapshot: StatusSnapshot,
    /// Progress in whole percent after this snapshot
    pub progress: u32,
    /// Set when the snapshot changed the status value
    pub transition: Option<TransitionEvent>,
}

impl JobUpdate {
    pub fn is_terminal(&self) -> bool {
        self.snapshot.status.is_terminal()
    }
}

struct ActiveJob {
    handle: JobHandle,
    machine: JobStateMachine,
    channel: StatusChannel,
}

pub struct JobController {
    backend: Arc<dyn ParsingBackend>,
    config: SyncConfig,
    bridge: Arc<dyn NotificationBridge>,
    catalog: Option<ReferenceCatalog>,
    phase: watch::Sender<ControllerState>,
    active: Option<ActiveJob>,
    delivery_tx: mpsc::UnboundedSender<(JobId, StatusSnapshot)>,
    delivery_rx: mpsc::UnboundedReceiver<(JobId, StatusSnapshot)>,
    transitions: broadcast::Sender<TransitionEvent>,
    snapshots: broadcast::Sender<StatusSnapshot>,
}

impl JobController {
    pub fn new(backend: Arc<dyn ParsingBackend>, config: SyncConfig) -> Self {
        let (delivery_tx, delivery_rx) = mpsc::unbounded_channel();
        let (transitions, _) = broadcast::channel(BROADCAST_CAPACITY);
        let (snapshots, _) = broadcast::channel(BROADCAST_CAPACITY);
        let (phase, _) = watch::channel(ControllerState::Idle);

        Self {
            backend,
            config,
            bridge: Arc::new(NoopBridge),
            catalog: None,
            phase,
            active: None,
            delivery_tx,
            delivery_rx,
            transitions,
            snapshots,
        }
    }

    pub fn with_bridge(mut self, bridge: Arc<dyn NotificationBridge>) -> Self {
        self.bridge = bridge;
        self
    }

    // =============================================================================
    // Reference Data
    // =============================================================================

    /// Fetch sources, styles and modes from the backend and keep them
    pub async fn refresh_catalog(&mut self) -> tally_client::Result<&ReferenceCatalog> {
        let catalog = self.backend.fetch_catalog().await?;
        tracing::debug!(
            sources = catalog.sources.len(),
            styles = catalog.styles.len(),
            modes = catalog.modes.len(),
            "Loaded reference catalog"
        );
        Ok(&*self.catalog.insert(catalog))
    }

    pub fn set_catalog(&mut self, catalog: ReferenceCatalog) {
        self.catalog = Some(catalog);
    }

    pub fn catalog(&self) -> Option<&ReferenceCatalog> {
        self.catalog.as_ref()
    }

    // =============================================================================
    // Job Lifecycle
    // =============================================================================

    /// Start a job and track it
    ///
    /// General descriptors are validated against the catalog before anything
    /// is sent. On success the previously tracked job, if any, is retired:
    /// its channel closes but the remote job keeps running.
    pub async fn launch(
        &mut self,
        request: impl Into<LaunchRequest>,
    ) -> Result<JobHandle, LaunchError> {
        let request = request.into();
        self.check_policy()?;

        if let LaunchRequest::General(descriptor) = &request {
            let catalog = self.catalog.as_ref().ok_or(DescriptorError::CatalogMissing)?;
            descriptor.validate(catalog)?;
        }

        let backend = Arc::clone(&self.backend);
        let started = {
            let _launching = LaunchGuard::new(&self.phase);
            backend.start(&request).await
        };

        let started = started.map_err(|e| {
            tracing::warn!(origin = %request.origin(), error = %e, "Launch failed");
            LaunchError::from(e)
        })?;

        let handle = JobHandle::new(started.job_id, request.origin(), started.message);
        tracing::info!(job_id = %handle.job_id, origin = %handle.origin, "Launched job");

        self.track(handle.clone());
        Ok(handle)
    }

    /// Track a job that is already running on the backend
    pub fn attach(&mut self, job_id: JobId) -> Result<JobHandle, LaunchError> {
        if let Some(active) = &self.active {
            if active.handle.job_id == job_id {
                return Ok(active.handle.clone());
            }
        }
        self.check_policy()?;

        let handle = JobHandle::new(job_id, LaunchOrigin::Attached, None);
        tracing::info!(job_id = %job_id, "Attached to job");

        self.track(handle.clone());
        Ok(handle)
    }

    /// Ask the backend to stop the tracked job
    ///
    /// The job stays tracked until a terminal snapshot arrives, whatever
    /// the outcome of the request.
    pub async fn cancel(&mut self) -> Result<(), CancelError> {
        let Some(active) = &self.active else {
            return Err(CancelError::NoActiveJob);
        };
        let job_id = active.handle.job_id;

        tracing::info!(job_id = %job_id, "Cancelling job");
        let ack = self.backend.cancel(job_id).await.map_err(|e| {
            tracing::warn!(job_id = %job_id, error = %e, "Cancel request failed");
            CancelError::from(e)
        })?;

        tracing::info!(job_id = %job_id, message = ?ack.message, "Cancel accepted");
        Ok(())
    }

    /// Wait for the next snapshot of the tracked job
    ///
    /// Returns `None` when no job is tracked. Snapshots still queued from a
    /// retired job are discarded. After a terminal snapshot the channel is
    /// closed and the controller is idle again.
    ///
    /// Cancel-safe: dropping the future loses no snapshot.
    pub async fn next_update(&mut self) -> Option<JobUpdate> {
        loop {
            let active_id = self.active.as_ref()?.handle.job_id;
            let (job_id, snapshot) = self.delivery_rx.recv().await?;

            if job_id != active_id || snapshot.job_id != active_id {
                tracing::debug!(job_id = %job_id, active = %active_id, "Discarding snapshot of untracked job");
                continue;
            }

            let active = self.active.as_mut()?;
            let transition = active.machine.apply(snapshot.clone());
            let update = JobUpdate {
                handle: active.handle.clone(),
                progress: active.machine.progress(),
                snapshot,
                transition,
            };
            let terminal = active.machine.is_terminal();

            let _ = self.snapshots.send(update.snapshot.clone());
            if let Some(event) = &update.transition {
                tracing::info!(job_id = %active_id, from = %event.from, to = %event.to, "Job status changed");
                self.bridge.transition(event);
                let _ = self.transitions.send(event.clone());
            }

            if terminal {
                if let Some(finished) = self.active.take() {
                    finished.channel.close();
                    self.phase.send_replace(ControllerState::Idle);
                    tracing::info!(job_id = %active_id, status = %update.snapshot.status, "Job finished");
                }
            }

            return Some(update);
        }
    }

    // =============================================================================
    // Queries
    // =============================================================================

    pub fn active_job(&self) -> Option<&JobHandle> {
        self.active.as_ref().map(|active| &active.handle)
    }

    pub fn state(&self) -> ControllerState {
        *self.phase.borrow()
    }

    /// Follow phase changes, including the `Launching` phase that `state`
    /// cannot show while `launch` holds the controller
    pub fn watch_state(&self) -> watch::Receiver<ControllerState> {
        self.phase.subscribe()
    }

    /// Latest snapshot of the tracked job
    pub fn current_snapshot(&self) -> Option<&StatusSnapshot> {
        self.active.as_ref().and_then(|active| active.machine.snapshot())
    }

    pub fn progress(&self) -> Option<u32> {
        self.active.as_ref().map(|active| active.machine.progress())
    }

    pub fn subscribe_transitions(&self) -> broadcast::Receiver<TransitionEvent> {
        self.transitions.subscribe()
    }

    pub fn subscribe_snapshots(&self) -> broadcast::Receiver<StatusSnapshot> {
        self.snapshots.subscribe()
    }

    // =============================================================================
    // Internals
    // =============================================================================

    fn check_policy(&self) -> Result<(), LaunchError> {
        match (&self.active, self.config.launch_policy) {
            (Some(active), LaunchPolicy::RejectWhileActive) => {
                Err(LaunchError::Busy(active.handle.job_id))
            }
            _ => Ok(()),
        }
    }

    fn track(&mut self, handle: JobHandle) {
        let job_id = handle.job_id;

        if let Some(previous) = self.active.take() {
            previous.channel.close();
            tracing::info!(
                retired = %previous.handle.job_id,
                replacement = %job_id,
                "Stopped tracking previous job"
            );
            self.bridge.retired(&previous.handle, &handle);
        }

        let tx = self.delivery_tx.clone();
        let channel = StatusChannel::open_with(
            job_id,
            Arc::clone(&self.backend),
            self.config.channel_config(),
            move |snapshot: StatusSnapshot| {
                let _ = tx.send((job_id, snapshot));
            },
        );

        self.active = Some(ActiveJob {
            handle,
            machine: JobStateMachine::new(job_id),
            channel,
        });
        self.phase.send_replace(ControllerState::Tracking);
    }
}

/// Marks a launch in flight; restores the previous phase even if the
/// launch is dropped
struct LaunchGuard<'a> {
    phase: &'a watch::Sender<ControllerState>,
    previous: ControllerState,
}

impl<'a> LaunchGuard<'a> {
    fn new(phase: &'a watch::Sender<ControllerState>) -> Self {
        let previous = phase.send_replace(ControllerState::Launching);
        Self { phase, previous }
    }
}

impl Drop for LaunchGuard<'_> {
    fn drop(&mut self) {
        self.phase.send_replace(self.previous);
    }
}
