//! Hybrid push/poll status channel
//!
//! A [`StatusChannel`] keeps one job's status flowing into a single sink.
//! It subscribes to the backend's push feed and, while the feed is silent
//! for longer than the poll interval, pulls the status endpoint instead.
//! Both producers deliver into the same sink from one task, in arrival order.
//!
//! When the push feed errors or closes the channel waits `reconnect_delay`
//! and subscribes again for the same job, indefinitely. Polling continues
//! meanwhile. The task ends after it delivers a terminal snapshot or when
//! the channel is closed.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use futures::FutureExt;
use futures::StreamExt;
use futures::future::BoxFuture;
use tally_client::{ParsingBackend, SnapshotStream};
use tally_core::domain::job::{ConnectionState, JobId, StatusSnapshot};
use tokio::sync::watch;
use tokio::time::{Instant, Interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::config::ChannelConfig;

/// Receiver of the snapshots of one channel
pub trait SnapshotSink: Send + Sync {
    fn deliver(&self, snapshot: StatusSnapshot);
}

impl<F> SnapshotSink for F
where
    F: Fn(StatusSnapshot) + Send + Sync,
{
    fn deliver(&self, snapshot: StatusSnapshot) {
        self(snapshot)
    }
}

type SinkSlot = Arc<Mutex<Option<Arc<dyn SnapshotSink>>>>;

pub struct StatusChannel {
    job_id: JobId,
    sink: SinkSlot,
    cancel: CancellationToken,
    state: watch::Receiver<ConnectionState>,
}

impl StatusChannel {
    /// Open a channel for `job_id` with no sink registered yet
    ///
    /// Must be called from within a tokio runtime.
    pub fn open(job_id: JobId, backend: Arc<dyn ParsingBackend>, config: ChannelConfig) -> Self {
        Self::spawn(job_id, backend, config, None)
    }

    /// Open a channel with `sink` registered before the first delivery
    pub fn open_with(
        job_id: JobId,
        backend: Arc<dyn ParsingBackend>,
        config: ChannelConfig,
        sink: impl SnapshotSink + 'static,
    ) -> Self {
        Self::spawn(job_id, backend, config, Some(Arc::new(sink)))
    }

    fn spawn(
        job_id: JobId,
        backend: Arc<dyn ParsingBackend>,
        config: ChannelConfig,
        sink: Option<Arc<dyn SnapshotSink>>,
    ) -> Self {
        let sink: SinkSlot = Arc::new(Mutex::new(sink));
        let cancel = CancellationToken::new();
        let (state_tx, state_rx) = watch::channel(ConnectionState::Connecting);

        let task = ChannelTask {
            job_id,
            backend,
            config,
            sink: Arc::clone(&sink),
            cancel: cancel.clone(),
            state: state_tx,
        };
        tokio::spawn(task.run());

        tracing::debug!(job_id = %job_id, "Opened status channel");

        Self {
            job_id,
            sink,
            cancel,
            state: state_rx,
        }
    }

    /// Register the sink, replacing any previous one
    pub fn on_snapshot(&self, sink: impl SnapshotSink + 'static) {
        let mut slot = self.sink.lock().unwrap_or_else(PoisonError::into_inner);
        *slot = Some(Arc::new(sink));
    }

    /// Stop both transports. Calling it again has no effect.
    pub fn close(&self) {
        if !self.cancel.is_cancelled() {
            tracing::debug!(job_id = %self.job_id, "Closing status channel");
            self.cancel.cancel();
        }
    }

    pub fn job_id(&self) -> JobId {
        self.job_id
    }

    pub fn connection_state(&self) -> ConnectionState {
        *self.state.borrow()
    }

    /// Whether the channel was closed or has finished after a terminal status
    pub fn is_closed(&self) -> bool {
        self.cancel.is_cancelled() || self.connection_state() == ConnectionState::Closed
    }
}

impl Drop for StatusChannel {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

impl std::fmt::Debug for StatusChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StatusChannel")
            .field("job_id", &self.job_id)
            .field("state", &self.connection_state())
            .field("closed", &self.cancel.is_cancelled())
            .finish()
    }
}

// =============================================================================
// Channel task
// =============================================================================

struct ChannelTask {
    job_id: JobId,
    backend: Arc<dyn ParsingBackend>,
    config: ChannelConfig,
    sink: SinkSlot,
    cancel: CancellationToken,
    state: watch::Sender<ConnectionState>,
}

type Connecting = BoxFuture<'static, tally_client::Result<SnapshotStream>>;

impl ChannelTask {
    async fn run(self) {
        let job_id = self.job_id;
        let mut feed: Option<SnapshotStream> = None;
        let mut connecting: Option<Connecting> = Some(self.connect());
        let mut reconnect_at: Option<Instant> = None;
        let mut attempt: u32 = 1;
        let mut last_push = Instant::now();
        let mut poll = self.config.poll_interval.map(poll_timer);

        loop {
            tokio::select! {
                biased;

                _ = self.cancel.cancelled() => break,

                pushed = next_pushed(&mut feed) => match pushed {
                    Some(Ok(snapshot)) => {
                        last_push = Instant::now();
                        tracing::debug!(job_id = %job_id, status = %snapshot.status, "Pushed snapshot");
                        if self.deliver(snapshot) {
                            break;
                        }
                    }
                    Some(Err(e)) => {
                        tracing::warn!(job_id = %job_id, error = %e, "Status feed failed");
                        feed = None;
                        reconnect_at = Some(self.schedule_reconnect());
                    }
                    None => {
                        tracing::info!(job_id = %job_id, "Status feed closed");
                        feed = None;
                        reconnect_at = Some(self.schedule_reconnect());
                    }
                },

                result = resolve(&mut connecting) => {
                    connecting = None;
                    match result {
                        Ok(stream) => {
                            tracing::info!(job_id = %job_id, attempt, "Subscribed to status feed");
                            feed = Some(stream);
                            attempt = 1;
                            self.state.send_replace(ConnectionState::Open);
                        }
                        Err(e) => {
                            tracing::warn!(
                                job_id = %job_id,
                                error = %e,
                                "Subscribe attempt {attempt} failed",
                            );
                            reconnect_at = Some(self.schedule_reconnect());
                        }
                    }
                }

                _ = wait_until(reconnect_at) => {
                    reconnect_at = None;
                    attempt += 1;
                    tracing::info!(job_id = %job_id, attempt, "Re-subscribing to status feed");
                    connecting = Some(self.connect());
                }

                _ = tick(&mut poll) => {
                    let due = self
                        .config
                        .poll_interval
                        .is_some_and(|period| last_push.elapsed() >= period);
                    if due && self.poll_once().await {
                        break;
                    }
                }
            }
        }

        self.state.send_replace(ConnectionState::Closed);
        tracing::debug!(job_id = %job_id, "Status channel stopped");
    }

    /// Pull the status once; returns whether the channel should stop
    async fn poll_once(&self) -> bool {
        let pulled = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => return true,
            result = self.backend.status(self.job_id) => result,
        };

        match pulled {
            Ok(snapshot) => {
                tracing::debug!(job_id = %self.job_id, status = %snapshot.status, "Polled snapshot");
                self.deliver(snapshot)
            }
            Err(e) => {
                tracing::debug!(job_id = %self.job_id, error = %e, "Status poll failed");
                false
            }
        }
    }

    fn connect(&self) -> Connecting {
        let backend = Arc::clone(&self.backend);
        let job_id = self.job_id;
        async move { backend.subscribe(job_id).await }.boxed()
    }

    fn schedule_reconnect(&self) -> Instant {
        self.state.send_replace(ConnectionState::Reconnecting);
        Instant::now() + self.config.reconnect_delay
    }

    /// Hand a snapshot to the sink; returns whether it was terminal
    fn deliver(&self, snapshot: StatusSnapshot) -> bool {
        let terminal = snapshot.status.is_terminal();
        let sink = self
            .sink
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();

        match sink {
            Some(sink) => sink.deliver(snapshot),
            None => tracing::trace!(job_id = %self.job_id, "No sink registered, dropping snapshot"),
        }

        terminal
    }
}

fn poll_timer(period: Duration) -> Interval {
    let mut timer = tokio::time::interval_at(Instant::now() + period, period);
    timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
    timer
}

async fn next_pushed(
    feed: &mut Option<SnapshotStream>,
) -> Option<tally_client::Result<StatusSnapshot>> {
    match feed {
        Some(stream) => stream.next().await,
        None => std::future::pending().await,
    }
}

async fn resolve(connecting: &mut Option<Connecting>) -> tally_client::Result<SnapshotStream> {
    match connecting {
        Some(future) => future.await,
        None => std::future::pending().await,
    }
}

async fn wait_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

async fn tick(poll: &mut Option<Interval>) {
    match poll {
        Some(timer) => {
            timer.tick().await;
        }
        None => std::future::pending::<()>().await,
    }
}
