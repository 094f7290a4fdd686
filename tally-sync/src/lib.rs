//! Tally job synchronization
//!
//! Launches parsing jobs on the backend and keeps one coherent view of the
//! tracked job's status:
//!
//! - [`JobController`]: single current job, launch/attach/cancel
//! - [`StatusChannel`]: push subscription with poll fallback and reconnect
//! - [`JobStateMachine`]: folds snapshots, terminal statuses are absorbing
//! - [`NotificationBridge`]: outbound notices for the UI layer

pub mod bridge;
pub mod channel;
pub mod config;
pub mod controller;
pub mod error;
pub mod machine;

pub use bridge::{NoopBridge, NotificationBridge};
pub use channel::{SnapshotSink, StatusChannel};
pub use config::{ChannelConfig, LaunchPolicy, SyncConfig};
pub use controller::{ControllerState, JobController, JobUpdate};
pub use error::{CancelError, LaunchError};
pub use machine::{JobStateMachine, TransitionEvent};
