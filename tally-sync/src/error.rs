//! Error types for job control

use tally_client::ClientError;
use tally_core::domain::descriptor::DescriptorError;
use tally_core::domain::job::JobId;
use thiserror::Error;

/// Why a launch did not produce a tracked job
#[derive(Debug, Error)]
pub enum LaunchError {
    /// The descriptor does not fit the reference catalog; nothing was sent
    #[error("Invalid launch descriptor: {0}")]
    Invalid(#[from] DescriptorError),

    /// Launch policy forbids starting while this job is tracked
    #[error("Job {0} is still running")]
    Busy(JobId),

    /// The backend refused the request
    #[error("Backend rejected the launch: {0}")]
    Rejected(String),

    /// The backend could not be reached or answered unexpectedly
    #[error("Backend unreachable: {0}")]
    Unreachable(#[source] ClientError),
}

impl From<ClientError> for LaunchError {
    fn from(err: ClientError) -> Self {
        if err.is_client_error() {
            LaunchError::Rejected(err.reason())
        } else {
            LaunchError::Unreachable(err)
        }
    }
}

/// Why a cancel request failed
#[derive(Debug, Error)]
pub enum CancelError {
    #[error("No job is being tracked")]
    NoActiveJob,

    /// The backend refused to stop the job (e.g. it already finished)
    #[error("Backend rejected the cancel request: {0}")]
    Rejected(String),

    #[error("Backend unreachable: {0}")]
    Unreachable(#[source] ClientError),
}

impl CancelError {
    /// Whether the request never got an answer, so sending it again may help
    pub fn is_retryable(&self) -> bool {
        matches!(self, CancelError::Unreachable(_))
    }
}

impl From<ClientError> for CancelError {
    fn from(err: ClientError) -> Self {
        if err.is_client_error() {
            CancelError::Rejected(err.reason())
        } else {
            CancelError::Unreachable(err)
        }
    }
}
