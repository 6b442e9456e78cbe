//! Container runtime error types
//!
//! [`DockerRuntimeError`] covers every failure of the bollard-backed
//! adapters. [`DockerRuntimeError::into_ingest`] folds it into the shared
//! taxonomy, naming the service that was being reached.

use ingestprobe_core::error::{ConnectivityError, IngestError, ServiceError};

/// Container runtime domain error
#[derive(Debug, thiserror::Error)]
pub enum DockerRuntimeError {
    /// Docker API call failed
    #[error("docker api error: {0}")]
    DockerApi(String),

    /// Docker socket unreachable
    #[error("docker connection error: {0}")]
    DockerConnection(String),

    /// No container with this id or label
    #[error("container not found: {0}")]
    ContainerNotFound(String),

    /// Container exists but is not running (HTTP 409)
    #[error("container '{0}' is not running")]
    NotRunning(String),

    /// Stop or start was refused
    #[error("action failed for container '{container_id}': {reason}")]
    ActionFailed {
        container_id: String,
        reason: String,
    },

    /// Command inside the container exited non-zero
    #[error("exec in '{container_id}' exited with {exit_code}: {stderr}")]
    ExecFailed {
        container_id: String,
        exit_code: i64,
        stderr: String,
    },

    /// Command inside the container did not finish in time
    #[error("exec in '{container_id}' timed out after {timeout_secs}s")]
    ExecTimeout {
        container_id: String,
        timeout_secs: u64,
    },
}

impl DockerRuntimeError {
    /// Failures that mean "the target cannot be reached right now".
    pub fn is_connectivity(&self) -> bool {
        matches!(
            self,
            Self::DockerApi(_)
                | Self::DockerConnection(_)
                | Self::NotRunning(_)
                | Self::ExecFailed { .. }
                | Self::ExecTimeout { .. }
        )
    }

    /// Converts into the shared taxonomy, attributing the failure to `service`.
    pub fn into_ingest(self, service: &str) -> IngestError {
        match self {
            Self::ContainerNotFound(_) => ServiceError::NotFound(service.to_owned()).into(),
            Self::ActionFailed { reason, .. } => ServiceError::ControlFailed {
                label: service.to_owned(),
                reason,
            }
            .into(),
            other => ConnectivityError::new(service, other.to_string()).into(),
        }
    }
}

impl From<DockerRuntimeError> for IngestError {
    fn from(err: DockerRuntimeError) -> Self {
        err.into_ingest("docker")
    }
}
