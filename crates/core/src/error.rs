//! Error types -- the failure taxonomy shared by every ingestprobe crate.
//!
//! Connectivity and malformed-result failures are absorbed into the status
//! model by the poller and verifier. Timeouts and artifact mismatches always
//! reach the caller.

use crate::types::FileStatus;

/// Top-level ingestprobe error.
#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    /// Configuration loading or validation failure
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    /// Status store, storage backend or service-control transport unreachable
    #[error("connectivity error: {0}")]
    Connectivity(#[from] ConnectivityError),

    /// Poll exceeded its configured bound while still non-terminal
    #[error("timeout: {0}")]
    Timeout(#[from] TimeoutError),

    /// Stored artifact does not start with the expected prefix
    #[error("artifact mismatch: {0}")]
    ArtifactMismatch(#[from] ArtifactMismatch),

    /// Service resolution or control failure
    #[error("service error: {0}")]
    Service(#[from] ServiceError),

    /// The status store was reached but rejected the query
    #[error("query rejected: {0}")]
    Query(String),

    /// Ingestion request could not be handed to the broker
    #[error("publish error: {0}")]
    Publish(String),

    /// I/O error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl IngestError {
    /// Returns `true` when the failure means "cannot observe", not "observed a failure".
    pub fn is_connectivity(&self) -> bool {
        matches!(self, Self::Connectivity(_))
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Configuration file does not exist
    #[error("config file not found: {path}")]
    FileNotFound { path: String },

    /// TOML could not be parsed
    #[error("failed to parse config: {reason}")]
    ParseFailed { reason: String },

    /// A value is out of range or otherwise invalid
    #[error("invalid config value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },
}

/// The target of a query, read or control call could not be reached.
#[derive(Debug, thiserror::Error)]
#[error("{target} unreachable: {reason}")]
pub struct ConnectivityError {
    /// What was being contacted (e.g. `db`, `vault`, `docker`)
    pub target: String,
    /// Underlying cause
    pub reason: String,
}

impl ConnectivityError {
    pub fn new(target: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            reason: reason.into(),
        }
    }
}

/// Poll ran out of time.
#[derive(Debug, thiserror::Error)]
#[error(
    "ingestion didn't complete in time: max_timeout_ms = {bound_ms} (elapsed {elapsed_ms} ms, last status {last_status})"
)]
pub struct TimeoutError {
    /// Configured bound
    pub bound_ms: u64,
    /// Time spent polling when the bound was hit
    pub elapsed_ms: u64,
    /// Last non-terminal status observed
    pub last_status: FileStatus,
}

/// Leading bytes of a stored artifact differ from the expected prefix.
#[derive(Debug, thiserror::Error)]
#[error("'{reference}' differs from expected prefix at byte {offset}: expected {expected:?}, got {actual:?}")]
pub struct ArtifactMismatch {
    /// Storage reference that was read
    pub reference: String,
    /// First differing offset (or the artifact length when it is too short)
    pub offset: usize,
    /// Expected prefix, lossily rendered
    pub expected: String,
    /// Bytes actually read, lossily rendered
    pub actual: String,
}

/// Service controller errors
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    /// No service matches the label
    #[error("no service matches label '{0}'")]
    NotFound(String),

    /// The runtime refused or failed the stop/start request
    #[error("control of '{label}' failed: {reason}")]
    ControlFailed { label: String, reason: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timeout_display_carries_bound() {
        let err = IngestError::from(TimeoutError {
            bound_ms: 2000,
            elapsed_ms: 2003,
            last_status: FileStatus::InProgress,
        });
        let msg = err.to_string();
        assert!(msg.contains("max_timeout_ms = 2000"));
        assert!(msg.contains("2003"));
    }

    #[test]
    fn connectivity_display() {
        let err = ConnectivityError::new("db", "container is not running");
        assert_eq!(err.to_string(), "db unreachable: container is not running");
    }

    #[test]
    fn is_connectivity_only_for_connectivity_variant() {
        let err: IngestError = ConnectivityError::new("db", "down").into();
        assert!(err.is_connectivity());

        let err: IngestError = ServiceError::NotFound("db".to_owned()).into();
        assert!(!err.is_connectivity());
    }

    #[test]
    fn artifact_mismatch_display() {
        let err = ArtifactMismatch {
            reference: "/ega/vault/000/000/001".to_owned(),
            offset: 3,
            expected: "abcd".to_owned(),
            actual: "abcX".to_owned(),
        };
        let msg = err.to_string();
        assert!(msg.contains("byte 3"));
        assert!(msg.contains("/ega/vault/000/000/001"));
    }

    #[test]
    fn config_error_converts() {
        let err: IngestError = ConfigError::InvalidValue {
            field: "poll.interval_ms".to_owned(),
            reason: "must be 1-60000".to_owned(),
        }
        .into();
        assert!(matches!(err, IngestError::Config(_)));
        assert!(err.to_string().contains("poll.interval_ms"));
    }
}
