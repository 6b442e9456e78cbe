//! CLI-specific error types and exit code mapping

use ingestprobe_core::error::IngestError;

/// CLI-specific error type.
///
/// `exit_code()` maps each failure class to a distinct process exit code.
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    /// Configuration loading or validation failure.
    #[error("configuration error: {0}")]
    Config(String),

    /// The scenario ran but did not end the way it was expected to.
    #[error("{0}")]
    Command(String),

    /// JSON serialisation failed during output rendering.
    #[error("json output error: {0}")]
    JsonSerialize(#[from] serde_json::Error),

    /// IO error (stdout write, local file read, ...).
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Wrapped domain error.
    #[error("{0}")]
    Ingest(#[from] IngestError),
}

impl CliError {
    /// Map the error to a process exit code.
    ///
    /// | Code | Meaning                                  |
    /// |------|------------------------------------------|
    /// | 0    | Success                                  |
    /// | 1    | General / unexpected outcome             |
    /// | 2    | Configuration error                      |
    /// | 3    | Poll timed out                           |
    /// | 4    | Stored artifact mismatch                 |
    /// | 5    | Connectivity or service control failure  |
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::Config(_) => 2,
            Self::Ingest(e) => match e {
                IngestError::Config(_) => 2,
                IngestError::Timeout(_) => 3,
                IngestError::ArtifactMismatch(_) => 4,
                IngestError::Connectivity(_) | IngestError::Service(_) => 5,
                IngestError::Query(_) | IngestError::Publish(_) | IngestError::Io(_) => 1,
            },
            Self::Command(_) | Self::JsonSerialize(_) | Self::Io(_) => 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ingestprobe_core::error::{
        ArtifactMismatch, ConfigError, ConnectivityError, ServiceError, TimeoutError,
    };
    use ingestprobe_core::types::FileStatus;

    #[test]
    fn exit_codes_per_failure_class() {
        let cases: Vec<(CliError, u8)> = vec![
            (CliError::Config("bad".to_owned()), 2),
            (
                IngestError::from(ConfigError::ParseFailed {
                    reason: "x".to_owned(),
                })
                .into(),
                2,
            ),
            (
                IngestError::from(TimeoutError {
                    bound_ms: 2000,
                    elapsed_ms: 2000,
                    last_status: FileStatus::InProgress,
                })
                .into(),
                3,
            ),
            (
                IngestError::from(ArtifactMismatch {
                    reference: "/v/1".to_owned(),
                    offset: 0,
                    expected: "a".to_owned(),
                    actual: "b".to_owned(),
                })
                .into(),
                4,
            ),
            (IngestError::from(ConnectivityError::new("db", "down")).into(), 5),
            (IngestError::from(ServiceError::NotFound("keys".to_owned())).into(), 5),
            (IngestError::Publish("refused".to_owned()).into(), 1),
            (IngestError::Query("relation does not exist".to_owned()).into(), 1),
            (CliError::Command("ended with ERROR".to_owned()), 1),
        ];
        for (err, code) in cases {
            assert_eq!(err.exit_code(), code, "{err}");
        }
    }

    #[test]
    fn timeout_message_keeps_bound() {
        let err: CliError = IngestError::from(TimeoutError {
            bound_ms: 2000,
            elapsed_ms: 2000,
            last_status: FileStatus::InProgress,
        })
        .into();
        assert!(err.to_string().contains("max_timeout_ms = 2000"));
    }
}
