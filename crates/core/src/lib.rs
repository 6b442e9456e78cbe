//! ingestprobe core -- types, capability traits, errors and configuration
//! shared by the runtime adapters, the orchestrator and the CLI.

pub mod config;
pub mod error;
pub mod metrics;
pub mod pipeline;
pub mod types;

// errors
pub use error::{
    ArtifactMismatch, ConfigError, ConnectivityError, IngestError, ServiceError, TimeoutError,
};

// config
pub use config::{OnConnectivityFailure, ProbeConfig};

// capability traits
pub use pipeline::{ArtifactReader, MessagePublisher, QueryExecutor, ServiceControl};

// domain types
pub use types::{
    BrokerCredentials, EncryptedFileRef, FileStatus, IngestionRecord, IngestionRequest,
    QueryResult, RecordLookup, ServiceHandle, ServiceState,
};
