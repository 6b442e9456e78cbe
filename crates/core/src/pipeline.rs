//! Capability traits -- the seams between the orchestrator and the
//! deployment it drives.
//!
//! Runtime adapters implement these over containers; tests implement them
//! with scripted fakes.

use std::future::Future;

use bytes::Bytes;

use crate::error::IngestError;
use crate::types::{BrokerCredentials, IngestionRequest, QueryResult, ServiceHandle};

/// Runs read queries against the pipeline's persisted state.
///
/// A well-formed empty result is `Ok` with no rows. An unreachable store is
/// `Err(IngestError::Connectivity)`.
pub trait QueryExecutor: Send + Sync + 'static {
    fn query(&self, sql: &str) -> impl Future<Output = Result<QueryResult, IngestError>> + Send;
}

/// Byte-level reads from the storage backend.
pub trait ArtifactReader: Send + Sync + 'static {
    /// Reads at most `len` leading bytes of `reference`.
    fn read_prefix(
        &self,
        reference: &str,
        len: usize,
    ) -> impl Future<Output = Result<Bytes, IngestError>> + Send;
}

/// Suspends and resumes dependent services by logical label.
///
/// Calls return once the runtime accepts the request; they do not wait for
/// the service to become healthy, and repeated calls are not guaranteed to
/// be no-ops.
pub trait ServiceControl: Send + Sync + 'static {
    fn suspend(&self, label: &str) -> impl Future<Output = Result<(), IngestError>> + Send;

    fn resume(&self, label: &str) -> impl Future<Output = Result<(), IngestError>> + Send;

    /// Resolves the label to its current handle without changing it.
    fn inspect(
        &self,
        label: &str,
    ) -> impl Future<Output = Result<ServiceHandle, IngestError>> + Send;
}

/// Hands ingestion requests to the broker. Fire-and-forget.
pub trait MessagePublisher: Send + Sync + 'static {
    fn publish(
        &self,
        endpoint: &BrokerCredentials,
        request: &IngestionRequest,
    ) -> impl Future<Output = Result<(), IngestError>> + Send;
}
