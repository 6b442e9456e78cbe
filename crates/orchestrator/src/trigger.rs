//! Ingestion trigger -- hands one inbox file to the pipeline.
//!
//! Fire-and-forget: `submit` returns once the broker accepted the message.
//! Whether and when the pipeline picks it up is observed by the poller.

use std::path::Path;
use std::sync::Arc;

use metrics::counter;
use tracing::{info, warn};

use ingestprobe_core::config::ProbeConfig;
use ingestprobe_core::error::IngestError;
use ingestprobe_core::metrics as m;
use ingestprobe_core::pipeline::MessagePublisher;
use ingestprobe_core::types::{BrokerCredentials, EncryptedFileRef, IngestionRequest};

use crate::checksum::{ChecksumAlgorithm, file_digest};

/// Where and how to route an ingestion request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoutingCredentials {
    pub endpoint: BrokerCredentials,
    pub routing_key: String,
}

impl RoutingCredentials {
    pub fn from_config(config: &ProbeConfig) -> Self {
        Self {
            endpoint: config.broker_credentials(),
            routing_key: config.routing_key(),
        }
    }
}

pub struct IngestionTrigger<P: MessagePublisher> {
    publisher: Arc<P>,
}

impl<P: MessagePublisher> IngestionTrigger<P> {
    pub fn new(publisher: Arc<P>) -> Self {
        Self { publisher }
    }

    /// Publishes an ingestion request for `file_ref` owned by `owner`.
    ///
    /// Checksums on `file_ref` are forwarded when present.
    pub async fn submit(
        &self,
        file_ref: &EncryptedFileRef,
        owner: &str,
        routing: &RoutingCredentials,
    ) -> Result<(), IngestError> {
        let request = IngestionRequest {
            routing_key: routing.routing_key.clone(),
            user: owner.to_owned(),
            filename: file_ref.filename.clone(),
            raw_checksum: file_ref.raw_checksum.clone(),
            encrypted_checksum: file_ref.encrypted_checksum.clone(),
        };

        let result = self.publisher.publish(&routing.endpoint, &request).await;
        let outcome = if result.is_ok() { "success" } else { "failure" };
        counter!(m::TRIGGER_PUBLISHED_TOTAL, m::LABEL_RESULT => outcome).increment(1);

        match &result {
            Ok(()) => info!(
                file = file_ref.filename.as_str(),
                owner,
                checksummed = request.raw_checksum.is_some(),
                "ingestion triggered"
            ),
            Err(e) => warn!(file = file_ref.filename.as_str(), error = %e, "ingestion trigger failed"),
        }
        result
    }
}

/// Attaches `algorithm` digests of the local raw and encrypted copies to `file_ref`.
pub async fn with_checksums(
    file_ref: EncryptedFileRef,
    raw: impl AsRef<Path>,
    encrypted: impl AsRef<Path>,
    algorithm: ChecksumAlgorithm,
) -> Result<EncryptedFileRef, IngestError> {
    let raw_sum = file_digest(raw, algorithm).await?;
    let enc_sum = file_digest(encrypted, algorithm).await?;
    Ok(file_ref.with_checksums(raw_sum, enc_sum))
}
