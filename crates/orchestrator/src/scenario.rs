//! Ingestion scenario -- submit, poll, fetch, verify.
//!
//! ```text
//! submit ──> poll ──> fetch_record ──┬─ Found + COMPLETED ──> assert_artifact
//!                                    └─ otherwise ──────────> (skipped)
//! ```
//!
//! Timeouts and artifact mismatches end the scenario with an error. Every
//! other outcome, ERROR and UNDEFINED included, is reported.
//!
//! With an outage, only submit and poll run while the service is down; the
//! record is fetched and verified after it is back.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

use ingestprobe_core::config::ProbeConfig;
use ingestprobe_core::error::IngestError;
use ingestprobe_core::pipeline::{ArtifactReader, MessagePublisher, QueryExecutor, ServiceControl};
use ingestprobe_core::types::{EncryptedFileRef, FileStatus, RecordLookup};

use crate::poller::{PollOutcome, PollerConfig, StatusPoller};
use crate::trigger::{IngestionTrigger, RoutingCredentials};
use crate::verifier::{ResultVerifier, VerifierConfig};

/// What one scenario run observed.
#[derive(Debug, Clone, Serialize)]
pub struct ScenarioReport {
    pub session: Uuid,
    pub file: String,
    pub status: FileStatus,
    pub attempts: u32,
    pub elapsed_ms: u64,
    pub record: RecordLookup,
    /// `None` when verification was not applicable
    pub artifact_verified: Option<bool>,
}

impl ScenarioReport {
    /// Ingested, recorded and stored as expected.
    pub fn succeeded(&self) -> bool {
        self.status == FileStatus::Completed && self.artifact_verified == Some(true)
    }
}

pub struct IngestionScenario<P, Q, A>
where
    P: MessagePublisher,
    Q: QueryExecutor,
    A: ArtifactReader,
{
    trigger: IngestionTrigger<P>,
    poller: StatusPoller<Q>,
    verifier: ResultVerifier<Q, A>,
    routing: RoutingCredentials,
    max_timeout: Duration,
}

impl<P, Q, A> IngestionScenario<P, Q, A>
where
    P: MessagePublisher,
    Q: QueryExecutor,
    A: ArtifactReader,
{
    pub fn new(
        trigger: IngestionTrigger<P>,
        poller: StatusPoller<Q>,
        verifier: ResultVerifier<Q, A>,
        routing: RoutingCredentials,
        max_timeout: Duration,
    ) -> Self {
        Self {
            trigger,
            poller,
            verifier,
            routing,
            max_timeout,
        }
    }

    /// Wires every component from one configuration.
    pub fn from_config(
        config: &ProbeConfig,
        publisher: Arc<P>,
        query: Arc<Q>,
        artifacts: Arc<A>,
    ) -> Self {
        Self::new(
            IngestionTrigger::new(publisher),
            StatusPoller::new(Arc::clone(&query), PollerConfig::from_core(config)),
            ResultVerifier::new(query, artifacts, VerifierConfig::from_core(config)),
            RoutingCredentials::from_config(config),
            Duration::from_millis(config.poll.max_timeout_ms),
        )
    }

    pub fn poller(&self) -> &StatusPoller<Q> {
        &self.poller
    }

    pub fn verifier(&self) -> &ResultVerifier<Q, A> {
        &self.verifier
    }

    pub fn with_max_timeout(mut self, max_timeout: Duration) -> Self {
        self.max_timeout = max_timeout;
        self
    }

    pub async fn run(
        &self,
        file_ref: &EncryptedFileRef,
        owner: &str,
    ) -> Result<ScenarioReport, IngestError> {
        let outcome = self.trigger_and_poll(file_ref, owner).await?;
        self.inspect_result(file_ref, outcome).await
    }

    /// Submits `file_ref` and polls it to a terminal status.
    pub async fn trigger_and_poll(
        &self,
        file_ref: &EncryptedFileRef,
        owner: &str,
    ) -> Result<PollOutcome, IngestError> {
        self.trigger.submit(file_ref, owner, &self.routing).await?;
        self.poller.poll_detailed(file_ref, self.max_timeout).await
    }

    /// Fetches the final record and, for a completed file, checks its artifact.
    pub async fn inspect_result(
        &self,
        file_ref: &EncryptedFileRef,
        outcome: PollOutcome,
    ) -> Result<ScenarioReport, IngestError> {
        let record = self.verifier.fetch_record(file_ref).await?;

        let artifact_verified = match (&record, outcome.status) {
            (RecordLookup::Found(found), FileStatus::Completed) => {
                self.verifier.assert_artifact(found).await?;
                Some(true)
            }
            _ => None,
        };

        let report = ScenarioReport {
            session: outcome.session,
            file: file_ref.filename.clone(),
            status: outcome.status,
            attempts: outcome.attempts,
            elapsed_ms: outcome.elapsed_ms,
            record,
            artifact_verified,
        };
        info!(
            session = %report.session,
            file = report.file.as_str(),
            status = report.status.as_str(),
            record = report.record.status_label().as_str(),
            "scenario finished"
        );
        Ok(report)
    }

    /// Submits and polls with `service` suspended, then resumes it before the
    /// record is fetched and verified.
    ///
    /// The service is resumed even when polling fails; a resume failure is
    /// reported only if polling itself succeeded.
    pub async fn run_with_outage<S: ServiceControl>(
        &self,
        control: &S,
        service: &str,
        file_ref: &EncryptedFileRef,
        owner: &str,
    ) -> Result<ScenarioReport, IngestError> {
        control.suspend(service).await?;
        info!(service, "service suspended for scenario");

        let polled = self.trigger_and_poll(file_ref, owner).await;

        let resumed = control.resume(service).await;
        if let Err(e) = &resumed {
            warn!(service, error = %e, "failed to resume service after scenario");
        }

        let outcome = polled?;
        resumed?;
        info!(service, status = outcome.status.as_str(), "service resumed");
        self.inspect_result(file_ref, outcome).await
    }
}
