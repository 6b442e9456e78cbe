//! Status poller -- bounded polling state machine over the status store.
//!
//! ```text
//! UNKNOWN --(row appears)--> IN_PROGRESS --(COMPLETED code)--> COMPLETED
//!    |                           |        --(ERROR code)-----> ERROR
//!    | zero rows: retry          |        --(unknown code)---> UNDEFINED
//!    v                           |        --(row vanished)---> UNDEFINED
//!  (stays UNKNOWN)               +--(store unreachable)------> ERROR *
//!
//! any non-terminal state --(elapsed >= bound)--> Err(Timeout)
//! ```
//!
//! `*` under [`ConnectivityPolicy::FailAsError`]. With
//! [`ConnectivityPolicy::Retry`] that many consecutive failures are
//! tolerated at the poll cadence first.
//!
//! Terminal states are absorbing: the loop stops querying as soon as one is
//! observed, waits the grace delay once and returns it.

use std::sync::Arc;
use std::time::Duration;

use metrics::{counter, histogram};
use serde::Serialize;
use tokio::time::Instant;
use tracing::{Instrument, debug, info, info_span, warn};
use uuid::Uuid;

use ingestprobe_core::config::{OnConnectivityFailure, ProbeConfig};
use ingestprobe_core::error::{IngestError, TimeoutError};
use ingestprobe_core::metrics as m;
use ingestprobe_core::pipeline::QueryExecutor;
use ingestprobe_core::types::{EncryptedFileRef, FileStatus, QueryResult};

use crate::sql;

/// What a connectivity failure during polling means.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ConnectivityPolicy {
    /// "Cannot observe" is reported as `ERROR` on the first failure.
    #[default]
    FailAsError,
    /// Up to `attempts` consecutive failures are retried at the poll cadence.
    Retry { attempts: u32 },
}

/// Poller settings.
#[derive(Debug, Clone)]
pub struct PollerConfig {
    pub interval: Duration,
    /// Delay after a terminal status, before returning it
    pub grace: Duration,
    pub connectivity: ConnectivityPolicy,
    pub table: String,
    pub lookup_column: String,
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self::from_core(&ProbeConfig::default())
    }
}

impl PollerConfig {
    pub fn from_core(config: &ProbeConfig) -> Self {
        let connectivity = match config.poll.on_connectivity_failure {
            OnConnectivityFailure::Error => ConnectivityPolicy::FailAsError,
            OnConnectivityFailure::Retry => ConnectivityPolicy::Retry {
                attempts: config.poll.connectivity_retries,
            },
        };
        Self {
            interval: Duration::from_millis(config.poll.interval_ms),
            grace: Duration::from_millis(config.poll.grace_ms),
            connectivity,
            table: config.database.table.clone(),
            lookup_column: config.database.lookup_column.clone(),
        }
    }
}

/// Result of one poll session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PollOutcome {
    pub session: Uuid,
    pub status: FileStatus,
    /// Status queries issued, failed ones included
    pub attempts: u32,
    /// Time from the first query until the terminal status was observed,
    /// grace delay excluded
    pub elapsed_ms: u64,
}

/// Next status given the current one and a query result.
///
/// Zero rows keep `Unknown` (not yet visible) but turn a file that was
/// already seen into `Undefined`.
pub fn next_status(current: FileStatus, result: &QueryResult) -> FileStatus {
    match result.first_value() {
        Some(code) => FileStatus::decode(code),
        None if current == FileStatus::Unknown => FileStatus::Unknown,
        None => FileStatus::Undefined,
    }
}

pub struct StatusPoller<Q: QueryExecutor> {
    query: Arc<Q>,
    config: PollerConfig,
}

impl<Q: QueryExecutor> StatusPoller<Q> {
    pub fn new(query: Arc<Q>, config: PollerConfig) -> Self {
        Self { query, config }
    }

    pub fn config(&self) -> &PollerConfig {
        &self.config
    }

    /// Polls until `file_ref` reaches a terminal status or `max_timeout` runs out.
    pub async fn poll(
        &self,
        file_ref: &EncryptedFileRef,
        max_timeout: Duration,
    ) -> Result<FileStatus, IngestError> {
        self.poll_detailed(file_ref, max_timeout)
            .await
            .map(|outcome| outcome.status)
    }

    /// Like [`poll`](Self::poll), with attempt count and timing.
    pub async fn poll_detailed(
        &self,
        file_ref: &EncryptedFileRef,
        max_timeout: Duration,
    ) -> Result<PollOutcome, IngestError> {
        let session = Uuid::new_v4();
        let span = info_span!("poll", %session, file = file_ref.filename.as_str());
        self.run(session, file_ref, max_timeout)
            .instrument(span)
            .await
    }

    /// One status query, decoded. Zero rows is `Unknown`.
    pub async fn current_status(&self, file_ref: &EncryptedFileRef) -> Result<FileStatus, IngestError> {
        let result = self.query.query(&self.status_sql(file_ref)).await?;
        Ok(next_status(FileStatus::Unknown, &result))
    }

    fn status_sql(&self, file_ref: &EncryptedFileRef) -> String {
        sql::status_query(
            &self.config.table,
            &self.config.lookup_column,
            &file_ref.filename,
        )
    }

    async fn run(
        &self,
        session: Uuid,
        file_ref: &EncryptedFileRef,
        max_timeout: Duration,
    ) -> Result<PollOutcome, IngestError> {
        let sql = self.status_sql(file_ref);
        let started = Instant::now();
        let mut status = FileStatus::Unknown;
        let mut attempts: u32 = 0;
        let mut consecutive_failures: u32 = 0;

        info!(bound_ms = millis(max_timeout), "polling started");

        loop {
            attempts += 1;
            counter!(m::POLL_QUERIES_TOTAL).increment(1);

            match self.query.query(&sql).await {
                Ok(result) => {
                    consecutive_failures = 0;
                    status = next_status(status, &result);
                }
                Err(e) if e.is_connectivity() => {
                    counter!(m::POLL_CONNECTIVITY_FAILURES_TOTAL).increment(1);
                    consecutive_failures += 1;
                    if self.tolerates(consecutive_failures) {
                        warn!(attempt = attempts, error = %e, "status store unreachable, retrying");
                    } else {
                        warn!(attempt = attempts, error = %e, "status store unreachable, reporting ERROR");
                        status = FileStatus::Error;
                    }
                }
                Err(e) => return Err(e),
            }

            let elapsed = started.elapsed();
            debug!(
                attempt = attempts,
                status = status.as_str(),
                elapsed_ms = millis(elapsed),
                "status observed"
            );

            if status.is_terminal() {
                break;
            }

            if elapsed >= max_timeout {
                counter!(m::POLL_TIMEOUTS_TOTAL).increment(1);
                warn!(
                    attempt = attempts,
                    status = status.as_str(),
                    elapsed_ms = millis(elapsed),
                    "polling timed out"
                );
                return Err(TimeoutError {
                    bound_ms: millis(max_timeout),
                    elapsed_ms: millis(elapsed),
                    last_status: status,
                }
                .into());
            }

            // Wake exactly at the bound so the last query happens at T.
            tokio::time::sleep(self.config.interval.min(max_timeout - elapsed)).await;
        }

        let elapsed = started.elapsed();
        histogram!(m::POLL_DURATION_SECONDS).record(elapsed.as_secs_f64());
        counter!(m::POLL_TERMINAL_TOTAL, m::LABEL_STATUS => status.as_str()).increment(1);
        info!(
            attempt = attempts,
            status = status.as_str(),
            elapsed_ms = millis(elapsed),
            "terminal status reached"
        );

        tokio::time::sleep(self.config.grace).await;

        Ok(PollOutcome {
            session,
            status,
            attempts,
            elapsed_ms: millis(elapsed),
        })
    }

    fn tolerates(&self, consecutive_failures: u32) -> bool {
        match self.config.connectivity {
            ConnectivityPolicy::FailAsError => false,
            ConnectivityPolicy::Retry { attempts } => consecutive_failures <= attempts,
        }
    }
}

fn millis(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}
