//! ingestprobe orchestrator -- drives one ingestion through the pipeline
//! under test and checks what it produced.
//!
//! # Module Structure
//!
//! - [`trigger`]: publishes the ingestion request (`IngestionTrigger`)
//! - [`poller`]: bounded status polling state machine (`StatusPoller`)
//! - [`verifier`]: record lookup and artifact prefix checks (`ResultVerifier`)
//! - [`scenario`]: submit → poll → verify (`IngestionScenario`)
//! - [`checksum`]: MD5 / SHA-256 file digests
//! - [`sql`]: status store query text
//!
//! Every component is generic over the capability traits in
//! `ingestprobe_core::pipeline`, so the same code drives containers in
//! production and scripted fakes in tests.

pub mod checksum;
pub mod poller;
pub mod scenario;
pub mod sql;
pub mod trigger;
pub mod verifier;

pub use checksum::{ChecksumAlgorithm, file_digest};
pub use poller::{ConnectivityPolicy, PollOutcome, PollerConfig, StatusPoller};
pub use scenario::{IngestionScenario, ScenarioReport};
pub use trigger::{IngestionTrigger, RoutingCredentials, with_checksums};
pub use verifier::{ResultVerifier, VerifierConfig};
