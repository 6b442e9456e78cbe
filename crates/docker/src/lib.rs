//! ingestprobe container-runtime adapters
//!
//! # Module Structure
//!
//! - [`error`]: Domain error type (`DockerRuntimeError`)
//! - [`docker`]: Docker API abstraction (`DockerClient` trait, `BollardDockerClient`)
//! - [`controller`]: Label resolution and `ServiceControl` (`ContainerServiceControl`)
//! - [`tabular`]: psql aligned-output parser
//! - [`query`]: `QueryExecutor` over psql (`PsqlQueryExecutor`)
//! - [`storage`]: `ArtifactReader` over the vault container (`ContainerArtifactReader`)
//! - [`publish`]: `MessagePublisher` over the publish tool (`ContainerPublisher`)
//!
//! # Architecture
//!
//! ```text
//! orchestrator --trait--> adapter --resolve label--> container --exec/stop/start--> Docker
//! ```

pub mod controller;
pub mod docker;
pub mod error;
pub mod publish;
pub mod query;
pub mod storage;
pub mod tabular;

pub use controller::{ContainerServiceControl, resolve_container};
pub use docker::{BollardDockerClient, ContainerSummary, DockerClient, ExecOutput};
pub use error::DockerRuntimeError;
pub use publish::{ContainerPublisher, publish_command};
pub use query::PsqlQueryExecutor;
pub use storage::ContainerArtifactReader;
