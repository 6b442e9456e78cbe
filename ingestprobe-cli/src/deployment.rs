//! Container-backed adapters for one configured deployment.

use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

use ingestprobe_core::config::ProbeConfig;
use ingestprobe_core::error::IngestError;
use ingestprobe_docker::{
    BollardDockerClient, ContainerArtifactReader, ContainerPublisher, ContainerServiceControl,
    DockerClient, PsqlQueryExecutor,
};
use ingestprobe_orchestrator::{
    IngestionScenario, PollerConfig, ResultVerifier, StatusPoller, VerifierConfig,
};

pub type Scenario<D> =
    IngestionScenario<ContainerPublisher<D>, PsqlQueryExecutor<D>, ContainerArtifactReader<D>>;

/// Adapters sharing one Docker connection.
pub struct Deployment<D: DockerClient> {
    docker: Arc<D>,
    config: ProbeConfig,
}

impl Deployment<BollardDockerClient> {
    /// Connects to the Docker daemon named in `[docker]` and checks it answers.
    pub async fn connect(config: ProbeConfig) -> Result<Self, IngestError> {
        let client = BollardDockerClient::connect(&config.docker.socket)?
            .with_exec_timeout(Duration::from_secs(config.docker.exec_timeout_secs));
        client.ping().await?;
        debug!(socket = config.docker.socket.as_str(), "docker daemon reachable");
        Ok(Self::new(Arc::new(client), config))
    }
}

impl<D: DockerClient> Deployment<D> {
    pub fn new(docker: Arc<D>, config: ProbeConfig) -> Self {
        Self { docker, config }
    }

    pub fn config(&self) -> &ProbeConfig {
        &self.config
    }

    pub fn query(&self) -> Arc<PsqlQueryExecutor<D>> {
        Arc::new(PsqlQueryExecutor::from_config(
            Arc::clone(&self.docker),
            &self.config,
        ))
    }

    pub fn vault(&self) -> Arc<ContainerArtifactReader<D>> {
        Arc::new(ContainerArtifactReader::from_config(
            Arc::clone(&self.docker),
            &self.config,
        ))
    }

    pub fn publisher(&self) -> Arc<ContainerPublisher<D>> {
        Arc::new(ContainerPublisher::new(
            Arc::clone(&self.docker),
            &self.config.services.label_key,
            &self.config.services.publisher,
        ))
    }

    pub fn control(&self) -> ContainerServiceControl<D> {
        ContainerServiceControl::new(Arc::clone(&self.docker), &self.config.services.label_key)
    }

    pub fn poller(&self) -> StatusPoller<PsqlQueryExecutor<D>> {
        StatusPoller::new(self.query(), PollerConfig::from_core(&self.config))
    }

    pub fn verifier(&self) -> ResultVerifier<PsqlQueryExecutor<D>, ContainerArtifactReader<D>> {
        ResultVerifier::new(
            self.query(),
            self.vault(),
            VerifierConfig::from_core(&self.config),
        )
    }

    pub fn scenario(&self) -> Scenario<D> {
        IngestionScenario::from_config(&self.config, self.publisher(), self.query(), self.vault())
    }
}
