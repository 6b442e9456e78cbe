//! Service controller -- suspends and resumes dependent services by label.
//!
//! A label is resolved to a container on every call; the handle is never
//! cached because the runtime owns it. Resolution order:
//!
//! 1. containers whose `label_key` label equals the label
//! 2. a container whose name equals the label
//! 3. the only container whose name contains the label
//!
//! No retries. Any failure is returned to the caller.

use std::sync::Arc;

use metrics::counter;
use tracing::{info, warn};

use ingestprobe_core::error::IngestError;
use ingestprobe_core::metrics as m;
use ingestprobe_core::pipeline::ServiceControl;
use ingestprobe_core::types::{ServiceHandle, ServiceState};

use crate::docker::{ContainerSummary, DockerClient};
use crate::error::DockerRuntimeError;

/// Resolves `label` to a single container, including stopped ones.
pub async fn resolve_container<D: DockerClient>(
    docker: &D,
    label_key: &str,
    label: &str,
) -> Result<ContainerSummary, DockerRuntimeError> {
    let mut containers = docker.list_containers(true).await?;
    containers.sort_by(|a, b| a.name.cmp(&b.name));

    if let Some(found) = containers
        .iter()
        .find(|c| c.labels.get(label_key).is_some_and(|v| v == label))
    {
        return Ok(found.clone());
    }

    if let Some(found) = containers.iter().find(|c| c.name == label) {
        return Ok(found.clone());
    }

    let mut partial = containers.into_iter().filter(|c| c.name.contains(label));
    match (partial.next(), partial.next()) {
        (Some(only), None) => Ok(only),
        (Some(_), Some(_)) => {
            warn!(label, "label matches several container names, refusing to guess");
            Err(DockerRuntimeError::ContainerNotFound(label.to_owned()))
        }
        _ => Err(DockerRuntimeError::ContainerNotFound(label.to_owned())),
    }
}

fn handle_of(label: &str, container: &ContainerSummary) -> ServiceHandle {
    ServiceHandle {
        label: label.to_owned(),
        id: container.id.clone(),
        name: container.name.clone(),
        state: ServiceState::from_runtime(&container.state),
    }
}

/// [`ServiceControl`] over Docker containers.
pub struct ContainerServiceControl<D: DockerClient> {
    docker: Arc<D>,
    label_key: String,
}

impl<D: DockerClient> ContainerServiceControl<D> {
    pub fn new(docker: Arc<D>, label_key: impl Into<String>) -> Self {
        Self {
            docker,
            label_key: label_key.into(),
        }
    }

    async fn act(&self, label: &str, action: &'static str) -> Result<(), IngestError> {
        let container = resolve_container(self.docker.as_ref(), &self.label_key, label)
            .await
            .map_err(|e| e.into_ingest(label))?;

        info!(
            service = label,
            container = container.name.as_str(),
            action,
            "service control requested"
        );

        let result = match action {
            "suspend" => self.docker.stop_container(&container.id).await,
            _ => self.docker.start_container(&container.id).await,
        };

        let outcome = if result.is_ok() { "success" } else { "failure" };
        counter!(m::SERVICE_ACTIONS_TOTAL, m::LABEL_ACTION => action, m::LABEL_RESULT => outcome)
            .increment(1);

        result.map_err(|e| {
            warn!(service = label, action, error = %e, "service control failed");
            e.into_ingest(label)
        })
    }
}

impl<D: DockerClient> ServiceControl for ContainerServiceControl<D> {
    async fn suspend(&self, label: &str) -> Result<(), IngestError> {
        self.act(label, "suspend").await
    }

    async fn resume(&self, label: &str) -> Result<(), IngestError> {
        self.act(label, "resume").await
    }

    async fn inspect(&self, label: &str) -> Result<ServiceHandle, IngestError> {
        let container = resolve_container(self.docker.as_ref(), &self.label_key, label)
            .await
            .map_err(|e| e.into_ingest(label))?;
        Ok(handle_of(label, &container))
    }
}
