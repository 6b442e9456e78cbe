//! Vault [`ArtifactReader`] -- reads leading bytes with `head -c` inside the
//! vault container.

use std::io;
use std::sync::Arc;

use bytes::Bytes;
use tracing::debug;

use ingestprobe_core::config::ProbeConfig;
use ingestprobe_core::error::IngestError;
use ingestprobe_core::pipeline::ArtifactReader;

use crate::controller::resolve_container;
use crate::docker::DockerClient;
use crate::error::DockerRuntimeError;

pub struct ContainerArtifactReader<D: DockerClient> {
    docker: Arc<D>,
    label_key: String,
    vault_label: String,
    vault_root: String,
}

impl<D: DockerClient> ContainerArtifactReader<D> {
    pub fn new(
        docker: Arc<D>,
        label_key: impl Into<String>,
        vault_label: impl Into<String>,
        vault_root: impl Into<String>,
    ) -> Self {
        Self {
            docker,
            label_key: label_key.into(),
            vault_label: vault_label.into(),
            vault_root: vault_root.into(),
        }
    }

    pub fn from_config(docker: Arc<D>, config: &ProbeConfig) -> Self {
        Self::new(
            docker,
            &config.services.label_key,
            &config.services.vault,
            &config.artifact.vault_root,
        )
    }

    /// Absolute references pass through; relative ones are joined to the vault root.
    fn path_of(&self, reference: &str) -> String {
        if reference.starts_with('/') || self.vault_root.is_empty() {
            reference.to_owned()
        } else {
            format!("{}/{}", self.vault_root.trim_end_matches('/'), reference)
        }
    }
}

impl<D: DockerClient> ArtifactReader for ContainerArtifactReader<D> {
    async fn read_prefix(&self, reference: &str, len: usize) -> Result<Bytes, IngestError> {
        let container = resolve_container(self.docker.as_ref(), &self.label_key, &self.vault_label)
            .await
            .map_err(|e| e.into_ingest(&self.vault_label))?;

        let path = self.path_of(reference);
        let cmd = vec!["head".to_owned(), "-c".to_owned(), len.to_string(), path.clone()];

        let output = self
            .docker
            .exec(&container.id, &cmd)
            .await
            .and_then(|out| out.into_success(&container.id))
            .map_err(|e| match e {
                DockerRuntimeError::ExecFailed { ref stderr, .. }
                    if stderr.contains("No such file") =>
                {
                    IngestError::Io(io::Error::new(
                        io::ErrorKind::NotFound,
                        format!("artifact '{path}' not found in vault"),
                    ))
                }
                other => other.into_ingest(&self.vault_label),
            })?;

        let mut bytes = output.stdout;
        bytes.truncate(len);
        debug!(path = path.as_str(), read = bytes.len(), "artifact prefix read");
        Ok(bytes)
    }
}
