//! psql-over-exec [`QueryExecutor`]
//!
//! Runs `psql -U <user> -d <db> -c <sql>` inside the database container and
//! parses the aligned output with [`crate::tabular`]. A stopped container,
//! an exec failure or a non-zero psql exit is a connectivity failure, except
//! when the server answered with an `ERROR:` line: that is a rejected query.

use std::sync::Arc;

use tracing::debug;

use ingestprobe_core::config::ProbeConfig;
use ingestprobe_core::error::IngestError;
use ingestprobe_core::pipeline::QueryExecutor;
use ingestprobe_core::types::QueryResult;

use crate::controller::resolve_container;
use crate::docker::DockerClient;
use crate::error::DockerRuntimeError;
use crate::tabular;

pub struct PsqlQueryExecutor<D: DockerClient> {
    docker: Arc<D>,
    label_key: String,
    db_label: String,
    user: String,
    database: String,
}

impl<D: DockerClient> PsqlQueryExecutor<D> {
    pub fn new(
        docker: Arc<D>,
        label_key: impl Into<String>,
        db_label: impl Into<String>,
        user: impl Into<String>,
        database: impl Into<String>,
    ) -> Self {
        Self {
            docker,
            label_key: label_key.into(),
            db_label: db_label.into(),
            user: user.into(),
            database: database.into(),
        }
    }

    pub fn from_config(docker: Arc<D>, config: &ProbeConfig) -> Self {
        Self::new(
            docker,
            &config.services.label_key,
            &config.services.db,
            &config.database.user,
            &config.database.name,
        )
    }

    fn command(&self, sql: &str) -> Vec<String> {
        vec![
            "psql".to_owned(),
            "-U".to_owned(),
            self.user.clone(),
            "-d".to_owned(),
            self.database.clone(),
            "-c".to_owned(),
            sql.to_owned(),
        ]
    }
}

impl<D: DockerClient> QueryExecutor for PsqlQueryExecutor<D> {
    async fn query(&self, sql: &str) -> Result<QueryResult, IngestError> {
        let into_ingest = |e: DockerRuntimeError| match e {
            DockerRuntimeError::ExecFailed { stderr, .. } if is_server_error(&stderr) => {
                IngestError::Query(stderr.trim().to_owned())
            }
            other => other.into_ingest(&self.db_label),
        };

        let container = resolve_container(self.docker.as_ref(), &self.label_key, &self.db_label)
            .await
            .map_err(into_ingest)?;

        let output = self
            .docker
            .exec(&container.id, &self.command(sql))
            .await
            .and_then(|out| out.into_success(&container.id))
            .map_err(into_ingest)?;

        let result = tabular::parse(&output.stdout_text());
        debug!(sql, rows = result.row_count(), "query executed");
        Ok(result)
    }
}

/// psql prints server-side errors as `ERROR:  <message>`; client and
/// connection problems use `psql: error:` instead.
fn is_server_error(stderr: &str) -> bool {
    stderr.lines().any(|line| line.trim_start().starts_with("ERROR:"))
}
