//! `ingestprobe ingest` command handler

use std::io::Write;

use serde::Serialize;
use tracing::info;

use ingestprobe_core::types::{EncryptedFileRef, FileStatus};
use ingestprobe_docker::DockerClient;
use ingestprobe_orchestrator::{ScenarioReport, with_checksums};

use crate::cli::IngestArgs;
use crate::deployment::Deployment;
use crate::error::CliError;
use crate::output::{OutputWriter, Render, colored_status};

/// Execute the `ingest` command: submit, poll, verify, then check the outcome
/// against `--expect`.
pub async fn execute<D: DockerClient>(
    args: IngestArgs,
    deployment: &Deployment<D>,
    writer: &OutputWriter,
) -> Result<(), CliError> {
    let mut file_ref = EncryptedFileRef::new(&args.file);
    if let (Some(raw), Some(encrypted)) = (&args.raw, &args.encrypted) {
        file_ref = with_checksums(file_ref, raw, encrypted, args.checksum).await?;
    }

    let scenario = deployment.scenario();
    let report = match &args.outage {
        Some(service) => {
            let label = deployment.config().services.resolve(service);
            info!(service = label, file = args.file.as_str(), "running ingestion with outage");
            scenario
                .run_with_outage(&deployment.control(), label, &file_ref, &args.user)
                .await?
        }
        None => scenario.run(&file_ref, &args.user).await?,
    };

    let report = IngestReport(report);
    writer.render(&report)?;
    check_expectation(&report.0, args.expect.into())
}

/// Fails unless the scenario ended in `expected`; a completed ingestion must
/// also have a verified artifact.
pub fn check_expectation(report: &ScenarioReport, expected: FileStatus) -> Result<(), CliError> {
    if report.status != expected {
        return Err(CliError::Command(format!(
            "ingestion of '{}' ended with {} (expected {})",
            report.file, report.status, expected
        )));
    }
    if expected == FileStatus::Completed && report.artifact_verified != Some(true) {
        return Err(CliError::Command(format!(
            "ingestion of '{}' completed but its record ({}) could not be verified",
            report.file,
            report.record.status_label()
        )));
    }
    Ok(())
}

#[derive(Serialize)]
#[serde(transparent)]
pub struct IngestReport(pub ScenarioReport);

impl Render for IngestReport {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        let r = &self.0;
        writeln!(w, "File:      {}", r.file)?;
        writeln!(w, "Session:   {}", r.session)?;
        writeln!(w, "Status:    {}", colored_status(r.status))?;
        writeln!(w, "Attempts:  {} ({} ms)", r.attempts, r.elapsed_ms)?;
        writeln!(w, "Record:    {}", r.record.status_label())?;
        let artifact = match r.artifact_verified {
            Some(true) => "verified",
            Some(false) => "mismatch",
            None => "not checked",
        };
        writeln!(w, "Artifact:  {artifact}")
    }
}
