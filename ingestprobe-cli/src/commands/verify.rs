//! `ingestprobe verify` command handler

use std::io::Write;

use serde::Serialize;

use ingestprobe_core::error::IngestError;
use ingestprobe_core::types::{EncryptedFileRef, RecordLookup};
use ingestprobe_docker::DockerClient;

use crate::cli::VerifyArgs;
use crate::deployment::Deployment;
use crate::error::CliError;
use crate::output::{OutputWriter, Render};

/// Execute the `verify` command.
///
/// The expected prefix comes from the configuration; `--prefix` is applied
/// to it before the deployment is built.
pub async fn execute<D: DockerClient>(
    args: VerifyArgs,
    deployment: &Deployment<D>,
    writer: &OutputWriter,
) -> Result<(), CliError> {
    let verifier = deployment.verifier();
    let lookup = verifier
        .fetch_record(&EncryptedFileRef::new(&args.file))
        .await?;
    let RecordLookup::Found(record) = lookup else {
        return Err(CliError::Command(format!(
            "no record for '{}', nothing to verify",
            args.file
        )));
    };

    let reference = verifier.artifact_reference(&record).map(str::to_owned);
    let (verified, mismatch_offset, failure) = match verifier.assert_artifact(&record).await {
        Ok(()) => (true, None, None),
        Err(IngestError::ArtifactMismatch(m)) => (false, Some(m.offset), Some(m)),
        Err(other) => return Err(other.into()),
    };

    writer.render(&VerifyReport {
        file: args.file,
        reference,
        verified,
        mismatch_offset,
    })?;

    match failure {
        Some(mismatch) => Err(IngestError::from(mismatch).into()),
        None => Ok(()),
    }
}

#[derive(Debug, Serialize)]
pub struct VerifyReport {
    pub file: String,
    pub reference: Option<String>,
    pub verified: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mismatch_offset: Option<usize>,
}

impl Render for VerifyReport {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        use colored::Colorize;

        let reference = self.reference.as_deref().unwrap_or("(none)");
        match (self.verified, self.mismatch_offset) {
            (true, _) => writeln!(w, "{} {} ({})", "OK".green().bold(), self.file, reference),
            (false, Some(offset)) => writeln!(
                w,
                "{} {} ({}): differs at byte {}",
                "MISMATCH".red().bold(),
                self.file,
                reference,
                offset
            ),
            (false, None) => writeln!(w, "{} {} ({})", "MISMATCH".red().bold(), self.file, reference),
        }
    }
}
