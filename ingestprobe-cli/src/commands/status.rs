//! `ingestprobe status` command handler

use std::io::Write;

use serde::Serialize;

use ingestprobe_core::types::{EncryptedFileRef, FileStatus};
use ingestprobe_docker::DockerClient;

use crate::cli::FileArgs;
use crate::deployment::Deployment;
use crate::error::CliError;
use crate::output::{OutputWriter, Render, colored_status};

/// Execute the `status` command: one status query, decoded.
pub async fn execute<D: DockerClient>(
    args: FileArgs,
    deployment: &Deployment<D>,
    writer: &OutputWriter,
) -> Result<(), CliError> {
    let status = deployment
        .poller()
        .current_status(&EncryptedFileRef::new(&args.file))
        .await?;
    writer.render(&StatusReport {
        file: args.file,
        status,
        terminal: status.is_terminal(),
    })
}

#[derive(Debug, Serialize)]
pub struct StatusReport {
    pub file: String,
    pub status: FileStatus,
    pub terminal: bool,
}

impl Render for StatusReport {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        writeln!(w, "{}: {}", self.file, colored_status(self.status))
    }
}
