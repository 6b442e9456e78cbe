//! `ingestprobe suspend` / `ingestprobe resume` command handlers

use std::io::Write;

use serde::Serialize;

use ingestprobe_core::pipeline::ServiceControl;
use ingestprobe_core::types::ServiceHandle;
use ingestprobe_docker::DockerClient;

use crate::cli::ServiceArgs;
use crate::deployment::Deployment;
use crate::error::CliError;
use crate::output::{OutputWriter, Render};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ServiceAction {
    Suspend,
    Resume,
}

/// Execute `suspend` or `resume`, then report the service's new state.
pub async fn execute<D: DockerClient>(
    action: ServiceAction,
    args: ServiceArgs,
    deployment: &Deployment<D>,
    writer: &OutputWriter,
) -> Result<(), CliError> {
    let label = deployment.config().services.resolve(&args.service);
    let control = deployment.control();

    match action {
        ServiceAction::Suspend => control.suspend(label).await?,
        ServiceAction::Resume => control.resume(label).await?,
    }
    let handle = control.inspect(label).await?;

    writer.render(&ServiceReport {
        service: args.service,
        action,
        handle,
    })
}

#[derive(Debug, Serialize)]
pub struct ServiceReport {
    pub service: String,
    pub action: ServiceAction,
    pub handle: ServiceHandle,
}

impl Render for ServiceReport {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        use colored::Colorize;

        let verb = match self.action {
            ServiceAction::Suspend => "suspended",
            ServiceAction::Resume => "resumed",
        };
        writeln!(
            w,
            "{} {} -> {}",
            "✓".green(),
            self.service,
            verb
        )?;
        writeln!(w, "  {}", self.handle)
    }
}
