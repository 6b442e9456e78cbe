//! `ingestprobe record` command handler

use std::io::Write;

use serde::Serialize;

use ingestprobe_core::types::{EncryptedFileRef, RecordLookup};
use ingestprobe_docker::DockerClient;

use crate::cli::FileArgs;
use crate::deployment::Deployment;
use crate::error::CliError;
use crate::output::{OutputWriter, Render};

/// Execute the `record` command. A missing record is output, not an error.
pub async fn execute<D: DockerClient>(
    args: FileArgs,
    deployment: &Deployment<D>,
    writer: &OutputWriter,
) -> Result<(), CliError> {
    let lookup = deployment
        .verifier()
        .fetch_record(&EncryptedFileRef::new(&args.file))
        .await?;
    writer.render(&RecordReport {
        file: args.file,
        lookup,
    })
}

#[derive(Debug, Serialize)]
pub struct RecordReport {
    pub file: String,
    pub lookup: RecordLookup,
}

impl Render for RecordReport {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        let Some(record) = self.lookup.record() else {
            return writeln!(w, "{}: {}", self.file, self.lookup.status_label());
        };
        let width = record.iter().map(|(k, _)| k.len()).max().unwrap_or(0);
        for (column, value) in record.iter() {
            writeln!(w, "{column:<width$}  {value}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ingestprobe_core::types::IngestionRecord;

    fn render(report: &RecordReport) -> String {
        let mut buf = Vec::new();
        report.render_text(&mut buf).unwrap();
        String::from_utf8(buf).unwrap()
    }

    #[test]
    fn no_entry_is_reported() {
        let text = render(&RecordReport {
            file: "x.c4gh".to_owned(),
            lookup: RecordLookup::NoEntry,
        });
        assert_eq!(text, "x.c4gh: NoEntry\n");
    }

    #[test]
    fn fields_are_aligned_in_column_order() {
        let text = render(&RecordReport {
            file: "x.c4gh".to_owned(),
            lookup: RecordLookup::Found(IngestionRecord::new(vec![
                ("id".to_owned(), "7".to_owned()),
                ("archive_path".to_owned(), "/ega/vault/7".to_owned()),
            ])),
        });
        assert_eq!(text, "id            7\narchive_path  /ega/vault/7\n");
    }
}
