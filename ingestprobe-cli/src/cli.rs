//! CLI argument parsing using clap derive API
//!
//! Purely declarative: no side effects or I/O.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

use ingestprobe_core::types::FileStatus;
use ingestprobe_orchestrator::ChecksumAlgorithm;

/// ingestprobe -- drives file ingestion scenarios against a running pipeline.
///
/// Use `ingestprobe <COMMAND> --help` for subcommand details.
#[derive(Parser, Debug)]
#[command(name = "ingestprobe", version, about, long_about = None)]
pub struct Cli {
    /// Path to the ingestprobe.toml configuration file.
    ///
    /// When omitted, `ingestprobe.toml` is used if present, otherwise
    /// defaults plus environment overrides.
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Override log level (trace, debug, info, warn, error).
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    /// Output format.
    #[arg(long, global = true, default_value = "text")]
    pub output: OutputFormat,

    #[command(subcommand)]
    pub command: Commands,
}

/// Supported output formats.
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text output.
    Text,
    /// Machine-readable JSON.
    Json,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Trigger ingestion of an inbox file, wait for the outcome and verify it.
    Ingest(IngestArgs),

    /// Query the current ingestion status of a file once.
    Status(FileArgs),

    /// Show the full status record of a file.
    Record(FileArgs),

    /// Check the stored artifact of an ingested file.
    Verify(VerifyArgs),

    /// Stop a dependent service (keys, db, mq, vault or a raw label).
    Suspend(ServiceArgs),

    /// Start a previously stopped service.
    Resume(ServiceArgs),
}

// ---- ingest ----

#[derive(Args, Debug)]
pub struct IngestArgs {
    /// File name as it appears in the inbox.
    pub file: String,

    /// Inbox owner.
    #[arg(short, long)]
    pub user: String,

    /// Local plaintext copy; with --encrypted, checksums are sent along.
    #[arg(long, requires = "encrypted")]
    pub raw: Option<PathBuf>,

    /// Local encrypted copy.
    #[arg(long, requires = "raw")]
    pub encrypted: Option<PathBuf>,

    /// Digest used for --raw/--encrypted checksums (md5 or sha256).
    #[arg(long, default_value = "md5")]
    pub checksum: ChecksumAlgorithm,

    /// Poll bound in milliseconds (overrides poll.max_timeout_ms).
    #[arg(long)]
    pub max_timeout_ms: Option<u64>,

    /// Keep this service suspended while the scenario runs.
    #[arg(long)]
    pub outage: Option<String>,

    /// Terminal status the scenario must end in.
    #[arg(long, default_value = "completed")]
    pub expect: ExpectedStatus,
}

/// Terminal outcome a scenario is expected to reach.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ExpectedStatus {
    Completed,
    Error,
    Undefined,
}

impl From<ExpectedStatus> for FileStatus {
    fn from(expected: ExpectedStatus) -> Self {
        match expected {
            ExpectedStatus::Completed => FileStatus::Completed,
            ExpectedStatus::Error => FileStatus::Error,
            ExpectedStatus::Undefined => FileStatus::Undefined,
        }
    }
}

// ---- status / record ----

#[derive(Args, Debug)]
pub struct FileArgs {
    /// File name as it appears in the inbox.
    pub file: String,
}

// ---- verify ----

#[derive(Args, Debug)]
pub struct VerifyArgs {
    /// File name as it appears in the inbox.
    pub file: String,

    /// Expected artifact prefix (overrides artifact.expected_prefix).
    #[arg(long)]
    pub prefix: Option<String>,
}

// ---- suspend / resume ----

#[derive(Args, Debug)]
pub struct ServiceArgs {
    /// Service name (keys, db, mq, vault, publisher) or a raw container label.
    pub service: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_ingest_with_checksums() {
        let cli = Cli::try_parse_from([
            "ingestprobe",
            "ingest",
            "sample.c4gh",
            "--user",
            "john",
            "--raw",
            "sample",
            "--encrypted",
            "sample.c4gh",
            "--expect",
            "error",
        ])
        .unwrap();
        match cli.command {
            Commands::Ingest(args) => {
                assert_eq!(args.file, "sample.c4gh");
                assert_eq!(args.user, "john");
                assert!(args.raw.is_some());
                assert_eq!(args.checksum, ChecksumAlgorithm::Md5);
                assert_eq!(args.expect, ExpectedStatus::Error);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn checksum_algorithm_is_selectable() {
        let parse = |algorithm: &str| {
            Cli::try_parse_from([
                "ingestprobe",
                "ingest",
                "sample.c4gh",
                "--user",
                "john",
                "--checksum",
                algorithm,
            ])
        };
        match parse("SHA256").unwrap().command {
            Commands::Ingest(args) => assert_eq!(args.checksum, ChecksumAlgorithm::Sha256),
            other => panic!("unexpected command {other:?}"),
        }
        assert!(parse("crc32").is_err());
    }

    #[test]
    fn raw_without_encrypted_is_rejected() {
        let result = Cli::try_parse_from([
            "ingestprobe",
            "ingest",
            "sample.c4gh",
            "--user",
            "john",
            "--raw",
            "sample",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "ingestprobe",
            "suspend",
            "keys",
            "--output",
            "json",
            "--log-level",
            "debug",
        ])
        .unwrap();
        assert!(matches!(cli.output, OutputFormat::Json));
        assert_eq!(cli.log_level.as_deref(), Some("debug"));
        assert!(matches!(cli.command, Commands::Suspend(ServiceArgs { ref service }) if service == "keys"));
    }

    #[test]
    fn ingest_requires_user() {
        assert!(Cli::try_parse_from(["ingestprobe", "ingest", "sample.c4gh"]).is_err());
    }
}
