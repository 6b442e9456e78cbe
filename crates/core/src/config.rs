//! Configuration -- `ingestprobe.toml` parsing and env overrides
//!
//! [`ProbeConfig`] is the top-level structure; each component reads only its
//! own section.
//!
//! # Loading precedence
//! 1. CLI flags (highest)
//! 2. Environment variables (`INGESTPROBE_POLL_MAX_TIMEOUT_MS=60000`)
//! 3. Config file (`ingestprobe.toml`)
//! 4. Defaults (`Default` impls)
//!
//! # Example
//! ```no_run
//! # async fn example() -> Result<(), ingestprobe_core::error::IngestError> {
//! use ingestprobe_core::config::ProbeConfig;
//!
//! let config = ProbeConfig::load("ingestprobe.toml").await?;
//! let config = ProbeConfig::parse("[poll]\nmax_timeout_ms = 30000")?;
//! # Ok(())
//! # }
//! ```

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{ConfigError, IngestError};
use crate::types::BrokerCredentials;

const MAX_POLL_INTERVAL_MS: u64 = 60_000;
const MAX_GRACE_MS: u64 = 60_000;
const MAX_POLL_TIMEOUT_MS: u64 = 24 * 60 * 60 * 1000;
const MAX_CONNECTIVITY_RETRIES: u32 = 100;
const MAX_EXEC_TIMEOUT_SECS: u64 = 600;

/// ingestprobe configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProbeConfig {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub instance: InstanceConfig,
    #[serde(default)]
    pub broker: BrokerConfig,
    #[serde(default)]
    pub services: ServicesConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub poll: PollConfig,
    #[serde(default)]
    pub artifact: ArtifactConfig,
    #[serde(default)]
    pub docker: DockerConfig,
}

impl ProbeConfig {
    /// Loads the TOML file, applies env overrides, then validates.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, IngestError> {
        let mut config = Self::from_file(path).await?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Loads the TOML file without env overrides.
    pub async fn from_file(path: impl AsRef<Path>) -> Result<Self, IngestError> {
        let path = path.as_ref();
        let content = tokio::fs::read_to_string(path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                IngestError::Config(ConfigError::FileNotFound {
                    path: path.display().to_string(),
                })
            } else {
                IngestError::Io(e)
            }
        })?;
        let config = Self::parse(&content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn parse(toml_str: &str) -> Result<Self, IngestError> {
        toml::from_str(toml_str).map_err(|e| {
            IngestError::Config(ConfigError::ParseFailed {
                reason: e.to_string(),
            })
        })
    }

    /// Applies `INGESTPROBE_{SECTION}_{FIELD}` overrides.
    pub fn apply_env_overrides(&mut self) {
        override_string(&mut self.general.log_level, "INGESTPROBE_GENERAL_LOG_LEVEL");
        override_string(&mut self.general.log_format, "INGESTPROBE_GENERAL_LOG_FORMAT");

        override_string(&mut self.instance.name, "INGESTPROBE_INSTANCE_NAME");

        override_string(&mut self.broker.user, "INGESTPROBE_BROKER_USER");
        override_string(&mut self.broker.password, "INGESTPROBE_BROKER_PASSWORD");
        override_string(&mut self.broker.host, "INGESTPROBE_BROKER_HOST");
        override_parsed(&mut self.broker.port, "INGESTPROBE_BROKER_PORT");
        override_string(&mut self.broker.vhost, "INGESTPROBE_BROKER_VHOST");
        override_string(&mut self.broker.routing_key, "INGESTPROBE_BROKER_ROUTING_KEY");

        override_string(&mut self.services.label_key, "INGESTPROBE_SERVICES_LABEL_KEY");
        override_string(&mut self.services.keys, "INGESTPROBE_SERVICES_KEYS");
        override_string(&mut self.services.db, "INGESTPROBE_SERVICES_DB");
        override_string(&mut self.services.mq, "INGESTPROBE_SERVICES_MQ");
        override_string(&mut self.services.vault, "INGESTPROBE_SERVICES_VAULT");
        override_string(&mut self.services.publisher, "INGESTPROBE_SERVICES_PUBLISHER");

        override_string(&mut self.database.user, "INGESTPROBE_DATABASE_USER");
        override_string(&mut self.database.name, "INGESTPROBE_DATABASE_NAME");
        override_string(&mut self.database.table, "INGESTPROBE_DATABASE_TABLE");
        override_string(
            &mut self.database.lookup_column,
            "INGESTPROBE_DATABASE_LOOKUP_COLUMN",
        );

        override_parsed(&mut self.poll.max_timeout_ms, "INGESTPROBE_POLL_MAX_TIMEOUT_MS");
        override_parsed(&mut self.poll.interval_ms, "INGESTPROBE_POLL_INTERVAL_MS");
        override_parsed(&mut self.poll.grace_ms, "INGESTPROBE_POLL_GRACE_MS");
        override_parsed(
            &mut self.poll.on_connectivity_failure,
            "INGESTPROBE_POLL_ON_CONNECTIVITY_FAILURE",
        );
        override_parsed(
            &mut self.poll.connectivity_retries,
            "INGESTPROBE_POLL_CONNECTIVITY_RETRIES",
        );

        override_string(
            &mut self.artifact.expected_prefix,
            "INGESTPROBE_ARTIFACT_EXPECTED_PREFIX",
        );
        override_csv(
            &mut self.artifact.reference_columns,
            "INGESTPROBE_ARTIFACT_REFERENCE_COLUMNS",
        );
        override_string(&mut self.artifact.vault_root, "INGESTPROBE_ARTIFACT_VAULT_ROOT");

        override_string(&mut self.docker.socket, "INGESTPROBE_DOCKER_SOCKET");
        override_parsed(
            &mut self.docker.exec_timeout_secs,
            "INGESTPROBE_DOCKER_EXEC_TIMEOUT_SECS",
        );
    }

    pub fn validate(&self) -> Result<(), IngestError> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.general.log_level.as_str()) {
            return Err(invalid(
                "general.log_level",
                format!("must be one of: {}", valid_levels.join(", ")),
            ));
        }

        let valid_formats = ["json", "pretty"];
        if !valid_formats.contains(&self.general.log_format.as_str()) {
            return Err(invalid(
                "general.log_format",
                format!("must be one of: {}", valid_formats.join(", ")),
            ));
        }

        if self.broker.port == 0 {
            return Err(invalid("broker.port", "must not be 0"));
        }

        for (field, label) in [
            ("services.label_key", &self.services.label_key),
            ("services.keys", &self.services.keys),
            ("services.db", &self.services.db),
            ("services.mq", &self.services.mq),
            ("services.vault", &self.services.vault),
            ("services.publisher", &self.services.publisher),
        ] {
            if label.trim().is_empty() {
                return Err(invalid(field, "must not be empty"));
            }
        }

        for (field, ident) in [
            ("database.table", &self.database.table),
            ("database.lookup_column", &self.database.lookup_column),
        ] {
            if !is_sql_identifier(ident) {
                return Err(invalid(
                    field,
                    "must be a non-empty identifier of [A-Za-z0-9_.]",
                ));
            }
        }

        if self.poll.max_timeout_ms == 0 || self.poll.max_timeout_ms > MAX_POLL_TIMEOUT_MS {
            return Err(invalid(
                "poll.max_timeout_ms",
                format!("must be 1-{MAX_POLL_TIMEOUT_MS}"),
            ));
        }

        if self.poll.interval_ms == 0 || self.poll.interval_ms > MAX_POLL_INTERVAL_MS {
            return Err(invalid(
                "poll.interval_ms",
                format!("must be 1-{MAX_POLL_INTERVAL_MS}"),
            ));
        }

        if self.poll.grace_ms > MAX_GRACE_MS {
            return Err(invalid("poll.grace_ms", format!("must be 0-{MAX_GRACE_MS}")));
        }

        if self.poll.connectivity_retries > MAX_CONNECTIVITY_RETRIES {
            return Err(invalid(
                "poll.connectivity_retries",
                format!("must be 0-{MAX_CONNECTIVITY_RETRIES}"),
            ));
        }

        if self.artifact.expected_prefix.is_empty() {
            return Err(invalid("artifact.expected_prefix", "must not be empty"));
        }

        if self.artifact.reference_columns.is_empty() {
            return Err(invalid(
                "artifact.reference_columns",
                "at least one column is required",
            ));
        }

        if self.docker.exec_timeout_secs == 0 || self.docker.exec_timeout_secs > MAX_EXEC_TIMEOUT_SECS
        {
            return Err(invalid(
                "docker.exec_timeout_secs",
                format!("must be 1-{MAX_EXEC_TIMEOUT_SECS}"),
            ));
        }

        Ok(())
    }

    /// Broker credentials; vhost falls back to the instance name.
    pub fn broker_credentials(&self) -> BrokerCredentials {
        BrokerCredentials {
            user: self.broker.user.clone(),
            password: self.broker.password.clone(),
            host: self.broker.host.clone(),
            port: self.broker.port,
            vhost: or_instance(&self.broker.vhost, &self.instance.name),
        }
    }

    /// Routing key; falls back to the instance name.
    pub fn routing_key(&self) -> String {
        or_instance(&self.broker.routing_key, &self.instance.name)
    }
}

fn or_instance(value: &str, instance: &str) -> String {
    if value.is_empty() {
        instance.to_owned()
    } else {
        value.to_owned()
    }
}

fn invalid(field: &str, reason: impl Into<String>) -> IngestError {
    ConfigError::InvalidValue {
        field: field.to_owned(),
        reason: reason.into(),
    }
    .into()
}

fn is_sql_identifier(value: &str) -> bool {
    !value.is_empty()
        && value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '.')
}

/// General settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// trace, debug, info, warn, error
    pub log_level: String,
    /// json, pretty
    pub log_format: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_owned(),
            log_format: "pretty".to_owned(),
        }
    }
}

/// Deployment under test
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InstanceConfig {
    pub name: String,
}

impl Default for InstanceConfig {
    fn default() -> Self {
        Self {
            name: "lega".to_owned(),
        }
    }
}

/// Message broker that accepts ingestion requests
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BrokerConfig {
    pub user: String,
    pub password: String,
    pub host: String,
    pub port: u16,
    /// Empty means the instance name
    pub vhost: String,
    /// Empty means the instance name
    pub routing_key: String,
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            user: String::new(),
            password: String::new(),
            host: "localhost".to_owned(),
            port: 5672,
            vhost: String::new(),
            routing_key: String::new(),
        }
    }
}

/// Labels of the dependent services
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServicesConfig {
    /// Runtime label key the values below are matched against
    pub label_key: String,
    pub keys: String,
    pub db: String,
    pub mq: String,
    pub vault: String,
    /// Container hosting the `publish` tool
    pub publisher: String,
}

impl ServicesConfig {
    /// Maps a logical service name (`keys`, `db`, `mq`, `vault`, `publisher`)
    /// to its configured label. Anything else is taken as a raw label.
    pub fn resolve<'a>(&'a self, name: &'a str) -> &'a str {
        match name {
            "keys" | "keyserver" => &self.keys,
            "db" | "database" => &self.db,
            "mq" | "broker" => &self.mq,
            "vault" => &self.vault,
            "publisher" => &self.publisher,
            other => other,
        }
    }
}

impl Default for ServicesConfig {
    fn default() -> Self {
        Self {
            label_key: "com.docker.compose.service".to_owned(),
            keys: "keys".to_owned(),
            db: "db".to_owned(),
            mq: "mq".to_owned(),
            vault: "vault".to_owned(),
            publisher: "cega-mq".to_owned(),
        }
    }
}

/// Status store
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub user: String,
    pub name: String,
    pub table: String,
    /// Column matched against the inbox filename
    pub lookup_column: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            user: "lega_in".to_owned(),
            name: "lega".to_owned(),
            table: "local_ega.files".to_owned(),
            lookup_column: "inbox_path".to_owned(),
        }
    }
}

/// What the poller does when the status store cannot be reached.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OnConnectivityFailure {
    /// End the poll with `ERROR`
    #[default]
    Error,
    /// Keep polling for up to `connectivity_retries` consecutive failures
    Retry,
}

impl FromStr for OnConnectivityFailure {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "error" => Ok(Self::Error),
            "retry" => Ok(Self::Retry),
            other => Err(format!("unknown connectivity policy '{other}'")),
        }
    }
}

impl fmt::Display for OnConnectivityFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Error => write!(f, "error"),
            Self::Retry => write!(f, "retry"),
        }
    }
}

/// Status polling
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PollConfig {
    pub max_timeout_ms: u64,
    pub interval_ms: u64,
    /// Extra wait after a terminal status before the record is read
    pub grace_ms: u64,
    pub on_connectivity_failure: OnConnectivityFailure,
    /// Only used with `on_connectivity_failure = "retry"`
    pub connectivity_retries: u32,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            max_timeout_ms: 60_000,
            interval_ms: 1000,
            grace_ms: 1000,
            on_connectivity_failure: OnConnectivityFailure::Error,
            connectivity_retries: 3,
        }
    }
}

/// Stored artifact verification
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ArtifactConfig {
    /// Leading bytes every vault artifact must carry
    pub expected_prefix: String,
    /// Record columns searched, in order, for the storage reference
    pub reference_columns: Vec<String>,
    /// Prepended to relative storage references
    pub vault_root: String,
}

impl Default for ArtifactConfig {
    fn default() -> Self {
        Self {
            expected_prefix: "bytearray(b'1')|256|8|b'CTR'".to_owned(),
            reference_columns: vec!["archive_path".to_owned(), "stable_id".to_owned()],
            vault_root: String::new(),
        }
    }
}

/// Container runtime connection
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DockerConfig {
    /// Socket path; empty uses the platform default
    pub socket: String,
    pub exec_timeout_secs: u64,
}

impl Default for DockerConfig {
    fn default() -> Self {
        Self {
            socket: String::new(),
            exec_timeout_secs: 30,
        }
    }
}

// --- env override helpers ---

fn override_string(target: &mut String, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        *target = val;
    }
}

fn override_parsed<T: FromStr>(target: &mut T, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<T>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse env var, ignoring"
            ),
        }
    }
}

fn override_csv(target: &mut Vec<String>, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        *target = val
            .split(',')
            .map(|s| s.trim().to_owned())
            .filter(|s| !s.is_empty())
            .collect();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    fn default_config_passes_validation() {
        ProbeConfig::default().validate().unwrap();
    }

    #[test]
    fn default_poll_cadence_is_one_second() {
        let config = ProbeConfig::default();
        assert_eq!(config.poll.interval_ms, 1000);
        assert_eq!(config.poll.grace_ms, 1000);
        assert_eq!(config.poll.on_connectivity_failure, OnConnectivityFailure::Error);
    }

    #[test]
    fn empty_toml_uses_defaults() {
        let config = ProbeConfig::parse("").unwrap();
        assert_eq!(config.database.table, "local_ega.files");
        assert_eq!(config.services.label_key, "com.docker.compose.service");
    }

    #[test]
    fn partial_toml_merges_with_defaults() {
        let config = ProbeConfig::parse(
            r#"
[poll]
max_timeout_ms = 2000
on_connectivity_failure = "retry"

[services]
db = "lega-db"
"#,
        )
        .unwrap();
        assert_eq!(config.poll.max_timeout_ms, 2000);
        assert_eq!(config.poll.interval_ms, 1000);
        assert_eq!(config.poll.on_connectivity_failure, OnConnectivityFailure::Retry);
        assert_eq!(config.services.db, "lega-db");
        assert_eq!(config.services.keys, "keys");
    }

    #[test]
    fn invalid_toml_returns_parse_error() {
        let err = ProbeConfig::parse("[poll\nmax_timeout_ms = ").unwrap_err();
        assert!(matches!(
            err,
            IngestError::Config(ConfigError::ParseFailed { .. })
        ));
    }

    #[test]
    fn validate_rejects_zero_interval() {
        let mut config = ProbeConfig::default();
        config.poll.interval_ms = 0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("poll.interval_ms"));
    }

    #[test]
    fn validate_rejects_zero_timeout() {
        let mut config = ProbeConfig::default();
        config.poll.max_timeout_ms = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_unknown_log_format() {
        let mut config = ProbeConfig::default();
        config.general.log_format = "xml".to_owned();
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_empty_service_label() {
        let mut config = ProbeConfig::default();
        config.services.db = "  ".to_owned();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("services.db"));
    }

    #[test]
    fn validate_rejects_injected_table_name() {
        let mut config = ProbeConfig::default();
        config.database.table = "files; drop table files".to_owned();
        assert!(config.validate().is_err());
    }

    #[test]
    fn broker_defaults_to_instance_name() {
        let mut config = ProbeConfig::default();
        config.instance.name = "lega-se".to_owned();
        assert_eq!(config.broker_credentials().vhost, "lega-se");
        assert_eq!(config.routing_key(), "lega-se");

        config.broker.routing_key = "files".to_owned();
        assert_eq!(config.routing_key(), "files");
    }

    #[test]
    fn services_resolve_logical_names() {
        let services = ServicesConfig {
            db: "lega-db".to_owned(),
            ..ServicesConfig::default()
        };
        assert_eq!(services.resolve("db"), "lega-db");
        assert_eq!(services.resolve("keyserver"), "keys");
        assert_eq!(services.resolve("inbox"), "inbox");
    }

    #[test]
    fn connectivity_policy_from_str() {
        assert_eq!(
            "RETRY".parse::<OnConnectivityFailure>().unwrap(),
            OnConnectivityFailure::Retry
        );
        assert!("sometimes".parse::<OnConnectivityFailure>().is_err());
    }

    #[test]
    #[serial]
    fn env_override_parsed_number() {
        let mut val = 10u64;
        // SAFETY: serialized with other env-mutating tests.
        unsafe { std::env::set_var("TEST_INGESTPROBE_U64", "2500") };
        override_parsed(&mut val, "TEST_INGESTPROBE_U64");
        assert_eq!(val, 2500);
        unsafe { std::env::remove_var("TEST_INGESTPROBE_U64") };
    }

    #[test]
    #[serial]
    fn env_override_invalid_keeps_original() {
        let mut val = 10u64;
        // SAFETY: serialized with other env-mutating tests.
        unsafe { std::env::set_var("TEST_INGESTPROBE_U64_BAD", "ten") };
        override_parsed(&mut val, "TEST_INGESTPROBE_U64_BAD");
        assert_eq!(val, 10);
        unsafe { std::env::remove_var("TEST_INGESTPROBE_U64_BAD") };
    }

    #[test]
    #[serial]
    fn env_override_csv_drops_blanks() {
        let mut val = vec!["a".to_owned()];
        // SAFETY: serialized with other env-mutating tests.
        unsafe { std::env::set_var("TEST_INGESTPROBE_CSV", "archive_path, ,stable_id") };
        override_csv(&mut val, "TEST_INGESTPROBE_CSV");
        assert_eq!(val, vec!["archive_path", "stable_id"]);
        unsafe { std::env::remove_var("TEST_INGESTPROBE_CSV") };
    }

    #[test]
    fn config_serialize_roundtrip() {
        let config = ProbeConfig::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        let parsed = ProbeConfig::parse(&toml_str).unwrap();
        assert_eq!(config.poll.max_timeout_ms, parsed.poll.max_timeout_ms);
        assert_eq!(config.artifact.expected_prefix, parsed.artifact.expected_prefix);
    }

    #[tokio::test]
    async fn from_file_not_found() {
        let err = ProbeConfig::from_file("/nonexistent/ingestprobe.toml")
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            IngestError::Config(ConfigError::FileNotFound { .. })
        ));
    }
}
