//! Result verifier -- final record shape and stored artifact content.

use std::sync::Arc;

use bytes::Bytes;
use metrics::counter;
use tracing::{debug, info, warn};

use ingestprobe_core::config::ProbeConfig;
use ingestprobe_core::error::{ArtifactMismatch, IngestError};
use ingestprobe_core::metrics as m;
use ingestprobe_core::pipeline::{ArtifactReader, QueryExecutor};
use ingestprobe_core::types::{EncryptedFileRef, IngestionRecord, RecordLookup};

use crate::sql;

/// Verifier settings.
#[derive(Debug, Clone)]
pub struct VerifierConfig {
    pub table: String,
    pub lookup_column: String,
    /// Columns holding the storage reference, tried in order
    pub reference_columns: Vec<String>,
    pub expected_prefix: Bytes,
}

impl Default for VerifierConfig {
    fn default() -> Self {
        Self::from_core(&ProbeConfig::default())
    }
}

impl VerifierConfig {
    pub fn from_core(config: &ProbeConfig) -> Self {
        Self {
            table: config.database.table.clone(),
            lookup_column: config.database.lookup_column.clone(),
            reference_columns: config.artifact.reference_columns.clone(),
            expected_prefix: Bytes::from(config.artifact.expected_prefix.clone().into_bytes()),
        }
    }
}

/// First offset at which `actual` stops matching `expected`.
///
/// `None` when `actual` starts with `expected`. An artifact shorter than the
/// prefix mismatches at its own length.
pub fn first_mismatch(expected: &[u8], actual: &[u8]) -> Option<usize> {
    expected
        .iter()
        .zip(actual)
        .position(|(e, a)| e != a)
        .or_else(|| (actual.len() < expected.len()).then_some(actual.len()))
}

pub struct ResultVerifier<Q: QueryExecutor, A: ArtifactReader> {
    query: Arc<Q>,
    artifacts: Arc<A>,
    config: VerifierConfig,
}

impl<Q: QueryExecutor, A: ArtifactReader> ResultVerifier<Q, A> {
    pub fn new(query: Arc<Q>, artifacts: Arc<A>, config: VerifierConfig) -> Self {
        Self {
            query,
            artifacts,
            config,
        }
    }

    pub fn expected_prefix(&self) -> &[u8] {
        &self.config.expected_prefix
    }

    /// Full row for `file_ref`, or `NoEntry` when nothing is recorded yet.
    ///
    /// Connectivity failures propagate; they are not absence.
    pub async fn fetch_record(&self, file_ref: &EncryptedFileRef) -> Result<RecordLookup, IngestError> {
        let sql = sql::record_query(
            &self.config.table,
            &self.config.lookup_column,
            &file_ref.filename,
        );
        let result = self.query.query(&sql).await?;
        let lookup = IngestionRecord::from_query(&result);
        debug!(
            file = file_ref.filename.as_str(),
            status = lookup.status_label().as_str(),
            "record fetched"
        );
        Ok(lookup)
    }

    /// Storage reference held by `record`: the first non-empty reference column.
    pub fn artifact_reference<'r>(&self, record: &'r IngestionRecord) -> Option<&'r str> {
        self.config
            .reference_columns
            .iter()
            .filter_map(|column| record.get(column))
            .find(|value| !value.is_empty())
    }

    /// `true` when the stored artifact starts with `expected_prefix`.
    ///
    /// A record without a storage reference is `false`.
    pub async fn verify_artifact(
        &self,
        record: &IngestionRecord,
        expected_prefix: &[u8],
    ) -> Result<bool, IngestError> {
        match self.compare(record, expected_prefix).await? {
            None => Ok(true),
            Some(_) => Ok(false),
        }
    }

    /// Like [`verify_artifact`](Self::verify_artifact) against the configured
    /// prefix, with a mismatch as a hard failure.
    pub async fn assert_artifact(&self, record: &IngestionRecord) -> Result<(), IngestError> {
        let expected = self.config.expected_prefix.clone();
        match self.compare(record, &expected).await? {
            None => Ok(()),
            Some(mismatch) => Err(mismatch.into()),
        }
    }

    async fn compare(
        &self,
        record: &IngestionRecord,
        expected: &[u8],
    ) -> Result<Option<ArtifactMismatch>, IngestError> {
        let Some(reference) = self.artifact_reference(record) else {
            warn!(
                columns = ?self.config.reference_columns,
                "record carries no storage reference"
            );
            counter!(m::ARTIFACT_VERIFICATIONS_TOTAL, m::LABEL_RESULT => "failure").increment(1);
            return Ok(Some(ArtifactMismatch {
                reference: format!("<none in {}>", self.config.reference_columns.join(", ")),
                offset: 0,
                expected: String::from_utf8_lossy(expected).into_owned(),
                actual: String::new(),
            }));
        };

        let actual = self.artifacts.read_prefix(reference, expected.len()).await?;
        let mismatch = first_mismatch(expected, &actual).map(|offset| ArtifactMismatch {
            reference: reference.to_owned(),
            offset,
            expected: String::from_utf8_lossy(expected).into_owned(),
            actual: String::from_utf8_lossy(&actual).into_owned(),
        });

        let outcome = if mismatch.is_none() { "success" } else { "failure" };
        counter!(m::ARTIFACT_VERIFICATIONS_TOTAL, m::LABEL_RESULT => outcome).increment(1);
        match &mismatch {
            None => info!(reference, "artifact prefix verified"),
            Some(found) => warn!(reference, offset = found.offset, "artifact prefix mismatch"),
        }
        Ok(mismatch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ingestprobe_core::types::QueryResult;
    use std::collections::HashMap;
    use std::sync::Mutex;

    const PREFIX: &[u8] = b"bytearray(b'1')|256|8|b'CTR'";

    struct FixedQuery(QueryResult);

    impl QueryExecutor for FixedQuery {
        async fn query(&self, _sql: &str) -> Result<QueryResult, IngestError> {
            Ok(self.0.clone())
        }
    }

    #[derive(Default)]
    struct Vault {
        objects: HashMap<String, Bytes>,
        reads: Mutex<Vec<(String, usize)>>,
    }

    impl Vault {
        fn with(reference: &str, content: &'static [u8]) -> Self {
            Self {
                objects: HashMap::from([(reference.to_owned(), Bytes::from_static(content))]),
                ..Default::default()
            }
        }
    }

    impl ArtifactReader for Vault {
        async fn read_prefix(&self, reference: &str, len: usize) -> Result<Bytes, IngestError> {
            self.reads.lock().unwrap().push((reference.to_owned(), len));
            let content = self.objects.get(reference).cloned().ok_or_else(|| {
                std::io::Error::new(std::io::ErrorKind::NotFound, reference.to_owned())
            })?;
            Ok(content.slice(..len.min(content.len())))
        }
    }

    fn verifier(result: QueryResult, vault: Vault) -> ResultVerifier<FixedQuery, Vault> {
        ResultVerifier::new(
            Arc::new(FixedQuery(result)),
            Arc::new(vault),
            VerifierConfig::default(),
        )
    }

    fn record(fields: &[(&str, &str)]) -> IngestionRecord {
        IngestionRecord::new(
            fields
                .iter()
                .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
                .collect(),
        )
    }

    #[test]
    fn first_mismatch_offsets() {
        assert_eq!(first_mismatch(b"abc", b"abcdef"), None);
        assert_eq!(first_mismatch(b"abc", b"abc"), None);
        assert_eq!(first_mismatch(b"abc", b"abX"), Some(2));
        assert_eq!(first_mismatch(b"abc", b"Xbc"), Some(0));
        assert_eq!(first_mismatch(b"abc", b"ab"), Some(2));
        assert_eq!(first_mismatch(b"abc", b""), Some(0));
    }

    #[test]
    fn every_single_byte_flip_is_detected() {
        for offset in 0..PREFIX.len() {
            let mut corrupted = PREFIX.to_vec();
            corrupted[offset] ^= 0x01;
            assert_eq!(first_mismatch(PREFIX, &corrupted), Some(offset));
        }
    }

    #[tokio::test]
    async fn fetch_record_zero_rows_is_no_entry() {
        let verifier = verifier(QueryResult::empty(vec!["id".into(), "status".into()]), Vault::default());
        let lookup = verifier.fetch_record(&EncryptedFileRef::new("x.c4gh")).await.unwrap();
        assert!(lookup.is_no_entry());
        assert_eq!(lookup.status_label(), "NoEntry");
    }

    #[tokio::test]
    async fn fetch_record_keeps_column_order() {
        let verifier = verifier(
            QueryResult::new(
                vec!["id".into(), "status".into(), "archive_path".into()],
                vec![vec!["7".into(), "READY".into(), "/ega/vault/000/007".into()]],
            ),
            Vault::default(),
        );
        let lookup = verifier.fetch_record(&EncryptedFileRef::new("x.c4gh")).await.unwrap();
        let record = lookup.record().unwrap();
        let columns: Vec<&str> = record.iter().map(|(k, _)| k).collect();
        assert_eq!(columns, vec!["id", "status", "archive_path"]);
        assert_eq!(verifier.artifact_reference(record), Some("/ega/vault/000/007"));
    }

    #[tokio::test]
    async fn verify_artifact_reads_exactly_prefix_length() {
        let vault = Vault::with("/ega/vault/1", b"bytearray(b'1')|256|8|b'CTR'\x00\x01rest");
        let verifier = verifier(QueryResult::default(), vault);
        let rec = record(&[("archive_path", "/ega/vault/1")]);

        assert!(verifier.verify_artifact(&rec, PREFIX).await.unwrap());
        assert!(!verifier.verify_artifact(&rec, b"bytearray(b'2')").await.unwrap());
        assert_eq!(
            verifier.artifacts.reads.lock().unwrap()[0],
            ("/ega/vault/1".to_owned(), PREFIX.len())
        );
    }

    #[tokio::test]
    async fn falls_back_to_next_reference_column() {
        let vault = Vault::with("EGAF00001", PREFIX);
        let verifier = verifier(QueryResult::default(), vault);
        let rec = record(&[("archive_path", ""), ("stable_id", "EGAF00001")]);
        verifier.assert_artifact(&rec).await.unwrap();
    }

    #[tokio::test]
    async fn assert_artifact_mismatch_is_hard_failure() {
        let vault = Vault::with("/ega/vault/1", b"bytearray(b'1')|128|8|b'CTR'");
        let verifier = verifier(QueryResult::default(), vault);
        let err = verifier
            .assert_artifact(&record(&[("archive_path", "/ega/vault/1")]))
            .await
            .unwrap_err();
        match err {
            IngestError::ArtifactMismatch(m) => {
                assert_eq!(m.reference, "/ega/vault/1");
                assert_eq!(m.offset, 16);
            }
            other => panic!("expected mismatch, got {other}"),
        }
    }

    #[tokio::test]
    async fn missing_reference_is_mismatch_not_read() {
        let verifier = verifier(QueryResult::default(), Vault::default());
        let rec = record(&[("status", "READY")]);
        assert!(!verifier.verify_artifact(&rec, PREFIX).await.unwrap());
        assert!(matches!(
            verifier.assert_artifact(&rec).await,
            Err(IngestError::ArtifactMismatch(_))
        ));
        assert!(verifier.artifacts.reads.lock().unwrap().is_empty());
    }
}
