//! Streaming file digests for the checksummed trigger variant.

use std::fmt::{self, Write as _};
use std::path::Path;
use std::str::FromStr;

use md5::Md5;
use sha2::{Digest, Sha256};
use tokio::io::AsyncReadExt;

use ingestprobe_core::error::{ConfigError, IngestError};

const CHUNK_SIZE: usize = 64 * 1024;

/// Digest algorithm accepted by the publish tool.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ChecksumAlgorithm {
    #[default]
    Md5,
    Sha256,
}

impl ChecksumAlgorithm {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Md5 => "md5",
            Self::Sha256 => "sha256",
        }
    }
}

impl fmt::Display for ChecksumAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ChecksumAlgorithm {
    type Err = IngestError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "md5" => Ok(Self::Md5),
            "sha256" => Ok(Self::Sha256),
            other => Err(ConfigError::InvalidValue {
                field: "checksum".to_owned(),
                reason: format!("unsupported algorithm '{other}' (expected md5 or sha256)"),
            }
            .into()),
        }
    }
}

/// Lower-case hex digest of the file at `path`.
pub async fn file_digest(
    path: impl AsRef<Path>,
    algorithm: ChecksumAlgorithm,
) -> Result<String, IngestError> {
    let file = tokio::fs::File::open(path.as_ref()).await?;
    match algorithm {
        ChecksumAlgorithm::Md5 => stream_digest::<Md5>(file).await,
        ChecksumAlgorithm::Sha256 => stream_digest::<Sha256>(file).await,
    }
}

async fn stream_digest<H: Digest>(mut file: tokio::fs::File) -> Result<String, IngestError> {
    let mut hasher = H::new();
    let mut buf = vec![0u8; CHUNK_SIZE];
    loop {
        let n = file.read(&mut buf).await?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(to_hex_lowercase(&hasher.finalize()))
}

fn to_hex_lowercase(bytes: &[u8]) -> String {
    let mut output = String::with_capacity(bytes.len() * 2);
    for byte in bytes {
        let _ = write!(&mut output, "{byte:02x}");
    }
    output
}
