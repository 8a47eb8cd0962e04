//! `DigestWorkflow`: streamed document fingerprinting.

use std::path::Path;

use tokio::io::AsyncReadExt;

use crate::{
    domain::crypto::{DigestBytes, StreamingDigest},
    HashAlgorithm, SigningError, SigningResult,
};

const CHUNK_SIZE: usize = 64 * 1024;

pub struct DigestWorkflow {
    hash_algorithm: HashAlgorithm,
}

impl Default for DigestWorkflow {
    fn default() -> Self {
        Self::new(HashAlgorithm::Sha512)
    }
}

impl DigestWorkflow {
    #[must_use]
    pub fn new(hash_algorithm: HashAlgorithm) -> Self {
        Self { hash_algorithm }
    }

    /// Digest the file at `path` without loading it whole.
    pub async fn run_file(&self, path: &Path) -> SigningResult<DigestBytes> {
        let mut file = tokio::fs::File::open(path).await.map_err(|e| {
            SigningError::IoError(format!("Failed to open {}: {e}", path.display()))
        })?;
        let mut hasher = StreamingDigest::new(self.hash_algorithm);
        let mut buf = vec![0u8; CHUNK_SIZE];
        let mut total = 0usize;
        loop {
            let n = file.read(&mut buf).await?;
            if n == 0 {
                break;
            }
            hasher.update(&buf[..n]);
            total += n;
        }
        log::debug!("Hashed {total} bytes of {}", path.display());
        Ok(hasher.finalize())
    }

    /// Lowercase hex digest of the file at `path`.
    pub async fn run_file_hex(&self, path: &Path) -> SigningResult<String> {
        Ok(self.run_file(path).await?.to_hex())
    }

    #[must_use]
    pub fn run_bytes(&self, data: &[u8]) -> DigestBytes {
        self.hash_algorithm.digest(data)
    }
}
