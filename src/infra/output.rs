//! Numbered output path allocation for signed artifacts.
//!
//! Paths are chosen by probing `<dir>/<base>_<N>.<ext>` for `N = 0, 1, 2, …`
//! and taking the first one that does not exist. The existence check and the
//! later file creation are separate steps, so two concurrent writers may pick
//! the same name; callers that need exclusivity must serialize allocation.

use std::path::{Path, PathBuf};

use crate::domain::constants::MAX_OUTPUT_SUFFIX;
use crate::infra::config::OutputConfig;
use crate::infra::error::{SigningError, SigningResult};

#[derive(Debug, Clone)]
pub struct OutputPathAllocator {
    directory: PathBuf,
    base_name: String,
    extension: String,
}

impl OutputPathAllocator {
    pub fn new(
        directory: impl Into<PathBuf>,
        base_name: impl Into<String>,
        extension: impl Into<String>,
    ) -> Self {
        Self {
            directory: directory.into(),
            base_name: base_name.into(),
            extension: extension.into(),
        }
    }

    /// Allocator producing `signed_file_<N>.p7s` inside `directory`.
    pub fn signed_files(directory: impl Into<PathBuf>) -> Self {
        Self::new(directory, "signed_file", "p7s")
    }

    #[must_use]
    pub fn from_config(config: &OutputConfig) -> Self {
        Self::new(
            config.directory.clone(),
            config.base_name.clone(),
            config.extension.clone(),
        )
    }

    #[must_use]
    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// Candidate path for suffix `index`.
    #[must_use]
    pub fn candidate(&self, index: u32) -> PathBuf {
        self.directory
            .join(format!("{}_{}.{}", self.base_name, index, self.extension))
    }

    /// Create the directory if needed and return the first unused numbered path.
    pub async fn allocate(&self) -> SigningResult<PathBuf> {
        tokio::fs::create_dir_all(&self.directory)
            .await
            .map_err(|e| {
                SigningError::IoError(format!(
                    "Failed to create output directory {}: {e}",
                    self.directory.display()
                ))
            })?;

        for index in 0..MAX_OUTPUT_SUFFIX {
            let candidate = self.candidate(index);
            if !tokio::fs::try_exists(&candidate).await? {
                log::debug!("Allocated output path {}", candidate.display());
                return Ok(candidate);
            }
        }

        Err(SigningError::IoError(format!(
            "No free output name left in {} after {MAX_OUTPUT_SUFFIX} attempts",
            self.directory.display()
        )))
    }

    /// Allocate a path and write `bytes` to it.
    pub async fn persist(&self, bytes: &[u8]) -> SigningResult<PathBuf> {
        let path = self.allocate().await?;
        tokio::fs::write(&path, bytes).await.map_err(|e| {
            SigningError::IoError(format!("Failed to write {}: {e}", path.display()))
        })?;
        log::info!("Wrote {} bytes to {}", bytes.len(), path.display());
        Ok(path)
    }
}
