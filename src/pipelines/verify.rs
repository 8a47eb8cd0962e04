//! `VerifyWorkflow`: high-level facade for verifying CMS blobs.
//!
//! Delegates to `CmsVerifier` and projects the outcome into a `VerificationReport`.

use std::path::Path;

use crate::{
    domain::verification::VerificationReport,
    services::{CmsVerifier, TrustAnchors},
};

/// Orchestrates verification of a CMS blob.
#[derive(Debug, Clone, Default)]
pub struct VerifyWorkflow {
    svc: CmsVerifier,
}

impl VerifyWorkflow {
    #[must_use]
    pub fn new() -> Self {
        Self {
            svc: CmsVerifier::new(),
        }
    }

    #[must_use]
    pub fn with_trust_anchors(self, anchors: TrustAnchors) -> Self {
        Self {
            svc: self.svc.with_trust_anchors(anchors),
        }
    }

    /// Verify blob bytes on the blocking pool.
    pub async fn run(&self, blob: Vec<u8>) -> VerificationReport {
        let svc = self.svc.clone();
        match tokio::task::spawn_blocking(move || svc.verify(&blob)).await {
            Ok(result) => VerificationReport::from(&result),
            Err(e) => {
                log::error!("Verification task failed: {e}");
                VerificationReport::invalid()
            }
        }
    }

    /// Verify the blob stored at `path`; unreadable input is reported as invalid.
    pub async fn run_file(&self, path: &Path) -> VerificationReport {
        match tokio::fs::read(path).await {
            Ok(blob) => self.run(blob).await,
            Err(e) => {
                log::warn!("Failed to read {}: {e}", path.display());
                VerificationReport::invalid()
            }
        }
    }
}
