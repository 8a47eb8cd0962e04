//! `SignWorkflow` orchestrates credential resolution, signing and persistence.
//!
//! File I/O is async; resolution and signing are CPU-bound and run on the
//! blocking pool.

use std::path::{Path, PathBuf};

use crate::{
    domain::types::{Alias, Passphrase},
    infra::{config::SignerConfiguration, output::OutputPathAllocator},
    services::{CmsSigner, CredentialResolver, ResolutionMethod},
    HashAlgorithm, SigningError, SigningResult,
};

/// Result of a signing run.
#[derive(Debug, Clone)]
pub struct SignOutcome {
    /// Base64 of the DER blob.
    pub base64: String,
    pub der: Vec<u8>,
    /// Where the blob was written, when persistence is enabled.
    pub artifact: Option<PathBuf>,
    pub method: ResolutionMethod,
}

pub struct SignWorkflow {
    signer: CmsSigner,
    output: Option<OutputPathAllocator>,
}

impl SignWorkflow {
    pub fn new(hash_algorithm: HashAlgorithm) -> SigningResult<Self> {
        Ok(Self {
            signer: CmsSigner::new(hash_algorithm)?,
            output: None,
        })
    }

    /// Workflow honoring the configured hash and output settings.
    pub fn from_config(config: &SignerConfiguration) -> SigningResult<Self> {
        let workflow = Self::new(config.hash_algorithm()?)?;
        Ok(if config.output.persist_signed_files {
            workflow.with_output(OutputPathAllocator::from_config(&config.output))
        } else {
            workflow
        })
    }

    /// Persist every signed blob through `allocator`.
    #[must_use]
    pub fn with_output(mut self, allocator: OutputPathAllocator) -> Self {
        self.output = Some(allocator);
        self
    }

    /// Do not write signed blobs to disk.
    #[must_use]
    pub fn without_output(mut self) -> Self {
        self.output = None;
        self
    }

    #[must_use]
    pub fn hash_algorithm(&self) -> HashAlgorithm {
        self.signer.hash_algorithm()
    }

    /// Sign in-memory document bytes with a credential from `container`.
    pub async fn sign_bytes(
        &self,
        document: Vec<u8>,
        container: Vec<u8>,
        passphrase: Passphrase,
        alias: Option<Alias>,
    ) -> SigningResult<SignOutcome> {
        let signer = self.signer;
        let (blob, method) = tokio::task::spawn_blocking(move || {
            let credential =
                CredentialResolver::new().resolve(&container, &passphrase, alias.as_ref())?;
            let blob = signer.sign(&document, &credential)?;
            Ok::<_, SigningError>((blob, credential.method()))
        })
        .await
        .map_err(|e| SigningError::SignatureGenerationFailed(format!("Signing task failed: {e}")))??;

        let artifact = match &self.output {
            Some(allocator) => Some(allocator.persist(blob.as_der()).await?),
            None => None,
        };

        Ok(SignOutcome {
            base64: blob.to_base64(),
            der: blob.into_der(),
            artifact,
            method,
        })
    }

    /// Read `document` and `container` from disk and sign.
    pub async fn sign_file(
        &self,
        document: &Path,
        container: &Path,
        passphrase: Passphrase,
        alias: Option<Alias>,
    ) -> SigningResult<SignOutcome> {
        log::info!("Signing {}", document.display());
        let document_bytes = tokio::fs::read(document).await.map_err(|e| {
            SigningError::IoError(format!("Failed to read {}: {e}", document.display()))
        })?;
        let container_bytes = tokio::fs::read(container).await.map_err(|e| {
            SigningError::IoError(format!("Failed to read {}: {e}", container.display()))
        })?;
        self.sign_bytes(document_bytes, container_bytes, passphrase, alias)
            .await
    }
}
