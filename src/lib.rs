//! CMS Signer Library
//!
//! Resolves a signing credential out of a PKCS#12 container, produces attached
//! CMS (PKCS#7) `SignedData` over arbitrary documents and verifies such
//! structures, reporting descriptive signer metadata.

pub mod domain;
pub mod infra;
pub mod pipelines;
pub mod services;

pub use domain::types::{Alias, Passphrase};
pub use domain::verification::{
    VerificationInfos, VerificationReport, VerificationResult, VerificationStatus,
};
pub use infra::config;
pub use infra::error::{self, AvailableEntries, SigningError, SigningResult};
pub use infra::output::OutputPathAllocator;
pub use pipelines::{DigestWorkflow, SignOutcome, SignWorkflow, VerifyWorkflow};
pub use services::{
    CmsSigner, CmsVerifier, CredentialResolver, ResolutionMethod, ResolvedCredential,
    TrustAnchors,
};

/// Supported hash algorithms
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HashAlgorithm {
    /// Recognized when verifying; never used to produce new signatures.
    Sha1,
    Sha256,
    Sha384,
    Sha512,
}

impl HashAlgorithm {
    pub fn as_str(&self) -> &'static str {
        match self {
            HashAlgorithm::Sha1 => "sha1",
            HashAlgorithm::Sha256 => "sha256",
            HashAlgorithm::Sha384 => "sha384",
            HashAlgorithm::Sha512 => "sha512",
        }
    }

    pub fn digest_size(&self) -> usize {
        match self {
            HashAlgorithm::Sha1 => 20,
            HashAlgorithm::Sha256 => 32,
            HashAlgorithm::Sha384 => 48,
            HashAlgorithm::Sha512 => 64,
        }
    }
}

impl Default for HashAlgorithm {
    fn default() -> Self {
        HashAlgorithm::Sha512
    }
}

impl std::str::FromStr for HashAlgorithm {
    type Err = SigningError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace('-', "").as_str() {
            "sha1" => Ok(HashAlgorithm::Sha1),
            "sha256" => Ok(HashAlgorithm::Sha256),
            "sha384" => Ok(HashAlgorithm::Sha384),
            "sha512" => Ok(HashAlgorithm::Sha512),
            other => Err(SigningError::InvalidInput(format!(
                "Unsupported hash algorithm: {other}"
            ))),
        }
    }
}

impl std::fmt::Display for HashAlgorithm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.display_name())
    }
}
