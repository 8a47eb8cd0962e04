//! Error handling types and result definitions for credential resolution and signing.

use std::fmt;

use thiserror::Error;

/// Result type for signing operations
pub type SigningResult<T> = Result<T, SigningError>;

/// Identifying metadata observed in a container, reported when no pair could be chosen.
///
/// Only names and key identifiers are kept; never key material.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AvailableEntries {
    pub friendly_names: Vec<String>,
    /// Lowercase hex.
    pub local_key_ids: Vec<String>,
}

impl AvailableEntries {
    /// Add a friendly name unless it was already recorded; first-seen order is kept.
    pub fn push_friendly_name(&mut self, name: &str) {
        if !self.friendly_names.iter().any(|n| n == name) {
            self.friendly_names.push(name.to_string());
        }
    }

    pub fn push_local_key_id(&mut self, id_hex: String) {
        if !self.local_key_ids.contains(&id_hex) {
            self.local_key_ids.push(id_hex);
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.friendly_names.is_empty() && self.local_key_ids.is_empty()
    }
}

impl fmt::Display for AvailableEntries {
    /// Empty lists are omitted; nothing is written when no attribute was seen.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts = Vec::with_capacity(2);
        if !self.friendly_names.is_empty() {
            parts.push(format!("friendlyNames={}", self.friendly_names.join(",")));
        }
        if !self.local_key_ids.is_empty() {
            parts.push(format!("localKeyIds={}", self.local_key_ids.join(",")));
        }
        if parts.is_empty() {
            return Ok(());
        }
        write!(f, " (available: {})", parts.join("; "))
    }
}

/// Comprehensive error types for signing operations
#[derive(Error, Debug, miette::Diagnostic)]
pub enum SigningError {
    #[error("Corrupted PKCS#12 container: {0}")]
    CorruptedContainer(String),

    #[error("Invalid PKCS#12 password")]
    InvalidPassword,

    #[error("Failed to find key and certificate for alias: {alias}{available}")]
    AliasNotFound {
        alias: String,
        available: AvailableEntries,
    },

    #[error("Signature generation failed: {0}")]
    SignatureGenerationFailed(String),

    #[error("Certificate error: {0}")]
    CertificateError(String),

    #[error("Cryptographic error: {0}")]
    CryptographicError(String),

    #[error("IO error: {0}")]
    IoError(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("ASN.1 encoding/decoding error: {0}")]
    Asn1Error(String),

    #[error("Configuration error: {0}")]
    ConfigurationError(String),
}

impl From<der::Error> for SigningError {
    fn from(error: der::Error) -> Self {
        SigningError::Asn1Error(error.to_string())
    }
}

impl From<std::io::Error> for SigningError {
    fn from(error: std::io::Error) -> Self {
        SigningError::IoError(error.to_string())
    }
}

impl From<openssl::error::ErrorStack> for SigningError {
    fn from(error: openssl::error::ErrorStack) -> Self {
        SigningError::CryptographicError(error.to_string())
    }
}
