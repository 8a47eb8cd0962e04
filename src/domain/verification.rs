//! Verification domain types for CMS signed blobs.
//!
//! [`VerificationResult`] is the in-process outcome produced by the verifier.
//! Its metadata fields are filled independently of each other and of the
//! signature check, so a broken signature can still report who claimed to
//! sign it. [`VerificationReport`] is the serializable projection handed to
//! callers outside the library.

use serde::{Deserialize, Serialize};

/// Result of verifying a CMS blob.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VerificationResult {
    /// True only if the content digest and the signature both check out.
    pub valid: bool,
    /// Subject common name of the signing certificate.
    pub signer_name: Option<String>,
    /// ISO-8601 UTC instant with millisecond precision.
    pub signing_time: Option<String>,
    /// Hex of the signed message-digest attribute, reported even when the content no longer matches it.
    pub document_hash_hex: Option<String>,
    pub digest_algorithm_name: Option<String>,
    pub issuer_name: Option<String>,
    pub serial_number_hex: Option<String>,
    /// Chain outcome; only present when trust anchors were configured.
    pub trusted: Option<bool>,
}

impl VerificationResult {
    /// Invalid result without any metadata.
    #[must_use]
    pub fn invalid() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn has_metadata(&self) -> bool {
        self.signer_name.is_some()
            || self.signing_time.is_some()
            || self.document_hash_hex.is_some()
            || self.digest_algorithm_name.is_some()
            || self.issuer_name.is_some()
            || self.serial_number_hex.is_some()
            || self.trusted.is_some()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum VerificationStatus {
    Valid,
    Invalid,
}

impl std::fmt::Display for VerificationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            VerificationStatus::Valid => write!(f, "VALID"),
            VerificationStatus::Invalid => write!(f, "INVALID"),
        }
    }
}

/// Descriptive signer metadata as exposed to callers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerificationInfos {
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub signer_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub signing_time: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub document_hash: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub hash_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub issuer: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub serial_number: Option<String>,
    /// `"true"` or `"false"`.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub trusted_chain: Option<String>,
}

/// Boundary shape `{status, infos?}`; `infos` is omitted when no metadata was recovered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationReport {
    pub status: VerificationStatus,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub infos: Option<VerificationInfos>,
}

impl VerificationReport {
    /// Report for input that could not even be read.
    #[must_use]
    pub fn invalid() -> Self {
        Self {
            status: VerificationStatus::Invalid,
            infos: None,
        }
    }

    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.status == VerificationStatus::Valid
    }
}

impl From<&VerificationResult> for VerificationReport {
    fn from(result: &VerificationResult) -> Self {
        let status = if result.valid {
            VerificationStatus::Valid
        } else {
            VerificationStatus::Invalid
        };
        let infos = result.has_metadata().then(|| VerificationInfos {
            signer_name: result.signer_name.clone(),
            signing_time: result.signing_time.clone(),
            document_hash: result.document_hash_hex.clone(),
            hash_name: result.digest_algorithm_name.clone(),
            issuer: result.issuer_name.clone(),
            serial_number: result.serial_number_hex.clone(),
            trusted_chain: result.trusted.map(|t| t.to_string()),
        });
        Self { status, infos }
    }
}

impl From<VerificationResult> for VerificationReport {
    fn from(result: VerificationResult) -> Self {
        Self::from(&result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_without_metadata_omits_infos() {
        let report = VerificationReport::from(VerificationResult::invalid());
        assert_eq!(report.status, VerificationStatus::Invalid);
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json, serde_json::json!({ "status": "INVALID" }));
    }

    #[test]
    fn valid_projection_uses_boundary_keys() {
        let result = VerificationResult {
            valid: true,
            signer_name: Some("Alice".into()),
            digest_algorithm_name: Some("SHA-512".into()),
            trusted: Some(false),
            ..Default::default()
        };
        let json = serde_json::to_value(VerificationReport::from(&result)).unwrap();
        assert_eq!(json["status"], "VALID");
        assert_eq!(json["infos"]["signerName"], "Alice");
        assert_eq!(json["infos"]["hashName"], "SHA-512");
        assert_eq!(json["infos"]["trustedChain"], "false");
        assert!(json["infos"].get("issuer").is_none());
    }

    #[test]
    fn metadata_survives_invalid_status() {
        let result = VerificationResult {
            valid: false,
            serial_number_hex: Some("01".into()),
            ..Default::default()
        };
        let report = VerificationReport::from(result);
        assert!(!report.is_valid());
        assert_eq!(report.infos.unwrap().serial_number.as_deref(), Some("01"));
    }
}
