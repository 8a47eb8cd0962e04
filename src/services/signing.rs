//! Attached CMS signing with a resolved PKCS#12 credential.
//!
//! The document is embedded in the `SignedData`; the signature covers the DER
//! SET of the three authenticated attributes.

use std::time::SystemTime;

use der::asn1::ObjectIdentifier;
use der::{Decode, Encode};
use openssl::pkey::Id;
use openssl::sign::Signer;

use crate::domain::asn1::ContentInfo;
use crate::domain::constants;
use crate::domain::crypto::CmsSignature;
use crate::domain::pkcs7::{CmsSignedData, ParsedSignedData};
use crate::infra::error::{SigningError, SigningResult};
use crate::services::credential_resolver::ResolvedCredential;
use crate::services::pkcs7_builder::Pkcs7BuilderService;
use crate::services::signed_attributes_builder::SignedAttributesBuilder;
use crate::HashAlgorithm;

/// Produces attached CMS `SignedData` blobs.
#[derive(Debug, Clone, Copy)]
pub struct CmsSigner {
    hash_algorithm: HashAlgorithm,
}

impl Default for CmsSigner {
    /// SHA-512 signer.
    fn default() -> Self {
        Self {
            hash_algorithm: HashAlgorithm::Sha512,
        }
    }
}

impl CmsSigner {
    /// Signer using `hash_algorithm`; SHA-1 is refused for new signatures.
    pub fn new(hash_algorithm: HashAlgorithm) -> SigningResult<Self> {
        if !hash_algorithm.is_signing_grade() {
            return Err(SigningError::InvalidInput(format!(
                "{hash_algorithm} is not accepted for new signatures"
            )));
        }
        Ok(Self { hash_algorithm })
    }

    #[must_use]
    pub fn hash_algorithm(&self) -> HashAlgorithm {
        self.hash_algorithm
    }

    /// Sign `document`, stamping the current time.
    ///
    /// `signingTime` has one-second resolution, so two RSA signatures of the
    /// same document within one second are byte-identical. Use [`Self::sign_at`]
    /// to control the instant.
    pub fn sign(
        &self,
        document: &[u8],
        credential: &ResolvedCredential,
    ) -> SigningResult<CmsSignedData> {
        self.sign_at(document, credential, SystemTime::now())
    }

    /// Sign `document` with an explicit signing-time attribute.
    pub fn sign_at(
        &self,
        document: &[u8],
        credential: &ResolvedCredential,
        signing_time: SystemTime,
    ) -> SigningResult<CmsSignedData> {
        let key = credential.private_key();
        let signature_algorithm = self.signature_algorithm(key.id())?;

        let digest = self.hash_algorithm.digest(document);
        log::debug!(
            "Document digest ({}): {}",
            self.hash_algorithm,
            digest.to_hex()
        );

        let attrs = SignedAttributesBuilder::new().build(&digest, signing_time)?;
        let to_be_signed = attrs.set_der()?;

        let mut signer = Signer::new(self.hash_algorithm.message_digest(), key)
            .map_err(|e| SigningError::SignatureGenerationFailed(e.to_string()))?;
        signer
            .update(&to_be_signed)
            .map_err(|e| SigningError::SignatureGenerationFailed(e.to_string()))?;
        let raw = signer
            .sign_to_vec()
            .map_err(|e| SigningError::SignatureGenerationFailed(e.to_string()))?;
        let signature = CmsSignature::new(self.hash_algorithm, raw);

        let blob = Pkcs7BuilderService::new(
            credential.certificate().clone(),
            self.hash_algorithm,
            signature_algorithm,
        )
        .build_signed(document, &attrs, &signature)?;

        Self::sanity_check(&blob)?;
        log::info!(
            "Signed {} byte document with {} ({} byte CMS blob)",
            document.len(),
            self.hash_algorithm,
            blob.len()
        );
        Ok(blob)
    }

    fn signature_algorithm(&self, key_type: Id) -> SigningResult<ObjectIdentifier> {
        match key_type {
            Id::RSA => Ok(constants::OID_RSA_ENCRYPTION),
            Id::EC => Ok(match self.hash_algorithm {
                HashAlgorithm::Sha384 => constants::OID_ECDSA_WITH_SHA384,
                HashAlgorithm::Sha512 => constants::OID_ECDSA_WITH_SHA512,
                _ => constants::OID_ECDSA_WITH_SHA256,
            }),
            other => Err(SigningError::InvalidInput(format!(
                "Unsupported signing key type {other:?}"
            ))),
        }
    }

    /// The blob must be non-empty, re-encode to identical bytes and parse as SignedData.
    fn sanity_check(blob: &CmsSignedData) -> SigningResult<()> {
        if blob.is_empty() {
            return Err(SigningError::SignatureGenerationFailed(
                "Serialized SignedData is empty".to_string(),
            ));
        }
        let reencoded = ContentInfo::from_der(blob.as_der())
            .and_then(|ci| ci.to_der())
            .map_err(|e| SigningError::SignatureGenerationFailed(format!("Output does not decode: {e}")))?;
        if reencoded != blob.as_der() {
            return Err(SigningError::SignatureGenerationFailed(
                "Output does not re-encode identically".to_string(),
            ));
        }
        ParsedSignedData::from_content_info_der(blob.as_der()).map_err(|e| {
            SigningError::SignatureGenerationFailed(format!("Output is not SignedData: {e}"))
        })?;
        Ok(())
    }
}
