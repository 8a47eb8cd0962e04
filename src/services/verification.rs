//! CMS `SignedData` verification.
//!
//! Never fails: every problem collapses into `valid == false`, while each
//! descriptive field is still recovered on its own where possible.

use std::time::Duration;

use chrono::{DateTime, SecondsFormat, Utc};
use openssl::sign::Verifier;

use crate::domain::crypto::{DigestBytes, EndEntityCert};
use crate::domain::pkcs7::{ParsedSignedData, ParsedSignerInfo};
use crate::domain::verification::VerificationResult;
use crate::infra::error::SigningResult;
use crate::services::ber;
use crate::services::trust::TrustAnchors;
use crate::HashAlgorithm;

#[derive(Debug, Clone, Default)]
pub struct CmsVerifier {
    trust_anchors: Option<TrustAnchors>,
}

impl CmsVerifier {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Also report whether the signer chains to `anchors`.
    #[must_use]
    pub fn with_trust_anchors(mut self, anchors: TrustAnchors) -> Self {
        self.trust_anchors = Some(anchors);
        self
    }

    /// Verify a `ContentInfo(signedData)` blob. BER input is re-encoded as DER first.
    #[must_use]
    pub fn verify(&self, blob: &[u8]) -> VerificationResult {
        let parsed = match Self::parse(blob) {
            Ok(parsed) => parsed,
            Err(e) => {
                log::info!("Input is not a CMS SignedData structure: {e}");
                return VerificationResult::invalid();
            }
        };

        let Some(signer) = parsed.signer_infos.first() else {
            log::info!("SignedData carries no SignerInfo");
            return VerificationResult::invalid();
        };
        if parsed.signer_infos.len() > 1 {
            log::warn!(
                "SignedData carries {} signers; only the first is evaluated",
                parsed.signer_infos.len()
            );
        }

        let cert = parsed.signer_certificate(signer);

        let valid = match Self::check_signature(&parsed, signer, cert) {
            Ok(valid) => valid,
            Err(e) => {
                log::info!("Signature check aborted: {e}");
                false
            }
        };

        let result = VerificationResult {
            valid,
            signer_name: cert.and_then(EndEntityCert::common_name),
            signing_time: match signer.signing_time() {
                Ok(time) => time.and_then(format_signing_time),
                Err(e) => {
                    log::debug!("Unreadable signing-time attribute: {e}");
                    None
                }
            },
            document_hash_hex: match signer.message_digest() {
                Ok(digest) => digest.map(hex::encode),
                Err(e) => {
                    log::debug!("Unreadable message-digest attribute: {e}");
                    None
                }
            },
            digest_algorithm_name: Some(HashAlgorithm::name_for_oid(
                &signer.digest_algorithm.oid,
            )),
            issuer_name: cert.and_then(EndEntityCert::issuer_name),
            serial_number_hex: cert.and_then(EndEntityCert::serial_number_hex),
            trusted: self.trust_anchors.as_ref().map(|anchors| {
                cert.is_some_and(|leaf| {
                    let others: Vec<EndEntityCert> = parsed
                        .certificates
                        .iter()
                        .filter(|c| *c != leaf)
                        .cloned()
                        .collect();
                    anchors.is_trusted(leaf, &others)
                })
            }),
        };

        log::info!(
            "Verification {}",
            if result.valid { "succeeded" } else { "failed" }
        );
        result
    }

    fn parse(blob: &[u8]) -> der::Result<ParsedSignedData> {
        ParsedSignedData::from_content_info_der(blob).or_else(|e| {
            match ber::pkcs7_to_der(blob) {
                Some(der) => ParsedSignedData::from_content_info_der(&der),
                None => Err(e),
            }
        })
    }

    fn check_signature(
        parsed: &ParsedSignedData,
        signer: &ParsedSignerInfo,
        cert: Option<&EndEntityCert>,
    ) -> SigningResult<bool> {
        let Some(content) = parsed.content() else {
            log::info!("Detached SignedData cannot be verified without the content");
            return Ok(false);
        };
        let Some(algo) = HashAlgorithm::from_oid(&signer.digest_algorithm.oid) else {
            log::info!(
                "Unsupported digest algorithm {}",
                signer.digest_algorithm.oid
            );
            return Ok(false);
        };
        let Some(cert) = cert else {
            log::info!("No certificate embedded for the signer");
            return Ok(false);
        };

        let signed_bytes = match signer.signed_attrs_set_der()? {
            Some(set_der) => {
                let computed = algo.digest(content);
                match signer.message_digest()?.map(|d| DigestBytes::new(algo, d)) {
                    Some(Ok(claimed)) if claimed == computed => {}
                    Some(Ok(_)) => {
                        log::info!("Content digest does not match the message-digest attribute");
                        return Ok(false);
                    }
                    Some(Err(e)) => {
                        log::info!("Malformed message-digest attribute: {e}");
                        return Ok(false);
                    }
                    None => {
                        log::info!("Signed attributes lack a message-digest");
                        return Ok(false);
                    }
                }
                if signer.content_type()? != Some(parsed.encap_content_info.econtent_type) {
                    log::info!("content-type attribute does not match the encapsulated content");
                    return Ok(false);
                }
                set_der
            }
            None => content.to_vec(),
        };

        let public_key = cert.to_openssl()?.public_key()?;
        let mut verifier = Verifier::new(algo.message_digest(), &public_key)?;
        verifier.update(&signed_bytes)?;
        let ok = verifier.verify(signer.signature.as_bytes())?;
        if !ok {
            log::info!("Signature value does not verify under the signer certificate");
        }
        Ok(ok)
    }
}

/// RFC 3339 / ISO-8601 UTC with millisecond precision, e.g. `2024-01-02T03:04:05.000Z`.
fn format_signing_time(since_epoch: Duration) -> Option<String> {
    let secs = i64::try_from(since_epoch.as_secs()).ok()?;
    DateTime::<Utc>::from_timestamp(secs, since_epoch.subsec_nanos())
        .map(|t| t.to_rfc3339_opts(SecondsFormat::Millis, true))
}
