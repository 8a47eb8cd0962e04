//! PKCS#7 builder service with inline component assembly.
//! Implements CMS `SignedData` construction for attached signatures.
//!
//! Assembles the final `ContentInfo` holding the embedded document, the
//! signing certificate and a single `SignerInfo` with pre-encoded signed
//! attributes and signature. Every TLV goes through the DER encoder.

use der::asn1::{Any, ObjectIdentifier, OctetString};
use der::{Encode, Tag, TagNumber};
use x509_cert::spki::AlgorithmIdentifierOwned;

use crate::{
    domain::{
        asn1, constants,
        crypto::{CmsSignature, EndEntityCert},
        pkcs7::{
            CmsDigestAlgorithms, CmsEncapsulatedContent, CmsSignedData, CmsSignerInfos,
            SignedAttributesCanonical,
        },
    },
    HashAlgorithm, SigningError, SigningResult,
};

pub struct Pkcs7BuilderService {
    cert: EndEntityCert,
    hash_algorithm: HashAlgorithm,
    signature_algorithm: ObjectIdentifier,
}

impl Pkcs7BuilderService {
    /// Create service from the signing certificate, digest and signature algorithm OID.
    #[must_use]
    pub fn new(
        cert: EndEntityCert,
        hash_algorithm: HashAlgorithm,
        signature_algorithm: ObjectIdentifier,
    ) -> Self {
        Self {
            cert,
            hash_algorithm,
            signature_algorithm,
        }
    }

    /// Build the full `ContentInfo(signedData)` with the document attached.
    pub fn build_signed(
        &self,
        content: &[u8],
        signed_attrs: &SignedAttributesCanonical,
        signature: &CmsSignature,
    ) -> SigningResult<CmsSignedData> {
        if signature.is_empty() {
            return Err(SigningError::SignatureGenerationFailed(
                "Empty signature value".to_string(),
            ));
        }

        let mut body = constants::CMS_VERSION_1.to_der()?;
        body.extend_from_slice(self.build_digest_algorithms_component()?.as_der());
        body.extend_from_slice(self.build_encapsulated_content(content)?.as_der());
        body.extend_from_slice(&self.build_certificates_component()?);
        body.extend_from_slice(self.build_signer_infos(signed_attrs, signature)?.as_der());
        let signed_data = asn1::tlv(Tag::Sequence, &body)?;

        // ContentInfo: OID signedData + [0] EXPLICIT SignedData
        let mut ci_body = constants::OID_SIGNED_DATA.to_der()?;
        ci_body.extend_from_slice(&asn1::tlv(asn1::context_tag(TagNumber::N0), &signed_data)?);
        let content_info = asn1::tlv(Tag::Sequence, &ci_body)?;

        log::debug!(
            "Assembled SignedData: {} bytes content, {} bytes total",
            content.len(),
            content_info.len()
        );
        Ok(CmsSignedData::from_der(content_info))
    }

    fn null_params_algorithm(oid: ObjectIdentifier) -> SigningResult<Vec<u8>> {
        Ok(AlgorithmIdentifierOwned {
            oid,
            parameters: Some(Any::new(Tag::Null, Vec::new())?),
        }
        .to_der()?)
    }

    /// `digestAlgorithms` (SET of one).
    pub fn build_digest_algorithms_component(&self) -> SigningResult<CmsDigestAlgorithms> {
        let alg = Self::null_params_algorithm(self.hash_algorithm.oid())?;
        Ok(CmsDigestAlgorithms::from_der(asn1::tlv(Tag::Set, &alg)?))
    }

    /// `encapContentInfo` carrying id-data and the document as `[0] EXPLICIT OCTET STRING`.
    pub fn build_encapsulated_content(&self, content: &[u8]) -> SigningResult<CmsEncapsulatedContent> {
        let octets = OctetString::new(content)?.to_der()?;
        let mut body = constants::OID_DATA.to_der()?;
        body.extend_from_slice(&asn1::tlv(asn1::context_tag(TagNumber::N0), &octets)?);
        Ok(CmsEncapsulatedContent::from_der(asn1::tlv(
            Tag::Sequence,
            &body,
        )?))
    }

    /// `certificates [0] IMPLICIT CertificateSet`.
    pub fn build_certificates_component(&self) -> SigningResult<Vec<u8>> {
        Ok(asn1::tlv(
            asn1::context_tag(TagNumber::N0),
            self.cert.as_der(),
        )?)
    }

    /// `signerInfos` (single `SignerInfo`) from canonical signed attributes + raw signature.
    pub fn build_signer_infos(
        &self,
        signed_attrs: &SignedAttributesCanonical,
        signature: &CmsSignature,
    ) -> SigningResult<CmsSignerInfos> {
        let sid = self.cert.issuer_and_serial_der().map_err(|e| {
            SigningError::CertificateError(format!("Failed to read issuer and serial: {e}"))
        })?;

        let mut body = constants::CMS_VERSION_1.to_der()?;
        body.extend_from_slice(&sid);
        body.extend_from_slice(&Self::null_params_algorithm(self.hash_algorithm.oid())?);
        body.extend_from_slice(&signed_attrs.implicit_der()?);
        body.extend_from_slice(&self.signature_algorithm_der()?);
        body.extend_from_slice(&OctetString::new(signature.as_slice())?.to_der()?);

        let signer_info = asn1::tlv(Tag::Sequence, &body)?;
        Ok(CmsSignerInfos::from_der(asn1::tlv(Tag::Set, &signer_info)?))
    }

    /// rsaEncryption carries NULL parameters; ECDSA identifiers carry none.
    fn signature_algorithm_der(&self) -> SigningResult<Vec<u8>> {
        if self.signature_algorithm == constants::OID_RSA_ENCRYPTION {
            Self::null_params_algorithm(self.signature_algorithm)
        } else {
            Ok(AlgorithmIdentifierOwned {
                oid: self.signature_algorithm,
                parameters: None,
            }
            .to_der()?)
        }
    }
}
