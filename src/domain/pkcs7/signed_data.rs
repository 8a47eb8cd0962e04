//! Structured read access to a CMS `SignedData` blob.
//!
//! Decoding is hand-sequenced rather than derived: optional implicitly tagged
//! members (`certificates`, `crls`, `signedAttrs`) are located by peeking tags
//! and kept as raw DER so the signed-attribute bytes can be verified exactly
//! as they were produced.

use std::time::Duration;

use der::asn1::{Any, GeneralizedTime, ObjectIdentifier, OctetString, UtcTime};
use der::{Decode, ErrorKind, Reader, Sequence, SliceReader, Tag, TagNumber, Tagged};
use x509_cert::spki::AlgorithmIdentifierOwned;

use crate::domain::asn1::{self, ContentInfo, RawAttribute};
use crate::domain::constants;
use crate::domain::crypto::EndEntityCert;

/// `EncapsulatedContentInfo ::= SEQUENCE { eContentType, eContent [0] EXPLICIT OCTET STRING OPTIONAL }`
#[derive(Clone, Debug, Eq, PartialEq, Sequence)]
pub struct EncapsulatedContentInfo {
    pub econtent_type: ObjectIdentifier,
    #[asn1(context_specific = "0", tag_mode = "EXPLICIT", optional = "true")]
    pub econtent: Option<OctetString>,
}

/// Decoded `SignedData`.
#[derive(Clone, Debug)]
pub struct ParsedSignedData {
    pub version: u8,
    pub digest_algorithms: Vec<AlgorithmIdentifierOwned>,
    pub encap_content_info: EncapsulatedContentInfo,
    pub certificates: Vec<EndEntityCert>,
    pub signer_infos: Vec<ParsedSignerInfo>,
}

/// Decoded `SignerInfo`.
#[derive(Clone, Debug)]
pub struct ParsedSignerInfo {
    pub version: u8,
    pub sid: Any,
    pub digest_algorithm: AlgorithmIdentifierOwned,
    pub signed_attrs: Option<Any>,
    pub signature_algorithm: AlgorithmIdentifierOwned,
    pub signature: OctetString,
}

impl ParsedSignedData {
    /// Parse a DER `ContentInfo` that must wrap `signedData`.
    pub fn from_content_info_der(bytes: &[u8]) -> der::Result<Self> {
        let content_info = ContentInfo::from_der(bytes)?;
        if content_info.content_type != constants::OID_SIGNED_DATA {
            return Err(ErrorKind::OidUnknown {
                oid: content_info.content_type,
            }
            .into());
        }
        let content = content_info
            .content
            .ok_or_else(|| der::Error::from(ErrorKind::Value { tag: Tag::Sequence }))?;
        Self::from_any(&content)
    }

    fn from_any(any: &Any) -> der::Result<Self> {
        any.tag().assert_eq(Tag::Sequence)?;
        let mut reader = SliceReader::new(any.value())?;

        let version = u8::decode(&mut reader)?;
        let digest_set = Any::decode(&mut reader)?;
        digest_set.tag().assert_eq(Tag::Set)?;
        let digest_algorithms = asn1::decode_items(digest_set.value())?;
        let encap_content_info = EncapsulatedContentInfo::decode(&mut reader)?;

        let mut certificates = Vec::new();
        let mut signer_infos = None;
        while !reader.is_finished() {
            let field = Any::decode(&mut reader)?;
            match field.tag() {
                tag if asn1::is_context(tag, TagNumber::N0) => {
                    certificates = Self::certificate_set(&field)?;
                }
                tag if asn1::is_context(tag, TagNumber::N1) => {
                    log::debug!("Ignoring revocation info choices in SignedData");
                }
                Tag::Set => signer_infos = Some(field),
                other => {
                    return Err(ErrorKind::TagUnexpected {
                        expected: Some(Tag::Set),
                        actual: other,
                    }
                    .into())
                }
            }
        }

        let signer_set =
            signer_infos.ok_or_else(|| der::Error::from(ErrorKind::Value { tag: Tag::Set }))?;
        let signer_infos = asn1::decode_items::<Any>(signer_set.value())?
            .iter()
            .map(ParsedSignerInfo::from_any)
            .collect::<der::Result<Vec<_>>>()?;

        Ok(Self {
            version,
            digest_algorithms,
            encap_content_info,
            certificates,
            signer_infos,
        })
    }

    /// Only `Certificate` choices are kept; attribute/other certificate formats are skipped.
    fn certificate_set(field: &Any) -> der::Result<Vec<EndEntityCert>> {
        let mut certs = Vec::new();
        for choice in asn1::decode_items::<Any>(field.value())? {
            if choice.tag() == Tag::Sequence {
                certs.push(EndEntityCert::from_der(der::Encode::to_der(&choice)?));
            }
        }
        Ok(certs)
    }

    /// Embedded content octets (attached mode only).
    #[must_use]
    pub fn content(&self) -> Option<&[u8]> {
        self.encap_content_info
            .econtent
            .as_ref()
            .map(OctetString::as_bytes)
    }

    /// Certificate identified by the signer's issuer+serial, else the first embedded one.
    #[must_use]
    pub fn signer_certificate(&self, signer: &ParsedSignerInfo) -> Option<&EndEntityCert> {
        let sid = der::Encode::to_der(&signer.sid).ok();
        self.certificates
            .iter()
            .find(|cert| {
                sid.is_some() && cert.issuer_and_serial_der().ok().as_deref() == sid.as_deref()
            })
            .or_else(|| self.certificates.first())
    }
}

impl ParsedSignerInfo {
    fn from_any(any: &Any) -> der::Result<Self> {
        any.tag().assert_eq(Tag::Sequence)?;
        let mut reader = SliceReader::new(any.value())?;

        let version = u8::decode(&mut reader)?;
        let sid = Any::decode(&mut reader)?;
        let digest_algorithm = AlgorithmIdentifierOwned::decode(&mut reader)?;
        let signed_attrs = if asn1::is_context(reader.peek_tag()?, TagNumber::N0) {
            Some(Any::decode(&mut reader)?)
        } else {
            None
        };
        let signature_algorithm = AlgorithmIdentifierOwned::decode(&mut reader)?;
        let signature = OctetString::decode(&mut reader)?;

        Ok(Self {
            version,
            sid,
            digest_algorithm,
            signed_attrs,
            signature_algorithm,
            signature,
        })
    }

    /// The signed attributes re-tagged as an explicit SET, i.e. the bytes the signature covers.
    pub fn signed_attrs_set_der(&self) -> der::Result<Option<Vec<u8>>> {
        self.signed_attrs
            .as_ref()
            .map(|attrs| asn1::tlv(Tag::Set, attrs.value()))
            .transpose()
    }

    pub fn signed_attributes(&self) -> der::Result<Vec<RawAttribute>> {
        match &self.signed_attrs {
            Some(attrs) => asn1::decode_items(attrs.value()),
            None => Ok(Vec::new()),
        }
    }

    /// First value of the signed attribute `oid`.
    pub fn attribute_value(&self, oid: ObjectIdentifier) -> der::Result<Option<Any>> {
        for attr in self.signed_attributes()? {
            if attr.attr_type == oid {
                return attr.first_value();
            }
        }
        Ok(None)
    }

    pub fn content_type(&self) -> der::Result<Option<ObjectIdentifier>> {
        self.attribute_value(constants::OID_CONTENT_TYPE)?
            .map(|v| asn1::decode_any::<ObjectIdentifier>(&v))
            .transpose()
    }

    pub fn message_digest(&self) -> der::Result<Option<Vec<u8>>> {
        self.attribute_value(constants::OID_MESSAGE_DIGEST)?
            .map(|v| asn1::decode_any::<OctetString>(&v).map(|o| o.as_bytes().to_vec()))
            .transpose()
    }

    /// Signing time as a duration since the Unix epoch (UTCTime or GeneralizedTime).
    pub fn signing_time(&self) -> der::Result<Option<Duration>> {
        let Some(value) = self.attribute_value(constants::OID_SIGNING_TIME)? else {
            return Ok(None);
        };
        let since_epoch = match value.tag() {
            Tag::UtcTime => asn1::decode_any::<UtcTime>(&value)?.to_unix_duration(),
            Tag::GeneralizedTime => {
                asn1::decode_any::<GeneralizedTime>(&value)?.to_unix_duration()
            }
            other => {
                return Err(ErrorKind::TagUnexpected {
                    expected: Some(Tag::UtcTime),
                    actual: other,
                }
                .into())
            }
        };
        Ok(Some(since_epoch))
    }
}
