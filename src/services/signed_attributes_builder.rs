//! Service for constructing and canonicalizing signed attributes.
//!
//! Produces the three authenticated attributes carried by every signature:
//! content-type (`data`), message-digest and signing-time.

use std::time::{SystemTime, UNIX_EPOCH};

use der::asn1::{GeneralizedTime, ObjectIdentifier, OctetString, UtcTime};
use der::{DateTime, Encode, Tag};

use crate::domain::asn1;
use crate::domain::constants;
use crate::domain::crypto::DigestBytes;
use crate::domain::pkcs7::{SignedAttributeLogical, SignedAttributesCanonical};
use crate::infra::error::{SigningError, SigningResult};

/// Last year representable as UTCTime; later instants use GeneralizedTime.
const UTC_TIME_MAX_YEAR: u16 = 2049;

pub struct SignedAttributesBuilder; // stateless

impl Default for SignedAttributesBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl SignedAttributesBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Build canonical attributes given already assembled Attribute SEQUENCE DER blobs.
    #[must_use]
    pub fn canonicalize(
        &self,
        raw_attributes: Vec<SignedAttributeLogical>,
    ) -> SignedAttributesCanonical {
        SignedAttributesCanonical::new(raw_attributes)
    }

    /// content-type, message-digest and signing-time, in DER SET order.
    pub fn build(
        &self,
        message_digest: &DigestBytes,
        signing_time: SystemTime,
    ) -> SigningResult<SignedAttributesCanonical> {
        let attrs = vec![
            attribute(constants::OID_CONTENT_TYPE, &constants::OID_DATA.to_der()?)?,
            attribute(
                constants::OID_MESSAGE_DIGEST,
                &OctetString::new(message_digest.as_slice())?.to_der()?,
            )?,
            attribute(constants::OID_SIGNING_TIME, &encode_signing_time(signing_time)?)?,
        ];
        Ok(self.canonicalize(attrs))
    }
}

/// `Attribute ::= SEQUENCE { attrType OID, attrValues SET OF AttributeValue }` with one value.
fn attribute(oid: ObjectIdentifier, value_der: &[u8]) -> der::Result<SignedAttributeLogical> {
    let mut body = oid.to_der()?;
    body.extend_from_slice(&asn1::tlv(Tag::Set, value_der)?);
    Ok(SignedAttributeLogical {
        oid,
        der: asn1::tlv(Tag::Sequence, &body)?,
    })
}

/// RFC 5652 §11.3: UTCTime through 2049, GeneralizedTime afterwards.
pub fn encode_signing_time(time: SystemTime) -> SigningResult<Vec<u8>> {
    let since_epoch = time
        .duration_since(UNIX_EPOCH)
        .map_err(|_| SigningError::InvalidInput("Signing time precedes 1970".to_string()))?;
    let date_time = DateTime::from_unix_duration(since_epoch)?;
    let encoded = if date_time.year() <= UTC_TIME_MAX_YEAR {
        UtcTime::from_date_time(date_time)?.to_der()?
    } else {
        GeneralizedTime::from_date_time(date_time).to_der()?
    };
    Ok(encoded)
}
