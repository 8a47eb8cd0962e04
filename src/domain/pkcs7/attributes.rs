//! Signed attributes domain types.
//!
//! Each attribute is held as its complete DER `Attribute` SEQUENCE so the
//! canonical SET can be produced by plain byte ordering.

use std::fmt;

use der::asn1::ObjectIdentifier;
use der::{Tag, TagNumber};

use crate::domain::asn1;

#[derive(Clone)]
pub struct SignedAttributeLogical {
    pub oid: ObjectIdentifier, // e.g. 1.2.840.113549.1.9.3
    pub der: Vec<u8>,          // Complete Attribute SEQUENCE bytes
}

impl fmt::Debug for SignedAttributeLogical {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "SignedAttributeLogical(oid={}, len={})",
            self.oid,
            self.der.len()
        )
    }
}

/// Canonically ordered, concatenated DER of all attributes (without outer SET tag).
pub struct SignedAttributesCanonical {
    ordered: Vec<SignedAttributeLogical>,
    concatenated_der: Vec<u8>, // concatenation of attribute DER sequences
}

impl SignedAttributesCanonical {
    #[must_use]
    pub fn new(mut attrs: Vec<SignedAttributeLogical>) -> Self {
        attrs.sort_by(|a, b| a.der.cmp(&b.der)); // DER SET ordering
        let mut concatenated = Vec::new();
        for a in &attrs {
            concatenated.extend_from_slice(&a.der);
        }
        Self {
            ordered: attrs,
            concatenated_der: concatenated,
        }
    }
    #[must_use]
    pub fn ordered(&self) -> &[SignedAttributeLogical] {
        &self.ordered
    }
    #[must_use]
    pub fn len(&self) -> usize {
        self.ordered.len()
    }
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ordered.is_empty()
    }

    /// Explicit `SET OF` encoding; this is the input to the signature.
    pub fn set_der(&self) -> der::Result<Vec<u8>> {
        asn1::tlv(Tag::Set, &self.concatenated_der)
    }

    /// `[0] IMPLICIT` encoding embedded in `SignerInfo.signedAttrs`.
    pub fn implicit_der(&self) -> der::Result<Vec<u8>> {
        asn1::tlv(asn1::context_tag(TagNumber::N0), &self.concatenated_der)
    }
}

impl fmt::Debug for SignedAttributesCanonical {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "SignedAttributesCanonical(count={}, total_len={})",
            self.ordered.len(),
            self.concatenated_der.len()
        )
    }
}
