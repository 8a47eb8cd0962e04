//! DER plumbing shared by the PKCS#12 and CMS structures.
//!
//! Both formats nest opaque blobs (`[0] EXPLICIT ANY`, `SET OF Attribute`)
//! whose exact encoding has to be preserved, so those fields are kept as
//! [`Any`] and decoded lazily with the helpers below.

use der::asn1::{Any, ObjectIdentifier};
use der::{Decode, DecodeOwned, Encode, Reader, Sequence, SliceReader, Tag, TagNumber, Tagged};

/// `ContentInfo ::= SEQUENCE { contentType, content [0] EXPLICIT ANY OPTIONAL }`
#[derive(Clone, Debug, Eq, PartialEq, Sequence)]
pub struct ContentInfo {
    pub content_type: ObjectIdentifier,
    #[asn1(context_specific = "0", tag_mode = "EXPLICIT", optional = "true")]
    pub content: Option<Any>,
}

/// Generic attribute with its value set kept undecoded.
///
/// `SET OF` ordering is not enforced by every producer, so the values are
/// decoded item by item instead of through a sorted collection.
#[derive(Clone, Debug, Eq, PartialEq, Sequence)]
pub struct RawAttribute {
    pub attr_type: ObjectIdentifier,
    pub attr_values: Any,
}

impl RawAttribute {
    /// Decoded members of the `attrValues` SET.
    pub fn values(&self) -> der::Result<Vec<Any>> {
        self.attr_values.tag().assert_eq(Tag::Set)?;
        decode_items(self.attr_values.value())
    }

    /// First member of the `attrValues` SET, if any.
    pub fn first_value(&self) -> der::Result<Option<Any>> {
        Ok(self.values()?.into_iter().next())
    }
}

/// Decode consecutive DER items from the content octets of a SEQUENCE/SET.
pub fn decode_items<'a, T: Decode<'a>>(bytes: &'a [u8]) -> der::Result<Vec<T>> {
    let mut reader = SliceReader::new(bytes)?;
    let mut items = Vec::new();
    while !reader.is_finished() {
        items.push(T::decode(&mut reader)?);
    }
    Ok(items)
}

/// Re-interpret an [`Any`] as a concrete DER type.
pub fn decode_any<T: DecodeOwned>(any: &Any) -> der::Result<T> {
    T::from_der(&any.to_der()?)
}

/// Encode `value` as a complete TLV with the given tag.
pub fn tlv(tag: Tag, value: &[u8]) -> der::Result<Vec<u8>> {
    Any::new(tag, value.to_vec())?.to_der()
}

/// Constructed context-specific tag `[number]`.
#[must_use]
pub fn context_tag(number: TagNumber) -> Tag {
    Tag::ContextSpecific {
        constructed: true,
        number,
    }
}

/// Returns true when `tag` is the context-specific tag `[number]`.
#[must_use]
pub fn is_context(tag: Tag, number: TagNumber) -> bool {
    matches!(tag, Tag::ContextSpecific { number: n, .. } if n == number)
}
