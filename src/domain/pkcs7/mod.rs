//! CMS (PKCS#7) `SignedData` domain types.
//! Assembly works on pre-encoded DER components; reading goes through [`ParsedSignedData`].

use std::fmt;

use base64::Engine;

pub mod attributes;
pub mod signed_data;

pub use attributes::{SignedAttributeLogical, SignedAttributesCanonical};
pub use signed_data::{EncapsulatedContentInfo, ParsedSignedData, ParsedSignerInfo};

/// Complete DER `ContentInfo` wrapping a `SignedData`.
#[derive(Clone, PartialEq, Eq)]
pub struct CmsSignedData {
    der: Vec<u8>,
}

// Incremental component wrappers to decouple assembly steps.
pub struct CmsDigestAlgorithms {
    der: Vec<u8>,
} // SET OF AlgorithmIdentifier
pub struct CmsEncapsulatedContent {
    der: Vec<u8>,
} // EncapsulatedContentInfo carrying id-data
pub struct CmsSignerInfos {
    der: Vec<u8>,
} // SET OF SignerInfo

impl CmsDigestAlgorithms {
    #[must_use]
    pub fn from_der(der: Vec<u8>) -> Self {
        Self { der }
    }
    #[must_use]
    pub fn as_der(&self) -> &[u8] {
        &self.der
    }
}
impl CmsEncapsulatedContent {
    #[must_use]
    pub fn from_der(der: Vec<u8>) -> Self {
        Self { der }
    }
    #[must_use]
    pub fn as_der(&self) -> &[u8] {
        &self.der
    }
}
impl CmsSignerInfos {
    #[must_use]
    pub fn from_der(der: Vec<u8>) -> Self {
        Self { der }
    }
    #[must_use]
    pub fn as_der(&self) -> &[u8] {
        &self.der
    }
}

impl CmsSignedData {
    #[must_use]
    pub fn from_der(der: Vec<u8>) -> Self {
        Self { der }
    }
    #[must_use]
    pub fn as_der(&self) -> &[u8] {
        &self.der
    }
    #[must_use]
    pub fn into_der(self) -> Vec<u8> {
        self.der
    }
    /// Standard (padded) Base64 of the DER bytes.
    #[must_use]
    pub fn to_base64(&self) -> String {
        base64::engine::general_purpose::STANDARD.encode(&self.der)
    }
    #[must_use]
    pub fn len(&self) -> usize {
        self.der.len()
    }
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.der.is_empty()
    }
}

impl fmt::Debug for CmsSignedData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CmsSignedData(len={})", self.der.len())
    }
}
