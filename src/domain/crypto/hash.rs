//! Hash algorithm domain type.
//!
//! Extends the crate level `HashAlgorithm` with OID mapping, display names,
//! OpenSSL digest handles and one-shot/streaming hashing.

use der::asn1::ObjectIdentifier;
use openssl::hash::MessageDigest;
use sha1::Sha1;
use sha2::{Digest, Sha256, Sha384, Sha512};

use super::DigestBytes;
use crate::domain::constants;
pub use crate::HashAlgorithm;

/// Digest OID to display name table owned by the verifier side.
const DIGEST_NAMES: &[(ObjectIdentifier, HashAlgorithm)] = &[
    (constants::OID_SHA1, HashAlgorithm::Sha1),
    (constants::OID_SHA256, HashAlgorithm::Sha256),
    (constants::OID_SHA384, HashAlgorithm::Sha384),
    (constants::OID_SHA512, HashAlgorithm::Sha512),
];

impl HashAlgorithm {
    /// Canonical hyphenated name, e.g. `SHA-512`.
    #[must_use]
    pub fn display_name(&self) -> &'static str {
        match self {
            HashAlgorithm::Sha1 => "SHA-1",
            HashAlgorithm::Sha256 => "SHA-256",
            HashAlgorithm::Sha384 => "SHA-384",
            HashAlgorithm::Sha512 => "SHA-512",
        }
    }

    #[must_use]
    pub fn oid(&self) -> ObjectIdentifier {
        match self {
            HashAlgorithm::Sha1 => constants::OID_SHA1,
            HashAlgorithm::Sha256 => constants::OID_SHA256,
            HashAlgorithm::Sha384 => constants::OID_SHA384,
            HashAlgorithm::Sha512 => constants::OID_SHA512,
        }
    }

    #[must_use]
    pub fn from_oid(oid: &ObjectIdentifier) -> Option<Self> {
        DIGEST_NAMES
            .iter()
            .find(|(known, _)| known == oid)
            .map(|(_, algo)| *algo)
    }

    /// Display name for a digest OID; unknown identifiers pass through in dotted form.
    #[must_use]
    pub fn name_for_oid(oid: &ObjectIdentifier) -> String {
        Self::from_oid(oid).map_or_else(|| oid.to_string(), |a| a.display_name().to_string())
    }

    /// Whether the algorithm may be used to produce new signatures.
    #[must_use]
    pub fn is_signing_grade(&self) -> bool {
        !matches!(self, HashAlgorithm::Sha1)
    }

    #[must_use]
    pub fn message_digest(&self) -> MessageDigest {
        match self {
            HashAlgorithm::Sha1 => MessageDigest::sha1(),
            HashAlgorithm::Sha256 => MessageDigest::sha256(),
            HashAlgorithm::Sha384 => MessageDigest::sha384(),
            HashAlgorithm::Sha512 => MessageDigest::sha512(),
        }
    }

    /// One-shot digest of `data`.
    #[must_use]
    pub fn digest(&self, data: &[u8]) -> DigestBytes {
        let mut hasher = StreamingDigest::new(*self);
        hasher.update(data);
        hasher.finalize()
    }
}

/// Incremental hasher used for chunked reads of large documents.
pub enum StreamingDigest {
    Sha1(Sha1),
    Sha256(Sha256),
    Sha384(Sha384),
    Sha512(Sha512),
}

impl StreamingDigest {
    #[must_use]
    pub fn new(algo: HashAlgorithm) -> Self {
        match algo {
            HashAlgorithm::Sha1 => StreamingDigest::Sha1(Sha1::new()),
            HashAlgorithm::Sha256 => StreamingDigest::Sha256(Sha256::new()),
            HashAlgorithm::Sha384 => StreamingDigest::Sha384(Sha384::new()),
            HashAlgorithm::Sha512 => StreamingDigest::Sha512(Sha512::new()),
        }
    }

    pub fn update(&mut self, chunk: &[u8]) {
        match self {
            StreamingDigest::Sha1(h) => h.update(chunk),
            StreamingDigest::Sha256(h) => h.update(chunk),
            StreamingDigest::Sha384(h) => h.update(chunk),
            StreamingDigest::Sha512(h) => h.update(chunk),
        }
    }

    #[must_use]
    pub fn finalize(self) -> DigestBytes {
        let (algo, bytes) = match self {
            StreamingDigest::Sha1(h) => (HashAlgorithm::Sha1, h.finalize().to_vec()),
            StreamingDigest::Sha256(h) => (HashAlgorithm::Sha256, h.finalize().to_vec()),
            StreamingDigest::Sha384(h) => (HashAlgorithm::Sha384, h.finalize().to_vec()),
            StreamingDigest::Sha512(h) => (HashAlgorithm::Sha512, h.finalize().to_vec()),
        };
        DigestBytes::from_parts(algo, bytes)
    }
}
