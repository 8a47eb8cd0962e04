//! Foundational cryptographic domain types.
//!
//! Provides strongly-typed wrappers for cryptographic artifacts including:
//! - Hash algorithms, streaming hashers and digest values with size validation
//! - Certificate representation with subject/issuer accessors
//! - Signature values paired with their digest algorithm

mod cert;
mod digest_bytes;
mod hash;
mod signature;

pub use cert::EndEntityCert;
pub use digest_bytes::{DigestBytes, DigestBytesError};
pub use hash::{HashAlgorithm, StreamingDigest};
pub use signature::CmsSignature;
