//! PKCS#12 key derivation (RFC 7292 appendix B.2) over the `pkcs12` crate.
//!
//! Used for the integrity MAC key and for the legacy `pbeWithSHAAnd*`
//! ciphers (key material and IV).

pub use pkcs12::kdf::Pkcs12KeyType;

use crate::HashAlgorithm;

/// Password as a NUL terminated big-endian BMPString.
///
/// The empty password becomes the two-byte terminator `00 00`.
#[must_use]
pub fn bmp_password(passphrase: &str) -> Vec<u8> {
    let mut out: Vec<u8> = passphrase
        .encode_utf16()
        .flat_map(u16::to_be_bytes)
        .collect();
    out.extend_from_slice(&[0, 0]);
    out
}

/// Derive `length` bytes from `password` (already BMP encoded) and `salt`.
#[must_use]
pub fn derive_key(
    algo: HashAlgorithm,
    password: &[u8],
    salt: &[u8],
    id: Pkcs12KeyType,
    iterations: i32,
    length: usize,
) -> Vec<u8> {
    use pkcs12::kdf::derive_key as kdf;
    match algo {
        HashAlgorithm::Sha1 => kdf::<sha1::Sha1>(password, salt, id, iterations, length),
        HashAlgorithm::Sha256 => kdf::<sha2::Sha256>(password, salt, id, iterations, length),
        HashAlgorithm::Sha384 => kdf::<sha2::Sha384>(password, salt, id, iterations, length),
        HashAlgorithm::Sha512 => kdf::<sha2::Sha512>(password, salt, id, iterations, length),
    }
}
