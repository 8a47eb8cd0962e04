//! BER to DER re-encoding of whole containers through OpenSSL.
//!
//! The `der` based parsers only accept DER. Producers that emit
//! indefinite lengths or constructed strings are re-encoded once before
//! the strict parse is retried.

use openssl::pkcs12::Pkcs12;
use openssl::pkcs7::Pkcs7;

/// DER form of a BER encoded PFX, or `None` when OpenSSL cannot read it
/// or it was already DER.
#[must_use]
pub fn pkcs12_to_der(bytes: &[u8]) -> Option<Vec<u8>> {
    let reencoded = Pkcs12::from_der(bytes).and_then(|pfx| pfx.to_der());
    changed(bytes, reencoded, "PFX")
}

/// DER form of a BER encoded CMS ContentInfo, or `None` when OpenSSL cannot
/// read it or it was already DER.
#[must_use]
pub fn pkcs7_to_der(bytes: &[u8]) -> Option<Vec<u8>> {
    let reencoded = Pkcs7::from_der(bytes).and_then(|cms| cms.to_der());
    changed(bytes, reencoded, "CMS")
}

fn changed(
    original: &[u8],
    reencoded: Result<Vec<u8>, openssl::error::ErrorStack>,
    what: &str,
) -> Option<Vec<u8>> {
    match reencoded {
        Ok(der) if der.as_slice() != original => {
            log::debug!(
                "Re-encoded {what} input as DER ({} -> {} bytes)",
                original.len(),
                der.len()
            );
            Some(der)
        }
        Ok(_) => None,
        Err(e) => {
            log::debug!("OpenSSL could not read {what} input: {e}");
            None
        }
    }
}
