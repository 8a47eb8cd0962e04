use std::fmt;

use super::HashAlgorithm;

/// Raw signature value placed in `SignerInfo.signature`.
/// RSA keys yield a PKCS#1 v1.5 block, EC keys a DER `Ecdsa-Sig-Value`.
#[derive(Clone, Eq, PartialEq)]
pub struct CmsSignature {
    algo: HashAlgorithm, // digest used over the signed attributes
    bytes: Box<[u8]>,
}

impl CmsSignature {
    #[must_use]
    pub fn new(algo: HashAlgorithm, bytes: Vec<u8>) -> Self {
        Self {
            algo,
            bytes: bytes.into_boxed_slice(),
        }
    }
    #[must_use]
    pub fn algorithm(&self) -> HashAlgorithm {
        self.algo
    }
    #[must_use]
    pub fn as_slice(&self) -> &[u8] {
        &self.bytes
    }
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

impl fmt::Debug for CmsSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "CmsSignature(algo={:?}, len={})",
            self.algo,
            self.bytes.len()
        )
    }
}
