//! Password based decryption of PKCS#12 safe contents and shrouded keys.
//!
//! PBES2 goes through the `pkcs5` crate; the legacy PKCS#12
//! `pbeWithSHAAnd*` schemes derive key and IV with the RFC 7292 KDF and
//! decrypt with OpenSSL. A failed decryption is reported as
//! [`SigningError::InvalidPassword`]; callers that already authenticated the
//! passphrase reinterpret it.

use der::{Decode, Encode};
use openssl::symm::Cipher;
use pkcs12::pbe_params::Pkcs12PbeParams;
use x509_cert::spki::AlgorithmIdentifierOwned;

use crate::domain::asn1::decode_any;
use crate::domain::constants;
use crate::domain::types::Passphrase;
use crate::infra::error::{SigningError, SigningResult};
use crate::services::pkcs12_kdf::{self, Pkcs12KeyType};
use crate::HashAlgorithm;

/// Decrypt `ciphertext` encrypted under `algorithm` with `passphrase`.
pub fn decrypt(
    algorithm: &AlgorithmIdentifierOwned,
    passphrase: &Passphrase,
    ciphertext: &[u8],
) -> SigningResult<Vec<u8>> {
    let oid = algorithm.oid;
    if oid == constants::OID_PBES2 {
        return decrypt_pbes2(algorithm, passphrase, ciphertext);
    }
    if let Some((cipher, key_len)) = legacy_cipher(&oid) {
        return decrypt_pkcs12_pbe(algorithm, cipher, key_len, passphrase, ciphertext);
    }
    Err(SigningError::CorruptedContainer(format!(
        "Unsupported encryption scheme {oid}"
    )))
}

fn legacy_cipher(oid: &der::asn1::ObjectIdentifier) -> Option<(Cipher, usize)> {
    match *oid {
        constants::OID_PBE_SHA1_3DES => Some((Cipher::des_ede3_cbc(), 24)),
        constants::OID_PBE_SHA1_2DES => Some((Cipher::des_ede3_cbc(), 16)),
        constants::OID_PBE_SHA1_RC2_128 => Some((Cipher::rc2_cbc(), 16)),
        constants::OID_PBE_SHA1_RC2_40 => Some((Cipher::rc2_40_cbc(), 5)),
        _ => None,
    }
}

fn params<T: der::DecodeOwned>(algorithm: &AlgorithmIdentifierOwned) -> SigningResult<T> {
    let any = algorithm.parameters.as_ref().ok_or_else(|| {
        SigningError::CorruptedContainer(format!(
            "Missing parameters for encryption scheme {}",
            algorithm.oid
        ))
    })?;
    decode_any(any).map_err(|e| {
        SigningError::CorruptedContainer(format!(
            "Malformed parameters for encryption scheme {}: {e}",
            algorithm.oid
        ))
    })
}

fn run_cipher(cipher: Cipher, key: &[u8], iv: &[u8], ciphertext: &[u8]) -> SigningResult<Vec<u8>> {
    openssl::symm::decrypt(cipher, key, Some(iv), ciphertext).map_err(|e| {
        log::debug!("Decryption failed: {e}");
        SigningError::InvalidPassword
    })
}

fn decrypt_pkcs12_pbe(
    algorithm: &AlgorithmIdentifierOwned,
    cipher: Cipher,
    key_len: usize,
    passphrase: &Passphrase,
    ciphertext: &[u8],
) -> SigningResult<Vec<u8>> {
    let params: Pkcs12PbeParams = params(algorithm)?;
    let salt = params.salt.as_bytes();

    let mut candidates = vec![pkcs12_kdf::bmp_password(passphrase.as_str())];
    if passphrase.is_empty() {
        candidates.push(Vec::new());
    }

    let mut last_err = SigningError::InvalidPassword;
    for password in candidates {
        let mut key = pkcs12_kdf::derive_key(
            HashAlgorithm::Sha1,
            &password,
            salt,
            Pkcs12KeyType::EncryptionKey,
            params.iterations,
            key_len,
        );
        if key_len == 16 && algorithm.oid == constants::OID_PBE_SHA1_2DES {
            // two-key triple DES: K1 K2 K1
            let k1 = key[..8].to_vec();
            key.extend_from_slice(&k1);
        }
        let iv = pkcs12_kdf::derive_key(
            HashAlgorithm::Sha1,
            &password,
            salt,
            Pkcs12KeyType::Iv,
            params.iterations,
            cipher.iv_len().unwrap_or(8),
        );
        match run_cipher(cipher, &key, &iv, ciphertext) {
            Ok(plain) => return Ok(plain),
            Err(e) => last_err = e,
        }
    }
    Err(last_err)
}

fn decrypt_pbes2(
    algorithm: &AlgorithmIdentifierOwned,
    passphrase: &Passphrase,
    ciphertext: &[u8],
) -> SigningResult<Vec<u8>> {
    let der = algorithm.to_der()?;
    let scheme = pkcs5::EncryptionScheme::from_der(&der).map_err(|e| {
        SigningError::CorruptedContainer(format!("Unsupported PBES2 parameters: {e}"))
    })?;
    scheme
        .decrypt(passphrase.as_bytes(), ciphertext)
        .map_err(|e| {
            log::debug!("PBES2 decryption failed: {e}");
            SigningError::InvalidPassword
        })
}
