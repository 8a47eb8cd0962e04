//! PKCS#12 (PFX) container reader.
//!
//! Authenticates the container MAC, decrypts every safe-contents block and
//! classifies the bags into keys and certificates together with their
//! `friendlyName` / `localKeyId` attributes.

use der::asn1::{Any, OctetString};
use der::{Decode, Encode, ErrorKind, Tag, Tagged};
use openssl::memcmp;
use openssl::pkey::PKey;
use openssl::sign::Signer;
use pkcs12::cert_type::CertBag as CertBagValue;
use pkcs12::mac_data::MacData;
use pkcs12::pbe_params::EncryptedPrivateKeyInfo;
use pkcs12::pfx::Pfx;

use crate::domain::asn1::{self, ContentInfo, RawAttribute};
use crate::domain::constants;
use crate::domain::crypto::EndEntityCert;
use crate::domain::pkcs12::asn1::{EncryptedData, SafeBag};
use crate::domain::pkcs12::{BagAttributes, BagInventory, CertBag, KeyBag, SafeBagEntry};
use crate::domain::types::Passphrase;
use crate::infra::error::{SigningError, SigningResult};
use crate::services::pkcs12_kdf::{self, Pkcs12KeyType};
use crate::services::{ber, pbe};
use crate::HashAlgorithm;

/// Nested `safeContentsBag` depth accepted before the container is rejected.
const MAX_NESTING: usize = 8;

fn corrupted(context: &str) -> impl Fn(der::Error) -> SigningError + '_ {
    move |e| SigningError::CorruptedContainer(format!("{context}: {e}"))
}

pub struct Pkcs12Reader<'a> {
    passphrase: &'a Passphrase,
    mac_verified: bool,
}

impl<'a> Pkcs12Reader<'a> {
    #[must_use]
    pub fn new(passphrase: &'a Passphrase) -> Self {
        Self {
            passphrase,
            mac_verified: false,
        }
    }

    /// Parse, authenticate and decrypt `container`, returning every key and certificate bag.
    pub fn read(mut self, container: &[u8]) -> SigningResult<BagInventory> {
        let pfx = Self::decode_pfx(container)?;
        if pfx.auth_safe.content_type != constants::OID_DATA {
            return Err(SigningError::CorruptedContainer(format!(
                "Unsupported integrity mode (authSafe content type {})",
                pfx.auth_safe.content_type
            )));
        }
        let auth_safe = Self::data_octets(Some(&pfx.auth_safe.content))?;

        match &pfx.mac_data {
            Some(mac) => {
                self.verify_mac(mac, &auth_safe)?;
                self.mac_verified = true;
                log::debug!("PKCS#12 MAC verified");
            }
            None => log::debug!("PKCS#12 container carries no MAC"),
        }

        let authenticated_safe =
            Any::from_der(&auth_safe).map_err(corrupted("Malformed AuthenticatedSafe"))?;
        authenticated_safe
            .tag()
            .assert_eq(Tag::Sequence)
            .map_err(corrupted("Malformed AuthenticatedSafe"))?;
        let content_infos: Vec<ContentInfo> = asn1::decode_items(authenticated_safe.value())
            .map_err(corrupted("Malformed AuthenticatedSafe"))?;

        let mut entries = Vec::new();
        for content_info in &content_infos {
            let safe_contents = self.open_safe_contents(content_info)?;
            self.collect_bags(&safe_contents, 0, &mut entries)?;
        }

        let inventory = BagInventory::from_entries(entries);
        log::info!(
            "PKCS#12 container holds {} key(s) and {} certificate(s)",
            inventory.keys().len(),
            inventory.certs().len()
        );
        Ok(inventory)
    }

    /// Strict DER first; BER input is re-encoded once and parsed again.
    fn decode_pfx(container: &[u8]) -> SigningResult<Pfx> {
        match Pfx::from_der(container) {
            Ok(pfx) => Ok(pfx),
            Err(e) => match ber::pkcs12_to_der(container) {
                Some(der) => Pfx::from_der(&der).map_err(corrupted("Malformed PFX structure")),
                None => Err(SigningError::CorruptedContainer(format!(
                    "Malformed PFX structure: {e}"
                ))),
            },
        }
    }

    fn data_octets(content: Option<&Any>) -> SigningResult<Vec<u8>> {
        let content = content.ok_or_else(|| {
            SigningError::CorruptedContainer("ContentInfo without content".to_string())
        })?;
        let octets: OctetString =
            asn1::decode_any(content).map_err(corrupted("Malformed data content"))?;
        Ok(octets.into_bytes())
    }

    fn verify_mac(&self, mac: &MacData, auth_safe: &[u8]) -> SigningResult<()> {
        let algo = HashAlgorithm::from_oid(&mac.mac.algorithm.oid).ok_or_else(|| {
            SigningError::CorruptedContainer(format!(
                "Unsupported MAC digest {}",
                mac.mac.algorithm.oid
            ))
        })?;
        let expected = mac.mac.digest.as_bytes();

        for password in self.password_candidates() {
            let key = pkcs12_kdf::derive_key(
                algo,
                &password,
                mac.mac_salt.as_bytes(),
                Pkcs12KeyType::Mac,
                mac.iterations,
                algo.digest_size(),
            );
            let hmac_key = PKey::hmac(&key)?;
            let mut signer = Signer::new(algo.message_digest(), &hmac_key)?;
            signer.update(auth_safe)?;
            let computed = signer.sign_to_vec()?;
            if computed.len() == expected.len() && memcmp::eq(&computed, expected) {
                return Ok(());
            }
        }
        Err(SigningError::InvalidPassword)
    }

    /// BMP form first; an empty passphrase is also tried as zero-length input.
    fn password_candidates(&self) -> Vec<Vec<u8>> {
        let mut candidates = vec![pkcs12_kdf::bmp_password(self.passphrase.as_str())];
        if self.passphrase.is_empty() {
            candidates.push(Vec::new());
        }
        candidates
    }

    /// Decrypt with the container passphrase.
    ///
    /// Once the MAC has authenticated the passphrase, a decryption failure can
    /// only mean an unusable cipher or damaged data.
    fn decrypt(
        &self,
        algorithm: &x509_cert::spki::AlgorithmIdentifierOwned,
        ciphertext: &[u8],
    ) -> SigningResult<Vec<u8>> {
        match pbe::decrypt(algorithm, self.passphrase, ciphertext) {
            Err(SigningError::InvalidPassword) if self.mac_verified => {
                Err(SigningError::CorruptedContainer(format!(
                    "Decryption with {} failed although the MAC verified",
                    algorithm.oid
                )))
            }
            other => other,
        }
    }

    /// Map a structural failure of freshly decrypted bytes.
    ///
    /// Without a MAC a wrong passphrase can survive the padding check and
    /// surface here as garbage.
    fn decrypted_structure_error(&self, context: &str, e: der::Error) -> SigningError {
        if self.mac_verified {
            SigningError::CorruptedContainer(format!("{context}: {e}"))
        } else {
            log::debug!("{context}: {e}");
            SigningError::InvalidPassword
        }
    }

    fn open_safe_contents(&self, content_info: &ContentInfo) -> SigningResult<Vec<u8>> {
        let content_type = content_info.content_type;
        if content_type == constants::OID_DATA {
            return Self::data_octets(content_info.content.as_ref());
        }
        if content_type != constants::OID_ENCRYPTED_DATA {
            return Err(SigningError::CorruptedContainer(format!(
                "Unsupported safe contents type {content_type}"
            )));
        }

        let content = content_info.content.as_ref().ok_or_else(|| {
            SigningError::CorruptedContainer("EncryptedData without content".to_string())
        })?;
        let encrypted: EncryptedData =
            asn1::decode_any(content).map_err(corrupted("Malformed EncryptedData"))?;
        let info = encrypted.encrypted_content_info;
        let ciphertext = info.encrypted_content.ok_or_else(|| {
            SigningError::CorruptedContainer("EncryptedData without ciphertext".to_string())
        })?;
        log::debug!(
            "Decrypting safe contents ({} bytes, scheme {})",
            ciphertext.as_bytes().len(),
            info.content_encryption_algorithm.oid
        );
        let plain = self.decrypt(&info.content_encryption_algorithm, ciphertext.as_bytes())?;
        // Validate the outer SEQUENCE now so garbage is classified correctly.
        match Any::from_der(&plain) {
            Ok(any) if any.tag() == Tag::Sequence => Ok(plain),
            Ok(any) => Err(self.decrypted_structure_error(
                "Decrypted safe contents",
                ErrorKind::TagUnexpected {
                    expected: Some(Tag::Sequence),
                    actual: any.tag(),
                }
                .into(),
            )),
            Err(e) => Err(self.decrypted_structure_error("Decrypted safe contents", e)),
        }
    }

    fn collect_bags(
        &self,
        safe_contents: &[u8],
        depth: usize,
        entries: &mut Vec<SafeBagEntry>,
    ) -> SigningResult<()> {
        if depth > MAX_NESTING {
            return Err(SigningError::CorruptedContainer(
                "Safe contents nested too deeply".to_string(),
            ));
        }
        let outer = Any::from_der(safe_contents).map_err(corrupted("Malformed SafeContents"))?;
        outer
            .tag()
            .assert_eq(Tag::Sequence)
            .map_err(corrupted("Malformed SafeContents"))?;
        let bags: Vec<SafeBag> =
            asn1::decode_items(outer.value()).map_err(corrupted("Malformed SafeBag"))?;

        for bag in bags {
            let attributes = Self::bag_attributes(&bag)?;
            match bag.bag_id {
                constants::OID_KEY_BAG => {
                    let der = bag.bag_value.to_der()?;
                    let key = PKey::private_key_from_pkcs8(&der).map_err(|e| {
                        SigningError::CorruptedContainer(format!("Unreadable key bag: {e}"))
                    })?;
                    entries.push(SafeBagEntry::Key(KeyBag { attributes, key }));
                }
                constants::OID_PKCS8_SHROUDED_KEY_BAG => {
                    let info: EncryptedPrivateKeyInfo = asn1::decode_any(&bag.bag_value)
                        .map_err(corrupted("Malformed shrouded key bag"))?;
                    let plain = self.decrypt(
                        &info.encryption_algorithm,
                        info.encrypted_data.as_bytes(),
                    )?;
                    let key = PKey::private_key_from_pkcs8(&plain).map_err(|e| {
                        if self.mac_verified {
                            SigningError::CorruptedContainer(format!(
                                "Unreadable shrouded key bag: {e}"
                            ))
                        } else {
                            log::debug!("Decrypted key is not PKCS#8: {e}");
                            SigningError::InvalidPassword
                        }
                    })?;
                    entries.push(SafeBagEntry::Key(KeyBag { attributes, key }));
                }
                constants::OID_CERT_BAG => {
                    let cert_bag: CertBagValue = asn1::decode_any(&bag.bag_value)
                        .map_err(corrupted("Malformed certificate bag"))?;
                    if cert_bag.cert_id != constants::OID_X509_CERTIFICATE {
                        log::debug!("Skipping certificate bag of type {}", cert_bag.cert_id);
                        continue;
                    }
                    let certificate = EndEntityCert::from_der(cert_bag.cert_value.into_bytes());
                    certificate
                        .parse()
                        .map_err(corrupted("Unreadable X.509 certificate"))?;
                    entries.push(SafeBagEntry::Cert(CertBag {
                        attributes,
                        certificate,
                    }));
                }
                constants::OID_SAFE_CONTENTS_BAG => {
                    let nested = bag.bag_value.to_der()?;
                    self.collect_bags(&nested, depth + 1, entries)?;
                }
                other => log::debug!("Ignoring safe bag of type {other}"),
            }
        }
        Ok(())
    }

    fn bag_attributes(bag: &SafeBag) -> SigningResult<BagAttributes> {
        let mut attributes = BagAttributes::default();
        let Some(set) = &bag.bag_attributes else {
            return Ok(attributes);
        };
        set.tag()
            .assert_eq(Tag::Set)
            .map_err(corrupted("Malformed bag attributes"))?;
        let raw: Vec<RawAttribute> =
            asn1::decode_items(set.value()).map_err(corrupted("Malformed bag attributes"))?;

        for attr in raw {
            let value = attr
                .first_value()
                .map_err(corrupted("Malformed bag attribute value"))?;
            let Some(value) = value else { continue };
            match attr.attr_type {
                constants::OID_FRIENDLY_NAME => {
                    attributes.friendly_name = Self::friendly_name(&value);
                }
                constants::OID_LOCAL_KEY_ID => {
                    let id: OctetString = asn1::decode_any(&value)
                        .map_err(corrupted("Malformed localKeyId"))?;
                    attributes.local_key_id = Some(id.into_bytes());
                }
                _ => {}
            }
        }
        Ok(attributes)
    }

    /// BMPString per RFC 7292; UTF8String is accepted from lenient producers.
    fn friendly_name(value: &Any) -> Option<String> {
        match value.tag() {
            Tag::BmpString => {
                let units: Vec<u16> = value
                    .value()
                    .chunks_exact(2)
                    .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
                    .collect();
                String::from_utf16(&units).ok()
            }
            Tag::Utf8String => std::str::from_utf8(value.value()).ok().map(str::to_string),
            other => {
                log::debug!("Ignoring friendlyName with tag {other}");
                None
            }
        }
    }
}
