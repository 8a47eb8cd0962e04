//! Minimal PKCS#12 writer for containers OpenSSL's builder cannot express:
//! several key/certificate pairs, custom attributes, missing MAC.

use cms_signer::domain::asn1::{context_tag, tlv};
use cms_signer::domain::constants;
use cms_signer::services::pkcs12_kdf::{self, Pkcs12KeyType};
use cms_signer::HashAlgorithm;
use der::asn1::{ObjectIdentifier, OctetString};
use der::{Encode, Tag, TagNumber};
use openssl::pkey::{PKey, Private};
use openssl::sign::Signer;
use openssl::symm::Cipher;
use openssl::x509::X509;

#[derive(Default, Clone)]
pub struct Attrs {
    pub friendly_name: Option<String>,
    pub local_key_id: Option<Vec<u8>>,
}

impl Attrs {
    pub fn named(name: &str) -> Self {
        Self {
            friendly_name: Some(name.to_string()),
            local_key_id: None,
        }
    }

    pub fn id(id: &[u8]) -> Self {
        Self {
            friendly_name: None,
            local_key_id: Some(id.to_vec()),
        }
    }
}

pub enum Bag {
    Key { key: PKey<Private>, attrs: Attrs },
    Cert { cert: X509, attrs: Attrs },
}

pub struct PfxWriter {
    bags: Vec<Bag>,
    password: String,
    mac: bool,
}

fn seq(parts: &[Vec<u8>]) -> Vec<u8> {
    tlv(Tag::Sequence, &parts.concat()).unwrap()
}

fn explicit0(inner: &[u8]) -> Vec<u8> {
    tlv(context_tag(TagNumber::N0), inner).unwrap()
}

fn octets(bytes: &[u8]) -> Vec<u8> {
    OctetString::new(bytes).unwrap().to_der().unwrap()
}

fn oid(o: ObjectIdentifier) -> Vec<u8> {
    o.to_der().unwrap()
}

fn attributes(attrs: &Attrs) -> Option<Vec<u8>> {
    let mut items = Vec::new();
    if let Some(name) = &attrs.friendly_name {
        let bmp: Vec<u8> = name.encode_utf16().flat_map(u16::to_be_bytes).collect();
        let value = tlv(Tag::BmpString, &bmp).unwrap();
        items.push(seq(&[
            oid(constants::OID_FRIENDLY_NAME),
            tlv(Tag::Set, &value).unwrap(),
        ]));
    }
    if let Some(id) = &attrs.local_key_id {
        items.push(seq(&[
            oid(constants::OID_LOCAL_KEY_ID),
            tlv(Tag::Set, &octets(id)).unwrap(),
        ]));
    }
    if items.is_empty() {
        return None;
    }
    items.sort();
    Some(tlv(Tag::Set, &items.concat()).unwrap())
}

impl PfxWriter {
    pub fn new(password: &str) -> Self {
        Self {
            bags: Vec::new(),
            password: password.to_string(),
            mac: true,
        }
    }

    pub fn key(mut self, key: &PKey<Private>, attrs: Attrs) -> Self {
        self.bags.push(Bag::Key {
            key: key.clone(),
            attrs,
        });
        self
    }

    pub fn cert(mut self, cert: &X509, attrs: Attrs) -> Self {
        self.bags.push(Bag::Cert {
            cert: cert.clone(),
            attrs,
        });
        self
    }

    pub fn without_mac(mut self) -> Self {
        self.mac = false;
        self
    }

    fn safe_bag(&self, bag: &Bag) -> Vec<u8> {
        let (bag_id, value, attrs) = match bag {
            Bag::Key { key, attrs } => {
                let encrypted = key
                    .private_key_to_pkcs8_passphrase(
                        Cipher::aes_256_cbc(),
                        self.password.as_bytes(),
                    )
                    .unwrap();
                (constants::OID_PKCS8_SHROUDED_KEY_BAG, encrypted, attrs)
            }
            Bag::Cert { cert, attrs } => {
                let cert_bag = seq(&[
                    oid(constants::OID_X509_CERTIFICATE),
                    explicit0(&octets(&cert.to_der().unwrap())),
                ]);
                (constants::OID_CERT_BAG, cert_bag, attrs)
            }
        };
        let mut parts = vec![oid(bag_id), explicit0(&value)];
        if let Some(set) = attributes(attrs) {
            parts.push(set);
        }
        seq(&parts)
    }

    pub fn build(&self) -> Vec<u8> {
        let bags: Vec<Vec<u8>> = self.bags.iter().map(|b| self.safe_bag(b)).collect();
        let safe_contents = seq(&bags);
        let data_ci = seq(&[oid(constants::OID_DATA), explicit0(&octets(&safe_contents))]);
        let authenticated_safe = seq(&[data_ci]);

        let auth_safe_ci = seq(&[
            oid(constants::OID_DATA),
            explicit0(&octets(&authenticated_safe)),
        ]);

        let mut pfx = vec![3u8.to_der().unwrap(), auth_safe_ci];
        if self.mac {
            pfx.push(self.mac_data(&authenticated_safe));
        }
        seq(&pfx)
    }

    fn mac_data(&self, authenticated_safe: &[u8]) -> Vec<u8> {
        let salt = [0x5au8; 16];
        let iterations = 2048i32;
        let key = pkcs12_kdf::derive_key(
            HashAlgorithm::Sha256,
            &pkcs12_kdf::bmp_password(&self.password),
            &salt,
            Pkcs12KeyType::Mac,
            iterations,
            32,
        );
        let hmac_key = PKey::hmac(&key).unwrap();
        let mut signer =
            Signer::new(HashAlgorithm::Sha256.message_digest(), &hmac_key).unwrap();
        signer.update(authenticated_safe).unwrap();
        let mac = signer.sign_to_vec().unwrap();

        let algorithm = seq(&[
            oid(constants::OID_SHA256),
            tlv(Tag::Null, &[]).unwrap(),
        ]);
        let digest_info = seq(&[algorithm, octets(&mac)]);
        seq(&[digest_info, octets(&salt), iterations.to_der().unwrap()])
    }
}
