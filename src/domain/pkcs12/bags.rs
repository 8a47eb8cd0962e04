//! Classified safe-bag entries extracted from a PKCS#12 container.

use std::fmt;

use openssl::pkey::{PKey, Private};

use crate::domain::crypto::EndEntityCert;

/// Optional identifying attributes attached to a safe bag.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BagAttributes {
    pub friendly_name: Option<String>,
    pub local_key_id: Option<Vec<u8>>,
}

impl BagAttributes {
    #[must_use]
    pub fn local_key_id_hex(&self) -> Option<String> {
        self.local_key_id.as_deref().map(hex::encode)
    }
}

/// A decrypted private key together with its bag attributes.
#[derive(Clone)]
pub struct KeyBag {
    pub attributes: BagAttributes,
    pub key: PKey<Private>,
}

/// An X.509 certificate together with its bag attributes.
#[derive(Clone)]
pub struct CertBag {
    pub attributes: BagAttributes,
    pub certificate: EndEntityCert,
}

/// Tagged variant over the bag kinds the resolver cares about.
#[derive(Clone, Debug)]
pub enum SafeBagEntry {
    Key(KeyBag),
    Cert(CertBag),
}

/// Key and certificate bags split into two collections.
#[derive(Clone, Debug, Default)]
pub struct BagInventory {
    keys: Vec<KeyBag>,
    certs: Vec<CertBag>,
}

impl BagInventory {
    #[must_use]
    pub fn from_entries(entries: Vec<SafeBagEntry>) -> Self {
        let mut inventory = Self::default();
        for entry in entries {
            match entry {
                SafeBagEntry::Key(k) => inventory.keys.push(k),
                SafeBagEntry::Cert(c) => inventory.certs.push(c),
            }
        }
        inventory
    }

    #[must_use]
    pub fn keys(&self) -> &[KeyBag] {
        &self.keys
    }

    #[must_use]
    pub fn certs(&self) -> &[CertBag] {
        &self.certs
    }

    /// Consume the inventory, returning the chosen key and certificate.
    #[must_use]
    pub fn take_pair(mut self, key_index: usize, cert_index: usize) -> Option<(KeyBag, CertBag)> {
        if key_index >= self.keys.len() || cert_index >= self.certs.len() {
            return None;
        }
        Some((
            self.keys.swap_remove(key_index),
            self.certs.swap_remove(cert_index),
        ))
    }
}

impl fmt::Debug for KeyBag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "KeyBag(friendly_name={:?}, local_key_id={:?}, bits={})",
            self.attributes.friendly_name,
            self.attributes.local_key_id_hex(),
            self.key.bits()
        )
    }
}

impl fmt::Debug for CertBag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "CertBag(friendly_name={:?}, local_key_id={:?}, {:?})",
            self.attributes.friendly_name,
            self.attributes.local_key_id_hex(),
            self.certificate
        )
    }
}
