//! Selects exactly one private key and its certificate from a PKCS#12 container.
//!
//! Selection runs in strict priority order, first match wins:
//! 1. alias: a key bag and a cert bag whose `friendlyName` both equal the alias
//! 2. localKeyId: a key bag and a cert bag with byte-identical `localKeyId`
//! 3. singleton: the container holds exactly one key and one certificate
//!
//! Anything else fails with [`SigningError::AliasNotFound`] listing the names
//! and key ids that were seen.

use std::fmt;

use openssl::pkey::{PKey, Private};

use crate::domain::crypto::EndEntityCert;
use crate::domain::pkcs12::BagInventory;
use crate::domain::types::{Alias, Passphrase};
use crate::infra::error::{AvailableEntries, SigningError, SigningResult};
use crate::services::pkcs12_reader::Pkcs12Reader;

/// Rule that produced a [`ResolvedCredential`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResolutionMethod {
    Alias,
    LocalKeyId,
    Singleton,
}

impl ResolutionMethod {
    /// Singleton pairing ignores all metadata and may pair unrelated entries.
    #[must_use]
    pub fn is_low_confidence(&self) -> bool {
        matches!(self, ResolutionMethod::Singleton)
    }

    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            ResolutionMethod::Alias => "alias",
            ResolutionMethod::LocalKeyId => "localKeyId",
            ResolutionMethod::Singleton => "singleton",
        }
    }
}

impl fmt::Display for ResolutionMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One private key paired with one certificate, owned by the caller.
#[derive(Clone)]
pub struct ResolvedCredential {
    key: PKey<Private>,
    certificate: EndEntityCert,
    method: ResolutionMethod,
    friendly_name: Option<String>,
}

impl ResolvedCredential {
    #[must_use]
    pub fn private_key(&self) -> &PKey<Private> {
        &self.key
    }
    #[must_use]
    pub fn certificate(&self) -> &EndEntityCert {
        &self.certificate
    }
    #[must_use]
    pub fn method(&self) -> ResolutionMethod {
        self.method
    }
    #[must_use]
    pub fn is_low_confidence(&self) -> bool {
        self.method.is_low_confidence()
    }
    /// `friendlyName` of the chosen certificate bag, if it had one.
    #[must_use]
    pub fn friendly_name(&self) -> Option<&str> {
        self.friendly_name.as_deref()
    }

    /// Whether the certificate's public key belongs to the private key.
    #[must_use]
    pub fn key_matches_certificate(&self) -> bool {
        self.certificate
            .to_openssl()
            .and_then(|cert| cert.public_key())
            .is_ok_and(|public| public.public_eq(&self.key))
    }
}

impl fmt::Debug for ResolvedCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ResolvedCredential(method={}, friendly_name={:?}, {:?})",
            self.method, self.friendly_name, self.certificate
        )
    }
}

/// Stateless resolver; see the module docs for the selection rules.
#[derive(Debug, Default, Clone, Copy)]
pub struct CredentialResolver;

impl CredentialResolver {
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Open `container` with `passphrase` and select the signing credential.
    pub fn resolve(
        &self,
        container: &[u8],
        passphrase: &Passphrase,
        alias: Option<&Alias>,
    ) -> SigningResult<ResolvedCredential> {
        let inventory = Pkcs12Reader::new(passphrase).read(container)?;
        self.select(inventory, alias)
    }

    /// Apply the selection rules to already extracted bags.
    pub fn select(
        &self,
        inventory: BagInventory,
        alias: Option<&Alias>,
    ) -> SigningResult<ResolvedCredential> {
        let by_alias = alias.and_then(|a| match_by_alias(&inventory, a.as_str()));
        if alias.is_some() && by_alias.is_none() {
            log::warn!(
                "No key/certificate pair carries alias '{}', falling back to localKeyId matching",
                alias.map(Alias::as_str).unwrap_or_default()
            );
        }

        let chosen = by_alias
            .map(|pair| (pair, ResolutionMethod::Alias))
            .or_else(|| match_by_local_key_id(&inventory).map(|p| (p, ResolutionMethod::LocalKeyId)))
            .or_else(|| match_singleton(&inventory).map(|p| (p, ResolutionMethod::Singleton)));

        let Some(((key_index, cert_index), method)) = chosen else {
            return Err(SigningError::AliasNotFound {
                alias: alias.map(Alias::as_str).unwrap_or_default().to_string(),
                available: available_entries(&inventory),
            });
        };

        let (key_bag, cert_bag) = inventory
            .take_pair(key_index, cert_index)
            .ok_or_else(|| SigningError::InvalidInput("Resolved bag index out of range".into()))?;

        let credential = ResolvedCredential {
            key: key_bag.key,
            certificate: cert_bag.certificate,
            method,
            friendly_name: cert_bag.attributes.friendly_name,
        };

        if method.is_low_confidence() {
            log::warn!(
                "Using the only key/certificate pair in the container without matching metadata"
            );
        } else {
            log::info!("Resolved signing credential via {method}");
        }
        if !credential.key_matches_certificate() {
            log::warn!("Selected certificate's public key does not match the private key");
        }
        Ok(credential)
    }
}

fn match_by_alias(inventory: &BagInventory, alias: &str) -> Option<(usize, usize)> {
    let named = |name: &Option<String>| name.as_deref() == Some(alias);
    let key = inventory
        .keys()
        .iter()
        .position(|k| named(&k.attributes.friendly_name))?;
    let cert = inventory
        .certs()
        .iter()
        .position(|c| named(&c.attributes.friendly_name))?;
    Some((key, cert))
}

fn match_by_local_key_id(inventory: &BagInventory) -> Option<(usize, usize)> {
    inventory.keys().iter().enumerate().find_map(|(key_index, key)| {
        let id = key.attributes.local_key_id.as_deref()?;
        inventory
            .certs()
            .iter()
            .position(|c| c.attributes.local_key_id.as_deref() == Some(id))
            .map(|cert_index| (key_index, cert_index))
    })
}

fn match_singleton(inventory: &BagInventory) -> Option<(usize, usize)> {
    (inventory.keys().len() == 1 && inventory.certs().len() == 1).then_some((0, 0))
}

fn available_entries(inventory: &BagInventory) -> AvailableEntries {
    let mut available = AvailableEntries::default();
    let attributes = inventory
        .keys()
        .iter()
        .map(|k| &k.attributes)
        .chain(inventory.certs().iter().map(|c| &c.attributes));
    for attrs in attributes {
        if let Some(name) = &attrs.friendly_name {
            available.push_friendly_name(name);
        }
        if let Some(id) = attrs.local_key_id_hex() {
            available.push_local_key_id(id);
        }
    }
    available
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::pkcs12::{BagAttributes, CertBag, KeyBag, SafeBagEntry};
    use openssl::asn1::Asn1Time;
    use openssl::hash::MessageDigest;
    use openssl::rsa::Rsa;
    use openssl::x509::{X509Builder, X509NameBuilder};

    fn key_and_cert(cn: &str) -> (PKey<Private>, EndEntityCert) {
        let key = PKey::from_rsa(Rsa::generate(2048).unwrap()).unwrap();
        let mut name = X509NameBuilder::new().unwrap();
        name.append_entry_by_text("CN", cn).unwrap();
        let name = name.build();
        let mut builder = X509Builder::new().unwrap();
        builder.set_version(2).unwrap();
        builder.set_subject_name(&name).unwrap();
        builder.set_issuer_name(&name).unwrap();
        builder.set_pubkey(&key).unwrap();
        builder
            .set_not_before(&Asn1Time::days_from_now(0).unwrap())
            .unwrap();
        builder
            .set_not_after(&Asn1Time::days_from_now(30).unwrap())
            .unwrap();
        builder.sign(&key, MessageDigest::sha256()).unwrap();
        let cert = EndEntityCert::from_der(builder.build().to_der().unwrap());
        (key, cert)
    }

    fn attrs(name: Option<&str>, id: Option<&[u8]>) -> BagAttributes {
        BagAttributes {
            friendly_name: name.map(str::to_string),
            local_key_id: id.map(<[u8]>::to_vec),
        }
    }

    fn inventory(pairs: &[(Option<&str>, Option<&[u8]>, &str)]) -> BagInventory {
        let mut entries = Vec::new();
        for (name, id, cn) in pairs {
            let (key, certificate) = key_and_cert(cn);
            entries.push(SafeBagEntry::Key(KeyBag {
                attributes: attrs(*name, *id),
                key,
            }));
            entries.push(SafeBagEntry::Cert(CertBag {
                attributes: attrs(*name, *id),
                certificate,
            }));
        }
        BagInventory::from_entries(entries)
    }

    #[test]
    fn alias_wins_over_local_key_id() {
        let inv = inventory(&[
            (Some("A"), Some(&[1]), "cert A"),
            (Some("B"), Some(&[2]), "cert B"),
        ]);
        let alias = Alias::new("B").unwrap();
        let resolved = CredentialResolver::new().select(inv, Some(&alias)).unwrap();
        assert_eq!(resolved.method(), ResolutionMethod::Alias);
        assert_eq!(resolved.certificate().common_name().as_deref(), Some("cert B"));
        assert!(resolved.key_matches_certificate());
    }

    #[test]
    fn unknown_alias_falls_back_to_local_key_id() {
        let inv = inventory(&[(Some("A"), Some(&[7, 7]), "cert A")]);
        let alias = Alias::new("missing").unwrap();
        let resolved = CredentialResolver::new().select(inv, Some(&alias)).unwrap();
        assert_eq!(resolved.method(), ResolutionMethod::LocalKeyId);
    }

    #[test]
    fn singleton_is_low_confidence() {
        let inv = inventory(&[(None, None, "only")]);
        let resolved = CredentialResolver::new().select(inv, None).unwrap();
        assert_eq!(resolved.method(), ResolutionMethod::Singleton);
        assert!(resolved.is_low_confidence());
    }

    #[test]
    fn ambiguous_container_reports_available_entries() {
        let inv = inventory(&[(Some("A"), None, "cert A"), (Some("B"), None, "cert B")]);
        let err = CredentialResolver::new()
            .select(inv, Alias::new("X").as_ref())
            .unwrap_err();
        match err {
            SigningError::AliasNotFound { alias, available } => {
                assert_eq!(alias, "X");
                assert_eq!(available.friendly_names, vec!["A", "B"]);
                assert!(available.local_key_ids.is_empty());
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn shared_local_key_id_pairs_without_alias() {
        let inv = inventory(&[(Some("A"), None, "cert A"), (Some("B"), Some(&[0xab]), "cert B")]);
        let resolved = CredentialResolver::new().select(inv, None).unwrap();
        assert_eq!(resolved.method(), ResolutionMethod::LocalKeyId);
        assert_eq!(resolved.certificate().common_name().as_deref(), Some("cert B"));
    }

    #[test]
    fn empty_inventory_is_alias_not_found() {
        let err = CredentialResolver::new()
            .select(BagInventory::default(), None)
            .unwrap_err();
        assert!(matches!(err, SigningError::AliasNotFound { ref alias, .. } if alias.is_empty()));
    }
}
