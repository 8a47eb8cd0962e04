//! Key, certificate and container fixtures generated at test time.

use openssl::asn1::{Asn1Integer, Asn1Time};
use openssl::bn::BigNum;
use openssl::ec::{EcGroup, EcKey};
use openssl::hash::MessageDigest;
use openssl::nid::Nid;
use openssl::pkcs12::Pkcs12;
use openssl::pkey::{PKey, Private};
use openssl::rsa::Rsa;
use openssl::x509::extension::{BasicConstraints, KeyUsage};
use openssl::x509::{X509Builder, X509Name, X509NameBuilder, X509NameRef, X509};

/// Password used throughout the tests.
pub const PASSWORD: &str = "bry123456";

pub struct Identity {
    pub key: PKey<Private>,
    pub cert: X509,
}

impl Identity {
    pub fn cert_der(&self) -> Vec<u8> {
        self.cert.to_der().unwrap()
    }

    pub fn cert_pem(&self) -> Vec<u8> {
        self.cert.to_pem().unwrap()
    }
}

pub fn rsa_key() -> PKey<Private> {
    PKey::from_rsa(Rsa::generate(2048).unwrap()).unwrap()
}

pub fn ec_key() -> PKey<Private> {
    let group = EcGroup::from_curve_name(Nid::X9_62_PRIME256V1).unwrap();
    PKey::from_ec_key(EcKey::generate(&group).unwrap()).unwrap()
}

fn name(cn: &str) -> X509Name {
    let mut builder = X509NameBuilder::new().unwrap();
    builder.append_entry_by_text("O", "Test Org").unwrap();
    builder.append_entry_by_text("CN", cn).unwrap();
    builder.build()
}

fn base_builder(subject: &X509NameRef, issuer: &X509NameRef, key: &PKey<Private>, serial: u32) -> X509Builder {
    let mut builder = X509Builder::new().unwrap();
    builder.set_version(2).unwrap();
    let serial = Asn1Integer::from_bn(&BigNum::from_u32(serial).unwrap()).unwrap();
    builder.set_serial_number(&serial).unwrap();
    builder.set_subject_name(subject).unwrap();
    builder.set_issuer_name(issuer).unwrap();
    builder.set_pubkey(key).unwrap();
    builder
        .set_not_before(&Asn1Time::days_from_now(0).unwrap())
        .unwrap();
    builder
        .set_not_after(&Asn1Time::days_from_now(365).unwrap())
        .unwrap();
    builder
}

/// Self-signed certificate for `key` with subject `CN=<cn>`.
pub fn self_signed(cn: &str, key: PKey<Private>, serial: u32) -> Identity {
    let subject = name(cn);
    let mut builder = base_builder(&subject, &subject, &key, serial);
    builder.sign(&key, MessageDigest::sha256()).unwrap();
    Identity {
        cert: builder.build(),
        key,
    }
}

pub fn rsa_identity(cn: &str) -> Identity {
    self_signed(cn, rsa_key(), 0x1001)
}

/// Root CA able to issue leaf certificates.
pub fn ca_identity(cn: &str) -> Identity {
    let key = rsa_key();
    let subject = name(cn);
    let mut builder = base_builder(&subject, &subject, &key, 1);
    builder
        .append_extension(BasicConstraints::new().critical().ca().build().unwrap())
        .unwrap();
    builder
        .append_extension(
            KeyUsage::new()
                .critical()
                .key_cert_sign()
                .crl_sign()
                .build()
                .unwrap(),
        )
        .unwrap();
    builder.sign(&key, MessageDigest::sha256()).unwrap();
    Identity {
        cert: builder.build(),
        key,
    }
}

/// Leaf certificate for a fresh RSA key, issued by `ca`.
pub fn issued_by(ca: &Identity, cn: &str, serial: u32) -> Identity {
    let key = rsa_key();
    let subject = name(cn);
    let mut builder = base_builder(&subject, ca.cert.subject_name(), &key, serial);
    builder.sign(&ca.key, MessageDigest::sha256()).unwrap();
    Identity {
        cert: builder.build(),
        key,
    }
}

/// Single key/cert container produced by OpenSSL itself.
pub fn openssl_pfx(identity: &Identity, friendly_name: Option<&str>, password: &str) -> Vec<u8> {
    let mut builder = Pkcs12::builder();
    if let Some(name) = friendly_name {
        builder.name(name);
    }
    builder.pkey(&identity.key);
    builder.cert(&identity.cert);
    builder.build2(password).unwrap().to_der().unwrap()
}

/// Container using the legacy `pbeWithSHAAnd3-KeyTripleDES-CBC` scheme for key and certificates.
pub fn openssl_legacy_pfx(identity: &Identity, friendly_name: &str, password: &str) -> Vec<u8> {
    let mut builder = Pkcs12::builder();
    builder.name(friendly_name);
    builder.pkey(&identity.key);
    builder.cert(&identity.cert);
    builder.key_algorithm(Nid::PBE_WITHSHA1AND3_KEY_TRIPLEDES_CBC);
    builder.cert_algorithm(Nid::PBE_WITHSHA1AND3_KEY_TRIPLEDES_CBC);
    builder.build2(password).unwrap().to_der().unwrap()
}

/// Re-encode the outer SEQUENCE of `der` with an indefinite length.
pub fn outer_indefinite(der: &[u8]) -> Vec<u8> {
    assert_eq!(der[0], 0x30);
    let header = if der[1] & 0x80 == 0 {
        2
    } else {
        2 + usize::from(der[1] & 0x7f)
    };
    let mut out = vec![0x30, 0x80];
    out.extend_from_slice(&der[header..]);
    out.extend_from_slice(&[0x00, 0x00]);
    out
}
