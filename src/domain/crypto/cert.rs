use std::fmt;

use der::asn1::Any;
use der::{Decode, Encode, Tag, Tagged};
use openssl::x509::X509;
use x509_cert::Certificate;

use crate::domain::{asn1, constants};

/// Text of a `DirectoryString` value.
fn directory_string(value: &Any) -> Option<String> {
    match value.tag() {
        Tag::Utf8String | Tag::PrintableString | Tag::Ia5String | Tag::TeletexString => {
            std::str::from_utf8(value.value()).ok().map(str::to_string)
        }
        Tag::BmpString => {
            let units: Vec<u16> = value
                .value()
                .chunks_exact(2)
                .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
                .collect();
            String::from_utf16(&units).ok()
        }
        _ => None,
    }
}

/// End-entity (signing) certificate wrapper.
#[derive(Clone, PartialEq, Eq)]
pub struct EndEntityCert {
    der: Box<[u8]>,
}

impl EndEntityCert {
    #[must_use]
    pub fn from_der(der: Vec<u8>) -> Self {
        Self {
            der: der.into_boxed_slice(),
        }
    }
    #[must_use]
    pub fn as_der(&self) -> &[u8] {
        &self.der
    }

    pub fn to_openssl(&self) -> Result<X509, openssl::error::ErrorStack> {
        X509::from_der(&self.der)
    }

    pub fn parse(&self) -> der::Result<Certificate> {
        Certificate::from_der(&self.der)
    }

    /// DER of `IssuerAndSerialNumber ::= SEQUENCE { issuer Name, serialNumber INTEGER }`.
    pub fn issuer_and_serial_der(&self) -> der::Result<Vec<u8>> {
        let cert = self.parse()?;
        let mut body = cert.tbs_certificate.issuer.to_der()?;
        body.extend_from_slice(&cert.tbs_certificate.serial_number.to_der()?);
        asn1::tlv(Tag::Sequence, &body)
    }

    /// Common name of the subject, when present and printable.
    #[must_use]
    pub fn common_name(&self) -> Option<String> {
        let cert = self.parse().ok()?;
        let name = cert
            .tbs_certificate
            .subject
            .0
            .iter()
            .flat_map(|rdn| rdn.0.iter())
            .find(|atv| atv.oid == constants::OID_COMMON_NAME)
            .and_then(|atv| directory_string(&atv.value));
        name
    }

    /// Issuer distinguished name in RFC 4514 form.
    #[must_use]
    pub fn issuer_name(&self) -> Option<String> {
        self.parse()
            .ok()
            .map(|c| c.tbs_certificate.issuer.to_string())
    }

    /// Serial number magnitude as lowercase hex (DER sign padding removed).
    #[must_use]
    pub fn serial_number_hex(&self) -> Option<String> {
        let cert = self.parse().ok()?;
        let bytes = cert.tbs_certificate.serial_number.as_bytes();
        let trimmed = match bytes {
            [0x00, rest @ ..] if !rest.is_empty() => rest,
            other => other,
        };
        Some(hex::encode(trimmed))
    }
}

impl fmt::Debug for EndEntityCert {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EndEntityCert(len={})", self.der.len())
    }
}
