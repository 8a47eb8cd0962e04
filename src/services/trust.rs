//! Trust anchors for chain evaluation during verification.

use std::fmt;
use std::path::Path;

use openssl::stack::Stack;
use openssl::x509::store::X509StoreBuilder;
use openssl::x509::{X509StoreContext, X509};

use crate::domain::crypto::EndEntityCert;
use crate::infra::error::{SigningError, SigningResult};

/// Set of trusted root certificates.
#[derive(Clone)]
pub struct TrustAnchors {
    roots: Vec<X509>,
}

impl TrustAnchors {
    /// Parse every certificate of a PEM bundle.
    pub fn from_pem(pem: &[u8]) -> SigningResult<Self> {
        let roots = X509::stack_from_pem(pem).map_err(|e| {
            SigningError::CertificateError(format!("Failed to parse trust anchors: {e}"))
        })?;
        if roots.is_empty() {
            return Err(SigningError::CertificateError(
                "Trust anchor bundle contains no certificates".to_string(),
            ));
        }
        Ok(Self { roots })
    }

    pub fn from_pem_file(path: &Path) -> SigningResult<Self> {
        let pem = std::fs::read(path).map_err(|e| {
            SigningError::IoError(format!(
                "Failed to read trust anchors {}: {e}",
                path.display()
            ))
        })?;
        let anchors = Self::from_pem(&pem)?;
        log::info!(
            "Loaded {} trust anchor(s) from {}",
            anchors.len(),
            path.display()
        );
        Ok(anchors)
    }

    #[must_use]
    pub fn from_certificates(roots: Vec<X509>) -> Self {
        Self { roots }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.roots.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }

    /// Whether `leaf` chains to one of the anchors, using `untrusted` as intermediates.
    #[must_use]
    pub fn is_trusted(&self, leaf: &EndEntityCert, untrusted: &[EndEntityCert]) -> bool {
        match self.evaluate(leaf, untrusted) {
            Ok(trusted) => trusted,
            Err(e) => {
                log::debug!("Chain evaluation failed: {e}");
                false
            }
        }
    }

    fn evaluate(
        &self,
        leaf: &EndEntityCert,
        untrusted: &[EndEntityCert],
    ) -> Result<bool, openssl::error::ErrorStack> {
        let mut builder = X509StoreBuilder::new()?;
        for root in &self.roots {
            builder.add_cert(root.clone())?;
        }
        let store = builder.build();

        let mut chain = Stack::new()?;
        for cert in untrusted {
            chain.push(cert.to_openssl()?)?;
        }

        let leaf = leaf.to_openssl()?;
        let mut context = X509StoreContext::new()?;
        context.init(&store, &leaf, &chain, |ctx| {
            let ok = ctx.verify_cert()?;
            if !ok {
                log::debug!("Chain not trusted: {}", ctx.error());
            }
            Ok(ok)
        })
    }
}

impl fmt::Debug for TrustAnchors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TrustAnchors(count={})", self.roots.len())
    }
}
