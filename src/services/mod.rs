//! Service layer module root.
//! Contains the PKCS#12, signing and verification services.

pub mod ber;
pub mod credential_resolver;
pub mod pbe;
pub mod pkcs12_kdf;
pub mod pkcs12_reader;
pub mod pkcs7_builder;
pub mod signed_attributes_builder;
pub mod signing;
pub mod trust;
pub mod verification;

pub use credential_resolver::{CredentialResolver, ResolutionMethod, ResolvedCredential};
pub use pkcs12_reader::Pkcs12Reader;
pub use pkcs7_builder::Pkcs7BuilderService;
pub use signed_attributes_builder::SignedAttributesBuilder;
pub use signing::CmsSigner;
pub use trust::TrustAnchors;
pub use verification::CmsVerifier;
