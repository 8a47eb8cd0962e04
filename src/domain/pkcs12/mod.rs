//! PKCS#12 container domain: bag-level ASN.1 structures and classified bags.

pub mod asn1;
pub mod bags;

pub use bags::{BagAttributes, BagInventory, CertBag, KeyBag, SafeBagEntry};
