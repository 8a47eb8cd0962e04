//! Credential resolution against real PKCS#12 containers.

mod common;

use cms_signer::{Alias, CredentialResolver, Passphrase, ResolutionMethod, SigningError};
use common::fixtures::{self, PASSWORD};
use common::pfx_writer::{Attrs, PfxWriter};

fn resolve(
    container: &[u8],
    password: &str,
    alias: Option<&str>,
) -> Result<cms_signer::ResolvedCredential, SigningError> {
    let alias = alias.and_then(Alias::new);
    CredentialResolver::new().resolve(container, &Passphrase::from(password), alias.as_ref())
}

#[test]
fn alias_selects_matching_pair_among_several() {
    let a = fixtures::rsa_identity("Signer A");
    let b = fixtures::rsa_identity("Signer B");
    let pfx = PfxWriter::new(PASSWORD)
        .key(&a.key, Attrs::named("A"))
        .cert(&a.cert, Attrs::named("A"))
        .key(&b.key, Attrs::named("B"))
        .cert(&b.cert, Attrs::named("B"))
        .build();

    let resolved = resolve(&pfx, PASSWORD, Some("B")).unwrap();
    assert_eq!(resolved.method(), ResolutionMethod::Alias);
    assert_eq!(resolved.certificate().as_der(), b.cert_der().as_slice());
    assert_eq!(resolved.friendly_name(), Some("B"));
    assert!(resolved.key_matches_certificate());
    assert!(!resolved.is_low_confidence());
}

#[test]
fn local_key_id_pairs_without_alias() {
    let a = fixtures::rsa_identity("Signer A");
    let b = fixtures::rsa_identity("Signer B");
    // Certificates listed in the opposite order from the keys.
    let pfx = PfxWriter::new(PASSWORD)
        .key(&b.key, Attrs::id(&[0xbb]))
        .key(&a.key, Attrs::id(&[0xaa]))
        .cert(&a.cert, Attrs::id(&[0xaa]))
        .cert(&b.cert, Attrs::id(&[0xbb]))
        .build();

    let resolved = resolve(&pfx, PASSWORD, None).unwrap();
    assert_eq!(resolved.method(), ResolutionMethod::LocalKeyId);
    assert_eq!(resolved.certificate().as_der(), b.cert_der().as_slice());
    assert!(resolved.key_matches_certificate());
}

#[test]
fn unknown_alias_falls_back_to_local_key_id() {
    let a = fixtures::rsa_identity("Signer A");
    let pfx = PfxWriter::new(PASSWORD)
        .key(&a.key, Attrs::id(&[1, 2, 3, 4]))
        .cert(&a.cert, Attrs::id(&[1, 2, 3, 4]))
        .build();

    let resolved = resolve(&pfx, PASSWORD, Some("missing")).unwrap();
    assert_eq!(resolved.method(), ResolutionMethod::LocalKeyId);
}

#[test]
fn lone_pair_without_metadata_is_low_confidence() {
    let a = fixtures::rsa_identity("Signer A");
    let pfx = PfxWriter::new(PASSWORD)
        .key(&a.key, Attrs::default())
        .cert(&a.cert, Attrs::default())
        .build();

    let resolved = resolve(&pfx, PASSWORD, None).unwrap();
    assert_eq!(resolved.method(), ResolutionMethod::Singleton);
    assert!(resolved.is_low_confidence());
    assert_eq!(resolved.certificate().as_der(), a.cert_der().as_slice());
}

#[test]
fn unresolvable_container_lists_available_entries() {
    let a = fixtures::rsa_identity("Signer A");
    let b = fixtures::rsa_identity("Signer B");
    let pfx = PfxWriter::new(PASSWORD)
        .key(&a.key, Attrs::named("key-a"))
        .key(&b.key, Attrs::id(&[0xca, 0xfe]))
        .cert(&a.cert, Attrs::named("cert-a"))
        .cert(&b.cert, Attrs::default())
        .build();

    let err = resolve(&pfx, PASSWORD, Some("nope")).unwrap_err();
    match &err {
        SigningError::AliasNotFound { alias, available } => {
            assert_eq!(alias, "nope");
            assert_eq!(available.friendly_names, vec!["key-a", "cert-a"]);
            assert_eq!(available.local_key_ids, vec!["cafe"]);
        }
        other => panic!("unexpected error: {other:?}"),
    }
    let message = err.to_string();
    assert!(message.starts_with("Failed to find key and certificate for alias: nope"));
    assert!(message.contains("friendlyNames=key-a,cert-a"));
    assert!(message.contains("localKeyIds=cafe"));
}

#[test]
fn container_without_keys_is_not_resolvable() {
    let a = fixtures::rsa_identity("Signer A");
    let pfx = PfxWriter::new(PASSWORD)
        .cert(&a.cert, Attrs::named("only-cert"))
        .build();

    let err = resolve(&pfx, PASSWORD, None).unwrap_err();
    assert!(matches!(err, SigningError::AliasNotFound { .. }));
}

#[test]
fn unlabelled_container_error_has_no_available_suffix() {
    let a = fixtures::rsa_identity("Signer A");
    let b = fixtures::rsa_identity("Signer B");
    let pfx = PfxWriter::new(PASSWORD)
        .key(&a.key, Attrs::default())
        .cert(&a.cert, Attrs::default())
        .key(&b.key, Attrs::default())
        .cert(&b.cert, Attrs::default())
        .build();

    let err = resolve(&pfx, PASSWORD, Some("X")).unwrap_err();
    assert_eq!(
        err.to_string(),
        "Failed to find key and certificate for alias: X"
    );
}

#[test]
fn wrong_password_is_rejected_by_mac() {
    let a = fixtures::rsa_identity("Signer A");
    let pfx = PfxWriter::new(PASSWORD)
        .key(&a.key, Attrs::named("A"))
        .cert(&a.cert, Attrs::named("A"))
        .build();

    let err = resolve(&pfx, "not-the-password", Some("A")).unwrap_err();
    assert!(matches!(err, SigningError::InvalidPassword));
}

#[test]
fn wrong_password_without_mac_fails_on_decryption() {
    let a = fixtures::rsa_identity("Signer A");
    let pfx = PfxWriter::new(PASSWORD)
        .key(&a.key, Attrs::named("A"))
        .cert(&a.cert, Attrs::named("A"))
        .without_mac()
        .build();

    assert!(resolve(&pfx, PASSWORD, Some("A")).is_ok());
    let err = resolve(&pfx, "not-the-password", Some("A")).unwrap_err();
    assert!(matches!(err, SigningError::InvalidPassword));
}

#[test]
fn garbage_bytes_are_a_corrupted_container() {
    let err = resolve(b"definitely not a PFX", PASSWORD, None).unwrap_err();
    assert!(matches!(err, SigningError::CorruptedContainer(_)));

    let err = resolve(&[], PASSWORD, None).unwrap_err();
    assert!(matches!(err, SigningError::CorruptedContainer(_)));
}

#[test]
fn truncated_container_is_corrupted() {
    let a = fixtures::rsa_identity("Signer A");
    let pfx = fixtures::openssl_pfx(&a, Some("A"), PASSWORD);
    let err = resolve(&pfx[..pfx.len() / 2], PASSWORD, Some("A")).unwrap_err();
    assert!(matches!(err, SigningError::CorruptedContainer(_)));
}

#[test]
fn reads_containers_produced_by_openssl() {
    let a = fixtures::rsa_identity("OpenSSL Signer");
    let pfx = fixtures::openssl_pfx(&a, Some("openssl-alias"), PASSWORD);

    let resolved = resolve(&pfx, PASSWORD, Some("openssl-alias")).unwrap();
    assert_eq!(resolved.method(), ResolutionMethod::Alias);
    assert_eq!(
        resolved.certificate().common_name().as_deref(),
        Some("OpenSSL Signer")
    );
    assert!(resolved.key_matches_certificate());
}

#[test]
fn legacy_triple_des_container_resolves() {
    let a = fixtures::rsa_identity("Legacy Signer");
    let pfx = fixtures::openssl_legacy_pfx(&a, "legacy", PASSWORD);

    let resolved = resolve(&pfx, PASSWORD, Some("legacy")).unwrap();
    assert_eq!(resolved.method(), ResolutionMethod::Alias);
    assert!(resolved.key_matches_certificate());

    assert!(matches!(
        resolve(&pfx, "wrong", Some("legacy")),
        Err(SigningError::InvalidPassword)
    ));
}

#[test]
fn indefinite_length_container_is_accepted() {
    let a = fixtures::rsa_identity("BER Signer");
    let der = fixtures::openssl_pfx(&a, Some("ber"), PASSWORD);
    let ber = fixtures::outer_indefinite(&der);
    assert_ne!(ber, der);

    let resolved = resolve(&ber, PASSWORD, Some("ber")).unwrap();
    assert_eq!(resolved.method(), ResolutionMethod::Alias);
    assert_eq!(resolved.certificate().as_der(), a.cert_der().as_slice());
    assert!(resolved.key_matches_certificate());
}

#[test]
fn indefinite_length_container_still_checks_the_mac() {
    let a = fixtures::rsa_identity("BER Signer");
    let ber = fixtures::outer_indefinite(&fixtures::openssl_pfx(&a, None, PASSWORD));

    assert!(matches!(
        resolve(&ber, "wrong", None),
        Err(SigningError::InvalidPassword)
    ));
}

#[test]
fn empty_password_container() {
    let a = fixtures::rsa_identity("Signer A");
    let pfx = fixtures::openssl_pfx(&a, None, "");

    let resolved = resolve(&pfx, "", None).unwrap();
    assert!(resolved.key_matches_certificate());
}

#[test]
fn ec_keys_resolve() {
    let identity = fixtures::self_signed("EC Signer", fixtures::ec_key(), 77);
    let pfx = PfxWriter::new(PASSWORD)
        .key(&identity.key, Attrs::named("ec"))
        .cert(&identity.cert, Attrs::named("ec"))
        .build();

    let resolved = resolve(&pfx, PASSWORD, Some("ec")).unwrap();
    assert!(resolved.key_matches_certificate());
}
