//! Async workflows: signing with persistence, file verification and digests.

mod common;

use cms_signer::config::SignerConfiguration;
use cms_signer::{
    Alias, DigestWorkflow, HashAlgorithm, OutputPathAllocator, Passphrase, ResolutionMethod,
    SignWorkflow, SigningError, VerificationStatus, VerifyWorkflow,
};
use common::fixtures::{self, PASSWORD};
use tempfile::TempDir;

const DOCUMENT: &[u8] = b"Hello, CMS!\n";

fn container() -> Vec<u8> {
    let identity = fixtures::rsa_identity("Workflow Signer");
    fixtures::openssl_pfx(&identity, Some("wf"), PASSWORD)
}

#[tokio::test]
async fn signing_persists_numbered_artifacts() {
    let temp = TempDir::new().unwrap();
    let out_dir = temp.path().join("signed");
    let workflow = SignWorkflow::new(HashAlgorithm::Sha512)
        .unwrap()
        .with_output(OutputPathAllocator::signed_files(&out_dir));
    let pfx = container();

    let mut artifacts = Vec::new();
    for _ in 0..3 {
        let outcome = workflow
            .sign_bytes(
                DOCUMENT.to_vec(),
                pfx.clone(),
                Passphrase::from(PASSWORD),
                Alias::new("wf"),
            )
            .await
            .unwrap();
        assert_eq!(outcome.method, ResolutionMethod::Alias);
        let path = outcome.artifact.unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), outcome.der);
        artifacts.push(path);
    }

    assert_eq!(
        artifacts,
        vec![
            out_dir.join("signed_file_0.p7s"),
            out_dir.join("signed_file_1.p7s"),
            out_dir.join("signed_file_2.p7s"),
        ]
    );
}

#[tokio::test]
async fn signing_without_output_writes_nothing() {
    let temp = TempDir::new().unwrap();
    let mut config = SignerConfiguration::default();
    config.output.directory = temp.path().join("signed");
    config.output.persist_signed_files = false;

    let workflow = SignWorkflow::from_config(&config).unwrap();
    let outcome = workflow
        .sign_bytes(
            DOCUMENT.to_vec(),
            container(),
            Passphrase::from(PASSWORD),
            None,
        )
        .await
        .unwrap();

    assert!(outcome.artifact.is_none());
    assert!(!outcome.base64.is_empty());
    assert!(!config.output.directory.exists());
}

#[tokio::test]
async fn sign_file_then_verify_file() {
    let temp = TempDir::new().unwrap();
    let document = temp.path().join("document.txt");
    let pfx_path = temp.path().join("signer.p12");
    std::fs::write(&document, DOCUMENT).unwrap();
    std::fs::write(&pfx_path, container()).unwrap();

    let workflow = SignWorkflow::new(HashAlgorithm::Sha384)
        .unwrap()
        .with_output(OutputPathAllocator::new(temp.path(), "doc", "p7m"));
    let outcome = workflow
        .sign_file(&document, &pfx_path, Passphrase::from(PASSWORD), Alias::new("wf"))
        .await
        .unwrap();
    let artifact = outcome.artifact.unwrap();
    assert_eq!(artifact, temp.path().join("doc_0.p7m"));

    let report = VerifyWorkflow::new().run_file(&artifact).await;
    assert_eq!(report.status, VerificationStatus::Valid);
    let infos = report.infos.unwrap();
    assert_eq!(infos.hash_name.as_deref(), Some("SHA-384"));
    assert_eq!(infos.signer_name.as_deref(), Some("Workflow Signer"));
    assert_eq!(
        infos.document_hash,
        Some(
            DigestWorkflow::new(HashAlgorithm::Sha384)
                .run_file_hex(&document)
                .await
                .unwrap()
        )
    );
}

#[tokio::test]
async fn wrong_password_surfaces_from_workflow() {
    let workflow = SignWorkflow::new(HashAlgorithm::Sha256).unwrap();
    let err = workflow
        .sign_bytes(
            DOCUMENT.to_vec(),
            container(),
            Passphrase::from("wrong"),
            None,
        )
        .await
        .unwrap_err();
    assert!(matches!(err, SigningError::InvalidPassword));
}

#[tokio::test]
async fn missing_document_is_an_io_error() {
    let temp = TempDir::new().unwrap();
    let workflow = SignWorkflow::new(HashAlgorithm::Sha256).unwrap();
    let err = workflow
        .sign_file(
            &temp.path().join("absent.txt"),
            &temp.path().join("absent.p12"),
            Passphrase::from(PASSWORD),
            None,
        )
        .await
        .unwrap_err();
    assert!(matches!(err, SigningError::IoError(_)));
}

#[tokio::test]
async fn unreadable_blob_verifies_as_invalid() {
    let temp = TempDir::new().unwrap();
    let report = VerifyWorkflow::new()
        .run_file(&temp.path().join("missing.p7s"))
        .await;
    assert_eq!(report.status, VerificationStatus::Invalid);
    assert!(report.infos.is_none());

    let report = VerifyWorkflow::new().run(b"garbage".to_vec()).await;
    assert!(!report.is_valid());
    assert_eq!(
        serde_json::to_string(&report).unwrap(),
        r#"{"status":"INVALID"}"#
    );
}

#[tokio::test]
async fn digest_of_file_matches_in_memory_digest() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("large.bin");
    let data: Vec<u8> = (0..200_000u32).map(|i| (i % 251) as u8).collect();
    std::fs::write(&path, &data).unwrap();

    let workflow = DigestWorkflow::default();
    let streamed = workflow.run_file(&path).await.unwrap();
    assert_eq!(streamed, workflow.run_bytes(&data));
    assert_eq!(streamed.as_slice().len(), 64);
}
