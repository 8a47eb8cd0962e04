//! CMS signer CLI
//!
//! Signs documents with a key held in a PKCS#12 container, verifies CMS
//! blobs and prints document digests.

use clap::{Parser, Subcommand, ValueEnum};
use cms_signer::{
    config::{ConfigManager, ExportFormat, SignerConfiguration},
    Alias, DigestWorkflow, HashAlgorithm, Passphrase, SignWorkflow,
    TrustAnchors, VerifyWorkflow,
};
use miette::{Context, IntoDiagnostic, Result};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "cms-signer")]
#[command(about = "Attached CMS/PKCS#7 signing and verification with PKCS#12 credentials")]
#[command(long_about = "
CMS signer - document signing utility

EXAMPLES:
    # Sign a document, writing signed/signed_file_<N>.p7s
    cms-signer sign contract.pdf --pfx keystore.p12 --alias signer

    # Verify a signature and report signer metadata
    cms-signer verify signed/signed_file_0.p7s --trust-anchors roots.pem

    # Fingerprint a document
    cms-signer digest contract.pdf --hash sha512

ENVIRONMENT VARIABLES:
    CMS_SIGNER_PFX_PASSWORD   PKCS#12 password
    RUST_LOG                  Logging level (debug, info, warn, error)
")]
#[command(version)]
struct Cli {
    /// Configuration file (defaults to the user configuration directory)
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Sign a document, embedding it in a CMS SignedData structure
    Sign {
        /// Document to sign
        #[arg(value_name = "DOCUMENT")]
        document: PathBuf,

        /// PKCS#12 container holding the signing key and certificate
        #[arg(long, value_name = "FILE")]
        pfx: PathBuf,

        /// Container password
        #[arg(long, env = "CMS_SIGNER_PFX_PASSWORD", hide_env_values = true, default_value = "")]
        password: String,

        /// friendlyName of the key/certificate pair to use
        #[arg(long)]
        alias: Option<String>,

        /// Hash algorithm (overrides config)
        #[arg(long, value_enum)]
        hash: Option<HashAlgorithmArg>,

        /// Directory for the signed artifact (overrides config)
        #[arg(long, value_name = "DIR")]
        output_dir: Option<PathBuf>,

        /// Do not write the signed artifact to disk
        #[arg(long)]
        no_save: bool,
    },

    /// Verify a CMS blob and report signer metadata
    Verify {
        /// CMS blob (DER)
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// PEM bundle of trusted root certificates (overrides config)
        #[arg(long, value_name = "PEM")]
        trust_anchors: Option<PathBuf>,
    },

    /// Print the hex digest of a file
    Digest {
        #[arg(value_name = "FILE")]
        file: PathBuf,

        #[arg(long, value_enum, default_value = "sha512")]
        hash: DigestAlgorithmArg,
    },

    /// Configuration management
    #[command(subcommand)]
    Config(ConfigCommands),
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Show current configuration
    Show {
        #[arg(short, long, value_enum, default_value = "toml")]
        format: ExportFormatArg,
    },

    /// Create default configuration file
    Init,

    /// Print the configuration file path
    Path,
}

#[derive(ValueEnum, Clone, Copy)]
enum HashAlgorithmArg {
    Sha256,
    Sha384,
    Sha512,
}

impl From<HashAlgorithmArg> for HashAlgorithm {
    fn from(arg: HashAlgorithmArg) -> Self {
        match arg {
            HashAlgorithmArg::Sha256 => HashAlgorithm::Sha256,
            HashAlgorithmArg::Sha384 => HashAlgorithm::Sha384,
            HashAlgorithmArg::Sha512 => HashAlgorithm::Sha512,
        }
    }
}

#[derive(ValueEnum, Clone, Copy)]
enum DigestAlgorithmArg {
    Sha1,
    Sha256,
    Sha384,
    Sha512,
}

impl From<DigestAlgorithmArg> for HashAlgorithm {
    fn from(arg: DigestAlgorithmArg) -> Self {
        match arg {
            DigestAlgorithmArg::Sha1 => HashAlgorithm::Sha1,
            DigestAlgorithmArg::Sha256 => HashAlgorithm::Sha256,
            DigestAlgorithmArg::Sha384 => HashAlgorithm::Sha384,
            DigestAlgorithmArg::Sha512 => HashAlgorithm::Sha512,
        }
    }
}

#[derive(ValueEnum, Clone, Copy)]
enum ExportFormatArg {
    Toml,
    Json,
}

impl From<ExportFormatArg> for ExportFormat {
    fn from(arg: ExportFormatArg) -> Self {
        match arg {
            ExportFormatArg::Toml => ExportFormat::Toml,
            ExportFormatArg::Json => ExportFormat::Json,
        }
    }
}

/// Parameters for the sign command
struct SignCommandArgs {
    document: PathBuf,
    pfx: PathBuf,
    password: String,
    alias: Option<String>,
    hash: Option<HashAlgorithmArg>,
    output_dir: Option<PathBuf>,
    no_save: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let config_manager = match &cli.config {
        Some(path) => ConfigManager::with_path(path),
        None => ConfigManager::new().into_diagnostic()?,
    };

    match cli.command {
        Commands::Sign {
            document,
            pfx,
            password,
            alias,
            hash,
            output_dir,
            no_save,
        } => {
            let args = SignCommandArgs {
                document,
                pfx,
                password,
                alias,
                hash,
                output_dir,
                no_save,
            };
            handle_sign_command(&config_manager, args).await?;
        }

        Commands::Verify {
            file,
            trust_anchors,
        } => {
            handle_verify_command(&config_manager, &file, trust_anchors).await?;
        }

        Commands::Digest { file, hash } => {
            let digest = DigestWorkflow::new(hash.into())
                .run_file_hex(&file)
                .await
                .into_diagnostic()?;
            println!("{digest}");
        }

        Commands::Config(config_cmd) => {
            handle_config_command(&config_manager, config_cmd)?;
        }
    }

    Ok(())
}

async fn handle_sign_command(config_manager: &ConfigManager, args: SignCommandArgs) -> Result<()> {
    let mut config = config_manager.load_or_default().into_diagnostic()?;
    if let Some(hash) = args.hash {
        config.default_hash_algorithm = HashAlgorithm::from(hash).as_str().to_string();
    }
    if let Some(dir) = args.output_dir {
        config.output.directory = dir;
    }

    if args.no_save {
        config.output.persist_signed_files = false;
    }
    let workflow = SignWorkflow::from_config(&config).into_diagnostic()?;

    let outcome = workflow
        .sign_file(
            &args.document,
            &args.pfx,
            Passphrase::new(args.password),
            args.alias.and_then(Alias::new),
        )
        .await
        .into_diagnostic()
        .with_context(|| format!("Failed to sign {}", args.document.display()))?;

    if outcome.method.is_low_confidence() {
        log::warn!("Credential chosen without matching alias or localKeyId");
    }

    let out = serde_json::json!({
        "signature": outcome.base64,
        "path": outcome.artifact.as_ref().map(|p| p.display().to_string()),
    });
    println!(
        "{}",
        serde_json::to_string_pretty(&out).into_diagnostic()?
    );
    Ok(())
}

async fn handle_verify_command(
    config_manager: &ConfigManager,
    file: &Path,
    trust_anchors: Option<PathBuf>,
) -> Result<()> {
    let config = config_manager.load_or_default().into_diagnostic()?;
    let mut workflow = VerifyWorkflow::new();
    if let Some(path) = trust_anchors.or(config.trust.anchors_path) {
        let anchors = TrustAnchors::from_pem_file(&path).into_diagnostic()?;
        workflow = workflow.with_trust_anchors(anchors);
    }

    let report = workflow.run_file(file).await;
    println!(
        "{}",
        serde_json::to_string_pretty(&report).into_diagnostic()?
    );
    Ok(())
}

fn handle_config_command(config_manager: &ConfigManager, config_cmd: ConfigCommands) -> Result<()> {
    match config_cmd {
        ConfigCommands::Show { format } => {
            if config_manager.config_path().exists() {
                let content = config_manager
                    .export_config(format.into())
                    .into_diagnostic()?;
                println!("{content}");
            } else {
                let defaults = SignerConfiguration::default();
                println!("# No configuration file found; showing defaults. Use 'config init' to create one.");
                let content = match format {
                    ExportFormatArg::Toml => toml::to_string_pretty(&defaults).into_diagnostic()?,
                    ExportFormatArg::Json => {
                        serde_json::to_string_pretty(&defaults).into_diagnostic()?
                    }
                };
                println!("{content}");
            }
        }

        ConfigCommands::Init => {
            config_manager.load_or_create_default().into_diagnostic()?;
            println!(
                "Configuration initialized: {}",
                config_manager.config_path().display()
            );
        }

        ConfigCommands::Path => {
            println!("{}", config_manager.config_path().display());
        }
    }

    Ok(())
}
