//! Configuration management infrastructure.
//!
//! Persists signing defaults (hash algorithm, artifact output location, trust
//! anchors) in a TOML file under the user's configuration directory.

use crate::infra::error::{SigningError, SigningResult};
use crate::HashAlgorithm;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Application configuration with all signing preferences
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignerConfiguration {
    /// Default hash algorithm for new signatures
    pub default_hash_algorithm: String,

    /// Where signed artifacts are written
    pub output: OutputConfig,

    /// Trust anchors used when verifying
    #[serde(default)]
    pub trust: TrustConfig,
}

/// Signed artifact output configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Directory receiving `<base_name>_<N>.<extension>` files
    pub directory: PathBuf,

    pub base_name: String,

    pub extension: String,

    /// Whether signing writes the blob to disk at all
    pub persist_signed_files: bool,
}

/// Trust anchor configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrustConfig {
    /// PEM bundle of trusted root certificates
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub anchors_path: Option<PathBuf>,
}

impl Default for SignerConfiguration {
    fn default() -> Self {
        Self {
            default_hash_algorithm: "sha512".to_string(),
            output: OutputConfig::default(),
            trust: TrustConfig::default(),
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("signed"),
            base_name: "signed_file".to_string(),
            extension: "p7s".to_string(),
            persist_signed_files: true,
        }
    }
}

impl SignerConfiguration {
    /// Parsed default hash algorithm.
    pub fn hash_algorithm(&self) -> SigningResult<HashAlgorithm> {
        self.default_hash_algorithm
            .parse::<HashAlgorithm>()
            .map_err(|_| {
                SigningError::ConfigurationError(format!(
                    "Invalid hash algorithm: {}",
                    self.default_hash_algorithm
                ))
            })
    }
}

/// Configuration manager for handling config files
pub struct ConfigManager {
    config_path: PathBuf,
}

impl ConfigManager {
    /// Create a new configuration manager with default path
    pub fn new() -> SigningResult<Self> {
        let config_path = Self::default_config_path()?;
        Ok(Self { config_path })
    }

    /// Create a configuration manager with custom path
    pub fn with_path<P: AsRef<Path>>(path: P) -> Self {
        Self {
            config_path: path.as_ref().to_path_buf(),
        }
    }

    /// Get the default configuration file path
    pub fn default_config_path() -> SigningResult<PathBuf> {
        if let Some(config_dir) = dirs::config_dir() {
            Ok(config_dir.join("cms-signer").join("config.toml"))
        } else {
            // Fallback to current directory
            Ok(PathBuf::from("cms-signer-config.toml"))
        }
    }

    /// Load configuration from file, creating default if it doesn't exist
    pub fn load_or_create_default(&self) -> SigningResult<SignerConfiguration> {
        if self.config_path.exists() {
            self.load()
        } else {
            log::info!(
                "Configuration file not found, creating default: {}",
                self.config_path.display()
            );
            let default_config = SignerConfiguration::default();
            self.save(&default_config)?;
            Ok(default_config)
        }
    }

    /// Load configuration from file, falling back to defaults without writing anything
    pub fn load_or_default(&self) -> SigningResult<SignerConfiguration> {
        if self.config_path.exists() {
            self.load()
        } else {
            log::debug!(
                "No configuration at {}, using defaults",
                self.config_path.display()
            );
            Ok(SignerConfiguration::default())
        }
    }

    /// Load configuration from file
    pub fn load(&self) -> SigningResult<SignerConfiguration> {
        log::info!("Loading configuration from: {}", self.config_path.display());

        let content = fs::read_to_string(&self.config_path).map_err(|e| {
            SigningError::ConfigurationError(format!(
                "Failed to read config file {}: {}",
                self.config_path.display(),
                e
            ))
        })?;

        let config: SignerConfiguration = toml::from_str(&content).map_err(|e| {
            SigningError::ConfigurationError(format!("Failed to parse config file: {e}"))
        })?;

        Self::validate_config(&config)?;
        Ok(config)
    }

    /// Save configuration to file
    pub fn save(&self, config: &SignerConfiguration) -> SigningResult<()> {
        Self::validate_config(config)?;
        log::info!("Saving configuration to: {}", self.config_path.display());

        if let Some(parent) = self.config_path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|e| {
                    SigningError::ConfigurationError(format!(
                        "Failed to create config directory {}: {}",
                        parent.display(),
                        e
                    ))
                })?;
            }
        }

        let content = toml::to_string_pretty(config).map_err(|e| {
            SigningError::ConfigurationError(format!("Failed to serialize config: {e}"))
        })?;

        fs::write(&self.config_path, content).map_err(|e| {
            SigningError::ConfigurationError(format!(
                "Failed to write config file {}: {}",
                self.config_path.display(),
                e
            ))
        })?;

        log::info!("Configuration saved successfully");
        Ok(())
    }

    /// Validate configuration values
    pub fn validate_config(config: &SignerConfiguration) -> SigningResult<()> {
        let algo = config.hash_algorithm()?;
        if !algo.is_signing_grade() {
            return Err(SigningError::ConfigurationError(format!(
                "{algo} cannot be used as the default signing hash"
            )));
        }

        let output = &config.output;
        if output.base_name.trim().is_empty() {
            return Err(SigningError::ConfigurationError(
                "Output base name must not be empty".to_string(),
            ));
        }
        if output
            .base_name
            .contains(|c: char| std::path::is_separator(c))
        {
            return Err(SigningError::ConfigurationError(format!(
                "Output base name must not contain path separators: {}",
                output.base_name
            )));
        }
        if output.extension.is_empty() || output.extension.starts_with('.') {
            return Err(SigningError::ConfigurationError(format!(
                "Output extension must be non-empty and given without a leading dot: {:?}",
                output.extension
            )));
        }

        Ok(())
    }

    /// Get the configuration file path
    #[must_use]
    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    /// Export configuration as a portable format
    pub fn export_config(&self, format: ExportFormat) -> SigningResult<String> {
        let config = self.load()?;

        match format {
            ExportFormat::Toml => toml::to_string_pretty(&config)
                .map_err(|e| SigningError::ConfigurationError(format!("TOML export failed: {e}"))),
            ExportFormat::Json => serde_json::to_string_pretty(&config)
                .map_err(|e| SigningError::ConfigurationError(format!("JSON export failed: {e}"))),
        }
    }
}

/// Configuration export formats
#[derive(Debug, Clone, Copy)]
pub enum ExportFormat {
    Toml,
    Json,
}
