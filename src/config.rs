//! # Configuration Management
//!
//! Centralized configuration for the codec core.
//!
//! This module provides the resource limits applied by both codecs and the
//! startup description of where schemas come from.
//!
//! ## Configuration Sources
//! - TOML files via `from_file()`
//! - Direct instantiation with defaults
//! - Programmatic overrides via `default_with_overrides()`
//! - Schema files may declare tighter limits, applied by `build_codec()`
//!
//! ## Security Considerations
//! - The depth ceiling bounds recursion in every encoder and decoder
//! - Length fields are validated against the remaining input before allocation,
//!   then against the limits configured here

use crate::error::{CodecError, Result};
use crate::protocol::catalog;
use crate::protocol::envelope::EnvelopeCodec;
use crate::protocol::registry::SchemaRegistry;
use crate::protocol::schema::SchemaIr;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

/// Current frame layout version
pub const FRAME_VERSION: u8 = 1;

/// Magic bytes to identify packet frames ("XPKT")
pub const MAGIC_BYTES: [u8; 4] = [0x58, 0x50, 0x4B, 0x54];

/// Max allowed encoded envelope size (16 MB)
pub const MAX_PAYLOAD_SIZE: usize = 16 * 1024 * 1024;

/// Default nesting ceiling for value trees
pub const MAX_DEPTH: usize = crate::core::value::DEFAULT_MAX_DEPTH;

/// Default maximum number of elements in one sequence or mapping
pub const MAX_COLLECTION_LEN: usize = 100_000;

/// Default maximum string length in bytes
pub const MAX_STRING_LEN: usize = 10_000_000;

/// Main codec configuration structure
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct CodecConfig {
    /// Resource limits shared by the text and binary codecs
    #[serde(default)]
    pub limits: CodecLimits,

    /// Where schemas are loaded from at startup
    #[serde(default)]
    pub registry: RegistryConfig,
}

impl CodecConfig {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut file = File::open(path)
            .map_err(|e| CodecError::ConfigError(format!("Failed to open config file: {e}")))?;

        let mut contents = String::new();
        file.read_to_string(&mut contents)
            .map_err(|e| CodecError::ConfigError(format!("Failed to read config file: {e}")))?;

        Self::from_toml(&contents)
    }

    /// Load configuration from TOML string
    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str::<Self>(content)
            .map_err(|e| CodecError::ConfigError(format!("Failed to parse TOML: {e}")))
    }

    /// Apply overrides to the default configuration
    pub fn default_with_overrides<F>(mutator: F) -> Self
    where
        F: FnOnce(&mut Self),
    {
        let mut config = Self::default();
        mutator(&mut config);
        config
    }

    /// Generate example configuration file content
    pub fn example_config() -> String {
        toml::to_string_pretty(&Self::default())
            .unwrap_or_else(|_| String::from("# Failed to generate example config"))
    }

    /// Save configuration to a file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| CodecError::ConfigError(format!("Failed to serialize config: {e}")))?;

        std::fs::write(path, content)
            .map_err(|e| CodecError::ConfigError(format!("Failed to write config file: {e}")))?;

        Ok(())
    }

    /// Validate the configuration for common issues and misconfigurations
    ///
    /// Returns a list of validation errors. Empty list means configuration is valid.
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        errors.extend(self.limits.validate());
        errors.extend(self.registry.validate());
        errors
    }

    /// Validate and return Result - convenience method
    pub fn validate_strict(&self) -> Result<()> {
        let errors = self.validate();
        if errors.is_empty() {
            Ok(())
        } else {
            Err(CodecError::ConfigError(format!(
                "Configuration validation failed:\n  - {}",
                errors.join("\n  - ")
            )))
        }
    }

    /// Build the schema registry described by this configuration.
    ///
    /// Starts from the built-in catalog when `include_builtin` is set, then
    /// registers every schema from each configured IR file in order.
    pub fn build_registry(&self) -> Result<SchemaRegistry> {
        self.load_schemas().map(|(registry, _)| registry)
    }

    /// Build an envelope codec over the configured registry.
    ///
    /// Limits declared by the loaded schema files tighten the configured
    /// limits; they never raise them.
    pub fn build_codec(&self) -> Result<EnvelopeCodec> {
        let (registry, limits) = self.load_schemas()?;
        Ok(EnvelopeCodec::new(Arc::new(registry)).with_limits(limits))
    }

    fn load_schemas(&self) -> Result<(SchemaRegistry, CodecLimits)> {
        let mut registry = if self.registry.include_builtin {
            catalog::builtin_registry()
        } else {
            SchemaRegistry::new()
        };
        let mut limits = self.limits;

        for path in &self.registry.schema_files {
            let ir = SchemaIr::from_file(path)?;
            debug!(path = %path, schemas = ir.len(), "Loaded schema IR");
            limits = ir.tighten(limits);
            registry.register_all(ir)?;
        }

        Ok((registry, limits))
    }
}

/// Resource limits applied by both codecs
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct CodecLimits {
    /// Maximum nesting depth of a value tree (root mapping counts as 1)
    pub max_depth: usize,

    /// Maximum size of one encoded envelope in bytes
    pub max_input_size: usize,

    /// Maximum number of elements in one sequence or entries in one mapping
    pub max_collection_len: usize,

    /// Maximum byte length of one string
    pub max_string_len: usize,

    /// Maximum byte length of one binary blob
    pub max_binary_len: usize,
}

impl Default for CodecLimits {
    fn default() -> Self {
        Self {
            max_depth: MAX_DEPTH,
            max_input_size: MAX_PAYLOAD_SIZE,
            max_collection_len: MAX_COLLECTION_LEN,
            max_string_len: MAX_STRING_LEN,
            max_binary_len: MAX_PAYLOAD_SIZE,
        }
    }
}

impl CodecLimits {
    /// Fail with `AllocationLimitExceeded` when `requested` is over `limit`.
    #[inline]
    pub(crate) fn guard(requested: usize, limit: usize) -> Result<()> {
        if requested > limit {
            Err(CodecError::AllocationLimitExceeded { requested, limit })
        } else {
            Ok(())
        }
    }

    /// Validate limit configuration
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        // The text parser has its own fixed recursion ceiling of 128
        if self.max_depth == 0 {
            errors.push("Max depth must be greater than 0".to_string());
        } else if self.max_depth > 128 {
            errors.push(format!(
                "Max depth too large: {} (maximum: 128)",
                self.max_depth
            ));
        }

        if self.max_input_size == 0 {
            errors.push("Max input size cannot be 0".to_string());
        } else if self.max_input_size > 100 * 1024 * 1024 {
            errors.push(format!(
                "Max input size too large: {} bytes (maximum recommended: 100 MB)",
                self.max_input_size
            ));
        }

        if self.max_collection_len == 0 {
            errors.push("Max collection length must be greater than 0".to_string());
        }

        if self.max_string_len == 0 {
            errors.push("Max string length must be greater than 0".to_string());
        }

        if self.max_binary_len > self.max_input_size {
            errors.push("Max binary length cannot be larger than max input size".to_string());
        }

        errors
    }
}

/// Schema source configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RegistryConfig {
    /// Whether the built-in packet catalog is registered
    pub include_builtin: bool,

    /// Schema IR files (JSON or TOML) registered after the catalog
    pub schema_files: Vec<String>,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            include_builtin: true,
            schema_files: Vec::new(),
        }
    }
}

impl RegistryConfig {
    /// Validate registry configuration
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        for path in &self.schema_files {
            if path.is_empty() {
                errors.push("Schema file path cannot be empty".to_string());
            } else if !Path::new(path).exists() {
                errors.push(format!("Schema file does not exist: {path}"));
            }
        }

        if !self.include_builtin && self.schema_files.is_empty() {
            errors.push(
                "No schemas configured: enable include_builtin or list schema_files".to_string(),
            );
        }

        errors
    }
}
