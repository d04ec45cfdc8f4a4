//! # Configuration Management
//!
//! Centralized configuration for the codec and the packet bridge.
//!
//! ## Configuration Sources
//! - TOML files via `from_file()`
//! - Direct instantiation with defaults
//! - Environment overrides via `from_env()`
//!
//! ## Security Considerations
//! - The default string limit (32767) and NBT quota (2 MiB) match what the
//!   protocol itself enforces; raising them widens the allocation surface of
//!   every decode
//! - Frame size caps bound how much a peer can make us buffer

use crate::core::buffer::CodecLimits;
use crate::error::{ProtocolError, Result};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Read;
use std::path::Path;
use tracing::Level;

/// Longest string, in UTF-16 units, accepted by default
pub const DEFAULT_MAX_STRING_LENGTH: usize = 32767;

/// Tracked allocation quota for one NBT tree (2 MiB)
pub const NBT_MAX_BYTES: usize = 2 * 1024 * 1024;

/// Maximum NBT nesting depth
pub const NBT_MAX_DEPTH: usize = 512;

/// Largest frame a 3-byte VarInt length prefix can declare
pub const MAX_FRAME_SIZE: usize = (1 << 21) - 1;

/// Main configuration structure that contains all configurable settings
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct BridgeConfig {
    /// Codec limits
    #[serde(default)]
    pub codec: CodecConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl BridgeConfig {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut file = File::open(path)
            .map_err(|e| ProtocolError::ConfigError(format!("Failed to open config file: {e}")))?;

        let mut contents = String::new();
        file.read_to_string(&mut contents)
            .map_err(|e| ProtocolError::ConfigError(format!("Failed to read config file: {e}")))?;

        Self::from_toml(&contents)
    }

    /// Load configuration from TOML string
    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str::<Self>(content)
            .map_err(|e| ProtocolError::ConfigError(format!("Failed to parse TOML: {e}")))
    }

    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        if let Ok(value) = std::env::var("PACKET_BRIDGE_MAX_STRING_LENGTH") {
            if let Ok(val) = value.parse::<usize>() {
                config.codec.max_string_length = val;
            }
        }

        if let Ok(value) = std::env::var("PACKET_BRIDGE_NBT_MAX_BYTES") {
            if let Ok(val) = value.parse::<usize>() {
                config.codec.nbt_max_bytes = val;
            }
        }

        if let Ok(value) = std::env::var("PACKET_BRIDGE_MAX_FRAME_SIZE") {
            if let Ok(val) = value.parse::<usize>() {
                config.codec.max_frame_size = val;
            }
        }

        if let Ok(value) = std::env::var("PACKET_BRIDGE_LOG_LEVEL") {
            if let Ok(level) = value.parse::<Level>() {
                config.logging.log_level = level;
            }
        }

        Ok(config)
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
            .map_err(|e| ProtocolError::ConfigError(format!("Failed to serialize config: {e}")))?;

        std::fs::write(path, content)
            .map_err(|e| ProtocolError::ConfigError(format!("Failed to write config file: {e}")))?;

        Ok(())
    }

    /// Validate the configuration for common issues and misconfigurations
    ///
    /// Returns a list of validation errors. Empty list means configuration is valid.
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        errors.extend(self.codec.validate());
        errors.extend(self.logging.validate());
        errors
    }

    /// Validate and return Result - convenience method
    pub fn validate_strict(&self) -> Result<()> {
        let errors = self.validate();
        if errors.is_empty() {
            Ok(())
        } else {
            Err(ProtocolError::ConfigError(format!(
                "Configuration validation failed:\n  - {}",
                errors.join("\n  - ")
            )))
        }
    }
}

/// Decode limits applied to every buffer
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CodecConfig {
    /// Maximum decoded string length, in UTF-16 units
    pub max_string_length: usize,

    /// Tracked allocation quota for one NBT tree, in bytes
    pub nbt_max_bytes: usize,

    /// Maximum NBT nesting depth
    pub nbt_max_depth: usize,

    /// Maximum frame length accepted by the frame codec
    pub max_frame_size: usize,
}

impl Default for CodecConfig {
    fn default() -> Self {
        Self {
            max_string_length: DEFAULT_MAX_STRING_LENGTH,
            nbt_max_bytes: NBT_MAX_BYTES,
            nbt_max_depth: NBT_MAX_DEPTH,
            max_frame_size: MAX_FRAME_SIZE,
        }
    }
}

impl CodecConfig {
    /// Limits carried by buffers built from this configuration
    pub fn limits(&self) -> CodecLimits {
        CodecLimits {
            max_string_length: self.max_string_length,
            nbt_max_bytes: self.nbt_max_bytes,
            nbt_max_depth: self.nbt_max_depth,
        }
    }

    /// Validate codec configuration
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if self.max_string_length == 0 {
            errors.push("Max string length must be greater than 0".to_string());
        } else if self.max_string_length > i32::MAX as usize / 4 {
            errors.push(format!(
                "Max string length too large: {} (raw byte bound must fit in a VarInt)",
                self.max_string_length
            ));
        }

        if self.nbt_max_bytes < 64 {
            errors.push("NBT quota too small (minimum: 64 bytes)".to_string());
        } else if self.nbt_max_bytes > 64 * 1024 * 1024 {
            errors.push(format!(
                "NBT quota too large: {} bytes (maximum recommended: 64 MB)",
                self.nbt_max_bytes
            ));
        }

        if self.nbt_max_depth == 0 {
            errors.push("NBT depth must be greater than 0".to_string());
        } else if self.nbt_max_depth > 4096 {
            errors.push(format!(
                "NBT depth too large: {} (maximum: 4096)",
                self.nbt_max_depth
            ));
        }

        if self.max_frame_size == 0 {
            errors.push("Max frame size cannot be 0".to_string());
        } else if self.max_frame_size > MAX_FRAME_SIZE {
            errors.push(format!(
                "Max frame size too large: {} bytes (a 3-byte length prefix allows {MAX_FRAME_SIZE})",
                self.max_frame_size
            ));
        }

        errors
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    /// Application name for logs
    pub app_name: String,

    /// Log level
    #[serde(with = "log_level_serde")]
    pub log_level: Level,

    /// Whether to use JSON formatting for logs
    pub json_format: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            app_name: String::from("packet-bridge"),
            log_level: Level::INFO,
            json_format: false,
        }
    }
}

impl LoggingConfig {
    /// Validate logging configuration
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if self.app_name.is_empty() {
            errors.push("Application name cannot be empty".to_string());
        } else if self.app_name.len() > 64 {
            errors.push(format!(
                "Application name too long: {} characters (maximum: 64)",
                self.app_name.len()
            ));
        }

        errors
    }
}

/// Helper module for tracing::Level serialization/deserialization
mod log_level_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::str::FromStr;
    use tracing::Level;

    pub fn serialize<S>(level: &Level, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let level_str = match *level {
            Level::TRACE => "trace",
            Level::DEBUG => "debug",
            Level::INFO => "info",
            Level::WARN => "warn",
            Level::ERROR => "error",
        };
        level_str.serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Level, D::Error>
    where
        D: Deserializer<'de>,
    {
        let level_str = String::deserialize(deserializer)?;
        Level::from_str(&level_str)
            .map_err(|_| serde::de::Error::custom(format!("Invalid log level: {level_str}")))
    }
}
