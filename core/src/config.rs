//! Rendering and help-flag configuration.
//!
//! The defaults reproduce the classic layout: four-space indent, a 20-column
//! flag column, a 20-column command column and an auto-injected `-h` flag.
//! A configuration can be kept in YAML next to the program.
//!
//! # Example YAML
//!
//! ```yaml
//! usage:
//!   indent: 2
//!   option_width: 24
//!   command_width: 16
//! help:
//!   flag: help
//!   description: print this text
//! ```

use std::io::{BufReader, BufWriter};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Column layout of usage text.
///
/// # Examples
///
/// ```
/// # use command_bind_core::UsageConfig;
/// let usage = UsageConfig::default();
/// assert_eq!(usage.indent, 4);
/// assert_eq!(usage.option_width, 20);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UsageConfig {
    /// Leading spaces before each option and command line.
    pub indent: usize,
    /// Width of the flag column; descriptions start at `indent + option_width`.
    pub option_width: usize,
    /// Width of the command-name column.
    pub command_width: usize,
}

impl Default for UsageConfig {
    fn default() -> Self {
        Self {
            indent: 4,
            option_width: 20,
            command_width: 20,
        }
    }
}

/// The auto-injected help flag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HelpConfig {
    /// Flag name without the leading dash.
    pub flag: String,
    /// Description shown in the options block.
    pub description: String,
}

impl Default for HelpConfig {
    fn default() -> Self {
        Self {
            flag: "h".to_string(),
            description: "show help".to_string(),
        }
    }
}

/// Top-level engine configuration.
///
/// Missing sections and keys fall back to their defaults, so an empty YAML
/// document is a valid configuration.
///
/// # Examples
///
/// ```no_run
/// use command_bind_core::BindConfig;
///
/// let config = BindConfig::load("bind.yml").unwrap();
/// println!("help flag: -{}", config.help.flag);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BindConfig {
    /// Usage text layout.
    pub usage: UsageConfig,
    /// Help flag settings.
    pub help: HelpConfig,
}

impl BindConfig {
    /// Loads configuration from a YAML file.
    ///
    /// # Errors
    ///
    /// Returns [`IoError`](ConfigError::IoError) if the file cannot be read,
    /// or [`YamlError`](ConfigError::YamlError) if parsing fails.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let file = std::fs::File::open(path)?;
        let reader = BufReader::new(file);
        let config = serde_yaml::from_reader(reader)?;
        Ok(config)
    }

    /// Parses configuration from a YAML string.
    ///
    /// ```
    /// use command_bind_core::BindConfig;
    ///
    /// let config = BindConfig::from_yaml("help:\n  flag: help\n").unwrap();
    /// assert_eq!(config.help.flag, "help");
    /// assert_eq!(config.help.description, "show help");
    /// assert_eq!(config.usage.indent, 4);
    /// ```
    pub fn from_yaml(text: &str) -> Result<Self, ConfigError> {
        Ok(serde_yaml::from_str(text)?)
    }

    /// Saves the configuration as YAML.
    ///
    /// # Errors
    ///
    /// Returns [`IoError`](ConfigError::IoError) if the file cannot be
    /// written, or [`YamlError`](ConfigError::YamlError) if serialization
    /// fails.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let file = std::fs::File::create(path)?;
        let writer = BufWriter::new(file);
        serde_yaml::to_writer(writer, self)?;
        Ok(())
    }
}
