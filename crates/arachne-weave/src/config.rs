//! Weave pass configuration.
//!
//! Options are layered: built-in defaults, then an optional `arachne.toml`
//! (its `[weave]` table), then explicit `with_*` overrides from the CLI or a
//! build script.
//!
//! # Example
//!
//! ```
//! use arachne_weave::WeaveConfig;
//!
//! let config = WeaveConfig::default()
//!     .with_source_root("src")
//!     .with_output_root("generated");
//! assert!(config.validate().is_ok());
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{WeaveError, WeaveResult};

/// File name the CLI looks for when no `--config` is given.
pub const DEFAULT_CONFIG_FILE: &str = "arachne.toml";

/// Options controlling a weave pass.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct WeaveConfig {
    /// Directory scanned recursively for `.rs` source files.
    pub source_root: PathBuf,

    /// Directory receiving generated mirror files, laid out with the same
    /// relative paths as their sources.
    pub output_root: PathBuf,

    /// File name of the aggregated registry module, created directly under
    /// the output root.
    pub registry_file: String,

    /// Suffix appended to a woven method's name for its renamed inner copy.
    pub inner_suffix: String,

    /// Directory names skipped during the scan, in addition to hidden
    /// directories and `target`.
    pub exclude: Vec<String>,
}

impl Default for WeaveConfig {
    fn default() -> Self {
        Self {
            source_root: PathBuf::from("src"),
            output_root: PathBuf::from("generated"),
            registry_file: "chain_registry.rs".to_string(),
            inner_suffix: "__inner".to_string(),
            exclude: Vec::new(),
        }
    }
}

impl WeaveConfig {
    /// Loads configuration from a TOML or JSON file's `weave` table.
    ///
    /// Fields absent from the file keep their defaults. The format is chosen
    /// by file extension.
    ///
    /// # Errors
    ///
    /// Returns `WeaveError::ConfigFile` if the file is missing, unreadable,
    /// or not parseable in the chosen format.
    pub fn from_file<P: AsRef<Path>>(path: P) -> WeaveResult<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .map_err(|e| WeaveError::config_file(path, e.to_string()))?;

        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_lowercase);

        match extension.as_deref() {
            Some("toml") => Self::from_toml_str(&content)
                .map_err(|message| WeaveError::config_file(path, message)),
            Some("json") => {
                let file: ConfigFile = serde_json::from_str(&content)
                    .map_err(|e| WeaveError::config_file(path, e.to_string()))?;
                Ok(file.weave)
            }
            _ => Err(WeaveError::config_file(
                path,
                "unsupported configuration format, expected .toml or .json",
            )),
        }
    }

    /// Parses configuration from a TOML document's `weave` table.
    ///
    /// # Errors
    ///
    /// Returns the parser's diagnostic on invalid TOML or unknown fields.
    pub fn from_toml_str(content: &str) -> Result<Self, String> {
        let file: ConfigFile = toml::from_str(content).map_err(|e| e.to_string())?;
        Ok(file.weave)
    }

    /// Sets the source root.
    #[must_use]
    pub fn with_source_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.source_root = root.into();
        self
    }

    /// Sets the output root.
    #[must_use]
    pub fn with_output_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.output_root = root.into();
        self
    }

    /// Sets the registry file name.
    #[must_use]
    pub fn with_registry_file(mut self, name: impl Into<String>) -> Self {
        self.registry_file = name.into();
        self
    }

    /// Sets the inner-copy name suffix.
    #[must_use]
    pub fn with_inner_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.inner_suffix = suffix.into();
        self
    }

    /// Adds a directory name to skip during the scan.
    #[must_use]
    pub fn with_exclude(mut self, dir: impl Into<String>) -> Self {
        self.exclude.push(dir.into());
        self
    }

    /// Absolute or project-relative path of the aggregated registry module.
    #[must_use]
    pub fn registry_path(&self) -> PathBuf {
        self.output_root.join(&self.registry_file)
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns `WeaveError::InvalidConfig` if:
    /// - a root path is empty, or the roots are the same directory
    /// - the registry file name is not a bare `.rs` file name
    /// - the inner suffix is empty or not a valid identifier fragment
    /// - an exclude entry is not a bare directory name
    pub fn validate(&self) -> WeaveResult<()> {
        if self.source_root.as_os_str().is_empty() {
            return Err(WeaveError::invalid_config(
                "source_root",
                "must not be empty",
            ));
        }
        if self.output_root.as_os_str().is_empty() {
            return Err(WeaveError::invalid_config(
                "output_root",
                "must not be empty",
            ));
        }
        if self.source_root == self.output_root {
            return Err(WeaveError::invalid_config(
                "output_root",
                "must differ from source_root, generated files would overwrite sources",
            ));
        }

        if !self.registry_file.ends_with(".rs") {
            return Err(WeaveError::invalid_config(
                "registry_file",
                "must end with .rs",
            ));
        }
        if self.registry_file.contains(['/', '\\']) {
            return Err(WeaveError::invalid_config(
                "registry_file",
                "must be a bare file name under the output root",
            ));
        }

        if self.inner_suffix.is_empty() {
            return Err(WeaveError::invalid_config(
                "inner_suffix",
                "must not be empty",
            ));
        }
        if !self
            .inner_suffix
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_')
        {
            return Err(WeaveError::invalid_config(
                "inner_suffix",
                "must contain only letters, digits, and underscores",
            ));
        }

        for entry in &self.exclude {
            if entry.is_empty() || entry.contains(['/', '\\']) {
                return Err(WeaveError::invalid_config(
                    "exclude",
                    format!("`{entry}` must be a bare directory name"),
                ));
            }
        }

        Ok(())
    }
}

/// On-disk shape of `arachne.toml`.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigFile {
    #[serde(default)]
    weave: WeaveConfig,
}
