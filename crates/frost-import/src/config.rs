//! Importer configuration (frost.toml)
//!
//! ```toml
//! mounts = ["/", "/stdlib", "/site-packages"]
//! compiled_suffix = "frz"
//! path_dirs = ["lib", "$APP_PLUGINS/site"]
//! ```

use std::path::{Component, Path, PathBuf};
use std::sync::LazyLock;

use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur loading a configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read config file
    #[error("Failed to read config file: {0}")]
    IoError(#[from] std::io::Error),

    /// Failed to parse TOML
    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),

    /// Validation error
    #[error("Invalid config: {0}")]
    ValidationError(String),
}

/// Configuration of the import subsystem.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ImportConfig {
    /// Mount prefixes, in search-path order
    #[serde(default = "default_mounts")]
    pub mounts: Vec<String>,

    /// Suffix of frozen code blobs (without the dot)
    #[serde(default = "default_compiled_suffix")]
    pub compiled_suffix: String,

    /// Suffix of adjacent extension modules; platform default when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub native_suffix: Option<String>,

    /// Directory to search for adjacent extensions instead of the
    /// executable's own directory
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub executable_dir: Option<PathBuf>,

    /// On-disk directories appended to the search path after the mounts
    #[serde(default)]
    pub path_dirs: Vec<String>,
}

fn default_mounts() -> Vec<String> {
    vec!["/".to_string(), "/stdlib".to_string(), "/site-packages".to_string()]
}

fn default_compiled_suffix() -> String {
    "frz".to_string()
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            mounts: default_mounts(),
            compiled_suffix: default_compiled_suffix(),
            native_suffix: None,
            executable_dir: None,
            path_dirs: Vec::new(),
        }
    }
}

impl ImportConfig {
    /// Parse and validate a configuration from TOML text.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: ImportConfig = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a configuration file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    /// Check the invariants the importer relies on.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.mounts.is_empty() {
            return Err(ConfigError::ValidationError("no mounts configured".to_string()));
        }
        for mount in &self.mounts {
            if !mount.starts_with('/') {
                return Err(ConfigError::ValidationError(format!(
                    "mount {:?} must be an absolute virtual path",
                    mount
                )));
            }
        }
        check_suffix("compiled_suffix", &self.compiled_suffix)?;
        if let Some(suffix) = &self.native_suffix {
            check_suffix("native_suffix", suffix)?;
        }
        Ok(())
    }

    /// Expand `path_dirs` into absolute, cleaned directories.
    ///
    /// `$NAME` is replaced by the environment variable (empty when unset);
    /// relative results are taken relative to `exec_dir`.
    pub fn expanded_path_dirs(&self, exec_dir: Option<&Path>) -> Vec<PathBuf> {
        self.path_dirs
            .iter()
            .map(|dir| {
                let expanded = PathBuf::from(expand_env_vars(dir));
                let absolute = match exec_dir {
                    Some(base) if expanded.is_relative() => base.join(expanded),
                    _ => expanded,
                };
                clean_path(&absolute)
            })
            .collect()
    }
}

fn check_suffix(field: &str, suffix: &str) -> Result<(), ConfigError> {
    if suffix.is_empty() || suffix.contains('.') || suffix.contains('/') {
        return Err(ConfigError::ValidationError(format!(
            "{} {:?} must be a non-empty suffix without dots or slashes",
            field, suffix
        )));
    }
    Ok(())
}

static ENV_VAR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$([A-Za-z0-9_]+)").expect("valid env var pattern"));

/// Replace every `$NAME` with the value of that environment variable.
fn expand_env_vars(text: &str) -> String {
    ENV_VAR
        .replace_all(text, |caps: &Captures<'_>| std::env::var(&caps[1]).unwrap_or_default())
        .into_owned()
}

/// Lexically remove `.` and resolve `..` without touching the disk.
fn clean_path(path: &Path) -> PathBuf {
    let mut cleaned = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !cleaned.pop() {
                    cleaned.push(component);
                }
            }
            other => cleaned.push(other),
        }
    }
    cleaned
}
