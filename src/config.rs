//! Configuration management for Cheatsheet Composer
//!
//! Handles loading, saving, and validating application configuration.
//! Configuration is persisted as JSON in the per-user configuration directory.

use crate::error::{ConfigError, ConfigResult};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Application identifier following reverse-DNS convention
pub const APP_ID: &str = "com.cheatsheet.Composer";

/// Name of the configuration file inside the configuration directory
pub const CONFIG_FILE_NAME: &str = "config.json";

/// Number of empty columns a fresh composer starts with
pub const DEFAULT_INITIAL_COLUMNS: usize = 3;

/// Delay between invoking print and tearing the surface down, in milliseconds
pub const DEFAULT_TEARDOWN_GRACE_MS: u64 = 100;

/// KaTeX stylesheet referenced by exported documents
pub const DEFAULT_MATH_STYLESHEET_HREF: &str =
    "https://cdn.jsdelivr.net/npm/katex@0.16.0/dist/katex.min.css";

/// Subresource integrity hash of [`DEFAULT_MATH_STYLESHEET_HREF`]
pub const DEFAULT_MATH_STYLESHEET_INTEGRITY: &str =
    "sha384-Xi8rHCmBmhbuyyhbI88391ZKP2dmfnOl4rT9ZfRI7mLTdk1wblIUnrIq35nqwEvC";

/// KaTeX typesetting script
pub const DEFAULT_MATH_SCRIPT_HREF: &str =
    "https://cdn.jsdelivr.net/npm/katex@0.16.0/dist/katex.min.js";

/// Subresource integrity hash of [`DEFAULT_MATH_SCRIPT_HREF`]
pub const DEFAULT_MATH_SCRIPT_INTEGRITY: &str =
    "sha384-X/XCfMm41VSsqRNQgDerQczD69XqmjOOOwYQvr/uuC+j4OPoNhVgjdGFwhvN02Ja";

/// KaTeX auto-render extension; typesets `\(..\)` and `\[..\]` spans on load
pub const DEFAULT_MATH_AUTO_RENDER_HREF: &str =
    "https://cdn.jsdelivr.net/npm/katex@0.16.0/dist/contrib/auto-render.min.js";

/// Subresource integrity hash of [`DEFAULT_MATH_AUTO_RENDER_HREF`]
pub const DEFAULT_MATH_AUTO_RENDER_INTEGRITY: &str =
    "sha384-+XBljXPPiv+OzfbB3cVmLHf4hdUFHlWNZN5spNQ7rmHTXpd7WvJum6fIACpNNfIR";

/// Application configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Column configuration
    pub columns: ColumnConfig,

    /// Export configuration
    pub export: ExportConfig,
}

impl Config {
    /// Load configuration from the user's configuration directory,
    /// falling back to defaults when no file exists yet
    pub fn load() -> ConfigResult<Self> {
        let path = Self::config_dir()?.join(CONFIG_FILE_NAME);
        if !path.exists() {
            log::debug!("No configuration at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        Self::load_from(&path)
    }

    /// Load and validate configuration from an explicit path
    pub fn load_from(path: &Path) -> ConfigResult<Self> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::LoadError {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Config = serde_json::from_str(&content)?;
        config.validate()?;
        log::debug!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Save configuration to the user's configuration directory
    pub fn save(&self) -> ConfigResult<()> {
        let dir = Self::config_dir()?;
        fs::create_dir_all(&dir).map_err(|source| ConfigError::SaveError {
            path: dir.clone(),
            source,
        })?;
        self.save_to(&dir.join(CONFIG_FILE_NAME))
    }

    /// Save configuration to an explicit path as pretty JSON
    pub fn save_to(&self, path: &Path) -> ConfigResult<()> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json).map_err(|source| ConfigError::SaveError {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Reject values that would break store or export invariants
    pub fn validate(&self) -> ConfigResult<()> {
        if self.columns.initial_count == 0 {
            return Err(ConfigError::InvalidValue {
                key: "columns.initial_count".to_string(),
                reason: "at least one column is required".to_string(),
            });
        }
        let assets = [
            ("export.math_stylesheet.href", &self.export.math_stylesheet),
            ("export.math_script.href", &self.export.math_script),
            ("export.math_auto_render.href", &self.export.math_auto_render),
        ];
        for (key, asset) in assets {
            if asset.href.trim().is_empty() {
                return Err(ConfigError::InvalidValue {
                    key: key.to_string(),
                    reason: "must not be empty".to_string(),
                });
            }
        }
        Ok(())
    }

    /// Get the configuration directory path
    pub fn config_dir() -> ConfigResult<PathBuf> {
        dirs::config_dir()
            .map(|p| p.join(APP_ID))
            .ok_or(ConfigError::DirectoryError)
    }

    /// Get the cache directory path (export surfaces live here)
    pub fn cache_dir() -> ConfigResult<PathBuf> {
        dirs::cache_dir()
            .map(|p| p.join(APP_ID))
            .ok_or(ConfigError::DirectoryError)
    }
}

/// Column-store configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColumnConfig {
    /// Number of empty columns created at startup
    pub initial_count: usize,
}

impl Default for ColumnConfig {
    fn default() -> Self {
        Self {
            initial_count: DEFAULT_INITIAL_COLUMNS,
        }
    }
}

/// Export configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    /// Document title written into the export head
    pub title: String,

    /// Grace delay before the surface is removed after printing
    pub teardown_grace_ms: u64,

    /// Stylesheet the math markup depends on
    pub math_stylesheet: AssetRef,

    /// Script that typesets math
    pub math_script: AssetRef,

    /// Script that finds math spans in the document and typesets them
    pub math_auto_render: AssetRef,
}

impl ExportConfig {
    /// Grace delay as a [`Duration`]
    pub fn teardown_grace(&self) -> Duration {
        Duration::from_millis(self.teardown_grace_ms)
    }
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            title: "Cheat Sheet".to_string(),
            teardown_grace_ms: DEFAULT_TEARDOWN_GRACE_MS,
            math_stylesheet: AssetRef::new(
                DEFAULT_MATH_STYLESHEET_HREF,
                Some(DEFAULT_MATH_STYLESHEET_INTEGRITY),
            ),
            math_script: AssetRef::new(DEFAULT_MATH_SCRIPT_HREF, Some(DEFAULT_MATH_SCRIPT_INTEGRITY)),
            math_auto_render: AssetRef::new(
                DEFAULT_MATH_AUTO_RENDER_HREF,
                Some(DEFAULT_MATH_AUTO_RENDER_INTEGRITY),
            ),
        }
    }
}

/// Reference to an external stylesheet or script
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AssetRef {
    pub href: String,
    /// Optional subresource integrity hash
    pub integrity: Option<String>,
}

impl AssetRef {
    pub fn new(href: impl Into<String>, integrity: Option<&str>) -> Self {
        Self {
            href: href.into(),
            integrity: integrity.map(str::to_string),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.columns.initial_count, 3);
        assert_eq!(config.export.teardown_grace(), Duration::from_millis(100));
        assert!(config.export.math_stylesheet.href.contains("katex"));
        assert!(config.export.math_script.href.ends_with("katex.min.js"));
        assert!(config.export.math_auto_render.href.ends_with("auto-render.min.js"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_empty_math_script_rejected() {
        let mut config = Config::default();
        config.export.math_auto_render.href = "  ".to_string();
        match config.validate() {
            Err(ConfigError::InvalidValue { key, .. }) => {
                assert_eq!(key, "export.math_auto_render.href")
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_zero_columns_rejected() {
        let mut config = Config::default();
        config.columns.initial_count = 0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue { .. })
        ));
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: Config = serde_json::from_str(r#"{"export": {"teardown_grace_ms": 250}}"#)
            .expect("partial config parses");
        assert_eq!(config.export.teardown_grace_ms, 250);
        assert_eq!(config.export.title, "Cheat Sheet");
        assert_eq!(config.columns.initial_count, DEFAULT_INITIAL_COLUMNS);
    }

    #[test]
    fn test_save_and_load_from_path() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join(CONFIG_FILE_NAME);

        let mut config = Config::default();
        config.columns.initial_count = 5;
        config.save_to(&path).expect("save");

        let loaded = Config::load_from(&path).expect("load");
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_malformed_file_is_parse_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join(CONFIG_FILE_NAME);
        fs::write(&path, "{ not json").expect("write");

        assert!(matches!(
            Config::load_from(&path),
            Err(ConfigError::ParseError(_))
        ));
    }
}
