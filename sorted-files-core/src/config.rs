//! Configuration for sorted-files.
//!
//! Settings are read once at startup from a TOML file and stay fixed for the
//! lifetime of the process. There is no hot reload.
//!
//! ```toml
//! pattern = "\\.md$"
//! max_items = 100
//! debounce_ms = 200
//! ```

use crate::error::{Result, SortedFilesError};
use crate::listing::pattern::Pattern;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variable that overrides the configuration file location.
pub const CONFIG_ENV_VAR: &str = "SORTED_FILES_CONFIG";

/// Static configuration for a sorted-files session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SortedFilesConfig {
    /// Regular expression applied to bare filenames
    pub pattern: String,
    /// Maximum number of entries returned from one ranking pass
    #[serde(alias = "maxItems")]
    pub max_items: usize,
    /// Debounce interval for filesystem change notifications, in milliseconds
    #[serde(alias = "debounceMs")]
    pub debounce_ms: u64,
}

impl Default for SortedFilesConfig {
    fn default() -> Self {
        Self {
            pattern: ".*".to_string(),
            max_items: 100,
            debounce_ms: 200,
        }
    }
}

impl SortedFilesConfig {
    /// Parse a configuration from TOML text and validate it.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load the configuration from `path`.
    ///
    /// A missing file yields the defaults; a file that exists but does not
    /// parse or validate is an error.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::debug!(
                "No configuration at {}, using defaults",
                path.display()
            );
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        let config = Self::from_toml_str(&content)?;
        tracing::info!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Default configuration file location.
    ///
    /// Checks `SORTED_FILES_CONFIG`, then `XDG_CONFIG_HOME`, then
    /// `~/.config/sorted-files/config.toml`, falling back to a file in the
    /// working directory.
    pub fn default_path() -> PathBuf {
        if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
            return PathBuf::from(path);
        }
        if let Ok(xdg_config) = std::env::var("XDG_CONFIG_HOME") {
            return PathBuf::from(xdg_config).join("sorted-files/config.toml");
        }
        if let Some(home) = std::env::var_os("HOME").or_else(|| std::env::var_os("USERPROFILE")) {
            return PathBuf::from(home).join(".config/sorted-files/config.toml");
        }
        PathBuf::from("sorted-files.toml")
    }

    /// Override the pattern.
    pub fn with_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.pattern = pattern.into();
        self
    }

    /// Override the result cap.
    pub fn with_max_items(mut self, max_items: usize) -> Self {
        self.max_items = max_items;
        self
    }

    /// Check value ranges and that the pattern compiles.
    pub fn validate(&self) -> Result<()> {
        if self.max_items == 0 {
            return Err(SortedFilesError::invalid_config(
                "max_items must be a positive integer",
            ));
        }
        self.compile_pattern()?;
        Ok(())
    }

    /// Compile the configured pattern.
    pub fn compile_pattern(&self) -> Result<Pattern> {
        Pattern::new(&self.pattern)
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}
