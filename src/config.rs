//! Configuration module for the project service.
//!
//! Layered configuration:
//! - Default values
//! - TOML configuration file (`.svelte-ts/settings.toml`)
//! - Environment variable overrides
//!
//! # Environment Variables
//!
//! Environment variables must be prefixed with `STS_` and use double underscores
//! to separate nested levels:
//! - `STS_REGISTRY__RETRY_FAILED=false` sets `registry.retry_failed`
//! - `STS_LOGGING__LEVEL=debug` sets `logging.level`

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Directory holding the settings file, searched from the current directory upwards
pub const SETTINGS_DIR: &str = ".svelte-ts";

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct Settings {
    /// Workspace roots; config discovery never climbs above these
    #[serde(default)]
    pub workspace_roots: Vec<PathBuf>,

    /// Instance registry behaviour
    #[serde(default)]
    pub registry: RegistryConfig,

    /// Per-project container settings
    #[serde(default)]
    pub project: ProjectConfig,

    /// Logging settings for the binary
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct RegistryConfig {
    /// Evict failed constructions so the next request retries.
    /// When false a failed project stays failed until restart.
    #[serde(default = "default_true")]
    pub retry_failed: bool,
}

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct ProjectConfig {
    /// Build output directories excluded in addition to the built-in list
    #[serde(default)]
    pub extra_build_dirs: Vec<String>,

    /// Location of the preprocessor's ambient declaration bundle
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ambient_dir: Option<PathBuf>,

    /// Directory containing the engine's default `lib.*.d.ts` files
    #[serde(skip_serializing_if = "Option::is_none")]
    pub typescript_lib_dir: Option<PathBuf>,

    /// Override file-name case sensitivity (defaults to the platform convention)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub case_sensitive: Option<bool>,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct LoggingConfig {
    /// One of trace, debug, info, warn, error
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_true() -> bool {
    true
}
fn default_log_level() -> String {
    "warn".to_string()
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            retry_failed: default_true(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl ProjectConfig {
    /// Whether file names should be compared case-sensitively
    pub fn use_case_sensitive_file_names(&self) -> bool {
        self.case_sensitive
            .unwrap_or(!cfg!(any(target_os = "windows", target_os = "macos")))
    }
}

impl Settings {
    /// Load configuration from all sources
    pub fn load() -> Result<Self, Box<figment::Error>> {
        let config_path = Self::find_workspace_config()
            .unwrap_or_else(|| PathBuf::from(SETTINGS_DIR).join("settings.toml"));
        Self::load_from(config_path)
    }

    /// Load configuration from a specific file, still honouring env overrides
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self, Box<figment::Error>> {
        Figment::new()
            .merge(Serialized::defaults(Settings::default()))
            .merge(Toml::file(path.as_ref()))
            // Double underscore separates nested levels
            .merge(Env::prefixed("STS_").map(|key| {
                key.as_str().to_lowercase().replace("__", ".").into()
            }))
            .extract()
            .map_err(Box::new)
    }

    /// Save current configuration to file
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), Box<dyn std::error::Error>> {
        let parent = path.as_ref().parent().ok_or("Invalid path")?;
        std::fs::create_dir_all(parent)?;

        let toml_string = toml::to_string_pretty(self)?;
        std::fs::write(path, toml_string)?;

        Ok(())
    }

    /// The workspace root owning `path`, longest match first
    pub fn workspace_root_for(&self, path: &Path) -> Option<&Path> {
        self.workspace_roots
            .iter()
            .filter(|root| path.starts_with(root))
            .max_by_key(|root| root.components().count())
            .map(PathBuf::as_path)
    }

    /// Find the settings file by looking for the settings directory
    /// from the current directory up to root
    fn find_workspace_config() -> Option<PathBuf> {
        let current = std::env::current_dir().ok()?;

        current
            .ancestors()
            .map(|ancestor| ancestor.join(SETTINGS_DIR))
            .find(|dir| dir.is_dir())
            .map(|dir| dir.join("settings.toml"))
    }
}
