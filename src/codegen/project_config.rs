//! Project configuration schema for boforge.yaml
//!
//! This module defines the structure for project-level configuration that
//! drives discovery and code generation.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Environment variable that forces regeneration when set to `1` or `true`
pub const FORCE_REGEN_ENV: &str = "BOFORGE_FORCE_REGEN";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Top-level build configuration from boforge.yaml
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BuildConfig {
    pub project: BuildProjectInfo,
    #[serde(default)]
    pub paths: BuildPathsConfig,
    #[serde(default)]
    pub discovery: DiscoveryConfig,
    #[serde(default)]
    pub generation: GenerationOptions,
}

/// Build project information
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BuildProjectInfo {
    pub name: String,
    #[serde(default)]
    pub description: String,
}

/// Build paths configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BuildPathsConfig {
    /// Directory scanned for declaration files
    #[serde(default = "default_source_root")]
    pub source_root: String,
    /// Directory that maps to `crate::`; defaults to the source root
    #[serde(default)]
    pub crate_root: Option<String>,
    /// Output directory of the front-end model stubs; none are written when unset
    #[serde(default)]
    pub models_dir: Option<String>,
}

impl Default for BuildPathsConfig {
    fn default() -> Self {
        Self {
            source_root: default_source_root(),
            crate_root: None,
            models_dir: None,
        }
    }
}

fn default_source_root() -> String {
    "src".to_string()
}

/// Declaration discovery options
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DiscoveryConfig {
    /// File-name suffix of declaration files
    #[serde(default = "default_suffix")]
    pub suffix: String,
    /// Directories skipped in addition to the version-control and vendor directories
    #[serde(default = "default_skip_dirs")]
    pub skip_dirs: Vec<String>,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            suffix: default_suffix(),
            skip_dirs: default_skip_dirs(),
        }
    }
}

fn default_suffix() -> String {
    "_bo.rs".to_string()
}

fn default_skip_dirs() -> Vec<String> {
    vec!["target".to_string(), "node_modules".to_string()]
}

/// Generation options
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GenerationOptions {
    /// Regenerate every package even when nothing changed
    #[serde(default)]
    pub force: bool,
    /// Name of the per-package registry file
    #[serde(default = "default_registry_file")]
    pub registry_file: String,
}

impl Default for GenerationOptions {
    fn default() -> Self {
        Self {
            force: false,
            registry_file: default_registry_file(),
        }
    }
}

fn default_registry_file() -> String {
    "bo_registry.rs".to_string()
}

impl BuildConfig {
    /// Configuration for a project rooted at `source_root`, with every other
    /// setting at its default
    pub fn for_source_root(name: &str, source_root: impl AsRef<Path>) -> Self {
        Self {
            project: BuildProjectInfo {
                name: name.to_string(),
                description: String::new(),
            },
            paths: BuildPathsConfig {
                source_root: source_root.as_ref().to_string_lossy().into_owned(),
                ..BuildPathsConfig::default()
            },
            discovery: DiscoveryConfig::default(),
            generation: GenerationOptions::default(),
        }
    }

    /// Load build configuration from a YAML file. Relative paths in the file
    /// are resolved against the file's directory.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        let mut config: BuildConfig =
            serde_yaml::from_str(&contents).map_err(|source| ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            })?;

        if let Some(base) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            config.rebase(base);
        }
        Ok(config)
    }

    fn rebase(&mut self, base: &Path) {
        let join = |p: &str| base.join(p).to_string_lossy().into_owned();
        self.paths.source_root = join(&self.paths.source_root);
        self.paths.crate_root = self.paths.crate_root.as_deref().map(join);
        self.paths.models_dir = self.paths.models_dir.as_deref().map(join);
    }

    /// Apply `BOFORGE_FORCE_REGEN`
    pub fn apply_env(&mut self) {
        if let Ok(value) = std::env::var(FORCE_REGEN_ENV) {
            if matches!(value.trim(), "1" | "true" | "yes") {
                self.generation.force = true;
            }
        }
    }

    pub fn source_root(&self) -> PathBuf {
        PathBuf::from(&self.paths.source_root)
    }

    pub fn crate_root(&self) -> PathBuf {
        self.paths
            .crate_root
            .as_ref()
            .map(PathBuf::from)
            .unwrap_or_else(|| self.source_root())
    }

    pub fn models_dir(&self) -> Option<PathBuf> {
        self.paths.models_dir.as_ref().map(PathBuf::from)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.project.name.is_empty() {
            return Err(ConfigError::Invalid("project.name is required".to_string()));
        }

        if !self.discovery.suffix.ends_with(".rs") {
            return Err(ConfigError::Invalid(format!(
                "discovery.suffix must end with .rs, got '{}'",
                self.discovery.suffix
            )));
        }

        if !self.generation.registry_file.ends_with(".rs")
            || self.generation.registry_file.ends_with(&self.discovery.suffix)
        {
            return Err(ConfigError::Invalid(format!(
                "generation.registry_file '{}' must be a .rs file that is not a declaration file",
                self.generation.registry_file
            )));
        }

        let source_root = self.source_root();
        if !source_root.is_dir() {
            return Err(ConfigError::Invalid(format!(
                "source root not found: {}",
                source_root.display()
            )));
        }

        if !source_root.starts_with(self.crate_root()) {
            return Err(ConfigError::Invalid(format!(
                "source root {} is not inside crate root {}",
                source_root.display(),
                self.crate_root().display()
            )));
        }

        Ok(())
    }
}
