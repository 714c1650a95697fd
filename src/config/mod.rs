//! Config adapter -- exposes the subset of configuration the core consumes.
//! A full config loader (schema validation, file discovery, environment
//! overlays) is an external collaborator; this module only models the shape
//! the core reads, a thin typed view over a much larger on-disk format.

use std::path::PathBuf;

use serde::Deserialize;

use crate::error::{Error, Result};

fn default_true() -> bool {
    true
}

fn default_max_depth() -> usize {
    10
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct DiscoveryConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_true")]
    pub recursive: bool,
    #[serde(default = "default_max_depth")]
    pub max_depth: usize,
    #[serde(default)]
    pub exclude: Vec<String>,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        DiscoveryConfig { enabled: true, recursive: true, max_depth: 10, exclude: Vec::new() }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct ExplicitModule {
    pub name: String,
    pub path: PathBuf,
    #[serde(default = "default_true")]
    pub enabled: bool,
}

#[derive(Debug, Clone, Deserialize, Default, PartialEq, Eq)]
pub struct WorkspaceConfig {
    #[serde(default)]
    pub discovery: DiscoveryConfig,
    #[serde(default)]
    pub modules: Vec<ExplicitModule>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ExtensionConfig {
    pub name: String,
    pub path: PathBuf,
    #[serde(default = "default_true")]
    pub enabled: bool,
}

/// The subset of configuration the core consumes.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct Config {
    /// Default `.version` file path, relative to the workspace root --
    /// the fallback when the workspace has no discoverable modules.
    #[serde(default = "default_version_path")]
    pub path: PathBuf,
    #[serde(default)]
    pub workspace: WorkspaceConfig,
    #[serde(default)]
    pub extensions: Vec<ExtensionConfig>,
}

fn default_version_path() -> PathBuf {
    PathBuf::from(".version")
}

impl Config {
    pub fn from_toml_str(text: &str) -> Result<Config> {
        toml::from_str(text).map_err(|e| Error::Config(e.to_string()))
    }

    pub fn enabled_extensions(&self) -> impl Iterator<Item = &ExtensionConfig> {
        self.extensions.iter().filter(|e| e.enabled)
    }
}
