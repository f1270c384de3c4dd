//! Configuration for atref
//!
//! Config lives at `.config/atref/config.json` relative to the project root.
//! Every field is optional:
//!
//! ```json
//! {
//!   "excludeDirs": ["node_modules", ".git", "target"],
//!   "exclude": ["**/*.lock"],
//!   "respectGitignore": false,
//!   "previewLines": 15
//! }
//! ```
//!
//! An LSP client can send the same object as `initializationOptions`; its
//! fields win over the file.

use atref_core::preview::DEFAULT_PREVIEW_LINES;
use atref_core::{DEFAULT_EXCLUDED_DIRS, WalkFiles};
use eyre::{Result, WrapErr};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Config path relative to the project root
pub const DEFAULT_CONFIG_PATH: &str = ".config/atref/config.json";

/// Root configuration for atref
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Directory names skipped when listing completion candidates
    pub exclude_dirs: Vec<String>,
    /// Extra globs (relative to the project root) skipped when listing
    pub exclude: Vec<String>,
    /// Honour `.gitignore` when listing
    pub respect_gitignore: bool,
    /// Lines shown in hover previews
    pub preview_lines: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            exclude_dirs: DEFAULT_EXCLUDED_DIRS.iter().map(|d| d.to_string()).collect(),
            exclude: Vec::new(),
            respect_gitignore: false,
            preview_lines: DEFAULT_PREVIEW_LINES,
        }
    }
}

/// A partial config, as written in a file or sent by a client
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ConfigLayer {
    pub exclude_dirs: Option<Vec<String>>,
    pub exclude: Option<Vec<String>>,
    pub respect_gitignore: Option<bool>,
    pub preview_lines: Option<usize>,
}

impl Config {
    /// Apply a layer on top of this config
    pub fn merge(&mut self, layer: ConfigLayer) {
        if let Some(dirs) = layer.exclude_dirs {
            self.exclude_dirs = dirs;
        }
        if let Some(exclude) = layer.exclude {
            self.exclude = exclude;
        }
        if let Some(yes) = layer.respect_gitignore {
            self.respect_gitignore = yes;
        }
        if let Some(lines) = layer.preview_lines {
            self.preview_lines = lines;
        }
    }

    /// Workspace walker for completions under `root`
    pub fn walker(&self, root: &Path) -> WalkFiles {
        WalkFiles::new(root)
            .excluded_dirs(self.exclude_dirs.iter().cloned())
            .exclude(self.exclude.iter().cloned())
            .git_ignore(self.respect_gitignore)
    }
}

impl ConfigLayer {
    /// Parse a layer from a JSON value (e.g. LSP `initializationOptions`)
    pub fn from_value(value: serde_json::Value) -> Result<Self> {
        serde_json::from_value(value).wrap_err("Invalid atref settings")
    }

    /// Read a layer from a JSON file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .wrap_err_with(|| format!("Failed to read config {}", path.display()))?;
        serde_json::from_str(&content)
            .wrap_err_with(|| format!("Failed to parse config {}", path.display()))
    }
}

/// Load the config for a project.
///
/// With an explicit `config_path` the file must exist. Otherwise the
/// default location is tried and a missing file yields the defaults.
pub fn load_config(project_root: &Path, config_path: Option<&PathBuf>) -> Result<Config> {
    let mut config = Config::default();

    match config_path {
        Some(path) => {
            if !path.exists() {
                eyre::bail!("Config file not found at {}", path.display());
            }
            config.merge(ConfigLayer::load(path)?);
        }
        None => {
            let path = project_root.join(DEFAULT_CONFIG_PATH);
            if path.exists() {
                config.merge(ConfigLayer::load(&path)?);
            }
        }
    }

    if config.preview_lines == 0 {
        eyre::bail!("previewLines must be at least 1");
    }

    Ok(config)
}
