//! atref library - `@file` mentions for any editor
//!
//! This library exposes the language server and the CLI commands of atref
//! for testing and embedding purposes.

pub mod check;
pub mod commands;
pub mod config;
pub mod lsp;
pub mod position;

use eyre::{Result, WrapErr};
use std::path::PathBuf;

/// Find the project root by walking up from the current directory.
///
/// The first ancestor holding a `.git` directory or an atref config wins.
/// Without one, the current directory is used.
pub fn find_project_root() -> Result<PathBuf> {
    let cwd = std::env::current_dir().wrap_err("Failed to get current directory")?;
    let mut current = cwd.clone();

    loop {
        if current.join(".git").exists() || current.join(config::DEFAULT_CONFIG_PATH).exists() {
            return Ok(current);
        }

        if !current.pop() {
            return Ok(cwd);
        }
    }
}
