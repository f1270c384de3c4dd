//! `atref check`: report the mentions of files on disk

use atref_core::{ResolvedMention, resolve_all};
use eyre::{Result, WrapErr};
use owo_colors::OwoColorize;
use std::path::{Path, PathBuf};

/// Mentions found in one file
#[derive(Debug)]
pub struct FileReport {
    pub path: PathBuf,
    pub content: String,
    pub mentions: Vec<ResolvedMention>,
}

impl FileReport {
    /// Scan `path` and resolve its mentions against its directory
    pub fn load(path: &Path) -> Result<Self> {
        let path = std::path::absolute(path)
            .wrap_err_with(|| format!("Failed to resolve {}", path.display()))?;
        let content = std::fs::read_to_string(&path)
            .wrap_err_with(|| format!("Failed to read {}", path.display()))?;
        let base_dir = path
            .parent()
            .ok_or_else(|| eyre::eyre!("{} has no parent directory", path.display()))?;
        let mentions = resolve_all(&content, base_dir);

        Ok(Self {
            path,
            content,
            mentions,
        })
    }

    pub fn unresolved(&self) -> impl Iterator<Item = &ResolvedMention> {
        self.mentions.iter().filter(|m| !m.exists)
    }
}

/// Totals over all checked files
#[derive(Debug, Default, PartialEq, Eq)]
pub struct CheckSummary {
    pub files: usize,
    pub mentions: usize,
    pub unresolved: usize,
}

/// Check `files`, printing a report to stderr.
///
/// With `verbose`, resolved mentions are listed too.
pub fn run(files: &[PathBuf], verbose: bool) -> Result<CheckSummary> {
    if files.is_empty() {
        eyre::bail!("No files specified. Usage: atref check <file>...");
    }

    let mut summary = CheckSummary::default();

    for file in files {
        let report = FileReport::load(file)?;
        eprintln!("{} {}", "->".blue().bold(), file.display());

        for mention in &report.mentions {
            let (line, column) = line_col(&report.content, mention.occurrence.start);
            if mention.exists {
                if verbose {
                    eprintln!(
                        "   {} {}:{} @{}",
                        "ok".green(),
                        line,
                        column,
                        mention.occurrence.token
                    );
                }
            } else {
                eprintln!(
                    "   {} {}:{} @{} ({} not found)",
                    "missing".red(),
                    line,
                    column,
                    mention.occurrence.token.red(),
                    mention.absolute_path.display()
                );
            }
        }

        summary.files += 1;
        summary.mentions += report.mentions.len();
        summary.unresolved += report.unresolved().count();
    }

    let status = if summary.unresolved == 0 {
        "OK".green().bold().to_string()
    } else {
        "!".yellow().bold().to_string()
    };
    eprintln!(
        "\n{} {} mentions in {} files, {} unresolved",
        status, summary.mentions, summary.files, summary.unresolved
    );

    Ok(summary)
}

/// 1-indexed line and column (in characters) of a byte offset
fn line_col(content: &str, offset: usize) -> (usize, usize) {
    let before = &content[..offset.min(content.len())];
    let line_start = before.rfind('\n').map(|i| i + 1).unwrap_or(0);
    let line = before.matches('\n').count() + 1;
    (line, before[line_start..].chars().count() + 1)
}
