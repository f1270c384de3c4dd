//! Workspace file enumeration for completions

use eyre::Result;
use std::path::PathBuf;

/// Directories that never contribute completion candidates, matched by
/// name at any depth.
pub const DEFAULT_EXCLUDED_DIRS: &[&str] = &["node_modules", ".git", ".next", "out", "dist", "build"];

/// Something that can list the files of a workspace
pub trait FileSource {
    /// All candidate files, as absolute paths, in a stable order
    fn files(&self) -> Result<Vec<PathBuf>>;
}

/// A fixed list of files (useful for testing)
pub struct MemoryFiles(Vec<PathBuf>);

impl MemoryFiles {
    /// Create an empty list
    pub fn new() -> Self {
        Self(Vec::new())
    }

    /// Add a file
    pub fn add(mut self, path: impl Into<PathBuf>) -> Self {
        self.0.push(path.into());
        self
    }
}

impl Default for MemoryFiles {
    fn default() -> Self {
        Self::new()
    }
}

impl FileSource for MemoryFiles {
    fn files(&self) -> Result<Vec<PathBuf>> {
        Ok(self.0.clone())
    }
}

/// Recursive directory walker with a directory denylist.
///
/// Hidden files are listed. `.gitignore` files are only honoured when
/// [`WalkFiles::git_ignore`] is turned on.
#[cfg(feature = "walk")]
pub struct WalkFiles {
    root: PathBuf,
    excluded_dirs: Vec<String>,
    exclude: Vec<String>,
    git_ignore: bool,
}

#[cfg(feature = "walk")]
impl WalkFiles {
    /// Walk `root`, skipping [`DEFAULT_EXCLUDED_DIRS`]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            excluded_dirs: DEFAULT_EXCLUDED_DIRS.iter().map(|d| d.to_string()).collect(),
            exclude: Vec::new(),
            git_ignore: false,
        }
    }

    /// Replace the directory denylist
    pub fn excluded_dirs(mut self, dirs: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.excluded_dirs = dirs.into_iter().map(Into::into).collect();
        self
    }

    /// Add exclude globs, matched against root-relative paths (e.g. `**/*.lock`)
    pub fn exclude(mut self, patterns: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.exclude.extend(patterns.into_iter().map(Into::into));
        self
    }

    /// Honour `.gitignore`, `.ignore` and global git excludes
    pub fn git_ignore(mut self, yes: bool) -> Self {
        self.git_ignore = yes;
        self
    }
}

#[cfg(feature = "walk")]
impl FileSource for WalkFiles {
    fn files(&self) -> Result<Vec<PathBuf>> {
        use eyre::WrapErr;
        use globset::{Glob, GlobSetBuilder};
        use ignore::WalkBuilder;

        let mut builder = GlobSetBuilder::new();
        for pattern in &self.exclude {
            let glob = Glob::new(pattern)
                .wrap_err_with(|| format!("Invalid exclude pattern '{}'", pattern))?;
            builder.add(glob);
        }
        let excluded = builder.build()?;

        let excluded_dirs = self.excluded_dirs.clone();
        let walker = WalkBuilder::new(&self.root)
            .standard_filters(self.git_ignore)
            .hidden(false)
            .follow_links(true)
            .sort_by_file_name(|a, b| a.cmp(b))
            .filter_entry(move |entry| {
                let is_dir = entry.file_type().is_some_and(|ft| ft.is_dir());
                if !is_dir || entry.depth() == 0 {
                    return true;
                }
                let name = entry.file_name().to_string_lossy();
                !excluded_dirs.iter().any(|d| *d == name)
            })
            .build();

        let mut files = Vec::new();
        for entry in walker {
            let entry = match entry {
                Ok(e) => e,
                Err(e) => {
                    tracing::debug!("skipping unreadable entry: {}", e);
                    continue;
                }
            };

            if !entry.file_type().is_some_and(|ft| ft.is_file()) {
                continue;
            }

            let relative = entry.path().strip_prefix(&self.root).unwrap_or(entry.path());
            if excluded.is_match(relative) {
                continue;
            }

            files.push(entry.into_path());
        }

        Ok(files)
    }
}
