//! Completion candidates for `@` mentions
//!
//! Every workspace file is offered, written relative to the directory of the
//! document being edited. There is no ranking and no index: the caller
//! re-enumerates the workspace on every request and candidates keep the
//! enumeration order.

use std::path::{Component, Path, PathBuf};

/// Detail text shown next to each candidate
pub const COMPLETION_DETAIL: &str = "@Mention: Referenced file";

/// A file that can be inserted after an `@`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionCandidate {
    /// `@` followed by the relative path
    pub label: String,
    /// The relative path alone (the `@` is already typed)
    pub insert_text: String,
    /// Absolute path of the file
    pub path: PathBuf,
}

/// Whether a completion should be offered, given the text of the current
/// line up to the cursor.
pub fn wants_completion(line_before_cursor: &str) -> bool {
    line_before_cursor.contains('@')
}

/// Build candidates from `files`, skipping `exclude_file` (the document
/// being edited).
pub fn complete(files: &[PathBuf], exclude_file: &Path, base_dir: &Path) -> Vec<CompletionCandidate> {
    files
        .iter()
        .filter(|file| file.as_path() != exclude_file)
        .map(|file| {
            let relative = mention_path(file, base_dir);
            CompletionCandidate {
                label: format!("@{}", relative),
                insert_text: relative,
                path: file.clone(),
            }
        })
        .collect()
}

/// Express `target` as a mention token relative to `base_dir`.
///
/// Separators are always `/`. Paths that don't already start with a `.`
/// get a `./` prefix, so `src/lib.rs` becomes `./src/lib.rs` while
/// `../lib.rs` and `.env` are left alone.
pub fn mention_path(target: &Path, base_dir: &Path) -> String {
    let relative = match relative_path(target, base_dir) {
        Some(rel) => rel,
        None => return target.to_string_lossy().replace('\\', "/"),
    };

    let joined = relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect::<Vec<_>>()
        .join("/");

    if joined.starts_with('.') {
        joined
    } else {
        format!("./{}", joined)
    }
}

/// Lexical relative path from `base` to `target`.
///
/// Returns `None` when the two don't share a root (different drives on
/// Windows, or one relative and one absolute).
fn relative_path(target: &Path, base: &Path) -> Option<PathBuf> {
    if target.has_root() != base.has_root() {
        return None;
    }

    let target: Vec<Component> = target.components().collect();
    let base: Vec<Component> = base.components().collect();

    if let (Some(Component::Prefix(a)), Some(Component::Prefix(b))) = (target.first(), base.first())
        && a != b
    {
        return None;
    }

    let common = target
        .iter()
        .zip(base.iter())
        .take_while(|(a, b)| a == b)
        .count();

    let mut out = PathBuf::new();
    for _ in common..base.len() {
        out.push("..");
    }
    for component in &target[common..] {
        out.push(component.as_os_str());
    }
    Some(out)
}
