//! Path resolution for mention tokens

use crate::mention::MentionOccurrence;
use std::path::{Component, Path, PathBuf};

/// A mention paired with the path it points at
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedMention {
    pub occurrence: MentionOccurrence,
    /// Normalized absolute path of the target
    pub absolute_path: PathBuf,
    /// Whether something could be stat'ed at `absolute_path`
    pub exists: bool,
}

/// Resolve a mention token relative to the directory of the document it
/// appears in, and check whether the target exists.
///
/// Any error from the filesystem (not found, permission denied, dangling
/// symlink) counts as "does not exist".
pub fn resolve(occurrence: MentionOccurrence, base_dir: &Path) -> ResolvedMention {
    let absolute_path = resolve_path(&occurrence.token, base_dir);
    let exists = std::fs::metadata(&absolute_path).is_ok();
    ResolvedMention {
        occurrence,
        absolute_path,
        exists,
    }
}

/// Resolve every mention of `text`, in document order.
pub fn resolve_all(text: &str, base_dir: &Path) -> Vec<ResolvedMention> {
    crate::mention::scan(text)
        .map(|m| resolve(m, base_dir))
        .collect()
}

/// Join `token` onto `base_dir` (unless it is absolute) and normalize the
/// result lexically.
///
/// `.` segments are dropped and `..` pops the previous segment; `..` at the
/// root stays at the root. Symlinks are not followed.
pub fn resolve_path(token: impl AsRef<Path>, base_dir: &Path) -> PathBuf {
    let joined = base_dir.join(token);

    let mut out = PathBuf::new();
    for component in joined.components() {
        match component {
            Component::Prefix(_) | Component::RootDir => out.push(component.as_os_str()),
            Component::CurDir => {}
            Component::ParentDir => match out.components().next_back() {
                Some(Component::Normal(_)) => {
                    out.pop();
                }
                Some(Component::ParentDir) | None => out.push(".."),
                // `..` at the root stays at the root
                _ => {}
            },
            Component::Normal(part) => out.push(part),
        }
    }
    out
}
