//! Links, highlights and hovers for the mentions of a document

use crate::mention::{MentionOccurrence, mention_at};
use crate::preview::{PreviewActions, preview_markdown};
use crate::resolve::{ResolvedMention, resolve, resolve_all};
use std::ops::Range;
use std::path::{Path, PathBuf};

/// A clickable region leading to an existing file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MentionLink {
    /// Byte span of the mention, `@` included
    pub span: Range<usize>,
    pub target: PathBuf,
    pub tooltip: String,
}

/// Mentions of `text` whose target exists, in document order.
///
/// These are the ranges an editor should highlight. Mentions of missing
/// files are dropped without any report.
pub fn decorations(text: &str, base_dir: &Path) -> Vec<ResolvedMention> {
    resolve_all(text, base_dir)
        .into_iter()
        .filter(|m| m.exists)
        .collect()
}

/// Links for every mention of an existing file
pub fn links(text: &str, base_dir: &Path) -> Vec<MentionLink> {
    decorations(text, base_dir)
        .into_iter()
        .map(|m| MentionLink {
            span: m.occurrence.span(),
            tooltip: format!("Open {}", m.occurrence.token),
            target: m.absolute_path,
        })
        .collect()
}

/// Settings for [`hover`]
#[derive(Debug, Clone)]
pub struct HoverContext<'a> {
    /// Document being hovered
    pub document_path: &'a Path,
    pub workspace_root: Option<&'a Path>,
    pub preview_lines: usize,
}

/// Preview for the mention under `offset`, if it names an existing file.
pub fn hover(text: &str, offset: usize, ctx: &HoverContext<'_>) -> Option<(MentionOccurrence, String)> {
    let base_dir = ctx.document_path.parent()?;
    let occurrence = mention_at(text, offset)?;
    let resolved = resolve(occurrence, base_dir);
    if !resolved.exists {
        return None;
    }

    let actions = PreviewActions {
        from_path: ctx.document_path.to_path_buf(),
        filename: resolved.occurrence.token.clone(),
    };
    let markdown = preview_markdown(
        &resolved.absolute_path,
        ctx.workspace_root,
        ctx.preview_lines,
        &actions,
    );
    Some((resolved.occurrence, markdown))
}
