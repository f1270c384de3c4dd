//! Hover previews for mentioned files
//!
//! A preview is a small markdown document: a header with the file name,
//! its workspace-relative path, size and modification date, the first few
//! lines as a numbered code block, and two command links (open the file,
//! copy its path). When the file can't be read the preview degrades to the
//! name, the path and a notice; building a preview never fails.

use eyre::{Result, WrapErr};
use serde_json::json;
use std::path::{Path, PathBuf};
use time::OffsetDateTime;

/// Lines shown in a preview unless configured otherwise
pub const DEFAULT_PREVIEW_LINES: usize = 15;

/// Command that opens a mentioned file, `{ fromPath, filename }`
pub const OPEN_MENTION_FILE: &str = "atref.openMentionFile";

/// Command that copies a path to the clipboard, `{ path }`
pub const COPY_FILE_PATH: &str = "atref.copyFilePath";

/// Notice shown when a file can't be previewed
pub const UNAVAILABLE_NOTICE: &str = "⚠️ Could not preview this file";

const LANGUAGES: &[(&str, &str)] = &[
    ("ts", "typescript"),
    ("js", "javascript"),
    ("tsx", "tsx"),
    ("jsx", "jsx"),
    ("py", "python"),
    ("json", "json"),
    ("md", "markdown"),
    ("html", "html"),
    ("css", "css"),
    ("scss", "scss"),
    ("yaml", "yaml"),
    ("yml", "yaml"),
    ("xml", "xml"),
    ("sql", "sql"),
    ("sh", "bash"),
    ("ps1", "powershell"),
    ("rs", "rust"),
    ("toml", "toml"),
];

/// Code block language for a path, from its extension. Unknown extensions
/// get `text`.
pub fn language_for(path: &Path) -> &'static str {
    let Some(ext) = path.extension().and_then(|e| e.to_str()) else {
        return "text";
    };
    let ext = ext.to_ascii_lowercase();
    LANGUAGES
        .iter()
        .find(|(e, _)| *e == ext)
        .map(|(_, lang)| *lang)
        .unwrap_or("text")
}

/// Path as shown to the user: relative to the workspace root when the file
/// lives inside it, absolute otherwise.
pub fn display_path(path: &Path, workspace_root: Option<&Path>) -> String {
    workspace_root
        .and_then(|root| path.strip_prefix(root).ok())
        .filter(|rel| !rel.as_os_str().is_empty())
        .unwrap_or(path)
        .to_string_lossy()
        .replace('\\', "/")
}

/// Everything a full preview shows
#[derive(Debug, Clone)]
pub struct FilePreview {
    pub file_name: String,
    pub display_path: String,
    pub size_kib: f64,
    pub modified: Option<OffsetDateTime>,
    /// (1-based line number, line text)
    pub excerpt: Vec<(usize, String)>,
    pub truncated: bool,
    /// Lines after the excerpt
    pub remaining_lines: usize,
    pub language: &'static str,
}

impl FilePreview {
    /// Stat and read `path`, keeping the first `max_lines` lines.
    pub fn load(path: &Path, workspace_root: Option<&Path>, max_lines: usize) -> Result<Self> {
        let metadata = std::fs::metadata(path)
            .wrap_err_with(|| format!("Failed to stat {}", path.display()))?;
        let bytes =
            std::fs::read(path).wrap_err_with(|| format!("Failed to read {}", path.display()))?;
        let content = String::from_utf8_lossy(&bytes);

        let total = content.lines().count();
        let excerpt = content
            .lines()
            .take(max_lines)
            .enumerate()
            .map(|(i, line)| (i + 1, line.to_string()))
            .collect();

        Ok(Self {
            file_name: file_name(path),
            display_path: display_path(path, workspace_root),
            size_kib: metadata.len() as f64 / 1024.0,
            modified: metadata.modified().ok().map(OffsetDateTime::from),
            excerpt,
            truncated: total > max_lines,
            remaining_lines: total.saturating_sub(max_lines),
            language: language_for(path),
        })
    }
}

/// Where the preview's command links point
#[derive(Debug, Clone)]
pub struct PreviewActions {
    /// Document the mention was found in
    pub from_path: PathBuf,
    /// Mention token, resolved against the directory of `from_path`
    pub filename: String,
}

impl PreviewActions {
    fn open_link(&self) -> String {
        let args = json!({
            "fromPath": self.from_path.to_string_lossy(),
            "filename": self.filename,
        });
        format!("[📂 Open File]({})", command_uri(OPEN_MENTION_FILE, &args))
    }

    fn copy_link(&self, path: &str) -> String {
        let args = json!({ "path": path });
        format!("[📋 Copy Path]({})", command_uri(COPY_FILE_PATH, &args))
    }
}

/// `command:` URI with URL-encoded JSON arguments, as understood by editors
/// that render markdown command links.
pub fn command_uri(command: &str, args: &serde_json::Value) -> String {
    format!("command:{}?{}", command, urlencoding::encode(&args.to_string()))
}

/// Markdown for a full preview
pub fn render(preview: &FilePreview, actions: &PreviewActions) -> String {
    let mut md = String::new();

    md.push_str(&format!("**📄 {}**\n\n", preview.file_name));
    md.push_str(&format!(
        "*{}* • {:.1} KB",
        preview.display_path, preview.size_kib
    ));
    if let Some(modified) = preview.modified {
        md.push_str(&format!(" • {}", format_date(modified)));
    }
    md.push_str("\n\n");

    if !preview.excerpt.is_empty() {
        let body = preview
            .excerpt
            .iter()
            .map(|(n, line)| format!("{:>2} │ {}", n, line))
            .collect::<Vec<_>>()
            .join("\n");
        let fence = fence_for(&body);

        md.push_str("**Preview:**\n");
        md.push_str(&format!("{fence}{}\n{}\n{fence}\n", preview.language, body));

        if preview.truncated {
            md.push_str(&format!(
                "\n*... and {} more lines*\n",
                preview.remaining_lines
            ));
        }
    }

    md.push_str("\n---\n");
    md.push_str(&actions.open_link());
    md.push_str(" • ");
    md.push_str(&actions.copy_link(&preview.display_path));

    md
}

/// Markdown for a file that couldn't be read
pub fn render_unavailable(path: &Path, workspace_root: Option<&Path>, actions: &PreviewActions) -> String {
    format!(
        "**📄 {}**\n\n*{}*\n\n{}\n\n{}",
        file_name(path),
        display_path(path, workspace_root),
        UNAVAILABLE_NOTICE,
        actions.open_link()
    )
}

/// Build the hover markdown for `path`, falling back to the minimal
/// preview on any error.
pub fn preview_markdown(
    path: &Path,
    workspace_root: Option<&Path>,
    max_lines: usize,
    actions: &PreviewActions,
) -> String {
    match FilePreview::load(path, workspace_root, max_lines) {
        Ok(preview) => render(&preview, actions),
        Err(e) => {
            tracing::warn!("preview unavailable: {:#}", e);
            render_unavailable(path, workspace_root, actions)
        }
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.to_string_lossy().into_owned())
}

fn format_date(when: OffsetDateTime) -> String {
    let format = time::macros::format_description!("[year]-[month]-[day]");
    when.format(&format).unwrap_or_default()
}

/// A backtick fence longer than any backtick run in `body`
fn fence_for(body: &str) -> String {
    let longest = body
        .split(|c| c != '`')
        .map(str::len)
        .max()
        .unwrap_or(0);
    "`".repeat(longest.max(2) + 1)
}
