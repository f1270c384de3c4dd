//! `workspace/executeCommand` handlers
//!
//! Hover previews link to these commands through `command:` URIs. Each
//! command takes a single JSON object argument; a missing or malformed
//! argument turns the command into a no-op.

use std::cell::RefCell;
use std::path::{Path, PathBuf};

use atref_core::preview::{COPY_FILE_PATH, OPEN_MENTION_FILE};
use atref_core::resolve_path;
use eyre::{Result, WrapErr};
use serde::Deserialize;
use serde_json::Value;
use tower_lsp::Client;
use tower_lsp::lsp_types::{MessageType, ShowDocumentParams, Url};
use tracing::{debug, warn};

/// Command ids advertised to the client
pub fn command_ids() -> Vec<String> {
    vec![OPEN_MENTION_FILE.to_string(), COPY_FILE_PATH.to_string()]
}

/// Arguments of `atref.openMentionFile`
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpenMentionArgs {
    /// Document the mention was found in
    pub from_path: String,
    /// Mention token, relative to the directory of `from_path`
    pub filename: String,
}

impl OpenMentionArgs {
    /// Absolute path of the file to open
    pub fn target(&self) -> PathBuf {
        let base_dir = Path::new(&self.from_path)
            .parent()
            .unwrap_or_else(|| Path::new(""));
        resolve_path(&self.filename, base_dir)
    }
}

/// Arguments of `atref.copyFilePath`
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CopyPathArgs {
    pub path: String,
}

/// A parsed command invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MentionCommand {
    OpenMentionFile(OpenMentionArgs),
    CopyFilePath(CopyPathArgs),
}

impl MentionCommand {
    /// Parse a command, returning `None` for unknown commands and missing,
    /// malformed or empty arguments.
    pub fn parse(command: &str, arguments: &[Value]) -> Option<Self> {
        let arg = arguments.first()?.clone();
        match command {
            OPEN_MENTION_FILE => {
                let args: OpenMentionArgs = serde_json::from_value(arg).ok()?;
                if args.from_path.is_empty() || args.filename.is_empty() {
                    return None;
                }
                Some(Self::OpenMentionFile(args))
            }
            COPY_FILE_PATH => {
                let args: CopyPathArgs = serde_json::from_value(arg).ok()?;
                if args.path.is_empty() {
                    return None;
                }
                Some(Self::CopyFilePath(args))
            }
            _ => None,
        }
    }

    /// Run the command against the client
    pub async fn execute(self, client: &Client) {
        match self {
            Self::OpenMentionFile(args) => open_mention_file(client, args).await,
            Self::CopyFilePath(args) => copy_file_path(client, args).await,
        }
    }
}

async fn open_mention_file(client: &Client, args: OpenMentionArgs) {
    let target = args.target();
    debug!("opening {}", target.display());

    let shown = match Url::from_file_path(&target) {
        Ok(uri) if target.is_file() => {
            let params = ShowDocumentParams {
                uri,
                external: Some(false),
                take_focus: Some(true),
                selection: None,
            };
            match client.show_document(params).await {
                Ok(shown) => shown,
                Err(e) => {
                    warn!("showDocument failed for {}: {}", target.display(), e);
                    false
                }
            }
        }
        _ => false,
    };

    if !shown {
        client
            .show_message(MessageType::ERROR, format!("Could not open: {}", args.filename))
            .await;
    }
}

async fn copy_file_path(client: &Client, args: CopyPathArgs) {
    match copy_to_clipboard(&args.path) {
        Ok(()) => {
            client
                .show_message(MessageType::INFO, format!("Copied path: {}", args.path))
                .await;
        }
        Err(e) => {
            warn!("clipboard write failed: {:#}", e);
            client
                .show_message(MessageType::ERROR, format!("Could not copy path: {}", args.path))
                .await;
        }
    }
}

thread_local! {
    // Kept alive for the life of the server thread: on X11 the selection
    // is served by its owner, so dropping it would drop the copied text.
    static CLIPBOARD: RefCell<Option<arboard::Clipboard>> = const { RefCell::new(None) };
}

fn copy_to_clipboard(text: &str) -> Result<()> {
    CLIPBOARD.with(|cell| {
        let mut slot = cell.borrow_mut();
        if slot.is_none() {
            *slot = Some(arboard::Clipboard::new().wrap_err("Failed to access the clipboard")?);
        }
        let Some(clipboard) = slot.as_mut() else {
            eyre::bail!("Clipboard unavailable");
        };
        clipboard
            .set_text(text.to_string())
            .wrap_err("Failed to write to the clipboard")
    })
}
