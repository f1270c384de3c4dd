//! atref-core - `@file` mentions in plain text
//!
//! This crate provides the editor-independent parts of atref:
//! - Scanning text for `@path` mentions
//! - Resolving a mention against the directory of its document
//! - Building completion candidates, links, highlight ranges and hover
//!   previews for mentioned files
//!
//! # Features
//!
//! - `walk` - Enable [`WalkFiles`] for listing workspace files (brings in `ignore` and `globset`)
//!
//! # Scanning and resolving
//!
//! A mention is `@` followed by one or more non-whitespace characters:
//!
//! ```
//! use atref_core::scan;
//!
//! let found: Vec<_> = scan("see @a.txt and @b/c.txt").collect();
//! assert_eq!(found.len(), 2);
//! assert_eq!(found[1].token, "b/c.txt");
//! assert_eq!(found[1].span(), 15..23);
//! ```
//!
//! Tokens are paths relative to the document's directory (or absolute):
//!
//! ```
//! use atref_core::resolve_path;
//! use std::path::Path;
//!
//! let path = resolve_path("../src/lib.rs", Path::new("/work/docs"));
//! assert_eq!(path, Path::new("/work/src/lib.rs"));
//! ```
//!
//! # Completions
//!
//! ```
//! use atref_core::{FileSource, MemoryFiles, complete};
//! use std::path::Path;
//!
//! let files = MemoryFiles::new()
//!     .add("/work/docs/notes.md")
//!     .add("/work/src/lib.rs")
//!     .files()
//!     .unwrap();
//!
//! let items = complete(&files, Path::new("/work/docs/notes.md"), Path::new("/work/docs"));
//! assert_eq!(items.len(), 1);
//! assert_eq!(items[0].label, "@../src/lib.rs");
//! ```

mod complete;
mod files;
mod mention;
pub mod preview;
mod present;
mod resolve;

pub use complete::{COMPLETION_DETAIL, CompletionCandidate, complete, mention_path, wants_completion};
pub use files::{DEFAULT_EXCLUDED_DIRS, FileSource, MemoryFiles};
pub use mention::{MentionOccurrence, Mentions, mention_at, scan};
pub use present::{HoverContext, MentionLink, decorations, hover, links};
pub use resolve::{ResolvedMention, resolve, resolve_all, resolve_path};

#[cfg(feature = "walk")]
pub use files::WalkFiles;
