//! Common test utilities.

#![allow(dead_code)]

use std::path::Path;

use tower_lsp::lsp_types::Url;

/// Write a file, creating its parent directories.
pub fn write(root: &Path, relative: &str, content: &str) {
    let path = root.join(relative);
    std::fs::create_dir_all(path.parent().unwrap()).expect("Failed to create parent dir");
    std::fs::write(path, content).expect("Failed to write file");
}

/// Create a temporary workspace:
///
/// ```text
/// README.md
/// docs/notes.md
/// docs/a.txt
/// src/lib.rs          (20 lines)
/// node_modules/pkg/index.js
/// build/out.js
/// ```
pub fn create_workspace() -> tempfile::TempDir {
    let temp = tempfile::tempdir().expect("Failed to create temp dir");
    let root = temp.path();

    write(root, "README.md", "# Workspace\n");
    write(root, "docs/notes.md", "see @a.txt\n");
    write(root, "docs/a.txt", "alpha\nbeta\n");
    let lib: String = (1..=20).map(|i| format!("// line {}\n", i)).collect();
    write(root, "src/lib.rs", &lib);
    write(root, "node_modules/pkg/index.js", "module.exports = {};\n");
    write(root, "build/out.js", "console.log(1);\n");

    temp
}

/// `file://` URI of a path inside the workspace
pub fn uri(root: &Path, relative: &str) -> Url {
    Url::from_file_path(root.join(relative)).expect("absolute path")
}
