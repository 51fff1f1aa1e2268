#![allow(dead_code)]

use std::path::Path;

/// Create a temporary directory to index.
pub fn new_root() -> tempfile::TempDir {
    tempfile::tempdir().expect("create tempdir")
}

/// Write a file relative to the root, creating parent directories.
pub fn write_file(root: &Path, rel: &str, contents: &str) {
    write_bytes(root, rel, contents.as_bytes());
}

pub fn write_bytes(root: &Path, rel: &str, contents: &[u8]) {
    let p = root.join(rel);
    if let Some(parent) = p.parent() {
        std::fs::create_dir_all(parent).expect("create parent dirs");
    }
    std::fs::write(p, contents).expect("write file");
}
