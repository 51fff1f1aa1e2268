// Copyright 2025 Text-Index Project
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use ignore::WalkBuilder;

use crate::index::error::IndexError;
use crate::types::IndexConfig;

/// A file discovered by the scanner, with metadata captured at scan time.
#[derive(Debug, Clone)]
pub struct CandidateFile {
    pub path: PathBuf,
    /// Path relative to the scan root; also the key under which the file is
    /// stored in the index.
    pub rel: PathBuf,
    pub size: u64,
    pub modified: SystemTime,
}

/// The extension/exclude/size predicate applied during scanning. Callers
/// performing incremental updates against the store should apply the same
/// predicate so full builds and incremental updates agree on what is indexed.
#[derive(Debug, Clone)]
pub struct ScanFilter {
    extensions: Option<HashSet<String>>,
    exclude_patterns: Vec<String>,
    max_file_size_bytes: u64,
}

impl ScanFilter {
    pub fn from_config(config: &IndexConfig) -> Self {
        ScanFilter {
            extensions: config.file_extensions.clone(),
            exclude_patterns: config.exclude_patterns.iter().cloned().collect(),
            max_file_size_bytes: config.max_file_size_bytes,
        }
    }

    /// Whether a file at root-relative `rel` with the given size is indexed.
    pub fn matches(&self, rel: &Path, size: u64) -> bool {
        size <= self.max_file_size_bytes && self.extension_allowed(rel) && !self.excluded(rel)
    }

    fn extension_allowed(&self, rel: &Path) -> bool {
        match &self.extensions {
            None => true,
            Some(allowed) => match rel.extension().and_then(|e| e.to_str()) {
                Some(ext) => allowed.contains(ext),
                None => false,
            },
        }
    }

    pub fn excluded(&self, rel: &Path) -> bool {
        let rel_s = rel.to_string_lossy();
        self.exclude_patterns
            .iter()
            .any(|pat| pattern_matches(pat, &rel_s))
    }

    /// True when a directory's whole subtree is covered by a `dir/**`
    /// pattern, in which case the walk prunes it instead of descending.
    pub fn prunes_dir(&self, rel_dir: &Path) -> bool {
        let rel_s = rel_dir.to_string_lossy();
        if rel_s.is_empty() {
            return false;
        }
        self.exclude_patterns.iter().any(|pat| {
            pat.strip_suffix("/**")
                .map(|prefix| rel_s == prefix || rel_s.starts_with(&format!("{}/", prefix)))
                .unwrap_or(false)
        })
    }
}

/// Minimal pattern support: `*.ext` suffix match, `dir/**` subtree match,
/// exact literal. No general glob engine.
fn pattern_matches(pattern: &str, rel: &str) -> bool {
    if let Some(suffix) = pattern.strip_prefix('*') {
        return rel.ends_with(suffix);
    }
    if let Some(prefix) = pattern.strip_suffix("/**") {
        return rel == prefix || rel.starts_with(&format!("{}/", prefix));
    }
    rel == pattern
}

/// Walks a directory tree once and collects the candidate file list. The walk
/// is a separate phase from ingestion so the total count is known before any
/// parallel work starts.
#[derive(Debug, Clone)]
pub struct Scanner {
    root: PathBuf,
    filter: ScanFilter,
    follow_symlinks: bool,
}

impl Scanner {
    pub fn new(root: PathBuf, config: &IndexConfig) -> Self {
        Scanner {
            root,
            filter: ScanFilter::from_config(config),
            follow_symlinks: config.follow_symlinks,
        }
    }

    pub fn filter(&self) -> &ScanFilter {
        &self.filter
    }

    /// Discover every candidate file under the root. Unreadable files and
    /// directories are skipped, not fatal; a missing or non-directory root is.
    pub fn scan(&self) -> Result<Vec<CandidateFile>, IndexError> {
        if !self.root.is_dir() {
            return Err(IndexError::InvalidRoot(self.root.clone()));
        }

        let mut builder = WalkBuilder::new(&self.root);
        builder.standard_filters(false);
        builder.follow_links(self.follow_symlinks);
        let prune_filter = self.filter.clone();
        let prune_root = self.root.clone();
        builder.filter_entry(move |entry| {
            if entry.file_type().map(|t| t.is_dir()).unwrap_or(false) {
                let rel = entry.path().strip_prefix(&prune_root).unwrap_or(entry.path());
                if prune_filter.prunes_dir(rel) {
                    return false;
                }
            }
            true
        });

        let mut candidates = Vec::new();
        for entry in builder.build().filter_map(Result::ok) {
            if !entry.file_type().map(|t| t.is_file()).unwrap_or(false) {
                continue;
            }
            let rel = match entry.path().strip_prefix(&self.root) {
                Ok(r) => r.to_path_buf(),
                Err(_) => continue,
            };
            let meta = match std::fs::metadata(entry.path()) {
                Ok(m) => m,
                Err(err) => {
                    tracing::debug!(path = %entry.path().display(), error = %err, "skipping unreadable entry");
                    continue;
                }
            };
            if !self.filter.matches(&rel, meta.len()) {
                continue;
            }
            candidates.push(CandidateFile {
                path: entry.path().to_path_buf(),
                rel,
                size: meta.len(),
                modified: meta.modified().unwrap_or(SystemTime::UNIX_EPOCH),
            });
        }
        Ok(candidates)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::IndexConfig;

    fn filter_with(patterns: &[&str], extensions: Option<&[&str]>, max_size: u64) -> ScanFilter {
        let config = IndexConfig {
            file_extensions: extensions.map(|e| e.iter().map(|s| s.to_string()).collect()),
            exclude_patterns: patterns.iter().map(|s| s.to_string()).collect(),
            max_file_size_bytes: max_size,
            ..IndexConfig::default()
        };
        ScanFilter::from_config(&config)
    }

    #[test]
    fn suffix_pattern_matches_any_directory() {
        assert!(pattern_matches("*.log", "debug.log"));
        assert!(pattern_matches("*.log", "logs/debug.log"));
        assert!(!pattern_matches("*.log", "debug.log.txt"));
    }

    #[test]
    fn subtree_pattern_matches_dir_and_children() {
        assert!(pattern_matches("build/**", "build"));
        assert!(pattern_matches("build/**", "build/sub/x.txt"));
        assert!(!pattern_matches("build/**", "builds/x.txt"));
        assert!(!pattern_matches("build/**", "src/build.rs"));
    }

    #[test]
    fn literal_pattern_is_exact() {
        assert!(pattern_matches("notes.md", "notes.md"));
        assert!(!pattern_matches("notes.md", "docs/notes.md"));
    }

    #[test]
    fn extension_allow_list_is_exact_and_dotless() {
        let f = filter_with(&[], Some(&["txt"]), u64::MAX);
        assert!(f.matches(Path::new("a.txt"), 1));
        assert!(!f.matches(Path::new("a.md"), 1));
        // no extension at all fails a set allow-list
        assert!(!f.matches(Path::new("Makefile"), 1));
    }

    #[test]
    fn size_cap_applies() {
        let f = filter_with(&[], None, 10);
        assert!(f.matches(Path::new("a.txt"), 10));
        assert!(!f.matches(Path::new("a.txt"), 11));
    }

    #[test]
    fn prunes_dir_only_on_subtree_patterns() {
        let f = filter_with(&["build/**", "*.log", "notes.md"], None, u64::MAX);
        assert!(f.prunes_dir(Path::new("build")));
        assert!(f.prunes_dir(Path::new("build/sub")));
        assert!(!f.prunes_dir(Path::new("src")));
        assert!(!f.prunes_dir(Path::new("")));
    }
}
