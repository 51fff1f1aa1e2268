use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Instant, SystemTime};

use parking_lot::RwLock;

use crate::types::{IndexedFile, SearchConfig, SearchResponse, SearchResult};

/// Thread-safe map from file path to indexed content. Cloning is cheap and
/// shares the underlying map; all operations are internally synchronized so
/// callers never need external locking.
#[derive(Debug, Clone, Default)]
pub struct IndexStore {
    inner: Arc<RwLock<BTreeMap<PathBuf, Arc<IndexedFile>>>>,
}

impl IndexStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Split `content` into lines and store it, replacing any existing entry
    /// for the same path in one step.
    pub fn add_file(&self, path: PathBuf, content: &str, size_bytes: u64, last_modified: SystemTime) {
        let file = Arc::new(IndexedFile::new(path.clone(), content, size_bytes, last_modified));
        self.inner.write().insert(path, file);
    }

    pub fn remove_file(&self, path: &Path) -> bool {
        self.inner.write().remove(path).is_some()
    }

    pub fn contains_file(&self, path: &Path) -> bool {
        self.inner.read().contains_key(path)
    }

    pub fn get_file(&self, path: &Path) -> Option<Arc<IndexedFile>> {
        self.inner.read().get(path).cloned()
    }

    pub fn clear(&self) {
        self.inner.write().clear();
    }

    pub fn file_count(&self) -> usize {
        self.inner.read().len()
    }

    pub fn total_bytes(&self) -> u64 {
        self.inner.read().values().map(|f| f.size_bytes).sum()
    }

    /// Point-in-time copy of the mapping. Mutations made after the snapshot
    /// is taken are invisible to it; file contents are shared, not copied.
    pub fn snapshot(&self) -> BTreeMap<PathBuf, Arc<IndexedFile>> {
        self.inner.read().clone()
    }

    /// Search one file. Returns an empty list for paths not in the index.
    pub fn search_in_file(&self, path: &Path, query: &str, config: &SearchConfig) -> Vec<SearchResult> {
        match self.get_file(path) {
            Some(file) => search_file(&file, query, config),
            None => Vec::new(),
        }
    }

    /// Sequential whole-index search in map order.
    ///
    /// `total_matches` accumulates each file's full match count before the
    /// global cap is applied, so when the cap is reached mid-file the total
    /// includes matches that were never appended.
    pub fn search(&self, query: &str, config: &SearchConfig) -> SearchResponse {
        let started = Instant::now();
        let snapshot = self.snapshot();
        let mut results: Vec<SearchResult> = Vec::new();
        let mut total_matches = 0usize;
        for file in snapshot.values() {
            let file_matches = search_file(file, query, config);
            total_matches += file_matches.len();
            match config.max_results {
                Some(cap) => {
                    let remaining = cap.saturating_sub(results.len());
                    let stop = file_matches.len() >= remaining;
                    results.extend(file_matches.into_iter().take(remaining));
                    if stop {
                        break;
                    }
                }
                None => results.extend(file_matches),
            }
        }
        // truncated whenever the returned count reaches the cap, even if no
        // match was actually dropped
        let truncated = config
            .max_results
            .map(|cap| results.len() >= cap)
            .unwrap_or(false);
        SearchResponse {
            results,
            total_matches,
            truncated,
            elapsed: started.elapsed(),
        }
    }
}

/// Linear forward scan of one file's lines. Overlapping matches are found
/// because the next scan resumes one character past the previous match start.
/// Scanning stops as soon as the per-file cap is reached.
pub(crate) fn search_file(file: &IndexedFile, query: &str, config: &SearchConfig) -> Vec<SearchResult> {
    let mut results = Vec::new();
    if query.is_empty() || config.max_results_per_file == Some(0) {
        return results;
    }
    'lines: for (line_idx, line) in file.lines.iter().enumerate() {
        let mut from = 0usize;
        while let Some((start, end)) = find_from(line, query, from, config.case_sensitive) {
            results.push(SearchResult {
                path: file.path.clone(),
                line: line_idx + 1,
                column: line[..start].chars().count() + 1,
                matched_text: line[start..end].to_string(),
                line_content: line.trim().to_string(),
            });
            if let Some(cap) = config.max_results_per_file {
                if results.len() >= cap {
                    break 'lines;
                }
            }
            from = start
                + line[start..]
                    .chars()
                    .next()
                    .map(|c| c.len_utf8())
                    .unwrap_or(1);
        }
    }
    results
}

/// Find the next occurrence of `needle` at or after byte offset `from`,
/// returning the byte range of the match in `haystack`.
fn find_from(haystack: &str, needle: &str, from: usize, case_sensitive: bool) -> Option<(usize, usize)> {
    if from > haystack.len() {
        return None;
    }
    if case_sensitive {
        return haystack[from..]
            .find(needle)
            .map(|i| (from + i, from + i + needle.len()));
    }
    let tail = &haystack[from..];
    let needle_chars: Vec<char> = needle.chars().collect();
    for (offset, _) in tail.char_indices() {
        let mut candidate = tail[offset..].chars();
        let mut matched_bytes = 0usize;
        let mut ok = true;
        for &nc in &needle_chars {
            match candidate.next() {
                Some(hc) if chars_eq_fold(hc, nc) => matched_bytes += hc.len_utf8(),
                _ => {
                    ok = false;
                    break;
                }
            }
        }
        if ok {
            return Some((from + offset, from + offset + matched_bytes));
        }
    }
    None
}

fn chars_eq_fold(a: char, b: char) -> bool {
    a == b || a.to_lowercase().eq(b.to_lowercase())
}
