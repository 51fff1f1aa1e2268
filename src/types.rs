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

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::PathBuf;
use std::time::{Duration, SystemTime};

/// One indexed file: its content split into lines plus the metadata captured
/// when it was read. Immutable once constructed; re-adding the same path to a
/// store replaces the whole entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexedFile {
    pub path: PathBuf,
    pub lines: Vec<String>,
    pub size_bytes: u64,
    pub last_modified: SystemTime,
}

impl IndexedFile {
    /// Split `content` on line terminators. A trailing terminator does not
    /// produce an extra empty final line.
    pub fn new(path: PathBuf, content: &str, size_bytes: u64, last_modified: SystemTime) -> Self {
        let lines = content.lines().map(str::to_string).collect();
        IndexedFile {
            path,
            lines,
            size_bytes,
            last_modified,
        }
    }

    pub fn line_count(&self) -> usize {
        self.lines.len()
    }
}

/// How file bytes are decoded into text during ingestion. Either way, buffers
/// that look binary are skipped before decoding is attempted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TextEncoding {
    /// Strict UTF-8; files with malformed bytes are skipped.
    #[default]
    Utf8,
    /// UTF-8 with malformed bytes replaced by U+FFFD.
    Utf8Lossy,
}

/// Configuration for a single index build.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexConfig {
    /// Number of files ingested concurrently. Must be at least 1.
    pub parallelism: usize,
    /// Dot-less extensions to index; `None` indexes every extension.
    pub file_extensions: Option<HashSet<String>>,
    /// Patterns in the forms `*.ext`, `dir/**`, or an exact literal path.
    pub exclude_patterns: HashSet<String>,
    pub max_file_size_bytes: u64,
    pub follow_symlinks: bool,
    pub encoding: TextEncoding,
}

impl Default for IndexConfig {
    fn default() -> Self {
        let avail = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(4);
        IndexConfig {
            parallelism: std::cmp::min(avail, 8).max(1),
            file_extensions: None,
            exclude_patterns: HashSet::new(),
            max_file_size_bytes: 1_000_000,
            follow_symlinks: false,
            encoding: TextEncoding::Utf8,
        }
    }
}

/// Result limits and case handling for a search call.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Cap on the total number of results returned across all files.
    pub max_results: Option<usize>,
    /// Cap on the number of results returned from any single file.
    pub max_results_per_file: Option<usize>,
    pub case_sensitive: bool,
}

/// A single substring match.
///
/// `column` is the 1-based character offset into the line as stored, while
/// `line_content` is trimmed of surrounding whitespace, so the column may not
/// line up visually with the trimmed text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchResult {
    pub path: PathBuf,
    /// 1-based line number.
    pub line: usize,
    /// 1-based character offset into the untrimmed line.
    pub column: usize,
    /// The matched text with its original casing.
    pub matched_text: String,
    /// The matched line, trimmed of leading/trailing whitespace.
    pub line_content: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResponse {
    pub results: Vec<SearchResult>,
    pub total_matches: usize,
    pub truncated: bool,
    pub elapsed: Duration,
}

/// Phase of an index build, also carried on every progress emission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum IndexPhase {
    #[default]
    Scanning,
    Indexing,
    Completed,
    Cancelled,
    Failed,
}

/// Snapshot of build progress. `files_processed` counts attempts, skips
/// included, so it reaches `total_files` even when files are skipped.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IndexingProgress {
    pub files_processed: usize,
    pub total_files: usize,
    pub current_file: Option<PathBuf>,
    pub bytes_processed: u64,
    pub phase: IndexPhase,
}

impl IndexingProgress {
    pub fn percent_complete(&self) -> f64 {
        if self.total_files == 0 {
            0.0
        } else {
            self.files_processed as f64 * 100.0 / self.total_files as f64
        }
    }
}

/// Terminal outcome of a build. Callers branch on the variant; only the
/// single-flight rejection surfaces as a hard error instead.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum IndexingResult {
    Success {
        /// Files actually added to the index; skipped files are not counted.
        files_indexed: usize,
        total_bytes: u64,
        duration_ms: u64,
    },
    Cancelled {
        files_indexed_before_cancellation: usize,
        message: String,
    },
    Failed {
        error: String,
        files_processed_before_failure: usize,
    },
}
