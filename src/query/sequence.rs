use std::collections::btree_map;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

use crate::index::store::search_file;
use crate::types::{IndexedFile, SearchConfig, SearchResult};

/// Lazily walks a snapshot file-by-file in map order, yielding matches until
/// the global cap is reached. Obtained from `QueryExecutor::search_sequence`;
/// every call there starts a fresh pass over a fresh snapshot.
pub struct SearchSequence {
    files: btree_map::IntoIter<PathBuf, Arc<IndexedFile>>,
    pending: std::vec::IntoIter<SearchResult>,
    query: String,
    config: SearchConfig,
    yielded: usize,
}

impl SearchSequence {
    pub(crate) fn new(
        snapshot: BTreeMap<PathBuf, Arc<IndexedFile>>,
        query: String,
        config: SearchConfig,
    ) -> Self {
        SearchSequence {
            files: snapshot.into_iter(),
            pending: Vec::new().into_iter(),
            query,
            config,
            yielded: 0,
        }
    }
}

impl Iterator for SearchSequence {
    type Item = SearchResult;

    fn next(&mut self) -> Option<SearchResult> {
        if self
            .config
            .max_results
            .map(|cap| self.yielded >= cap)
            .unwrap_or(false)
        {
            return None;
        }
        loop {
            if let Some(result) = self.pending.next() {
                self.yielded += 1;
                return Some(result);
            }
            let (_path, file) = self.files.next()?;
            self.pending = search_file(&file, &self.query, &self.config).into_iter();
        }
    }
}
