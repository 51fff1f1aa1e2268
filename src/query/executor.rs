use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;

use tokio::sync::{Mutex, Semaphore};
use tokio::task::JoinSet;

use crate::index::store::{search_file, IndexStore};
use crate::query::sequence::SearchSequence;
use crate::types::{SearchConfig, SearchResponse, SearchResult};

/// Fans substring queries out across a point-in-time snapshot of an
/// `IndexStore`, one unit of work per file under a bounded worker pool.
/// Results from different files arrive in whatever order workers finish;
/// results within one file follow scan order.
#[derive(Debug, Clone)]
pub struct QueryExecutor {
    store: IndexStore,
    parallelism: usize,
}

impl QueryExecutor {
    pub fn new(store: IndexStore) -> Self {
        let avail = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(4);
        QueryExecutor {
            store,
            parallelism: std::cmp::min(avail, 8).max(1),
        }
    }

    pub fn with_parallelism(store: IndexStore, parallelism: usize) -> Self {
        QueryExecutor {
            store,
            parallelism: parallelism.max(1),
        }
    }

    /// Parallel search over a snapshot with the two-tier caps.
    ///
    /// The at-cap predicate consulted before and after slot acquisition is
    /// advisory only: a unit that passes it still searches its whole file
    /// under the per-file cap, and the append section then takes only as
    /// many of its matches as fit the remaining global budget. The returned
    /// list therefore never exceeds the global cap even though a worker's
    /// local match count briefly can.
    pub async fn search(&self, query: &str, config: &SearchConfig) -> SearchResponse {
        let started = Instant::now();
        let snapshot = self.store.snapshot();
        let semaphore = Arc::new(Semaphore::new(self.parallelism));
        let results: Arc<Mutex<Vec<SearchResult>>> = Arc::new(Mutex::new(Vec::new()));
        let appended = Arc::new(AtomicUsize::new(0));
        let mut tasks = JoinSet::new();
        for (_path, file) in snapshot {
            let semaphore = Arc::clone(&semaphore);
            let results = Arc::clone(&results);
            let appended = Arc::clone(&appended);
            let query = query.to_string();
            let config = config.clone();
            tasks.spawn(async move {
                if at_global_cap(&appended, config.max_results) {
                    return;
                }
                let _permit = match semaphore.acquire_owned().await {
                    Ok(p) => p,
                    Err(_) => return,
                };
                if at_global_cap(&appended, config.max_results) {
                    return;
                }
                let file_matches = search_file(&file, &query, &config);
                if file_matches.is_empty() {
                    return;
                }
                // held only for append-and-count, never across search work
                let mut guard = results.lock().await;
                match config.max_results {
                    Some(cap) => {
                        let remaining = cap.saturating_sub(guard.len());
                        guard.extend(file_matches.into_iter().take(remaining));
                    }
                    None => guard.extend(file_matches),
                }
                appended.store(guard.len(), Ordering::SeqCst);
            });
        }
        while tasks.join_next().await.is_some() {}

        let results = std::mem::take(&mut *results.lock().await);
        let total_matches = results.len();
        let truncated = config
            .max_results
            .map(|cap| total_matches >= cap)
            .unwrap_or(false);
        SearchResponse {
            results,
            total_matches,
            truncated,
            elapsed: started.elapsed(),
        }
    }

    /// Sum of true per-file match counts, bounded only by the per-file cap.
    /// The global cap is not consulted.
    pub async fn count(&self, query: &str, config: &SearchConfig) -> usize {
        let snapshot = self.store.snapshot();
        let semaphore = Arc::new(Semaphore::new(self.parallelism));
        let total = Arc::new(AtomicUsize::new(0));
        let mut tasks = JoinSet::new();
        for (_path, file) in snapshot {
            let semaphore = Arc::clone(&semaphore);
            let total = Arc::clone(&total);
            let query = query.to_string();
            let config = config.clone();
            tasks.spawn(async move {
                let _permit = match semaphore.acquire_owned().await {
                    Ok(p) => p,
                    Err(_) => return,
                };
                let n = search_file(&file, &query, &config).len();
                total.fetch_add(n, Ordering::SeqCst);
            });
        }
        while tasks.join_next().await.is_some() {}
        total.load(Ordering::SeqCst)
    }

    /// Unordered set of files with at least one match. The caller's per-file
    /// cap is overridden to 1 for the probe and the global cap is unused;
    /// case sensitivity is honored.
    pub async fn find_files_containing(&self, query: &str, config: &SearchConfig) -> HashSet<PathBuf> {
        let probe = SearchConfig {
            max_results: None,
            max_results_per_file: Some(1),
            case_sensitive: config.case_sensitive,
        };
        let snapshot = self.store.snapshot();
        let semaphore = Arc::new(Semaphore::new(self.parallelism));
        let found: Arc<Mutex<HashSet<PathBuf>>> = Arc::new(Mutex::new(HashSet::new()));
        let mut tasks = JoinSet::new();
        for (path, file) in snapshot {
            let semaphore = Arc::clone(&semaphore);
            let found = Arc::clone(&found);
            let query = query.to_string();
            let probe = probe.clone();
            tasks.spawn(async move {
                let _permit = match semaphore.acquire_owned().await {
                    Ok(p) => p,
                    Err(_) => return,
                };
                if !search_file(&file, &query, &probe).is_empty() {
                    found.lock().await.insert(path);
                }
            });
        }
        while tasks.join_next().await.is_some() {}
        let result = std::mem::take(&mut *found.lock().await);
        result
    }

    /// One concurrent `search` per distinct query string. Duplicate strings
    /// in the input collapse to a single map entry.
    pub async fn search_multiple(
        &self,
        queries: &[String],
        config: &SearchConfig,
    ) -> HashMap<String, SearchResponse> {
        let distinct: HashSet<String> = queries.iter().cloned().collect();
        let mut tasks = JoinSet::new();
        for query in distinct {
            let executor = self.clone();
            let config = config.clone();
            tasks.spawn(async move {
                let response = executor.search(&query, &config).await;
                (query, response)
            });
        }
        let mut responses = HashMap::new();
        while let Some(joined) = tasks.join_next().await {
            if let Ok((query, response)) = joined {
                responses.insert(query, response);
            }
        }
        responses
    }

    /// Sequential, lazily evaluated alternative to `search` for low-memory
    /// consumption. Each call starts a fresh pass over a fresh snapshot and
    /// stops once the global cap is reached.
    pub fn search_sequence(&self, query: &str, config: &SearchConfig) -> SearchSequence {
        SearchSequence::new(self.store.snapshot(), query.to_string(), config.clone())
    }
}

fn at_global_cap(appended: &AtomicUsize, max_results: Option<usize>) -> bool {
    max_results
        .map(|cap| appended.load(Ordering::SeqCst) >= cap)
        .unwrap_or(false)
}
