use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;

use tokio::sync::{watch, Semaphore};
use tokio::task::JoinSet;

use crate::index::error::IndexError;
use crate::index::scan::{CandidateFile, Scanner};
use crate::index::store::IndexStore;
use crate::types::{IndexConfig, IndexPhase, IndexingProgress, IndexingResult, TextEncoding};

/// Orchestrates scan and parallel ingestion of a directory tree into an
/// `IndexStore`. At most one build runs per builder instance at a time; a
/// concurrent second call is rejected, not queued. Clones share state, so a
/// clone can be moved into a task while `cancel` is called from elsewhere.
#[derive(Clone)]
pub struct IndexBuilder {
    inner: Arc<BuilderInner>,
}

struct BuilderInner {
    root: PathBuf,
    config: IndexConfig,
    store: IndexStore,
    running: AtomicBool,
    cancelled: AtomicBool,
    files_attempted: AtomicUsize,
    files_indexed: AtomicUsize,
    bytes_processed: AtomicU64,
    total_files: AtomicUsize,
    progress: watch::Sender<IndexingProgress>,
}

impl IndexBuilder {
    pub fn new(root: PathBuf, store: IndexStore, config: IndexConfig) -> Self {
        let (progress, _) = watch::channel(IndexingProgress::default());
        IndexBuilder {
            inner: Arc::new(BuilderInner {
                root,
                config,
                store,
                running: AtomicBool::new(false),
                cancelled: AtomicBool::new(false),
                files_attempted: AtomicUsize::new(0),
                files_indexed: AtomicUsize::new(0),
                bytes_processed: AtomicU64::new(0),
                total_files: AtomicUsize::new(0),
                progress,
            }),
        }
    }

    pub fn store(&self) -> IndexStore {
        self.inner.store.clone()
    }

    /// The most recent progress emission.
    pub fn progress(&self) -> IndexingProgress {
        self.inner.progress.borrow().clone()
    }

    /// Subscribe to progress. The receiver holds the most recent value, so a
    /// late subscriber observes the current state immediately instead of
    /// waiting for the next emission.
    pub fn subscribe(&self) -> watch::Receiver<IndexingProgress> {
        self.inner.progress.subscribe()
    }

    /// Request cooperative cancellation. Idempotent and callable from any
    /// concurrent context. The flag is observed at checkpoints; a file read
    /// already in flight always finishes normally.
    pub fn cancel(&self) {
        self.inner.cancelled.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.inner.cancelled.load(Ordering::Acquire)
    }

    /// Clear the cancellation flag, all counters, and the target store.
    /// Called internally at the start of every build; callers reuse a builder
    /// by calling it themselves.
    pub fn reset(&self) {
        self.inner.reset();
    }

    /// Run a full build. Returns `Err(IndexError::BuildInProgress)` when a
    /// build is already running on this instance; every other outcome,
    /// including an invalid root, is reported through `IndexingResult`.
    pub async fn build_index(&self) -> Result<IndexingResult, IndexError> {
        if self
            .inner
            .running
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(IndexError::BuildInProgress);
        }
        let result = self.run().await;
        self.inner.running.store(false, Ordering::SeqCst);
        Ok(result)
    }

    async fn run(&self) -> IndexingResult {
        let inner = &self.inner;
        let started = Instant::now();
        inner.reset();
        tracing::info!(root = %inner.root.display(), "starting index build");

        let scanner = Scanner::new(inner.root.clone(), &inner.config);
        let scanned = tokio::task::spawn_blocking(move || scanner.scan()).await;
        let candidates = match scanned {
            Ok(Ok(c)) => c,
            Ok(Err(err)) => return inner.fail(err.to_string()),
            Err(err) => return inner.fail(err.to_string()),
        };

        if self.is_cancelled() {
            return inner.finish_cancelled();
        }

        inner.total_files.store(candidates.len(), Ordering::SeqCst);
        inner.set_phase(IndexPhase::Indexing);

        if self.is_cancelled() {
            return inner.finish_cancelled();
        }

        let semaphore = Arc::new(Semaphore::new(inner.config.parallelism.max(1)));
        let mut tasks = JoinSet::new();
        for candidate in candidates {
            let inner = Arc::clone(&self.inner);
            let semaphore = Arc::clone(&semaphore);
            tasks.spawn(async move {
                // cancellation may arrive while waiting for a slot, so the
                // flag is checked on both sides of the acquisition
                if inner.cancelled.load(Ordering::Acquire) {
                    return;
                }
                let _permit = match semaphore.acquire_owned().await {
                    Ok(p) => p,
                    Err(_) => return,
                };
                if inner.cancelled.load(Ordering::Acquire) {
                    return;
                }
                inner.ingest(candidate).await;
            });
        }
        while tasks.join_next().await.is_some() {}

        if self.is_cancelled() {
            return inner.finish_cancelled();
        }

        inner.set_phase(IndexPhase::Completed);
        let files_indexed = inner.files_indexed.load(Ordering::SeqCst);
        let total_bytes = inner.bytes_processed.load(Ordering::SeqCst);
        tracing::info!(files_indexed, total_bytes, "index build completed");
        IndexingResult::Success {
            files_indexed,
            total_bytes,
            duration_ms: started.elapsed().as_millis() as u64,
        }
    }
}

impl BuilderInner {
    fn reset(&self) {
        self.cancelled.store(false, Ordering::SeqCst);
        self.files_attempted.store(0, Ordering::SeqCst);
        self.files_indexed.store(0, Ordering::SeqCst);
        self.bytes_processed.store(0, Ordering::SeqCst);
        self.total_files.store(0, Ordering::SeqCst);
        self.store.clear();
        self.progress.send_replace(IndexingProgress::default());
    }

    fn snapshot_progress(&self, current_file: Option<PathBuf>, phase: IndexPhase) -> IndexingProgress {
        IndexingProgress {
            files_processed: self.files_attempted.load(Ordering::SeqCst),
            total_files: self.total_files.load(Ordering::SeqCst),
            current_file,
            bytes_processed: self.bytes_processed.load(Ordering::SeqCst),
            phase,
        }
    }

    fn set_phase(&self, phase: IndexPhase) {
        self.progress.send_replace(self.snapshot_progress(None, phase));
    }

    fn emit_file_progress(&self, current_file: PathBuf) {
        let phase = self.progress.borrow().phase;
        self.progress
            .send_replace(self.snapshot_progress(Some(current_file), phase));
    }

    fn fail(&self, error: String) -> IndexingResult {
        let files = self.files_attempted.load(Ordering::SeqCst);
        self.set_phase(IndexPhase::Failed);
        tracing::warn!(error = %error, "index build failed");
        IndexingResult::Failed {
            error,
            files_processed_before_failure: files,
        }
    }

    fn finish_cancelled(&self) -> IndexingResult {
        let files = self.files_indexed.load(Ordering::SeqCst);
        // the index is cleared no matter how far the build got
        self.store.clear();
        self.set_phase(IndexPhase::Cancelled);
        tracing::info!(files_indexed = files, "index build cancelled");
        IndexingResult::Cancelled {
            files_indexed_before_cancellation: files,
            message: "index build cancelled".to_string(),
        }
    }

    /// Read, decode, and store one file. Read and decode failures are silent
    /// skips: they count as an attempt but not as an indexed file.
    async fn ingest(&self, candidate: CandidateFile) {
        let path = candidate.path.clone();
        let read = tokio::task::spawn_blocking(move || std::fs::read(path)).await;
        match read {
            Ok(Ok(bytes)) => match decode_text(self.config.encoding, &bytes) {
                Some(content) => {
                    self.store.add_file(
                        candidate.rel.clone(),
                        &content,
                        bytes.len() as u64,
                        candidate.modified,
                    );
                    self.files_indexed.fetch_add(1, Ordering::SeqCst);
                    self.bytes_processed
                        .fetch_add(bytes.len() as u64, Ordering::SeqCst);
                }
                None => {
                    tracing::debug!(path = %candidate.rel.display(), "skipping undecodable file");
                }
            },
            Ok(Err(err)) => {
                tracing::debug!(path = %candidate.rel.display(), error = %err, "skipping unreadable file");
            }
            Err(err) => {
                tracing::debug!(path = %candidate.rel.display(), error = %err, "file read task failed");
            }
        }
        self.files_attempted.fetch_add(1, Ordering::SeqCst);
        self.emit_file_progress(candidate.rel);
    }
}

/// Heuristic: reject buffers that look binary (a NUL byte, or a high
/// fraction of non-printable bytes in the leading sample).
fn is_text(buf: &[u8]) -> bool {
    if buf.contains(&0) {
        return false;
    }
    if buf.is_empty() {
        return true;
    }
    let sample = &buf[..buf.len().min(4096)];
    let non_print = sample
        .iter()
        .filter(|&&b| b < 0x20 && b != b'\n' && b != b'\r' && b != b'\t')
        .count();
    (non_print as f64 / sample.len() as f64) < 0.30
}

fn decode_text(encoding: TextEncoding, bytes: &[u8]) -> Option<String> {
    if !is_text(bytes) {
        return None;
    }
    match encoding {
        TextEncoding::Utf8 => String::from_utf8(bytes.to_vec()).ok(),
        TextEncoding::Utf8Lossy => Some(String::from_utf8_lossy(bytes).into_owned()),
    }
}
