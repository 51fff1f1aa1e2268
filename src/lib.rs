//! In-memory, line-oriented index of the text files under a directory tree,
//! queried by exact substring match with bounded concurrency, two-tier result
//! caps, and cooperative cancellation.

pub mod index;
pub mod query;
pub mod types;

pub use crate::index::{CandidateFile, IndexBuilder, IndexError, IndexStore, ScanFilter, Scanner};
pub use crate::query::{QueryExecutor, SearchSequence};
pub use crate::types::{
    IndexConfig, IndexPhase, IndexedFile, IndexingProgress, IndexingResult, SearchConfig,
    SearchResponse, SearchResult, TextEncoding,
};

/// Convenience one-shot: build an index of `root` into a fresh store and
/// return the store alongside the build outcome.
pub async fn build_index(
    root: impl AsRef<std::path::Path>,
    config: IndexConfig,
) -> anyhow::Result<(IndexStore, IndexingResult)> {
    let store = IndexStore::new();
    let builder = IndexBuilder::new(root.as_ref().to_path_buf(), store.clone(), config);
    let result = builder.build_index().await?;
    Ok((store, result))
}
