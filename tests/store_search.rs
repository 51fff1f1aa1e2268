use std::path::{Path, PathBuf};
use std::time::SystemTime;

use text_index::{IndexStore, SearchConfig};

fn add(store: &IndexStore, path: &str, content: &str) {
    store.add_file(
        PathBuf::from(path),
        content,
        content.len() as u64,
        SystemTime::UNIX_EPOCH,
    );
}

#[test]
fn add_get_remove_and_derived_counts() {
    let store = IndexStore::new();
    add(&store, "a.txt", "one\ntwo\n");
    add(&store, "b.txt", "three");
    assert_eq!(store.file_count(), 2);
    assert_eq!(store.total_bytes(), 8 + 5);
    assert!(store.contains_file(Path::new("a.txt")));

    let file = store.get_file(Path::new("a.txt")).unwrap();
    assert_eq!(file.lines, vec!["one", "two"]);

    assert!(store.remove_file(Path::new("a.txt")));
    assert!(!store.remove_file(Path::new("a.txt")));
    assert_eq!(store.file_count(), 1);

    store.clear();
    assert_eq!(store.file_count(), 0);
    assert_eq!(store.total_bytes(), 0);
}

#[test]
fn trailing_terminator_does_not_add_an_empty_line() {
    let store = IndexStore::new();
    add(&store, "a.txt", "one\ntwo\n");
    add(&store, "b.txt", "one\ntwo");
    assert_eq!(store.get_file(Path::new("a.txt")).unwrap().line_count(), 2);
    assert_eq!(store.get_file(Path::new("b.txt")).unwrap().line_count(), 2);
}

#[test]
fn re_adding_a_path_replaces_the_whole_entry() {
    let store = IndexStore::new();
    add(&store, "a.txt", "old content");
    add(&store, "a.txt", "new");
    assert_eq!(store.file_count(), 1);
    let file = store.get_file(Path::new("a.txt")).unwrap();
    assert_eq!(file.lines, vec!["new"]);
    assert_eq!(file.size_bytes, 3);
}

#[test]
fn snapshot_does_not_observe_later_mutations() {
    let store = IndexStore::new();
    add(&store, "a.txt", "alpha");
    let snapshot = store.snapshot();
    add(&store, "b.txt", "beta");
    store.remove_file(Path::new("a.txt"));
    assert_eq!(snapshot.len(), 1);
    assert!(snapshot.contains_key(Path::new("a.txt")));
    assert!(!snapshot.contains_key(Path::new("b.txt")));
}

#[test]
fn search_in_file_reports_hand_computed_positions() {
    let store = IndexStore::new();
    add(&store, "a.txt", "foo bar foo");
    let hits = store.search_in_file(Path::new("a.txt"), "foo", &SearchConfig::default());
    assert_eq!(hits.len(), 2);
    assert_eq!((hits[0].line, hits[0].column), (1, 1));
    assert_eq!((hits[1].line, hits[1].column), (1, 9));
    assert!(hits.iter().all(|h| h.matched_text == "foo"));
    assert!(hits.iter().all(|h| h.line_content == "foo bar foo"));
}

#[test]
fn search_in_unknown_file_is_empty() {
    let store = IndexStore::new();
    let hits = store.search_in_file(Path::new("missing.txt"), "x", &SearchConfig::default());
    assert!(hits.is_empty());
}

#[test]
fn case_insensitive_search_preserves_original_casing() {
    let store = IndexStore::new();
    add(&store, "a.txt", "Foo foo FOO");
    let hits = store.search_in_file(Path::new("a.txt"), "foo", &SearchConfig::default());
    let matched: Vec<&str> = hits.iter().map(|h| h.matched_text.as_str()).collect();
    assert_eq!(matched, vec!["Foo", "foo", "FOO"]);

    let upper = store.search_in_file(Path::new("a.txt"), "FOO", &SearchConfig::default());
    assert_eq!(upper.len(), 3);
}

#[test]
fn case_sensitive_search_matches_exactly() {
    let store = IndexStore::new();
    add(&store, "a.txt", "Foo foo FOO");
    let config = SearchConfig {
        case_sensitive: true,
        ..SearchConfig::default()
    };
    let hits = store.search_in_file(Path::new("a.txt"), "foo", &config);
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].column, 5);
}

#[test]
fn sequential_search_walks_files_in_map_order() {
    let store = IndexStore::new();
    add(&store, "b.txt", "needle");
    add(&store, "a.txt", "needle");
    let response = store.search("needle", &SearchConfig::default());
    assert_eq!(response.total_matches, 2);
    assert!(!response.truncated);
    assert_eq!(response.results[0].path, Path::new("a.txt"));
    assert_eq!(response.results[1].path, Path::new("b.txt"));
}

#[test]
fn sequential_search_total_counts_raw_matches_of_the_truncating_file() {
    let store = IndexStore::new();
    add(&store, "a.txt", "m");
    add(&store, "b.txt", "m m m");
    add(&store, "c.txt", "m");
    let config = SearchConfig {
        max_results: Some(2),
        ..SearchConfig::default()
    };
    let response = store.search("m", &config);
    assert_eq!(response.results.len(), 2);
    assert!(response.truncated);
    // b.txt's full match count lands in the total even though only one of
    // its three matches was appended; c.txt is never scanned at all
    assert_eq!(response.total_matches, 4);
}

#[test]
fn sequential_search_reports_truncated_at_the_exact_boundary() {
    let store = IndexStore::new();
    add(&store, "a.txt", "needle");
    add(&store, "b.txt", "needle");
    let config = SearchConfig {
        max_results: Some(2),
        ..SearchConfig::default()
    };
    let response = store.search("needle", &config);
    assert_eq!(response.results.len(), 2);
    // nothing was dropped, but the cap was reached
    assert!(response.truncated);
}

#[test]
fn per_file_cap_applies_to_each_file_in_sequential_search() {
    let store = IndexStore::new();
    add(&store, "a.txt", "x x x\nx x");
    add(&store, "b.txt", "x x x");
    let config = SearchConfig {
        max_results_per_file: Some(2),
        ..SearchConfig::default()
    };
    let response = store.search("x", &config);
    assert_eq!(response.results.len(), 4);
    assert!(!response.truncated);
}
