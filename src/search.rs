// Query engine.
// Merges match and wildcard hits, applies the score threshold and joins hits to cached items.

use std::collections::HashMap;

use tracing::debug;

use crate::cache::CacheStore;
use crate::error::Result;
use crate::index::TextIndex;
use crate::model::{SearchHit, SearchResult};

/// Merge both hit lists by key, keeping the higher score, and drop hits below `min_score`.
/// The result is ordered by score descending, then key ascending.
pub fn merge_hits(matched: Vec<SearchHit>, wildcard: Vec<SearchHit>, min_score: f32) -> Vec<SearchHit> {
    let mut best: HashMap<String, f32> = HashMap::new();
    for hit in matched.into_iter().chain(wildcard) {
        best.entry(hit.key)
            .and_modify(|score| *score = score.max(hit.score))
            .or_insert(hit.score);
    }

    let mut merged: Vec<SearchHit> = best
        .into_iter()
        .filter(|(_, score)| *score >= min_score)
        .map(|(key, score)| SearchHit { key, score })
        .collect();
    sort_hits(&mut merged);
    merged
}

fn sort_hits(hits: &mut [SearchHit]) {
    hits.sort_by(|a, b| b.score.total_cmp(&a.score).then_with(|| a.key.cmp(&b.key)));
}

/// Search the cached items of `token`.
///
/// Blank text yields no results. At most `max_hits` results come back across both queries.
/// Hits whose item is gone from the store are dropped.
pub fn search(
    index: &dyn TextIndex,
    store: &CacheStore,
    token: &str,
    text: &str,
    min_score: f32,
    max_hits: usize,
) -> Result<Vec<SearchResult>> {
    let text = text.trim();
    if text.is_empty() {
        return Ok(Vec::new());
    }

    let matched = index.match_query(text, max_hits)?;
    let wildcard = index.wildcard_query(text, max_hits)?;
    debug!(text, matched = matched.len(), wildcard = wildcard.len(), "index queried");

    let mut hits = merge_hits(matched, wildcard, min_score);
    hits.truncate(max_hits);
    if hits.is_empty() {
        return Ok(Vec::new());
    }

    let keys: Vec<&str> = hits.iter().map(|hit| hit.key.as_str()).collect();
    let mut items = store.get_items(token, &keys)?;

    let mut results = Vec::with_capacity(hits.len());
    for hit in hits {
        match items.remove(&hit.key) {
            Some(item) => results.push(SearchResult {
                item,
                score: hit.score,
            }),
            None => debug!(key = %hit.key, "indexed item missing from store"),
        }
    }
    Ok(results)
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use tempfile::TempDir;

    use super::*;
    use crate::error::StarError;
    use crate::index::MemoryIndex;
    use crate::index::fake::ScriptedIndex;
    use crate::model::fixtures::item;

    fn store_with(dir: &TempDir, names: &[&str]) -> CacheStore {
        let store = CacheStore::open(&dir.path().join("cache.redb"), Duration::ZERO).unwrap();
        store.ensure_partition("tok").unwrap();
        let items: Vec<_> = names.iter().map(|n| item(n, 1)).collect();
        store.put_items("tok", &items).unwrap();
        store
    }

    #[test]
    fn test_merge_keeps_higher_score() {
        let merged = merge_hits(
            vec![SearchHit::new("a/x", 0.7)],
            vec![SearchHit::new("a/x", 0.3)],
            0.5,
        );
        assert_eq!(merged, vec![SearchHit::new("a/x", 0.7)]);

        // Same when the wildcard side wins.
        let merged = merge_hits(
            vec![SearchHit::new("a/x", 0.3)],
            vec![SearchHit::new("a/x", 0.9)],
            0.5,
        );
        assert_eq!(merged, vec![SearchHit::new("a/x", 0.9)]);
    }

    #[test]
    fn test_merge_applies_threshold_inclusively() {
        let merged = merge_hits(
            vec![SearchHit::new("a/low", 0.4), SearchHit::new("a/edge", 0.5)],
            vec![],
            0.5,
        );
        assert_eq!(merged, vec![SearchHit::new("a/edge", 0.5)]);
    }

    #[test]
    fn test_merge_orders_by_score_then_key() {
        let merged = merge_hits(
            vec![
                SearchHit::new("b/tie", 1.0),
                SearchHit::new("c/top", 2.0),
                SearchHit::new("a/tie", 1.0),
            ],
            vec![SearchHit::new("d/wild", 0.5)],
            0.0,
        );
        let keys: Vec<_> = merged.iter().map(|h| h.key.as_str()).collect();
        assert_eq!(keys, vec!["c/top", "a/tie", "b/tie", "d/wild"]);
    }

    #[test]
    fn test_blank_text_is_empty_not_error() {
        let temp_dir = TempDir::new().unwrap();
        let store = store_with(&temp_dir, &["a/x"]);
        let index = ScriptedIndex {
            fail_queries: true,
            ..Default::default()
        };
        assert!(search(&index, &store, "tok", "   ", 0.5, 10).unwrap().is_empty());
    }

    #[test]
    fn test_search_resolves_and_drops_missing_items() {
        let temp_dir = TempDir::new().unwrap();
        let store = store_with(&temp_dir, &["a/x", "a/y"]);
        let index = ScriptedIndex {
            matched: vec![SearchHit::new("a/x", 0.7), SearchHit::new("gone/repo", 3.0)],
            wildcard: vec![SearchHit::new("a/x", 0.3), SearchHit::new("a/y", 0.6)],
            ..Default::default()
        };

        let results = search(&index, &store, "tok", "x", 0.5, 10).unwrap();
        let found: Vec<_> = results
            .iter()
            .map(|r| (r.item.full_name.as_str(), r.score))
            .collect();
        assert_eq!(found, vec![("a/x", 0.7), ("a/y", 0.6)]);
    }

    #[test]
    fn test_search_is_deterministic() {
        let temp_dir = TempDir::new().unwrap();
        let store = store_with(&temp_dir, &["a/x", "b/x", "c/x"]);
        let index = ScriptedIndex {
            matched: vec![SearchHit::new("c/x", 1.0), SearchHit::new("b/x", 1.0)],
            wildcard: vec![SearchHit::new("a/x", 1.0)],
            ..Default::default()
        };

        let first: Vec<_> = search(&index, &store, "tok", "x", 0.5, 10)
            .unwrap()
            .into_iter()
            .map(|r| r.item.full_name)
            .collect();
        let second: Vec<_> = search(&index, &store, "tok", "x", 0.5, 10)
            .unwrap()
            .into_iter()
            .map(|r| r.item.full_name)
            .collect();
        assert_eq!(first, vec!["a/x", "b/x", "c/x"]);
        assert_eq!(first, second);
    }

    #[test]
    fn test_max_hits_caps_merged_results() {
        let temp_dir = TempDir::new().unwrap();
        let store = store_with(&temp_dir, &[]);
        let index = MemoryIndex::new().unwrap();

        let mut items = Vec::new();
        for (name, readme) in [
            ("a/1", "alpha"),
            ("a/2", "alpha"),
            ("b/1", "alphabet soup"),
            ("b/2", "alphabet soup"),
        ] {
            let mut it = item(name, 1);
            it.readme = readme.to_string();
            index.upsert(name, &it).unwrap();
            items.push(it);
        }
        index.commit().unwrap();
        store.put_items("tok", &items).unwrap();

        // Each query alone stays within the cap; their union would not.
        let results = search(&index, &store, "tok", "alpha", 0.0, 2).unwrap();
        let found: Vec<_> = results.iter().map(|r| r.item.full_name.as_str()).collect();
        assert_eq!(found, vec!["a/1", "a/2"]);
    }

    #[test]
    fn test_index_failure_surfaces() {
        let temp_dir = TempDir::new().unwrap();
        let store = store_with(&temp_dir, &["a/x"]);
        let index = ScriptedIndex {
            fail_queries: true,
            ..Default::default()
        };
        assert!(matches!(
            search(&index, &store, "tok", "x", 0.5, 10),
            Err(StarError::IndexQuery(_))
        ));
    }
}
