// Snapshot diff.
// Splits a fresh remote listing into insert, update and delete sets against the cached items.

use std::collections::{HashMap, HashSet};

use crate::model::Item;

/// What a sync pass has to write.
#[derive(Debug, Default)]
pub struct ChangeSet {
    pub insert: Vec<Item>,
    pub update: Vec<Item>,
    pub delete: Vec<Item>,
}

impl ChangeSet {
    pub fn is_empty(&self) -> bool {
        self.insert.is_empty() && self.update.is_empty() && self.delete.is_empty()
    }
}

/// Compare `fresh` against `old`.
///
/// Items only in `fresh` are inserted, items in both with a different `pushed_at` are
/// updated, items only in `old` are deleted. Nothing else about an item counts as a change.
/// Each set is sorted by full name.
pub fn diff(old: &HashMap<String, Item>, fresh: Vec<Item>) -> ChangeSet {
    let mut changes = ChangeSet::default();
    let mut seen: HashSet<String> = HashSet::with_capacity(fresh.len());

    for item in fresh {
        if !seen.insert(item.full_name.clone()) {
            // Pages can shift while being listed; keep the first copy.
            continue;
        }
        match old.get(&item.full_name) {
            None => changes.insert.push(item),
            Some(cached) if cached.pushed_differs(&item) => changes.update.push(item),
            Some(_) => {}
        }
    }

    changes.delete = old
        .values()
        .filter(|cached| !seen.contains(&cached.full_name))
        .cloned()
        .collect();

    changes.insert.sort_by(|a, b| a.full_name.cmp(&b.full_name));
    changes.update.sort_by(|a, b| a.full_name.cmp(&b.full_name));
    changes.delete.sort_by(|a, b| a.full_name.cmp(&b.full_name));
    changes
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::fixtures::item;

    const T1: i64 = 1_700_000_000;
    const T2: i64 = 1_700_100_000;

    fn snapshot(items: Vec<Item>) -> HashMap<String, Item> {
        items
            .into_iter()
            .map(|item| (item.full_name.clone(), item))
            .collect()
    }

    fn names(items: &[Item]) -> Vec<&str> {
        items.iter().map(|i| i.full_name.as_str()).collect()
    }

    #[test]
    fn test_new_item_is_inserted() {
        let old = snapshot(vec![item("a/x", T1)]);
        let changes = diff(&old, vec![item("a/x", T1), item("a/y", T2)]);
        assert_eq!(names(&changes.insert), vec!["a/y"]);
        assert!(changes.update.is_empty());
        assert!(changes.delete.is_empty());
    }

    #[test]
    fn test_pushed_item_is_updated() {
        let old = snapshot(vec![item("a/x", T1)]);
        let changes = diff(&old, vec![item("a/x", T1 + 1)]);
        assert!(changes.insert.is_empty());
        assert_eq!(names(&changes.update), vec!["a/x"]);
        assert!(changes.delete.is_empty());
    }

    #[test]
    fn test_unstarred_item_is_deleted() {
        let old = snapshot(vec![item("a/x", T1)]);
        let changes = diff(&old, vec![]);
        assert!(changes.insert.is_empty());
        assert!(changes.update.is_empty());
        assert_eq!(names(&changes.delete), vec!["a/x"]);
    }

    #[test]
    fn test_unchanged_item_is_left_alone() {
        let old = snapshot(vec![item("a/x", T1)]);
        let mut edited = item("a/x", T1);
        edited.description = "new description, same push".to_string();
        edited.stargazers_count += 100;

        let changes = diff(&old, vec![edited]);
        assert!(changes.is_empty());
    }

    #[test]
    fn test_first_sync_inserts_everything() {
        let changes = diff(&HashMap::new(), vec![item("b/y", T1), item("a/x", T2)]);
        assert_eq!(names(&changes.insert), vec!["a/x", "b/y"]);
    }

    #[test]
    fn test_duplicate_listing_entries_collapse() {
        let changes = diff(&HashMap::new(), vec![item("a/x", T1), item("a/x", T2)]);
        assert_eq!(changes.insert.len(), 1);
        assert_eq!(changes.insert[0].pushed_at, item("a/x", T1).pushed_at);
    }
}
