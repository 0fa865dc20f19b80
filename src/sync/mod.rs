// Sync engine.
// Brings the store and the index up to date with the starred repositories on GitHub.

pub mod freshness;
pub mod reconcile;

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tracing::{info, warn};

use crate::cache::{CacheStore, Partition};
use crate::error::Result;
use crate::index::TextIndex;
use crate::model::Item;
use crate::pool::FetchPool;
use crate::source::RemoteSource;

pub use freshness::Freshness;
pub use reconcile::{ChangeSet, diff};

/// How the index became ready.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncOutcome {
    /// Served from the store without contacting GitHub for items.
    Cached,
    /// Reconciled against a fresh listing.
    Refreshed,
    /// The listing failed; serving the previous cache.
    Degraded,
}

/// Summary of one readiness pass.
#[derive(Debug, Clone)]
pub struct SyncReport {
    pub outcome: SyncOutcome,
    pub inserted: usize,
    pub updated: usize,
    pub deleted: usize,
    /// Items whose README fetch failed; they are retried next sync.
    pub failed: usize,
    /// Documents in the index afterwards.
    pub indexed: u64,
}

impl SyncReport {
    fn unchanged(outcome: SyncOutcome, indexed: u64) -> Self {
        Self {
            outcome,
            inserted: 0,
            updated: 0,
            deleted: 0,
            failed: 0,
            indexed,
        }
    }
}

/// One reconciliation pass over the partition of a single token.
pub struct SyncEngine<'a> {
    store: &'a CacheStore,
    index: &'a dyn TextIndex,
    source: Arc<dyn RemoteSource>,
    pool: FetchPool,
    token: &'a str,
    freshness_window: Duration,
}

impl<'a> SyncEngine<'a> {
    pub fn new(
        store: &'a CacheStore,
        index: &'a dyn TextIndex,
        source: Arc<dyn RemoteSource>,
        pool: FetchPool,
        token: &'a str,
        freshness_window: Duration,
    ) -> Self {
        Self {
            store,
            index,
            source,
            pool,
            token,
            freshness_window,
        }
    }

    /// Make the index ready: rehydrate it from the store and, when the cache is stale,
    /// reconcile against GitHub.
    pub async fn run(&self) -> Result<SyncReport> {
        let cached_user = self.store.load_user(self.token)?;
        let Freshness { profile, reload } = freshness::check(
            cached_user,
            self.source.as_ref(),
            self.freshness_window,
            Utc::now(),
        )
        .await?;

        let partition = self.store.ensure_partition(self.token)?;
        let old_items = match partition {
            Partition::Existing => self.store.load_items(self.token)?,
            Partition::Created => Vec::new(),
        };
        self.rehydrate(&old_items)?;

        if partition == Partition::Existing && !reload && !old_items.is_empty() {
            let indexed = self.index.count()?;
            info!(indexed, "using cache");
            return Ok(SyncReport::unchanged(SyncOutcome::Cached, indexed));
        }

        let fresh = match self.source.list_all().await {
            Ok(fresh) => fresh,
            Err(err) if partition == Partition::Existing => {
                let indexed = self.index.count()?;
                warn!(error = %err, indexed, "could not list starred repositories, using cache");
                return Ok(SyncReport::unchanged(SyncOutcome::Degraded, indexed));
            }
            Err(err) => return Err(err),
        };

        let old: HashMap<String, Item> = old_items
            .into_iter()
            .map(|item| (item.full_name.clone(), item))
            .collect();
        let changes = reconcile::diff(&old, fresh);
        log_changes(&changes);

        let inserts = self.fetch_details(changes.insert).await?;
        let (inserted, insert_failures) = self.write(&inserts)?;

        let updates = self.fetch_details(changes.update).await?;
        let (updated, update_failures) = self.write(&updates)?;

        let deleted = self.remove(&changes.delete)?;

        self.store.put_user(self.token, &profile)?;

        let indexed = self.index.count()?;
        let report = SyncReport {
            outcome: SyncOutcome::Refreshed,
            inserted,
            updated,
            deleted,
            failed: insert_failures + update_failures,
            indexed,
        };
        info!(
            inserted,
            updated,
            deleted,
            failed = report.failed,
            indexed,
            "sync complete"
        );
        Ok(report)
    }

    /// Load previously cached items into the index.
    fn rehydrate(&self, items: &[Item]) -> Result<()> {
        if items.is_empty() {
            return Ok(());
        }
        for item in items {
            if let Err(err) = self.index.upsert(&item.full_name, item) {
                warn!(full_name = %item.full_name, error = %err, "failed to index cached item");
            }
        }
        self.index.commit()
    }

    /// Fetch README bodies through the pool. Failures are recorded on the item.
    async fn fetch_details(&self, items: Vec<Item>) -> Result<Vec<Item>> {
        let source = Arc::clone(&self.source);
        self.pool
            .run(items, move |mut item: Item| {
                let source = Arc::clone(&source);
                async move {
                    match source.fetch_detail(&item.owner, &item.repo).await {
                        Ok(readme) => item.readme = readme,
                        Err(err) => item.error = Some(err.to_string()),
                    }
                    item
                }
            })
            .await
    }

    /// Persist one batch, then index it. Returns (written, failed).
    fn write(&self, items: &[Item]) -> Result<(usize, usize)> {
        if items.is_empty() {
            return Ok((0, 0));
        }

        let written = self.store.put_items(self.token, items)?;
        for item in items.iter().filter(|item| !item.has_error()) {
            if let Err(err) = self.index.upsert(&item.full_name, item) {
                warn!(full_name = %item.full_name, error = %err, "failed to index item");
            }
        }
        self.index.commit()?;

        Ok((written, items.len() - written))
    }

    fn remove(&self, items: &[Item]) -> Result<usize> {
        if items.is_empty() {
            return Ok(0);
        }

        let keys: Vec<&str> = items.iter().map(|item| item.full_name.as_str()).collect();
        let removed = self.store.delete_items(self.token, &keys)?;
        for key in &keys {
            if let Err(err) = self.index.delete(key) {
                warn!(full_name = key, error = %err, "failed to drop item from index");
            }
        }
        self.index.commit()?;
        Ok(removed)
    }
}

fn log_changes(changes: &ChangeSet) {
    for item in &changes.insert {
        info!(full_name = %item.full_name, pushed_at = ?item.pushed_at, "insert");
    }
    for item in &changes.update {
        info!(full_name = %item.full_name, pushed_at = ?item.pushed_at, "update");
    }
    for item in &changes.delete {
        info!(full_name = %item.full_name, pushed_at = ?item.pushed_at, "delete");
    }
}
