// Search session.
// Owns the store, the index and the last result list for one token.

use std::path::Path;
use std::sync::Arc;

use tracing::warn;

use crate::cache::{self, CacheStore};
use crate::config::{Config, validate_min_score};
use crate::error::Result;
use crate::index::{MemoryIndex, TextIndex};
use crate::model::SearchResult;
use crate::pool::FetchPool;
use crate::search;
use crate::source::RemoteSource;
use crate::sync::{SyncEngine, SyncReport};

/// Everything a caller needs between searches. One per token and process.
pub struct Session {
    config: Config,
    store: CacheStore,
    index: MemoryIndex,
    min_score: f32,
    report: SyncReport,
    results: Vec<SearchResult>,
}

impl Session {
    /// Open the cache and make the index ready.
    ///
    /// A damaged store file is deleted and rebuilt from GitHub once. Without an earlier
    /// store file there is nothing to recover and the error is returned.
    pub async fn open(config: Config, source: Arc<dyn RemoteSource>) -> Result<Self> {
        let pool = FetchPool::new(config.workers)?;
        let path = config.db_path();
        let had_store = path.exists();

        let mut recovered = false;
        loop {
            match prepare(&config, &path, Arc::clone(&source), pool).await {
                Ok((store, index, report)) => {
                    let min_score = config.min_score;
                    return Ok(Self {
                        config,
                        store,
                        index,
                        min_score,
                        report,
                        results: Vec::new(),
                    });
                }
                Err(err) if err.is_store_corruption() && had_store && !recovered => {
                    warn!(path = %path.display(), error = %err, "cache store is damaged, rebuilding it");
                    cache::clear_all(&path)?;
                    recovered = true;
                }
                Err(err) => return Err(err),
            }
        }
    }

    /// How the index became ready.
    pub fn report(&self) -> &SyncReport {
        &self.report
    }

    pub fn min_score(&self) -> f32 {
        self.min_score
    }

    pub fn set_min_score(&mut self, min_score: f32) -> Result<()> {
        self.min_score = validate_min_score(min_score)?;
        Ok(())
    }

    /// Documents currently searchable.
    pub fn indexed(&self) -> Result<u64> {
        self.index.count()
    }

    /// Run a search and keep its results as the current list.
    pub fn search(&mut self, text: &str) -> Result<&[SearchResult]> {
        self.results = search::search(
            &self.index,
            &self.store,
            &self.config.token,
            text,
            self.min_score,
            self.config.max_hits,
        )?;
        Ok(&self.results)
    }

    /// Results of the last search.
    pub fn results(&self) -> &[SearchResult] {
        &self.results
    }

    /// Pick a result of the last search by 1-based rank or by full name (case-insensitive).
    pub fn find(&self, selector: &str) -> Option<&SearchResult> {
        let selector = selector.trim();
        if let Ok(rank) = selector.parse::<usize>() {
            return rank.checked_sub(1).and_then(|i| self.results.get(i));
        }
        self.results
            .iter()
            .find(|result| result.item.full_name.eq_ignore_ascii_case(selector))
    }
}

async fn prepare(
    config: &Config,
    path: &Path,
    source: Arc<dyn RemoteSource>,
    pool: FetchPool,
) -> Result<(CacheStore, MemoryIndex, SyncReport)> {
    let store = CacheStore::open(path, config.open_timeout)?;
    let index = MemoryIndex::new()?;
    let report = SyncEngine::new(
        &store,
        &index,
        source,
        pool,
        &config.token,
        config.freshness_window,
    )
    .run()
    .await?;
    Ok((store, index, report))
}
