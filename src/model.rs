// Domain types shared by the sync engine, store, index and search.
// Items are starred repositories; the profile records when the cache was last validated.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A starred repository plus its fetched README.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub owner: String,
    pub repo: String,
    /// `owner/repo`, the item identity.
    pub full_name: String,
    pub url: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub topics: Vec<String>,
    pub watchers_count: u64,
    pub stargazers_count: u64,
    pub forks_count: u64,
    pub starred_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Change fingerprint. `None` for repositories that were never pushed to.
    pub pushed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub readme: String,
    pub cached_at: DateTime<Utc>,
    /// Set when the README fetch failed. Never persisted.
    #[serde(skip)]
    pub error: Option<String>,
}

impl Item {
    /// Whether the remote reports a different last push than `other`.
    /// Compared at second precision.
    pub fn pushed_differs(&self, other: &Item) -> bool {
        self.pushed_at.map(|t| t.timestamp()) != other.pushed_at.map(|t| t.timestamp())
    }

    pub fn has_error(&self) -> bool {
        self.error.is_some()
    }
}

/// The authenticated GitHub account, cached per token.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    pub login: String,
    #[serde(default)]
    pub avatar_url: String,
    pub url: String,
    #[serde(default)]
    pub bio: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub cached_at: DateTime<Utc>,
}

impl UserProfile {
    /// Check if the cached profile is older than `window` at `now`.
    pub fn is_stale(&self, window: Duration, now: DateTime<Utc>) -> bool {
        let elapsed = now
            .signed_duration_since(self.cached_at)
            .to_std()
            .unwrap_or(Duration::MAX);

        elapsed > window
    }
}

/// A scored reference into the index.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchHit {
    pub key: String,
    pub score: f32,
}

impl SearchHit {
    pub fn new(key: impl Into<String>, score: f32) -> Self {
        Self {
            key: key.into(),
            score,
        }
    }
}

/// A search hit joined back to its cached item.
#[derive(Debug, Clone)]
pub struct SearchResult {
    pub item: Item,
    pub score: f32,
}
