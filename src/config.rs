// Runtime configuration.
// Holds the GitHub token plus the tuning constants for fetching, caching and search.

use std::path::PathBuf;
use std::time::Duration;

use crate::cache;
use crate::error::{Result, StarError};

/// Repositories requested per listing page (GitHub maximum).
pub const PER_PAGE: u32 = 100;

/// Concurrent workers for page listing and README fetches.
pub const DEFAULT_WORKERS: usize = 20;

/// Deadline for a single GitHub request.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Maximum age of the cached profile before a refresh is attempted: 1 hour.
pub const DEFAULT_FRESHNESS_WINDOW: Duration = Duration::from_secs(60 * 60);

/// How long to wait for another process to release the cache store.
pub const DEFAULT_OPEN_TIMEOUT: Duration = Duration::from_secs(2);

/// Minimum merged score for a hit to be reported.
pub const DEFAULT_MIN_SCORE: f32 = 0.5;

/// Hits requested from each index query.
pub const DEFAULT_MAX_HITS: usize = 100;

#[derive(Debug, Clone)]
pub struct Config {
    pub token: String,
    pub cache_dir: PathBuf,
    pub min_score: f32,
    pub max_hits: usize,
    pub workers: usize,
    pub request_timeout: Duration,
    pub freshness_window: Duration,
    pub open_timeout: Duration,
}

impl Config {
    /// Build a configuration with defaults for everything but the token.
    pub fn new(token: impl Into<String>) -> Result<Self> {
        let token = token.into();
        if token.trim().is_empty() {
            return Err(StarError::MissingToken);
        }

        // No home directory (containers, CI): keep the cache next to the working directory.
        let cache_dir = cache::cache_dir().unwrap_or_else(|| PathBuf::from(".stargrep"));

        Ok(Self {
            token,
            cache_dir,
            min_score: DEFAULT_MIN_SCORE,
            max_hits: DEFAULT_MAX_HITS,
            workers: DEFAULT_WORKERS,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            freshness_window: DEFAULT_FRESHNESS_WINDOW,
            open_timeout: DEFAULT_OPEN_TIMEOUT,
        })
    }

    /// Create a configuration from the GITHUB_TOKEN environment variable.
    pub fn from_env() -> Result<Self> {
        let token = std::env::var("GITHUB_TOKEN").map_err(|_| StarError::MissingToken)?;
        Self::new(token)
    }

    pub fn with_cache_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cache_dir = dir.into();
        self
    }

    pub fn with_min_score(mut self, min_score: f32) -> Result<Self> {
        self.min_score = validate_min_score(min_score)?;
        Ok(self)
    }

    pub fn with_max_hits(mut self, max_hits: usize) -> Self {
        self.max_hits = max_hits;
        self
    }

    pub fn with_workers(mut self, workers: usize) -> Result<Self> {
        if workers == 0 {
            return Err(StarError::InvalidInput(
                "worker count must be greater than zero".to_string(),
            ));
        }
        self.workers = workers;
        Ok(self)
    }

    pub fn with_freshness_window(mut self, window: Duration) -> Self {
        self.freshness_window = window;
        self
    }

    pub fn with_open_timeout(mut self, timeout: Duration) -> Self {
        self.open_timeout = timeout;
        self
    }

    /// Path of the cache store file.
    pub fn db_path(&self) -> PathBuf {
        cache::db_path(&self.cache_dir)
    }
}

/// Reject scores that would make every comparison meaningless.
pub fn validate_min_score(min_score: f32) -> Result<f32> {
    if !min_score.is_finite() || min_score < 0.0 {
        return Err(StarError::InvalidInput(format!(
            "minimum score must be a non-negative number, got {}",
            min_score
        )));
    }
    Ok(min_score)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_token_is_rejected() {
        assert!(matches!(Config::new(""), Err(StarError::MissingToken)));
        assert!(matches!(Config::new("   "), Err(StarError::MissingToken)));
    }

    #[test]
    fn test_defaults() {
        let config = Config::new("token").unwrap();
        assert_eq!(config.workers, DEFAULT_WORKERS);
        assert_eq!(config.freshness_window, Duration::from_secs(3600));
        assert_eq!(config.min_score, DEFAULT_MIN_SCORE);
        assert!(config.db_path().ends_with("cache.redb"));
    }

    #[test]
    fn test_overrides_are_validated() {
        let config = Config::new("token").unwrap();
        assert!(config.clone().with_workers(0).is_err());
        assert!(config.clone().with_min_score(-1.0).is_err());
        assert!(config.clone().with_min_score(f32::NAN).is_err());

        let config = config.with_min_score(0.8).unwrap().with_cache_dir("/tmp/stars");
        assert_eq!(config.min_score, 0.8);
        assert_eq!(config.db_path(), PathBuf::from("/tmp/stars/cache.redb"));
    }
}
