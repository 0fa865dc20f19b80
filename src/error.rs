// Error types for stargrep.
// Covers GitHub API failures, cache store and index errors, and invalid input.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum StarError {
    #[error("GitHub API error: {0}")]
    Api(#[from] reqwest::Error),

    #[error("Authentication failed: invalid or expired token")]
    Unauthorized,

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("API quota exceeded, resets at {reset_at}")]
    QuotaExceeded { reset_at: String },

    #[error("Missing GitHub token, pass --token or set GITHUB_TOKEN")]
    MissingToken,

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Cache store {} is held by another process", .0.display())]
    StoreLocked(PathBuf),

    #[error("Cache store error: {0}")]
    Store(#[from] redb::Error),

    #[error("Index error: {0}")]
    Index(#[from] tantivy::TantivyError),

    #[error("Index query failed: {0}")]
    IndexQuery(String),

    #[error("Listing starred repositories failed on {failed} of {pages} pages")]
    ListingFailed { failed: usize, pages: u32 },

    #[error("Fetch worker stopped unexpectedly: {0}")]
    Worker(#[from] tokio::task::JoinError),

    #[error("{0}")]
    Other(String),
}

impl StarError {
    /// Whether the remote refused the request because the API quota ran out.
    pub fn is_quota_exceeded(&self) -> bool {
        matches!(self, StarError::QuotaExceeded { .. })
    }

    /// Whether the error came from the storage engine itself (open, transaction or commit).
    /// These are recovered by deleting and recreating the store file.
    pub fn is_store_corruption(&self) -> bool {
        matches!(self, StarError::Store(_))
    }
}

macro_rules! store_error_from {
    ($($source:ty),* $(,)?) => {
        $(
            impl From<$source> for StarError {
                fn from(err: $source) -> Self {
                    StarError::Store(redb::Error::from(err))
                }
            }
        )*
    };
}

store_error_from!(
    redb::DatabaseError,
    redb::TransactionError,
    redb::TableError,
    redb::StorageError,
    redb::CommitError,
);

pub type Result<T> = std::result::Result<T, StarError>;
