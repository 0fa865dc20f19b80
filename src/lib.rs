// stargrep library root.
// Local full-text search over the starred repositories of a GitHub account.

pub mod cache;
pub mod config;
pub mod error;
pub mod github;
pub mod index;
pub mod model;
pub mod pool;
pub mod search;
pub mod session;
pub mod source;
pub mod sync;

pub use config::Config;
pub use error::{Result, StarError};
pub use github::GitHubClient;
pub use model::{Item, SearchHit, SearchResult, UserProfile};
pub use session::Session;
pub use source::RemoteSource;
pub use sync::{SyncOutcome, SyncReport};
