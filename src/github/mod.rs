// GitHub API module.
// Provides the client and types backing the remote source port.

pub mod client;
pub mod endpoints;
pub mod types;

pub use client::GitHubClient;
pub use types::*;
