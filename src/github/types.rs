// GitHub API response types.
// Defines structs for deserializing GitHub REST API responses and mapping them to cache types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::{Item, UserProfile};

/// Repository owner as embedded in repository payloads.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Owner {
    pub login: String,
    pub avatar_url: Option<String>,
}

/// The authenticated user (`GET /user`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub login: String,
    pub avatar_url: Option<String>,
    pub html_url: String,
    pub bio: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn into_profile(self, cached_at: DateTime<Utc>) -> UserProfile {
        UserProfile {
            login: self.login,
            avatar_url: self.avatar_url.unwrap_or_default(),
            url: self.html_url,
            bio: self.bio.unwrap_or_default(),
            created_at: self.created_at,
            updated_at: self.updated_at,
            cached_at,
        }
    }
}

/// GitHub repository.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Repository {
    pub name: String,
    pub full_name: String,
    pub owner: Owner,
    pub html_url: String,
    pub description: Option<String>,
    #[serde(default)]
    pub topics: Vec<String>,
    #[serde(default)]
    pub watchers_count: u64,
    #[serde(default)]
    pub stargazers_count: u64,
    #[serde(default)]
    pub forks_count: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub pushed_at: Option<DateTime<Utc>>,
}

/// Entry of `GET /user/starred` with the `star+json` media type.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StarredRepository {
    pub starred_at: DateTime<Utc>,
    pub repo: Repository,
}

impl StarredRepository {
    pub fn into_item(self, cached_at: DateTime<Utc>) -> Item {
        let repo = self.repo;
        Item {
            owner: repo.owner.login,
            repo: repo.name,
            full_name: repo.full_name,
            url: repo.html_url,
            description: repo.description.unwrap_or_default(),
            topics: repo.topics,
            watchers_count: repo.watchers_count,
            stargazers_count: repo.stargazers_count,
            forks_count: repo.forks_count,
            starred_at: self.starred_at,
            created_at: repo.created_at,
            updated_at: repo.updated_at,
            pushed_at: repo.pushed_at,
            readme: String::new(),
            cached_at,
            error: None,
        }
    }
}

/// Rate limit information from response headers.
#[derive(Debug, Clone, Default)]
pub struct RateLimit {
    pub limit: u64,
    pub remaining: u64,
    pub reset: u64,
}
