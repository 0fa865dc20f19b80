// GitHub API endpoint functions.
// Typed methods for the user, starred listing and README endpoints, plus the RemoteSource impl.

use async_trait::async_trait;
use chrono::Utc;
use tracing::{debug, warn};

use crate::config::PER_PAGE;
use crate::error::{Result, StarError};
use crate::model::{Item, UserProfile};
use crate::source::RemoteSource;

use super::client::{GitHubClient, MEDIA_RAW, MEDIA_STAR, last_page};
use super::types::{StarredRepository, User};

impl GitHubClient {
    /// Get the authenticated user.
    pub async fn get_current_user(&self) -> Result<User> {
        let response = self.get("/user").await?;
        let user: User = response.json().await?;
        Ok(user)
    }

    /// Get one page of starred repositories and the last page number, if reported.
    pub async fn get_starred_page(
        &self,
        page: u32,
        per_page: u32,
    ) -> Result<(Vec<StarredRepository>, Option<u32>)> {
        let params = [
            ("page", page.to_string()),
            ("per_page", per_page.to_string()),
        ];
        let response = self.get_with("/user/starred", &params, MEDIA_STAR).await?;
        let last = last_page(response.headers());
        let starred: Vec<StarredRepository> = response.json().await?;
        Ok((starred, last))
    }

    /// Get the README of a repository as raw text.
    pub async fn get_readme(&self, owner: &str, repo: &str) -> Result<String> {
        let response = self
            .get_with(&format!("/repos/{}/{}/readme", owner, repo), &[], MEDIA_RAW)
            .await?;
        let readme = response.text().await?;
        Ok(readme)
    }

    /// Get every starred repository.
    ///
    /// The first page tells how many pages exist; the rest go through the fetch pool.
    pub async fn list_starred_all(&self) -> Result<Vec<StarredRepository>> {
        let (first, last) = self.get_starred_page(1, PER_PAGE).await?;

        let client = self.clone();
        let results = self
            .pool
            .run(remaining_pages(last), move |page| {
                let client = client.clone();
                async move {
                    let result = client
                        .get_starred_page(page, PER_PAGE)
                        .await
                        .map(|(repos, _)| repos);
                    (page, result)
                }
            })
            .await?;

        collect_pages(first, results)
    }
}

/// Page numbers still to fetch after page 1. No `Link` header means a single page.
fn remaining_pages(last: Option<u32>) -> Vec<u32> {
    (2..=last.unwrap_or(1)).collect()
}

/// Fold the first page and the drained results of the others into one listing.
///
/// Every page result is inspected; any failure fails the listing with the failure count.
fn collect_pages<T>(first: Vec<T>, results: Vec<(u32, Result<Vec<T>>)>) -> Result<Vec<T>> {
    let pages = results.len() as u32 + 1;
    let mut listing = first;
    let mut failed = 0;
    for (page, result) in results {
        match result {
            Ok(repos) => {
                debug!(page, count = repos.len(), "fetched starred page");
                listing.extend(repos);
            }
            Err(err) => {
                warn!(page, error = %err, "failed to fetch starred page");
                failed += 1;
            }
        }
    }

    if failed > 0 {
        return Err(StarError::ListingFailed { failed, pages });
    }
    Ok(listing)
}

#[async_trait]
impl RemoteSource for GitHubClient {
    async fn list_all(&self) -> Result<Vec<Item>> {
        let cached_at = Utc::now();
        let starred = self.list_starred_all().await?;
        Ok(starred
            .into_iter()
            .map(|s| s.into_item(cached_at))
            .collect())
    }

    async fn fetch_detail(&self, owner: &str, repo: &str) -> Result<String> {
        match self.get_readme(owner, repo).await {
            // No README is a valid state, not a failed fetch.
            Err(StarError::NotFound(_)) => Ok(String::new()),
            other => other,
        }
    }

    async fn current_user(&self) -> Result<UserProfile> {
        let user = self.get_current_user().await?;
        Ok(user.into_profile(Utc::now()))
    }
}
