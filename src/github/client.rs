// GitHub API HTTP client.
// Handles authentication, rate limiting, and request/response processing.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use reqwest::{
    Client, Response, StatusCode,
    header::{ACCEPT, AUTHORIZATION, HeaderMap, HeaderValue, LINK, USER_AGENT},
};

use crate::error::{Result, StarError};
use crate::pool::FetchPool;

use super::types::RateLimit;

const GITHUB_API_BASE: &str = "https://api.github.com";
const GITHUB_API_VERSION: &str = "2022-11-28";

/// Default media type for JSON responses.
pub const MEDIA_JSON: &str = "application/vnd.github+json";
/// Starred listings including `starred_at`.
pub const MEDIA_STAR: &str = "application/vnd.github.star+json";
/// Raw file contents (README bodies).
pub const MEDIA_RAW: &str = "application/vnd.github.raw+json";

/// GitHub API client with authentication and rate limit tracking.
///
/// Cheap to clone; clones share the connection pool and rate limit state.
#[derive(Clone)]
pub struct GitHubClient {
    client: Client,
    rate_limit: Arc<Mutex<RateLimit>>,
    pub(super) pool: FetchPool,
}

impl GitHubClient {
    /// Create a new GitHub client with the given token.
    pub fn new(token: &str, request_timeout: Duration, pool: FetchPool) -> Result<Self> {
        if token.trim().is_empty() {
            return Err(StarError::MissingToken);
        }

        let mut headers = HeaderMap::new();

        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", token))
                .map_err(|e| StarError::InvalidInput(e.to_string()))?,
        );
        headers.insert(ACCEPT, HeaderValue::from_static(MEDIA_JSON));
        headers.insert(
            "X-GitHub-Api-Version",
            HeaderValue::from_static(GITHUB_API_VERSION),
        );
        headers.insert(USER_AGENT, HeaderValue::from_static("stargrep"));

        let client = Client::builder()
            .default_headers(headers)
            .timeout(request_timeout)
            .build()
            .map_err(StarError::Api)?;

        Ok(Self {
            client,
            rate_limit: Arc::new(Mutex::new(RateLimit::default())),
            pool,
        })
    }

    /// Get the most recently observed rate limit.
    pub fn rate_limit(&self) -> RateLimit {
        self.rate_limit
            .lock()
            .map(|limit| limit.clone())
            .unwrap_or_default()
    }

    /// Make a GET request to the GitHub API.
    pub async fn get(&self, endpoint: &str) -> Result<Response> {
        self.get_with(endpoint, &[], MEDIA_JSON).await
    }

    /// Make a GET request with query parameters and an explicit media type.
    pub async fn get_with(
        &self,
        endpoint: &str,
        params: &[(&str, String)],
        accept: &'static str,
    ) -> Result<Response> {
        let url = format!("{}{}", GITHUB_API_BASE, endpoint);
        let response = self
            .client
            .get(&url)
            .header(ACCEPT, accept)
            .query(params)
            .send()
            .await
            .map_err(StarError::Api)?;

        let observed = rate_limit_from(response.headers());
        self.update_rate_limit(&observed);
        check_response(response, &observed).await
    }

    fn update_rate_limit(&self, observed: &RateLimit) {
        if observed.limit == 0 {
            return;
        }
        if let Ok(mut limit) = self.rate_limit.lock() {
            *limit = observed.clone();
        }
    }
}

/// Read rate limit headers. Missing headers leave zeros, and a zero `limit` means
/// nothing was reported.
pub fn rate_limit_from(headers: &HeaderMap) -> RateLimit {
    let header = |name: &str| -> Option<u64> {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse().ok())
    };

    RateLimit {
        limit: header("x-ratelimit-limit").unwrap_or(0),
        remaining: header("x-ratelimit-remaining").unwrap_or(0),
        reset: header("x-ratelimit-reset").unwrap_or(0),
    }
}

/// Check response status and convert errors.
async fn check_response(response: Response, rate_limit: &RateLimit) -> Result<Response> {
    match response.status() {
        StatusCode::OK | StatusCode::CREATED | StatusCode::ACCEPTED => Ok(response),
        StatusCode::UNAUTHORIZED => Err(StarError::Unauthorized),
        StatusCode::NOT_FOUND => {
            let url = response.url().to_string();
            Err(StarError::NotFound(url))
        }
        StatusCode::FORBIDDEN | StatusCode::TOO_MANY_REQUESTS
            if rate_limit.limit > 0 && rate_limit.remaining == 0 =>
        {
            Err(StarError::QuotaExceeded {
                reset_at: format_reset(rate_limit.reset),
            })
        }
        StatusCode::TOO_MANY_REQUESTS => Err(StarError::QuotaExceeded {
            reset_at: "unknown".to_string(),
        }),
        StatusCode::FORBIDDEN => Err(StarError::Other(format!(
            "Forbidden: {}",
            response.text().await.unwrap_or_default()
        ))),
        status => Err(StarError::Other(format!(
            "HTTP {}: {}",
            status,
            response.text().await.unwrap_or_default()
        ))),
    }
}

fn format_reset(reset: u64) -> String {
    chrono::DateTime::from_timestamp(reset as i64, 0)
        .map(|dt| dt.format("%H:%M:%S").to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

/// Page number of the `rel="last"` entry of a `Link` header.
pub fn last_page(headers: &HeaderMap) -> Option<u32> {
    let link = headers.get(LINK)?.to_str().ok()?;
    link.split(',').find_map(|entry| {
        let (target, rel) = entry.split_once(';')?;
        if !rel.contains("rel=\"last\"") {
            return None;
        }
        let url = target.trim().trim_start_matches('<').trim_end_matches('>');
        let (_, query) = url.split_once('?')?;
        query
            .split('&')
            .find_map(|pair| pair.strip_prefix("page="))
            .and_then(|page| page.parse().ok())
    })
}
