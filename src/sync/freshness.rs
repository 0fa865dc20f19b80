// Freshness check for the cached profile.
// Decides whether this run needs a full reconciliation against GitHub.

use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::{info, warn};

use crate::error::Result;
use crate::model::UserProfile;
use crate::source::RemoteSource;

/// The profile to keep for this run and whether items must be re-synced.
#[derive(Debug, Clone)]
pub struct Freshness {
    pub profile: UserProfile,
    pub reload: bool,
}

/// Validate the cached profile against `window`.
///
/// Without a cached profile the remote must answer, otherwise this fails. A stale profile
/// that cannot be refreshed is kept and the cache is used as is.
pub async fn check(
    cached: Option<UserProfile>,
    source: &dyn RemoteSource,
    window: Duration,
    now: DateTime<Utc>,
) -> Result<Freshness> {
    let Some(cached) = cached else {
        let profile = source.current_user().await?;
        info!(login = %profile.login, "no cached profile, full sync required");
        return Ok(Freshness {
            profile,
            reload: true,
        });
    };

    if !cached.is_stale(window, now) {
        return Ok(Freshness {
            profile: cached,
            reload: false,
        });
    }

    match source.current_user().await {
        Ok(profile) => {
            info!(login = %profile.login, cached_at = %cached.cached_at, "profile refreshed");
            Ok(Freshness {
                profile,
                reload: true,
            })
        }
        Err(err) => {
            warn!(error = %err, "could not refresh profile, using cached data");
            Ok(Freshness {
                profile: cached,
                reload: false,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::Ordering;

    use super::*;
    use crate::error::StarError;
    use crate::model::fixtures::{profile, ts};
    use crate::source::fake::{FakeSource, quota_exceeded};

    const HOUR: Duration = Duration::from_secs(3600);

    #[tokio::test]
    async fn test_missing_profile_fetches_and_reloads() {
        let source = FakeSource::new(vec![]);
        let fresh = check(None, &source, HOUR, Utc::now()).await.unwrap();
        assert!(fresh.reload);
        assert_eq!(fresh.profile.login, "octocat");
    }

    #[tokio::test]
    async fn test_missing_profile_and_failing_remote_is_fatal() {
        let source = FakeSource::new(vec![]);
        source.fail_user(quota_exceeded);
        let err = check(None, &source, HOUR, Utc::now()).await.unwrap_err();
        assert!(matches!(err, StarError::QuotaExceeded { .. }));
    }

    #[tokio::test]
    async fn test_fresh_profile_skips_remote() {
        let source = FakeSource::new(vec![]);
        let now = ts(1_700_000_000);
        let cached = profile("me", ts(1_700_000_000 - 60));

        let fresh = check(Some(cached.clone()), &source, HOUR, now).await.unwrap();
        assert!(!fresh.reload);
        assert_eq!(fresh.profile, cached);
        assert_eq!(source.user_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_stale_profile_is_refreshed() {
        let source = FakeSource::new(vec![]);
        let now = ts(1_700_000_000);
        let cached = profile("me", ts(1_700_000_000 - 2 * 3600));

        let fresh = check(Some(cached), &source, HOUR, now).await.unwrap();
        assert!(fresh.reload);
        assert_eq!(fresh.profile.login, "octocat");
    }

    #[tokio::test]
    async fn test_stale_profile_survives_refresh_failure() {
        let source = FakeSource::new(vec![]);
        source.fail_user(quota_exceeded);
        let now = ts(1_700_000_000);
        let cached = profile("me", ts(1_700_000_000 - 2 * 3600));

        let fresh = check(Some(cached.clone()), &source, HOUR, now).await.unwrap();
        assert!(!fresh.reload);
        assert_eq!(fresh.profile, cached);
    }
}
