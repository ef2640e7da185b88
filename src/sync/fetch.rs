use tracing::warn;

use crate::feed::{FetchError, FetchOutcome, FixtureFeed, Source};
use crate::store::PeriodCache;

/// How a week request interacts with the [`PeriodCache`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheUse {
    /// Send the cached token as `If-Modified-Since`
    pub send_validator: bool,
    /// Persist the `Last-Modified` of a fresh response
    pub store_token: bool,
}

impl CacheUse {
    /// Regular sync: conditional request, token refreshed.
    pub const CONDITIONAL: CacheUse = CacheUse {
        send_validator: true,
        store_token: true,
    };

    /// Period location: always read the body, but keep tokens warm for the
    /// conditional phase that follows.
    pub const UNCONDITIONAL_WARM: CacheUse = CacheUse {
        send_validator: false,
        store_token: true,
    };

    /// Unconditional request that leaves the stored token alone.
    pub const UNCONDITIONAL_COLD: CacheUse = CacheUse {
        send_validator: false,
        store_token: false,
    };
}

/// Request one week, reading and writing the token as `mode` says.
///
/// Cache I/O problems are logged and never fail the request: an unreadable
/// token just means an unconditional request.
pub async fn fetch_period(
    feed: &dyn FixtureFeed,
    cache: Option<&PeriodCache>,
    source: &Source,
    period: u32,
    mode: CacheUse,
) -> Result<FetchOutcome, FetchError> {
    let validator = match (mode.send_validator, cache) {
        (true, Some(cache)) => match cache.load(period) {
            Ok(token) => token,
            Err(e) => {
                warn!("[{}] Week {}: ignoring unreadable cache token: {:#}", source.name, period, e);
                None
            }
        },
        _ => None,
    };

    let outcome = feed.fetch_week(source, period, validator.as_deref()).await?;

    if let (FetchOutcome::Fresh { token: Some(token), .. }, true, Some(cache)) =
        (&outcome, mode.store_token, cache)
    {
        if let Err(e) = cache.save(period, token) {
            warn!("[{}] Week {}: failed to store cache token: {:#}", source.name, period, e);
        }
    }

    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sync::test_support::{fixtures_at, scratch_source, ScriptedFeed};

    #[tokio::test]
    async fn test_conditional_uses_and_refreshes_token() {
        let (_dir, source) = scratch_source();
        let cache = PeriodCache::new(source.token_dir.clone().unwrap());
        let feed = ScriptedFeed::new().with_week(3, fixtures_at(&[]), Some("t2"));

        cache.save(3, "t1").unwrap();
        let out = fetch_period(&feed, Some(&cache), &source, 3, CacheUse::CONDITIONAL)
            .await
            .unwrap();

        assert!(matches!(out, FetchOutcome::Fresh { .. }));
        assert_eq!(feed.calls(), vec![(3, Some("t1".to_string()))]);
        assert_eq!(cache.load(3).unwrap().as_deref(), Some("t2"));
    }

    #[tokio::test]
    async fn test_conditional_hit() {
        let (_dir, source) = scratch_source();
        let cache = PeriodCache::new(source.token_dir.clone().unwrap());
        let feed = ScriptedFeed::new().with_week(3, fixtures_at(&[]), Some("t1"));

        cache.save(3, "t1").unwrap();
        let out = fetch_period(&feed, Some(&cache), &source, 3, CacheUse::CONDITIONAL)
            .await
            .unwrap();
        assert_eq!(out, FetchOutcome::NotModified);
    }

    #[tokio::test]
    async fn test_unconditional_ignores_token_but_may_store() {
        let (_dir, source) = scratch_source();
        let cache = PeriodCache::new(source.token_dir.clone().unwrap());
        let feed = ScriptedFeed::new().with_week(3, fixtures_at(&[]), Some("t1"));
        cache.save(3, "t1").unwrap();

        let out = fetch_period(&feed, Some(&cache), &source, 3, CacheUse::UNCONDITIONAL_COLD)
            .await
            .unwrap();
        assert!(matches!(out, FetchOutcome::Fresh { .. }));
        assert_eq!(feed.calls(), vec![(3, None)]);

        let feed = ScriptedFeed::new().with_week(4, fixtures_at(&[]), Some("t9"));
        fetch_period(&feed, Some(&cache), &source, 4, CacheUse::UNCONDITIONAL_COLD)
            .await
            .unwrap();
        assert_eq!(cache.load(4).unwrap(), None);

        fetch_period(&feed, Some(&cache), &source, 4, CacheUse::UNCONDITIONAL_WARM)
            .await
            .unwrap();
        assert_eq!(cache.load(4).unwrap().as_deref(), Some("t9"));
    }

    #[tokio::test]
    async fn test_without_cache_requests_are_unconditional() {
        let (_dir, source) = scratch_source();
        let feed = ScriptedFeed::new().with_week(1, fixtures_at(&[]), Some("t1"));

        let out = fetch_period(&feed, None, &source, 1, CacheUse::CONDITIONAL)
            .await
            .unwrap();
        assert!(matches!(out, FetchOutcome::Fresh { .. }));
        assert_eq!(feed.calls(), vec![(1, None)]);
    }
}
