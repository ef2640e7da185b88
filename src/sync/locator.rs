use chrono::{DateTime, Duration, Utc};
use tracing::{debug, info};

use super::fetch::{fetch_period, CacheUse};
use super::pacing::Shutdown;
use crate::feed::{parse_fixtures, FetchOutcome, FixtureFeed, Source, SEASON_LENGTH};
use crate::store::PeriodCache;

/// Find the week being played around `reference`.
///
/// Weeks are scanned in ascending order with unconditional requests: a 304
/// carries no body, so a conditional request would silently hide a week. The
/// first week holding a fixture within `tolerance` of `reference` wins, even
/// if a later week is closer. Without such a week the week of the single
/// closest fixture is used, and with no usable kickoff at all, week 1.
///
/// Request errors only mean "no information" for that week. Every fresh
/// response still refreshes the cache token.
///
/// Returns `None` if a stop is requested before the scan finishes.
pub async fn locate_current_period(
    feed: &dyn FixtureFeed,
    cache: Option<&PeriodCache>,
    source: &Source,
    reference: DateTime<Utc>,
    tolerance: Duration,
    shutdown: &Shutdown,
) -> Option<u32> {
    let mut closest: Option<(u32, Duration)> = None;

    for period in 1..=SEASON_LENGTH {
        if shutdown.is_requested() {
            info!("[{}] Locating stopped before week {}", source.name, period);
            return None;
        }
        let payload =
            match fetch_period(feed, cache, source, period, CacheUse::UNCONDITIONAL_WARM).await {
                Ok(FetchOutcome::Fresh { payload, .. }) => payload,
                Ok(FetchOutcome::NotModified) => continue,
                Err(e) => {
                    debug!("[{}] Locating: week {} unavailable: {}", source.name, period, e);
                    continue;
                }
            };

        for fixture in parse_fixtures(&payload, source) {
            let Some(kickoff) = fixture.kickoff.instant() else {
                continue;
            };
            let delta = (kickoff - reference).abs();
            if delta <= tolerance {
                info!("[{}] Current week detected: {}", source.name, period);
                return Some(period);
            }
            if closest.map_or(true, |(_, best)| delta < best) {
                closest = Some((period, delta));
            }
        }
    }

    let period = match closest {
        Some((period, delta)) => {
            info!(
                "[{}] No week within {} days; closest is week {} ({}h away)",
                source.name,
                tolerance.num_days(),
                period,
                delta.num_hours()
            );
            period
        }
        None => {
            info!("[{}] No kickoff dates available; defaulting to week 1", source.name);
            1
        }
    };
    Some(period)
}
