use chrono::{DateTime, Duration as TimeSpan, Utc};
use serde_json::Value;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, error, info, warn};

use super::fetch::{fetch_period, CacheUse};
use super::locator::locate_current_period;
use super::merge::merge_source;
use super::pacing::{Pacing, Shutdown};
use crate::feed::{FetchError, FetchOutcome, FixtureFeed, Source, SEASON_LENGTH};
use crate::store::{PeriodCache, SnapshotStore};

/// What to do with the `Last-Modified` of the forced re-download that repairs
/// a week answered with 304 but missing locally.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RecoveryTokenPolicy {
    /// Leave the token from the conditional probe in place.
    #[default]
    Keep,
    /// Store the token returned by the re-download.
    Refresh,
}

#[derive(Debug, Clone, Default)]
pub struct SyncSettings {
    pub pacing: Pacing,
    pub recovery_tokens: RecoveryTokenPolicy,
}

#[derive(Debug, Error)]
pub enum SyncError {
    #[error("[{source_name}] skipped: {reason}")]
    ConfigurationMissing {
        source_name: String,
        reason: FetchError,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PeriodOutcome {
    /// New data saved
    Updated { consolidated_changed: bool },
    /// 304 and the snapshot is already on disk
    Unchanged,
    /// 304 without a local snapshot, repaired by a forced download
    Recovered { consolidated_changed: bool },
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncReport {
    pub source_id: String,
    /// `None` when the run stopped before a week was chosen
    pub target_period: Option<u32>,
    pub window: Vec<u32>,
    pub periods: Vec<(u32, PeriodOutcome)>,
    pub cancelled: bool,
}

impl SyncReport {
    fn cancelled_before_start(source: &Source) -> Self {
        SyncReport {
            source_id: source.id.clone(),
            target_period: None,
            window: Vec::new(),
            periods: Vec::new(),
            cancelled: true,
        }
    }

    pub fn failures(&self) -> usize {
        self.periods
            .iter()
            .filter(|(_, o)| matches!(o, PeriodOutcome::Failed(_)))
            .count()
    }

    pub fn consolidated_changed(&self) -> bool {
        self.periods.iter().any(|(_, o)| {
            matches!(
                o,
                PeriodOutcome::Updated { consolidated_changed: true }
                    | PeriodOutcome::Recovered { consolidated_changed: true }
            )
        })
    }
}

/// Weeks to sync around `target`: the previous one, the target itself and
/// `lookahead` following weeks, clipped to the season.
pub fn work_window(target: u32, lookahead: u32) -> Vec<u32> {
    let first = target.saturating_sub(1).max(1);
    let last = target.saturating_add(lookahead).min(SEASON_LENGTH);
    (first..=last).collect()
}

/// Per-source local state
struct SourceStores {
    snapshots: SnapshotStore,
    tokens: Option<PeriodCache>,
}

impl SourceStores {
    fn for_source(source: &Source) -> Self {
        SourceStores {
            snapshots: SnapshotStore::new(source.snapshot_dir.clone()),
            tokens: source.token_dir.clone().map(PeriodCache::new),
        }
    }
}

/// Drives the sync of one source at a time: locate the current week, then
/// fetch, store and merge each week of the work window.
pub struct SyncEngine {
    feed: Arc<dyn FixtureFeed>,
    settings: SyncSettings,
    shutdown: Shutdown,
}

impl SyncEngine {
    pub fn new(feed: Arc<dyn FixtureFeed>, settings: SyncSettings, shutdown: Shutdown) -> Self {
        SyncEngine {
            feed,
            settings,
            shutdown,
        }
    }

    pub fn stop_requested(&self) -> bool {
        self.shutdown.is_requested()
    }

    pub async fn run(
        &self,
        source: &Source,
        forced_period: Option<u32>,
    ) -> Result<SyncReport, SyncError> {
        self.run_at(source, forced_period, Utc::now()).await
    }

    /// [`SyncEngine::run`] with an explicit "now" for week location.
    pub async fn run_at(
        &self,
        source: &Source,
        forced_period: Option<u32>,
        now: DateTime<Utc>,
    ) -> Result<SyncReport, SyncError> {
        self.feed
            .preflight(source)
            .map_err(|reason| SyncError::ConfigurationMissing {
                source_name: source.name.clone(),
                reason,
            })?;

        let stores = SourceStores::for_source(source);
        let mut shutdown = self.shutdown.clone();

        if shutdown.is_requested() {
            warn!("[{}] Stop requested, not starting", source.name);
            return Ok(SyncReport::cancelled_before_start(source));
        }

        let target = match forced_period.filter(|p| (1..=SEASON_LENGTH).contains(p)) {
            Some(p) => {
                info!("[{}] Using forced week {}", source.name, p);
                p
            }
            None => {
                if let Some(p) = forced_period {
                    warn!(
                        "[{}] Ignoring forced week {} outside 1..={}",
                        source.name, p, SEASON_LENGTH
                    );
                }
                info!(
                    "[{}] Locating current week (local time {})",
                    source.name,
                    now.with_timezone(&source.display_tz).format("%Y-%m-%d %H:%M")
                );
                let located = locate_current_period(
                    self.feed.as_ref(),
                    stores.tokens.as_ref(),
                    source,
                    now,
                    TimeSpan::days(source.tolerance_days),
                    &shutdown,
                )
                .await;
                match located {
                    Some(p) => p,
                    None => {
                        warn!("[{}] Stopped while locating the current week", source.name);
                        return Ok(SyncReport::cancelled_before_start(source));
                    }
                }
            }
        };

        let window = work_window(target, source.lookahead);
        info!(
            "[{}] Syncing weeks {:?} ({} requests)",
            source.name,
            window,
            if source.supports_conditional_fetch() {
                "conditional"
            } else {
                "full"
            }
        );

        let mut report = SyncReport {
            source_id: source.id.clone(),
            target_period: Some(target),
            window: window.clone(),
            periods: Vec::with_capacity(window.len()),
            cancelled: false,
        };

        for (idx, &period) in window.iter().enumerate() {
            if shutdown.is_requested() {
                report.cancelled = true;
                break;
            }

            let outcome = self.sync_period(source, &stores, period).await;
            if let PeriodOutcome::Failed(reason) = &outcome {
                error!("[{}] Week {}: {}", source.name, period, reason);
            }
            report.periods.push((period, outcome));

            if idx + 1 < window.len() {
                let delay = self.settings.pacing.next_delay();
                if !delay.is_zero() {
                    info!("[{}] Waiting {}s before the next week...", source.name, delay.as_secs());
                }
                if !shutdown.sleep(delay).await {
                    report.cancelled = true;
                    break;
                }
            }
        }

        if report.cancelled {
            warn!(
                "[{}] Stopped after {} of {} weeks",
                source.name,
                report.periods.len(),
                window.len()
            );
        }
        Ok(report)
    }

    async fn sync_period(
        &self,
        source: &Source,
        stores: &SourceStores,
        period: u32,
    ) -> PeriodOutcome {
        let feed = self.feed.as_ref();
        let tokens = stores.tokens.as_ref();

        let outcome = match fetch_period(feed, tokens, source, period, CacheUse::CONDITIONAL).await {
            Ok(o) => o,
            Err(e) => return PeriodOutcome::Failed(format!("download failed: {}", e)),
        };

        match outcome {
            FetchOutcome::Fresh { payload, .. } => {
                match self.store_and_merge(source, stores, period, &payload) {
                    Ok(changed) => PeriodOutcome::Updated {
                        consolidated_changed: changed,
                    },
                    Err(reason) => PeriodOutcome::Failed(reason),
                }
            }
            FetchOutcome::NotModified if stores.snapshots.exists(period) => {
                info!("[{}] Week {}: not modified", source.name, period);
                PeriodOutcome::Unchanged
            }
            FetchOutcome::NotModified => {
                warn!(
                    "[{}] Week {}: not modified but no local snapshot; forcing a full download",
                    source.name, period
                );
                let mode = match self.settings.recovery_tokens {
                    RecoveryTokenPolicy::Keep => CacheUse::UNCONDITIONAL_COLD,
                    RecoveryTokenPolicy::Refresh => CacheUse::UNCONDITIONAL_WARM,
                };
                match fetch_period(feed, tokens, source, period, mode).await {
                    Ok(FetchOutcome::Fresh { payload, .. }) => {
                        match self.store_and_merge(source, stores, period, &payload) {
                            Ok(changed) => PeriodOutcome::Recovered {
                                consolidated_changed: changed,
                            },
                            Err(reason) => PeriodOutcome::Failed(reason),
                        }
                    }
                    Ok(FetchOutcome::NotModified) => {
                        PeriodOutcome::Failed("forced download answered 304".to_string())
                    }
                    Err(e) => PeriodOutcome::Failed(format!("forced download failed: {}", e)),
                }
            }
        }
    }

    /// Save the snapshot and fold it into the consolidated document. Returns
    /// whether the document changed.
    fn store_and_merge(
        &self,
        source: &Source,
        stores: &SourceStores,
        period: u32,
        payload: &Value,
    ) -> Result<bool, String> {
        let path = stores
            .snapshots
            .save(period, payload)
            .map_err(|e| format!("saving snapshot failed: {:#}", e))?;
        info!("[{}] Week {} saved: {}", source.name, period, path.display());

        let merged =
            merge_source(source, &stores.snapshots).map_err(|e| format!("merge failed: {:#}", e))?;
        debug!("[{}] Consolidated document holds {} weeks", source.name, merged.document.len());
        Ok(merged.changed)
    }
}
