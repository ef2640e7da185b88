use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;

use crate::feed::{ClientSettings, Locale, Source, SEASON_LENGTH};
use crate::sync::{Pacing, RecoveryTokenPolicy, SyncSettings};

/// Week-by-week fixture synchronizer for football league feeds
#[derive(Parser, Debug, Clone)]
#[command(name = "fixture-sync", version, about)]
pub struct Config {
    /// Subscription key for the keyed league API
    #[arg(long, env = "SUBSCRIPTION_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// LaLiga week endpoint (base URL or template with `{week}`)
    #[arg(long, env = "BASE_WEEK_URL_1")]
    pub laliga_url: Option<String>,

    /// LaLiga2 week endpoint (base URL or template with `{week}`)
    #[arg(long, env = "BASE_WEEK_URL_2")]
    pub laliga2_url: Option<String>,

    /// Premier League week endpoint (template with `{week}`)
    #[arg(long, env = "BASE_WEEK_URL_PREM")]
    pub premier_url: Option<String>,

    /// Root directory for snapshots, cache tokens and consolidated documents
    #[arg(long, env = "DATA_DIR", default_value = "football/data")]
    pub data_dir: PathBuf,

    /// Force the current week of a source, e.g. `--week laliga=7` (repeatable)
    #[arg(long = "week", value_name = "SOURCE=WEEK", value_parser = parse_forced_week)]
    pub forced_weeks: Vec<(String, u32)>,

    /// Only sync these sources (repeatable; default: all)
    #[arg(long = "only", value_name = "SOURCE")]
    pub only: Vec<String>,

    /// Do not wait between weeks (useful for local testing)
    #[arg(long)]
    pub no_sleep: bool,

    /// Minimum wait between weeks in seconds
    #[arg(long, env = "PACE_MIN_SECS", default_value = "35")]
    pub pace_min_secs: u64,

    /// Maximum wait between weeks in seconds
    #[arg(long, env = "PACE_MAX_SECS", default_value = "50")]
    pub pace_max_secs: u64,

    /// HTTP request timeout in seconds
    #[arg(long, env = "REQUEST_TIMEOUT_SECS", default_value = "30")]
    pub timeout_secs: u64,

    /// Content language sent to the API and used for weekday labels
    #[arg(long, env = "CONTENT_LANGUAGE", default_value = "es")]
    pub content_language: String,

    /// Country code sent to the API
    #[arg(long, env = "COUNTRY_CODE", default_value = "ES")]
    pub country_code: String,

    /// Store the Last-Modified of the forced re-download of a week that was
    /// reported unmodified but is missing locally
    #[arg(long)]
    pub refresh_token_on_recovery: bool,

    /// Sync all sources concurrently instead of one after another
    #[arg(long)]
    pub parallel: bool,
}

pub const SOURCE_IDS: [&str; 3] = ["laliga", "laliga2", "premier_league"];

fn parse_forced_week(raw: &str) -> Result<(String, u32), String> {
    let (id, week) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected SOURCE=WEEK, got '{}'", raw))?;
    let week: u32 = week
        .trim()
        .parse()
        .map_err(|_| format!("invalid week number '{}'", week))?;
    Ok((id.trim().to_lowercase(), week))
}

impl Config {
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.pace_min_secs > self.pace_max_secs {
            anyhow::bail!("pace_min_secs must not exceed pace_max_secs");
        }
        if self.timeout_secs == 0 {
            anyhow::bail!("timeout_secs must be positive");
        }
        if Locale::parse(&self.content_language).is_none() {
            anyhow::bail!(
                "unsupported content language '{}' (expected es or en)",
                self.content_language
            );
        }
        for (id, week) in &self.forced_weeks {
            if !SOURCE_IDS.contains(&id.as_str()) {
                anyhow::bail!("unknown source '{}' in --week (known: {:?})", id, SOURCE_IDS);
            }
            if !(1..=SEASON_LENGTH).contains(week) {
                anyhow::bail!("week for '{}' must be between 1 and {}", id, SEASON_LENGTH);
            }
        }
        for id in &self.only {
            if !SOURCE_IDS.contains(&id.as_str()) {
                anyhow::bail!("unknown source '{}' in --only (known: {:?})", id, SOURCE_IDS);
            }
        }
        Ok(())
    }

    pub fn locale(&self) -> Locale {
        Locale::parse(&self.content_language).unwrap_or(Locale::Es)
    }

    pub fn client_settings(&self) -> ClientSettings {
        ClientSettings {
            api_key: self.api_key.clone(),
            content_language: self.locale(),
            country_code: self.country_code.clone(),
            timeout: Duration::from_secs(self.timeout_secs),
        }
    }

    pub fn pacing(&self) -> Pacing {
        if self.no_sleep {
            Pacing::disabled()
        } else {
            Pacing::new(
                Duration::from_secs(self.pace_min_secs),
                Duration::from_secs(self.pace_max_secs),
            )
        }
    }

    pub fn sync_settings(&self) -> SyncSettings {
        SyncSettings {
            pacing: self.pacing(),
            recovery_tokens: if self.refresh_token_on_recovery {
                RecoveryTokenPolicy::Refresh
            } else {
                RecoveryTokenPolicy::Keep
            },
        }
    }

    /// Last `--week` given for this source.
    pub fn forced_week(&self, source_id: &str) -> Option<u32> {
        self.forced_weeks
            .iter()
            .rev()
            .find(|(id, _)| id == source_id)
            .map(|(_, week)| *week)
    }

    /// Sources to sync, in processing order.
    pub fn sources(&self) -> Vec<Source> {
        let locale = self.locale();
        let all = vec![
            Source::laliga(self.laliga_url.clone(), &self.data_dir, locale),
            Source::laliga2(self.laliga2_url.clone(), &self.data_dir, locale),
            Source::premier_league(self.premier_url.clone(), &self.data_dir, locale),
        ];
        all.into_iter()
            .filter(|s| self.only.is_empty() || self.only.contains(&s.id))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Config {
        let mut argv = vec!["fixture-sync"];
        argv.extend_from_slice(args);
        Config::try_parse_from(argv).unwrap()
    }

    #[test]
    fn test_defaults() {
        let cfg = parse(&["--data-dir", "out"]);
        cfg.validate().unwrap();
        assert_eq!(cfg.pacing(), Pacing::default());
        assert_eq!(cfg.client_settings().timeout, Duration::from_secs(30));
        assert_eq!(cfg.sync_settings().recovery_tokens, RecoveryTokenPolicy::Keep);
        assert_eq!(cfg.sources().len(), 3);
    }

    #[test]
    fn test_forced_weeks_and_only() {
        let cfg = parse(&[
            "--week",
            "laliga=7",
            "--week",
            "Premier_League=38",
            "--week",
            "laliga=8",
            "--only",
            "laliga",
            "--no-sleep",
        ]);
        cfg.validate().unwrap();
        assert_eq!(cfg.forced_week("laliga"), Some(8));
        assert_eq!(cfg.forced_week("premier_league"), Some(38));
        assert_eq!(cfg.forced_week("laliga2"), None);
        assert!(cfg.pacing().is_disabled());

        let sources = cfg.sources();
        assert_eq!(sources.len(), 1);
        assert_eq!(sources[0].id, "laliga");
    }

    #[test]
    fn test_rejects_bad_arguments() {
        assert!(Config::try_parse_from(["fixture-sync", "--week", "laliga"]).is_err());
        assert!(Config::try_parse_from(["fixture-sync", "--week", "laliga=x"]).is_err());

        assert!(parse(&["--week", "laliga=0"]).validate().is_err());
        assert!(parse(&["--week", "bundesliga=3"]).validate().is_err());
        assert!(parse(&["--pace-min-secs", "60"]).validate().is_err());
        assert!(parse(&["--content-language", "fr"]).validate().is_err());
    }
}
