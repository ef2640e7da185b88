use chrono_tz::Tz;
use std::path::{Path, PathBuf};

/// Number of rounds in a league season.
pub const SEASON_LENGTH: u32 = 38;

/// Payload shape and timestamp convention of a remote fixture feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedFormat {
    /// `{ "matches": [...] }` with RFC 3339 UTC kickoffs, keyed requests and
    /// `Last-Modified` support.
    UtcMatches,
    /// `{ "data": [...] }` with naive `YYYY-MM-DD HH:MM:SS` kickoffs in the
    /// feed's own time zone. Public, no conditional requests.
    LocalKickoffs,
}

impl FeedFormat {
    /// Field that wraps the fixture list when the payload is an object.
    pub fn list_field(&self) -> &'static str {
        match self {
            FeedFormat::UtcMatches => "matches",
            FeedFormat::LocalKickoffs => "data",
        }
    }

    pub fn requires_subscription_key(&self) -> bool {
        matches!(self, FeedFormat::UtcMatches)
    }
}

/// Language used for request content and weekday labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Locale {
    Es,
    En,
}

impl Locale {
    pub fn parse(code: &str) -> Option<Self> {
        match code.to_lowercase().as_str() {
            "es" => Some(Locale::Es),
            "en" => Some(Locale::En),
            _ => None,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            Locale::Es => "es",
            Locale::En => "en",
        }
    }

    /// Three-letter weekday labels, Monday first.
    pub fn weekday_labels(&self) -> [&'static str; 7] {
        match self {
            Locale::Es => ["Lun", "Mar", "Mié", "Jue", "Vie", "Sáb", "Dom"],
            Locale::En => ["Mon", "Tue", "Wed", "Thu", "Fri", "Sat", "Sun"],
        }
    }
}

/// A remote league feed and where its local state lives.
#[derive(Debug, Clone)]
pub struct Source {
    /// Short key used for directories and CLI overrides ("laliga")
    pub id: String,
    /// Human-readable name for logging ("LaLiga")
    pub name: String,
    /// Week endpoint; `None` when the feed is not configured
    pub endpoint: Option<String>,
    pub format: FeedFormat,
    pub snapshot_dir: PathBuf,
    /// Last-Modified token directory; `None` disables conditional fetch
    pub token_dir: Option<PathBuf>,
    pub consolidated_path: PathBuf,
    /// Periods fetched after the current one
    pub lookahead: u32,
    /// Locator tolerance around "now", in days
    pub tolerance_days: i64,
    /// Zone of naive kickoffs in `LocalKickoffs` payloads
    pub feed_tz: Tz,
    /// Zone rows are rendered in
    pub display_tz: Tz,
    pub locale: Locale,
}

impl Source {
    /// First division feed: UTC timestamps, keyed, conditional fetch.
    pub fn laliga(endpoint: Option<String>, data_dir: &Path, locale: Locale) -> Self {
        Self::utc_matches("laliga", "LaLiga", endpoint, data_dir, locale)
    }

    /// Second division feed, same API as [`Source::laliga`].
    pub fn laliga2(endpoint: Option<String>, data_dir: &Path, locale: Locale) -> Self {
        Self::utc_matches("laliga2", "LaLiga2", endpoint, data_dir, locale)
    }

    /// English top flight: public feed with London-local kickoffs.
    pub fn premier_league(endpoint: Option<String>, data_dir: &Path, locale: Locale) -> Self {
        let root = data_dir.join("premier_league");
        Source {
            id: "premier_league".to_string(),
            name: "Premier League".to_string(),
            endpoint: non_empty(endpoint),
            format: FeedFormat::LocalKickoffs,
            snapshot_dir: root.join("json"),
            token_dir: None,
            consolidated_path: root.join("matches_premier_league.json"),
            lookahead: 4,
            tolerance_days: 5,
            feed_tz: chrono_tz::Europe::London,
            display_tz: chrono_tz::Europe::Madrid,
            locale,
        }
    }

    fn utc_matches(
        id: &str,
        name: &str,
        endpoint: Option<String>,
        data_dir: &Path,
        locale: Locale,
    ) -> Self {
        let root = data_dir.join(id);
        Source {
            id: id.to_string(),
            name: name.to_string(),
            endpoint: non_empty(endpoint),
            format: FeedFormat::UtcMatches,
            snapshot_dir: root.join("json"),
            token_dir: Some(root.join("meta")),
            consolidated_path: root.join(format!("matches_{}.json", id)),
            lookahead: 3,
            tolerance_days: 4,
            feed_tz: chrono_tz::UTC,
            display_tz: chrono_tz::Europe::Madrid,
            locale,
        }
    }

    pub fn supports_conditional_fetch(&self) -> bool {
        self.token_dir.is_some()
    }

    /// Request URL for one period, or `None` when no endpoint is configured.
    ///
    /// A template containing `{week}` is substituted in place; a bare base URL
    /// gets the `/week/{n}/matches` route appended.
    pub fn week_url(&self, period: u32) -> Option<String> {
        let endpoint = self.endpoint.as_deref()?;
        if endpoint.contains("{week}") {
            Some(endpoint.replace("{week}", &period.to_string()))
        } else {
            Some(format!(
                "{}/week/{}/matches",
                endpoint.trim_end_matches('/'),
                period
            ))
        }
    }
}

fn non_empty(endpoint: Option<String>) -> Option<String> {
    endpoint.filter(|e| !e.trim().is_empty())
}
