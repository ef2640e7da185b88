//! In-memory feed and scratch sources for engine tests.

use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Mutex;
use tempfile::TempDir;

use crate::feed::{FetchError, FetchOutcome, FixtureFeed, Locale, Source};

#[derive(Debug, Clone, Default)]
struct WeekScript {
    payload: Value,
    token: Option<String>,
    /// Extra validator answered with 304 besides `token`
    stale_validator: Option<String>,
    error: Option<FetchError>,
}

/// A feed that answers from a fixed script and records every request.
///
/// A request whose validator equals the week's current token (or its
/// configured stale validator) gets `NotModified`; unknown weeks get a 404.
#[derive(Default)]
pub struct ScriptedFeed {
    weeks: HashMap<u32, WeekScript>,
    preflight_error: Option<FetchError>,
    calls: Mutex<Vec<(u32, Option<String>)>>,
}

impl ScriptedFeed {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_week(mut self, period: u32, payload: Value, token: Option<&str>) -> Self {
        let week = self.weeks.entry(period).or_default();
        week.payload = payload;
        week.token = token.map(str::to_string);
        self
    }

    pub fn not_modified_for(mut self, period: u32, validator: &str) -> Self {
        self.weeks.entry(period).or_default().stale_validator = Some(validator.to_string());
        self
    }

    pub fn failing(mut self, period: u32, error: FetchError) -> Self {
        self.weeks.entry(period).or_default().error = Some(error);
        self
    }

    pub fn misconfigured(mut self, error: FetchError) -> Self {
        self.preflight_error = Some(error);
        self
    }

    pub fn calls(&self) -> Vec<(u32, Option<String>)> {
        self.calls.lock().unwrap().clone()
    }

    pub fn requested_periods(&self) -> Vec<u32> {
        self.calls().into_iter().map(|(p, _)| p).collect()
    }
}

#[async_trait]
impl FixtureFeed for ScriptedFeed {
    fn preflight(&self, _source: &Source) -> Result<(), FetchError> {
        match &self.preflight_error {
            Some(e) => Err(e.clone()),
            None => Ok(()),
        }
    }

    async fn fetch_week(
        &self,
        _source: &Source,
        period: u32,
        validator: Option<&str>,
    ) -> Result<FetchOutcome, FetchError> {
        self.calls
            .lock()
            .unwrap()
            .push((period, validator.map(str::to_string)));

        let week = self.weeks.get(&period).ok_or(FetchError::Http(404))?;
        if let Some(e) = &week.error {
            return Err(e.clone());
        }
        if let Some(v) = validator {
            if week.token.as_deref() == Some(v) || week.stale_validator.as_deref() == Some(v) {
                return Ok(FetchOutcome::NotModified);
            }
        }
        Ok(FetchOutcome::Fresh {
            payload: week.payload.clone(),
            token: week.token.clone(),
        })
    }
}

/// A `UtcMatches` payload with one scheduled fixture per kickoff.
pub fn fixtures_at(kickoffs: &[&str]) -> Value {
    let matches: Vec<Value> = kickoffs
        .iter()
        .enumerate()
        .map(|(i, date)| {
            json!({
                "date": date,
                "status": "PreMatch",
                "home_team": { "nickname": format!("Home {}", i + 1) },
                "away_team": { "nickname": format!("Away {}", i + 1) },
            })
        })
        .collect();
    json!({ "matches": matches })
}

/// A conditional-fetch source whose state lives in a fresh temp directory.
pub fn scratch_source() -> (TempDir, Source) {
    let dir = tempfile::tempdir().unwrap();
    let source = Source::laliga(
        Some("https://feed.test/v1".to_string()),
        dir.path(),
        Locale::Es,
    );
    (dir, source)
}
