use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::header::{IF_MODIFIED_SINCE, LAST_MODIFIED};
use reqwest::{Client, StatusCode};
use std::time::Duration;
use tracing::debug;

use super::provider::{FetchError, FetchOutcome, FixtureFeed};
use super::source::{Locale, Source};

/// Request parameters shared by every source.
#[derive(Debug, Clone)]
pub struct ClientSettings {
    pub api_key: Option<String>,
    pub content_language: Locale,
    /// e.g. "ES"
    pub country_code: String,
    pub timeout: Duration,
}

/// HTTP client for the week endpoints of every configured league.
#[derive(Clone)]
pub struct FeedClient {
    http: Client,
    settings: ClientSettings,
}

impl FeedClient {
    pub fn new(settings: ClientSettings) -> Result<Self> {
        let http = Client::builder()
            .timeout(settings.timeout)
            .build()
            .context("Failed to build HTTP client")?;
        Ok(FeedClient { http, settings })
    }

    fn api_key(&self) -> Option<&str> {
        self.settings.api_key.as_deref().filter(|k| !k.is_empty())
    }
}

#[async_trait]
impl FixtureFeed for FeedClient {
    fn preflight(&self, source: &Source) -> Result<(), FetchError> {
        let url = source.week_url(1).ok_or(FetchError::MissingEndpoint)?;
        if url::Url::parse(&url).is_err() {
            return Err(FetchError::MissingEndpoint);
        }
        if source.format.requires_subscription_key() && self.api_key().is_none() {
            return Err(FetchError::MissingCredentials);
        }
        Ok(())
    }

    async fn fetch_week(
        &self,
        source: &Source,
        period: u32,
        validator: Option<&str>,
    ) -> Result<FetchOutcome, FetchError> {
        self.preflight(source)?;
        let url = source.week_url(period).ok_or(FetchError::MissingEndpoint)?;

        let mut req = self.http.get(&url);
        if source.format.requires_subscription_key() {
            let key = self.api_key().ok_or(FetchError::MissingCredentials)?;
            req = req.query(&[
                ("contentLanguage", self.settings.content_language.code()),
                ("countryCode", self.settings.country_code.as_str()),
                ("subscription-key", key),
            ]);
        }
        if let Some(since) = validator {
            req = req.header(IF_MODIFIED_SINCE, since);
        }

        debug!("[{}] GET week {} (conditional={})", source.name, period, validator.is_some());

        // The URL carries the subscription key; keep it out of error text.
        let resp = req
            .send()
            .await
            .map_err(|e| FetchError::Network(e.without_url().to_string()))?;

        let status = resp.status();
        if status == StatusCode::NOT_MODIFIED {
            // Only a precondition we sent ourselves makes a 304 a cache hit.
            return if validator.is_some() {
                Ok(FetchOutcome::NotModified)
            } else {
                Err(FetchError::Http(status.as_u16()))
            };
        }
        if !status.is_success() {
            return Err(FetchError::Http(status.as_u16()));
        }

        let token = resp
            .headers()
            .get(LAST_MODIFIED)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty());

        let payload: serde_json::Value = resp
            .json()
            .await
            .map_err(|e| FetchError::Decode(e.without_url().to_string()))?;

        Ok(FetchOutcome::Fresh { payload, token })
    }
}
