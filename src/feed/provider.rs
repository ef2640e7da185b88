use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

use super::source::Source;

/// Result of a single week request.
#[derive(Debug, Clone, PartialEq)]
pub enum FetchOutcome {
    /// Body of a 2xx response plus its `Last-Modified` value, if any.
    Fresh {
        payload: Value,
        token: Option<String>,
    },
    /// 304 in answer to a conditional request; there is no body.
    NotModified,
}

/// Why a week request failed. None of these are fatal to a run: callers log
/// and move on to the next week, except for the configuration variants which
/// skip the whole source.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    #[error("subscription key is not configured")]
    MissingCredentials,
    #[error("week endpoint is not configured")]
    MissingEndpoint,
    #[error("unexpected HTTP status {0}")]
    Http(u16),
    #[error("request failed: {0}")]
    Network(String),
    #[error("invalid payload: {0}")]
    Decode(String),
}

/// Anything that can serve week payloads for a [`Source`].
#[async_trait]
pub trait FixtureFeed: Send + Sync {
    /// Check that the source can be requested at all.
    fn preflight(&self, source: &Source) -> Result<(), FetchError>;

    /// Request one week. `validator` is the cached `Last-Modified` value;
    /// when it is `None` the request is unconditional.
    async fn fetch_week(
        &self,
        source: &Source,
        period: u32,
        validator: Option<&str>,
    ) -> Result<FetchOutcome, FetchError>;
}
