pub mod client;
pub mod parse;
pub mod provider;
pub mod source;

pub use client::{ClientSettings, FeedClient};
pub use parse::{normalize_row, parse_fixtures};
pub use provider::{FetchError, FetchOutcome, FixtureFeed};
pub use source::{Locale, Source, SEASON_LENGTH};
