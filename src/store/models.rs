use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Kickoff as reported by the feed
#[derive(Debug, Clone, PartialEq)]
pub enum Kickoff {
    Missing,
    /// Raw value that could not be read as a timestamp
    Unparseable(String),
    At {
        instant: DateTime<Utc>,
        /// Placeholder time published before the kickoff slot is fixed
        unscheduled: bool,
    },
}

impl Kickoff {
    pub fn instant(&self) -> Option<DateTime<Utc>> {
        match self {
            Kickoff::At { instant, .. } => Some(*instant),
            _ => None,
        }
    }
}

/// One match inside a week snapshot, decoded from either feed format
#[derive(Debug, Clone, PartialEq)]
pub struct Fixture {
    pub home_team: String,
    pub away_team: String,
    pub kickoff: Kickoff,
    /// e.g. "PreMatch", "Live", "FullTime"
    pub status: Option<String>,
    pub home_score: Option<i64>,
    pub away_score: Option<i64>,
}

impl Fixture {
    pub fn is_full_time(&self) -> bool {
        self.status.as_deref() == Some("FullTime")
    }
}

/// Display row stored in the consolidated document.
///
/// Field names on disk are the ones the published front end reads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FixtureRow {
    #[serde(rename = "Jornada")]
    pub period: u32,
    /// "Sáb 16-08-2025"
    #[serde(rename = "Fecha")]
    pub date: String,
    /// "21:30" or "--:--"
    #[serde(rename = "Horario")]
    pub time: String,
    #[serde(rename = "Local")]
    pub home: String,
    /// "2 - 1" or "VS"
    #[serde(rename = "Resultado")]
    pub result: String,
    #[serde(rename = "Visitante")]
    pub away: String,
}

/// period → rows, serialized with stringified period keys in numeric order
pub type ConsolidatedDocument = BTreeMap<u32, Vec<FixtureRow>>;
