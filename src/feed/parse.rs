//! Decoding week payloads into [`Fixture`]s and rendering them as display rows.
//!
//! Both feed formats publish the same facts under different field names and
//! timestamp conventions:
//!
//! - `UtcMatches`: `{"matches": [...]}`, RFC 3339 `date`/`time`, team objects
//!   under `home_team`/`homeTeam` with a `nickname`, status in `status` or
//!   `matchStatus`, top-level `home_score`/`homeScore`.
//! - `LocalKickoffs`: `{"data": [...]}`, naive `kickoff` in the feed's zone,
//!   `homeTeam.name`, status in `period`, `homeTeam.score`.
//!
//! Either payload may also be a bare array of fixtures.

use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Timelike, Utc};
use chrono_tz::Tz;
use serde_json::Value;

use super::source::{FeedFormat, Locale, Source};
use crate::store::models::{Fixture, FixtureRow, Kickoff};

/// Time shown when the kickoff slot is not known yet.
pub const UNKNOWN_TIME: &str = "--:--";
/// Result shown for any fixture that is not finished with a final score.
pub const NO_RESULT: &str = "VS";

const LOCAL_KICKOFF_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Fixture entries of a payload, accepting both the wrapped and bare shapes.
pub fn fixture_entries(payload: &Value, format: FeedFormat) -> &[Value] {
    if let Some(list) = payload.get(format.list_field()).and_then(|v| v.as_array()) {
        return list;
    }
    payload.as_array().map(Vec::as_slice).unwrap_or(&[])
}

/// Decode every fixture of a week payload.
pub fn parse_fixtures(payload: &Value, source: &Source) -> Vec<Fixture> {
    fixture_entries(payload, source.format)
        .iter()
        .map(|entry| match source.format {
            FeedFormat::UtcMatches => parse_utc_fixture(entry),
            FeedFormat::LocalKickoffs => parse_local_fixture(entry, source.feed_tz),
        })
        .collect()
}

fn parse_utc_fixture(m: &Value) -> Fixture {
    let kickoff = match non_empty_str(&m["date"]).or_else(|| non_empty_str(&m["time"])) {
        Some(raw) => parse_utc_kickoff(raw),
        None => Kickoff::Missing,
    };

    let home = team_object(m, "home_team", "homeTeam");
    let away = team_object(m, "away_team", "awayTeam");

    let status = non_empty_str(&m["status"])
        .or_else(|| non_empty_str(&m["matchStatus"]))
        .map(str::to_string);

    Fixture {
        home_team: team_label(home),
        away_team: team_label(away),
        kickoff,
        status,
        home_score: integer(m.get("home_score").or_else(|| m.get("homeScore"))),
        away_score: integer(m.get("away_score").or_else(|| m.get("awayScore"))),
    }
}

fn parse_local_fixture(m: &Value, feed_tz: Tz) -> Fixture {
    let kickoff = match non_empty_str(&m["kickoff"]) {
        Some(raw) => parse_local_kickoff(raw, feed_tz),
        None => Kickoff::Missing,
    };

    Fixture {
        home_team: m["homeTeam"]["name"].as_str().unwrap_or_default().to_string(),
        away_team: m["awayTeam"]["name"].as_str().unwrap_or_default().to_string(),
        kickoff,
        status: non_empty_str(&m["period"]).map(str::to_string),
        home_score: integer(m["homeTeam"].get("score")),
        away_score: integer(m["awayTeam"].get("score")),
    }
}

/// RFC 3339 kickoff. A time of exactly 00:00:00 is the feed's placeholder for
/// an unconfirmed slot.
fn parse_utc_kickoff(raw: &str) -> Kickoff {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        let unscheduled = dt.hour() == 0 && dt.minute() == 0 && dt.second() == 0;
        return Kickoff::At {
            instant: dt.with_timezone(&Utc),
            unscheduled,
        };
    }
    // Some entries omit the offset entirely; those are UTC as well.
    if let Ok(naive) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f") {
        return Kickoff::At {
            instant: naive.and_utc(),
            unscheduled: naive.hour() == 0 && naive.minute() == 0 && naive.second() == 0,
        };
    }
    // A bare date has no slot yet
    match NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        Ok(date) => Kickoff::At {
            instant: date.and_time(NaiveTime::MIN).and_utc(),
            unscheduled: true,
        },
        Err(_) => Kickoff::Unparseable(raw.to_string()),
    }
}

fn parse_local_kickoff(raw: &str, feed_tz: Tz) -> Kickoff {
    let naive = match NaiveDateTime::parse_from_str(raw, LOCAL_KICKOFF_FORMAT) {
        Ok(n) => n,
        Err(_) => return Kickoff::Unparseable(raw.to_string()),
    };
    match feed_tz.from_local_datetime(&naive).earliest() {
        Some(local) => Kickoff::At {
            instant: local.with_timezone(&Utc),
            unscheduled: false,
        },
        // Wall-clock time skipped by a DST jump
        None => Kickoff::Unparseable(raw.to_string()),
    }
}

fn team_object<'a>(m: &'a Value, snake: &str, camel: &str) -> &'a Value {
    match m.get(snake) {
        Some(v) if is_truthy(v) => v,
        _ => &m[camel],
    }
}

fn team_label(team: &Value) -> String {
    non_empty_str(&team["nickname"])
        .or_else(|| non_empty_str(&team["name"]))
        .unwrap_or_default()
        .to_string()
}

fn non_empty_str(v: &Value) -> Option<&str> {
    v.as_str().filter(|s| !s.is_empty())
}

fn is_truthy(v: &Value) -> bool {
    match v {
        Value::Null => false,
        Value::String(s) => !s.is_empty(),
        Value::Object(o) => !o.is_empty(),
        _ => true,
    }
}

/// Scores count only when the feed sends a JSON integer.
fn integer(v: Option<&Value>) -> Option<i64> {
    let v = v?;
    if v.is_i64() || v.is_u64() {
        v.as_i64()
    } else {
        None
    }
}

/// Collapse whitespace and shorten Spanish legal-form suffixes:
/// "Real  Betis Balompié SAD" → "Real Betis Balompié",
/// "Getafe Club de Fútbol" → "Getafe CF".
pub fn clean_team_name(name: &str) -> String {
    let tokens: Vec<&str> = name.split_whitespace().collect();
    let mut out: Vec<&str> = Vec::with_capacity(tokens.len());
    let mut i = 0;
    while i < tokens.len() {
        let word = tokens[i].to_lowercase();
        if word == "sad" {
            i += 1;
            continue;
        }
        if word == "club"
            && tokens.get(i + 1).map(|t| t.to_lowercase()).as_deref() == Some("de")
            && tokens.get(i + 2).map(|t| t.to_lowercase()).as_deref() == Some("fútbol")
        {
            out.push("CF");
            i += 3;
            continue;
        }
        if word == "fútbol"
            && tokens.get(i + 1).map(|t| t.to_lowercase()).as_deref() == Some("club")
        {
            out.push("FC");
            i += 2;
            continue;
        }
        out.push(tokens[i]);
        i += 1;
    }
    out.join(" ")
}

/// Render the kickoff as `(date, time)` in the display zone.
pub fn format_kickoff(kickoff: &Kickoff, display_tz: Tz, locale: Locale) -> (String, String) {
    match kickoff {
        Kickoff::Missing => (String::new(), UNKNOWN_TIME.to_string()),
        Kickoff::Unparseable(raw) => {
            let date = raw.split_once('T').map(|(d, _)| d).unwrap_or(raw);
            (date.to_string(), UNKNOWN_TIME.to_string())
        }
        Kickoff::At {
            instant,
            unscheduled,
        } => {
            let local = instant.with_timezone(&display_tz);
            let weekday =
                locale.weekday_labels()[local.weekday().num_days_from_monday() as usize];
            let date = format!("{} {}", weekday, local.format("%d-%m-%Y"));
            let time = if *unscheduled {
                UNKNOWN_TIME.to_string()
            } else {
                local.format("%H:%M").to_string()
            };
            (date, time)
        }
    }
}

/// "h - a" for finished fixtures with integer scores, "VS" otherwise.
pub fn result_label(fixture: &Fixture) -> String {
    if !fixture.is_full_time() {
        return NO_RESULT.to_string();
    }
    match (fixture.home_score, fixture.away_score) {
        (Some(h), Some(a)) => format!("{} - {}", h, a),
        _ => NO_RESULT.to_string(),
    }
}

pub fn normalize_row(period: u32, fixture: &Fixture, source: &Source) -> FixtureRow {
    let (date, time) = format_kickoff(&fixture.kickoff, source.display_tz, source.locale);
    FixtureRow {
        period,
        date,
        time,
        home: clean_team_name(&fixture.home_team),
        result: result_label(fixture),
        away: clean_team_name(&fixture.away_team),
    }
}
