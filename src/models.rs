//! Record types for the incident and call pipelines.

use std::fmt;

use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime, Timelike};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

// ---

/// Incidents in or before this year are dropped when the table is cleaned.
pub const RECENT_YEAR_CUTOFF: i32 = 2020;

/// Timestamp layouts tried in order until one parses.
const DATETIME_FORMATS: &[&str] = &[
    "%m/%d/%Y %I:%M:%S %p",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
    "%Y %b %d %I:%M:%S %p",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S",
];

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%m/%d/%Y"];

/// Best-effort timestamp parser. Unrecognized input yields `None`.
///
/// Values carrying a UTC offset keep their local wall-clock time.
pub fn parse_timestamp(s: &str) -> Option<NaiveDateTime> {
    // ---
    let s = s.trim();
    if s.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.naive_local());
    }
    for fmt in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(dt);
        }
    }
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(s, fmt).ok())
        .and_then(|d| d.and_hms_opt(0, 0, 0))
}

/// One row of the SPD crime CSV, as read from disk.
#[derive(Debug, Deserialize)]
pub struct RawIncidentRow {
    // ---
    #[serde(rename = "Offense Start DateTime", default)]
    pub offense_start: Option<String>,
    #[serde(rename = "Precinct", default)]
    pub precinct: Option<String>,
    #[serde(rename = "Crime Against Category", default)]
    pub crime_against_category: Option<String>,
    #[serde(rename = "Latitude", default, deserialize_with = "csv::invalid_option")]
    pub latitude: Option<f64>,
    #[serde(rename = "Longitude", default, deserialize_with = "csv::invalid_option")]
    pub longitude: Option<f64>,
}

/// Cleaned incident, coordinates under the lowercase names map consumers expect.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IncidentRecord {
    // ---
    pub offense_start: NaiveDateTime,
    pub year: i32,
    pub precinct: Option<String>,
    pub crime_against_category: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

impl RawIncidentRow {
    // ---
    /// Parse the timestamp and derive the year. `None` when the timestamp
    /// is missing or unparseable.
    pub fn to_record(&self) -> Option<IncidentRecord> {
        // ---
        let offense_start = self.offense_start.as_deref().and_then(parse_timestamp)?;

        Some(IncidentRecord {
            offense_start,
            year: offense_start.year(),
            precinct: non_empty(self.precinct.as_deref()),
            crime_against_category: non_empty(self.crime_against_category.as_deref()),
            latitude: self.latitude,
            longitude: self.longitude,
        })
    }
}

fn non_empty(s: Option<&str>) -> Option<String> {
    s.map(str::trim).filter(|s| !s.is_empty()).map(String::from)
}

/// Half of the day a call falls in, split at noon.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum DayPeriod {
    #[serde(rename = "AM")]
    Am,
    #[serde(rename = "PM")]
    Pm,
    /// The call's timestamp could not be parsed.
    Unknown,
}

impl DayPeriod {
    // ---
    pub fn from_hour(hour: Option<u32>) -> Self {
        match hour {
            Some(h) if h < 12 => DayPeriod::Am,
            Some(_) => DayPeriod::Pm,
            None => DayPeriod::Unknown,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            DayPeriod::Am => "AM",
            DayPeriod::Pm => "PM",
            DayPeriod::Unknown => "Unknown",
        }
    }
}

impl fmt::Display for DayPeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A 911 call with the time fields derived from its timestamp.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CallRecord {
    // ---
    pub timestamp: Option<NaiveDateTime>,
    pub hour: Option<u32>,
    pub month: Option<u32>,
    pub year: Option<i32>,
    pub day_period: DayPeriod,
    pub precinct: Option<String>,
    pub priority: Option<String>,
}

impl CallRecord {
    // ---
    /// Build a call from one API object, reading the time from `timestamp_key`.
    pub fn from_json(object: &Map<String, Value>, timestamp_key: &str) -> Self {
        // ---
        let timestamp = object
            .get(timestamp_key)
            .and_then(Value::as_str)
            .and_then(parse_timestamp);
        let hour = timestamp.map(|t| t.hour());

        CallRecord {
            timestamp,
            hour,
            month: timestamp.map(|t| t.month()),
            year: timestamp.map(|t| t.year()),
            day_period: DayPeriod::from_hour(hour),
            precinct: object.get("precinct").and_then(value_text),
            priority: object.get("priority").and_then(value_text),
        }
    }
}

/// Textual form of a scalar JSON value; `None` for null, blank or nested values.
fn value_text(value: &Value) -> Option<String> {
    // ---
    match value {
        Value::String(s) => non_empty(Some(s.as_str())),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}
