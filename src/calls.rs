//! Remote 911 call pipeline.
//!
//! Every dashboard load issues one GET against the Seattle Call Data API,
//! resolves which timestamp column the response carries, derives the time
//! fields for each call and counts them three fixed ways. Nothing is cached.
//! Failures are reported to the caller as [`FetchError`] and never abort the
//! service.

use std::collections::BTreeSet;

use serde::Serialize;
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::{debug, error, info};

use crate::aggregate::{count_by, CountGrid};
use crate::models::{CallRecord, DayPeriod};

// ---

/// `$limit` sent when the caller does not pass one.
pub const DEFAULT_FETCH_LIMIT: u32 = 10_000;

/// `$where` clause excluding calls whose blurred location is the `-1` sentinel.
pub const VALID_LOCATION_FILTER: &str = "blurred_longitude != '-1' AND blurred_latitude != '-1'";

/// Candidate timestamp columns, in the order they are preferred.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimestampField {
    EventClearanceDate,
    OriginalTimeQueued,
}

impl TimestampField {
    // ---
    pub const RESOLUTION_ORDER: [TimestampField; 2] = [
        TimestampField::EventClearanceDate,
        TimestampField::OriginalTimeQueued,
    ];

    pub fn key(self) -> &'static str {
        match self {
            TimestampField::EventClearanceDate => "event_clearance_date",
            TimestampField::OriginalTimeQueued => "original_time_queued",
        }
    }

    /// First candidate present in `columns`.
    pub fn resolve(columns: &BTreeSet<&str>) -> Option<Self> {
        Self::RESOLUTION_ORDER
            .into_iter()
            .find(|f| columns.contains(f.key()))
    }
}

/// Why no call data could be shown for this page load.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Failed to fetch data: {0}")]
    Status(u16),

    #[error("Failed to fetch data: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Unexpected call data response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("No datetime column found in the dataset.")]
    NoDatetimeColumn,

    #[error("No data available.")]
    Empty,
}

/// Calls from a single fetch, with derived time fields.
#[derive(Debug, Clone)]
pub struct CallTable {
    pub timestamp_field: TimestampField,
    pub records: Vec<CallRecord>,
}

impl CallTable {
    // ---
    /// Resolve the timestamp column across all objects and derive each call.
    pub fn from_objects(objects: &[Map<String, Value>]) -> Result<Self, FetchError> {
        // ---
        if objects.is_empty() {
            return Err(FetchError::Empty);
        }

        let columns: BTreeSet<&str> = objects
            .iter()
            .flat_map(|o| o.keys().map(String::as_str))
            .collect();
        let timestamp_field =
            TimestampField::resolve(&columns).ok_or(FetchError::NoDatetimeColumn)?;
        debug!("Using '{}' as the call timestamp", timestamp_field.key());

        let records: Vec<CallRecord> = objects
            .iter()
            .map(|o| CallRecord::from_json(o, timestamp_field.key()))
            .collect();

        let unparsed = records.iter().filter(|r| r.timestamp.is_none()).count();
        if unparsed > 0 {
            debug!("{} of {} calls have no usable timestamp", unparsed, records.len());
        }

        Ok(Self {
            timestamp_field,
            records,
        })
    }

    /// The three fixed aggregations over every fetched call.
    pub fn summarize(&self) -> CallSummary {
        // ---
        let by_month_period = CountGrid::with_domains(
            &self.records,
            (1..=12).collect(),
            vec![DayPeriod::Am, DayPeriod::Pm],
            |r| r.month.map(|m| (m, r.day_period)),
        );

        let by_year = count_by(&self.records, |r| r.year)
            .into_iter()
            .map(|(year, count)| YearCount { year, count })
            .collect();

        let by_precinct_priority = CountGrid::observed(&self.records, |r| {
            r.precinct.clone().zip(r.priority.clone())
        });

        CallSummary {
            record_count: self.records.len(),
            timestamp_field: self.timestamp_field.key(),
            by_month_period,
            by_year,
            by_precinct_priority,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct YearCount {
    pub year: i32,
    pub count: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CallSummary {
    pub record_count: usize,
    pub timestamp_field: &'static str,
    /// Months 1 through 12 by AM and PM.
    pub by_month_period: CountGrid<u32, DayPeriod>,
    pub by_year: Vec<YearCount>,
    pub by_precinct_priority: CountGrid<String, String>,
}

/// Outcome of one page load's call fetch, as shown to the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum CallsReport {
    Available(CallSummary),
    Unavailable { error: String },
}

/// Fetch up to `limit` calls with a valid location from `api_url`.
pub async fn fetch_calls(api_url: &str, limit: Option<u32>) -> Result<CallTable, FetchError> {
    // ---
    let client = reqwest::Client::new();
    let limit = limit.unwrap_or(DEFAULT_FETCH_LIMIT).to_string();

    debug!("Fetching calls from {} ($limit={})", api_url, limit);

    let response = client
        .get(api_url)
        .query(&[("$limit", limit.as_str()), ("$where", VALID_LOCATION_FILTER)])
        .send()
        .await?;

    let status = response.status();
    if status != reqwest::StatusCode::OK {
        return Err(FetchError::Status(status.as_u16()));
    }

    let body = response.text().await?;
    let objects: Vec<Map<String, Value>> = serde_json::from_str(&body)?;
    info!("Fetched {} calls from {}", objects.len(), api_url);

    CallTable::from_objects(&objects)
}

/// Fetch and summarize, turning any failure into a user-facing message.
pub async fn load_calls(api_url: &str, limit: u32) -> CallsReport {
    // ---
    match fetch_calls(api_url, Some(limit)).await {
        Ok(table) => CallsReport::Available(table.summarize()),
        Err(e) => {
            error!("Call data unavailable: {}", e);
            CallsReport::Unavailable {
                error: e.to_string(),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;
    use crate::test_support;
    use axum::{extract::Query, http::StatusCode, routing::get, Json, Router};
    use serde_json::json;
    use std::collections::HashMap;

    fn objects(value: Value) -> Vec<Map<String, Value>> {
        serde_json::from_value(value).unwrap()
    }

    async fn serve(router: Router) -> String {
        format!("{}/resource/calls.json", test_support::serve(router).await)
    }

    #[test]
    fn test_resolution_prefers_event_clearance_date() {
        // ---
        let both = BTreeSet::from(["original_time_queued", "event_clearance_date"]);
        let fallback = BTreeSet::from(["original_time_queued", "precinct"]);
        let neither = BTreeSet::from(["precinct"]);

        assert_eq!(
            TimestampField::resolve(&both),
            Some(TimestampField::EventClearanceDate)
        );
        assert_eq!(
            TimestampField::resolve(&fallback),
            Some(TimestampField::OriginalTimeQueued)
        );
        assert_eq!(TimestampField::resolve(&neither), None);
    }

    #[test]
    fn test_columns_are_union_of_all_objects() {
        // ---
        let table = CallTable::from_objects(&objects(json!([
            { "precinct": "NORTH", "priority": "1" },
            { "original_time_queued": "2023-01-01T01:00:00.000", "precinct": "NORTH" }
        ])))
        .unwrap();

        assert_eq!(table.timestamp_field, TimestampField::OriginalTimeQueued);
        assert_eq!(table.records[0].day_period, DayPeriod::Unknown);
        assert_eq!(table.records[1].day_period, DayPeriod::Am);
    }

    #[test]
    fn test_missing_datetime_column_is_reported() {
        // ---
        let err = CallTable::from_objects(&objects(json!([{ "precinct": "EAST" }]))).unwrap_err();

        assert!(matches!(err, FetchError::NoDatetimeColumn));
        assert_eq!(err.to_string(), "No datetime column found in the dataset.");
    }

    #[test]
    fn test_empty_result_is_reported() {
        // ---
        let err = CallTable::from_objects(&[]).unwrap_err();
        assert!(matches!(err, FetchError::Empty));
    }

    #[test]
    fn test_month_grid_is_dense_and_zero_filled() {
        // ---
        let table = CallTable::from_objects(&objects(json!([
            { "event_clearance_date": "2023-03-01T08:00:00.000", "precinct": "EAST", "priority": "1" },
            { "event_clearance_date": "2023-03-02T09:00:00.000", "precinct": "EAST", "priority": "2" },
            { "event_clearance_date": "2024-07-02T21:00:00.000", "precinct": "WEST", "priority": "1" },
            { "event_clearance_date": "not a time", "precinct": "WEST", "priority": "3" }
        ])))
        .unwrap();
        let summary = table.summarize();
        let grid = &summary.by_month_period;

        assert_eq!(grid.rows, (1..=12).collect::<Vec<u32>>());
        assert_eq!(grid.columns, vec![DayPeriod::Am, DayPeriod::Pm]);
        assert_eq!(grid.get(&3, &DayPeriod::Am), Some(2));
        assert_eq!(grid.get(&3, &DayPeriod::Pm), Some(0));
        assert_eq!(grid.get(&7, &DayPeriod::Pm), Some(1));
        assert_eq!(grid.get(&12, &DayPeriod::Am), Some(0));
        assert_eq!(grid.total(), 3);
        assert_eq!(summary.record_count, 4);
    }

    #[test]
    fn test_year_and_precinct_priority_counts() {
        // ---
        let table = CallTable::from_objects(&objects(json!([
            { "event_clearance_date": "2023-03-01T08:00:00.000", "precinct": "EAST", "priority": "1" },
            { "event_clearance_date": "2023-03-02T09:00:00.000", "precinct": "EAST", "priority": "2" },
            { "event_clearance_date": "2024-07-02T21:00:00.000", "precinct": "WEST", "priority": "1" },
            { "event_clearance_date": "2024-07-02T21:00:00.000", "precinct": "WEST" }
        ])))
        .unwrap();
        let summary = table.summarize();

        assert_eq!(
            summary.by_year,
            vec![
                YearCount {
                    year: 2023,
                    count: 2
                },
                YearCount {
                    year: 2024,
                    count: 2
                },
            ]
        );

        let grid = &summary.by_precinct_priority;
        assert_eq!(grid.rows, vec!["EAST".to_string(), "WEST".to_string()]);
        assert_eq!(grid.columns, vec!["1".to_string(), "2".to_string()]);
        assert_eq!(grid.get(&"WEST".to_string(), &"2".to_string()), Some(0));
        assert_eq!(grid.total(), 3);
    }

    #[tokio::test]
    async fn test_fetch_sends_limit_and_location_filter() {
        // ---
        let router = Router::new().route(
            "/resource/calls.json",
            get(|Query(params): Query<HashMap<String, String>>| async move {
                let expected = params.get("$limit").map(String::as_str) == Some("3")
                    && params.get("$where").map(String::as_str) == Some(VALID_LOCATION_FILTER);
                if !expected {
                    return (StatusCode::BAD_REQUEST, Json(json!([])));
                }
                (
                    StatusCode::OK,
                    Json(json!([
                        { "original_time_queued": "2023-05-05T00:30:00.000", "precinct": "SOUTH", "priority": 1 },
                        { "original_time_queued": "2023-05-05T12:30:00.000", "precinct": "SOUTH", "priority": 2 }
                    ])),
                )
            }),
        );
        let url = serve(router).await;

        let table = tokio_test::assert_ok!(fetch_calls(&url, Some(3)).await);

        assert_eq!(table.records.len(), 2);
        assert_eq!(table.records[0].day_period, DayPeriod::Am);
        assert_eq!(table.records[1].day_period, DayPeriod::Pm);
        assert_eq!(table.records[0].priority.as_deref(), Some("1"));
    }

    #[tokio::test]
    async fn test_not_found_is_reported_not_raised() {
        // ---
        let url = serve(Router::new()).await;

        let err = fetch_calls(&url, None).await.unwrap_err();
        assert!(matches!(err, FetchError::Status(404)));

        let report = load_calls(&url, 50_000).await;
        assert_eq!(
            report,
            CallsReport::Unavailable {
                error: "Failed to fetch data: 404".to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_non_array_body_is_decode_error() {
        // ---
        let router = Router::new().route(
            "/resource/calls.json",
            get(|| async { Json(json!({ "error": true })) }),
        );
        let url = serve(router).await;

        let err = fetch_calls(&url, Some(10)).await.unwrap_err();
        assert!(matches!(err, FetchError::Decode(_)));
    }
}
