use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use serde::Serialize;
use tracing::info;

use super::AppState;
use crate::{IncidentSummary, Selection};

// ---

pub fn router() -> Router<AppState> {
    // ---
    Router::new()
        .route("/api/incidents/options", get(options))
        .route("/api/incidents/summary", get(summary))
}

/// Distinct values per filter dimension, for seeding selection widgets.
async fn options(State((incidents, _)): State<AppState>) -> Json<Selection> {
    // ---
    info!("GET /api/incidents/options");
    Json(Selection::all(&incidents))
}

#[derive(Debug, Serialize)]
struct SummaryResponse {
    selection: Selection,
    #[serde(flatten)]
    summary: IncidentSummary,
}

/// Counts by precinct and by year and category for the requested selection.
///
/// Accepts repeated `year`, `precinct` and `category` parameters. Years may
/// also be comma separated, e.g. `?year=2021,2022&precinct=North`.
async fn summary(
    Query(pairs): Query<Vec<(String, String)>>,
    State((incidents, _)): State<AppState>,
) -> Json<SummaryResponse> {
    // ---
    let selection = Selection::from_query(&pairs, &incidents);
    let summary = incidents.summarize(&selection);
    info!(
        "GET /api/incidents/summary - {} matching incidents",
        summary.row_count
    );

    Json(SummaryResponse { selection, summary })
}

#[cfg(test)]
mod tests {
    // ---
    use std::sync::Arc;

    use serde_json::Value;

    use crate::test_support::{sample_incidents, serve};
    use crate::{routes, Config};

    fn config() -> Config {
        // ---
        Config {
            crime_data_path: "sample.csv".into(),
            calls_api_url: "http://127.0.0.1:9/unused".into(),
            calls_fetch_limit: 10,
            bind_addr: ([127, 0, 0, 1], 0).into(),
        }
    }

    async fn get_json(path: &str) -> Value {
        // ---
        let base = serve(routes::router(Arc::new(sample_incidents()), config())).await;
        reqwest::get(format!("{base}{path}"))
            .await
            .unwrap()
            .json()
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_options_lists_distinct_values() {
        // ---
        let body = get_json("/api/incidents/options").await;

        assert_eq!(body["years"], serde_json::json!([2021, 2022, 2023]));
        assert_eq!(
            body["precincts"],
            serde_json::json!(["North", "South", "West"])
        );
    }

    #[tokio::test]
    async fn test_summary_applies_year_filter() {
        // ---
        let body = get_json("/api/incidents/summary?year=2022&year=2023").await;

        assert_eq!(body["row_count"], 3);
        assert_eq!(body["selection"]["years"], serde_json::json!([2022, 2023]));
        let precinct_total: u64 = body["by_precinct"]
            .as_array()
            .unwrap()
            .iter()
            .map(|c| c["count"].as_u64().unwrap())
            .sum();
        assert_eq!(precinct_total, 3);
    }

    #[tokio::test]
    async fn test_summary_empty_selection_matches_nothing() {
        // ---
        let body = get_json("/api/incidents/summary?precinct=").await;

        assert_eq!(body["row_count"], 0);
        assert_eq!(body["by_precinct"], serde_json::json!([]));
        assert_eq!(body["by_year_category"], serde_json::json!([]));
    }
}
