use axum::{
    extract::State, http::StatusCode, response::IntoResponse, routing::get, Json, Router,
};
use tracing::info;

use super::AppState;
use crate::{load_calls, CallsReport};

// ---

pub fn router() -> Router<AppState> {
    // ---
    Router::new().route("/api/calls/summary", get(handler))
}

/// Fetch the Call Data API and return the three fixed aggregations.
///
/// A failed fetch answers `502 Bad Gateway` with the user-facing message.
async fn handler(State((_, config)): State<AppState>) -> impl IntoResponse {
    // ---
    info!("GET /api/calls/summary - fetching {}", config.calls_api_url);

    let report = load_calls(&config.calls_api_url, config.calls_fetch_limit).await;
    let status = match report {
        CallsReport::Available(_) => StatusCode::OK,
        CallsReport::Unavailable { .. } => StatusCode::BAD_GATEWAY,
    };
    (status, Json(report))
}

#[cfg(test)]
mod tests {
    // ---
    use std::sync::Arc;

    use axum::{routing::get, Json, Router};
    use reqwest::StatusCode;
    use serde_json::{json, Value};

    use crate::test_support::{serve, sample_incidents};
    use crate::{routes, Config, IncidentTable};

    async fn dashboard_with_upstream(upstream: Router) -> String {
        // ---
        let api = format!("{}/resource/calls.json", serve(upstream).await);
        let config = Config {
            crime_data_path: "sample.csv".into(),
            calls_api_url: api,
            calls_fetch_limit: 100,
            bind_addr: ([127, 0, 0, 1], 0).into(),
        };
        let incidents: Arc<IncidentTable> = Arc::new(sample_incidents());
        serve(routes::router(incidents, config)).await
    }

    #[tokio::test]
    async fn test_calls_summary_ok() {
        // ---
        let upstream = Router::new().route(
            "/resource/calls.json",
            get(|| async {
                Json(json!([
                    { "event_clearance_date": "2023-03-01T08:00:00.000", "precinct": "EAST", "priority": "1" },
                    { "event_clearance_date": "2023-03-01T20:00:00.000", "precinct": "WEST", "priority": "2" }
                ]))
            }),
        );
        let base = dashboard_with_upstream(upstream).await;

        let response = reqwest::get(format!("{base}/api/calls/summary")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body: Value = response.json().await.unwrap();
        assert_eq!(body["status"], "available");
        assert_eq!(body["record_count"], 2);
        assert_eq!(body["by_month_period"]["columns"], json!(["AM", "PM"]));
        assert_eq!(body["by_month_period"]["counts"][2], json!([1, 1]));
        assert_eq!(body["by_year"], json!([{ "year": 2023, "count": 2 }]));
    }

    #[tokio::test]
    async fn test_calls_summary_upstream_failure_is_bad_gateway() {
        // ---
        let base = dashboard_with_upstream(Router::new()).await;

        let response = reqwest::get(format!("{base}/api/calls/summary")).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);

        let body: Value = response.json().await.unwrap();
        assert_eq!(body["status"], "unavailable");
        assert_eq!(body["error"], "Failed to fetch data: 404");
    }
}
