use axum::{
    extract::{Query, State},
    response::Html,
    routing::get,
    Router,
};
use tracing::{debug, info};

use super::AppState;
use crate::{load_calls, render, Selection};

// ---

pub fn router() -> Router<AppState> {
    // ---
    Router::new().route("/", get(handler))
}

/// Render the whole dashboard for one page load.
///
/// Filters and aggregates the incident table for the submitted selection,
/// then fetches and aggregates the call data. Nothing is kept between loads.
async fn handler(
    Query(pairs): Query<Vec<(String, String)>>,
    State((incidents, config)): State<AppState>,
) -> Html<String> {
    // ---
    info!("GET / - Rendering dashboard");

    let selection = Selection::from_query(&pairs, &incidents);
    debug!("GET / - Selection {:?}", selection);

    let summary = incidents.summarize(&selection);
    let calls = load_calls(&config.calls_api_url, config.calls_fetch_limit).await;

    debug!("GET / - Returning OK");
    Html(render::dashboard_page(
        incidents.options(),
        &selection,
        &summary,
        &calls,
    ))
}
