use std::sync::Arc;

use axum::Router;

use crate::{Config, IncidentTable};

mod dashboard;
mod get_calls;
mod get_incidents;
mod health;

// ---

/// Shared, read-only request state: the cleaned incident table and config.
pub type AppState = (Arc<IncidentTable>, Config);

pub fn router(incidents: Arc<IncidentTable>, config: Config) -> Router {
    // ---
    Router::new()
        .merge(dashboard::router())
        .merge(get_incidents::router())
        .merge(get_calls::router())
        .merge(health::router())
        .with_state((incidents, config))
}
