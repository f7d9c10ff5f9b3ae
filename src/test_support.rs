//! Helpers shared by the unit tests.

use std::path::Path;

use axum::Router;

use crate::IncidentTable;

/// Serve `router` on an ephemeral local port and return its base URL.
pub async fn serve(router: Router) -> String {
    // ---
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move { axum::serve(listener, router).await.unwrap() });
    format!("http://{addr}")
}

/// Four incidents across 2021-2023 and three precincts.
pub fn sample_incidents() -> IncidentTable {
    // ---
    let csv = "Report Number,Offense Start DateTime,Precinct,Crime Against Category,Latitude,Longitude\n\
               1,01/05/2021 08:00:00 AM,North,PROPERTY,47.7,-122.3\n\
               2,03/10/2022 09:30:00 PM,South,PERSON,47.5,-122.3\n\
               3,07/04/2022 11:00:00 AM,North,PERSON,47.7,-122.3\n\
               4,12/31/2023 11:59:00 PM,West,SOCIETY,47.6,-122.4\n";
    IncidentTable::from_reader(csv.as_bytes(), Path::new("sample.csv")).unwrap()
}
