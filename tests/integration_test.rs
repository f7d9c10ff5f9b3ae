//! Smoke tests against a running instance (`BASE_URL`, default
//! `http://localhost:8080`) started with the real SPD CSV.

use std::collections::BTreeSet;

use anyhow::Result;
use reqwest::Client;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct Options {
    years: BTreeSet<i32>,
    precincts: BTreeSet<String>,
    categories: BTreeSet<String>,
}

#[derive(Debug, Deserialize)]
struct PrecinctCount {
    precinct: String,
    count: u64,
}

#[derive(Debug, Deserialize)]
struct YearCategoryCount {
    year: i32,
    category: String,
    count: u64,
}

#[derive(Debug, Deserialize)]
struct Summary {
    row_count: u64,
    by_precinct: Vec<PrecinctCount>,
    by_year_category: Vec<YearCategoryCount>,
}

fn base_url() -> String {
    std::env::var("BASE_URL").unwrap_or_else(|_| "http://localhost:8080".into())
}

#[tokio::test]
async fn summary_counts_are_consistent() -> Result<()> {
    // ---
    let base = base_url();
    let client = Client::new();

    let options: Options = client
        .get(format!("{}/api/incidents/options", base))
        .send()
        .await?
        .json()
        .await?;

    assert!(!options.years.is_empty(), "No years returned from {}", base);

    // 1) Every retained year is after 2020
    assert!(
        options.years.iter().all(|y| *y > 2020),
        "Years at or before 2020 survived cleaning: {:?}",
        options.years
    );

    let summary: Summary = client
        .get(format!("{}/api/incidents/summary", base))
        .send()
        .await?
        .json()
        .await?;

    // 2) Both aggregations account for every filtered row
    let by_precinct: u64 = summary.by_precinct.iter().map(|c| c.count).sum();
    let by_pair: u64 = summary.by_year_category.iter().map(|c| c.count).sum();
    assert_eq!(by_precinct, summary.row_count, "Precinct counts do not sum");
    assert_eq!(by_pair, summary.row_count, "Year x category counts do not sum");

    // 3) Keys come from the advertised options
    for c in &summary.by_precinct {
        assert!(options.precincts.contains(&c.precinct), "Unknown precinct {}", c.precinct);
    }
    for c in &summary.by_year_category {
        assert!(options.years.contains(&c.year), "Unknown year {}", c.year);
        assert!(
            options.categories.contains(&c.category),
            "Unknown category {}",
            c.category
        );
    }

    Ok(())
}

#[tokio::test]
async fn filtering_works() -> Result<()> {
    // ---
    let base = base_url();
    let client = Client::new();

    // Single year filter
    let url = format!("{}/api/incidents/summary?year=2022", base);
    let summary: Summary = client.get(&url).send().await?.json().await?;
    for c in &summary.by_year_category {
        assert_eq!(c.year, 2022, "Year filter failed");
    }

    // Empty selection shows nothing
    let url = format!("{}/api/incidents/summary?category=", base);
    let summary: Summary = client.get(&url).send().await?.json().await?;
    assert_eq!(summary.row_count, 0, "Empty selection returned rows");

    Ok(())
}

#[tokio::test]
async fn dashboard_renders() -> Result<()> {
    // ---
    let html = Client::new().get(base_url()).send().await?.text().await?;

    assert!(html.contains("Seattle Crime Data Visualization"));
    assert!(html.contains("Contextual Visualizations of Seattle 911 Calls"));

    Ok(())
}
