//! Local crime incident pipeline.
//!
//! The SPD CSV export is read once at startup into an [`IncidentTable`]:
//! timestamps are parsed, a year is derived, rows without a year or from
//! [`RECENT_YEAR_CUTOFF`] and earlier are dropped. Each dashboard request then
//! derives a filtered view from a [`Selection`] and counts it two ways.

use std::{
    collections::BTreeSet,
    fs::File,
    io::Read,
    path::{Path, PathBuf},
};

use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info};

use crate::aggregate::count_by;
use crate::models::{IncidentRecord, RawIncidentRow, RECENT_YEAR_CUTOFF};

// ---

/// Header names the loader refuses to run without.
pub const REQUIRED_COLUMNS: [&str; 5] = [
    "Offense Start DateTime",
    "Precinct",
    "Crime Against Category",
    "Latitude",
    "Longitude",
];

/// Failure to load the incident dataset. Always fatal for the service.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("cannot read crime dataset '{path}': {source}")]
    FileAccess {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("crime dataset '{path}' is missing required column '{column}'")]
    MissingColumn { path: PathBuf, column: &'static str },

    #[error("crime dataset '{path}' is malformed at line {line}: {source}")]
    Parse {
        path: PathBuf,
        line: u64,
        #[source]
        source: csv::Error,
    },
}

/// The cleaned incident dataset. Immutable once loaded.
#[derive(Debug, Clone, Default)]
pub struct IncidentTable {
    records: Vec<IncidentRecord>,
    options: Selection,
}

impl IncidentTable {
    // ---
    /// Read and clean the CSV at `path`.
    pub fn load(path: &Path) -> Result<Self, LoadError> {
        // ---
        info!("Loading crime dataset from {}", path.display());

        let file = File::open(path).map_err(|source| LoadError::FileAccess {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_reader(file, path)
    }

    /// Read and clean CSV content from any reader. `source` only labels errors.
    pub fn from_reader<R: Read>(reader: R, source: &Path) -> Result<Self, LoadError> {
        // ---
        let parse_err = |e: csv::Error| LoadError::Parse {
            path: source.to_path_buf(),
            line: e.position().map_or(1, |p| p.line()),
            source: e,
        };

        let mut rdr = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(reader);

        let headers = rdr.headers().map_err(parse_err)?.clone();
        if let Some(column) = REQUIRED_COLUMNS
            .iter()
            .copied()
            .find(|c| !headers.iter().any(|h| h == *c))
        {
            return Err(LoadError::MissingColumn {
                path: source.to_path_buf(),
                column,
            });
        }

        let mut raw_count = 0usize;
        let mut no_year = 0usize;
        let mut too_old = 0usize;
        let mut records = Vec::new();

        for row in rdr.deserialize::<RawIncidentRow>() {
            let row = row.map_err(parse_err)?;
            raw_count += 1;

            match row.to_record() {
                None => no_year += 1,
                Some(r) if r.year <= RECENT_YEAR_CUTOFF => too_old += 1,
                Some(r) => records.push(r),
            }
        }

        info!(
            "Crime dataset cleaned: {} of {} rows kept ({} without a year, {} from {} or earlier)",
            records.len(),
            raw_count,
            no_year,
            too_old,
            RECENT_YEAR_CUTOFF
        );

        let options = Selection::observed(&records);
        debug!(
            "Filter options: {} years, {} precincts, {} categories",
            options.years.len(),
            options.precincts.len(),
            options.categories.len()
        );

        Ok(Self { records, options })
    }

    pub fn records(&self) -> &[IncidentRecord] {
        &self.records
    }

    /// Distinct non-null values per dimension, collected once at load.
    pub fn options(&self) -> &Selection {
        &self.options
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Rows whose year, precinct and category are all selected.
    pub fn filter(&self, selection: &Selection) -> Vec<&IncidentRecord> {
        // ---
        let view: Vec<&IncidentRecord> = self
            .records
            .iter()
            .filter(|r| selection.matches(r))
            .collect();

        debug!(
            "Selection kept {} of {} incidents",
            view.len(),
            self.len()
        );
        view
    }

    /// Filter, then count by precinct and by year and category.
    pub fn summarize(&self, selection: &Selection) -> IncidentSummary {
        // ---
        let view = self.filter(selection);

        let by_precinct = count_by(view.iter(), |r| r.precinct.clone())
            .into_iter()
            .map(|(precinct, count)| PrecinctCount { precinct, count })
            .collect();

        let by_year_category = count_by(view.iter(), |r| {
            r.crime_against_category.clone().map(|c| (r.year, c))
        })
        .into_iter()
        .map(|((year, category), count)| YearCategoryCount {
            year,
            category,
            count,
        })
        .collect();

        IncidentSummary {
            row_count: view.len(),
            by_precinct,
            by_year_category,
        }
    }
}

/// Selected values per dimension.
///
/// A row passes when each of its values is in the matching set. An empty set
/// passes nothing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Selection {
    pub years: BTreeSet<i32>,
    pub precincts: BTreeSet<String>,
    pub categories: BTreeSet<String>,
}

/// Query key sent by the dashboard form so cleared multi-selects read as empty.
pub const FILTERED_MARKER: &str = "filtered";

impl Selection {
    // ---
    /// Every distinct non-null value present in `table`.
    pub fn all(table: &IncidentTable) -> Self {
        table.options().clone()
    }

    fn observed(records: &[IncidentRecord]) -> Self {
        // ---
        Selection {
            years: records.iter().map(|r| r.year).collect(),
            precincts: records.iter().filter_map(|r| r.precinct.clone()).collect(),
            categories: records
                .iter()
                .filter_map(|r| r.crime_against_category.clone())
                .collect(),
        }
    }

    pub fn matches(&self, record: &IncidentRecord) -> bool {
        // ---
        self.years.contains(&record.year)
            && record
                .precinct
                .as_ref()
                .is_some_and(|p| self.precincts.contains(p))
            && record
                .crime_against_category
                .as_ref()
                .is_some_and(|c| self.categories.contains(c))
    }

    /// Build a selection from `year`, `precinct` and `category` query pairs.
    ///
    /// Keys may repeat. `year` values may also be comma separated; precinct
    /// and category values are taken whole, since they can contain commas. A
    /// dimension with no key defaults to every value in `table`, unless the
    /// [`FILTERED_MARKER`] key is present, in which case it is empty.
    pub fn from_query(pairs: &[(String, String)], table: &IncidentTable) -> Self {
        // ---
        let mut years: Option<BTreeSet<i32>> = None;
        let mut precincts: Option<BTreeSet<String>> = None;
        let mut categories: Option<BTreeSet<String>> = None;
        let mut filtered = false;

        fn whole(value: &str) -> Option<String> {
            let value = value.trim();
            (!value.is_empty()).then(|| value.to_string())
        }

        for (key, value) in pairs {
            match key.as_str() {
                "year" => years.get_or_insert_with(BTreeSet::new).extend(
                    value
                        .split(',')
                        .filter_map(|v| v.trim().parse::<i32>().ok()),
                ),
                "precinct" => precincts
                    .get_or_insert_with(BTreeSet::new)
                    .extend(whole(value)),
                "category" => categories
                    .get_or_insert_with(BTreeSet::new)
                    .extend(whole(value)),
                FILTERED_MARKER => filtered = true,
                _ => {}
            }
        }

        fn or_default<T: Clone>(
            chosen: Option<BTreeSet<T>>,
            all: &BTreeSet<T>,
            filtered: bool,
        ) -> BTreeSet<T> {
            match chosen {
                Some(set) => set,
                None if filtered => BTreeSet::new(),
                None => all.clone(),
            }
        }

        let options = table.options();
        Selection {
            years: or_default(years, &options.years, filtered),
            precincts: or_default(precincts, &options.precincts, filtered),
            categories: or_default(categories, &options.categories, filtered),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PrecinctCount {
    pub precinct: String,
    pub count: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct YearCategoryCount {
    pub year: i32,
    pub category: String,
    pub count: u64,
}

/// Counts for one selection, in ascending key order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IncidentSummary {
    pub row_count: usize,
    pub by_precinct: Vec<PrecinctCount>,
    pub by_year_category: Vec<YearCategoryCount>,
}
