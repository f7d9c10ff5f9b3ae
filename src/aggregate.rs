//! Grouped counts shared by the incident and call pipelines.
//!
//! Two shapes are produced: a sparse ordered map of key to count (only keys
//! that occur), and a dense [`CountGrid`] where every row/column combination
//! of the two domains has a cell, zero when nothing was counted there.

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;

// ---

/// Count items grouped by `key`. Items whose key is `None` are not counted.
pub fn count_by<T, K, F>(items: impl IntoIterator<Item = T>, key: F) -> BTreeMap<K, u64>
where
    K: Ord,
    F: Fn(&T) -> Option<K>,
{
    // ---
    let mut counts = BTreeMap::new();
    for item in items {
        if let Some(k) = key(&item) {
            *counts.entry(k).or_insert(0) += 1;
        }
    }
    counts
}

/// Dense two-key count table.
///
/// `counts[r][c]` is the number of items keyed `(rows[r], columns[c])`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CountGrid<R, C> {
    pub rows: Vec<R>,
    pub columns: Vec<C>,
    pub counts: Vec<Vec<u64>>,
}

impl<R, C> CountGrid<R, C>
where
    R: Ord + Clone,
    C: Ord + Clone,
{
    /// Build a grid over fixed row and column domains.
    ///
    /// Items keyed outside either domain, or with no key, are not counted.
    pub fn with_domains<T, F>(
        items: impl IntoIterator<Item = T>,
        rows: Vec<R>,
        columns: Vec<C>,
        key: F,
    ) -> Self
    where
        F: Fn(&T) -> Option<(R, C)>,
    {
        // ---
        Self::from_sparse(&count_by(items, key), rows, columns)
    }

    /// Build a grid whose domains are the distinct row and column keys that
    /// were observed, each in ascending order.
    pub fn observed<T, F>(items: impl IntoIterator<Item = T>, key: F) -> Self
    where
        F: Fn(&T) -> Option<(R, C)>,
    {
        // ---
        let sparse = count_by(items, key);
        let rows: Vec<R> = sparse
            .keys()
            .map(|(r, _)| r.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        let columns: Vec<C> = sparse
            .keys()
            .map(|(_, c)| c.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        Self::from_sparse(&sparse, rows, columns)
    }

    fn from_sparse(sparse: &BTreeMap<(R, C), u64>, rows: Vec<R>, columns: Vec<C>) -> Self {
        // ---
        let counts = rows
            .iter()
            .map(|r| {
                columns
                    .iter()
                    .map(|c| {
                        sparse
                            .get(&(r.clone(), c.clone()))
                            .copied()
                            .unwrap_or(0)
                    })
                    .collect()
            })
            .collect();

        Self {
            rows,
            columns,
            counts,
        }
    }

    /// Sum of one row, by index.
    pub fn row_total(&self, row: usize) -> u64 {
        self.counts.get(row).map_or(0, |cells| cells.iter().sum())
    }
}

#[cfg(test)]
impl<R: PartialEq, C: PartialEq> CountGrid<R, C> {
    // ---
    /// Count in the `(row, column)` cell, `None` if either key is outside the grid.
    pub fn get(&self, row: &R, column: &C) -> Option<u64> {
        // ---
        let r = self.rows.iter().position(|x| x == row)?;
        let c = self.columns.iter().position(|x| x == column)?;
        Some(self.counts[r][c])
    }

    /// Sum of every cell.
    pub fn total(&self) -> u64 {
        self.counts.iter().flatten().sum()
    }
}
