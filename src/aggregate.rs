//! Frequency counts over one or two table columns.

use crate::data::Table;
use crate::error::Result;
use std::cmp::Ordering;
use std::collections::HashMap;

/// Distinct values of one column with their row counts, most frequent first.
#[derive(Debug, Clone, PartialEq)]
pub struct ValueCounts {
    pub column: String,
    pub entries: Vec<(String, usize)>,
}

impl ValueCounts {
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn total(&self) -> usize {
        self.entries.iter().map(|(_, n)| n).sum()
    }
}

/// Row counts per (group, series) pair.
///
/// Groups are the values of the second selected column and form the x-axis;
/// series are the values of the first selected column and form the stacked
/// segments. Pairs that never occur are absent from `counts`.
#[derive(Debug, Clone, PartialEq)]
pub struct CrossTab {
    pub group_column: String,
    pub series_column: String,
    pub groups: Vec<String>,
    pub series: Vec<String>,
    pub counts: HashMap<(String, String), usize>,
}

impl CrossTab {
    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    pub fn get(&self, group: &str, series: &str) -> Option<usize> {
        self.counts
            .get(&(group.to_string(), series.to_string()))
            .copied()
    }

    pub fn total(&self) -> usize {
        self.counts.values().sum()
    }

    /// One value vector per series, indexed like `groups`, with absent pairs as 0.
    pub fn grid(&self) -> Vec<(String, Vec<f64>)> {
        self.series
            .iter()
            .map(|s| {
                let values = self
                    .groups
                    .iter()
                    .map(|g| self.get(g, s).unwrap_or(0) as f64)
                    .collect();
                (s.clone(), values)
            })
            .collect()
    }

    /// Long-form `(group, series, count)` records, ordered by group then series.
    pub fn rows(&self) -> Vec<(&str, &str, usize)> {
        let mut out = Vec::with_capacity(self.counts.len());
        for g in &self.groups {
            for s in &self.series {
                if let Some(n) = self.get(g, s) {
                    out.push((g.as_str(), s.as_str(), n));
                }
            }
        }
        out
    }
}

/// Count occurrences of each distinct non-missing value in `column`.
pub fn value_counts(table: &Table, column: &str) -> Result<ValueCounts> {
    let cells = table.column(column)?;

    let mut counts: HashMap<&str, usize> = HashMap::new();
    let mut order: Vec<&str> = Vec::new();
    for value in cells.into_iter().flatten() {
        let count = counts.entry(value).or_insert(0);
        if *count == 0 {
            order.push(value);
        }
        *count += 1;
    }

    let mut entries: Vec<(String, usize)> = order
        .into_iter()
        .map(|v| (v.to_string(), counts[v]))
        .collect();
    // Stable: equal counts keep first-appearance order.
    entries.sort_by(|a, b| b.1.cmp(&a.1));

    Ok(ValueCounts {
        column: column.to_string(),
        entries,
    })
}

/// Count rows per (`column_2` value, `column_1` value) combination.
///
/// Rows where either cell is missing are skipped.
pub fn cross_tabulate(table: &Table, column_1: &str, column_2: &str) -> Result<CrossTab> {
    let series_cells = table.column(column_1)?;
    let group_cells = table.column(column_2)?;

    let mut counts: HashMap<(String, String), usize> = HashMap::new();
    for (group, series) in group_cells.into_iter().zip(series_cells) {
        if let (Some(g), Some(s)) = (group, series) {
            *counts.entry((g.to_string(), s.to_string())).or_default() += 1;
        }
    }

    let mut groups: Vec<String> = counts.keys().map(|(g, _)| g.clone()).collect();
    let mut series: Vec<String> = counts.keys().map(|(_, s)| s.clone()).collect();
    sort_values(&mut groups);
    sort_values(&mut series);

    Ok(CrossTab {
        group_column: column_2.to_string(),
        series_column: column_1.to_string(),
        groups,
        series,
        counts,
    })
}

fn sort_values(values: &mut Vec<String>) {
    values.sort_by(|a, b| compare_values(a, b));
    values.dedup();
}

/// Order cell values numerically when both parse as numbers, otherwise as text.
/// Numbers sort before text.
pub fn compare_values(a: &str, b: &str) -> Ordering {
    match (a.trim().parse::<f64>(), b.trim().parse::<f64>()) {
        (Ok(x), Ok(y)) => x.partial_cmp(&y).unwrap_or(Ordering::Equal).then_with(|| a.cmp(b)),
        (Ok(_), Err(_)) => Ordering::Less,
        (Err(_), Ok(_)) => Ordering::Greater,
        (Err(_), Err(_)) => a.cmp(b),
    }
}
