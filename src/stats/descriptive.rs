//! Descriptive statistics
//!
//! `describe` mirrors the usual count/mean/std/min/quartiles/max summary.
//! Quantiles use linear interpolation between closest ranks.

use serde::Serialize;
use statrs::statistics::Statistics;
use std::collections::HashMap;

use crate::data::{ColumnData, ColumnKind, Dataset};

/// Summary of one numeric column (nulls excluded).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnSummary {
    pub name: String,
    pub count: usize,
    pub mean: f64,
    pub std: f64,
    pub min: f64,
    pub q25: f64,
    pub median: f64,
    pub q75: f64,
    pub max: f64,
}

impl std::fmt::Display for ColumnSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{:<28} {:>8} {:>14.4} {:>14.4} {:>14.4} {:>14.4} {:>14.4} {:>14.4} {:>14.4}",
            self.name,
            self.count,
            self.mean,
            self.std,
            self.min,
            self.q25,
            self.median,
            self.q75,
            self.max
        )
    }
}

/// Summaries for every numeric column, in column order.
pub fn describe(data: &Dataset) -> Vec<ColumnSummary> {
    data.columns()
        .filter_map(|column| {
            let values: Vec<f64> = column.data.as_numeric()?.iter().flatten().copied().collect();
            Some(summarize(&column.name, &values))
        })
        .collect()
}

/// Summary of a slice of values. Empty input yields NaN statistics.
pub fn summarize(name: &str, values: &[f64]) -> ColumnSummary {
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);

    ColumnSummary {
        name: name.to_string(),
        count: values.len(),
        mean: values.iter().mean(),
        std: values.iter().std_dev(),
        min: sorted.first().copied().unwrap_or(f64::NAN),
        q25: quantile_sorted(&sorted, 0.25),
        median: quantile_sorted(&sorted, 0.5),
        q75: quantile_sorted(&sorted, 0.75),
        max: sorted.last().copied().unwrap_or(f64::NAN),
    }
}

/// Quantile of already-sorted values (linear interpolation). NaN when empty.
pub fn quantile_sorted(sorted: &[f64], q: f64) -> f64 {
    if sorted.is_empty() {
        return f64::NAN;
    }
    let pos = q.clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    let frac = pos - lo as f64;
    sorted[lo] + (sorted[hi] - sorted[lo]) * frac
}

/// Median of unsorted values, `None` when empty.
pub fn median(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    Some(quantile_sorted(&sorted, 0.5))
}

/// Most frequent value; ties resolve to the lexicographically smallest.
pub fn mode<'a>(values: impl IntoIterator<Item = &'a str>) -> Option<String> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for v in values {
        *counts.entry(v).or_insert(0) += 1;
    }
    counts
        .into_iter()
        .max_by(|a, b| a.1.cmp(&b.1).then_with(|| b.0.cmp(a.0)))
        .map(|(value, _)| value.to_string())
}

/// Counts per distinct non-null value, most frequent first.
/// Equal counts keep first-appearance order.
pub fn value_counts(column: &ColumnData) -> Vec<(String, usize)> {
    let mut order: Vec<(String, usize)> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();
    for row in 0..column.len() {
        if let Some(key) = column.key_at(row) {
            match index.get(&key) {
                Some(&i) => order[i].1 += 1,
                None => {
                    index.insert(key.clone(), order.len());
                    order.push((key, 1));
                }
            }
        }
    }
    order.sort_by(|a, b| b.1.cmp(&a.1));
    order
}

/// Column name and kind, in column order.
pub fn column_kinds(data: &Dataset) -> Vec<(String, ColumnKind)> {
    data.columns()
        .map(|c| (c.name.clone(), c.data.kind()))
        .collect()
}
