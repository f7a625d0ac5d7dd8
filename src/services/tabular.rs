//! Tabular dataset parsing and descriptive statistics.

use std::collections::BTreeMap;

use serde::Serialize;

use super::render;
use crate::error::{ServiceError, ServiceResult};

/// Quantiles reported under `quartiles`.
const QUARTILES: [(f64, &str); 3] = [(0.25, "0.25"), (0.5, "0.5"), (0.75, "0.75")];

/// Numeric columns of a parsed CSV, in file order.
#[derive(Debug, Clone)]
pub struct Table {
    pub columns: Vec<(String, Vec<f64>)>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Statistics {
    pub mean: BTreeMap<String, f64>,
    pub median: BTreeMap<String, f64>,
    pub mode: BTreeMap<String, f64>,
    /// Column -> quantile label -> value.
    pub quartiles: BTreeMap<String, BTreeMap<String, f64>>,
}

/// Parse errors carry row offsets and cell contents; keep those in the log.
fn malformed(e: csv::Error) -> ServiceError {
    tracing::warn!("Failed to parse dataset: {}", e);
    ServiceError::invalid_data("Failed to parse dataset")
}

/// Parse a header-first CSV and keep the numeric columns.
///
/// A column is numeric when it has at least one non-empty cell and every
/// non-empty cell parses as a float. Empty cells are treated as missing.
pub fn parse_csv(bytes: &[u8]) -> ServiceResult<Table> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(bytes);

    let headers: Vec<String> = reader
        .headers()
        .map_err(malformed)?
        .iter()
        .map(str::to_string)
        .collect();

    let mut values: Vec<Vec<f64>> = vec![Vec::new(); headers.len()];
    let mut numeric = vec![true; headers.len()];

    for record in reader.records() {
        let record = record.map_err(malformed)?;
        for (i, cell) in record.iter().enumerate().take(headers.len()) {
            if cell.is_empty() || !numeric[i] {
                continue;
            }
            match cell.parse::<f64>() {
                Ok(v) if v.is_finite() => values[i].push(v),
                Ok(_) => {}
                Err(_) => numeric[i] = false,
            }
        }
    }

    let columns: Vec<(String, Vec<f64>)> = headers
        .into_iter()
        .zip(values)
        .zip(numeric)
        .filter(|((_, vals), is_numeric)| *is_numeric && !vals.is_empty())
        .map(|(col, _)| col)
        .collect();

    if columns.is_empty() {
        return Err(ServiceError::invalid_data(
            "Dataset contains no numeric columns",
        ));
    }
    Ok(Table { columns })
}

pub fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

/// Linear-interpolation quantile over sorted values.
pub fn quantile(sorted: &[f64], q: f64) -> f64 {
    let pos = q * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    sorted[lo] + (sorted[hi] - sorted[lo]) * (pos - lo as f64)
}

/// Most frequent value; ties resolve to the smallest.
pub fn mode(sorted: &[f64]) -> f64 {
    let mut best = sorted[0];
    let mut best_count = 0;
    let mut i = 0;
    while i < sorted.len() {
        let mut j = i;
        while j < sorted.len() && sorted[j] == sorted[i] {
            j += 1;
        }
        if j - i > best_count {
            best_count = j - i;
            best = sorted[i];
        }
        i = j;
    }
    best
}

pub fn statistics(table: &Table) -> Statistics {
    let mut stats = Statistics {
        mean: BTreeMap::new(),
        median: BTreeMap::new(),
        mode: BTreeMap::new(),
        quartiles: BTreeMap::new(),
    };

    for (name, values) in &table.columns {
        let mut sorted = values.clone();
        sorted.sort_by(f64::total_cmp);

        stats.mean.insert(name.clone(), mean(&sorted));
        stats.median.insert(name.clone(), quantile(&sorted, 0.5));
        stats.mode.insert(name.clone(), mode(&sorted));
        stats.quartiles.insert(
            name.clone(),
            QUARTILES
                .iter()
                .map(|(q, label)| (label.to_string(), quantile(&sorted, *q)))
                .collect(),
        );
    }
    stats
}

/// Bar chart of per-column means, as PNG bytes.
pub fn chart(table: &Table) -> ServiceResult<Vec<u8>> {
    let means: Vec<f64> = table.columns.iter().map(|(_, v)| mean(v)).collect();
    render::bar_chart(&means)
}
