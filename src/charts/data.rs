// Turns a chart request into the numbers a renderer draws.

use std::collections::HashMap;

use crate::dataset::{CellValue, ColumnKind, Dataset};
use crate::types::{AppError, AppResult};

use super::{ChartKind, ChartRequest, ColumnSelection};

pub const BAR_ROWS: usize = 5;

#[derive(Debug, Clone, PartialEq)]
pub struct Bin {
    pub lower: f64,
    pub upper: f64,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ChartData {
    /// Labelled bar heights.
    Bars(Vec<(String, f64)>),
    /// Line points in row order. `x_labels` is set when x is categorical and
    /// the points sit at their positions 0, 1, 2, ...
    Series {
        points: Vec<(f64, f64)>,
        x_labels: Option<Vec<String>>,
    },
    Bins(Vec<Bin>),
    /// Pie slices sized by occurrence count.
    Slices(Vec<(String, f64)>),
}

pub fn chart_data(dataset: &Dataset, request: &ChartRequest) -> AppResult<ChartData> {
    let data = match (&request.kind, &request.selection) {
        (ChartKind::Bar, ColumnSelection::Single { column }) => bar_data(dataset, column)?,
        (ChartKind::Line, ColumnSelection::Pair { x, y }) => line_data(dataset, x, y)?,
        (ChartKind::Histogram, ColumnSelection::Single { column }) => {
            histogram_data(dataset, column)?
        }
        (ChartKind::Pie, ColumnSelection::Single { column }) => {
            let counts = value_counts(dataset.values(column)?);
            ChartData::Slices(to_f64(counts))
        }
        (kind, _) => {
            return Err(AppError::InvalidRequest(format!(
                "column selection does not fit a {} chart",
                kind
            )))
        }
    };

    if data.is_empty() {
        return Err(AppError::InvalidRequest(format!(
            "no plottable values for '{}'",
            request.selection.columns().join("', '")
        )));
    }
    Ok(data)
}

impl ChartData {
    pub fn is_empty(&self) -> bool {
        match self {
            ChartData::Bars(v) | ChartData::Slices(v) => v.is_empty(),
            ChartData::Series { points, .. } => points.is_empty(),
            ChartData::Bins(bins) => bins.is_empty(),
        }
    }
}

fn is_numeric(dataset: &Dataset, column: &str) -> bool {
    dataset.column(column).is_some_and(|c| c.kind.is_numeric())
}

fn bar_data(dataset: &Dataset, column: &str) -> AppResult<ChartData> {
    let values = dataset.values(column)?;

    if !is_numeric(dataset, column) {
        let mut counts = value_counts(values);
        counts.truncate(BAR_ROWS);
        return Ok(ChartData::Bars(to_f64(counts)));
    }

    let label_column = dataset
        .columns()
        .iter()
        .find(|c| c.kind == ColumnKind::Text && c.name != column)
        .map(|c| c.name.clone());
    let labels: Option<Vec<&CellValue>> = match &label_column {
        Some(name) => Some(dataset.values(name)?),
        None => None,
    };

    let bars = values
        .iter()
        .take(BAR_ROWS)
        .enumerate()
        .filter_map(|(idx, value)| {
            let height = value.as_f64()?;
            let label = labels
                .as_ref()
                .map(|l| l[idx].label())
                .filter(|l| !l.is_empty())
                .unwrap_or_else(|| format!("Row {}", idx + 1));
            Some((label, height))
        })
        .collect();

    Ok(ChartData::Bars(bars))
}

fn line_data(dataset: &Dataset, x: &str, y: &str) -> AppResult<ChartData> {
    if !is_numeric(dataset, y) {
        return Err(AppError::InvalidRequest(format!(
            "the Y-axis column '{}' is not numeric",
            y
        )));
    }
    let xs = dataset.values(x)?;
    let ys = dataset.values(y)?;

    if is_numeric(dataset, x) {
        let points = xs
            .iter()
            .zip(ys.iter())
            .filter_map(|(x, y)| Some((x.as_f64()?, y.as_f64()?)))
            .collect();
        return Ok(ChartData::Series {
            points,
            x_labels: None,
        });
    }

    let mut points = Vec::new();
    let mut labels = Vec::new();
    for (x, y) in xs.iter().zip(ys.iter()) {
        if let Some(y) = y.as_f64() {
            points.push((points.len() as f64, y));
            labels.push(x.label());
        }
    }
    Ok(ChartData::Series {
        points,
        x_labels: Some(labels),
    })
}

fn histogram_data(dataset: &Dataset, column: &str) -> AppResult<ChartData> {
    let values = dataset.values(column)?;

    if !is_numeric(dataset, column) {
        return Ok(ChartData::Bars(to_f64(value_counts(values))));
    }

    let numbers: Vec<f64> = values.iter().filter_map(|v| v.as_f64()).collect();
    Ok(ChartData::Bins(bin_values(&numbers)))
}

/// Equal-width bins, count chosen by Sturges' rule.
pub fn bin_values(values: &[f64]) -> Vec<Bin> {
    if values.is_empty() {
        return Vec::new();
    }

    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);

    if min == max {
        return vec![Bin {
            lower: min - 0.5,
            upper: max + 0.5,
            count: values.len(),
        }];
    }

    let bin_count = sturges(values.len());
    let width = (max - min) / bin_count as f64;
    let mut bins: Vec<Bin> = (0..bin_count)
        .map(|i| Bin {
            lower: min + width * i as f64,
            upper: min + width * (i + 1) as f64,
            count: 0,
        })
        .collect();

    for value in values {
        let idx = (((value - min) / width).floor() as usize).min(bin_count - 1);
        bins[idx].count += 1;
    }
    bins
}

fn sturges(n: usize) -> usize {
    ((n as f64).log2().ceil() as usize + 1).max(1)
}

/// Occurrences per distinct non-null value, most frequent first. Ties keep
/// first-appearance order.
pub fn value_counts(values: Vec<&CellValue>) -> Vec<(String, usize)> {
    let mut positions: HashMap<String, usize> = HashMap::new();
    let mut counts: Vec<(String, usize)> = Vec::new();

    for value in values.into_iter().filter(|v| !v.is_null()) {
        let key = value.label();
        match positions.get(&key) {
            Some(&pos) => counts[pos].1 += 1,
            None => {
                positions.insert(key.clone(), counts.len());
                counts.push((key, 1));
            }
        }
    }

    counts.sort_by(|a, b| b.1.cmp(&a.1));
    counts
}

fn to_f64(counts: Vec<(String, usize)>) -> Vec<(String, f64)> {
    counts.into_iter().map(|(k, c)| (k, c as f64)).collect()
}
