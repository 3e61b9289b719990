//! Typed tabular dataset
//!
//! An uploaded CSV file is parsed once into a [`Dataset`]: an ordered list of
//! named, typed columns plus row storage. Column kinds are inferred at load
//! time and the dataset is immutable afterwards.

pub mod json_column;

use std::collections::HashMap;

use csv::ReaderBuilder;
use serde::Serialize;
use tracing::debug;

use crate::types::{AppError, AppResult};

pub use json_column::decode_permissive;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnKind {
    Integer,
    Float,
    Boolean,
    Text,
}

impl ColumnKind {
    pub fn is_numeric(self) -> bool {
        matches!(self, ColumnKind::Integer | ColumnKind::Float)
    }
}

impl std::fmt::Display for ColumnKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ColumnKind::Integer => write!(f, "integer"),
            ColumnKind::Float => write!(f, "float"),
            ColumnKind::Boolean => write!(f, "boolean"),
            ColumnKind::Text => write!(f, "text"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Column {
    pub name: String,
    pub kind: ColumnKind,
}

/// A single cell. Serializes to the matching JSON scalar.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum CellValue {
    Null,
    Integer(i64),
    Float(f64),
    Boolean(bool),
    Text(String),
}

impl CellValue {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            CellValue::Integer(v) => Some(*v as f64),
            CellValue::Float(v) if v.is_finite() => Some(*v),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, CellValue::Null)
    }

    /// Display form used for chart labels and category keys.
    pub fn label(&self) -> String {
        match self {
            CellValue::Null => String::new(),
            CellValue::Integer(v) => v.to_string(),
            CellValue::Float(v) => v.to_string(),
            CellValue::Boolean(v) => v.to_string(),
            CellValue::Text(v) => v.clone(),
        }
    }
}

/// First rows of a dataset, shaped for the preview table.
#[derive(Debug, Clone, Serialize)]
pub struct Preview {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<CellValue>>,
}

#[derive(Debug, Clone)]
pub struct Dataset {
    columns: Vec<Column>,
    rows: Vec<Vec<CellValue>>,
}

impl Dataset {
    /// Parse CSV bytes into a typed dataset.
    ///
    /// Fails with [`AppError::EmptyDataset`] when the file has no header or
    /// no data rows, and with [`AppError::InvalidRequest`] on malformed CSV.
    /// Header names are kept verbatim, surrounding spaces included.
    pub fn from_csv_bytes(bytes: &[u8]) -> AppResult<Self> {
        let mut rdr = ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(bytes);

        let raw_headers: Vec<String> = rdr
            .headers()
            .map_err(|e| AppError::InvalidRequest(format!("Malformed CSV header: {}", e)))?
            .iter()
            .map(|h| h.to_string())
            .collect();

        if raw_headers.is_empty() || (raw_headers.len() == 1 && raw_headers[0].is_empty()) {
            return Err(AppError::EmptyDataset);
        }
        let names = normalize_headers(&raw_headers);
        let width = names.len();

        let mut raw_rows: Vec<Vec<String>> = Vec::new();
        for (idx, record) in rdr.records().enumerate() {
            let record = record.map_err(|e| {
                AppError::InvalidRequest(format!("Malformed CSV at row {}: {}", idx + 1, e))
            })?;
            if record.len() > width {
                return Err(AppError::InvalidRequest(format!(
                    "Row {} has {} fields but the header has {}",
                    idx + 1,
                    record.len(),
                    width
                )));
            }
            // A blank line parses as a single empty field.
            if record.len() == 1 && record.get(0).map_or(true, |f| f.trim().is_empty()) && width > 1 {
                continue;
            }
            let mut row: Vec<String> = record.iter().map(|f| f.to_string()).collect();
            row.resize(width, String::new());
            raw_rows.push(row);
        }

        if raw_rows.is_empty() {
            return Err(AppError::EmptyDataset);
        }

        let columns: Vec<Column> = names
            .into_iter()
            .enumerate()
            .map(|(idx, name)| Column {
                kind: infer_kind(raw_rows.iter().map(|r| r[idx].as_str())),
                name,
            })
            .collect();

        let rows: Vec<Vec<CellValue>> = raw_rows
            .iter()
            .map(|row| {
                row.iter()
                    .zip(columns.iter())
                    .map(|(field, column)| parse_cell(field, column.kind))
                    .collect()
            })
            .collect();

        debug!(
            columns = columns.len(),
            rows = rows.len(),
            "Loaded dataset"
        );

        Ok(Self { columns, rows })
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column_names(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.name.clone()).collect()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn rows(&self) -> &[Vec<CellValue>] {
        &self.rows
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Values of one column in row order.
    pub fn values(&self, name: &str) -> AppResult<Vec<&CellValue>> {
        let idx = self
            .column_index(name)
            .ok_or_else(|| AppError::NotFound(format!("column '{}'", name)))?;
        Ok(self.rows.iter().map(|row| &row[idx]).collect())
    }

    pub fn head(&self, n: usize) -> Preview {
        Preview {
            columns: self.column_names(),
            rows: self.rows.iter().take(n).cloned().collect(),
        }
    }

    /// Decode every cell of a column with [`decode_permissive`].
    pub fn parse_json_column(&self, name: &str) -> AppResult<Vec<serde_json::Value>> {
        Ok(self.values(name)?.into_iter().map(decode_permissive).collect())
    }
}

/// Apply pandas-style header fixes: blank names become `Unnamed: <idx>` and
/// repeats get a `.N` suffix.
fn normalize_headers(raw: &[String]) -> Vec<String> {
    let mut seen: HashMap<String, usize> = HashMap::new();
    let mut names = Vec::with_capacity(raw.len());

    for (idx, header) in raw.iter().enumerate() {
        let base = if header.is_empty() {
            format!("Unnamed: {}", idx)
        } else {
            header.clone()
        };

        let mut name = base.clone();
        while let Some(count) = seen.get_mut(&name) {
            *count += 1;
            name = format!("{}.{}", base, count);
        }
        seen.insert(name.clone(), 0);
        names.push(name);
    }

    names
}

fn parse_bool(field: &str) -> Option<bool> {
    match field.to_ascii_lowercase().as_str() {
        "true" => Some(true),
        "false" => Some(false),
        _ => None,
    }
}

fn infer_kind<'a>(fields: impl Iterator<Item = &'a str>) -> ColumnKind {
    let mut integer = true;
    let mut float = true;
    let mut boolean = true;
    let mut any = false;

    for field in fields.map(str::trim).filter(|f| !f.is_empty()) {
        any = true;
        integer &= field.parse::<i64>().is_ok();
        float &= field.parse::<f64>().is_ok();
        boolean &= parse_bool(field).is_some();
        if !integer && !float && !boolean {
            break;
        }
    }

    match (any, integer, float, boolean) {
        (false, ..) => ColumnKind::Text,
        (true, true, _, _) => ColumnKind::Integer,
        (true, false, true, _) => ColumnKind::Float,
        (true, false, false, true) => ColumnKind::Boolean,
        _ => ColumnKind::Text,
    }
}

fn parse_cell(field: &str, kind: ColumnKind) -> CellValue {
    let trimmed = field.trim();
    if trimmed.is_empty() {
        return CellValue::Null;
    }
    match kind {
        ColumnKind::Integer => trimmed.parse().map(CellValue::Integer).unwrap_or(CellValue::Null),
        ColumnKind::Float => trimmed.parse().map(CellValue::Float).unwrap_or(CellValue::Null),
        ColumnKind::Boolean => parse_bool(trimmed).map(CellValue::Boolean).unwrap_or(CellValue::Null),
        ColumnKind::Text => CellValue::Text(field.to_string()),
    }
}
