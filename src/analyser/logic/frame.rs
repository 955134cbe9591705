//! In-memory tabular data model.
//!
//! A [`TabularFrame`] is an ordered list of named, typed columns of equal
//! length. Frames are built once (from an upload or as the output of a
//! cleaning operator) and never mutated afterwards: every operator returns a
//! new frame.
//!
//! Column storage is decided by the classifier when the frame is built, so
//! the declared kind of a column always agrees with the classification of
//! its values:
//!
//! - a categorical column whose present values all parse as finite numbers
//!   is stored as numeric;
//! - a numeric column with no present value is stored as categorical.
//!
//! Numeric columns never hold NaN or infinities. Building a frame from a
//! column that does is an `InvalidParameter` error, so an operator whose
//! arithmetic overflows fails instead of blanking the column.

use super::classify::infer_kind;
use super::types::{Cell, ColumnKind, format_number, parse_number};
use crate::error::{AnalyzerError, Result};
use std::collections::HashSet;

#[derive(Clone, Debug, PartialEq)]
pub enum ColumnValues {
    Numeric(Vec<Option<f64>>),
    Categorical(Vec<Option<String>>),
}

#[derive(Clone, Debug, PartialEq)]
pub struct Column {
    name: String,
    values: ColumnValues,
}

impl Column {
    pub fn numeric(name: impl Into<String>, values: Vec<Option<f64>>) -> Self {
        Self {
            name: name.into(),
            values: ColumnValues::Numeric(values),
        }
    }

    pub fn categorical(name: impl Into<String>, values: Vec<Option<String>>) -> Self {
        Self {
            name: name.into(),
            values: ColumnValues::Categorical(values),
        }
    }

    /// Builds a column from raw cells, classifying it first.
    pub fn from_cells(name: impl Into<String>, cells: &[Cell]) -> Self {
        match infer_kind(cells.iter()) {
            ColumnKind::Numeric => {
                Self::numeric(name, cells.iter().map(Cell::as_number).collect())
            }
            ColumnKind::Categorical => {
                Self::categorical(name, cells.iter().map(Cell::as_text).collect())
            }
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> ColumnKind {
        match self.values {
            ColumnValues::Numeric(_) => ColumnKind::Numeric,
            ColumnValues::Categorical(_) => ColumnKind::Categorical,
        }
    }

    pub fn values(&self) -> &ColumnValues {
        &self.values
    }

    pub fn len(&self) -> usize {
        match &self.values {
            ColumnValues::Numeric(v) => v.len(),
            ColumnValues::Categorical(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Numeric values, or `None` for categorical columns.
    pub fn as_numeric(&self) -> Option<&[Option<f64>]> {
        match &self.values {
            ColumnValues::Numeric(v) => Some(v),
            ColumnValues::Categorical(_) => None,
        }
    }

    /// Non-missing numeric values in row order; empty for categorical columns.
    pub fn present_values(&self) -> Vec<f64> {
        self.as_numeric()
            .map(|v| v.iter().flatten().copied().collect())
            .unwrap_or_default()
    }

    pub fn cell(&self, row: usize) -> Cell {
        match &self.values {
            ColumnValues::Numeric(v) => v
                .get(row)
                .copied()
                .flatten()
                .map_or(Cell::Missing, Cell::Number),
            ColumnValues::Categorical(v) => v
                .get(row)
                .cloned()
                .flatten()
                .map_or(Cell::Missing, Cell::Text),
        }
    }

    pub fn cells(&self) -> impl Iterator<Item = Cell> + '_ {
        (0..self.len()).map(|row| self.cell(row))
    }

    pub fn is_missing(&self, row: usize) -> bool {
        match &self.values {
            ColumnValues::Numeric(v) => v.get(row).is_none_or(Option::is_none),
            ColumnValues::Categorical(v) => v.get(row).is_none_or(Option::is_none),
        }
    }

    pub fn null_count(&self) -> usize {
        (0..self.len()).filter(|&row| self.is_missing(row)).count()
    }

    /// True when every present value is numeric (also for all-missing columns).
    pub fn is_numeric_compatible(&self) -> bool {
        match &self.values {
            ColumnValues::Numeric(_) => true,
            ColumnValues::Categorical(v) => v.iter().all(Option::is_none),
        }
    }

    /// Label of a cell, used for grouping and display.
    pub fn label(&self, row: usize) -> Option<String> {
        match &self.values {
            ColumnValues::Numeric(v) => v.get(row).copied().flatten().map(format_number),
            ColumnValues::Categorical(v) => v.get(row).cloned().flatten(),
        }
    }

    pub fn json_value(&self, row: usize) -> serde_json::Value {
        match self.cell(row) {
            Cell::Missing => serde_json::Value::Null,
            Cell::Number(v) => serde_json::json!(v),
            Cell::Text(s) => serde_json::Value::String(s),
        }
    }

    /// New column holding only `rows`, in the given order.
    pub fn take_rows(&self, rows: &[usize]) -> Self {
        let values = match &self.values {
            ColumnValues::Numeric(v) => {
                ColumnValues::Numeric(rows.iter().map(|&r| v.get(r).copied().flatten()).collect())
            }
            ColumnValues::Categorical(v) => ColumnValues::Categorical(
                rows.iter().map(|&r| v.get(r).cloned().flatten()).collect(),
            ),
        };
        Self {
            name: self.name.clone(),
            values,
        }
    }

    /// Re-stores the column according to the classification of its values.
    fn normalized(self) -> Self {
        let kind = infer_kind(self.cells());
        match (self.kind(), kind) {
            // All-missing; `new` has already rejected non-finite values.
            (ColumnKind::Numeric, ColumnKind::Categorical) => {
                let len = self.len();
                Self::categorical(self.name, vec![None; len])
            }
            (ColumnKind::Categorical, ColumnKind::Numeric) => {
                let values = match &self.values {
                    ColumnValues::Categorical(v) => v
                        .iter()
                        .map(|c| c.as_deref().and_then(parse_number))
                        .collect(),
                    ColumnValues::Numeric(v) => v.clone(),
                };
                Self::numeric(self.name, values)
            }
            _ => self,
        }
    }
}

/// Immutable table with equal-length, uniquely named columns.
#[derive(Clone, Debug, PartialEq)]
pub struct TabularFrame {
    columns: Vec<Column>,
    rows: usize,
}

impl TabularFrame {
    /// Validates shape and name uniqueness, then normalizes column storage.
    pub fn new(columns: Vec<Column>) -> Result<Self> {
        let rows = columns.first().map_or(0, Column::len);
        let mut seen = HashSet::new();
        for column in &columns {
            if column.len() != rows {
                return Err(AnalyzerError::Parse(format!(
                    "Column '{}' has {} rows, expected {rows}",
                    column.name(),
                    column.len()
                )));
            }
            if column.name().trim().is_empty() {
                return Err(AnalyzerError::Parse("Column names must not be empty".to_owned()));
            }
            if !seen.insert(column.name().to_owned()) {
                return Err(AnalyzerError::Parse(format!(
                    "Duplicate column name '{}'",
                    column.name()
                )));
            }
            if column.present_values().iter().any(|v| !v.is_finite()) {
                return Err(AnalyzerError::InvalidParameter(format!(
                    "Column '{}' contains non-finite values",
                    column.name()
                )));
            }
        }

        Ok(Self {
            columns: columns.into_iter().map(Column::normalized).collect(),
            rows,
        })
    }

    /// Builds a frame from a header row and row-major cells.
    ///
    /// Short rows are padded with missing cells; extra cells are an error.
    pub fn from_rows(headers: Vec<String>, rows: Vec<Vec<Cell>>) -> Result<Self> {
        let width = headers.len();
        let mut by_column: Vec<Vec<Cell>> = vec![Vec::with_capacity(rows.len()); width];
        for (idx, row) in rows.into_iter().enumerate() {
            if row.len() > width {
                return Err(AnalyzerError::Parse(format!(
                    "Row {} has {} cells but the header has {width}",
                    idx + 1,
                    row.len()
                )));
            }
            let mut cells = row.into_iter();
            for column in &mut by_column {
                column.push(cells.next().unwrap_or(Cell::Missing));
            }
        }

        let columns = headers
            .into_iter()
            .zip(by_column)
            .map(|(name, cells)| Column::from_cells(name, &cells))
            .collect();
        Self::new(columns)
    }

    pub fn height(&self) -> usize {
        self.rows
    }

    pub fn width(&self) -> usize {
        self.columns.len()
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column_names(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.name().to_owned()).collect()
    }

    pub fn numeric_column_names(&self) -> Vec<String> {
        self.columns
            .iter()
            .filter(|c| c.kind() == ColumnKind::Numeric)
            .map(|c| c.name().to_owned())
            .collect()
    }

    pub fn column(&self, name: &str) -> Result<&Column> {
        self.columns
            .iter()
            .find(|c| c.name() == name)
            .ok_or_else(|| AnalyzerError::InvalidColumn(format!("Column '{name}' not found")))
    }

    /// Values of a numeric column; `InvalidColumn` if absent or categorical.
    pub fn numeric_column(&self, name: &str) -> Result<&[Option<f64>]> {
        self.column(name)?.as_numeric().ok_or_else(|| {
            AnalyzerError::InvalidColumn(format!("Column '{name}' is not numeric"))
        })
    }

    pub fn row_has_missing(&self, row: usize) -> bool {
        self.columns.iter().any(|c| c.is_missing(row))
    }

    /// Number of rows with at least one missing cell.
    pub fn rows_with_missing(&self) -> usize {
        (0..self.rows).filter(|&r| self.row_has_missing(r)).count()
    }

    /// Frame holding only `rows`, order preserved. Fails on an empty selection.
    pub fn take_rows(&self, rows: &[usize]) -> Result<Self> {
        if rows.is_empty() {
            return Err(AnalyzerError::EmptyFrame(
                "Operation would remove every row".to_owned(),
            ));
        }
        Self::new(self.columns.iter().map(|c| c.take_rows(rows)).collect())
    }

    /// Frame with the named columns swapped for `replacements`.
    pub fn with_columns(&self, replacements: Vec<Column>) -> Result<Self> {
        let mut columns = self.columns.clone();
        for replacement in replacements {
            let slot = columns
                .iter_mut()
                .find(|c| c.name() == replacement.name())
                .ok_or_else(|| {
                    AnalyzerError::InvalidColumn(format!(
                        "Column '{}' not found",
                        replacement.name()
                    ))
                })?;
            *slot = replacement;
        }
        Self::new(columns)
    }

    /// First `n` rows as JSON records keyed by column name.
    pub fn preview(&self, n: usize) -> Vec<serde_json::Map<String, serde_json::Value>> {
        (0..self.rows.min(n))
            .map(|row| {
                self.columns
                    .iter()
                    .map(|c| (c.name().to_owned(), c.json_value(row)))
                    .collect()
            })
            .collect()
    }
}
