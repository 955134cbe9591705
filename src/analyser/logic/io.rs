use super::frame::TabularFrame;
use super::types::Cell;
use crate::error::{AnalyzerError, Result, ResultExt as _};
use calamine::{Data, Reader as _};
use polars::prelude::*;
use std::io::Cursor;
use std::str::FromStr;

/// Spellings that mean "no value" in uploaded tables.
pub const NA_TOKENS: &[&str] = &["", "NA", "N/A", "NaN", "nan", "null", "NULL", "None", "#N/A"];

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Format {
    Csv,
    Xlsx,
}

impl Format {
    /// Format implied by a filename's extension.
    pub fn from_filename(filename: &str) -> Result<Self> {
        let ext = std::path::Path::new(filename)
            .extension()
            .and_then(|s| s.to_str())
            .unwrap_or("");
        ext.parse()
    }
}

impl FromStr for Format {
    type Err = AnalyzerError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().trim_start_matches('.').to_lowercase().as_str() {
            "csv" => Ok(Self::Csv),
            "xlsx" | "xls" => Ok(Self::Xlsx),
            other => Err(AnalyzerError::Parse(format!(
                "Unsupported file format: '{other}'. Please upload CSV or Excel files."
            ))),
        }
    }
}

pub fn text_cell(raw: &str) -> Cell {
    let trimmed = raw.trim();
    if NA_TOKENS.contains(&trimmed) {
        Cell::Missing
    } else {
        Cell::Text(trimmed.to_owned())
    }
}

/// Parses uploaded bytes into a frame.
pub fn load_frame(bytes: &[u8], format: Format) -> Result<TabularFrame> {
    let (headers, rows) = match format {
        Format::Csv => read_csv(bytes).context("Failed to read CSV")?,
        Format::Xlsx => read_workbook(bytes).context("Failed to read workbook")?,
    };

    for (idx, name) in headers.iter().enumerate() {
        if name.trim().is_empty() {
            return Err(AnalyzerError::Parse(format!(
                "Header cell {} is empty",
                idx + 1
            )));
        }
    }
    if rows.is_empty() {
        return Err(AnalyzerError::EmptyFrame(
            "Uploaded file contains no data rows".to_owned(),
        ));
    }

    TabularFrame::from_rows(headers, rows)
}

fn read_csv(bytes: &[u8]) -> Result<(Vec<String>, Vec<Vec<Cell>>)> {
    // The header is read as an ordinary row so duplicate names reach the
    // frame builder instead of being renamed. Every cell arrives as text.
    let df = CsvReadOptions::default()
        .with_has_header(false)
        .with_infer_schema_length(Some(0))
        .into_reader_with_file_handle(Cursor::new(bytes.to_vec()))
        .finish()?;

    let mut table: Vec<Vec<Option<String>>> = vec![Vec::with_capacity(df.width()); df.height()];
    for column in df.get_columns() {
        let series = column.as_materialized_series().cast(&DataType::String)?;
        for (row, value) in series.str()?.into_iter().enumerate() {
            if let Some(cells) = table.get_mut(row) {
                cells.push(value.map(str::to_owned));
            }
        }
    }

    let mut rows = table.into_iter();
    let headers = rows
        .next()
        .ok_or_else(|| AnalyzerError::Parse("File has no header row".to_owned()))?
        .into_iter()
        .map(|name| name.unwrap_or_default().trim().to_owned())
        .collect();
    let rows = rows
        .map(|row| {
            row.iter()
                .map(|value| value.as_deref().map_or(Cell::Missing, text_cell))
                .collect()
        })
        .collect();
    Ok((headers, rows))
}

fn read_workbook(bytes: &[u8]) -> Result<(Vec<String>, Vec<Vec<Cell>>)> {
    let mut workbook = calamine::open_workbook_auto_from_rs(Cursor::new(bytes.to_vec()))?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| AnalyzerError::Parse("Workbook has no worksheets".to_owned()))??;

    let mut sheet_rows = range.rows();
    let headers = sheet_rows
        .next()
        .ok_or_else(|| AnalyzerError::Parse("Worksheet is empty".to_owned()))?
        .iter()
        .map(|cell| cell.to_string().trim().to_owned())
        .collect();

    let rows = sheet_rows
        .map(|row| row.iter().map(workbook_cell).collect::<Vec<_>>())
        .filter(|row| !row.iter().all(Cell::is_missing))
        .collect();
    Ok((headers, rows))
}

fn workbook_cell(data: &Data) -> Cell {
    match data {
        Data::Empty | Data::Error(_) => Cell::Missing,
        Data::Int(v) => Cell::Number(*v as f64),
        Data::Float(v) if v.is_finite() => Cell::Number(*v),
        Data::String(s) => text_cell(s),
        other => text_cell(&other.to_string()),
    }
}
