//! File parsing functionality for survey spreadsheets
//!
//! This module handles loading the first worksheet of a workbook into a [`SurveyTable`].

use crate::common::{Cell, SurveyTable};
use calamine::{open_workbook_auto, Data, Range, Reader};
use chrono::NaiveDateTime;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

/// Errors that can occur while loading the survey file
#[derive(Error, Debug)]
pub enum DataSourceError {
    #[error("Input file does not exist: {0}")]
    Missing(PathBuf),

    #[error("Failed to read workbook {path}: {source}")]
    Workbook {
        path: PathBuf,
        #[source]
        source: calamine::Error,
    },

    #[error("Workbook {0} has no worksheets")]
    NoWorksheet(PathBuf),

    #[error("Worksheet '{sheet}' in {path} has no header row")]
    NoHeader { path: PathBuf, sheet: String },
}

type Result<T> = core::result::Result<T, DataSourceError>;

/// Load the survey responses from a spreadsheet
///
/// This function:
/// - Opens the workbook (xlsx, xlsm, xls or ods, chosen by extension)
/// - Reads the first worksheet
/// - Uses the first row as the header and every later non-blank row as a response
///
/// # Arguments
/// * `file_path` - Path to the spreadsheet
///
/// # Returns
/// * `Ok(SurveyTable)` - Successfully parsed responses
/// * `Err(DataSourceError)` - If the file is missing, unreadable or has no header
pub fn load_survey(file_path: &Path) -> Result<SurveyTable> {
    if !file_path.exists() {
        return Err(DataSourceError::Missing(file_path.to_path_buf()));
    }

    let workbook_error = |source| DataSourceError::Workbook {
        path: file_path.to_path_buf(),
        source,
    };

    let mut workbook = open_workbook_auto(file_path).map_err(workbook_error)?;
    let sheet = workbook
        .sheet_names()
        .first()
        .cloned()
        .ok_or_else(|| DataSourceError::NoWorksheet(file_path.to_path_buf()))?;

    let range = workbook.worksheet_range(&sheet).map_err(workbook_error)?;
    let table = table_from_range(&range).ok_or_else(|| DataSourceError::NoHeader {
        path: file_path.to_path_buf(),
        sheet: sheet.clone(),
    })?;

    info!(
        path = %file_path.display(),
        sheet = %sheet,
        columns = table.columns().len(),
        rows = table.len(),
        "Loaded survey responses"
    );
    debug!(columns = ?table.columns(), "Survey columns");

    Ok(table)
}

/// Converts a worksheet range into a table; `None` when there is no header row
fn table_from_range(range: &Range<Data>) -> Option<SurveyTable> {
    let mut rows = range.rows();
    let header = rows.next()?;
    if header.iter().all(|cell| matches!(cell, Data::Empty)) {
        return None;
    }

    let columns = header
        .iter()
        .enumerate()
        .map(|(index, cell)| header_name(index, cell))
        .collect();

    let body = rows
        .map(|row| row.iter().map(to_cell).collect::<Vec<_>>())
        .filter(|row| !row.iter().all(Cell::is_missing))
        .collect();

    Some(SurveyTable::new(columns, body))
}

fn header_name(index: usize, cell: &Data) -> String {
    match to_cell(cell) {
        Cell::Empty => format!("Unnamed: {}", index),
        other => other.to_string(),
    }
}

fn to_cell(data: &Data) -> Cell {
    match data {
        Data::Empty | Data::Error(_) => Cell::Empty,
        Data::String(text) if text.trim().is_empty() => Cell::Empty,
        Data::String(text) => Cell::Text(text.clone()),
        Data::Int(value) => Cell::Number(*value as f64),
        Data::Float(value) => Cell::Number(*value),
        Data::Bool(value) => Cell::Bool(*value),
        Data::DateTime(value) => match value.as_datetime() {
            Some(datetime) => Cell::DateTime(datetime),
            None => Cell::Number(value.as_f64()),
        },
        Data::DateTimeIso(text) => match text.parse::<NaiveDateTime>() {
            Ok(datetime) => Cell::DateTime(datetime),
            Err(_) => Cell::Text(text.clone()),
        },
        Data::DurationIso(text) => Cell::Text(text.clone()),
    }
}
