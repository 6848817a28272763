//! In-memory survey table
//!
//! A [`SurveyTable`] is an ordered list of column names plus rows of [`Cell`]s, as loaded
//! from the first worksheet of a spreadsheet. Tables are never edited in place: every
//! transform borrows the source table and returns a new one, so each pipeline stage keeps
//! its input intact.

use chrono::NaiveDateTime;
use std::collections::HashMap;
use std::fmt;
use thiserror::Error;

/// Errors raised when accessing columns of a [`SurveyTable`]
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TableError {
    #[error("Column not found: '{0}'")]
    MissingColumn(String),

    #[error("Column '{column}' holds a non-numeric value at row {row}: {value}")]
    NonNumeric {
        column: String,
        row: usize,
        value: String,
    },

    #[error("Column '{column}' has {actual} values but the table has {expected} rows")]
    LengthMismatch {
        column: String,
        expected: usize,
        actual: usize,
    },
}

type Result<T> = core::result::Result<T, TableError>;

/// A single spreadsheet value
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    /// Blank cell, empty string or spreadsheet error; counts as a missing value
    Empty,
    Text(String),
    Number(f64),
    Bool(bool),
    DateTime(NaiveDateTime),
}

impl Cell {
    /// Returns true when the cell counts as a missing value.
    ///
    /// `NaN` numbers are treated as missing.
    pub fn is_missing(&self) -> bool {
        match self {
            Cell::Empty => true,
            Cell::Number(value) => value.is_nan(),
            _ => false,
        }
    }

    /// Returns the numeric value of the cell, if it has one
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Cell::Number(value) => Some(*value),
            Cell::Bool(value) => Some(if *value { 1.0 } else { 0.0 }),
            Cell::Text(text) => text.trim().parse::<f64>().ok(),
            _ => None,
        }
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cell::Empty => Ok(()),
            Cell::Text(text) => f.write_str(text),
            // Whole numbers print without a fractional part so that integer-typed
            // timestamps and categorical codes keep their original spelling.
            Cell::Number(value) if value.fract() == 0.0 && value.abs() < 1e15 => {
                write!(f, "{}", *value as i64)
            }
            Cell::Number(value) => write!(f, "{}", value),
            Cell::Bool(value) => write!(f, "{}", value),
            Cell::DateTime(value) => write!(f, "{}", value.format("%Y-%m-%d %H:%M:%S")),
        }
    }
}

/// Ordered, header-keyed table of survey responses
#[derive(Debug, Clone, PartialEq)]
pub struct SurveyTable {
    columns: Vec<String>,
    index: HashMap<String, usize>,
    rows: Vec<Vec<Cell>>,
}

impl SurveyTable {
    /// Creates a table from header names and rows.
    ///
    /// Rows shorter than the header are padded with [`Cell::Empty`]; longer rows are
    /// truncated. When a header name repeats, lookups resolve to its first occurrence.
    pub fn new(columns: Vec<String>, rows: Vec<Vec<Cell>>) -> Self {
        let width = columns.len();
        let mut index = HashMap::with_capacity(width);
        for (position, name) in columns.iter().enumerate() {
            index.entry(name.clone()).or_insert(position);
        }

        let rows = rows
            .into_iter()
            .map(|mut row| {
                row.resize(width, Cell::Empty);
                row
            })
            .collect();

        Self {
            columns,
            index,
            rows,
        }
    }

    /// Header names in sheet order
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Number of rows (respondents)
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Position of the named column
    pub fn column_index(&self, name: &str) -> Result<usize> {
        self.index
            .get(name)
            .copied()
            .ok_or_else(|| TableError::MissingColumn(name.to_string()))
    }

    /// Iterates over the cells of the named column in row order
    pub fn column(&self, name: &str) -> Result<impl Iterator<Item = &Cell> + '_> {
        let position = self.column_index(name)?;
        Ok(self.rows.iter().map(move |row| &row[position]))
    }

    /// Reads the named column as numbers.
    ///
    /// Missing cells are an error as well; callers are expected to run this on a
    /// table that already had incomplete rows dropped.
    pub fn numeric_column(&self, name: &str) -> Result<Vec<f64>> {
        self.column(name)?
            .enumerate()
            .map(|(row, cell)| {
                cell.as_f64()
                    .filter(|value| !value.is_nan())
                    .ok_or_else(|| TableError::NonNumeric {
                        column: name.to_string(),
                        row,
                        value: cell.to_string(),
                    })
            })
            .collect()
    }

    /// Reads the named column as display strings
    pub fn text_column(&self, name: &str) -> Result<Vec<String>> {
        Ok(self.column(name)?.map(ToString::to_string).collect())
    }

    /// Rows of the table
    pub fn rows(&self) -> &[Vec<Cell>] {
        &self.rows
    }

    /// Returns a copy of the table with `values` appended as a new column.
    ///
    /// If the column already exists its values are replaced instead.
    pub fn with_column(&self, name: &str, values: Vec<Cell>) -> Result<SurveyTable> {
        if values.len() != self.rows.len() {
            return Err(TableError::LengthMismatch {
                column: name.to_string(),
                expected: self.rows.len(),
                actual: values.len(),
            });
        }

        let mut columns = self.columns.clone();
        let existing = self.index.get(name).copied();
        if existing.is_none() {
            columns.push(name.to_string());
        }

        let rows = self
            .rows
            .iter()
            .zip(values)
            .map(|(row, value)| {
                let mut row = row.clone();
                match existing {
                    Some(position) => row[position] = value,
                    None => row.push(value),
                }
                row
            })
            .collect();

        Ok(SurveyTable::new(columns, rows))
    }

    /// Returns a copy of the table keeping only rows for which `keep` returns true
    pub fn retain_rows<F>(&self, mut keep: F) -> SurveyTable
    where
        F: FnMut(&[Cell]) -> bool,
    {
        SurveyTable {
            columns: self.columns.clone(),
            index: self.index.clone(),
            rows: self
                .rows
                .iter()
                .filter(|row| keep(row))
                .cloned()
                .collect(),
        }
    }
}
