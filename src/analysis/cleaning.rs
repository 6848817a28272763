//! Response cleaning functionality
//!
//! This module derives the response duration of each respondent and narrows the raw
//! responses down to the complete, time-valid subset used by every later stage.

use crate::common::{Cell, SurveyTable, TableError};
use crate::config::{AnalysisConfig, DisplayLabels, SurveyColumns};
use chrono::NaiveDateTime;
use thiserror::Error;
use tracing::{debug, info};

/// Accepted spellings of the submission timestamp when it is stored as text
const SUBMISSION_FORMATS: [&str; 3] = [
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y/%m/%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
];

/// Errors that can occur while cleaning the responses
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CleaningError {
    #[error("Malformed timestamp in column '{column}' at row {row}: '{value}'")]
    MalformedTimestamp {
        column: String,
        row: usize,
        value: String,
    },

    #[error(transparent)]
    Table(#[from] TableError),
}

type Result<T> = core::result::Result<T, CleaningError>;

/// Inclusive range of accepted response durations, in seconds
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DurationWindow {
    pub min_seconds: f64,
    pub max_seconds: f64,
}

impl DurationWindow {
    pub fn new(min_seconds: f64, max_seconds: f64) -> Self {
        Self {
            min_seconds,
            max_seconds,
        }
    }

    pub fn from_config(config: &AnalysisConfig) -> Self {
        Self::new(
            f64::from(config.min_response_seconds),
            f64::from(config.max_response_seconds()),
        )
    }

    pub fn contains(&self, seconds: f64) -> bool {
        (self.min_seconds..=self.max_seconds).contains(&seconds)
    }
}

/// Respondent counts after each cleaning stage
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CleaningSummary {
    pub raw: usize,
    pub complete: usize,
    pub valid: usize,
}

impl CleaningSummary {
    /// Share of raw respondents that survived cleaning, in percent
    pub fn valid_share(&self) -> f64 {
        if self.raw == 0 {
            return 0.0;
        }
        100.0 * self.valid as f64 / self.raw as f64
    }

    /// Report lines auditing the respondent counts
    pub fn audit_lines(&self, labels: &DisplayLabels) -> [String; 3] {
        [
            format!("# {}: {}", labels.raw_count, self.raw),
            format!("# {}: {}", labels.complete_count, self.complete),
            format!(
                "\n# {}: {} ({}{:.1}%)",
                labels.analysed_count,
                self.valid,
                labels.analysed_share,
                self.valid_share()
            ),
        ]
    }
}

/// The cleaned datasets
#[derive(Debug, Clone)]
pub struct CleanedSurvey {
    /// Rows without missing values, duration column included
    pub complete: SurveyTable,
    /// Complete rows whose duration lies within the window
    pub valid: SurveyTable,
    pub summary: CleaningSummary,
}

/// Runs the cleaning stages in order: duration, completeness, duration window
///
/// # Arguments
/// * `table` - Raw responses as loaded
/// * `config` - Column names and duration window
///
/// # Returns
/// * `Ok(CleanedSurvey)` - Complete and time-valid tables with their counts
/// * `Err(CleaningError)` - If a timestamp column is missing or malformed
pub fn clean(table: &SurveyTable, config: &AnalysisConfig) -> Result<CleanedSurvey> {
    let with_duration = compute_duration(table, &config.columns)?;
    let complete = drop_incomplete(&with_duration);

    let window = DurationWindow::from_config(config);
    let valid = filter_by_duration(&complete, &config.columns.duration, window)?;

    let summary = CleaningSummary {
        raw: table.len(),
        complete: complete.len(),
        valid: valid.len(),
    };
    info!(
        raw = summary.raw,
        complete = summary.complete,
        valid = summary.valid,
        min_seconds = window.min_seconds,
        max_seconds = window.max_seconds,
        "Cleaned survey responses"
    );

    Ok(CleanedSurvey {
        complete,
        valid,
        summary,
    })
}

/// Appends the response duration in seconds (submission minus start)
///
/// Rows missing either timestamp get a missing duration.
pub fn compute_duration(table: &SurveyTable, columns: &SurveyColumns) -> Result<SurveyTable> {
    let start_formats = [columns.start_timestamp_format.as_str()];
    let starts = table.column(&columns.start_timestamp)?;
    let submissions = table.column(&columns.submission_timestamp)?;

    let durations = starts
        .zip(submissions)
        .enumerate()
        .map(|(row, (start, submission))| {
            let start = parse_timestamp(start, &start_formats, &columns.start_timestamp, row)?;
            let submission = parse_timestamp(
                submission,
                &SUBMISSION_FORMATS,
                &columns.submission_timestamp,
                row,
            )?;

            Ok(match (start, submission) {
                (Some(start), Some(submission)) => {
                    let elapsed = submission - start;
                    Cell::Number(elapsed.num_milliseconds() as f64 / 1000.0)
                }
                _ => Cell::Empty,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(table.with_column(&columns.duration, durations)?)
}

/// Removes every row that holds at least one missing value
pub fn drop_incomplete(table: &SurveyTable) -> SurveyTable {
    let complete = table.retain_rows(|row| !row.iter().any(Cell::is_missing));
    debug!(
        before = table.len(),
        after = complete.len(),
        "Dropped incomplete responses"
    );
    complete
}

/// Keeps rows whose duration lies within `window`, bounds included
pub fn filter_by_duration(
    table: &SurveyTable,
    column: &str,
    window: DurationWindow,
) -> Result<SurveyTable> {
    let position = table.column_index(column)?;
    Ok(table.retain_rows(|row| {
        row[position]
            .as_f64()
            .is_some_and(|seconds| window.contains(seconds))
    }))
}

/// Reads a timestamp cell; `Ok(None)` for a missing value
fn parse_timestamp(
    cell: &Cell,
    formats: &[&str],
    column: &str,
    row: usize,
) -> Result<Option<NaiveDateTime>> {
    let text = match cell {
        _ if cell.is_missing() => return Ok(None),
        Cell::DateTime(value) => return Ok(Some(*value)),
        Cell::Text(text) => text.trim().to_string(),
        other => other.to_string(),
    };

    formats
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(&text, format).ok())
        .map(Some)
        .ok_or_else(|| CleaningError::MalformedTimestamp {
            column: column.to_string(),
            row,
            value: text,
        })
}
