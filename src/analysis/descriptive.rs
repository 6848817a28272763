//! Descriptive statistics for numeric survey columns
//!
//! This module computes the location, spread and normality summary of a column and
//! writes it to the report as a single line.

use super::normality::{shapiro_wilk, ShapiroWilk, MAX_CALIBRATED_SAMPLE_SIZE, MIN_SAMPLE_SIZE};
use crate::common::{Report, SurveyTable, TableError};
use crate::config::DisplayLabels;
use std::io::Write;
use thiserror::Error;
use tracing::warn;

/// Errors raised by the statistics themselves
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StatsError {
    #[error("column has no values")]
    EmptyColumn,

    #[error("column has {len} values but at least {required} are needed for the normality test")]
    InsufficientData { len: usize, required: usize },
}

/// Errors that can occur while describing a table column
#[derive(Error, Debug)]
pub enum DescriptiveError {
    #[error(transparent)]
    Table(#[from] TableError),

    #[error("Column '{column}': {source}")]
    Stats {
        column: String,
        #[source]
        source: StatsError,
    },

    #[error("Failed to write report: {0}")]
    Report(#[from] std::io::Error),
}

type Result<T> = core::result::Result<T, DescriptiveError>;

/// Summary statistics of one numeric sample
#[derive(Debug, Clone, PartialEq)]
pub struct DescriptiveSummary {
    pub count: usize,
    pub mean: f64,
    /// Population standard deviation (divides by n)
    pub std_dev: f64,
    pub median: f64,
    pub q1: f64,
    pub q3: f64,
    pub min: f64,
    pub max: f64,
    pub normality: ShapiroWilk,
}

impl DescriptiveSummary {
    /// Computes the summary of `values`
    ///
    /// # Returns
    /// * `Ok(DescriptiveSummary)` - For samples of at least three values
    /// * `Err(StatsError)` - If the sample is empty or too small for the normality test
    pub fn from_values(values: &[f64]) -> core::result::Result<Self, StatsError> {
        let count = values.len();
        if count == 0 {
            return Err(StatsError::EmptyColumn);
        }

        let normality = shapiro_wilk(values).ok_or(StatsError::InsufficientData {
            len: count,
            required: MIN_SAMPLE_SIZE,
        })?;

        if count > MAX_CALIBRATED_SAMPLE_SIZE {
            warn!(
                count,
                "Shapiro-Wilk p-value may be inaccurate for more than {} values",
                MAX_CALIBRATED_SAMPLE_SIZE
            );
        }

        let mut sorted = values.to_vec();
        sorted.sort_by(f64::total_cmp);

        let mean = values.iter().sum::<f64>() / count as f64;
        let variance = values
            .iter()
            .map(|value| (value - mean) * (value - mean))
            .sum::<f64>()
            / count as f64;

        Ok(Self {
            count,
            mean,
            std_dev: variance.sqrt(),
            median: percentile(&sorted, 50.0),
            q1: percentile(&sorted, 25.0),
            q3: percentile(&sorted, 75.0),
            min: sorted[0],
            max: sorted[count - 1],
            normality,
        })
    }

    /// Formats the summary as a report line
    ///
    /// # Arguments
    /// * `name` - Line prefix, see [`summary_name`]
    /// * `labels` - Display strings for the statistic groups
    pub fn format_line(&self, name: &str, labels: &DisplayLabels) -> String {
        format!(
            "{} {}, {:.1} ({:.1}); {}, {:.1} ({:.1}–{:.1}); {}, {:.1}–{:.1}; {}, {:.3}  ",
            name,
            labels.mean_sd,
            self.mean,
            self.std_dev,
            labels.median_iqr,
            self.median,
            self.q1,
            self.q3,
            labels.min_max,
            self.min,
            self.max,
            labels.normality,
            self.normality.p_value
        )
    }
}

/// Percentile of an ascending sample using linear interpolation between closest ranks
///
/// # Arguments
/// * `sorted` - Non-empty sample sorted in ascending order
/// * `percent` - Percentile in 0-100
pub fn percentile(sorted: &[f64], percent: f64) -> f64 {
    debug_assert!(!sorted.is_empty());

    let rank = (percent / 100.0).clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lower = rank.floor() as usize;
    let upper = rank.ceil() as usize;
    let fraction = rank - lower as f64;

    sorted[lower] + (sorted[upper] - sorted[lower]) * fraction
}

/// Prefix of a summary line: `## {column}`, or `{label}: ` when a label is given
pub fn summary_name(column: &str, label: Option<&str>) -> String {
    match label {
        Some(label) => format!("{}: ", label),
        None => format!("## {}", column),
    }
}

/// Writes the summary line of a numeric column to the report
///
/// # Arguments
/// * `report` - Report stream
/// * `table` - Cleaned responses
/// * `column` - Column to describe
/// * `label` - Optional display label replacing the column name
/// * `labels` - Display strings
///
/// # Returns
/// * `Ok(Vec<f64>)` - The column's values in row order, for reuse by the caller
/// * `Err(DescriptiveError)` - If the column is missing, non-numeric or too small
pub fn describe_column<W: Write>(
    report: &mut Report<W>,
    table: &SurveyTable,
    column: &str,
    label: Option<&str>,
    labels: &DisplayLabels,
) -> Result<Vec<f64>> {
    let values = table.numeric_column(column)?;
    let summary =
        DescriptiveSummary::from_values(&values).map_err(|source| DescriptiveError::Stats {
            column: column.to_string(),
            source,
        })?;

    report.line(summary.format_line(&summary_name(column, label), labels))?;
    Ok(values)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::Cell;
    use rstest::rstest;

    fn single_column(name: &str, values: &[f64]) -> SurveyTable {
        SurveyTable::new(
            vec![name.to_string()],
            values.iter().map(|value| vec![Cell::Number(*value)]).collect(),
        )
    }

    #[test]
    fn summary_of_one_to_five() {
        let summary = DescriptiveSummary::from_values(&[1.0, 2.0, 3.0, 4.0, 5.0]).unwrap();

        assert_eq!(summary.count, 5);
        assert_eq!(summary.mean, 3.0);
        assert_eq!(summary.median, 3.0);
        assert_eq!(summary.q1, 2.0);
        assert_eq!(summary.q3, 4.0);
        assert_eq!(summary.min, 1.0);
        assert_eq!(summary.max, 5.0);
        assert!((summary.std_dev - 2.0f64.sqrt()).abs() < 1e-12);
    }

    #[test]
    fn report_line_for_one_to_five() {
        let table = single_column("好感度1", &[1.0, 2.0, 3.0, 4.0, 5.0]);
        let mut report = Report::new(Vec::new());

        let values =
            describe_column(&mut report, &table, "好感度1", None, &DisplayLabels::default())
                .unwrap();

        assert_eq!(values, vec![1.0, 2.0, 3.0, 4.0, 5.0]);
        assert_eq!(
            report.transcript(),
            "## 好感度1 平均 (標準偏差), 3.0 (1.4); 中央値 (Q1–Q3), 3.0 (2.0–4.0); \
             最小値–最大値, 1.0–5.0; S-W test p-value, 0.967  \n"
        );
    }

    #[test]
    fn label_replaces_column_name() {
        let table = single_column("好感度1", &[1.0, 2.0, 3.0, 4.0, 5.0]);
        let mut report = Report::new(Vec::new());

        describe_column(
            &mut report,
            &table,
            "好感度1",
            Some("公益行動条件"),
            &DisplayLabels::default(),
        )
        .unwrap();

        assert!(report.transcript().starts_with("公益行動条件:  平均 (標準偏差), 3.0"));
    }

    #[test]
    fn describing_twice_is_identical() {
        let table = single_column("x", &[3.0, 1.0, 4.0, 1.0, 5.0, 9.0, 2.0, 6.0]);
        let labels = DisplayLabels::default();
        let mut report = Report::new(Vec::new());

        let first = describe_column(&mut report, &table, "x", None, &labels).unwrap();
        let second = describe_column(&mut report, &table, "x", None, &labels).unwrap();

        assert_eq!(first, second);
        let lines: Vec<&str> = report.transcript().lines().collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0], lines[1]);
    }

    #[rstest]
    #[case::empty(&[], StatsError::EmptyColumn)]
    #[case::one(&[1.0], StatsError::InsufficientData { len: 1, required: 3 })]
    #[case::two(&[1.0, 2.0], StatsError::InsufficientData { len: 2, required: 3 })]
    fn small_samples_are_rejected(#[case] values: &[f64], #[case] expected: StatsError) {
        assert_eq!(DescriptiveSummary::from_values(values), Err(expected));
    }

    #[test]
    fn small_column_error_names_the_column() {
        let table = single_column("嫌悪感2", &[1.0, 2.0]);
        let mut report = Report::new(Vec::new());

        let error = describe_column(&mut report, &table, "嫌悪感2", None, &DisplayLabels::default())
            .unwrap_err();

        assert!(matches!(
            error,
            DescriptiveError::Stats { ref column, source: StatsError::InsufficientData { .. } }
                if column == "嫌悪感2"
        ));
        assert!(report.transcript().is_empty());
    }

    #[test]
    fn missing_column_is_a_table_error() {
        let table = single_column("x", &[1.0, 2.0, 3.0]);
        let mut report = Report::new(Vec::new());
        let error = describe_column(&mut report, &table, "y", None, &DisplayLabels::default())
            .unwrap_err();
        assert!(matches!(error, DescriptiveError::Table(TableError::MissingColumn(_))));
    }

    #[rstest]
    #[case(25.0, 1.75)]
    #[case(50.0, 2.5)]
    #[case(75.0, 3.25)]
    #[case(0.0, 1.0)]
    #[case(100.0, 4.0)]
    fn percentiles_interpolate_linearly(#[case] percent: f64, #[case] expected: f64) {
        assert_eq!(percentile(&[1.0, 2.0, 3.0, 4.0], percent), expected);
    }
}
