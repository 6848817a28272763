//! Figure generation functionality
//!
//! This module turns cleaned responses into the saved figures: the response-duration
//! histogram and one boxplot per rating question, the latter preceded by the
//! descriptive statistics of each condition.

use super::descriptive::{describe_column, DescriptiveError};
use crate::common::plots::BoxplotSpec;
use crate::common::{FigureRenderer, PlotError, Report, SurveyTable, TableError};
use crate::config::{DisplayLabels, RatingFigure};
use std::io::Write;
use std::path::PathBuf;
use thiserror::Error;
use tracing::info;

/// Errors that can occur while producing a figure
#[derive(Error, Debug)]
pub enum FigureError {
    #[error(transparent)]
    Statistics(#[from] DescriptiveError),

    #[error(transparent)]
    Render(#[from] PlotError),

    #[error(transparent)]
    Table(#[from] TableError),

    #[error("Failed to write report: {0}")]
    Report(#[from] std::io::Error),
}

type Result<T> = core::result::Result<T, FigureError>;

/// Renderer and display strings shared by all figures of a run
#[derive(Debug, Clone, Copy)]
pub struct FigureSettings<'a> {
    pub renderer: &'a FigureRenderer,
    pub labels: &'a DisplayLabels,
}

/// Generate the frequency histogram of a numeric column
///
/// # Arguments
/// * `table` - Cleaned responses
/// * `column` - Column to plot; also names the saved image
/// * `settings` - Renderer and display strings
///
/// # Returns
/// * `Ok(PathBuf)` - Path of the saved PNG
/// * `Err(FigureError)` - If the column is unusable or rendering failed
pub fn render_histogram(
    table: &SurveyTable,
    column: &str,
    settings: &FigureSettings<'_>,
) -> Result<PathBuf> {
    let values = table.numeric_column(column)?;
    let path = settings
        .renderer
        .histogram(&values, column, &settings.labels.frequency)?;

    info!(path = %path.display(), values = values.len(), "Saved histogram");
    Ok(path)
}

/// Generate the boxplot of one rating question across all conditions
///
/// Writes the `## {prefix}` heading and one summary line per condition to the report,
/// draws the boxplot with the figure's brackets and confirms the save.
///
/// # Arguments
/// * `report` - Report stream
/// * `table` - Cleaned responses
/// * `figure` - Question columns, axis settings and brackets
/// * `settings` - Renderer and display strings
///
/// # Returns
/// * `Ok(PathBuf)` - Path of the saved PNG
/// * `Err(FigureError)` - If a column is unusable, a bracket is invalid or rendering failed
pub fn render_condition_figure<W: Write>(
    report: &mut Report<W>,
    table: &SurveyTable,
    figure: &RatingFigure,
    settings: &FigureSettings<'_>,
) -> Result<PathBuf> {
    let labels = settings.labels;
    report.line(format!("## {}  ", figure.column_prefix))?;

    let series = figure
        .columns()
        .iter()
        .zip(&labels.condition_labels)
        .map(|(column, label)| {
            describe_column(report, table, column, Some(label.as_str()), labels)
        })
        .collect::<core::result::Result<Vec<_>, _>>()?;

    let spec = BoxplotSpec {
        series: &series,
        labels: &labels.condition_labels,
        y_label: &figure.y_label,
        y_limits: figure.y_limits,
        fixed_ticks: figure.fixed_ticks.as_deref(),
        brackets: &figure.brackets,
        legend: &labels.significance_legend,
    };
    let path = settings.renderer.boxplot(&spec)?;

    info!(path = %path.display(), figure = %figure.y_label, "Saved boxplot");
    report.line(&labels.saved)?;
    Ok(path)
}
