//! # analyze-survey-stats
//!
//! Statistical analysis of a paired-condition survey: the same respondents answer the same
//! questions after each of several conditions (videos). The pipeline loads the responses
//! from a spreadsheet, keeps complete responses within a plausible response-duration
//! window, tests the yes/no question with Cochran's Q and pairwise McNemar tests, and
//! draws a duration histogram plus one boxplot per rating question.
//!
//! Every report line is printed as it is produced and saved to `report.txt` next to the
//! figures.

pub mod analysis;
pub mod common;
pub mod config;
pub mod parsing;

use analysis::cleaning::CleaningError;
use analysis::descriptive::DescriptiveError;
use analysis::figures::FigureError;
use analysis::paired::PairedTestError;
use analysis::{
    clean, render_condition_figure, render_histogram, run_paired_tests, CleaningSummary,
    FigureSettings, PairedTestOutcome, PairedTestSettings,
};
use common::{FigureRenderer, PlotError, Report, SurveyTable, TableError};
use config::{AnalysisConfig, ConfigError};
use parsing::{load_survey, DataSourceError};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;

/// Errors that can occur during analysis
#[derive(Error, Debug)]
pub enum AnalysisError {
    #[error("Loading error: {0}")]
    DataSource(#[from] DataSourceError),

    #[error("Cleaning error: {0}")]
    Cleaning(#[from] CleaningError),

    #[error("Descriptive statistics error: {0}")]
    Statistics(#[from] DescriptiveError),

    #[error("Paired test error: {0}")]
    PairedTest(#[from] PairedTestError),

    #[error("Render error: {0}")]
    Render(#[from] PlotError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Table error: {0}")]
    Table(#[from] TableError),

    #[error("Failed to write report: {0}")]
    Report(#[from] std::io::Error),
}

impl From<FigureError> for AnalysisError {
    fn from(err: FigureError) -> Self {
        match err {
            FigureError::Statistics(e) => AnalysisError::Statistics(e),
            FigureError::Render(e) => AnalysisError::Render(e),
            FigureError::Table(e) => AnalysisError::Table(e),
            FigureError::Report(e) => AnalysisError::Report(e),
        }
    }
}

pub type Result<T> = core::result::Result<T, AnalysisError>;

/// What a completed run produced
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub cleaning: CleaningSummary,
    pub paired: PairedTestOutcome,
    /// Saved figures, histogram first
    pub figures: Vec<PathBuf>,
    pub transcript: PathBuf,
}

/// Loads the spreadsheet at `input` and runs the full analysis on it
///
/// # Arguments
/// * `config` - Analysis configuration
/// * `input` - Path to the survey spreadsheet
/// * `report` - Report stream receiving every report line
///
/// # Returns
/// * `Ok(RunSummary)` - Counts, test results and output paths
/// * `Err(AnalysisError)` - The first failing stage; nothing is retried
pub fn run<W: Write>(
    config: &AnalysisConfig,
    input: &Path,
    report: &mut Report<W>,
) -> Result<RunSummary> {
    config.validate()?;
    let raw = load_survey(input)?;
    analyze(config, &raw, report)
}

/// Runs every analysis stage on already loaded responses
///
/// Order: column list, cleaning, audit counts, duration histogram, paired tests, one
/// boxplot per configured figure, transcript.
pub fn analyze<W: Write>(
    config: &AnalysisConfig,
    raw: &SurveyTable,
    report: &mut Report<W>,
) -> Result<RunSummary> {
    report.line(format!("{:?}", raw.columns()))?;
    let cleaned = clean(raw, config)?;

    fs::create_dir_all(&config.output_dir)?;
    let renderer = FigureRenderer::new(config.plot.clone(), &config.output_dir);
    let settings = FigureSettings {
        renderer: &renderer,
        labels: &config.labels,
    };

    // Counts come first so an empty window is visible before anything can fail.
    for line in cleaned.summary.audit_lines(&config.labels) {
        report.line(line)?;
    }

    let mut figures = vec![render_histogram(
        &cleaned.valid,
        &config.columns.duration,
        &settings,
    )?];

    let paired = run_paired_tests(
        report,
        &cleaned.valid,
        &config.binary_question,
        &PairedTestSettings::from_config(config),
    )?;

    for figure in &config.figures {
        figures.push(render_condition_figure(
            report,
            &cleaned.valid,
            figure,
            &settings,
        )?);
    }

    let transcript = report.save_transcript(&config.output_dir)?;
    info!(
        figures = figures.len(),
        transcript = %transcript.display(),
        "Analysis complete"
    );

    Ok(RunSummary {
        cleaning: cleaned.summary,
        paired,
        figures,
        transcript,
    })
}
