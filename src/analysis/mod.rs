//! Domain-specific analysis modules
//!
//! This module contains the survey analysis stages:
//! - Response cleaning and duration filtering
//! - Descriptive statistics with the Shapiro-Wilk normality test
//! - Paired categorical tests (Cochran's Q, McNemar)
//! - Histogram and per-condition boxplot figures

pub mod cleaning;
pub mod descriptive;
pub mod figures;
pub mod normality;
pub mod paired;

// Re-export analysis functions for convenience
pub use cleaning::{clean, CleanedSurvey, CleaningSummary, DurationWindow};
pub use descriptive::{describe_column, DescriptiveSummary};
pub use figures::{render_condition_figure, render_histogram, FigureSettings};
pub use paired::{run_paired_tests, McNemarMethod, PairedTestOutcome, PairedTestSettings};
