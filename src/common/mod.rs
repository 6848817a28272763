//! Common infrastructure modules shared across analysis phases
//!
//! This module provides reusable infrastructure for:
//! - The in-memory survey table
//! - Answer shares and ASCII table formatting
//! - Plotting histograms and annotated boxplots
//! - The console report stream

pub mod plots;
pub mod report;
pub mod shares;
pub mod table;

// Re-export commonly used items
pub use plots::{FigureRenderer, PlotError};
pub use report::Report;
pub use table::{Cell, SurveyTable, TableError};
