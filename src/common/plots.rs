//! Plotting infrastructure for survey figures
//!
//! This module provides the frequency histogram and the per-condition boxplot with
//! significance brackets, drawn with the [`plotters`] crate. Figures are saved as PNG
//! files whose pixel size is the configured figure size in inches times the dpi.

use crate::analysis::descriptive::percentile;
use plotters::coord::types::RangedCoordf64;
use plotters::prelude::*;
use plotters::style::text_anchor::{HPos, Pos, VPos};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors that can occur during plot generation
#[derive(Error, Debug)]
pub enum PlotError {
    #[error("Output directory does not exist: {0}")]
    OutputDirMissing(PathBuf),

    #[error("Failed to create drawing area: {0}")]
    DrawingArea(String),

    #[error("Failed to configure chart: {0}")]
    ChartConfig(String),

    #[error("Failed to draw chart elements: {0}")]
    Drawing(String),

    #[error("Invalid data: {0}")]
    InvalidData(String),

    #[error("Invalid significance bracket: {0}")]
    InvalidAnnotation(String),
}

type Result<T> = core::result::Result<T, PlotError>;

/// Matplotlib's default series colour, used for bars and boxes
const SERIES_BLUE: RGBColor = RGBColor(31, 119, 180);

/// Matplotlib's default median line colour
const MEDIAN_ORANGE: RGBColor = RGBColor(255, 127, 14);

/// Points per inch, used to scale font sizes with the dpi
const POINTS_PER_INCH: f64 = 72.0;

/// Half the width of a box, in condition units
const BOX_HALF_WIDTH: f64 = 0.25;

/// Vertical offset of a bracket's asterisk relative to the bracket line
const ASTERISK_OFFSET: f64 = -0.3;

/// Visual settings shared by every figure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlotStyle {
    /// Font family; must cover the glyphs of all labels (e.g. a CJK font)
    pub font_family: String,
    /// Base font size in points
    pub font_size: f64,
    pub dpi: u32,
    /// Histogram size in inches
    pub histogram_size: (f64, f64),
    /// Boxplot size in inches
    pub boxplot_size: (f64, f64),
    pub histogram_bins: usize,
    /// Visible x range of the histogram
    pub histogram_x_range: (f64, f64),
}

impl Default for PlotStyle {
    fn default() -> Self {
        Self {
            font_family: "sans-serif".to_string(),
            font_size: 10.0,
            dpi: 400,
            histogram_size: (6.4, 4.8),
            boxplot_size: (7.0, 3.5),
            histogram_bins: 50,
            histogram_x_range: (0.0, 1000.0),
        }
    }
}

impl PlotStyle {
    /// Converts a font size in points to pixels at the configured dpi
    pub fn font_px(&self, points: f64) -> f64 {
        points * self.dpi as f64 / POINTS_PER_INCH
    }

    /// Converts a figure size in inches to pixels at the configured dpi
    pub fn pixels(&self, (width, height): (f64, f64)) -> (u32, u32) {
        let dpi = self.dpi as f64;
        ((width * dpi).round() as u32, (height * dpi).round() as u32)
    }

    fn font(&self, points: f64) -> FontDesc<'_> {
        (self.font_family.as_str(), self.font_px(points)).into_font()
    }
}

/// Horizontal significance annotation spanning two conditions
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SignificanceBracket {
    /// Y coordinate of the bracket line
    pub height: f64,
    /// 1-based position of the left condition
    pub left: usize,
    /// 1-based position of the right condition
    pub right: usize,
}

impl SignificanceBracket {
    pub fn new(height: f64, left: usize, right: usize) -> Self {
        Self {
            height,
            left,
            right,
        }
    }

    /// X coordinate of the asterisk
    pub fn midpoint(&self) -> f64 {
        (self.left + self.right) as f64 / 2.0
    }
}

/// Checks that every bracket spans two distinct conditions that exist in the figure
///
/// # Arguments
/// * `brackets` - Brackets to validate
/// * `conditions` - Number of boxes in the figure
pub fn validate_brackets(brackets: &[SignificanceBracket], conditions: usize) -> Result<()> {
    for bracket in brackets {
        if bracket.left == 0 || bracket.right > conditions {
            return Err(PlotError::InvalidAnnotation(format!(
                "bracket {}-{} is outside conditions 1-{}",
                bracket.left, bracket.right, conditions
            )));
        }

        if bracket.left >= bracket.right {
            return Err(PlotError::InvalidAnnotation(format!(
                "bracket {}-{} must go from left to right",
                bracket.left, bracket.right
            )));
        }

        if !bracket.height.is_finite() {
            return Err(PlotError::InvalidAnnotation(format!(
                "bracket {}-{} has a non-finite height",
                bracket.left, bracket.right
            )));
        }
    }

    Ok(())
}

/// One bar of a histogram
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HistogramBin {
    pub start: f64,
    pub end: f64,
    pub count: usize,
}

/// Splits values into equal-width bins spanning the data range
///
/// Every bin is half-open except the last, which also includes the maximum. A sample
/// whose values are all equal is widened by 0.5 on both sides.
///
/// # Arguments
/// * `values` - Sample to bin
/// * `bins` - Number of bins
///
/// # Returns
/// `bins` entries in ascending order, or an empty vector for empty input
pub fn histogram_bins(values: &[f64], bins: usize) -> Vec<HistogramBin> {
    if values.is_empty() || bins == 0 {
        return Vec::new();
    }

    let mut low = values.iter().copied().fold(f64::INFINITY, f64::min);
    let mut high = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    if low == high {
        low -= 0.5;
        high += 0.5;
    }

    let width = (high - low) / bins as f64;
    let mut counts = vec![0usize; bins];
    for &value in values {
        let position = ((value - low) / width).floor() as usize;
        counts[position.min(bins - 1)] += 1;
    }

    counts
        .into_iter()
        .enumerate()
        .map(|(index, count)| HistogramBin {
            start: low + width * index as f64,
            end: if index + 1 == bins {
                high
            } else {
                low + width * (index + 1) as f64
            },
            count,
        })
        .collect()
}

/// Summary used to draw a single box
#[derive(Debug, Clone, PartialEq)]
pub struct BoxStats {
    pub q1: f64,
    pub median: f64,
    pub q3: f64,
    /// Smallest value at or above `q1 - 1.5 * IQR`
    pub lower_whisker: f64,
    /// Largest value at or below `q3 + 1.5 * IQR`
    pub upper_whisker: f64,
    /// Values beyond the whiskers
    pub outliers: Vec<f64>,
}

impl BoxStats {
    pub fn from_values(values: &[f64]) -> Result<Self> {
        if values.is_empty() {
            return Err(PlotError::InvalidData(
                "Box values cannot be empty".to_string(),
            ));
        }

        let mut sorted = values.to_vec();
        sorted.sort_by(f64::total_cmp);

        let q1 = percentile(&sorted, 25.0);
        let median = percentile(&sorted, 50.0);
        let q3 = percentile(&sorted, 75.0);
        let iqr = q3 - q1;
        let low_fence = q1 - 1.5 * iqr;
        let high_fence = q3 + 1.5 * iqr;

        let inside = sorted
            .iter()
            .copied()
            .filter(|value| (low_fence..=high_fence).contains(value));
        let lower_whisker = inside.clone().next().unwrap_or(q1);
        let upper_whisker = inside.last().unwrap_or(q3);

        let outliers = sorted
            .iter()
            .copied()
            .filter(|value| !(low_fence..=high_fence).contains(value))
            .collect();

        Ok(Self {
            q1,
            median,
            q3,
            lower_whisker,
            upper_whisker,
            outliers,
        })
    }
}

/// Everything needed to draw one boxplot figure
#[derive(Debug, Clone)]
pub struct BoxplotSpec<'a> {
    /// One sample per condition, in box order
    pub series: &'a [Vec<f64>],
    /// One label per condition
    pub labels: &'a [String],
    pub y_label: &'a str,
    pub y_limits: (f64, f64),
    /// Tick positions to label on the y axis; automatic ticks when `None`
    pub fixed_ticks: Option<&'a [f64]>,
    pub brackets: &'a [SignificanceBracket],
    /// Legend entry explaining the asterisks
    pub legend: &'a str,
}

/// Renders figures into a fixed output directory with a fixed style
#[derive(Debug, Clone)]
pub struct FigureRenderer {
    style: PlotStyle,
    output_dir: PathBuf,
}

impl FigureRenderer {
    pub fn new(style: PlotStyle, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            style,
            output_dir: output_dir.into(),
        }
    }

    pub fn style(&self) -> &PlotStyle {
        &self.style
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Path of the PNG for a figure named `name`
    pub fn output_path(&self, name: &str) -> PathBuf {
        self.output_dir.join(format!("{}.png", file_stem(name)))
    }

    fn ensure_output_dir(&self) -> Result<()> {
        if self.output_dir.is_dir() {
            Ok(())
        } else {
            Err(PlotError::OutputDirMissing(self.output_dir.clone()))
        }
    }

    /// Creates a frequency histogram and saves it as `{x_label}.png`
    ///
    /// # Arguments
    /// * `values` - Sample to plot
    /// * `x_label` - Column name; used as the X-axis label and the file name
    /// * `y_label` - Label for the Y-axis
    ///
    /// # Returns
    /// * `Ok(PathBuf)` - Path of the saved PNG
    /// * `Err(PlotError)` - If the directory is missing or drawing failed
    ///
    /// # Chart Properties
    /// * Bins: [`PlotStyle::histogram_bins`] over the data range
    /// * X-axis: clipped to [`PlotStyle::histogram_x_range`]
    /// * Y-axis: 0 to 5% above the tallest bar, labelled at whole counts
    ///
    /// An empty sample yields empty axes.
    pub fn histogram(&self, values: &[f64], x_label: &str, y_label: &str) -> Result<PathBuf> {
        self.ensure_output_dir()?;

        let output_path = self.output_path(x_label);
        self.draw_histogram(&output_path, values, x_label, y_label)?;
        Ok(output_path)
    }

    fn draw_histogram(
        &self,
        output_path: &Path,
        values: &[f64],
        x_label: &str,
        y_label: &str,
    ) -> Result<()> {
        let style = &self.style;
        let bins = histogram_bins(values, style.histogram_bins);
        let (x_min, x_max) = style.histogram_x_range;
        let tallest = bins.iter().map(|bin| bin.count).max().unwrap_or(0).max(1);
        let y_max = tallest as f64 * 1.05;

        let root = BitMapBackend::new(output_path, style.pixels(style.histogram_size));
        let drawing_area = root.into_drawing_area();

        drawing_area
            .fill(&WHITE)
            .map_err(|e| PlotError::DrawingArea(e.to_string()))?;

        let margin = style.font_px(style.font_size) as u32;
        let mut chart_context = ChartBuilder::on(&drawing_area)
            .margin(margin)
            .x_label_area_size(margin * 3)
            .y_label_area_size(margin * 4)
            .build_cartesian_2d(x_min..x_max, 0.0..y_max)
            .map_err(|e| PlotError::ChartConfig(e.to_string()))?;

        chart_context
            .configure_mesh()
            .disable_mesh()
            .x_desc(x_label)
            .y_desc(y_label)
            .label_style(style.font(style.font_size))
            .axis_desc_style(style.font(style.font_size))
            .y_labels(count_label_limit(tallest))
            .y_label_formatter(&count_label)
            .draw()
            .map_err(|e| PlotError::Drawing(e.to_string()))?;

        // Bars outside the visible range are clipped to it.
        let bars = bins
            .iter()
            .filter(|bin| bin.count > 0 && bin.end > x_min && bin.start < x_max)
            .map(|bin| {
                Rectangle::new(
                    [
                        (bin.start.max(x_min), 0.0),
                        (bin.end.min(x_max), bin.count as f64),
                    ],
                    SERIES_BLUE.filled(),
                )
            });

        chart_context
            .draw_series(bars)
            .map_err(|e| PlotError::Drawing(e.to_string()))?;

        drawing_area
            .present()
            .map_err(|e| PlotError::Drawing(e.to_string()))?;

        Ok(())
    }

    /// Creates a boxplot with one box per condition and saves it as `figure_{y_label}.png`
    ///
    /// Brackets are drawn exactly where the caller places them; nothing here decides
    /// which conditions differ.
    ///
    /// # Arguments
    /// * `spec` - Samples, labels, axis settings and brackets
    ///
    /// # Returns
    /// * `Ok(PathBuf)` - Path of the saved PNG
    /// * `Err(PlotError)` - If input is inconsistent, the directory is missing or drawing failed
    pub fn boxplot(&self, spec: &BoxplotSpec<'_>) -> Result<PathBuf> {
        let conditions = spec.series.len();
        if conditions == 0 {
            return Err(PlotError::InvalidData(
                "Boxplot needs at least one series".to_string(),
            ));
        }

        if spec.labels.len() != conditions {
            return Err(PlotError::InvalidData(format!(
                "{} labels given for {} series",
                spec.labels.len(),
                conditions
            )));
        }

        let (y_min, y_max) = spec.y_limits;
        if y_min >= y_max {
            return Err(PlotError::InvalidData(format!(
                "Y range {}..{} is empty",
                y_min, y_max
            )));
        }

        validate_brackets(spec.brackets, conditions)?;
        self.ensure_output_dir()?;

        let boxes = spec
            .series
            .iter()
            .map(|values| BoxStats::from_values(values))
            .collect::<Result<Vec<_>>>()?;

        let output_path = self.output_path(&format!("figure_{}", spec.y_label));
        self.draw_boxplot(&output_path, spec, &boxes)?;
        Ok(output_path)
    }

    fn draw_boxplot(
        &self,
        output_path: &Path,
        spec: &BoxplotSpec<'_>,
        boxes: &[BoxStats],
    ) -> Result<()> {
        let style = &self.style;
        let size = style.pixels(style.boxplot_size);
        let root = BitMapBackend::new(output_path, size);
        let drawing_area = root.into_drawing_area();

        drawing_area
            .fill(&WHITE)
            .map_err(|e| PlotError::DrawingArea(e.to_string()))?;

        let margin = style.font_px(style.font_size) as u32;
        let (y_min, y_max) = spec.y_limits;
        let conditions = spec.series.len();
        let x_range = 0.5..conditions as f64 + 0.5;
        // The band above the plot holds the legend.
        let mut chart_context = ChartBuilder::on(&drawing_area)
            .margin(margin)
            .margin_top(margin * 3)
            .x_label_area_size(margin * 3)
            .y_label_area_size(margin * 4)
            .build_cartesian_2d(x_range, y_min..y_max)
            .map_err(|e| PlotError::ChartConfig(e.to_string()))?;

        let label_for = |x: &f64| -> String {
            let position = x.round();
            if (x - position).abs() > 1e-6 || position < 1.0 {
                return String::new();
            }

            spec.labels
                .get(position as usize - 1)
                .cloned()
                .unwrap_or_default()
        };

        let fixed_ticks = spec.fixed_ticks;
        let y_labels = fixed_ticks.map_or(10, |ticks| tick_label_count(ticks, spec.y_limits));
        let tick_for = move |y: &f64| -> String {
            match fixed_ticks {
                Some(ticks) => ticks
                    .iter()
                    .find(|tick| (*tick - y).abs() < 1e-6)
                    .map(|tick| format!("{}", tick))
                    .unwrap_or_default(),
                None => format!("{}", y),
            }
        };

        chart_context
            .configure_mesh()
            .disable_mesh()
            .x_labels(conditions * 2 + 1)
            .y_labels(y_labels)
            .x_label_formatter(&label_for)
            .y_label_formatter(&tick_for)
            .y_desc(spec.y_label)
            .label_style(style.font(style.font_size))
            .axis_desc_style(style.font(style.font_size))
            .draw()
            .map_err(|e| PlotError::Drawing(e.to_string()))?;

        for (index, stats) in boxes.iter().enumerate() {
            draw_box(&mut chart_context, index as f64 + 1.0, stats)?;
        }

        for bracket in spec.brackets {
            chart_context
                .draw_series(std::iter::once(PathElement::new(
                    vec![
                        (bracket.left as f64, bracket.height),
                        (bracket.right as f64, bracket.height),
                    ],
                    BLACK.stroke_width(stroke_px(style, 0.7)),
                )))
                .map_err(|e| PlotError::Drawing(e.to_string()))?;

            let asterisk_style = style
                .font(style.font_size * 1.5)
                .color(&BLACK)
                .pos(Pos::new(HPos::Center, VPos::Bottom));
            chart_context
                .draw_series(std::iter::once(Text::new(
                    "*",
                    (bracket.midpoint(), bracket.height + ASTERISK_OFFSET),
                    asterisk_style,
                )))
                .map_err(|e| PlotError::Drawing(e.to_string()))?;
        }

        let legend_style = style
            .font(style.font_size)
            .color(&BLACK)
            .pos(Pos::new(HPos::Right, VPos::Top));
        drawing_area
            .draw(&Text::new(
                spec.legend,
                legend_anchor(size, margin),
                legend_style,
            ))
            .map_err(|e| PlotError::Drawing(e.to_string()))?;

        drawing_area
            .present()
            .map_err(|e| PlotError::Drawing(e.to_string()))?;

        Ok(())
    }
}

/// Upper right corner of the legend, inside the band reserved above the plot
fn legend_anchor((width, _): (u32, u32), margin: u32) -> (i32, i32) {
    (width.saturating_sub(margin) as i32, margin as i32)
}

/// Number of y labels to request so that key points fall on whole counts
fn count_label_limit(tallest: usize) -> usize {
    (tallest + 1).min(11)
}

/// Labels whole counts and leaves fractional key points blank
fn count_label(y: &f64) -> String {
    if (y - y.round()).abs() < 1e-9 {
        format!("{:.0}", y)
    } else {
        String::new()
    }
}

/// Draws box, median, whiskers, caps and outliers for the condition at `x`
fn draw_box<DB: DrawingBackend>(
    chart_context: &mut ChartContext<'_, DB, Cartesian2d<RangedCoordf64, RangedCoordf64>>,
    x: f64,
    stats: &BoxStats,
) -> Result<()> {
    let cap = BOX_HALF_WIDTH / 2.0;
    let outline = BLACK.stroke_width(2);

    let lines = vec![
        // Whiskers
        vec![(x, stats.q1), (x, stats.lower_whisker)],
        vec![(x, stats.q3), (x, stats.upper_whisker)],
        // Caps
        vec![(x - cap, stats.lower_whisker), (x + cap, stats.lower_whisker)],
        vec![(x - cap, stats.upper_whisker), (x + cap, stats.upper_whisker)],
    ];

    chart_context
        .draw_series(
            lines
                .into_iter()
                .map(|points| PathElement::new(points, outline)),
        )
        .map_err(|e| PlotError::Drawing(e.to_string()))?;

    chart_context
        .draw_series(std::iter::once(Rectangle::new(
            [
                (x - BOX_HALF_WIDTH, stats.q1),
                (x + BOX_HALF_WIDTH, stats.q3),
            ],
            outline,
        )))
        .map_err(|e| PlotError::Drawing(e.to_string()))?;

    chart_context
        .draw_series(std::iter::once(PathElement::new(
            vec![
                (x - BOX_HALF_WIDTH, stats.median),
                (x + BOX_HALF_WIDTH, stats.median),
            ],
            MEDIAN_ORANGE.stroke_width(2),
        )))
        .map_err(|e| PlotError::Drawing(e.to_string()))?;

    chart_context
        .draw_series(
            stats
                .outliers
                .iter()
                .map(|&value| Circle::new((x, value), 6, BLACK.stroke_width(1))),
        )
        .map_err(|e| PlotError::Drawing(e.to_string()))?;

    Ok(())
}

/// Number of y labels to request so that plotters' key points land on every tick
fn tick_label_count(ticks: &[f64], (low, high): (f64, f64)) -> usize {
    let mut sorted = ticks.to_vec();
    sorted.sort_by(f64::total_cmp);

    let step = sorted
        .windows(2)
        .map(|pair| pair[1] - pair[0])
        .filter(|gap| *gap > 0.0)
        .fold(f64::INFINITY, f64::min);

    if !step.is_finite() {
        return 10;
    }

    // Halving the step keeps the requested density above the tick spacing.
    ((high - low) / (step / 2.0)).ceil() as usize + 1
}

/// Line width in pixels for a width given in points
fn stroke_px(style: &PlotStyle, points: f64) -> u32 {
    style.font_px(points).round().max(1.0) as u32
}

/// Makes a figure name safe to use as a file name
fn file_stem(name: &str) -> String {
    name.chars()
        .map(|c| match c {
            '/' | '\\' => '_',
            c => c,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_histogram_bins_cover_range() {
        let values: Vec<f64> = (0..=100).map(f64::from).collect();
        let bins = histogram_bins(&values, 50);

        assert_eq!(bins.len(), 50);
        assert_eq!(bins[0].start, 0.0);
        assert_eq!(bins[49].end, 100.0);
        assert_eq!(bins.iter().map(|bin| bin.count).sum::<usize>(), 101);
        // Last bin is closed on the right: 98, 99 and 100.
        assert_eq!(bins[49].count, 3);
        assert_eq!(bins[0].count, 2);
    }

    #[test]
    fn test_histogram_bins_constant_sample() {
        let bins = histogram_bins(&[5.0, 5.0, 5.0], 50);
        assert_eq!(bins[0].start, 4.5);
        assert_eq!(bins[49].end, 5.5);
        assert_eq!(bins[25].count, 3);
    }

    #[test]
    fn test_histogram_bins_empty() {
        assert!(histogram_bins(&[], 50).is_empty());
        assert!(histogram_bins(&[1.0], 0).is_empty());
    }

    #[test]
    fn test_box_stats_whiskers_stop_at_data() {
        let stats = BoxStats::from_values(&[1.0, 2.0, 3.0, 4.0, 5.0, 100.0]).unwrap();

        assert_eq!(stats.q1, 2.25);
        assert_eq!(stats.median, 3.5);
        assert_eq!(stats.q3, 4.75);
        assert_eq!(stats.lower_whisker, 1.0);
        assert_eq!(stats.upper_whisker, 5.0);
        assert_eq!(stats.outliers, vec![100.0]);
    }

    #[test]
    fn test_box_stats_empty() {
        assert!(matches!(
            BoxStats::from_values(&[]),
            Err(PlotError::InvalidData(_))
        ));
    }

    #[rstest]
    #[case::reversed(SignificanceBracket::new(11.0, 3, 1))]
    #[case::same_condition(SignificanceBracket::new(11.0, 2, 2))]
    #[case::zero_based(SignificanceBracket::new(11.0, 0, 2))]
    #[case::past_last(SignificanceBracket::new(11.0, 3, 5))]
    #[case::infinite(SignificanceBracket::new(f64::INFINITY, 1, 2))]
    fn test_invalid_brackets(#[case] bracket: SignificanceBracket) {
        assert!(matches!(
            validate_brackets(&[bracket], 4),
            Err(PlotError::InvalidAnnotation(_))
        ));
    }

    #[test]
    fn test_valid_brackets() {
        let brackets = [
            SignificanceBracket::new(11.0, 1, 2),
            SignificanceBracket::new(13.0, 2, 4),
        ];
        assert!(validate_brackets(&brackets, 4).is_ok());
        assert_eq!(brackets[1].midpoint(), 3.0);
    }

    #[test]
    fn test_style_scaling() {
        let style = PlotStyle::default();
        assert_eq!(style.pixels(style.histogram_size), (2560, 1920));
        assert_eq!(style.pixels(style.boxplot_size), (2800, 1400));
        assert!((style.font_px(72.0) - 400.0).abs() < 1e-9);
    }

    #[test]
    fn test_tick_label_count() {
        let ticks = [0.0, 2.0, 4.0, 6.0, 8.0, 10.0];
        assert_eq!(tick_label_count(&ticks, (0.0, 14.0)), 15);
        assert_eq!(tick_label_count(&[5.0], (0.0, 14.0)), 10);
    }

    #[rstest]
    #[case::single_response(1, 2)]
    #[case::three_responses(3, 4)]
    #[case::many_responses(40, 11)]
    fn test_count_label_limit(#[case] tallest: usize, #[case] expected: usize) {
        assert_eq!(count_label_limit(tallest), expected);
    }

    #[test]
    fn test_count_labels_are_distinct() {
        // Key points plotters places on a 0..3.15 axis when asked for many labels
        let key_points = [0.0, 0.5, 1.0, 1.5, 2.0, 2.5, 3.0];
        let labels: Vec<String> = key_points.iter().map(count_label).collect();
        assert_eq!(labels, vec!["0", "", "1", "", "2", "", "3"]);

        let shown: Vec<&String> = labels.iter().filter(|label| !label.is_empty()).collect();
        let mut unique = shown.clone();
        unique.dedup();
        assert_eq!(shown, unique);
    }

    #[test]
    fn test_legend_sits_above_plot_area() {
        let style = PlotStyle::default();
        let size = style.pixels(style.boxplot_size);
        let margin = style.font_px(style.font_size) as u32;

        let (x, y) = legend_anchor(size, margin);
        assert_eq!(x, (size.0 - margin) as i32);
        // Legend text ends before the plot area's top edge at `margin * 3`
        let legend_bottom = y + style.font_px(style.font_size).ceil() as i32;
        assert!(legend_bottom < (margin * 3) as i32);
    }

    #[test]
    fn test_output_path_is_sanitized() {
        let renderer = FigureRenderer::new(PlotStyle::default(), "plot");
        assert_eq!(
            renderer.output_path("回答時間(秒)"),
            PathBuf::from("plot/回答時間(秒).png")
        );
        assert_eq!(renderer.output_path("a/b"), PathBuf::from("plot/a_b.png"));
    }

    #[test]
    fn test_missing_output_dir() {
        let dir = tempfile::tempdir().unwrap();
        let renderer = FigureRenderer::new(PlotStyle::default(), dir.path().join("absent"));

        let result = renderer.histogram(&[1.0, 2.0, 3.0], "x", "頻度");
        assert!(matches!(result, Err(PlotError::OutputDirMissing(_))));
    }

    #[test]
    fn test_boxplot_validates_before_drawing() {
        let dir = tempfile::tempdir().unwrap();
        let renderer = FigureRenderer::new(PlotStyle::default(), dir.path());
        let series = vec![vec![1.0, 2.0], vec![3.0, 4.0]];
        let labels = vec!["A".to_string(), "B".to_string()];
        let brackets = [SignificanceBracket::new(5.0, 1, 3)];

        let spec = BoxplotSpec {
            series: &series,
            labels: &labels,
            y_label: "好感度",
            y_limits: (0.0, 14.0),
            fixed_ticks: None,
            brackets: &brackets,
            legend: "*",
        };

        assert!(matches!(
            renderer.boxplot(&spec),
            Err(PlotError::InvalidAnnotation(_))
        ));
        assert!(!renderer.output_path("figure_好感度").exists());
    }

    #[test]
    #[ignore = "Font rendering not available in test environment"]
    fn test_histogram_success() {
        let dir = tempfile::tempdir().unwrap();
        let renderer = FigureRenderer::new(PlotStyle::default(), dir.path());
        let values: Vec<f64> = (30..900).step_by(7).map(f64::from).collect();

        let path = renderer.histogram(&values, "回答時間(秒)", "頻度").unwrap();
        assert!(path.exists());
    }

    #[test]
    #[ignore = "Font rendering not available in test environment"]
    fn test_histogram_of_empty_sample() {
        let dir = tempfile::tempdir().unwrap();
        let renderer = FigureRenderer::new(PlotStyle::default(), dir.path());

        let path = renderer.histogram(&[], "回答時間(秒)", "頻度").unwrap();
        assert!(path.exists());
    }

    #[test]
    #[ignore = "Font rendering not available in test environment"]
    fn test_boxplot_success() {
        let dir = tempfile::tempdir().unwrap();
        let renderer = FigureRenderer::new(PlotStyle::default(), dir.path());
        let series: Vec<Vec<f64>> = (0..4)
            .map(|offset| (0..20).map(|i| ((i + offset) % 11) as f64).collect())
            .collect();
        let labels: Vec<String> = ["A", "B", "C", "D"].iter().map(|s| s.to_string()).collect();
        let brackets = [
            SignificanceBracket::new(11.0, 1, 2),
            SignificanceBracket::new(12.0, 1, 3),
            SignificanceBracket::new(13.0, 1, 4),
        ];
        let ticks = [0.0, 2.0, 4.0, 6.0, 8.0, 10.0];

        let spec = BoxplotSpec {
            series: &series,
            labels: &labels,
            y_label: "好感度",
            y_limits: (0.0, 14.0),
            fixed_ticks: Some(&ticks),
            brackets: &brackets,
            legend: "*: p < 0.05 & r > 0.1",
        };

        let path = renderer.boxplot(&spec).unwrap();
        assert_eq!(path, dir.path().join("figure_好感度.png"));
        assert!(path.exists());
    }
}
