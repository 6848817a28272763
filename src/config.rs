//! Analysis configuration
//!
//! Everything specific to one survey lives here: column names, the response-duration
//! window, display strings, plot styling and the boxplot figures to draw. The
//! [`Default`] implementation reproduces the air-conditioner approval survey; a JSON file
//! may override any subset of fields.

use crate::analysis::paired::McNemarMethod;
use crate::common::plots::{PlotStyle, SignificanceBracket};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Default upper bound of the response-duration window, in minutes
pub const DEFAULT_MAX_RESPONSE_MINUTES: u32 = 15;

/// Default lower bound of the response-duration window, in seconds
pub const DEFAULT_MIN_RESPONSE_SECONDS: u32 = 30;

/// Default significance threshold for the pairwise tests
pub const DEFAULT_SIGNIFICANCE_LEVEL: f64 = 0.05;

/// Errors that can occur while loading or validating configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),

    #[error("Failed to parse config JSON: {0}")]
    JsonParse(#[from] serde_json::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

type Result<T> = core::result::Result<T, ConfigError>;

/// Complete configuration of one analysis run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Upper bound of the duration window, in minutes
    pub max_response_minutes: u32,
    /// Lower bound of the duration window, in seconds
    pub min_response_seconds: u32,
    /// Directory receiving figures and the report transcript
    pub output_dir: PathBuf,
    /// p-value below which a pairwise difference is reported as significant
    pub significance_level: f64,
    pub mcnemar: McNemarMethod,
    pub columns: SurveyColumns,
    pub binary_question: BinaryQuestion,
    pub figures: Vec<RatingFigure>,
    pub labels: DisplayLabels,
    pub plot: PlotStyle,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            max_response_minutes: DEFAULT_MAX_RESPONSE_MINUTES,
            min_response_seconds: DEFAULT_MIN_RESPONSE_SECONDS,
            output_dir: PathBuf::from("plot"),
            significance_level: DEFAULT_SIGNIFICANCE_LEVEL,
            mcnemar: McNemarMethod::default(),
            columns: SurveyColumns::default(),
            binary_question: BinaryQuestion::default(),
            figures: vec![
                RatingFigure::with_default_layout(
                    "動画内に登場した喋る家電の好感度を教えてください",
                    "好感度",
                ),
                RatingFigure::with_default_layout(
                    "動画内に登場した喋る家電の嫌悪感を教えてください",
                    "嫌悪感",
                ),
            ],
            labels: DisplayLabels::default(),
            plot: PlotStyle::default(),
        }
    }
}

impl AnalysisConfig {
    /// Loads configuration from a JSON file; missing fields take their defaults
    pub fn from_file(path: &Path) -> Result<Self> {
        let file = File::open(path)?;
        let config: AnalysisConfig = serde_json::from_reader(BufReader::new(file))?;
        config.validate()?;
        Ok(config)
    }

    /// Upper bound of the duration window in seconds
    pub fn max_response_seconds(&self) -> u32 {
        self.max_response_minutes.saturating_mul(60)
    }

    /// Checks cross-field constraints that serde cannot express
    pub fn validate(&self) -> Result<()> {
        if self.max_response_seconds() < self.min_response_seconds {
            return Err(ConfigError::Invalid(format!(
                "duration window is empty: {}s minimum exceeds {} minute maximum",
                self.min_response_seconds, self.max_response_minutes
            )));
        }

        if !(self.significance_level > 0.0 && self.significance_level < 1.0) {
            return Err(ConfigError::Invalid(format!(
                "significance level {} is outside (0, 1)",
                self.significance_level
            )));
        }

        if self.binary_question.conditions.len() < 2 {
            return Err(ConfigError::Invalid(
                "the binary question needs at least two conditions".to_string(),
            ));
        }

        for figure in &self.figures {
            if figure.index_suffixes.len() != self.labels.condition_labels.len() {
                return Err(ConfigError::Invalid(format!(
                    "figure '{}' has {} conditions but {} condition labels are configured",
                    figure.y_label,
                    figure.index_suffixes.len(),
                    self.labels.condition_labels.len()
                )));
            }

            let (low, high) = figure.y_limits;
            if low >= high {
                return Err(ConfigError::Invalid(format!(
                    "figure '{}' has an empty y range {}..{}",
                    figure.y_label, low, high
                )));
            }
        }

        if self.plot.histogram_bins == 0 {
            return Err(ConfigError::Invalid(
                "histogram needs at least one bin".to_string(),
            ));
        }

        Ok(())
    }
}

/// Names of the fixed columns of the sheet
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SurveyColumns {
    /// Start time filled in automatically by the survey form
    pub start_timestamp: String,
    /// chrono format of the start time
    pub start_timestamp_format: String,
    /// Time the form was submitted
    pub submission_timestamp: String,
    /// Name given to the derived response-duration column
    pub duration: String,
}

impl Default for SurveyColumns {
    fn default() -> Self {
        Self {
            start_timestamp: "開始時刻(自動で入力されます。変更しないでください)".to_string(),
            start_timestamp_format: "%Y%m%d%H%M%S".to_string(),
            submission_timestamp: "タイムスタンプ".to_string(),
            duration: "回答時間(秒)".to_string(),
        }
    }
}

/// A yes/no question asked once per condition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BinaryQuestion {
    /// Question text; the condition suffix is appended to form each column name
    pub column_prefix: String,
    /// Condition suffixes, in report order
    pub conditions: Vec<String>,
    /// Answer counted as a positive response
    pub positive_answer: String,
}

impl BinaryQuestion {
    /// Column holding the answers for `condition`
    pub fn column(&self, condition: &str) -> String {
        format!("{}{}", self.column_prefix, condition)
    }
}

impl Default for BinaryQuestion {
    fn default() -> Self {
        Self {
            column_prefix:
                "目の前には「エアコンの指示を承認する」ボタンがあります。このあとボタンを押しますか？"
                    .to_string(),
            conditions: default_conditions(),
            positive_answer: "はい".to_string(),
        }
    }
}

/// One boxplot figure over a family of per-condition rating columns
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RatingFigure {
    /// Question text; each index suffix is appended to form a column name
    pub column_prefix: String,
    /// Y-axis label; also names the saved image
    pub y_label: String,
    #[serde(default = "default_conditions")]
    pub index_suffixes: Vec<String>,
    #[serde(default = "default_brackets")]
    pub brackets: Vec<SignificanceBracket>,
    #[serde(default = "default_y_limits")]
    pub y_limits: (f64, f64),
    #[serde(default = "default_fixed_ticks")]
    pub fixed_ticks: Option<Vec<f64>>,
}

impl RatingFigure {
    /// Figure with the bracket layout established for the rating questions
    pub fn with_default_layout(column_prefix: &str, y_label: &str) -> Self {
        Self {
            column_prefix: column_prefix.to_string(),
            y_label: y_label.to_string(),
            index_suffixes: default_conditions(),
            brackets: default_brackets(),
            y_limits: default_y_limits(),
            fixed_ticks: default_fixed_ticks(),
        }
    }

    /// Column names of the four conditions, in figure order
    pub fn columns(&self) -> Vec<String> {
        self.index_suffixes
            .iter()
            .map(|suffix| format!("{}{}", self.column_prefix, suffix))
            .collect()
    }
}

/// Locale-specific strings used in the report and figures
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayLabels {
    /// Histogram y-axis label
    pub frequency: String,
    /// Word used for a condition in pairwise headings
    pub condition_noun: String,
    /// Box labels, one per condition
    pub condition_labels: Vec<String>,
    pub raw_count: String,
    pub complete_count: String,
    pub analysed_count: String,
    pub analysed_share: String,
    pub mean_sd: String,
    pub median_iqr: String,
    pub min_max: String,
    pub normality: String,
    pub significance_legend: String,
    pub saved: String,
}

impl Default for DisplayLabels {
    fn default() -> Self {
        Self {
            frequency: "頻度".to_string(),
            condition_noun: "動画".to_string(),
            condition_labels: vec![
                "公益行動条件".to_string(),
                "公益通知条件".to_string(),
                "私益行動条件".to_string(),
                "私益通知条件".to_string(),
            ],
            raw_count: "回答者全ての人数".to_string(),
            complete_count: "回答に欠損のない回答者の人数".to_string(),
            analysed_count: "解析対象の回答者の人数".to_string(),
            analysed_share: "回答者全体の".to_string(),
            mean_sd: "平均 (標準偏差)".to_string(),
            median_iqr: "中央値 (Q1–Q3)".to_string(),
            min_max: "最小値–最大値".to_string(),
            normality: "S-W test p-value".to_string(),
            significance_legend: "*: p < 0.05 & r > 0.1".to_string(),
            saved: "保存した".to_string(),
        }
    }
}

fn default_conditions() -> Vec<String> {
    ["1", "2", "3", "4"].iter().map(|s| s.to_string()).collect()
}

fn default_brackets() -> Vec<SignificanceBracket> {
    vec![
        SignificanceBracket::new(11.0, 1, 2),
        SignificanceBracket::new(11.0, 3, 4),
        SignificanceBracket::new(12.0, 1, 3),
        SignificanceBracket::new(13.0, 2, 4),
    ]
}

fn default_y_limits() -> (f64, f64) {
    (0.0, 14.0)
}

fn default_fixed_ticks() -> Option<Vec<f64>> {
    Some((0..=10).step_by(2).map(f64::from).collect())
}
