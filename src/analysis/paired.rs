//! Paired categorical testing functionality
//!
//! This module compares the yes/no answers that the same respondents gave under each
//! condition. Cochran's Q tests all conditions jointly, then McNemar's test compares
//! every pair of conditions. For a significant pair the answer breakdown of both
//! conditions is added to the report.

use crate::common::shares::{answer_shares, format_share_table};
use crate::common::{Report, SurveyTable, TableError};
use crate::config::{AnalysisConfig, BinaryQuestion, DisplayLabels};
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use statrs::distribution::{Binomial, ChiSquared, ContinuousCDF, DiscreteCDF};
use std::io::Write;
use thiserror::Error;
use tracing::{debug, info};

/// Errors that can occur during paired testing
#[derive(Error, Debug)]
pub enum PairedTestError {
    /// Degenerate contingency table of the omnibus test: no respondent changed their
    /// answer between conditions, so Cochran's denominator is zero
    #[error("Cochran's Q is undefined: every respondent answered identically in all conditions")]
    DegenerateOmnibus,

    /// Degenerate contingency table of one McNemar pair: `b + c = 0`
    #[error("McNemar's test is undefined for conditions {first} and {second}: no discordant answers")]
    DegenerateContingencyTable { first: String, second: String },

    #[error("No respondents to test")]
    EmptySample,

    #[error("Invalid distribution parameters: {0}")]
    Distribution(String),

    #[error(transparent)]
    Table(#[from] TableError),

    #[error("Failed to write report: {0}")]
    Report(#[from] std::io::Error),
}

impl PairedTestError {
    /// Whether the error reports a degenerate contingency table, omnibus or pairwise
    pub fn is_degenerate(&self) -> bool {
        matches!(
            self,
            PairedTestError::DegenerateOmnibus
                | PairedTestError::DegenerateContingencyTable { .. }
        )
    }
}

type Result<T> = core::result::Result<T, PairedTestError>;

/// Variant of McNemar's test to run for each pair
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum McNemarMethod {
    /// Chi-squared with Edwards' continuity correction
    #[default]
    Corrected,
    /// Chi-squared without continuity correction
    Uncorrected,
    /// Two-sided exact binomial test on the discordant pairs
    Exact,
}

/// Statistic and p-value of a test
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TestResult {
    pub statistic: f64,
    pub p_value: f64,
}

/// 2x2 table of paired answers, coded against the positive answer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContingencyTable {
    pub both: u64,
    pub only_first: u64,
    pub only_second: u64,
    pub neither: u64,
}

impl ContingencyTable {
    pub fn discordant(&self) -> u64 {
        self.only_first + self.only_second
    }
}

/// Outcome of one pairwise comparison
#[derive(Debug, Clone, PartialEq)]
pub struct PairwiseResult {
    pub first: String,
    pub second: String,
    pub table: ContingencyTable,
    pub result: TestResult,
    pub significant: bool,
}

/// All results of a paired test run
#[derive(Debug, Clone, PartialEq)]
pub struct PairedTestOutcome {
    pub omnibus: TestResult,
    pub pairs: Vec<PairwiseResult>,
}

/// Options of a paired test run
#[derive(Debug, Clone, Copy)]
pub struct PairedTestSettings<'a> {
    pub significance_level: f64,
    pub method: McNemarMethod,
    pub labels: &'a DisplayLabels,
}

impl<'a> PairedTestSettings<'a> {
    pub fn from_config(config: &'a AnalysisConfig) -> Self {
        Self {
            significance_level: config.significance_level,
            method: config.mcnemar,
            labels: &config.labels,
        }
    }
}

/// Runs Cochran's Q over all conditions, then McNemar over every pair
///
/// Report output, in order:
/// - `Q: {q:.3}` and `p-value: {p:.6}`
/// - Per pair: a heading, `McNemar's Chi^2` and `McNemar's p-value`
/// - Per significant pair: the answer breakdown of both conditions
///
/// # Arguments
/// * `report` - Report stream
/// * `table` - Cleaned responses
/// * `question` - Question columns and the positive answer
/// * `settings` - Significance level, McNemar variant and display strings
///
/// # Returns
/// * `Ok(PairedTestOutcome)` - Results of every test
/// * `Err(PairedTestError)` - If a column is missing or a test is undefined for the data
pub fn run_paired_tests<W: Write>(
    report: &mut Report<W>,
    table: &SurveyTable,
    question: &BinaryQuestion,
    settings: &PairedTestSettings<'_>,
) -> Result<PairedTestOutcome> {
    if table.is_empty() {
        return Err(PairedTestError::EmptySample);
    }

    let answers = question
        .conditions
        .iter()
        .map(|condition| table.text_column(&question.column(condition)))
        .collect::<core::result::Result<Vec<_>, _>>()?;

    let coded: Vec<Vec<bool>> = answers
        .iter()
        .map(|column| code_answers(column.as_slice(), &question.positive_answer))
        .collect();

    let omnibus = cochrans_q(&coded)?;
    info!(
        q = omnibus.statistic,
        p_value = omnibus.p_value,
        conditions = coded.len(),
        respondents = table.len(),
        "Cochran's Q"
    );
    report.line(format!("Q: {:.3}", omnibus.statistic))?;
    report.line(format!("p-value: {:.6}", omnibus.p_value))?;

    let mut pairs = Vec::new();
    for (first, second) in (0..coded.len()).tuple_combinations() {
        let first_name = &question.conditions[first];
        let second_name = &question.conditions[second];
        report.line(format!(
            "✅=={noun}{first_name}と{second_name}のmcnemar==",
            noun = settings.labels.condition_noun
        ))?;

        let contingency = mcnemar_table(&coded[first], &coded[second]);
        let result = mcnemar(&contingency, settings.method)?.ok_or_else(|| {
            PairedTestError::DegenerateContingencyTable {
                first: first_name.clone(),
                second: second_name.clone(),
            }
        })?;
        debug!(first = %first_name, second = %second_name, table = ?contingency, "McNemar");

        report.line(format!("McNemar's Chi^2: {:.3}", result.statistic))?;
        report.line(format!("McNemar's p-value: {:.6}", result.p_value))?;

        let significant = result.p_value < settings.significance_level;
        if significant {
            let breakdowns = [
                (first_name, &answers[first]),
                (second_name, &answers[second]),
            ];
            for (name, column) in breakdowns {
                report.line(format!("# {}{}", settings.labels.condition_noun, name))?;
                report.line(format_share_table(&answer_shares(column.as_slice()), None))?;
            }
        }

        pairs.push(PairwiseResult {
            first: first_name.clone(),
            second: second_name.clone(),
            table: contingency,
            result,
            significant,
        });
    }

    Ok(PairedTestOutcome { omnibus, pairs })
}

/// Codes each answer as `true` when it equals `positive`
pub fn code_answers<S: AsRef<str>>(answers: &[S], positive: &str) -> Vec<bool> {
    answers
        .iter()
        .map(|answer| answer.as_ref() == positive)
        .collect()
}

/// Cochran's Q test over `k` equally long columns of coded answers
///
/// `Q = (k-1)(k ΣG_j² - T²) / (k T - ΣL_i²)` where `G_j` are column totals, `L_i` row
/// totals and `T` the grand total. `Q` follows a chi-squared distribution with `k - 1`
/// degrees of freedom.
pub fn cochrans_q(columns: &[Vec<bool>]) -> Result<TestResult> {
    let k = columns.len();
    let rows = columns.first().map_or(0, Vec::len);
    if k < 2 || rows == 0 {
        return Err(PairedTestError::EmptySample);
    }

    let column_totals: Vec<f64> = columns
        .iter()
        .map(|column| column.iter().filter(|&&answer| answer).count() as f64)
        .collect();
    let row_totals: Vec<f64> = (0..rows)
        .map(|row| columns.iter().filter(|column| column[row]).count() as f64)
        .collect();

    let k = k as f64;
    let total: f64 = column_totals.iter().sum();
    let numerator =
        (k - 1.0) * (k * column_totals.iter().map(|g| g * g).sum::<f64>() - total * total);
    let denominator = k * total - row_totals.iter().map(|l| l * l).sum::<f64>();
    if denominator == 0.0 {
        return Err(PairedTestError::DegenerateOmnibus);
    }

    let statistic = numerator / denominator;
    Ok(TestResult {
        statistic,
        p_value: chi_squared_sf(statistic, k - 1.0)?,
    })
}

/// Builds the paired 2x2 table of two coded columns
pub fn mcnemar_table(first: &[bool], second: &[bool]) -> ContingencyTable {
    let mut table = ContingencyTable {
        both: 0,
        only_first: 0,
        only_second: 0,
        neither: 0,
    };

    for (&a, &b) in first.iter().zip(second) {
        match (a, b) {
            (true, true) => table.both += 1,
            (true, false) => table.only_first += 1,
            (false, true) => table.only_second += 1,
            (false, false) => table.neither += 1,
        }
    }

    table
}

/// McNemar's test on a paired 2x2 table
///
/// Returns `Ok(None)` when there are no discordant pairs, as the test is undefined.
pub fn mcnemar(table: &ContingencyTable, method: McNemarMethod) -> Result<Option<TestResult>> {
    let discordant = table.discordant();
    if discordant == 0 {
        return Ok(None);
    }

    let b = table.only_first as f64;
    let c = table.only_second as f64;
    let n = discordant as f64;

    let result = match method {
        McNemarMethod::Corrected => {
            let statistic = ((b - c).abs() - 1.0).powi(2) / n;
            TestResult {
                statistic,
                p_value: chi_squared_sf(statistic, 1.0)?,
            }
        }
        McNemarMethod::Uncorrected => {
            let statistic = (b - c).powi(2) / n;
            TestResult {
                statistic,
                p_value: chi_squared_sf(statistic, 1.0)?,
            }
        }
        McNemarMethod::Exact => {
            let smaller = table.only_first.min(table.only_second);
            let binomial = Binomial::new(0.5, discordant)
                .map_err(|e| PairedTestError::Distribution(e.to_string()))?;
            TestResult {
                statistic: smaller as f64,
                p_value: (2.0 * binomial.cdf(smaller)).min(1.0),
            }
        }
    };

    Ok(Some(result))
}

fn chi_squared_sf(statistic: f64, freedom: f64) -> Result<f64> {
    let distribution =
        ChiSquared::new(freedom).map_err(|e| PairedTestError::Distribution(e.to_string()))?;
    Ok(distribution.sf(statistic))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::Cell;
    use rstest::rstest;

    const YES: &str = "はい";
    const NO: &str = "いいえ";

    fn assert_close(actual: f64, expected: f64, tolerance: f64) {
        assert!(
            (actual - expected).abs() < tolerance,
            "expected {} to be within {} of {}",
            actual,
            tolerance,
            expected
        );
    }

    fn question() -> BinaryQuestion {
        BinaryQuestion {
            column_prefix: "押しますか？".to_string(),
            ..BinaryQuestion::default()
        }
    }

    /// Builds the four answer columns from row patterns repeated `count` times
    fn answers_table(patterns: &[([bool; 4], usize)]) -> SurveyTable {
        let question = question();
        let columns = question
            .conditions
            .iter()
            .map(|condition| question.column(condition))
            .collect();

        let rows = patterns
            .iter()
            .flat_map(|(pattern, count)| std::iter::repeat(pattern).take(*count))
            .map(|pattern| {
                pattern
                    .iter()
                    .map(|&yes| Cell::Text((if yes { YES } else { NO }).to_string()))
                    .collect()
            })
            .collect();

        SurveyTable::new(columns, rows)
    }

    /// Twenty respondents with clear differences between conditions
    fn mixed_answers() -> SurveyTable {
        answers_table(&[
            ([true, false, true, false], 8),
            ([true, true, true, false], 4),
            ([true, false, false, true], 3),
            ([false, false, true, true], 2),
            ([true, true, true, true], 3),
        ])
    }

    fn run(table: &SurveyTable) -> (Result<PairedTestOutcome>, String) {
        let labels = DisplayLabels::default();
        let settings = PairedTestSettings {
            significance_level: 0.05,
            method: McNemarMethod::Corrected,
            labels: &labels,
        };
        let mut report = Report::new(Vec::new());
        let outcome = run_paired_tests(&mut report, table, &question(), &settings);
        (outcome, report.transcript().to_string())
    }

    #[test]
    fn cochrans_q_matches_hand_computation() {
        let (outcome, transcript) = run(&mixed_answers());
        let outcome = outcome.unwrap();

        assert_close(outcome.omnibus.statistic, 18.9375, 1e-9);
        assert_close(outcome.omnibus.p_value, 0.000281656, 1e-8);
        assert!(transcript.starts_with("Q: 18.938\np-value: 0.000282\n"));
    }

    #[test]
    fn six_pairs_in_lexicographic_order() {
        let (outcome, transcript) = run(&mixed_answers());
        let outcome = outcome.unwrap();

        let pairs: Vec<(&str, &str)> = outcome
            .pairs
            .iter()
            .map(|pair| (pair.first.as_str(), pair.second.as_str()))
            .collect();
        assert_eq!(
            pairs,
            [("1", "2"), ("1", "3"), ("1", "4"), ("2", "3"), ("2", "4"), ("3", "4")]
        );

        let headings: Vec<&str> = transcript
            .lines()
            .filter(|line| line.starts_with("✅"))
            .collect();
        assert_eq!(
            headings,
            [
                "✅==動画1と2のmcnemar==",
                "✅==動画1と3のmcnemar==",
                "✅==動画1と4のmcnemar==",
                "✅==動画2と3のmcnemar==",
                "✅==動画2と4のmcnemar==",
                "✅==動画3と4のmcnemar==",
            ]
        );
    }

    #[test]
    fn pairwise_statistics_match_hand_computation() {
        let (outcome, _) = run(&mixed_answers());
        let outcome = outcome.unwrap();

        let expected = [
            (9.091, 0.002569, true),
            (0.0, 1.0, false),
            (5.786, 0.016157, true),
            (8.1, 0.004427, true),
            (0.0, 1.0, false),
            (4.267, 0.038867, true),
        ];
        for (pair, (statistic, p_value, significant)) in outcome.pairs.iter().zip(expected) {
            assert_close(pair.result.statistic, statistic, 1e-3);
            assert_close(pair.result.p_value, p_value, 1e-6);
            assert_eq!(pair.significant, significant);
        }
    }

    #[test]
    fn significant_pairs_report_answer_breakdown() {
        let (_, transcript) = run(&mixed_answers());

        let first_block = transcript
            .split("✅==動画1と2のmcnemar==")
            .nth(1)
            .and_then(|rest| rest.split("✅==").next())
            .unwrap();
        assert!(first_block.contains("McNemar's Chi^2: 9.091"));
        assert!(first_block.contains("McNemar's p-value: 0.002569"));
        assert!(first_block.contains("# 動画1"));
        assert!(first_block.contains("# 動画2"));
        assert!(first_block.contains("90.000000%"));
        assert!(first_block.contains("10.000000%"));

        let insignificant = transcript
            .split("✅==動画1と3のmcnemar==")
            .nth(1)
            .and_then(|rest| rest.split("✅==").next())
            .unwrap();
        assert!(!insignificant.contains("# 動画"));
    }

    #[test]
    fn breakdown_percentages_sum_to_one_hundred() {
        let table = mixed_answers();
        for condition in &question().conditions {
            let answers = table.text_column(&question().column(condition)).unwrap();
            let total: f64 = answer_shares(&answers)
                .iter()
                .map(|share| share.percentage)
                .sum();
            assert_close(total, 100.0, 1e-9);
        }
    }

    #[test]
    fn identical_answers_everywhere_are_degenerate() {
        let (outcome, transcript) = run(&answers_table(&[([true; 4], 10)]));
        let error = outcome.unwrap_err();
        assert!(matches!(error, PairedTestError::DegenerateOmnibus));
        assert!(error.is_degenerate());
        assert!(transcript.is_empty());
    }

    #[test]
    fn pair_without_discordant_answers_is_degenerate() {
        // Conditions 1 and 2 always agree, while the others still vary.
        let (outcome, _) = run(&answers_table(&[
            ([true, true, false, true], 5),
            ([false, false, true, false], 5),
        ]));

        match outcome {
            Err(error @ PairedTestError::DegenerateContingencyTable { .. }) => {
                assert!(error.is_degenerate());
                if let PairedTestError::DegenerateContingencyTable { first, second } = error {
                    assert_eq!((first.as_str(), second.as_str()), ("1", "2"));
                }
            }
            other => panic!("expected a degenerate pair, got {:?}", other),
        }
    }

    #[test]
    fn empty_table_is_rejected() {
        let (outcome, _) = run(&answers_table(&[]));
        assert!(matches!(outcome, Err(PairedTestError::EmptySample)));
        assert!(!outcome.unwrap_err().is_degenerate());
    }

    #[test]
    fn missing_condition_column_is_a_table_error() {
        let table = SurveyTable::new(vec!["other".to_string()], vec![vec![Cell::Empty]]);
        let (outcome, _) = run(&table);
        assert!(matches!(
            outcome,
            Err(PairedTestError::Table(TableError::MissingColumn(_)))
        ));
    }

    #[rstest]
    #[case::corrected(McNemarMethod::Corrected, 8.1, 0.004427)]
    #[case::uncorrected(McNemarMethod::Uncorrected, 10.0, 0.001565)]
    #[case::exact(McNemarMethod::Exact, 0.0, 0.001953)]
    fn mcnemar_variants(
        #[case] method: McNemarMethod,
        #[case] statistic: f64,
        #[case] p_value: f64,
    ) {
        let table = ContingencyTable {
            both: 5,
            only_first: 0,
            only_second: 10,
            neither: 5,
        };

        let result = mcnemar(&table, method).unwrap().unwrap();
        assert_close(result.statistic, statistic, 1e-9);
        assert_close(result.p_value, p_value, 1e-6);
    }

    #[test]
    fn exact_p_value_is_capped_at_one() {
        let table = ContingencyTable {
            both: 0,
            only_first: 3,
            only_second: 3,
            neither: 0,
        };
        let result = mcnemar(&table, McNemarMethod::Exact).unwrap().unwrap();
        assert_eq!(result.p_value, 1.0);
    }

    #[test]
    fn mcnemar_table_counts_each_cell() {
        let table = mcnemar_table(
            &[true, true, false, false, true],
            &[true, false, true, false, false],
        );
        assert_eq!(
            table,
            ContingencyTable {
                both: 1,
                only_first: 2,
                only_second: 1,
                neither: 1
            }
        );

        let concordant = ContingencyTable {
            both: 4,
            only_first: 0,
            only_second: 0,
            neither: 1,
        };
        assert!(mcnemar(&concordant, McNemarMethod::Corrected)
            .unwrap()
            .is_none());
    }

    #[test]
    fn method_deserializes_from_snake_case() {
        let method: McNemarMethod = serde_json::from_str(r#""exact""#).unwrap();
        assert_eq!(method, McNemarMethod::Exact);
    }
}
