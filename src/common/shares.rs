//! Answer share types and ASCII table formatting
//!
//! This module provides shared functionality for categorical breakdowns:
//! - [`AnswerShare`] type for representing one answer with its count and percentage
//! - [`answer_shares`] to tally a column of answers
//! - ASCII table formatting using the [`tabled`] crate

use tabled::{Table, Tabled};

/// Represents a single answer category with its count and percentage
#[derive(Debug, Clone, Tabled)]
pub struct AnswerShare {
    /// Answer as written in the sheet (e.g. "はい")
    #[tabled(rename = "Answer")]
    pub answer: String,
    /// Number of respondents giving this answer
    #[tabled(rename = "Count")]
    pub count: usize,
    /// Share of respondents giving this answer, 0-100
    #[tabled(skip)]
    pub percentage: f64,
    /// Human-readable percentage
    #[tabled(rename = "Percentage")]
    pub formatted: String,
}

impl AnswerShare {
    /// Creates a new share entry with formatted percentage
    pub fn new(answer: String, count: usize, total: usize) -> Self {
        let percentage = if total == 0 {
            0.0
        } else {
            (count as f64 / total as f64) * 100.0
        };

        Self {
            answer,
            count,
            percentage,
            formatted: format!("{:.6}%", percentage),
        }
    }
}

/// Tallies answers into normalized shares.
///
/// Entries are ordered by descending count; ties keep the order in which the answers
/// first appear.
pub fn answer_shares<S: AsRef<str>>(answers: &[S]) -> Vec<AnswerShare> {
    let mut tally: Vec<(&str, usize)> = Vec::new();
    for answer in answers {
        let answer = answer.as_ref();
        match tally.iter_mut().find(|(seen, _)| *seen == answer) {
            Some((_, count)) => *count += 1,
            None => tally.push((answer, 1)),
        }
    }

    // Stable sort keeps first-appearance order for equal counts.
    tally.sort_by(|a, b| b.1.cmp(&a.1));

    let total = answers.len();
    tally
        .into_iter()
        .map(|(answer, count)| AnswerShare::new(answer.to_string(), count, total))
        .collect()
}

/// Formats share entries as an ASCII table using the [`tabled`] crate
///
/// # Arguments
/// * `shares` - A slice of [`AnswerShare`] to format
/// * `title` - Optional title for the table
///
/// # Returns
/// A formatted ASCII table as a [`String`]
pub fn format_share_table(shares: &[AnswerShare], title: Option<&str>) -> String {
    if shares.is_empty() {
        return "No answers available".to_string();
    }

    let table = Table::new(shares).to_string();

    match title {
        Some(title) => format!("{}\n{}", title, table),
        None => table,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_answer_share_new() {
        let entry = AnswerShare::new("はい".to_string(), 25, 100);
        assert_eq!(entry.answer, "はい");
        assert_eq!(entry.count, 25);
        assert_eq!(entry.formatted, "25.000000%");

        // Test zero total
        let entry_zero = AnswerShare::new("はい".to_string(), 10, 0);
        assert_eq!(entry_zero.percentage, 0.0);
    }

    #[test]
    fn test_answer_shares_order_and_total() {
        let answers = ["いいえ", "はい", "はい", "わからない", "はい", "いいえ"];
        let shares = answer_shares(&answers);

        assert_eq!(shares.len(), 3);
        assert_eq!(shares[0].answer, "はい");
        assert_eq!(shares[0].count, 3);
        assert_eq!(shares[1].answer, "いいえ");
        assert_eq!(shares[2].answer, "わからない");

        let total: f64 = shares.iter().map(|share| share.percentage).sum();
        assert!((total - 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_answer_shares_ties_keep_first_appearance() {
        let shares = answer_shares(&["いいえ", "はい"]);
        assert_eq!(shares[0].answer, "いいえ");
        assert_eq!(shares[1].answer, "はい");
    }

    #[test]
    fn test_format_share_table() {
        let shares = answer_shares(&["はい", "はい", "いいえ", "はい"]);

        let table = format_share_table(&shares, Some("# 動画1"));
        assert!(table.starts_with("# 動画1\n"));
        assert!(table.contains("Answer"));
        assert!(table.contains("Count"));
        assert!(table.contains("Percentage"));
        assert!(table.contains("75.000000%"));
        assert!(table.contains("25.000000%"));

        // Test without title
        let table_no_title = format_share_table(&shares, None);
        assert!(!table_no_title.contains("# 動画1"));
        assert!(table_no_title.contains("Answer"));

        assert_eq!(format_share_table(&[], None), "No answers available");
    }
}
