//! Scoring scanned answers against an answer key
//!
//! This sits outside the scanner: the scanner only reports what was marked,
//! and callers that know the correct answers grade it here.

use serde::Serialize;
use thiserror::Error;

use crate::bubbles::AnswerOption;
use crate::scanner::AnswersMap;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum KeyError {
    #[error("answer key is empty")]
    Empty,

    #[error("invalid answer '{found}' at position {position} (expected A-D)")]
    InvalidOption { position: usize, found: char },
}

/// Parse a key such as `"ABCD BADC"` or `"A,B,C,D"`.
///
/// Whitespace, commas and semicolons are separators; every other character
/// is one question's answer, in order.
pub fn parse_key(text: &str) -> Result<Vec<AnswerOption>, KeyError> {
    let key = text
        .chars()
        .filter(|c| !c.is_whitespace() && *c != ',' && *c != ';')
        .enumerate()
        .map(|(i, c)| {
            c.to_string()
                .parse::<AnswerOption>()
                .map_err(|_| KeyError::InvalidOption {
                    position: i + 1,
                    found: c,
                })
        })
        .collect::<Result<Vec<_>, _>>()?;

    if key.is_empty() {
        return Err(KeyError::Empty);
    }
    Ok(key)
}

/// Outcome of grading one sheet
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub struct GradeReport {
    pub correct: usize,
    pub wrong: usize,
    pub blank: usize,
    pub total: usize,
    /// Rounded to the nearest whole percent
    pub percent: u32,
}

/// Compare answers for questions `1..=key.len()` with the key
pub fn grade(answers: &AnswersMap, key: &[AnswerOption]) -> GradeReport {
    let mut correct = 0;
    let mut blank = 0;

    for (index, expected) in key.iter().enumerate() {
        match answers.get(&(index as u32 + 1)).copied().flatten() {
            None => blank += 1,
            Some(answer) if answer == *expected => correct += 1,
            Some(_) => {}
        }
    }

    let total = key.len();
    let percent = if total > 0 {
        (correct as f64 / total as f64 * 100.0).round() as u32
    } else {
        0
    };

    GradeReport {
        correct,
        wrong: total - correct - blank,
        blank,
        total,
        percent,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use AnswerOption::*;

    #[test]
    fn test_parse_key() {
        assert_eq!(parse_key("abcd").unwrap(), vec![A, B, C, D]);
        assert_eq!(parse_key("A, B;C\nD").unwrap(), vec![A, B, C, D]);
        assert_eq!(parse_key("  "), Err(KeyError::Empty));
        assert_eq!(
            parse_key("ABX"),
            Err(KeyError::InvalidOption {
                position: 3,
                found: 'X'
            })
        );
    }

    #[test]
    fn test_grade_counts() {
        let mut answers = AnswersMap::new();
        answers.insert(1, Some(A));
        answers.insert(2, Some(C));
        answers.insert(3, None);
        // Question 4 missing entirely, question 5 beyond the key
        answers.insert(5, Some(D));

        let report = grade(&answers, &[A, B, C, D]);
        assert_eq!(
            report,
            GradeReport {
                correct: 1,
                wrong: 1,
                blank: 2,
                total: 4,
                percent: 25
            }
        );
    }

    #[test]
    fn test_percent_rounds() {
        let answers: AnswersMap = [(1, Some(A)), (2, Some(B)), (3, None)].into_iter().collect();
        assert_eq!(grade(&answers, &[A, B, C]).percent, 67);
        assert_eq!(grade(&AnswersMap::new(), &[]).percent, 0);
    }
}
