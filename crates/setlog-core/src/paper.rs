//! Exercise paper: the plain-text form of an exercise.
//!
//! ```text
//! 6x100
//! 5x102.5
//!
//! paused reps, felt heavy
//! ```
//!
//! One `REPSxWEIGHT` line per set, in order, then optional free-form
//! comments. The comments start at the first non-blank line that is not a
//! set line, or at the first non-blank line after a blank line that follows
//! the sets. Set ids are assigned by position (`_001`, `_002`, ...), so
//! saving the same paper twice reconciles to the same sets.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

use std::fmt;

use itertools::Itertools;

use crate::{
    domain::{normalize_comments, Exercise, ExerciseId, ExerciseSet, SetId},
    Error, Result,
};

/// One `REPSxWEIGHT` line.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SetLine {
    pub reps: u32,
    pub weight: f64,
}

impl fmt::Display for SetLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.reps, self.weight)
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Paper {
    pub lines: Vec<SetLine>,
    pub comments: Option<String>,
}

impl Paper {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Build the proposed exercise this paper describes.
    ///
    /// # Errors
    ///
    /// Returns `InvalidIdentifier` when there are more sets than ordinals.
    pub fn into_exercise(self, exercise_id: ExerciseId, sort: u32) -> Result<Exercise> {
        let sets = (1_u16..)
            .zip(self.lines)
            .map(|(ordinal, line)| {
                SetId::new(exercise_id.clone(), ordinal)
                    .map(|id| ExerciseSet::new(id, line.reps, line.weight))
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Exercise::proposed(exercise_id, sort, sets, self.comments)?)
    }
}

impl From<&Exercise> for Paper {
    fn from(exercise: &Exercise) -> Self {
        Self {
            lines: exercise
                .sets
                .iter()
                .map(|s| SetLine {
                    reps: s.reps,
                    weight: s.weight,
                })
                .collect(),
            comments: exercise.comments.clone(),
        }
    }
}

impl fmt::Display for Paper {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.lines.iter().join("\n"))?;
        if let Some(comments) = &self.comments {
            write!(f, "\n\n{comments}")?;
        }
        Ok(())
    }
}

/// Render sets and comments as paper text.
#[must_use]
pub fn generate_summary(sets: &[ExerciseSet], comments: Option<&str>) -> String {
    Paper {
        lines: sets
            .iter()
            .map(|s| SetLine {
                reps: s.reps,
                weight: s.weight,
            })
            .collect(),
        comments: normalize_comments(comments.map(String::from)),
    }
    .to_string()
}

/// Split a line into reps and weight text when it has the shape of a set
/// line: digits, then `x`.
fn split_set_line(line: &str) -> Option<(&str, &str)> {
    line.split_once(&['x', 'X'][..]).filter(|(reps, _)| {
        let reps = reps.trim();
        !reps.is_empty() && reps.bytes().all(|b| b.is_ascii_digit())
    })
}

fn parse_set_line(number: usize, reps: &str, weight: &str) -> Result<SetLine> {
    let reps: u32 = reps
        .trim()
        .parse()
        .map_err(|e| Error::invalid_paper(number, format!("invalid reps '{}': {e}", reps.trim())))?;

    let weight_text = weight.trim();
    let weight: f64 = weight_text
        .parse()
        .map_err(|e| Error::invalid_paper(number, format!("invalid weight '{weight_text}': {e}")))?;
    if !weight.is_finite() || weight < 0.0 {
        return Err(Error::invalid_paper(
            number,
            format!("weight must be a non-negative number, got '{weight_text}'"),
        ));
    }

    Ok(SetLine { reps, weight })
}

/// Read paper text.
///
/// # Errors
///
/// Returns `InvalidPaper` with the 1-based line number when a set line has
/// unparsable reps or weight.
pub fn parse_paper(text: &str) -> Result<Paper> {
    let mut lines = Vec::new();
    let mut raw = text.lines().enumerate();
    let mut after_gap = false;

    let comment_start = loop {
        let Some((index, line)) = raw.next() else {
            break None;
        };
        let trimmed = line.trim();
        if trimmed.is_empty() {
            after_gap = !lines.is_empty();
            continue;
        }
        if after_gap {
            break Some(line);
        }
        match split_set_line(trimmed) {
            Some((reps, weight)) => lines.push(parse_set_line(index + 1, reps, weight)?),
            None => break Some(line),
        }
    };

    let comments = comment_start.map(|first| {
        std::iter::once(first)
            .chain(raw.map(|(_, line)| line))
            .join("\n")
    });

    Ok(Paper {
        lines,
        comments: normalize_comments(comments),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn exercise_id() -> ExerciseId {
        ExerciseId::parse("2018-05-04_bench-press").expect("valid id")
    }

    #[test]
    fn test_summary_matches_paper_format() {
        let id = exercise_id();
        let sets = vec![
            ExerciseSet::new(SetId::new(id.clone(), 1).expect("valid"), 6, 100.0),
            ExerciseSet::new(SetId::new(id, 2).expect("valid"), 5, 102.5),
        ];

        assert_eq!(generate_summary(&sets, None), "6x100\n5x102.5");
        assert_eq!(
            generate_summary(&sets, Some("Some comment")),
            "6x100\n5x102.5\n\nSome comment"
        );
        assert_eq!(generate_summary(&sets, Some("  ")), "6x100\n5x102.5");
    }

    #[test]
    fn test_parse_sets_and_comments() {
        let paper = parse_paper("6x100\n5X102.5\n\nfelt heavy\n\nnext time 105").expect("parse");
        assert_eq!(
            paper.lines,
            vec![
                SetLine { reps: 6, weight: 100.0 },
                SetLine { reps: 5, weight: 102.5 },
            ]
        );
        assert_eq!(paper.comments.as_deref(), Some("felt heavy\n\nnext time 105"));
    }

    #[test]
    fn test_parse_comment_starting_with_digit() {
        let paper = parse_paper("6x100\n3 warmup sets skipped").expect("parse");
        assert_eq!(paper.lines.len(), 1);
        assert_eq!(paper.comments.as_deref(), Some("3 warmup sets skipped"));
    }

    #[test]
    fn test_set_shaped_lines_after_gap_are_comments() {
        let paper = parse_paper("6x100\n\n3x per week\n2x5 next time").expect("parse");
        assert_eq!(paper.lines, vec![SetLine { reps: 6, weight: 100.0 }]);
        assert_eq!(paper.comments.as_deref(), Some("3x per week\n2x5 next time"));

        let leading_blank = parse_paper("\n\n6x100\n5x100").expect("parse");
        assert_eq!(leading_blank.lines.len(), 2);
        assert_eq!(leading_blank.comments, None);
    }

    #[test]
    fn test_parse_rejects_bad_weight() {
        let result = parse_paper("6x100\n5xabc");
        assert!(matches!(result, Err(Error::InvalidPaper { line: 2, .. })));

        let result = parse_paper("6x-5");
        assert!(matches!(result, Err(Error::InvalidPaper { line: 1, .. })));
    }

    #[test]
    fn test_empty_paper_has_no_sets() {
        let paper = parse_paper("  \n\n").expect("parse");
        assert!(paper.is_empty());
        assert_eq!(paper.comments, None);
    }

    #[test]
    fn test_into_exercise_assigns_ordinals() {
        let exercise = parse_paper("6x100\n5x100\n\nok")
            .and_then(|p| p.into_exercise(exercise_id(), 1))
            .expect("exercise");

        let ids: Vec<String> = exercise.sets.iter().map(|s| s.id.to_string()).collect();
        assert_eq!(
            ids,
            vec!["2018-05-04_bench-press_001", "2018-05-04_bench-press_002"]
        );
        assert_eq!(exercise.comments.as_deref(), Some("ok"));
    }

    #[test]
    fn test_summary_parses_back() {
        let exercise = parse_paper("6x100\n5x102.5\n\nok")
            .and_then(|p| p.into_exercise(exercise_id(), 1))
            .expect("exercise");
        let text = generate_summary(&exercise.sets, exercise.comments.as_deref());
        assert_eq!(parse_paper(&text).expect("parse"), Paper::from(&exercise));
    }
}
