//! Progress, quiz scoring and final-grade arithmetic.
//!
//! Everything here is pure; the database layer gathers the rows and calls
//! into these functions so the formulas live in exactly one place.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::models::QuestionType;

pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Share of a course's lessons an enrollment has completed, in percent.
pub fn progress_percentage(completed: usize, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    round2((completed as f64 / total as f64) * 100.0).min(100.0)
}

pub fn grade_percentage(score: f64, max_points: f64) -> f64 {
    if max_points > 0.0 {
        (score / max_points) * 100.0
    } else {
        0.0
    }
}

/// Aggregate percentage over `(score, max_points)` pairs.
pub fn final_grade<I>(grades: I) -> f64
where
    I: IntoIterator<Item = (f64, f64)>,
{
    let (total_score, total_max) = grades
        .into_iter()
        .fold((0.0, 0.0), |(s, m), (score, max)| (s + score, m + max));
    grade_percentage(total_score, total_max)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum LetterGrade {
    A,
    B,
    C,
    D,
    F,
}

impl LetterGrade {
    pub fn from_percentage(percentage: f64) -> Self {
        if percentage >= 90.0 {
            LetterGrade::A
        } else if percentage >= 80.0 {
            LetterGrade::B
        } else if percentage >= 70.0 {
            LetterGrade::C
        } else if percentage >= 60.0 {
            LetterGrade::D
        } else {
            LetterGrade::F
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            LetterGrade::A => "A",
            LetterGrade::B => "B",
            LetterGrade::C => "C",
            LetterGrade::D => "D",
            LetterGrade::F => "F",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().as_str() {
            "A" => Some(LetterGrade::A),
            "B" => Some(LetterGrade::B),
            "C" => Some(LetterGrade::C),
            "D" => Some(LetterGrade::D),
            "F" => Some(LetterGrade::F),
            _ => None,
        }
    }

    pub fn all() -> [LetterGrade; 5] {
        [
            LetterGrade::A,
            LetterGrade::B,
            LetterGrade::C,
            LetterGrade::D,
            LetterGrade::F,
        ]
    }
}

/// What a correct answer to one question looks like.
#[derive(Debug, Clone)]
pub struct AnswerKey {
    pub question_type: QuestionType,
    pub points: i32,
    pub correct_option_ids: BTreeSet<i64>,
    /// Texts of the correct options; short answers are matched against these.
    pub accepted_answers: Vec<String>,
}

/// A student's answer to one question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Response {
    Options(BTreeSet<i64>),
    Text(String),
    Blank,
}

impl Response {
    pub fn selected_options(&self) -> Option<&BTreeSet<i64>> {
        match self {
            Response::Options(ids) => Some(ids),
            _ => None,
        }
    }

    pub fn text(&self) -> Option<&str> {
        match self {
            Response::Text(t) => Some(t),
            _ => None,
        }
    }
}

pub fn is_response_correct(key: &AnswerKey, response: &Response) -> bool {
    match (key.question_type, response) {
        (_, Response::Blank) => false,
        (QuestionType::ShortAnswer, Response::Text(text)) => {
            let given = text.trim();
            !given.is_empty()
                && key
                    .accepted_answers
                    .iter()
                    .any(|accepted| accepted.trim().eq_ignore_ascii_case(given))
        }
        (QuestionType::MultipleChoice | QuestionType::TrueFalse, Response::Options(selected)) => {
            !key.correct_option_ids.is_empty() && *selected == key.correct_option_ids
        }
        _ => false,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct QuizScore {
    pub points_earned: i64,
    pub total_points: i64,
    pub percentage: f64,
    pub passed: bool,
}

/// Scores a quiz from `(points, correct)` per question.
pub fn score_quiz<I>(outcomes: I, passing_score: f64) -> QuizScore
where
    I: IntoIterator<Item = (i32, bool)>,
{
    let (earned, total) = outcomes
        .into_iter()
        .fold((0i64, 0i64), |(earned, total), (points, correct)| {
            let points = points.max(0) as i64;
            (earned + if correct { points } else { 0 }, total + points)
        });

    let percentage = if total > 0 {
        round2((earned as f64 / total as f64) * 100.0)
    } else {
        0.0
    };

    QuizScore {
        points_earned: earned,
        total_points: total,
        percentage,
        passed: percentage >= passing_score,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(question_type: QuestionType, correct: &[i64], accepted: &[&str]) -> AnswerKey {
        AnswerKey {
            question_type,
            points: 1,
            correct_option_ids: correct.iter().copied().collect(),
            accepted_answers: accepted.iter().map(|s| s.to_string()).collect(),
        }
    }

    fn options(ids: &[i64]) -> Response {
        Response::Options(ids.iter().copied().collect())
    }

    mod progress_tests {
        use super::*;

        #[test]
        fn no_lessons_is_zero() {
            assert_eq!(progress_percentage(0, 0), 0.0);
            assert_eq!(progress_percentage(3, 0), 0.0);
        }

        #[test]
        fn rounds_to_two_decimals() {
            assert_eq!(progress_percentage(1, 3), 33.33);
            assert_eq!(progress_percentage(2, 3), 66.67);
        }

        #[test]
        fn complete_is_one_hundred() {
            assert_eq!(progress_percentage(4, 4), 100.0);
        }

        #[test]
        fn never_exceeds_one_hundred() {
            assert_eq!(progress_percentage(5, 4), 100.0);
        }
    }

    mod final_grade_tests {
        use super::*;

        #[test]
        fn empty_is_zero() {
            assert_eq!(final_grade(Vec::new()), 0.0);
        }

        #[test]
        fn zero_max_points_is_zero() {
            assert_eq!(final_grade(vec![(5.0, 0.0)]), 0.0);
        }

        #[test]
        fn weights_by_points_not_by_item() {
            // 9/10 and 50/100 -> 59/110, not the mean of 90% and 50%
            let grade = final_grade(vec![(9.0, 10.0), (50.0, 100.0)]);
            assert!((grade - 53.636_363).abs() < 1e-4);
        }

        #[test]
        fn grade_percentage_handles_zero_max() {
            assert_eq!(grade_percentage(3.0, 0.0), 0.0);
            assert_eq!(grade_percentage(45.0, 50.0), 90.0);
        }
    }

    mod letter_grade_tests {
        use super::*;

        #[test]
        fn band_boundaries() {
            assert_eq!(LetterGrade::from_percentage(100.0), LetterGrade::A);
            assert_eq!(LetterGrade::from_percentage(90.0), LetterGrade::A);
            assert_eq!(LetterGrade::from_percentage(89.99), LetterGrade::B);
            assert_eq!(LetterGrade::from_percentage(80.0), LetterGrade::B);
            assert_eq!(LetterGrade::from_percentage(79.99), LetterGrade::C);
            assert_eq!(LetterGrade::from_percentage(70.0), LetterGrade::C);
            assert_eq!(LetterGrade::from_percentage(69.99), LetterGrade::D);
            assert_eq!(LetterGrade::from_percentage(60.0), LetterGrade::D);
            assert_eq!(LetterGrade::from_percentage(59.99), LetterGrade::F);
            assert_eq!(LetterGrade::from_percentage(0.0), LetterGrade::F);
        }

        #[test]
        fn str_conversion() {
            for letter in LetterGrade::all() {
                assert_eq!(LetterGrade::from_str(letter.as_str()), Some(letter));
            }
            assert_eq!(LetterGrade::from_str("b"), Some(LetterGrade::B));
            assert_eq!(LetterGrade::from_str("E"), None);
        }
    }

    mod correctness_tests {
        use super::*;

        #[test]
        fn single_choice_exact_match() {
            let k = key(QuestionType::MultipleChoice, &[2], &[]);
            assert!(is_response_correct(&k, &options(&[2])));
            assert!(!is_response_correct(&k, &options(&[1])));
            assert!(!is_response_correct(&k, &options(&[1, 2])));
        }

        #[test]
        fn multiple_correct_options_require_all() {
            let k = key(QuestionType::MultipleChoice, &[1, 3], &[]);
            assert!(is_response_correct(&k, &options(&[3, 1])));
            assert!(!is_response_correct(&k, &options(&[1])));
        }

        #[test]
        fn question_without_correct_option_is_never_correct() {
            let k = key(QuestionType::TrueFalse, &[], &[]);
            assert!(!is_response_correct(&k, &options(&[])));
        }

        #[test]
        fn short_answer_is_case_and_whitespace_insensitive() {
            let k = key(QuestionType::ShortAnswer, &[9], &["Ownership"]);
            assert!(is_response_correct(&k, &Response::Text("  ownership ".into())));
            assert!(!is_response_correct(&k, &Response::Text("borrowing".into())));
            assert!(!is_response_correct(&k, &Response::Text("   ".into())));
        }

        #[test]
        fn blank_and_mismatched_kinds_are_wrong() {
            let choice = key(QuestionType::MultipleChoice, &[1], &["yes"]);
            assert!(!is_response_correct(&choice, &Response::Blank));
            assert!(!is_response_correct(&choice, &Response::Text("yes".into())));

            let short = key(QuestionType::ShortAnswer, &[1], &["yes"]);
            assert!(!is_response_correct(&short, &options(&[1])));
        }
    }

    mod score_tests {
        use super::*;

        #[test]
        fn sums_points_of_correct_questions() {
            let score = score_quiz(vec![(2, true), (1, false), (1, true)], 70.0);
            assert_eq!(score.points_earned, 3);
            assert_eq!(score.total_points, 4);
            assert_eq!(score.percentage, 75.0);
            assert!(score.passed);
        }

        #[test]
        fn passing_is_inclusive() {
            let score = score_quiz(vec![(7, true), (3, false)], 70.0);
            assert_eq!(score.percentage, 70.0);
            assert!(score.passed);
        }

        #[test]
        fn below_threshold_fails() {
            let score = score_quiz(vec![(1, true), (2, false)], 50.0);
            assert_eq!(score.percentage, 33.33);
            assert!(!score.passed);
        }

        #[test]
        fn empty_quiz_scores_zero() {
            let score = score_quiz(Vec::new(), 70.0);
            assert_eq!(score.total_points, 0);
            assert_eq!(score.percentage, 0.0);
            assert!(!score.passed);
        }

        #[test]
        fn negative_points_are_ignored() {
            let score = score_quiz(vec![(-5, true), (1, true)], 70.0);
            assert_eq!(score.points_earned, 1);
            assert_eq!(score.total_points, 1);
        }
    }
}
