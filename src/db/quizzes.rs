use std::collections::{BTreeMap, BTreeSet};

use rusqlite::{params, Row};
use serde_json::json;
use tracing::{debug, info, warn};

use super::grades::GradeRef;
use super::{is_unique_violation, timestamp, Database};
use crate::error::{LmsError, Result};
use crate::grading::{self, Response};
use crate::models::{
    AnswerOption, AttemptResult, EventKind, NewQuiz, NotificationKind, Question, QuestionType,
    QuestionWithOptions, Quiz, QuizAnswer, QuizAttempt,
};

fn quiz_from_row(row: &Row<'_>) -> rusqlite::Result<Quiz> {
    Ok(Quiz {
        id: row.get(0)?,
        lesson_id: row.get(1)?,
        title: row.get(2)?,
        description: row.get(3)?,
        time_limit: row.get(4)?,
        max_attempts: row.get(5)?,
        passing_score: row.get(6)?,
    })
}

fn attempt_from_row(row: &Row<'_>) -> rusqlite::Result<QuizAttempt> {
    Ok(QuizAttempt {
        id: row.get(0)?,
        quiz_id: row.get(1)?,
        student_id: row.get(2)?,
        attempt_number: row.get(3)?,
        score: row.get(4)?,
        points_earned: row.get(5)?,
        total_points: row.get(6)?,
        passed: row.get(7)?,
        completed_at: row.get(8)?,
        time_taken: row.get(9)?,
    })
}

const ATTEMPT_COLUMNS: &str = "id, quiz_id, student_id, attempt_number, score, points_earned, \
                               total_points, passed, completed_at, time_taken";

impl Database {
    pub fn add_quiz(&self, actor_id: i64, lesson_id: i64, quiz: &NewQuiz<'_>) -> Result<i64> {
        let course_id = self.lesson_course_id(lesson_id)?;
        self.require_course_staff(actor_id, course_id)?;

        if quiz.title.trim().is_empty() {
            return Err(LmsError::invalid("quiz title must not be empty"));
        }
        if quiz.max_attempts < 1 {
            return Err(LmsError::invalid("max attempts must be at least 1"));
        }
        if !(0.0..=100.0).contains(&quiz.passing_score) {
            return Err(LmsError::invalid("passing score must be within 0..=100"));
        }

        let inserted = self.conn.execute(
            r#"
            INSERT INTO quizzes (lesson_id, title, description, time_limit, max_attempts, passing_score)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
            params![
                lesson_id,
                quiz.title.trim(),
                quiz.description,
                quiz.time_limit,
                quiz.max_attempts,
                quiz.passing_score
            ],
        );
        match inserted {
            Ok(_) => {
                let quiz_id = self.conn.last_insert_rowid();
                info!(quiz_id, lesson_id, "Created quiz");
                Ok(quiz_id)
            }
            Err(e) if is_unique_violation(&e) => Err(LmsError::invalid(format!(
                "lesson {lesson_id} already has a quiz"
            ))),
            Err(e) => Err(e.into()),
        }
    }

    pub fn get_quiz(&self, id: i64) -> Result<Option<Quiz>> {
        let quiz = self.conn.query_row(
            r#"
            SELECT id, lesson_id, title, description, time_limit, max_attempts, passing_score
            FROM quizzes WHERE id = ?1
            "#,
            params![id],
            quiz_from_row,
        );

        match quiz {
            Ok(q) => Ok(Some(q)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    pub fn require_quiz(&self, id: i64) -> Result<Quiz> {
        self.get_quiz(id)?
            .ok_or_else(|| LmsError::not_found("Quiz", id))
    }

    pub fn list_course_quizzes(&self, course_id: i64) -> Result<Vec<Quiz>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT q.id, q.lesson_id, q.title, q.description, q.time_limit, q.max_attempts, q.passing_score
            FROM quizzes q
            JOIN lessons l ON l.id = q.lesson_id
            JOIN modules m ON m.id = l.module_id
            WHERE m.course_id = ?1
            ORDER BY m.sort_order, l.sort_order, q.id
            "#,
        )?;
        let rows = stmt.query_map(params![course_id], quiz_from_row)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    pub fn add_question(
        &self,
        actor_id: i64,
        quiz_id: i64,
        text: &str,
        question_type: QuestionType,
        points: i32,
        order: i32,
    ) -> Result<i64> {
        let quiz = self.require_quiz(quiz_id)?;
        let course_id = self.lesson_course_id(quiz.lesson_id)?;
        self.require_course_staff(actor_id, course_id)?;

        if text.trim().is_empty() {
            return Err(LmsError::invalid("question text must not be empty"));
        }
        if points < 0 {
            return Err(LmsError::invalid("points must not be negative"));
        }

        self.conn.execute(
            "INSERT INTO questions (quiz_id, text, question_type, points, sort_order) VALUES (?1, ?2, ?3, ?4, ?5)",
            params![quiz_id, text.trim(), question_type.as_str(), points, order],
        )?;
        let question_id = self.conn.last_insert_rowid();
        debug!(question_id, quiz_id, "Added question");
        Ok(question_id)
    }

    pub fn add_option(
        &self,
        actor_id: i64,
        question_id: i64,
        text: &str,
        is_correct: bool,
        order: i32,
    ) -> Result<i64> {
        let quiz_id = self.conn.query_row(
            "SELECT quiz_id FROM questions WHERE id = ?1",
            params![question_id],
            |row| row.get::<_, i64>(0),
        );
        let quiz_id = match quiz_id {
            Ok(id) => id,
            Err(rusqlite::Error::QueryReturnedNoRows) => {
                return Err(LmsError::not_found("Question", question_id))
            }
            Err(e) => return Err(e.into()),
        };
        let quiz = self.require_quiz(quiz_id)?;
        let course_id = self.lesson_course_id(quiz.lesson_id)?;
        self.require_course_staff(actor_id, course_id)?;

        if text.trim().is_empty() {
            return Err(LmsError::invalid("option text must not be empty"));
        }

        self.conn.execute(
            "INSERT INTO answer_options (question_id, text, is_correct, sort_order) VALUES (?1, ?2, ?3, ?4)",
            params![question_id, text.trim(), is_correct, order],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    /// Questions in order, each with its ordered options.
    pub fn quiz_questions(&self, quiz_id: i64) -> Result<Vec<QuestionWithOptions>> {
        let questions = {
            let mut stmt = self.conn.prepare(
                r#"
                SELECT id, quiz_id, text, question_type, points, sort_order
                FROM questions
                WHERE quiz_id = ?1
                ORDER BY sort_order, id
                "#,
            )?;
            let rows = stmt.query_map(params![quiz_id], |row| {
                let question_type: String = row.get(3)?;
                Ok(Question {
                    id: row.get(0)?,
                    quiz_id: row.get(1)?,
                    text: row.get(2)?,
                    question_type: QuestionType::from_str(&question_type)
                        .unwrap_or(QuestionType::MultipleChoice),
                    points: row.get(4)?,
                    order: row.get(5)?,
                })
            })?;
            rows.collect::<rusqlite::Result<Vec<_>>>()?
        };

        let mut stmt = self.conn.prepare(
            r#"
            SELECT id, question_id, text, is_correct, sort_order
            FROM answer_options
            WHERE question_id = ?1
            ORDER BY sort_order, id
            "#,
        )?;

        let mut result = Vec::with_capacity(questions.len());
        for question in questions {
            let rows = stmt.query_map(params![question.id], |row| {
                Ok(AnswerOption {
                    id: row.get(0)?,
                    question_id: row.get(1)?,
                    text: row.get(2)?,
                    is_correct: row.get(3)?,
                    order: row.get(4)?,
                })
            })?;
            let options = rows.collect::<rusqlite::Result<Vec<_>>>()?;
            result.push(QuestionWithOptions { question, options });
        }

        Ok(result)
    }

    fn attempt_count(&self, student_id: i64, quiz_id: i64) -> Result<i32> {
        let count: i32 = self.conn.query_row(
            "SELECT COUNT(*) FROM quiz_attempts WHERE quiz_id = ?1 AND student_id = ?2",
            params![quiz_id, student_id],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    pub fn attempts_remaining(&self, student_id: i64, quiz_id: i64) -> Result<i32> {
        let quiz = self.require_quiz(quiz_id)?;
        let used = self.attempt_count(student_id, quiz_id)?;
        Ok((quiz.max_attempts - used).max(0))
    }

    /// Grades a submission against the quiz's answer key and stores it.
    ///
    /// `responses` maps question id to the student's answer; questions with
    /// no entry are scored as wrong. The enrollment's quiz grade tracks the
    /// best attempt so far.
    pub fn submit_attempt(
        &self,
        student_id: i64,
        quiz_id: i64,
        responses: &BTreeMap<i64, Response>,
        time_taken: Option<i64>,
    ) -> Result<AttemptResult> {
        let quiz = self.require_quiz(quiz_id)?;
        let course_id = self.lesson_course_id(quiz.lesson_id)?;
        let enrollment = self.require_enrollment(student_id, course_id)?;
        let questions = self.quiz_questions(quiz_id)?;

        if matches!(time_taken, Some(t) if t < 0) {
            return Err(LmsError::invalid("time taken must not be negative"));
        }
        validate_responses(&questions, responses)?;

        self.in_transaction(|db| {
            let used = db.attempt_count(student_id, quiz_id)?;
            if used >= quiz.max_attempts {
                warn!(student_id, quiz_id, used, "Attempt limit reached");
                return Err(LmsError::AttemptLimitReached {
                    quiz_id,
                    max_attempts: quiz.max_attempts,
                });
            }
            let attempt_number = used + 1;

            let blank = Response::Blank;
            let graded: Vec<(&QuestionWithOptions, &Response, bool)> = questions
                .iter()
                .map(|q| {
                    let response = responses.get(&q.question.id).unwrap_or(&blank);
                    let correct = grading::is_response_correct(&q.answer_key(), response);
                    (q, response, correct)
                })
                .collect();
            let score = grading::score_quiz(
                graded.iter().map(|(q, _, correct)| (q.question.points, *correct)),
                quiz.passing_score,
            );

            db.conn.execute(
                r#"
                INSERT INTO quiz_attempts (quiz_id, student_id, attempt_number, score, points_earned,
                                           total_points, passed, completed_at, time_taken)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
                "#,
                params![
                    quiz_id,
                    student_id,
                    attempt_number,
                    score.percentage,
                    score.points_earned,
                    score.total_points,
                    score.passed,
                    timestamp(),
                    time_taken
                ],
            )?;
            let attempt_id = db.conn.last_insert_rowid();

            for (q, response, correct) in &graded {
                let selected: Vec<i64> = response
                    .selected_options()
                    .map(|ids| ids.iter().copied().collect())
                    .unwrap_or_default();
                db.conn.execute(
                    r#"
                    INSERT INTO quiz_answers (attempt_id, question_id, selected_options, text_answer, is_correct)
                    VALUES (?1, ?2, ?3, ?4, ?5)
                    "#,
                    params![
                        attempt_id,
                        q.question.id,
                        serde_json::to_string(&selected)?,
                        response.text(),
                        correct
                    ],
                )?;
            }

            let (best_earned, best_total): (i64, i64) = db.conn.query_row(
                r#"
                SELECT points_earned, total_points FROM quiz_attempts
                WHERE quiz_id = ?1 AND student_id = ?2
                ORDER BY score DESC, points_earned DESC, attempt_number
                LIMIT 1
                "#,
                params![quiz_id, student_id],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )?;
            db.upsert_grade(
                enrollment.id,
                GradeRef::Quiz(quiz_id),
                best_earned as f64,
                best_total as f64,
            )?;
            let course_grade = db.recompute_course_grade(enrollment.id)?;

            db.record_event(
                EventKind::QuizAttempt,
                Some(course_id),
                Some(student_id),
                score.percentage,
                json!({
                    "quiz_id": quiz_id,
                    "attempt_number": attempt_number,
                    "passed": score.passed,
                }),
            )?;
            db.notify(
                student_id,
                NotificationKind::GradeUpdate,
                "Quiz graded",
                &format!(
                    "You scored {:.2}% on {} ({}). Course grade: {:.2}% ({}).",
                    score.percentage,
                    quiz.title,
                    if score.passed { "passed" } else { "not passed" },
                    course_grade.final_grade,
                    course_grade.letter_grade.as_str()
                ),
                Some(course_id),
            )?;

            info!(
                attempt_id,
                quiz_id,
                student_id,
                attempt_number,
                score = score.percentage,
                passed = score.passed,
                "Quiz attempt recorded"
            );

            let attempt = db
                .get_attempt(attempt_id)?
                .ok_or_else(|| LmsError::not_found("Attempt", attempt_id))?;
            Ok(AttemptResult {
                attempt,
                answers: db.attempt_answers(attempt_id)?,
                attempts_remaining: (quiz.max_attempts - attempt_number).max(0),
            })
        })
    }

    pub fn get_attempt(&self, id: i64) -> Result<Option<QuizAttempt>> {
        let attempt = self.conn.query_row(
            &format!("SELECT {ATTEMPT_COLUMNS} FROM quiz_attempts WHERE id = ?1"),
            params![id],
            attempt_from_row,
        );

        match attempt {
            Ok(a) => Ok(Some(a)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    pub fn list_attempts(&self, student_id: i64, quiz_id: i64) -> Result<Vec<QuizAttempt>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {ATTEMPT_COLUMNS} FROM quiz_attempts WHERE student_id = ?1 AND quiz_id = ?2 ORDER BY attempt_number"
        ))?;
        let rows = stmt.query_map(params![student_id, quiz_id], attempt_from_row)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    pub fn attempt_answers(&self, attempt_id: i64) -> Result<Vec<QuizAnswer>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT id, attempt_id, question_id, selected_options, text_answer, is_correct
            FROM quiz_answers
            WHERE attempt_id = ?1
            ORDER BY id
            "#,
        )?;
        let rows = stmt.query_map(params![attempt_id], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, i64>(1)?,
                row.get::<_, i64>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, Option<String>>(4)?,
                row.get::<_, bool>(5)?,
            ))
        })?;

        let mut answers = Vec::new();
        for row in rows {
            let (id, attempt_id, question_id, selected, text_answer, is_correct) = row?;
            answers.push(QuizAnswer {
                id,
                attempt_id,
                question_id,
                selected_option_ids: serde_json::from_str(&selected)?,
                text_answer,
                is_correct,
            });
        }
        Ok(answers)
    }
}

fn validate_responses(
    questions: &[QuestionWithOptions],
    responses: &BTreeMap<i64, Response>,
) -> Result<()> {
    for (question_id, response) in responses {
        let question = questions
            .iter()
            .find(|q| q.question.id == *question_id)
            .ok_or_else(|| {
                LmsError::invalid(format!("question {question_id} is not part of this quiz"))
            })?;

        if let Some(selected) = response.selected_options() {
            let known: BTreeSet<i64> = question.options.iter().map(|o| o.id).collect();
            if let Some(stray) = selected.iter().find(|id| !known.contains(id)) {
                return Err(LmsError::invalid(format!(
                    "option {stray} does not belong to question {question_id}"
                )));
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use crate::db::testing::{setup_db, Fixture};
    use crate::db::Database;
    use crate::error::LmsError;
    use crate::grading::{LetterGrade, Response};
    use crate::models::{GradeSource, NewQuiz, QuestionType};

    /// Quiz on the first lesson: a 2-point choice question and a 1-point
    /// short answer.
    struct QuizFixture {
        quiz_id: i64,
        choice_id: i64,
        right: i64,
        wrong: i64,
        short_id: i64,
    }

    fn quiz_fixture(db: &Database, fx: &Fixture, max_attempts: i32) -> QuizFixture {
        let quiz = NewQuiz {
            max_attempts,
            ..NewQuiz::new("Checkpoint")
        };
        let quiz_id = db.add_quiz(fx.instructor_id, fx.lesson_ids[0], &quiz).unwrap();
        let choice_id = db
            .add_question(fx.instructor_id, quiz_id, "Who owns it?", QuestionType::MultipleChoice, 2, 1)
            .unwrap();
        let right = db.add_option(fx.instructor_id, choice_id, "The binding", true, 1).unwrap();
        let wrong = db.add_option(fx.instructor_id, choice_id, "Everyone", false, 2).unwrap();
        let short_id = db
            .add_question(fx.instructor_id, quiz_id, "Keyword to borrow?", QuestionType::ShortAnswer, 1, 2)
            .unwrap();
        db.add_option(fx.instructor_id, short_id, "ref", true, 1).unwrap();

        QuizFixture {
            quiz_id,
            choice_id,
            right,
            wrong,
            short_id,
        }
    }

    fn choose(q: &QuizFixture, option: i64, text: &str) -> BTreeMap<i64, Response> {
        let mut responses = BTreeMap::new();
        responses.insert(q.choice_id, Response::Options([option].into_iter().collect()));
        responses.insert(q.short_id, Response::Text(text.to_string()));
        responses
    }

    mod authoring_tests {
        use super::*;

        #[test]
        fn questions_come_back_ordered_with_options() {
            let db = setup_db();
            let fx = Fixture::new(&db);
            let q = quiz_fixture(&db, &fx, 1);

            let questions = db.quiz_questions(q.quiz_id).unwrap();
            assert_eq!(questions.len(), 2);
            assert_eq!(questions[0].question.id, q.choice_id);
            assert_eq!(questions[0].options.len(), 2);
            assert_eq!(questions[1].question.question_type, QuestionType::ShortAnswer);
        }

        #[test]
        fn one_quiz_per_lesson() {
            let db = setup_db();
            let fx = Fixture::new(&db);
            quiz_fixture(&db, &fx, 1);
            let err = db
                .add_quiz(fx.instructor_id, fx.lesson_ids[0], &NewQuiz::new("Again"))
                .unwrap_err();
            assert!(matches!(err, LmsError::Invalid(_)));
        }

        #[test]
        fn quiz_settings_validated() {
            let db = setup_db();
            let fx = Fixture::new(&db);
            let zero_attempts = NewQuiz {
                max_attempts: 0,
                ..NewQuiz::new("Q")
            };
            assert!(db.add_quiz(fx.instructor_id, fx.lesson_ids[1], &zero_attempts).is_err());
            let bad_pass = NewQuiz {
                passing_score: 101.0,
                ..NewQuiz::new("Q")
            };
            assert!(db.add_quiz(fx.instructor_id, fx.lesson_ids[1], &bad_pass).is_err());
        }

        #[test]
        fn students_cannot_author() {
            let db = setup_db();
            let fx = Fixture::new(&db);
            assert!(matches!(
                db.add_quiz(fx.student_id, fx.lesson_ids[0], &NewQuiz::new("Q"))
                    .unwrap_err(),
                LmsError::PermissionDenied(_)
            ));
        }
    }

    mod attempt_tests {
        use super::*;

        #[test]
        fn all_correct_scores_full_marks() {
            let db = setup_db();
            let (fx, enrollment_id) = Fixture::enrolled(&db);
            let q = quiz_fixture(&db, &fx, 1);

            let result = db
                .submit_attempt(fx.student_id, q.quiz_id, &choose(&q, q.right, " REF "), Some(90))
                .unwrap();
            assert_eq!(result.attempt.attempt_number, 1);
            assert_eq!(result.attempt.points_earned, 3);
            assert_eq!(result.attempt.total_points, 3);
            assert_eq!(result.attempt.score, 100.0);
            assert!(result.attempt.passed);
            assert_eq!(result.attempt.time_taken, Some(90));
            assert_eq!(result.attempts_remaining, 0);
            assert_eq!(result.answers.len(), 2);
            assert_eq!(result.answers[0].selected_option_ids, vec![q.right]);
            assert_eq!(result.answers[1].text_answer.as_deref(), Some(" REF "));

            let cg = db.get_course_grade(enrollment_id).unwrap().unwrap();
            assert_eq!(cg.final_grade, 100.0);
            assert_eq!(cg.letter_grade, LetterGrade::A);
        }

        #[test]
        fn unanswered_questions_count_as_wrong() {
            let db = setup_db();
            let (fx, _) = Fixture::enrolled(&db);
            let q = quiz_fixture(&db, &fx, 1);

            let mut responses = BTreeMap::new();
            responses.insert(q.short_id, Response::Text("ref".into()));
            let result = db
                .submit_attempt(fx.student_id, q.quiz_id, &responses, None)
                .unwrap();
            assert_eq!(result.attempt.points_earned, 1);
            assert_eq!(result.attempt.score, 33.33);
            assert!(!result.attempt.passed);
            assert!(!result.answers[0].is_correct);
        }

        #[test]
        fn attempt_limit_enforced() {
            let db = setup_db();
            let (fx, _) = Fixture::enrolled(&db);
            let q = quiz_fixture(&db, &fx, 2);

            db.submit_attempt(fx.student_id, q.quiz_id, &BTreeMap::new(), None).unwrap();
            db.submit_attempt(fx.student_id, q.quiz_id, &BTreeMap::new(), None).unwrap();
            let err = db
                .submit_attempt(fx.student_id, q.quiz_id, &BTreeMap::new(), None)
                .unwrap_err();
            assert!(matches!(
                err,
                LmsError::AttemptLimitReached { max_attempts: 2, .. }
            ));
            assert_eq!(db.list_attempts(fx.student_id, q.quiz_id).unwrap().len(), 2);
            assert_eq!(db.attempts_remaining(fx.student_id, q.quiz_id).unwrap(), 0);
        }

        #[test]
        fn grade_keeps_best_attempt() {
            let db = setup_db();
            let (fx, enrollment_id) = Fixture::enrolled(&db);
            let q = quiz_fixture(&db, &fx, 3);

            db.submit_attempt(fx.student_id, q.quiz_id, &choose(&q, q.right, "ref"), None)
                .unwrap();
            db.submit_attempt(fx.student_id, q.quiz_id, &choose(&q, q.wrong, "nope"), None)
                .unwrap();

            let grades = db.list_grades(enrollment_id).unwrap();
            assert_eq!(grades.len(), 1);
            assert_eq!(grades[0].source, GradeSource::Quiz);
            assert_eq!(grades[0].quiz_id, Some(q.quiz_id));
            assert_eq!(grades[0].score, 3.0);
            assert_eq!(grades[0].max_points, 3.0);
            assert_eq!(
                db.get_course_grade(enrollment_id).unwrap().unwrap().final_grade,
                100.0
            );
        }

        #[test]
        fn grade_improves_with_better_attempt() {
            let db = setup_db();
            let (fx, enrollment_id) = Fixture::enrolled(&db);
            let q = quiz_fixture(&db, &fx, 2);

            db.submit_attempt(fx.student_id, q.quiz_id, &choose(&q, q.wrong, "ref"), None)
                .unwrap();
            assert_eq!(
                db.get_course_grade(enrollment_id).unwrap().unwrap().final_grade,
                33.33
            );
            db.submit_attempt(fx.student_id, q.quiz_id, &choose(&q, q.right, "ref"), None)
                .unwrap();
            assert_eq!(
                db.get_course_grade(enrollment_id).unwrap().unwrap().final_grade,
                100.0
            );
        }

        #[test]
        fn foreign_question_or_option_is_invalid() {
            let db = setup_db();
            let (fx, _) = Fixture::enrolled(&db);
            let q = quiz_fixture(&db, &fx, 1);

            let mut unknown_question = BTreeMap::new();
            unknown_question.insert(9999, Response::Blank);
            assert!(matches!(
                db.submit_attempt(fx.student_id, q.quiz_id, &unknown_question, None)
                    .unwrap_err(),
                LmsError::Invalid(_)
            ));

            let mut stray_option = BTreeMap::new();
            stray_option.insert(q.short_id, Response::Options([q.right].into_iter().collect()));
            assert!(matches!(
                db.submit_attempt(fx.student_id, q.quiz_id, &stray_option, None)
                    .unwrap_err(),
                LmsError::Invalid(_)
            ));

            // Rejected submissions do not use up attempts
            assert_eq!(db.attempts_remaining(fx.student_id, q.quiz_id).unwrap(), 1);
        }

        #[test]
        fn must_be_enrolled() {
            let db = setup_db();
            let (fx, _) = Fixture::enrolled(&db);
            let q = quiz_fixture(&db, &fx, 1);
            assert!(matches!(
                db.submit_attempt(fx.other_student_id, q.quiz_id, &BTreeMap::new(), None)
                    .unwrap_err(),
                LmsError::NotEnrolled(_)
            ));
        }
    }
}
