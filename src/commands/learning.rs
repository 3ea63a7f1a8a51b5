use std::collections::{BTreeMap, BTreeSet};

use serde_json::json;

use super::{bar, Ctx};
use crate::cli::{AssignmentCommands, GradeCommands, QuizCommands};
use crate::db::parse_due_date;
use crate::error::{LmsError, Result};
use crate::grading::Response;
use crate::models::{
    NewQuiz, ProgressReport, QuestionType, QuestionWithOptions, Submission,
};
use crate::text::truncate;

pub fn enroll(ctx: &Ctx<'_>, course_id: i64) -> Result<()> {
    let actor = ctx.actor()?;
    let id = ctx.db.enroll(actor.id, course_id)?;
    let course = ctx.db.require_course(course_id)?;
    ctx.emit(&json!({ "enrollment_id": id, "course_id": course_id }), || {
        println!("Enrolled in '{}' (enrollment {}).", course.title, id)
    })
}

pub fn unenroll(ctx: &Ctx<'_>, course_id: i64) -> Result<()> {
    let actor = ctx.actor()?;
    ctx.db.unenroll(actor.id, course_id)?;
    ctx.done(&format!("Left course {course_id}."))
}

pub fn progress(ctx: &Ctx<'_>, course_id: Option<i64>) -> Result<()> {
    let actor = ctx.actor()?;

    let Some(course_id) = course_id else {
        let rows = ctx.db.student_gradebook(actor.id)?;
        return ctx.emit(&rows, || {
            if rows.is_empty() {
                println!("Not enrolled in any course.");
                return;
            }
            println!("{:<5} {:<35} {:<24} GRADE", "ID", "COURSE", "PROGRESS");
            println!("{}", "-".repeat(75));
            for row in &rows {
                println!(
                    "{:<5} {:<35} {} {:>6.2}% {:>6.2} {}",
                    row.course_id,
                    truncate(&row.course_title, 33),
                    bar(row.progress, 10),
                    row.progress,
                    row.final_grade,
                    row.letter_grade.as_str()
                );
            }
        });
    };

    let enrollment = ctx.db.require_enrollment(actor.id, course_id)?;
    let report = ctx.db.progress(enrollment.id)?;
    let done: BTreeSet<i64> = ctx.db.completed_lesson_ids(enrollment.id)?.into_iter().collect();
    let outline = ctx.db.course_outline(course_id)?;

    ctx.emit(
        &json!({ "progress": report, "completed_lesson_ids": done }),
        || {
            println!("{}", outline.course.title);
            print_report(&report);
            for module in &outline.modules {
                println!();
                println!("{}", module.module.title);
                for lesson in &module.lessons {
                    let mark = if done.contains(&lesson.id) { "x" } else { " " };
                    println!("  [{}] {} (#{})", mark, lesson.title, lesson.id);
                }
            }
        },
    )
}

pub fn complete(ctx: &Ctx<'_>, lesson_id: i64, undo: bool) -> Result<()> {
    let actor = ctx.actor()?;
    let report = if undo {
        ctx.db.uncomplete_lesson(actor.id, lesson_id)?
    } else {
        ctx.db.complete_lesson(actor.id, lesson_id)?
    };
    ctx.emit(&report, || {
        if undo {
            println!("Lesson {lesson_id} marked as not completed.");
        } else {
            println!("Lesson {lesson_id} completed.");
        }
        print_report(&report);
        if report.is_complete() {
            println!("Course finished! Claim your certificate with: lms cert claim <course>");
        }
    })
}

fn print_report(report: &ProgressReport) {
    println!(
        "Progress: {} {}/{} lessons ({:.2}%)",
        bar(report.percentage, 20),
        report.completed,
        report.total,
        report.percentage
    );
}

pub fn quizzes(ctx: &Ctx<'_>, cmd: QuizCommands) -> Result<()> {
    match cmd {
        QuizCommands::Add {
            lesson_id,
            title,
            description,
            time_limit,
            attempts,
            passing,
        } => {
            let actor = ctx.actor()?;
            let quiz = NewQuiz {
                title: &title,
                description: description.as_deref(),
                time_limit,
                max_attempts: attempts,
                passing_score: passing,
            };
            let id = ctx.db.add_quiz(actor.id, lesson_id, &quiz)?;
            ctx.emit(&json!({ "id": id, "title": title }), || {
                println!("Added quiz '{}' with ID: {}", title, id)
            })
        }

        QuizCommands::Question {
            quiz_id,
            text,
            question_type,
            points,
            order,
        } => {
            let actor = ctx.actor()?;
            let kind = QuestionType::from_str(&question_type).ok_or_else(|| {
                LmsError::invalid(format!(
                    "Invalid question type '{question_type}'. Use: multiple_choice, true_false, or short_answer"
                ))
            })?;
            let id = ctx
                .db
                .add_question(actor.id, quiz_id, &text, kind, points, order)?;
            ctx.emit(&json!({ "id": id, "quiz_id": quiz_id }), || {
                println!("Added {} question with ID: {}", kind.label(), id)
            })
        }

        QuizCommands::AddOption {
            question_id,
            text,
            correct,
            order,
        } => {
            let actor = ctx.actor()?;
            let id = ctx
                .db
                .add_option(actor.id, question_id, &text, correct, order)?;
            ctx.emit(&json!({ "id": id, "question_id": question_id }), || {
                println!(
                    "Added option with ID: {}{}",
                    id,
                    if correct { " (correct)" } else { "" }
                )
            })
        }

        QuizCommands::List { course_id } => {
            let quizzes = ctx.db.list_course_quizzes(course_id)?;
            ctx.emit(&quizzes, || {
                if quizzes.is_empty() {
                    println!("No quizzes found.");
                    return;
                }
                println!("{:<5} {:<35} {:<8} {:>8} {:>8}", "ID", "TITLE", "LESSON", "ATTEMPTS", "PASS %");
                println!("{}", "-".repeat(70));
                for quiz in &quizzes {
                    println!(
                        "{:<5} {:<35} {:<8} {:>8} {:>8.1}",
                        quiz.id,
                        truncate(&quiz.title, 33),
                        quiz.lesson_id,
                        quiz.max_attempts,
                        quiz.passing_score
                    );
                }
            })
        }

        QuizCommands::Show { quiz_id } => {
            let actor = ctx.actor()?;
            let quiz = ctx.db.require_quiz(quiz_id)?;
            let questions = ctx.db.quiz_questions(quiz_id)?;
            let reveal = actor.is_staff();
            let remaining = if reveal {
                None
            } else {
                Some(ctx.db.attempts_remaining(actor.id, quiz_id)?)
            };

            let data = json!({
                "quiz": quiz,
                "questions": questions_json(&questions, reveal),
                "attempts_remaining": remaining,
            });
            ctx.emit(&data, || {
                println!("Quiz: {} (ID: {})", quiz.title, quiz.id);
                if let Some(desc) = &quiz.description {
                    println!("{desc}");
                }
                if let Some(limit) = quiz.time_limit {
                    println!("Time limit: {limit} minutes");
                }
                println!("Passing score: {:.1}%", quiz.passing_score);
                if let Some(n) = remaining {
                    println!("Attempts remaining: {n} of {}", quiz.max_attempts);
                }
                for q in &questions {
                    println!();
                    println!(
                        "Q{} [{} pt, {}] {}",
                        q.question.id,
                        q.question.points,
                        q.question.question_type.label(),
                        q.question.text
                    );
                    if q.question.question_type == QuestionType::ShortAnswer && !reveal {
                        continue;
                    }
                    for option in &q.options {
                        let mark = if reveal && option.is_correct { "*" } else { " " };
                        println!("   {}{:>4}) {}", mark, option.id, option.text);
                    }
                }
            })
        }

        QuizCommands::Take {
            quiz_id,
            answers,
            time,
        } => {
            let actor = ctx.actor()?;
            let questions = ctx.db.quiz_questions(quiz_id)?;
            let responses = parse_answers(&questions, &answers)?;
            let result = ctx.db.submit_attempt(actor.id, quiz_id, &responses, time)?;
            let attempt = &result.attempt;
            ctx.emit(&result, || {
                println!(
                    "Attempt {}: {}/{} points ({:.2}%) - {}",
                    attempt.attempt_number,
                    attempt.points_earned,
                    attempt.total_points,
                    attempt.score,
                    if attempt.passed { "PASSED" } else { "not passed" }
                );
                for answer in &result.answers {
                    println!(
                        "  Q{}: {}",
                        answer.question_id,
                        if answer.is_correct { "correct" } else { "wrong" }
                    );
                }
                println!("Attempts remaining: {}", result.attempts_remaining);
            })
        }

        QuizCommands::Attempts { quiz_id } => {
            let actor = ctx.actor()?;
            let attempts = ctx.db.list_attempts(actor.id, quiz_id)?;
            ctx.emit(&attempts, || {
                if attempts.is_empty() {
                    println!("No attempts yet.");
                    return;
                }
                println!("{:<4} {:>8} {:>10} {:<7} COMPLETED", "#", "SCORE", "POINTS", "PASSED");
                println!("{}", "-".repeat(60));
                for a in &attempts {
                    println!(
                        "{:<4} {:>7.2}% {:>10} {:<7} {}",
                        a.attempt_number,
                        a.score,
                        format!("{}/{}", a.points_earned, a.total_points),
                        if a.passed { "yes" } else { "no" },
                        a.completed_at
                    );
                }
            })
        }
    }
}

/// Questions as shown to a quiz taker; correctness only when `reveal`.
fn questions_json(questions: &[QuestionWithOptions], reveal: bool) -> serde_json::Value {
    questions
        .iter()
        .map(|q| {
            let options: Vec<serde_json::Value> = q
                .options
                .iter()
                .map(|o| {
                    let mut option = json!({ "id": o.id, "text": o.text, "order": o.order });
                    if reveal {
                        option["is_correct"] = json!(o.is_correct);
                    }
                    option
                })
                .collect();
            // Short-answer options are the accepted answers.
            let options = if q.question.question_type == QuestionType::ShortAnswer && !reveal {
                Vec::new()
            } else {
                options
            };
            json!({
                "id": q.question.id,
                "text": q.question.text,
                "question_type": q.question.question_type.as_str(),
                "points": q.question.points,
                "options": options,
            })
        })
        .collect()
}

/// Parses `QUESTION=OPTION[,OPTION]` or `QUESTION=free text`. Choice tokens
/// may name an option by id or by its text.
pub(crate) fn parse_answers(
    questions: &[QuestionWithOptions],
    raw: &[String],
) -> Result<BTreeMap<i64, Response>> {
    let mut responses = BTreeMap::new();

    for entry in raw {
        let (qid, value) = entry
            .split_once('=')
            .ok_or_else(|| LmsError::invalid(format!("answer '{entry}' is not QUESTION=VALUE")))?;
        let qid: i64 = qid
            .trim()
            .parse()
            .map_err(|_| LmsError::invalid(format!("'{qid}' is not a question id")))?;
        let question = questions
            .iter()
            .find(|q| q.question.id == qid)
            .ok_or_else(|| LmsError::invalid(format!("question {qid} is not part of this quiz")))?;

        let value = value.trim();
        let response = if value.is_empty() {
            Response::Blank
        } else if question.question.question_type == QuestionType::ShortAnswer {
            Response::Text(value.to_string())
        } else {
            let mut ids = BTreeSet::new();
            for token in value.split(',').map(str::trim).filter(|t| !t.is_empty()) {
                let id = match token.parse::<i64>() {
                    Ok(id) => id,
                    Err(_) => question
                        .options
                        .iter()
                        .find(|o| o.text.eq_ignore_ascii_case(token))
                        .map(|o| o.id)
                        .ok_or_else(|| {
                            LmsError::invalid(format!("question {qid} has no option '{token}'"))
                        })?,
                };
                ids.insert(id);
            }
            Response::Options(ids)
        };
        responses.insert(qid, response);
    }

    Ok(responses)
}

pub fn assignments(ctx: &Ctx<'_>, cmd: AssignmentCommands) -> Result<()> {
    match cmd {
        AssignmentCommands::Add {
            lesson_id,
            title,
            due,
            description,
            points,
        } => {
            let actor = ctx.actor()?;
            let due_date = parse_due_date(&due)?;
            let id = ctx
                .db
                .add_assignment(actor.id, lesson_id, &title, &description, due_date, points)?;
            ctx.emit(&json!({ "id": id, "title": title, "due_date": due_date }), || {
                println!(
                    "Added assignment '{}' with ID: {} (due {})",
                    title,
                    id,
                    due_date.format("%Y-%m-%d %H:%M UTC")
                )
            })
        }

        AssignmentCommands::List { course_id } => {
            let assignments = ctx.db.list_course_assignments(course_id)?;
            // Listing works anonymously; with an acting user each row carries their submission
            let actor = match ctx.actor() {
                Ok(user) => Some(user),
                Err(LmsError::NoActingUser) => None,
                Err(e) => return Err(e),
            };
            let mut rows = Vec::with_capacity(assignments.len());
            for assignment in assignments {
                let submission = match &actor {
                    Some(user) => ctx.db.find_submission(assignment.id, user.id)?,
                    None => None,
                };
                rows.push((assignment, submission));
            }

            let data: Vec<_> = rows
                .iter()
                .map(|(a, s)| json!({ "assignment": a, "submission": s }))
                .collect();
            ctx.emit(&data, || {
                if rows.is_empty() {
                    println!("No assignments found.");
                    return;
                }
                println!("{:<5} {:<35} {:>6} {:<26} STATUS", "ID", "TITLE", "POINTS", "DUE");
                println!("{}", "-".repeat(90));
                for (a, submission) in &rows {
                    let status = match submission {
                        Some(s) => match s.grade {
                            Some(grade) => format!("graded {grade:.2}"),
                            None if s.is_late => "submitted (late)".to_string(),
                            None => "submitted".to_string(),
                        },
                        None => "-".to_string(),
                    };
                    println!(
                        "{:<5} {:<35} {:>6} {:<26} {}",
                        a.id,
                        truncate(&a.title, 33),
                        a.max_points,
                        a.due_date,
                        status
                    );
                }
            })
        }

        AssignmentCommands::Submit {
            assignment_id,
            file,
            text,
        } => {
            let actor = ctx.actor()?;
            let submission = ctx
                .db
                .submit(actor.id, assignment_id, file.as_deref(), text.as_deref())?;
            ctx.emit(&submission, || {
                println!("Submission {} recorded.", submission.id);
                if submission.is_late {
                    println!("Note: submitted after the due date.");
                }
            })
        }

        AssignmentCommands::Submissions { assignment_id } => {
            let actor = ctx.actor()?;
            let submissions = ctx.db.list_submissions(actor.id, assignment_id)?;
            ctx.emit(&submissions, || print_submissions(&submissions))
        }

        AssignmentCommands::Grade {
            submission_id,
            score,
            feedback,
        } => {
            let actor = ctx.actor()?;
            let submission =
                ctx.db
                    .grade_submission(actor.id, submission_id, score, feedback.as_deref())?;
            ctx.emit(&submission, || {
                println!("Submission {} graded: {}", submission.id, score)
            })
        }
    }
}

fn print_submissions(submissions: &[Submission]) {
    if submissions.is_empty() {
        println!("No submissions yet.");
        return;
    }
    println!("{:<5} {:<8} {:<5} {:>7} SUBMITTED", "ID", "STUDENT", "LATE", "GRADE");
    println!("{}", "-".repeat(60));
    for s in submissions {
        println!(
            "{:<5} {:<8} {:<5} {:>7} {}",
            s.id,
            s.student_id,
            if s.is_late { "yes" } else { "no" },
            s.grade.map(|g| format!("{g:.1}")).unwrap_or_else(|| "-".to_string()),
            s.submitted_at
        );
    }
}

pub fn grades(ctx: &Ctx<'_>, cmd: GradeCommands) -> Result<()> {
    match cmd {
        GradeCommands::Record {
            enrollment_id,
            score,
            max_points,
        } => {
            let actor = ctx.actor()?;
            let grade = ctx.db.record_grade(actor.id, enrollment_id, score, max_points)?;
            ctx.emit(&grade, || {
                println!(
                    "Recorded {} grade {}/{} ({:.2}%) with ID: {}",
                    grade.source.as_str(),
                    grade.score,
                    grade.max_points,
                    grade.percentage(),
                    grade.id
                )
            })
        }

        GradeCommands::Book { course } => {
            let actor = ctx.actor()?;
            let rows = match course {
                Some(course_id) => ctx.db.instructor_gradebook(actor.id, course_id)?,
                None => ctx.db.student_gradebook(actor.id)?,
            };
            ctx.emit(&rows, || {
                if rows.is_empty() {
                    println!("No grades yet.");
                    return;
                }
                println!(
                    "{:<25} {:<22} {:>9} {:>7} {:<6} {:>6}",
                    "COURSE", "STUDENT", "PROGRESS", "GRADE", "LETTER", "ITEMS"
                );
                println!("{}", "-".repeat(80));
                for row in &rows {
                    println!(
                        "{:<25} {:<22} {:>8.2}% {:>7.2} {:<6} {:>6}",
                        truncate(&row.course_title, 23),
                        truncate(&row.student_name, 20),
                        row.progress,
                        row.final_grade,
                        row.letter_grade.as_str(),
                        row.grade_count
                    );
                }
            })
        }

        GradeCommands::List { enrollment_id } => {
            let actor = ctx.actor()?;
            let enrollment = ctx
                .db
                .get_enrollment(enrollment_id)?
                .ok_or_else(|| LmsError::not_found("Enrollment", enrollment_id))?;
            if enrollment.student_id != actor.id {
                ctx.db.require_course_staff(actor.id, enrollment.course_id)?;
            }
            let grades = ctx.db.list_grades(enrollment_id)?;
            let course_grade = ctx.db.get_course_grade(enrollment_id)?;
            ctx.emit(&json!({ "grades": grades, "course_grade": course_grade }), || {
                for g in &grades {
                    let item = g
                        .quiz_id
                        .map(|id| format!("quiz {id}"))
                        .or_else(|| g.assignment_id.map(|id| format!("assignment {id}")))
                        .unwrap_or_else(|| g.source.as_str().to_string());
                    println!(
                        "{:<5} {:<16} {:>7.2}/{:<7.2} {:>6.2}%",
                        g.id,
                        item,
                        g.score,
                        g.max_points,
                        g.percentage()
                    );
                }
                if let Some(cg) = &course_grade {
                    println!("Final grade: {:.2} ({})", cg.final_grade, cg.letter_grade.as_str());
                }
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AnswerOption, Question};

    fn question(id: i64, kind: QuestionType, options: &[(i64, &str)]) -> QuestionWithOptions {
        QuestionWithOptions {
            question: Question {
                id,
                quiz_id: 1,
                text: format!("Question {id}"),
                question_type: kind,
                points: 1,
                order: id as i32,
            },
            options: options
                .iter()
                .map(|(oid, text)| AnswerOption {
                    id: *oid,
                    question_id: id,
                    text: text.to_string(),
                    is_correct: false,
                    order: 0,
                })
                .collect(),
        }
    }

    fn sample() -> Vec<QuestionWithOptions> {
        vec![
            question(1, QuestionType::MultipleChoice, &[(10, "Box"), (11, "Rc"), (12, "Arc")]),
            question(2, QuestionType::TrueFalse, &[(20, "True"), (21, "False")]),
            question(3, QuestionType::ShortAnswer, &[(30, "borrowck")]),
        ]
    }

    fn answers(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|s| s.to_string()).collect()
    }

    mod parse_answers_tests {
        use super::*;

        #[test]
        fn ids_text_and_option_names() {
            let parsed =
                parse_answers(&sample(), &answers(&["1=10, 12", "2=false", "3= the borrow checker "]))
                    .unwrap();
            assert_eq!(parsed[&1], Response::Options(BTreeSet::from([10, 12])));
            assert_eq!(parsed[&2], Response::Options(BTreeSet::from([21])));
            assert_eq!(parsed[&3], Response::Text("the borrow checker".to_string()));
        }

        #[test]
        fn empty_value_is_blank() {
            let parsed = parse_answers(&sample(), &answers(&["3="])).unwrap();
            assert_eq!(parsed[&3], Response::Blank);
        }

        #[test]
        fn rejects_malformed_entries() {
            for bad in ["1", "x=10", "9=10", "1=Mutex"] {
                assert!(
                    matches!(
                        parse_answers(&sample(), &answers(&[bad])).unwrap_err(),
                        LmsError::Invalid(_)
                    ),
                    "{bad} should be rejected"
                );
            }
        }
    }

    mod questions_json_tests {
        use super::*;

        #[test]
        fn hides_correctness_from_students() {
            let student = questions_json(&sample(), false);
            assert!(student[0]["options"][0].get("is_correct").is_none());
            assert_eq!(student[2]["options"].as_array().unwrap().len(), 0);

            let staff = questions_json(&sample(), true);
            assert_eq!(staff[0]["options"][0]["is_correct"], json!(false));
            assert_eq!(staff[2]["options"].as_array().unwrap().len(), 1);
        }
    }
}
