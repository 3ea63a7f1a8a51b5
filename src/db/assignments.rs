use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use rusqlite::{params, Row};
use serde_json::json;
use tracing::{info, warn};

use super::grades::GradeRef;
use super::{is_unique_violation, Database};
use crate::error::{LmsError, Result};
use crate::models::{Assignment, EventKind, NotificationKind, Submission};

/// Accepts RFC 3339, `YYYY-MM-DD HH:MM` (UTC) or a bare date meaning the end
/// of that day in UTC.
pub fn parse_due_date(input: &str) -> Result<DateTime<Utc>> {
    let input = input.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(input) {
        return Ok(dt.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(input, "%Y-%m-%d %H:%M") {
        return Ok(naive.and_utc());
    }
    if let Some(end_of_day) = NaiveDate::parse_from_str(input, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(23, 59, 59))
    {
        return Ok(end_of_day.and_utc());
    }
    Err(LmsError::invalid(format!("unrecognised date '{input}'")))
}

fn assignment_from_row(row: &Row<'_>) -> rusqlite::Result<Assignment> {
    Ok(Assignment {
        id: row.get(0)?,
        lesson_id: row.get(1)?,
        title: row.get(2)?,
        description: row.get(3)?,
        due_date: row.get(4)?,
        max_points: row.get(5)?,
    })
}

fn submission_from_row(row: &Row<'_>) -> rusqlite::Result<Submission> {
    Ok(Submission {
        id: row.get(0)?,
        assignment_id: row.get(1)?,
        student_id: row.get(2)?,
        file_path: row.get(3)?,
        body: row.get(4)?,
        submitted_at: row.get(5)?,
        is_late: row.get(6)?,
        grade: row.get(7)?,
        feedback: row.get(8)?,
    })
}

const SUBMISSION_COLUMNS: &str =
    "id, assignment_id, student_id, file_path, body, submitted_at, is_late, grade, feedback";

impl Database {
    pub fn add_assignment(
        &self,
        actor_id: i64,
        lesson_id: i64,
        title: &str,
        description: &str,
        due_date: DateTime<Utc>,
        max_points: i32,
    ) -> Result<i64> {
        let course_id = self.lesson_course_id(lesson_id)?;
        self.require_course_staff(actor_id, course_id)?;

        if title.trim().is_empty() {
            return Err(LmsError::invalid("assignment title must not be empty"));
        }
        if max_points <= 0 {
            return Err(LmsError::invalid("max points must be positive"));
        }

        let inserted = self.conn.execute(
            r#"
            INSERT INTO assignments (lesson_id, title, description, due_date, max_points)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
            params![lesson_id, title.trim(), description, due_date.to_rfc3339(), max_points],
        );
        match inserted {
            Ok(_) => {
                let assignment_id = self.conn.last_insert_rowid();
                info!(assignment_id, lesson_id, due = %due_date, "Created assignment");
                Ok(assignment_id)
            }
            Err(e) if is_unique_violation(&e) => Err(LmsError::invalid(format!(
                "lesson {lesson_id} already has an assignment"
            ))),
            Err(e) => Err(e.into()),
        }
    }

    pub fn get_assignment(&self, id: i64) -> Result<Option<Assignment>> {
        let assignment = self.conn.query_row(
            "SELECT id, lesson_id, title, description, due_date, max_points FROM assignments WHERE id = ?1",
            params![id],
            assignment_from_row,
        );

        match assignment {
            Ok(a) => Ok(Some(a)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    pub fn require_assignment(&self, id: i64) -> Result<Assignment> {
        self.get_assignment(id)?
            .ok_or_else(|| LmsError::not_found("Assignment", id))
    }

    pub fn list_course_assignments(&self, course_id: i64) -> Result<Vec<Assignment>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT a.id, a.lesson_id, a.title, a.description, a.due_date, a.max_points
            FROM assignments a
            JOIN lessons l ON l.id = a.lesson_id
            JOIN modules m ON m.id = l.module_id
            WHERE m.course_id = ?1
            ORDER BY a.due_date, a.id
            "#,
        )?;
        let rows = stmt.query_map(params![course_id], assignment_from_row)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    pub(crate) fn list_all_assignments(&self) -> Result<Vec<Assignment>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, lesson_id, title, description, due_date, max_points FROM assignments ORDER BY due_date, id",
        )?;
        let rows = stmt.query_map([], assignment_from_row)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    pub fn submit(
        &self,
        student_id: i64,
        assignment_id: i64,
        file_path: Option<&str>,
        body: Option<&str>,
    ) -> Result<Submission> {
        self.submit_at(student_id, assignment_id, file_path, body, Utc::now())
    }

    /// Stores a submission made at `at`; late when `at` is after the due date.
    pub(crate) fn submit_at(
        &self,
        student_id: i64,
        assignment_id: i64,
        file_path: Option<&str>,
        body: Option<&str>,
        at: DateTime<Utc>,
    ) -> Result<Submission> {
        let assignment = self.require_assignment(assignment_id)?;
        let course_id = self.lesson_course_id(assignment.lesson_id)?;
        self.require_enrollment(student_id, course_id)?;

        let file_path = file_path.map(str::trim).filter(|p| !p.is_empty());
        let body = body.map(str::trim).filter(|b| !b.is_empty());
        if file_path.is_none() && body.is_none() {
            return Err(LmsError::invalid("a submission needs a file path or a text body"));
        }

        let due = parse_due_date(&assignment.due_date)?;
        let is_late = at > due;

        self.in_transaction(|db| {
            let inserted = db.conn.execute(
                r#"
                INSERT INTO submissions (assignment_id, student_id, file_path, body, submitted_at, is_late)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                "#,
                params![assignment_id, student_id, file_path, body, at.to_rfc3339(), is_late],
            );
            match inserted {
                Ok(_) => {}
                Err(e) if is_unique_violation(&e) => {
                    warn!(student_id, assignment_id, "Duplicate submission");
                    return Err(LmsError::AlreadySubmitted(assignment_id));
                }
                Err(e) => return Err(e.into()),
            }
            let submission_id = db.conn.last_insert_rowid();

            db.record_event(
                EventKind::AssignmentSubmission,
                Some(course_id),
                Some(student_id),
                1.0,
                json!({ "assignment_id": assignment_id, "is_late": is_late }),
            )?;
            info!(submission_id, assignment_id, student_id, is_late, "Submission received");

            db.get_submission(submission_id)?
                .ok_or_else(|| LmsError::not_found("Submission", submission_id))
        })
    }

    pub fn get_submission(&self, id: i64) -> Result<Option<Submission>> {
        let submission = self.conn.query_row(
            &format!("SELECT {SUBMISSION_COLUMNS} FROM submissions WHERE id = ?1"),
            params![id],
            submission_from_row,
        );

        match submission {
            Ok(s) => Ok(Some(s)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    pub fn find_submission(&self, assignment_id: i64, student_id: i64) -> Result<Option<Submission>> {
        let submission = self.conn.query_row(
            &format!(
                "SELECT {SUBMISSION_COLUMNS} FROM submissions WHERE assignment_id = ?1 AND student_id = ?2"
            ),
            params![assignment_id, student_id],
            submission_from_row,
        );

        match submission {
            Ok(s) => Ok(Some(s)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Every submission to the assignment; course staff only.
    pub fn list_submissions(&self, actor_id: i64, assignment_id: i64) -> Result<Vec<Submission>> {
        let assignment = self.require_assignment(assignment_id)?;
        let course_id = self.lesson_course_id(assignment.lesson_id)?;
        self.require_course_staff(actor_id, course_id)?;

        let mut stmt = self.conn.prepare(&format!(
            "SELECT {SUBMISSION_COLUMNS} FROM submissions WHERE assignment_id = ?1 ORDER BY submitted_at, id"
        ))?;
        let rows = stmt.query_map(params![assignment_id], submission_from_row)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    pub fn grade_submission(
        &self,
        grader_id: i64,
        submission_id: i64,
        score: f64,
        feedback: Option<&str>,
    ) -> Result<Submission> {
        let submission = self
            .get_submission(submission_id)?
            .ok_or_else(|| LmsError::not_found("Submission", submission_id))?;
        let assignment = self.require_assignment(submission.assignment_id)?;
        let course_id = self.lesson_course_id(assignment.lesson_id)?;
        self.require_course_staff(grader_id, course_id)?;

        let max_points = f64::from(assignment.max_points);
        if !(0.0..=max_points).contains(&score) {
            return Err(LmsError::invalid(format!(
                "score {score} is outside 0..={max_points}"
            )));
        }

        self.in_transaction(|db| {
            db.conn.execute(
                "UPDATE submissions SET grade = ?1, feedback = ?2 WHERE id = ?3",
                params![score, feedback, submission_id],
            )?;

            // The enrollment can be gone if the student left after submitting
            if let Some(enrollment) = db.find_enrollment(submission.student_id, course_id)? {
                db.upsert_grade(
                    enrollment.id,
                    GradeRef::Assignment(assignment.id),
                    score,
                    max_points,
                )?;
                let course_grade = db.recompute_course_grade(enrollment.id)?;
                db.notify(
                    submission.student_id,
                    NotificationKind::GradeUpdate,
                    "Assignment graded",
                    &format!(
                        "{} was graded {score}/{max_points}. Course grade: {:.2}% ({}).",
                        assignment.title,
                        course_grade.final_grade,
                        course_grade.letter_grade.as_str()
                    ),
                    Some(course_id),
                )?;
            }
            info!(submission_id, grader_id, score, "Graded submission");

            db.get_submission(submission_id)?
                .ok_or_else(|| LmsError::not_found("Submission", submission_id))
        })
    }
}
