use rusqlite::{params, Row};
use tracing::{debug, info};

use super::{display_name_sql, timestamp, Database};
use crate::error::{LmsError, Result};
use crate::grading::{self, LetterGrade};
use crate::models::{CourseGrade, Grade, GradeSource, GradebookRow, NotificationKind};

fn grade_from_row(row: &Row<'_>) -> rusqlite::Result<Grade> {
    let source: String = row.get(2)?;
    Ok(Grade {
        id: row.get(0)?,
        enrollment_id: row.get(1)?,
        source: GradeSource::from_str(&source).unwrap_or(GradeSource::Exam),
        quiz_id: row.get(3)?,
        assignment_id: row.get(4)?,
        score: row.get(5)?,
        max_points: row.get(6)?,
        recorded_at: row.get(7)?,
    })
}

/// What a grade row is attached to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum GradeRef {
    Quiz(i64),
    Assignment(i64),
}

impl Database {
    pub(crate) fn init_course_grade(&self, enrollment_id: i64) -> Result<()> {
        self.conn.execute(
            r#"
            INSERT OR IGNORE INTO course_grades (enrollment_id, final_grade, letter_grade, updated_at)
            VALUES (?1, 0, 'F', ?2)
            "#,
            params![enrollment_id, timestamp()],
        )?;
        Ok(())
    }

    /// Recomputes the enrollment's final grade from every grade row it has.
    pub fn recompute_course_grade(&self, enrollment_id: i64) -> Result<CourseGrade> {
        self.in_transaction(|db| {
            let pairs: Vec<(f64, f64)> = {
                let mut stmt = db
                    .conn
                    .prepare("SELECT score, max_points FROM grades WHERE enrollment_id = ?1")?;
                let rows = stmt.query_map(params![enrollment_id], |row| Ok((row.get(0)?, row.get(1)?)))?;
                rows.collect::<rusqlite::Result<Vec<_>>>()?
            };

            // Band on the exact value; 89.996 is a B even though it displays as 90.00
            let exact = grading::final_grade(pairs);
            let letter = LetterGrade::from_percentage(exact);
            let final_grade = grading::round2(exact);
            let now = timestamp();

            db.conn.execute(
                r#"
                INSERT INTO course_grades (enrollment_id, final_grade, letter_grade, updated_at)
                VALUES (?1, ?2, ?3, ?4)
                ON CONFLICT(enrollment_id) DO UPDATE SET
                    final_grade = excluded.final_grade,
                    letter_grade = excluded.letter_grade,
                    updated_at = excluded.updated_at
                "#,
                params![enrollment_id, final_grade, letter.as_str(), now],
            )?;
            debug!(enrollment_id, final_grade, letter = letter.as_str(), "Recomputed course grade");

            Ok(CourseGrade {
                enrollment_id,
                final_grade,
                letter_grade: letter,
                updated_at: now,
            })
        })
    }

    pub fn get_course_grade(&self, enrollment_id: i64) -> Result<Option<CourseGrade>> {
        let grade = self.conn.query_row(
            "SELECT enrollment_id, final_grade, letter_grade, updated_at FROM course_grades WHERE enrollment_id = ?1",
            params![enrollment_id],
            |row| {
                let letter: String = row.get(2)?;
                Ok(CourseGrade {
                    enrollment_id: row.get(0)?,
                    final_grade: row.get(1)?,
                    letter_grade: LetterGrade::from_str(&letter).unwrap_or(LetterGrade::F),
                    updated_at: row.get(3)?,
                })
            },
        );

        match grade {
            Ok(g) => Ok(Some(g)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Replaces the grade attached to a quiz or assignment, or adds it.
    pub(crate) fn upsert_grade(
        &self,
        enrollment_id: i64,
        target: GradeRef,
        score: f64,
        max_points: f64,
    ) -> Result<i64> {
        let (source, quiz_id, assignment_id) = match target {
            GradeRef::Quiz(id) => (GradeSource::Quiz, Some(id), None),
            GradeRef::Assignment(id) => (GradeSource::Assignment, None, Some(id)),
        };

        let existing = self.conn.query_row(
            r#"
            SELECT id FROM grades
            WHERE enrollment_id = ?1 AND source = ?2
              AND quiz_id IS ?3 AND assignment_id IS ?4
            "#,
            params![enrollment_id, source.as_str(), quiz_id, assignment_id],
            |row| row.get::<_, i64>(0),
        );

        match existing {
            Ok(id) => {
                self.conn.execute(
                    "UPDATE grades SET score = ?1, max_points = ?2, recorded_at = ?3 WHERE id = ?4",
                    params![score, max_points, timestamp(), id],
                )?;
                Ok(id)
            }
            Err(rusqlite::Error::QueryReturnedNoRows) => {
                self.conn.execute(
                    r#"
                    INSERT INTO grades (enrollment_id, source, quiz_id, assignment_id, score, max_points, recorded_at)
                    VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                    "#,
                    params![enrollment_id, source.as_str(), quiz_id, assignment_id, score, max_points, timestamp()],
                )?;
                Ok(self.conn.last_insert_rowid())
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Records a free-standing exam grade. Quiz and assignment grades are
    /// written by `submit_attempt` and `grade_submission`.
    pub fn record_grade(
        &self,
        grader_id: i64,
        enrollment_id: i64,
        score: f64,
        max_points: f64,
    ) -> Result<Grade> {
        let enrollment = self
            .get_enrollment(enrollment_id)?
            .ok_or_else(|| LmsError::not_found("Enrollment", enrollment_id))?;
        self.require_course_staff(grader_id, enrollment.course_id)?;

        if max_points.is_nan() || max_points <= 0.0 {
            return Err(LmsError::invalid("max points must be positive"));
        }
        if !(0.0..=max_points).contains(&score) {
            return Err(LmsError::invalid(format!(
                "score {score} is outside 0..={max_points}"
            )));
        }

        let source = GradeSource::Exam;
        self.in_transaction(|db| {
            db.conn.execute(
                r#"
                INSERT INTO grades (enrollment_id, source, score, max_points, recorded_at)
                VALUES (?1, ?2, ?3, ?4, ?5)
                "#,
                params![enrollment_id, source.as_str(), score, max_points, timestamp()],
            )?;
            let grade_id = db.conn.last_insert_rowid();
            let course_grade = db.recompute_course_grade(enrollment_id)?;

            db.notify(
                enrollment.student_id,
                NotificationKind::GradeUpdate,
                "New grade recorded",
                &format!(
                    "You received {score}/{max_points} ({}). Course grade: {:.2}% ({}).",
                    source.as_str(),
                    course_grade.final_grade,
                    course_grade.letter_grade.as_str()
                ),
                Some(enrollment.course_id),
            )?;
            info!(grade_id, enrollment_id, source = source.as_str(), "Recorded grade");

            db.get_grade(grade_id)?
                .ok_or_else(|| LmsError::not_found("Grade", grade_id))
        })
    }

    pub fn get_grade(&self, id: i64) -> Result<Option<Grade>> {
        let grade = self.conn.query_row(
            r#"
            SELECT id, enrollment_id, source, quiz_id, assignment_id, score, max_points, recorded_at
            FROM grades WHERE id = ?1
            "#,
            params![id],
            grade_from_row,
        );

        match grade {
            Ok(g) => Ok(Some(g)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    pub fn list_grades(&self, enrollment_id: i64) -> Result<Vec<Grade>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT id, enrollment_id, source, quiz_id, assignment_id, score, max_points, recorded_at
            FROM grades
            WHERE enrollment_id = ?1
            ORDER BY recorded_at, id
            "#,
        )?;
        let rows = stmt.query_map(params![enrollment_id], grade_from_row)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    fn gradebook_rows(&self, filter: &str, id: i64) -> Result<Vec<GradebookRow>> {
        let sql = format!(
            r#"
            SELECT e.id, c.id, c.title, u.id, {},
                   COALESCE(cg.final_grade, 0), COALESCE(cg.letter_grade, 'F'),
                   (SELECT COUNT(*) FROM grades g WHERE g.enrollment_id = e.id)
            FROM enrollments e
            JOIN courses c ON c.id = e.course_id
            JOIN users u ON u.id = e.student_id
            LEFT JOIN course_grades cg ON cg.enrollment_id = e.id
            WHERE {filter} = ?1
            ORDER BY c.title, u.username
            "#,
            display_name_sql("u")
        );

        let mut rows = {
            let mut stmt = self.conn.prepare(&sql)?;
            let rows = stmt.query_map(params![id], |row| {
                let letter: String = row.get(6)?;
                Ok(GradebookRow {
                    enrollment_id: row.get(0)?,
                    course_id: row.get(1)?,
                    course_title: row.get(2)?,
                    student_id: row.get(3)?,
                    student_name: row.get(4)?,
                    progress: 0.0,
                    final_grade: row.get(5)?,
                    letter_grade: LetterGrade::from_str(&letter).unwrap_or(LetterGrade::F),
                    grade_count: row.get(7)?,
                })
            })?;
            rows.collect::<rusqlite::Result<Vec<_>>>()?
        };

        for row in &mut rows {
            row.progress = self.progress(row.enrollment_id)?.percentage;
        }
        Ok(rows)
    }

    /// One row per course the student is enrolled in.
    pub fn student_gradebook(&self, student_id: i64) -> Result<Vec<GradebookRow>> {
        self.gradebook_rows("e.student_id", student_id)
    }

    /// One row per student enrolled in the course; staff only.
    pub fn instructor_gradebook(&self, actor_id: i64, course_id: i64) -> Result<Vec<GradebookRow>> {
        self.require_course_staff(actor_id, course_id)?;
        self.gradebook_rows("e.course_id", course_id)
    }
}

#[cfg(test)]
mod tests {
    use crate::db::testing::{setup_db, Fixture};
    use crate::error::LmsError;
    use crate::grading::LetterGrade;

    mod recompute_tests {
        use super::*;

        #[test]
        fn no_grades_is_zero_f() {
            let db = setup_db();
            let (_, enrollment_id) = Fixture::enrolled(&db);
            let cg = db.recompute_course_grade(enrollment_id).unwrap();
            assert_eq!(cg.final_grade, 0.0);
            assert_eq!(cg.letter_grade, LetterGrade::F);
        }

        #[test]
        fn aggregates_all_grade_rows() {
            let db = setup_db();
            let (fx, enrollment_id) = Fixture::enrolled(&db);
            db.record_grade(fx.instructor_id, enrollment_id, 45.0, 50.0)
                .unwrap();
            db.record_grade(fx.instructor_id, enrollment_id, 40.0, 50.0)
                .unwrap();

            let cg = db.get_course_grade(enrollment_id).unwrap().unwrap();
            assert_eq!(cg.final_grade, 85.0);
            assert_eq!(cg.letter_grade, LetterGrade::B);
        }

        #[test]
        fn recompute_reflects_changed_rows() {
            let db = setup_db();
            let (_, enrollment_id) = Fixture::enrolled(&db);
            db.conn
                .execute(
                    "INSERT INTO grades (enrollment_id, source, score, max_points) VALUES (?1, 'exam', 9, 10)",
                    [enrollment_id],
                )
                .unwrap();
            assert_eq!(db.recompute_course_grade(enrollment_id).unwrap().final_grade, 90.0);

            db.conn
                .execute("UPDATE grades SET score = 5 WHERE enrollment_id = ?1", [enrollment_id])
                .unwrap();
            let cg = db.recompute_course_grade(enrollment_id).unwrap();
            assert_eq!(cg.final_grade, 50.0);
            assert_eq!(cg.letter_grade, LetterGrade::F);
        }

        #[test]
        fn letter_bands_the_unrounded_grade() {
            let db = setup_db();
            let (fx, enrollment_id) = Fixture::enrolled(&db);
            db.record_grade(fx.instructor_id, enrollment_id, 89.996, 100.0)
                .unwrap();

            let cg = db.get_course_grade(enrollment_id).unwrap().unwrap();
            assert_eq!(cg.final_grade, 90.0);
            assert_eq!(cg.letter_grade, LetterGrade::B);
        }

        #[test]
        fn exact_boundary_keeps_upper_band() {
            let db = setup_db();
            let (fx, enrollment_id) = Fixture::enrolled(&db);
            db.record_grade(fx.instructor_id, enrollment_id, 80.0, 100.0)
                .unwrap();

            let cg = db.get_course_grade(enrollment_id).unwrap().unwrap();
            assert_eq!(cg.letter_grade, LetterGrade::B);
        }
    }

    mod record_tests {
        use super::*;

        #[test]
        fn score_bounds_enforced() {
            let db = setup_db();
            let (fx, enrollment_id) = Fixture::enrolled(&db);
            for (score, max) in [(-1.0, 10.0), (11.0, 10.0), (1.0, 0.0)] {
                let err = db
                    .record_grade(fx.instructor_id, enrollment_id, score, max)
                    .unwrap_err();
                assert!(matches!(err, LmsError::Invalid(_)));
            }
            assert!(db.list_grades(enrollment_id).unwrap().is_empty());
        }

        #[test]
        fn students_cannot_record_grades() {
            let db = setup_db();
            let (fx, enrollment_id) = Fixture::enrolled(&db);
            assert!(matches!(
                db.record_grade(fx.student_id, enrollment_id, 10.0, 10.0)
                    .unwrap_err(),
                LmsError::PermissionDenied(_)
            ));
        }

        #[test]
        fn record_notifies_student() {
            let db = setup_db();
            let (fx, enrollment_id) = Fixture::enrolled(&db);
            let grade = db
                .record_grade(fx.instructor_id, enrollment_id, 18.0, 20.0)
                .unwrap();
            assert_eq!(grade.percentage(), 90.0);

            let notes = db.list_notifications(fx.student_id, true).unwrap();
            assert!(notes.iter().any(|n| n.title == "New grade recorded"));
        }

        #[test]
        fn recorded_grades_are_exams() {
            let db = setup_db();
            let (fx, enrollment_id) = Fixture::enrolled(&db);
            let grade = db
                .record_grade(fx.instructor_id, enrollment_id, 5.0, 10.0)
                .unwrap();
            assert_eq!(grade.source, crate::models::GradeSource::Exam);
            assert!(grade.quiz_id.is_none());
            assert!(grade.assignment_id.is_none());
        }
    }

    mod gradebook_tests {
        use super::*;

        #[test]
        fn student_gradebook_has_progress_and_grade() {
            let db = setup_db();
            let (fx, enrollment_id) = Fixture::enrolled(&db);
            db.complete_lesson(fx.student_id, fx.lesson_ids[0]).unwrap();
            db.record_grade(fx.instructor_id, enrollment_id, 7.0, 10.0)
                .unwrap();

            let rows = db.student_gradebook(fx.student_id).unwrap();
            assert_eq!(rows.len(), 1);
            assert_eq!(rows[0].course_title, "Rust 101");
            assert_eq!(rows[0].progress, 33.33);
            assert_eq!(rows[0].final_grade, 70.0);
            assert_eq!(rows[0].letter_grade, LetterGrade::C);
            assert_eq!(rows[0].grade_count, 1);
        }

        #[test]
        fn instructor_gradebook_lists_roster() {
            let db = setup_db();
            let (fx, _) = Fixture::enrolled(&db);
            db.enroll(fx.other_student_id, fx.course_id).unwrap();

            let rows = db.instructor_gradebook(fx.instructor_id, fx.course_id).unwrap();
            let names: Vec<&str> = rows.iter().map(|r| r.student_name.as_str()).collect();
            assert_eq!(names, vec!["Alice Liddell", "Bob Stone"]);

            assert!(db.instructor_gradebook(fx.student_id, fx.course_id).is_err());
        }
    }
}
