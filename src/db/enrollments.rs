use rusqlite::{params, Row};
use serde_json::json;
use tracing::{debug, info, warn};

use super::{is_unique_violation, timestamp, Database};
use crate::error::{LmsError, Result};
use crate::models::{Enrollment, EventKind, NotificationKind, ProgressReport, Role};

fn enrollment_from_row(row: &Row<'_>) -> rusqlite::Result<Enrollment> {
    Ok(Enrollment {
        id: row.get(0)?,
        student_id: row.get(1)?,
        course_id: row.get(2)?,
        enrolled_at: row.get(3)?,
    })
}

impl Database {
    pub fn enroll(&self, student_id: i64, course_id: i64) -> Result<i64> {
        self.require_role(student_id, &[Role::Student])?;
        let course = self.require_course(course_id)?;
        if !course.is_active {
            return Err(LmsError::invalid(format!(
                "course {course_id} is not open for enrollment"
            )));
        }

        self.in_transaction(|db| {
            let inserted = db.conn.execute(
                "INSERT INTO enrollments (student_id, course_id, enrolled_at) VALUES (?1, ?2, ?3)",
                params![student_id, course_id, timestamp()],
            );
            match inserted {
                Ok(_) => {}
                Err(e) if is_unique_violation(&e) => {
                    warn!(student_id, course_id, "Duplicate enrollment");
                    return Err(LmsError::AlreadyEnrolled(course_id));
                }
                Err(e) => return Err(e.into()),
            }
            let enrollment_id = db.conn.last_insert_rowid();

            db.init_course_grade(enrollment_id)?;
            db.notify(
                student_id,
                NotificationKind::Enrollment,
                "Enrollment confirmed",
                &format!("You are now enrolled in {}.", course.title),
                Some(course_id),
            )?;
            db.record_event(
                EventKind::CourseEnrollment,
                Some(course_id),
                Some(student_id),
                1.0,
                json!({ "enrollment_id": enrollment_id }),
            )?;

            info!(enrollment_id, student_id, course_id, "Enrolled");
            Ok(enrollment_id)
        })
    }

    /// Drops the enrollment and everything hanging off it.
    pub fn unenroll(&self, student_id: i64, course_id: i64) -> Result<()> {
        let enrollment = self.require_enrollment(student_id, course_id)?;
        self.conn
            .execute("DELETE FROM enrollments WHERE id = ?1", params![enrollment.id])?;
        info!(enrollment_id = enrollment.id, student_id, course_id, "Unenrolled");
        Ok(())
    }

    pub fn get_enrollment(&self, id: i64) -> Result<Option<Enrollment>> {
        let enrollment = self.conn.query_row(
            "SELECT id, student_id, course_id, enrolled_at FROM enrollments WHERE id = ?1",
            params![id],
            enrollment_from_row,
        );

        match enrollment {
            Ok(e) => Ok(Some(e)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    pub fn find_enrollment(&self, student_id: i64, course_id: i64) -> Result<Option<Enrollment>> {
        let enrollment = self.conn.query_row(
            r#"
            SELECT id, student_id, course_id, enrolled_at
            FROM enrollments
            WHERE student_id = ?1 AND course_id = ?2
            "#,
            params![student_id, course_id],
            enrollment_from_row,
        );

        match enrollment {
            Ok(e) => Ok(Some(e)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    pub fn require_enrollment(&self, student_id: i64, course_id: i64) -> Result<Enrollment> {
        self.find_enrollment(student_id, course_id)?
            .ok_or(LmsError::NotEnrolled(course_id))
    }

    pub fn list_student_enrollments(&self, student_id: i64) -> Result<Vec<Enrollment>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT id, student_id, course_id, enrolled_at
            FROM enrollments
            WHERE student_id = ?1
            ORDER BY enrolled_at DESC, id DESC
            "#,
        )?;
        let rows = stmt.query_map(params![student_id], enrollment_from_row)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    pub fn list_course_enrollments(&self, course_id: i64) -> Result<Vec<Enrollment>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT id, student_id, course_id, enrolled_at
            FROM enrollments
            WHERE course_id = ?1
            ORDER BY enrolled_at, id
            "#,
        )?;
        let rows = stmt.query_map(params![course_id], enrollment_from_row)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    pub fn progress(&self, enrollment_id: i64) -> Result<ProgressReport> {
        let enrollment = self
            .get_enrollment(enrollment_id)?
            .ok_or_else(|| LmsError::not_found("Enrollment", enrollment_id))?;

        // Only lessons still in the course count towards completion
        let completed: i64 = self.conn.query_row(
            r#"
            SELECT COUNT(*) FROM completed_lessons cl
            JOIN lessons l ON l.id = cl.lesson_id
            JOIN modules m ON m.id = l.module_id
            WHERE cl.enrollment_id = ?1 AND m.course_id = ?2
            "#,
            params![enrollment_id, enrollment.course_id],
            |row| row.get(0),
        )?;
        let total = self.count_course_lessons(enrollment.course_id)?;

        Ok(ProgressReport::new(enrollment_id, completed as usize, total))
    }

    pub fn completed_lesson_ids(&self, enrollment_id: i64) -> Result<Vec<i64>> {
        let mut stmt = self.conn.prepare(
            "SELECT lesson_id FROM completed_lessons WHERE enrollment_id = ?1 ORDER BY lesson_id",
        )?;
        let rows = stmt.query_map(params![enrollment_id], |row| row.get(0))?;
        Ok(rows.collect::<rusqlite::Result<Vec<i64>>>()?)
    }

    /// Marks the lesson done. Completing it again changes nothing.
    pub fn complete_lesson(&self, student_id: i64, lesson_id: i64) -> Result<ProgressReport> {
        let course_id = self.lesson_course_id(lesson_id)?;
        let enrollment = self.require_enrollment(student_id, course_id)?;

        self.in_transaction(|db| {
            let changed = db.conn.execute(
                "INSERT OR IGNORE INTO completed_lessons (enrollment_id, lesson_id, completed_at) VALUES (?1, ?2, ?3)",
                params![enrollment.id, lesson_id, timestamp()],
            )?;
            let progress = db.progress(enrollment.id)?;

            if changed == 0 {
                debug!(enrollment_id = enrollment.id, lesson_id, "Lesson already complete");
                return Ok(progress);
            }

            db.record_event(
                EventKind::LessonCompletion,
                Some(course_id),
                Some(student_id),
                1.0,
                json!({ "lesson_id": lesson_id }),
            )?;

            if progress.is_complete()
                && !db.completion_logged(enrollment.id)?
            {
                db.record_event(
                    EventKind::CourseCompletion,
                    Some(course_id),
                    Some(student_id),
                    1.0,
                    json!({ "enrollment_id": enrollment.id }),
                )?;
                info!(enrollment_id = enrollment.id, course_id, "Course completed");
            }

            Ok(progress)
        })
    }

    pub fn uncomplete_lesson(&self, student_id: i64, lesson_id: i64) -> Result<ProgressReport> {
        let course_id = self.lesson_course_id(lesson_id)?;
        let enrollment = self.require_enrollment(student_id, course_id)?;

        self.conn.execute(
            "DELETE FROM completed_lessons WHERE enrollment_id = ?1 AND lesson_id = ?2",
            params![enrollment.id, lesson_id],
        )?;
        self.progress(enrollment.id)
    }
}

#[cfg(test)]
mod tests {
    use crate::db::testing::{setup_db, Fixture};
    use crate::error::LmsError;
    use crate::models::{EventKind, NewLesson};

    mod enroll_tests {
        use super::*;

        #[test]
        fn enroll_creates_enrollment_and_course_grade() {
            let db = setup_db();
            let (fx, enrollment_id) = Fixture::enrolled(&db);

            let enrollment = db.get_enrollment(enrollment_id).unwrap().unwrap();
            assert_eq!(enrollment.student_id, fx.student_id);
            assert_eq!(enrollment.course_id, fx.course_id);

            let grade = db.get_course_grade(enrollment_id).unwrap().unwrap();
            assert_eq!(grade.final_grade, 0.0);
        }

        #[test]
        fn duplicate_enrollment_fails() {
            let db = setup_db();
            let (fx, _) = Fixture::enrolled(&db);
            let err = db.enroll(fx.student_id, fx.course_id).unwrap_err();
            assert!(matches!(err, LmsError::AlreadyEnrolled(id) if id == fx.course_id));
            assert_eq!(db.list_course_enrollments(fx.course_id).unwrap().len(), 1);
        }

        #[test]
        fn only_students_enroll() {
            let db = setup_db();
            let fx = Fixture::new(&db);
            assert!(matches!(
                db.enroll(fx.instructor_id, fx.course_id).unwrap_err(),
                LmsError::PermissionDenied(_)
            ));
        }

        #[test]
        fn inactive_course_rejects_enrollment() {
            let db = setup_db();
            let fx = Fixture::new(&db);
            db.set_course_active(fx.instructor_id, fx.course_id, false).unwrap();
            assert!(matches!(
                db.enroll(fx.student_id, fx.course_id).unwrap_err(),
                LmsError::Invalid(_)
            ));
        }

        #[test]
        fn enroll_notifies_and_logs() {
            let db = setup_db();
            let (fx, _) = Fixture::enrolled(&db);

            let notes = db.list_notifications(fx.student_id, false).unwrap();
            assert_eq!(notes.len(), 1);
            assert!(notes[0].message.contains("Rust 101"));
            assert_eq!(
                db.count_events(EventKind::CourseEnrollment, Some(fx.course_id))
                    .unwrap(),
                1
            );
        }

        #[test]
        fn unenroll_cascades() {
            let db = setup_db();
            let (fx, enrollment_id) = Fixture::enrolled(&db);
            db.complete_lesson(fx.student_id, fx.lesson_ids[0]).unwrap();

            db.unenroll(fx.student_id, fx.course_id).unwrap();
            assert!(db.get_enrollment(enrollment_id).unwrap().is_none());
            assert!(db.get_course_grade(enrollment_id).unwrap().is_none());
            assert!(db.completed_lesson_ids(enrollment_id).unwrap().is_empty());

            assert!(matches!(
                db.unenroll(fx.student_id, fx.course_id).unwrap_err(),
                LmsError::NotEnrolled(_)
            ));
        }

        #[test]
        fn list_enrollments_by_student_and_course() {
            let db = setup_db();
            let (fx, _) = Fixture::enrolled(&db);
            db.enroll(fx.other_student_id, fx.course_id).unwrap();

            assert_eq!(db.list_student_enrollments(fx.student_id).unwrap().len(), 1);
            assert_eq!(db.list_course_enrollments(fx.course_id).unwrap().len(), 2);
        }
    }

    mod progress_tests {
        use super::*;

        #[test]
        fn starts_at_zero() {
            let db = setup_db();
            let (_, enrollment_id) = Fixture::enrolled(&db);
            let p = db.progress(enrollment_id).unwrap();
            assert_eq!(p.completed, 0);
            assert_eq!(p.total, 3);
            assert_eq!(p.percentage, 0.0);
        }

        #[test]
        fn course_without_lessons_is_zero() {
            let db = setup_db();
            let fx = Fixture::new(&db);
            let empty = db.add_course(fx.instructor_id, "Empty", "", None).unwrap();
            let enrollment_id = db.enroll(fx.student_id, empty).unwrap();

            let p = db.progress(enrollment_id).unwrap();
            assert_eq!(p.total, 0);
            assert_eq!(p.percentage, 0.0);
            assert!(!p.is_complete());
        }

        #[test]
        fn completion_is_idempotent() {
            let db = setup_db();
            let (fx, _) = Fixture::enrolled(&db);

            let first = db.complete_lesson(fx.student_id, fx.lesson_ids[0]).unwrap();
            let second = db.complete_lesson(fx.student_id, fx.lesson_ids[0]).unwrap();
            assert_eq!(first.completed, 1);
            assert_eq!(second.completed, 1);
            assert_eq!(second.percentage, 33.33);
        }

        #[test]
        fn uncomplete_lowers_progress() {
            let db = setup_db();
            let (fx, _) = Fixture::enrolled(&db);
            db.complete_lesson(fx.student_id, fx.lesson_ids[0]).unwrap();
            db.complete_lesson(fx.student_id, fx.lesson_ids[1]).unwrap();

            let p = db.uncomplete_lesson(fx.student_id, fx.lesson_ids[0]).unwrap();
            assert_eq!(p.completed, 1);
            assert_eq!(p.percentage, 33.33);
        }

        #[test]
        fn must_be_enrolled_to_complete() {
            let db = setup_db();
            let fx = Fixture::new(&db);
            assert!(matches!(
                db.complete_lesson(fx.student_id, fx.lesson_ids[0]).unwrap_err(),
                LmsError::NotEnrolled(_)
            ));
        }

        #[test]
        fn unknown_lesson() {
            let db = setup_db();
            let (fx, _) = Fixture::enrolled(&db);
            assert!(matches!(
                db.complete_lesson(fx.student_id, 999).unwrap_err(),
                LmsError::NotFound("Lesson", _)
            ));
        }

        #[test]
        fn new_lesson_dilutes_progress() {
            let db = setup_db();
            let (fx, enrollment_id) = Fixture::enrolled(&db);
            for lesson in &fx.lesson_ids {
                db.complete_lesson(fx.student_id, *lesson).unwrap();
            }
            assert_eq!(db.progress(enrollment_id).unwrap().percentage, 100.0);

            db.add_lesson(fx.instructor_id, fx.module_ids[1], &NewLesson::text("Lifetimes", 2))
                .unwrap();
            assert_eq!(db.progress(enrollment_id).unwrap().percentage, 75.0);
        }

        #[test]
        fn course_completion_logged_once() {
            let db = setup_db();
            let (fx, _) = Fixture::enrolled(&db);
            for lesson in &fx.lesson_ids {
                db.complete_lesson(fx.student_id, *lesson).unwrap();
            }
            db.uncomplete_lesson(fx.student_id, fx.lesson_ids[2]).unwrap();
            let p = db.complete_lesson(fx.student_id, fx.lesson_ids[2]).unwrap();
            assert!(p.is_complete());

            let completions = db
                .count_events(EventKind::CourseCompletion, Some(fx.course_id))
                .unwrap();
            assert_eq!(completions, 1);
            let lessons = db
                .count_events(EventKind::LessonCompletion, Some(fx.course_id))
                .unwrap();
            assert_eq!(lessons, 4);
        }

        #[test]
        fn re_enrollment_logs_a_fresh_completion() {
            let db = setup_db();
            let (fx, first) = Fixture::enrolled(&db);
            for lesson in &fx.lesson_ids {
                db.complete_lesson(fx.student_id, *lesson).unwrap();
            }
            assert_eq!(db.course_analytics(fx.course_id).unwrap().completions, 1);

            db.unenroll(fx.student_id, fx.course_id).unwrap();
            assert_eq!(db.course_analytics(fx.course_id).unwrap().completions, 0);

            let second = db.enroll(fx.student_id, fx.course_id).unwrap();
            assert_ne!(first, second);
            for lesson in &fx.lesson_ids {
                db.complete_lesson(fx.student_id, *lesson).unwrap();
            }

            assert_eq!(
                db.count_events(EventKind::CourseCompletion, Some(fx.course_id))
                    .unwrap(),
                2
            );
            assert_eq!(db.course_analytics(fx.course_id).unwrap().completions, 1);
        }
    }
}
