use super::Database;
use crate::models::{NewLesson, Role};

pub(crate) fn setup_db() -> Database {
    let db = Database::open(":memory:").expect("Failed to create in-memory database");
    db.init().expect("Failed to initialize database");
    db
}

/// An instructor-owned course with two modules and three lessons, plus two
/// students who are not yet enrolled.
pub(crate) struct Fixture {
    pub instructor_id: i64,
    pub student_id: i64,
    pub other_student_id: i64,
    pub course_id: i64,
    pub module_ids: Vec<i64>,
    pub lesson_ids: Vec<i64>,
}

impl Fixture {
    pub fn new(db: &Database) -> Self {
        let instructor_id = db
            .add_user("prof", Some("prof@example.edu"), "Grace", "Hopper", Role::Instructor)
            .unwrap();
        let student_id = db
            .add_user("alice", Some("alice@example.edu"), "Alice", "Liddell", Role::Student)
            .unwrap();
        let other_student_id = db
            .add_user("bob", None, "Bob", "Stone", Role::Student)
            .unwrap();

        let course_id = db
            .add_course(instructor_id, "Rust 101", "Ownership and borrowing", None)
            .unwrap();

        let m1 = db
            .add_module(instructor_id, course_id, "Basics", None, 1)
            .unwrap();
        let m2 = db
            .add_module(instructor_id, course_id, "Traits", None, 2)
            .unwrap();

        let l1 = db
            .add_lesson(instructor_id, m1, &NewLesson::text("Hello", 1))
            .unwrap();
        let l2 = db
            .add_lesson(instructor_id, m1, &NewLesson::text("Variables", 2))
            .unwrap();
        let l3 = db
            .add_lesson(instructor_id, m2, &NewLesson::text("Generics", 1))
            .unwrap();

        Self {
            instructor_id,
            student_id,
            other_student_id,
            course_id,
            module_ids: vec![m1, m2],
            lesson_ids: vec![l1, l2, l3],
        }
    }

    /// Fixture with `student_id` already enrolled; returns the enrollment id.
    pub fn enrolled(db: &Database) -> (Self, i64) {
        let fx = Self::new(db);
        let enrollment_id = db.enroll(fx.student_id, fx.course_id).unwrap();
        (fx, enrollment_id)
    }
}
