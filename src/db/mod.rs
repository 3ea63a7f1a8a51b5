mod accessibility;
mod analytics;
mod assignments;
mod catalog;
mod certificates;
mod enrollments;
mod forums;
mod grades;
mod notifications;
mod quizzes;
mod users;

#[cfg(test)]
pub(crate) mod testing;

use chrono::Utc;
use rusqlite::Connection;
use std::path::Path;
use tracing::{info, warn};

use crate::config::DEFAULT_CERTIFICATE_THRESHOLD;
use crate::error::Result;

pub use analytics::{CourseAnalytics, StudentAnalytics, StudentCourseAnalytics};
pub use assignments::parse_due_date;

const SCHEMA_VERSION: i32 = 1;

pub struct Database {
    conn: Connection,
    certificate_threshold: f64,
}

impl Database {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        Ok(Self {
            conn,
            certificate_threshold: DEFAULT_CERTIFICATE_THRESHOLD,
        })
    }

    /// Sets the claim threshold, clamped to 0..=100. NaN or infinite values
    /// keep the default.
    pub fn with_certificate_threshold(mut self, threshold: f64) -> Self {
        self.certificate_threshold = if threshold.is_finite() {
            threshold.clamp(0.0, 100.0)
        } else {
            warn!(threshold, "Ignoring non-finite certificate threshold");
            DEFAULT_CERTIFICATE_THRESHOLD
        };
        self
    }

    pub fn certificate_threshold(&self) -> f64 {
        self.certificate_threshold
    }

    pub fn init(&self) -> Result<()> {
        self.conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS users (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                username TEXT NOT NULL UNIQUE,
                email TEXT,
                first_name TEXT NOT NULL DEFAULT '',
                last_name TEXT NOT NULL DEFAULT '',
                role TEXT NOT NULL DEFAULT 'student' CHECK(role IN ('student', 'instructor', 'admin')),
                created_at TEXT NOT NULL DEFAULT (datetime('now'))
            );

            CREATE TABLE IF NOT EXISTS categories (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL UNIQUE,
                description TEXT
            );

            CREATE TABLE IF NOT EXISTS courses (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                title TEXT NOT NULL,
                description TEXT NOT NULL DEFAULT '',
                instructor_id INTEGER NOT NULL,
                category_id INTEGER,
                is_active INTEGER NOT NULL DEFAULT 1,
                created_at TEXT NOT NULL DEFAULT (datetime('now')),
                updated_at TEXT NOT NULL DEFAULT (datetime('now')),
                FOREIGN KEY (instructor_id) REFERENCES users(id) ON DELETE CASCADE,
                FOREIGN KEY (category_id) REFERENCES categories(id) ON DELETE SET NULL
            );

            CREATE TABLE IF NOT EXISTS modules (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                course_id INTEGER NOT NULL,
                title TEXT NOT NULL,
                description TEXT,
                sort_order INTEGER NOT NULL DEFAULT 0,
                created_at TEXT NOT NULL DEFAULT (datetime('now')),
                FOREIGN KEY (course_id) REFERENCES courses(id) ON DELETE CASCADE
            );

            CREATE TABLE IF NOT EXISTS lessons (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                module_id INTEGER NOT NULL,
                title TEXT NOT NULL,
                content_type TEXT NOT NULL DEFAULT 'text' CHECK(content_type IN ('text', 'video', 'pdf', 'quiz', 'assignment')),
                content TEXT,
                video_url TEXT,
                file_path TEXT,
                duration_minutes INTEGER,
                sort_order INTEGER NOT NULL DEFAULT 0,
                created_at TEXT NOT NULL DEFAULT (datetime('now')),
                FOREIGN KEY (module_id) REFERENCES modules(id) ON DELETE CASCADE
            );

            CREATE TABLE IF NOT EXISTS enrollments (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                student_id INTEGER NOT NULL,
                course_id INTEGER NOT NULL,
                enrolled_at TEXT NOT NULL DEFAULT (datetime('now')),
                UNIQUE (student_id, course_id),
                FOREIGN KEY (student_id) REFERENCES users(id) ON DELETE CASCADE,
                FOREIGN KEY (course_id) REFERENCES courses(id) ON DELETE CASCADE
            );

            CREATE TABLE IF NOT EXISTS completed_lessons (
                enrollment_id INTEGER NOT NULL,
                lesson_id INTEGER NOT NULL,
                completed_at TEXT NOT NULL DEFAULT (datetime('now')),
                PRIMARY KEY (enrollment_id, lesson_id),
                FOREIGN KEY (enrollment_id) REFERENCES enrollments(id) ON DELETE CASCADE,
                FOREIGN KEY (lesson_id) REFERENCES lessons(id) ON DELETE CASCADE
            );

            CREATE TABLE IF NOT EXISTS quizzes (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                lesson_id INTEGER NOT NULL UNIQUE,
                title TEXT NOT NULL,
                description TEXT,
                time_limit INTEGER,
                max_attempts INTEGER NOT NULL DEFAULT 1 CHECK(max_attempts >= 1),
                passing_score REAL NOT NULL DEFAULT 70.0,
                FOREIGN KEY (lesson_id) REFERENCES lessons(id) ON DELETE CASCADE
            );

            CREATE TABLE IF NOT EXISTS questions (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                quiz_id INTEGER NOT NULL,
                text TEXT NOT NULL,
                question_type TEXT NOT NULL DEFAULT 'multiple_choice' CHECK(question_type IN ('multiple_choice', 'true_false', 'short_answer')),
                points INTEGER NOT NULL DEFAULT 1,
                sort_order INTEGER NOT NULL DEFAULT 0,
                FOREIGN KEY (quiz_id) REFERENCES quizzes(id) ON DELETE CASCADE
            );

            CREATE TABLE IF NOT EXISTS answer_options (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                question_id INTEGER NOT NULL,
                text TEXT NOT NULL,
                is_correct INTEGER NOT NULL DEFAULT 0,
                sort_order INTEGER NOT NULL DEFAULT 0,
                FOREIGN KEY (question_id) REFERENCES questions(id) ON DELETE CASCADE
            );

            CREATE TABLE IF NOT EXISTS quiz_attempts (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                quiz_id INTEGER NOT NULL,
                student_id INTEGER NOT NULL,
                attempt_number INTEGER NOT NULL,
                score REAL NOT NULL,
                points_earned INTEGER NOT NULL,
                total_points INTEGER NOT NULL,
                passed INTEGER NOT NULL,
                completed_at TEXT NOT NULL DEFAULT (datetime('now')),
                time_taken INTEGER,
                UNIQUE (quiz_id, student_id, attempt_number),
                FOREIGN KEY (quiz_id) REFERENCES quizzes(id) ON DELETE CASCADE,
                FOREIGN KEY (student_id) REFERENCES users(id) ON DELETE CASCADE
            );

            CREATE TABLE IF NOT EXISTS quiz_answers (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                attempt_id INTEGER NOT NULL,
                question_id INTEGER NOT NULL,
                selected_options TEXT NOT NULL DEFAULT '[]',
                text_answer TEXT,
                is_correct INTEGER NOT NULL DEFAULT 0,
                FOREIGN KEY (attempt_id) REFERENCES quiz_attempts(id) ON DELETE CASCADE,
                FOREIGN KEY (question_id) REFERENCES questions(id) ON DELETE CASCADE
            );

            CREATE TABLE IF NOT EXISTS assignments (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                lesson_id INTEGER NOT NULL UNIQUE,
                title TEXT NOT NULL,
                description TEXT NOT NULL DEFAULT '',
                due_date TEXT NOT NULL,
                max_points INTEGER NOT NULL DEFAULT 100,
                FOREIGN KEY (lesson_id) REFERENCES lessons(id) ON DELETE CASCADE
            );

            CREATE TABLE IF NOT EXISTS submissions (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                assignment_id INTEGER NOT NULL,
                student_id INTEGER NOT NULL,
                file_path TEXT,
                body TEXT,
                submitted_at TEXT NOT NULL DEFAULT (datetime('now')),
                is_late INTEGER NOT NULL DEFAULT 0,
                grade REAL,
                feedback TEXT,
                UNIQUE (assignment_id, student_id),
                FOREIGN KEY (assignment_id) REFERENCES assignments(id) ON DELETE CASCADE,
                FOREIGN KEY (student_id) REFERENCES users(id) ON DELETE CASCADE
            );

            CREATE TABLE IF NOT EXISTS grades (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                enrollment_id INTEGER NOT NULL,
                source TEXT NOT NULL CHECK(source IN ('quiz', 'assignment', 'exam')),
                quiz_id INTEGER,
                assignment_id INTEGER,
                score REAL NOT NULL,
                max_points REAL NOT NULL,
                recorded_at TEXT NOT NULL DEFAULT (datetime('now')),
                FOREIGN KEY (enrollment_id) REFERENCES enrollments(id) ON DELETE CASCADE,
                FOREIGN KEY (quiz_id) REFERENCES quizzes(id) ON DELETE CASCADE,
                FOREIGN KEY (assignment_id) REFERENCES assignments(id) ON DELETE CASCADE
            );

            CREATE TABLE IF NOT EXISTS course_grades (
                enrollment_id INTEGER PRIMARY KEY,
                final_grade REAL NOT NULL DEFAULT 0,
                letter_grade TEXT NOT NULL DEFAULT 'F',
                updated_at TEXT NOT NULL DEFAULT (datetime('now')),
                FOREIGN KEY (enrollment_id) REFERENCES enrollments(id) ON DELETE CASCADE
            );

            CREATE TABLE IF NOT EXISTS forums (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                course_id INTEGER NOT NULL UNIQUE,
                title TEXT NOT NULL DEFAULT 'Course Forum',
                description TEXT,
                is_active INTEGER NOT NULL DEFAULT 1,
                FOREIGN KEY (course_id) REFERENCES courses(id) ON DELETE CASCADE
            );

            CREATE TABLE IF NOT EXISTS forum_topics (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                forum_id INTEGER NOT NULL,
                title TEXT NOT NULL,
                content TEXT NOT NULL,
                author_id INTEGER NOT NULL,
                created_at TEXT NOT NULL DEFAULT (datetime('now')),
                updated_at TEXT NOT NULL DEFAULT (datetime('now')),
                is_pinned INTEGER NOT NULL DEFAULT 0,
                is_closed INTEGER NOT NULL DEFAULT 0,
                FOREIGN KEY (forum_id) REFERENCES forums(id) ON DELETE CASCADE,
                FOREIGN KEY (author_id) REFERENCES users(id) ON DELETE CASCADE
            );

            CREATE TABLE IF NOT EXISTS forum_posts (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                topic_id INTEGER NOT NULL,
                content TEXT NOT NULL,
                author_id INTEGER NOT NULL,
                created_at TEXT NOT NULL DEFAULT (datetime('now')),
                updated_at TEXT NOT NULL DEFAULT (datetime('now')),
                is_edited INTEGER NOT NULL DEFAULT 0,
                FOREIGN KEY (topic_id) REFERENCES forum_topics(id) ON DELETE CASCADE,
                FOREIGN KEY (author_id) REFERENCES users(id) ON DELETE CASCADE
            );

            CREATE TABLE IF NOT EXISTS topic_tags (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL UNIQUE,
                color TEXT NOT NULL DEFAULT '#007bff'
            );

            CREATE TABLE IF NOT EXISTS topic_taggings (
                topic_id INTEGER NOT NULL,
                tag_id INTEGER NOT NULL,
                PRIMARY KEY (topic_id, tag_id),
                FOREIGN KEY (topic_id) REFERENCES forum_topics(id) ON DELETE CASCADE,
                FOREIGN KEY (tag_id) REFERENCES topic_tags(id) ON DELETE CASCADE
            );

            CREATE TABLE IF NOT EXISTS certificates (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                enrollment_id INTEGER NOT NULL UNIQUE,
                certificate_id TEXT NOT NULL UNIQUE,
                issued_at TEXT NOT NULL DEFAULT (datetime('now')),
                is_active INTEGER NOT NULL DEFAULT 1,
                FOREIGN KEY (enrollment_id) REFERENCES enrollments(id) ON DELETE CASCADE
            );

            CREATE TABLE IF NOT EXISTS certificate_templates (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                course_id INTEGER NOT NULL UNIQUE,
                title TEXT NOT NULL DEFAULT 'Certificate of Completion',
                description TEXT NOT NULL,
                font_size INTEGER NOT NULL DEFAULT 14,
                text_color TEXT NOT NULL DEFAULT '#000000',
                is_active INTEGER NOT NULL DEFAULT 1,
                FOREIGN KEY (course_id) REFERENCES courses(id) ON DELETE CASCADE
            );

            CREATE TABLE IF NOT EXISTS notifications (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                recipient_id INTEGER NOT NULL,
                title TEXT NOT NULL,
                message TEXT NOT NULL,
                kind TEXT NOT NULL DEFAULT 'general',
                is_read INTEGER NOT NULL DEFAULT 0,
                created_at TEXT NOT NULL DEFAULT (datetime('now')),
                related_course_id INTEGER,
                related_module_id INTEGER,
                related_lesson_id INTEGER,
                FOREIGN KEY (recipient_id) REFERENCES users(id) ON DELETE CASCADE,
                FOREIGN KEY (related_course_id) REFERENCES courses(id) ON DELETE SET NULL,
                FOREIGN KEY (related_module_id) REFERENCES modules(id) ON DELETE SET NULL,
                FOREIGN KEY (related_lesson_id) REFERENCES lessons(id) ON DELETE SET NULL
            );

            CREATE TABLE IF NOT EXISTS notification_preferences (
                user_id INTEGER PRIMARY KEY,
                email_notifications INTEGER NOT NULL DEFAULT 1,
                in_app_notifications INTEGER NOT NULL DEFAULT 1,
                course_updates INTEGER NOT NULL DEFAULT 1,
                grade_updates INTEGER NOT NULL DEFAULT 1,
                forum_posts INTEGER NOT NULL DEFAULT 1,
                assignment_due INTEGER NOT NULL DEFAULT 1,
                FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE
            );

            -- Reminders already sent, so due-date sweeps stay idempotent
            CREATE TABLE IF NOT EXISTS due_reminders (
                assignment_id INTEGER NOT NULL,
                student_id INTEGER NOT NULL,
                sent_at TEXT NOT NULL DEFAULT (datetime('now')),
                PRIMARY KEY (assignment_id, student_id),
                FOREIGN KEY (assignment_id) REFERENCES assignments(id) ON DELETE CASCADE,
                FOREIGN KEY (student_id) REFERENCES users(id) ON DELETE CASCADE
            );

            CREATE TABLE IF NOT EXISTS analytics_events (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                kind TEXT NOT NULL,
                course_id INTEGER,
                user_id INTEGER,
                value REAL NOT NULL DEFAULT 1.0,
                metadata TEXT NOT NULL DEFAULT '{}',
                recorded_at TEXT NOT NULL DEFAULT (datetime('now')),
                FOREIGN KEY (course_id) REFERENCES courses(id) ON DELETE CASCADE,
                FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE
            );

            CREATE TABLE IF NOT EXISTS reports (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                title TEXT NOT NULL,
                kind TEXT NOT NULL,
                generated_by INTEGER NOT NULL,
                generated_at TEXT NOT NULL DEFAULT (datetime('now')),
                data TEXT NOT NULL,
                is_active INTEGER NOT NULL DEFAULT 1,
                FOREIGN KEY (generated_by) REFERENCES users(id) ON DELETE CASCADE
            );

            CREATE TABLE IF NOT EXISTS dashboard_widgets (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id INTEGER NOT NULL,
                kind TEXT NOT NULL,
                position INTEGER NOT NULL DEFAULT 0,
                is_visible INTEGER NOT NULL DEFAULT 1,
                config TEXT NOT NULL DEFAULT '{}',
                FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE
            );

            CREATE TABLE IF NOT EXISTS accessibility_settings (
                user_id INTEGER PRIMARY KEY,
                high_contrast_mode INTEGER NOT NULL DEFAULT 0,
                large_text_mode INTEGER NOT NULL DEFAULT 0,
                reduced_motion_mode INTEGER NOT NULL DEFAULT 0,
                screen_reader_optimized INTEGER NOT NULL DEFAULT 1,
                keyboard_navigation_enabled INTEGER NOT NULL DEFAULT 1,
                focus_indicator_enabled INTEGER NOT NULL DEFAULT 1,
                caption_preference INTEGER NOT NULL DEFAULT 1,
                audio_volume_level INTEGER NOT NULL DEFAULT 50 CHECK(audio_volume_level BETWEEN 0 AND 100),
                preferred_font_size TEXT NOT NULL DEFAULT 'medium',
                created_at TEXT NOT NULL DEFAULT (datetime('now')),
                updated_at TEXT NOT NULL DEFAULT (datetime('now')),
                FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE
            );

            CREATE INDEX IF NOT EXISTS idx_courses_instructor ON courses(instructor_id);
            CREATE INDEX IF NOT EXISTS idx_modules_course ON modules(course_id, sort_order);
            CREATE INDEX IF NOT EXISTS idx_lessons_module ON lessons(module_id, sort_order);
            CREATE INDEX IF NOT EXISTS idx_enrollments_course ON enrollments(course_id);
            CREATE INDEX IF NOT EXISTS idx_questions_quiz ON questions(quiz_id, sort_order);
            CREATE INDEX IF NOT EXISTS idx_attempts_student ON quiz_attempts(student_id, quiz_id);
            CREATE INDEX IF NOT EXISTS idx_grades_enrollment ON grades(enrollment_id);
            CREATE INDEX IF NOT EXISTS idx_topics_forum ON forum_topics(forum_id);
            CREATE INDEX IF NOT EXISTS idx_posts_topic ON forum_posts(topic_id);
            CREATE INDEX IF NOT EXISTS idx_notifications_recipient ON notifications(recipient_id, is_read);
            CREATE INDEX IF NOT EXISTS idx_events_kind ON analytics_events(kind);
            CREATE INDEX IF NOT EXISTS idx_events_course ON analytics_events(course_id);
            CREATE INDEX IF NOT EXISTS idx_widgets_user ON dashboard_widgets(user_id, position);
            "#,
        )?;

        self.conn
            .execute_batch(&format!("PRAGMA user_version = {SCHEMA_VERSION};"))?;

        info!("Schema ready (version {SCHEMA_VERSION})");
        Ok(())
    }

    /// Runs `f` inside a transaction, or inline when one is already open.
    pub(crate) fn in_transaction<T>(&self, f: impl FnOnce(&Self) -> Result<T>) -> Result<T> {
        if !self.conn.is_autocommit() {
            return f(self);
        }
        let tx = self.conn.unchecked_transaction()?;
        let value = f(self)?;
        tx.commit()?;
        Ok(value)
    }

    pub fn get_stats(&self) -> Result<Stats> {
        let count = |sql: &str| -> Result<i64> { Ok(self.conn.query_row(sql, [], |row| row.get(0))?) };

        Ok(Stats {
            users: count("SELECT COUNT(*) FROM users")?,
            courses: count("SELECT COUNT(*) FROM courses WHERE is_active = 1")?,
            lessons: count("SELECT COUNT(*) FROM lessons")?,
            enrollments: count("SELECT COUNT(*) FROM enrollments")?,
            quiz_attempts: count("SELECT COUNT(*) FROM quiz_attempts")?,
            submissions: count("SELECT COUNT(*) FROM submissions")?,
            certificates: count("SELECT COUNT(*) FROM certificates WHERE is_active = 1")?,
            forum_posts: count("SELECT COUNT(*) FROM forum_posts")?,
        })
    }
}

pub(crate) fn timestamp() -> String {
    Utc::now().to_rfc3339()
}

/// SQL for a user's display name: "First Last", else the username.
pub(crate) fn display_name_sql(alias: &str) -> String {
    format!(
        "COALESCE(NULLIF(TRIM({alias}.first_name || ' ' || {alias}.last_name), ''), {alias}.username)"
    )
}

pub(crate) fn is_hex_color(color: &str) -> bool {
    color.len() == 7
        && color.starts_with('#')
        && color[1..].chars().all(|c| c.is_ascii_hexdigit())
}

pub(crate) fn is_unique_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _) if e.code == rusqlite::ErrorCode::ConstraintViolation
    )
}

#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct Stats {
    pub users: i64,
    pub courses: i64,
    pub lessons: i64,
    pub enrollments: i64,
    pub quiz_attempts: i64,
    pub submissions: i64,
    pub certificates: i64,
    pub forum_posts: i64,
}

#[cfg(test)]
mod tests {
    use super::testing::{setup_db, Fixture};
    use super::*;

    mod init_tests {
        use super::*;

        #[test]
        fn init_creates_tables() {
            let db = setup_db();
            for table in [
                "users",
                "courses",
                "modules",
                "lessons",
                "enrollments",
                "completed_lessons",
                "quiz_attempts",
                "grades",
                "course_grades",
                "certificates",
                "notifications",
                "analytics_events",
                "accessibility_settings",
            ] {
                let count: i64 = db
                    .conn
                    .query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| row.get(0))
                    .unwrap_or_else(|e| panic!("{table} should exist: {e}"));
                assert_eq!(count, 0, "{table} should start empty");
            }
        }

        #[test]
        fn init_is_idempotent() {
            let db = setup_db();
            let fx = Fixture::new(&db);

            db.init().expect("Re-init should succeed");

            let course = db.get_course(fx.course_id).unwrap();
            assert!(course.is_some());
        }

        #[test]
        fn init_records_schema_version() {
            let db = setup_db();
            let version: i32 = db
                .conn
                .query_row("PRAGMA user_version", [], |row| row.get(0))
                .unwrap();
            assert_eq!(version, SCHEMA_VERSION);
        }

        #[test]
        fn foreign_keys_are_enforced() {
            let db = setup_db();
            let result = db.conn.execute(
                "INSERT INTO modules (course_id, title) VALUES (999, 'orphan')",
                [],
            );
            assert!(result.is_err());
        }
    }

    mod transaction_tests {
        use super::*;
        use crate::error::LmsError;

        #[test]
        fn failed_closure_rolls_back() {
            let db = setup_db();
            let result: Result<()> = db.in_transaction(|db| {
                db.conn
                    .execute("INSERT INTO categories (name) VALUES ('Math')", [])?;
                Err(LmsError::invalid("boom"))
            });
            assert!(result.is_err());
            assert!(db.list_categories().unwrap().is_empty());
        }

        #[test]
        fn nested_transactions_join_the_outer_one() {
            let db = setup_db();
            db.in_transaction(|db| {
                db.in_transaction(|db| {
                    db.conn
                        .execute("INSERT INTO categories (name) VALUES ('Art')", [])?;
                    Ok(())
                })
            })
            .unwrap();
            assert_eq!(db.list_categories().unwrap().len(), 1);
        }
    }

    mod stats_tests {
        use super::*;

        #[test]
        fn stats_empty_db() {
            let db = setup_db();
            let stats = db.get_stats().unwrap();
            assert_eq!(stats.users, 0);
            assert_eq!(stats.courses, 0);
            assert_eq!(stats.certificates, 0);
        }

        #[test]
        fn stats_counts_fixture() {
            let db = setup_db();
            let fx = Fixture::new(&db);
            db.enroll(fx.student_id, fx.course_id).unwrap();

            let stats = db.get_stats().unwrap();
            assert_eq!(stats.users, 3);
            assert_eq!(stats.courses, 1);
            assert_eq!(stats.lessons, 3);
            assert_eq!(stats.enrollments, 1);
        }
    }
}
