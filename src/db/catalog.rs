use rusqlite::{params, Row};
use tracing::{debug, info};

use super::{display_name_sql, is_unique_violation, timestamp, Database};
use crate::error::{LmsError, Result};
use crate::models::{
    Category, ContentType, Course, CourseOutline, Lesson, Module, ModuleOutline, NewLesson, Role,
};

fn course_select() -> String {
    format!(
        r#"
        SELECT c.id, c.title, c.description, c.instructor_id, {}, cat.name,
               c.is_active, c.created_at, c.updated_at
        FROM courses c
        JOIN users u ON u.id = c.instructor_id
        LEFT JOIN categories cat ON cat.id = c.category_id
        "#,
        display_name_sql("u")
    )
}

fn course_from_row(row: &Row<'_>) -> rusqlite::Result<Course> {
    Ok(Course {
        id: row.get(0)?,
        title: row.get(1)?,
        description: row.get(2)?,
        instructor_id: row.get(3)?,
        instructor_name: row.get(4)?,
        category: row.get(5)?,
        is_active: row.get(6)?,
        created_at: row.get(7)?,
        updated_at: row.get(8)?,
    })
}

const LESSON_COLUMNS: &str = "l.id, l.module_id, l.title, l.content_type, l.content, l.video_url, \
                              l.file_path, l.duration_minutes, l.sort_order, l.created_at";

fn lesson_from_row(row: &Row<'_>) -> rusqlite::Result<Lesson> {
    let content_type: String = row.get(3)?;
    Ok(Lesson {
        id: row.get(0)?,
        module_id: row.get(1)?,
        title: row.get(2)?,
        content_type: ContentType::from_str(&content_type).unwrap_or(ContentType::Text),
        content: row.get(4)?,
        video_url: row.get(5)?,
        file_path: row.get(6)?,
        duration_minutes: row.get(7)?,
        order: row.get(8)?,
        created_at: row.get(9)?,
    })
}

impl Database {
    // Category operations
    pub fn add_category(&self, name: &str, description: Option<&str>) -> Result<i64> {
        let name = name.trim();
        if name.is_empty() {
            return Err(LmsError::invalid("category name must not be empty"));
        }
        match self.conn.execute(
            "INSERT INTO categories (name, description) VALUES (?1, ?2)",
            params![name, description],
        ) {
            Ok(_) => Ok(self.conn.last_insert_rowid()),
            Err(e) if is_unique_violation(&e) => {
                Err(LmsError::invalid(format!("category '{name}' already exists")))
            }
            Err(e) => Err(e.into()),
        }
    }

    fn get_or_create_category(&self, name: &str) -> Result<i64> {
        let existing = self.conn.query_row(
            "SELECT id FROM categories WHERE name = ?1",
            params![name.trim()],
            |row| row.get(0),
        );

        match existing {
            Ok(id) => Ok(id),
            Err(rusqlite::Error::QueryReturnedNoRows) => self.add_category(name, None),
            Err(e) => Err(e.into()),
        }
    }

    pub fn list_categories(&self) -> Result<Vec<Category>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT cat.id, cat.name, cat.description, COUNT(c.id) AS course_count
            FROM categories cat
            LEFT JOIN courses c ON c.category_id = cat.id AND c.is_active = 1
            GROUP BY cat.id, cat.name, cat.description
            ORDER BY cat.name
            "#,
        )?;

        let rows = stmt.query_map([], |row| {
            Ok(Category {
                id: row.get(0)?,
                name: row.get(1)?,
                description: row.get(2)?,
                course_count: row.get(3)?,
            })
        })?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    // Course operations
    pub fn add_course(
        &self,
        actor_id: i64,
        title: &str,
        description: &str,
        category: Option<&str>,
    ) -> Result<i64> {
        self.require_role(actor_id, &[Role::Instructor, Role::Admin])?;
        let title = title.trim();
        if title.is_empty() {
            return Err(LmsError::invalid("course title must not be empty"));
        }

        self.in_transaction(|db| {
            let category_id = match category {
                Some(name) if !name.trim().is_empty() => Some(db.get_or_create_category(name)?),
                _ => None,
            };
            let now = timestamp();
            db.conn.execute(
                r#"
                INSERT INTO courses (title, description, instructor_id, category_id, created_at, updated_at)
                VALUES (?1, ?2, ?3, ?4, ?5, ?5)
                "#,
                params![title, description, actor_id, category_id, now],
            )?;
            let course_id = db.conn.last_insert_rowid();
            info!(course_id, instructor_id = actor_id, title, "Created course");
            Ok(course_id)
        })
    }

    pub fn get_course(&self, id: i64) -> Result<Option<Course>> {
        let course = self.conn.query_row(
            &format!("{} WHERE c.id = ?1", course_select()),
            params![id],
            course_from_row,
        );

        match course {
            Ok(c) => Ok(Some(c)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    pub fn require_course(&self, id: i64) -> Result<Course> {
        self.get_course(id)?
            .ok_or_else(|| LmsError::not_found("Course", id))
    }

    /// Active courses ordered by title; `all` includes inactive ones.
    pub fn list_courses(&self, all: bool, category: Option<&str>) -> Result<Vec<Course>> {
        let mut stmt = self.conn.prepare(&format!(
            "{} WHERE (?1 OR c.is_active = 1) AND (?2 IS NULL OR cat.name = ?2) ORDER BY c.title, c.id",
            course_select()
        ))?;
        let rows = stmt.query_map(params![all, category], course_from_row)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    pub fn list_courses_taught(&self, instructor_id: i64) -> Result<Vec<Course>> {
        let mut stmt = self.conn.prepare(&format!(
            "{} WHERE c.instructor_id = ?1 ORDER BY c.title, c.id",
            course_select()
        ))?;
        let rows = stmt.query_map(params![instructor_id], course_from_row)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    pub fn set_course_active(&self, actor_id: i64, course_id: i64, active: bool) -> Result<()> {
        self.require_course_staff(actor_id, course_id)?;
        self.conn.execute(
            "UPDATE courses SET is_active = ?1, updated_at = ?2 WHERE id = ?3",
            params![active, timestamp(), course_id],
        )?;
        info!(course_id, active, "Course visibility changed");
        Ok(())
    }

    fn touch_course(&self, course_id: i64) -> Result<()> {
        self.conn.execute(
            "UPDATE courses SET updated_at = ?1 WHERE id = ?2",
            params![timestamp(), course_id],
        )?;
        Ok(())
    }

    // Module operations
    pub fn add_module(
        &self,
        actor_id: i64,
        course_id: i64,
        title: &str,
        description: Option<&str>,
        order: i32,
    ) -> Result<i64> {
        self.require_course_staff(actor_id, course_id)?;
        let title = title.trim();
        if title.is_empty() {
            return Err(LmsError::invalid("module title must not be empty"));
        }

        self.in_transaction(|db| {
            db.conn.execute(
                "INSERT INTO modules (course_id, title, description, sort_order) VALUES (?1, ?2, ?3, ?4)",
                params![course_id, title, description, order],
            )?;
            let module_id = db.conn.last_insert_rowid();
            db.touch_course(course_id)?;
            debug!(module_id, course_id, "Added module");
            Ok(module_id)
        })
    }

    pub fn get_module(&self, id: i64) -> Result<Option<Module>> {
        let module = self.conn.query_row(
            "SELECT id, course_id, title, description, sort_order FROM modules WHERE id = ?1",
            params![id],
            |row| {
                Ok(Module {
                    id: row.get(0)?,
                    course_id: row.get(1)?,
                    title: row.get(2)?,
                    description: row.get(3)?,
                    order: row.get(4)?,
                })
            },
        );

        match module {
            Ok(m) => Ok(Some(m)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    pub fn list_modules(&self, course_id: i64) -> Result<Vec<Module>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT id, course_id, title, description, sort_order
            FROM modules
            WHERE course_id = ?1
            ORDER BY sort_order, id
            "#,
        )?;
        let rows = stmt.query_map(params![course_id], |row| {
            Ok(Module {
                id: row.get(0)?,
                course_id: row.get(1)?,
                title: row.get(2)?,
                description: row.get(3)?,
                order: row.get(4)?,
            })
        })?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    // Lesson operations
    pub fn add_lesson(&self, actor_id: i64, module_id: i64, lesson: &NewLesson<'_>) -> Result<i64> {
        let module = self
            .get_module(module_id)?
            .ok_or_else(|| LmsError::not_found("Module", module_id))?;
        self.require_course_staff(actor_id, module.course_id)?;

        let title = lesson.title.trim();
        if title.is_empty() {
            return Err(LmsError::invalid("lesson title must not be empty"));
        }
        if matches!(lesson.duration_minutes, Some(m) if m < 0) {
            return Err(LmsError::invalid("duration must not be negative"));
        }

        self.in_transaction(|db| {
            db.conn.execute(
                r#"
                INSERT INTO lessons (module_id, title, content_type, content, video_url, file_path,
                                     duration_minutes, sort_order, created_at)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
                "#,
                params![
                    module_id,
                    title,
                    lesson.content_type.as_str(),
                    lesson.content,
                    lesson.video_url,
                    lesson.file_path,
                    lesson.duration_minutes,
                    lesson.order,
                    timestamp(),
                ],
            )?;
            let lesson_id = db.conn.last_insert_rowid();
            db.touch_course(module.course_id)?;
            debug!(lesson_id, module_id, "Added lesson");
            Ok(lesson_id)
        })
    }

    pub fn get_lesson(&self, id: i64) -> Result<Option<Lesson>> {
        let lesson = self.conn.query_row(
            &format!("SELECT {LESSON_COLUMNS} FROM lessons l WHERE l.id = ?1"),
            params![id],
            lesson_from_row,
        );

        match lesson {
            Ok(l) => Ok(Some(l)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Course owning the lesson, through its module.
    pub(crate) fn lesson_course_id(&self, lesson_id: i64) -> Result<i64> {
        let course_id = self.conn.query_row(
            r#"
            SELECT m.course_id FROM lessons l
            JOIN modules m ON m.id = l.module_id
            WHERE l.id = ?1
            "#,
            params![lesson_id],
            |row| row.get(0),
        );

        match course_id {
            Ok(id) => Ok(id),
            Err(rusqlite::Error::QueryReturnedNoRows) => Err(LmsError::not_found("Lesson", lesson_id)),
            Err(e) => Err(e.into()),
        }
    }

    /// Every lesson of the course, by module order then lesson order.
    pub fn course_lessons(&self, course_id: i64) -> Result<Vec<Lesson>> {
        let mut stmt = self.conn.prepare(&format!(
            r#"
            SELECT {LESSON_COLUMNS}
            FROM lessons l
            JOIN modules m ON m.id = l.module_id
            WHERE m.course_id = ?1
            ORDER BY m.sort_order, m.id, l.sort_order, l.id
            "#
        ))?;
        let rows = stmt.query_map(params![course_id], lesson_from_row)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    pub fn count_course_lessons(&self, course_id: i64) -> Result<usize> {
        let count: i64 = self.conn.query_row(
            r#"
            SELECT COUNT(*) FROM lessons l
            JOIN modules m ON m.id = l.module_id
            WHERE m.course_id = ?1
            "#,
            params![course_id],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }

    pub fn course_outline(&self, course_id: i64) -> Result<CourseOutline> {
        let course = self.require_course(course_id)?;
        let lessons = self.course_lessons(course_id)?;

        let modules = self
            .list_modules(course_id)?
            .into_iter()
            .map(|module| {
                let lessons = lessons
                    .iter()
                    .filter(|l| l.module_id == module.id)
                    .cloned()
                    .collect();
                ModuleOutline { module, lessons }
            })
            .collect();

        Ok(CourseOutline { course, modules })
    }
}
