use std::collections::BTreeMap;

use rusqlite::{params, Row};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::info;

use super::{display_name_sql, timestamp, Database};
use crate::error::{LmsError, Result};
use crate::grading::{self, LetterGrade};
use crate::models::{
    AnalyticsEvent, DashboardWidget, EventKind, Report, ReportKind, Role, WidgetKind,
};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CourseAnalytics {
    pub course_id: i64,
    pub course_title: String,
    pub enrollments: i64,
    pub average_progress: f64,
    pub average_final_grade: f64,
    pub completions: i64,
    pub certificates: i64,
    pub quiz_attempts: i64,
    pub submissions: i64,
    pub letter_distribution: BTreeMap<String, i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StudentCourseAnalytics {
    pub course_id: i64,
    pub course_title: String,
    pub progress: f64,
    pub final_grade: f64,
    pub letter_grade: LetterGrade,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StudentAnalytics {
    pub student_id: i64,
    pub student_name: String,
    pub courses: Vec<StudentCourseAnalytics>,
    pub quiz_attempts: i64,
    pub submissions: i64,
    pub certificates: i64,
    pub events: i64,
}

fn event_from_row(row: &Row<'_>) -> rusqlite::Result<(AnalyticsEvent, String)> {
    let kind: String = row.get(1)?;
    let metadata: String = row.get(5)?;
    Ok((
        AnalyticsEvent {
            id: row.get(0)?,
            kind: EventKind::from_str(&kind).unwrap_or(EventKind::UserEngagement),
            course_id: row.get(2)?,
            user_id: row.get(3)?,
            value: row.get(4)?,
            metadata: Value::Null,
            recorded_at: row.get(6)?,
        },
        metadata,
    ))
}

fn empty_distribution() -> BTreeMap<String, i64> {
    LetterGrade::all()
        .iter()
        .map(|l| (l.as_str().to_string(), 0))
        .collect()
}

impl Database {
    pub fn record_event(
        &self,
        kind: EventKind,
        course_id: Option<i64>,
        user_id: Option<i64>,
        value: f64,
        metadata: Value,
    ) -> Result<i64> {
        self.conn.execute(
            r#"
            INSERT INTO analytics_events (kind, course_id, user_id, value, metadata, recorded_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
            params![
                kind.as_str(),
                course_id,
                user_id,
                value,
                serde_json::to_string(&metadata)?,
                timestamp()
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    /// Whether this enrollment already logged its course completion.
    pub(crate) fn completion_logged(&self, enrollment_id: i64) -> Result<bool> {
        let exists: bool = self.conn.query_row(
            r#"
            SELECT EXISTS(SELECT 1 FROM analytics_events
                          WHERE kind = ?1 AND json_extract(metadata, '$.enrollment_id') = ?2)
            "#,
            params![EventKind::CourseCompletion.as_str(), enrollment_id],
            |row| row.get(0),
        )?;
        Ok(exists)
    }

    pub fn count_events(&self, kind: EventKind, course_id: Option<i64>) -> Result<i64> {
        Ok(self.conn.query_row(
            "SELECT COUNT(*) FROM analytics_events WHERE kind = ?1 AND (?2 IS NULL OR course_id = ?2)",
            params![kind.as_str(), course_id],
            |row| row.get(0),
        )?)
    }

    /// Most recent events first, optionally narrowed by kind and course.
    pub fn list_events(
        &self,
        kind: Option<EventKind>,
        course_id: Option<i64>,
        limit: usize,
    ) -> Result<Vec<AnalyticsEvent>> {
        let raw = {
            let mut stmt = self.conn.prepare(
                r#"
                SELECT id, kind, course_id, user_id, value, metadata, recorded_at
                FROM analytics_events
                WHERE (?1 IS NULL OR kind = ?1) AND (?2 IS NULL OR course_id = ?2)
                ORDER BY recorded_at DESC, id DESC
                LIMIT ?3
                "#,
            )?;
            let rows = stmt.query_map(
                params![kind.map(|k| k.as_str()), course_id, limit as i64],
                event_from_row,
            )?;
            rows.collect::<rusqlite::Result<Vec<_>>>()?
        };

        let mut events = Vec::with_capacity(raw.len());
        for (mut event, metadata) in raw {
            event.metadata = serde_json::from_str(&metadata)?;
            events.push(event);
        }
        Ok(events)
    }

    pub fn course_analytics(&self, course_id: i64) -> Result<CourseAnalytics> {
        let course = self.require_course(course_id)?;
        let enrollments = self.list_course_enrollments(course_id)?;

        let mut progress_total = 0.0;
        let mut grade_total = 0.0;
        let mut distribution = empty_distribution();
        for enrollment in &enrollments {
            progress_total += self.progress(enrollment.id)?.percentage;
            if let Some(cg) = self.get_course_grade(enrollment.id)? {
                grade_total += cg.final_grade;
                *distribution
                    .entry(cg.letter_grade.as_str().to_string())
                    .or_insert(0) += 1;
            }
        }
        let n = enrollments.len() as f64;
        let average = |total: f64| if n > 0.0 { grading::round2(total / n) } else { 0.0 };

        let count = |sql: &str| -> Result<i64> {
            Ok(self.conn.query_row(sql, params![course_id], |row| row.get(0))?)
        };

        Ok(CourseAnalytics {
            course_id,
            course_title: course.title,
            enrollments: enrollments.len() as i64,
            average_progress: average(progress_total),
            average_final_grade: average(grade_total),
            // Only completions of enrollments that still exist
            completions: self.conn.query_row(
                r#"
                SELECT COUNT(*) FROM analytics_events ev
                JOIN enrollments e ON e.id = json_extract(ev.metadata, '$.enrollment_id')
                WHERE ev.kind = ?1 AND e.course_id = ?2
                "#,
                params![EventKind::CourseCompletion.as_str(), course_id],
                |row| row.get(0),
            )?,
            certificates: count(
                r#"
                SELECT COUNT(*) FROM certificates c
                JOIN enrollments e ON e.id = c.enrollment_id
                WHERE e.course_id = ?1 AND c.is_active = 1
                "#,
            )?,
            quiz_attempts: count(
                r#"
                SELECT COUNT(*) FROM quiz_attempts a
                JOIN quizzes q ON q.id = a.quiz_id
                JOIN lessons l ON l.id = q.lesson_id
                JOIN modules m ON m.id = l.module_id
                WHERE m.course_id = ?1
                "#,
            )?,
            submissions: count(
                r#"
                SELECT COUNT(*) FROM submissions s
                JOIN assignments a ON a.id = s.assignment_id
                JOIN lessons l ON l.id = a.lesson_id
                JOIN modules m ON m.id = l.module_id
                WHERE m.course_id = ?1
                "#,
            )?,
            letter_distribution: distribution,
        })
    }

    pub fn student_analytics(&self, student_id: i64) -> Result<StudentAnalytics> {
        let student = self.require_user(student_id)?;

        let courses = self
            .student_gradebook(student_id)?
            .into_iter()
            .map(|row| StudentCourseAnalytics {
                course_id: row.course_id,
                course_title: row.course_title,
                progress: row.progress,
                final_grade: row.final_grade,
                letter_grade: row.letter_grade,
            })
            .collect();

        let count = |sql: &str| -> Result<i64> {
            Ok(self.conn.query_row(sql, params![student_id], |row| row.get(0))?)
        };

        Ok(StudentAnalytics {
            student_id,
            student_name: student.display_name(),
            courses,
            quiz_attempts: count("SELECT COUNT(*) FROM quiz_attempts WHERE student_id = ?1")?,
            submissions: count("SELECT COUNT(*) FROM submissions WHERE student_id = ?1")?,
            certificates: count(
                r#"
                SELECT COUNT(*) FROM certificates c
                JOIN enrollments e ON e.id = c.enrollment_id
                WHERE e.student_id = ?1 AND c.is_active = 1
                "#,
            )?,
            events: count("SELECT COUNT(*) FROM analytics_events WHERE user_id = ?1")?,
        })
    }

    fn report_data(&self, kind: ReportKind) -> Result<Value> {
        let data = match kind {
            ReportKind::CoursePerformance => {
                let mut courses = Vec::new();
                for course in self.list_courses(false, None)? {
                    courses.push(self.course_analytics(course.id)?);
                }
                json!({ "courses": courses })
            }
            ReportKind::StudentProgress => {
                let mut students = Vec::new();
                for student in self.list_users(Some(Role::Student))? {
                    students.push(self.student_analytics(student.id)?);
                }
                json!({ "students": students })
            }
            ReportKind::UserEngagement => {
                let mut by_kind = BTreeMap::new();
                {
                    let mut stmt = self.conn.prepare(
                        "SELECT kind, COUNT(*) FROM analytics_events GROUP BY kind ORDER BY kind",
                    )?;
                    let rows = stmt.query_map([], |row| {
                        Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
                    })?;
                    for row in rows {
                        let (kind, count) = row?;
                        by_kind.insert(kind, count);
                    }
                }
                let active_users: i64 = self.conn.query_row(
                    "SELECT COUNT(DISTINCT user_id) FROM analytics_events WHERE user_id IS NOT NULL",
                    [],
                    |row| row.get(0),
                )?;
                json!({ "events_by_kind": by_kind, "active_users": active_users })
            }
            ReportKind::SystemUsage => serde_json::to_value(self.get_stats()?)?,
            ReportKind::GradeDistribution => {
                let mut distribution = empty_distribution();
                let mut stmt = self.conn.prepare(
                    "SELECT letter_grade, COUNT(*) FROM course_grades GROUP BY letter_grade",
                )?;
                let rows = stmt.query_map([], |row| {
                    Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
                })?;
                for row in rows {
                    let (letter, count) = row?;
                    distribution.insert(letter, count);
                }
                json!({ "letters": distribution })
            }
            ReportKind::CertificateIssuance => {
                let mut stmt = self.conn.prepare(
                    r#"
                    SELECT co.id, co.title, COUNT(c.id)
                    FROM courses co
                    LEFT JOIN enrollments e ON e.course_id = co.id
                    LEFT JOIN certificates c ON c.enrollment_id = e.id AND c.is_active = 1
                    GROUP BY co.id, co.title
                    ORDER BY co.title
                    "#,
                )?;
                let rows = stmt.query_map([], |row| {
                    Ok(json!({
                        "course_id": row.get::<_, i64>(0)?,
                        "course_title": row.get::<_, String>(1)?,
                        "certificates": row.get::<_, i64>(2)?,
                    }))
                })?;
                let per_course = rows.collect::<rusqlite::Result<Vec<_>>>()?;
                let total: i64 = per_course
                    .iter()
                    .filter_map(|c| c["certificates"].as_i64())
                    .sum();
                json!({ "courses": per_course, "total": total })
            }
        };
        Ok(data)
    }

    /// Snapshots the data for `kind` into a stored report. Staff only.
    pub fn generate_report(&self, actor_id: i64, kind: ReportKind, title: Option<&str>) -> Result<Report> {
        self.require_role(actor_id, &[Role::Instructor, Role::Admin])?;

        let data = self.report_data(kind)?;
        let title = title
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| format!("{} report", kind.label()));

        self.conn.execute(
            r#"
            INSERT INTO reports (title, kind, generated_by, generated_at, data)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
            params![title, kind.as_str(), actor_id, timestamp(), serde_json::to_string(&data)?],
        )?;
        let report_id = self.conn.last_insert_rowid();
        info!(report_id, kind = kind.as_str(), "Generated report");

        self.get_report(report_id)?
            .ok_or_else(|| LmsError::not_found("Report", report_id))
    }

    pub fn get_report(&self, id: i64) -> Result<Option<Report>> {
        let report = self.conn.query_row(
            "SELECT id, title, kind, generated_by, generated_at, data, is_active FROM reports WHERE id = ?1",
            params![id],
            |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, i64>(3)?,
                    row.get::<_, String>(4)?,
                    row.get::<_, String>(5)?,
                    row.get::<_, bool>(6)?,
                ))
            },
        );

        match report {
            Ok((id, title, kind, generated_by, generated_at, data, is_active)) => Ok(Some(Report {
                id,
                title,
                kind: ReportKind::from_str(&kind).unwrap_or(ReportKind::SystemUsage),
                generated_by,
                generated_at,
                data: serde_json::from_str(&data)?,
                is_active,
            })),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Report headers, newest first. The data snapshot is left as `null`.
    pub fn list_reports(&self, kind: Option<ReportKind>) -> Result<Vec<Report>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT id, title, kind, generated_by, generated_at, is_active
            FROM reports
            WHERE is_active = 1 AND (?1 IS NULL OR kind = ?1)
            ORDER BY generated_at DESC, id DESC
            "#,
        )?;
        let rows = stmt.query_map(params![kind.map(|k| k.as_str())], |row| {
            let kind: String = row.get(2)?;
            Ok(Report {
                id: row.get(0)?,
                title: row.get(1)?,
                kind: ReportKind::from_str(&kind).unwrap_or(ReportKind::SystemUsage),
                generated_by: row.get(3)?,
                generated_at: row.get(4)?,
                data: Value::Null,
                is_active: row.get(5)?,
            })
        })?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    // Dashboard widgets
    pub fn add_widget(
        &self,
        user_id: i64,
        kind: WidgetKind,
        position: i32,
        config: Value,
    ) -> Result<i64> {
        self.require_user(user_id)?;
        self.conn.execute(
            "INSERT INTO dashboard_widgets (user_id, kind, position, config) VALUES (?1, ?2, ?3, ?4)",
            params![user_id, kind.as_str(), position, serde_json::to_string(&config)?],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    pub fn list_widgets(&self, user_id: i64) -> Result<Vec<DashboardWidget>> {
        let raw = {
            let mut stmt = self.conn.prepare(
                r#"
                SELECT id, user_id, kind, position, is_visible, config
                FROM dashboard_widgets
                WHERE user_id = ?1
                ORDER BY position, id
                "#,
            )?;
            let rows = stmt.query_map(params![user_id], |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, i64>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, i32>(3)?,
                    row.get::<_, bool>(4)?,
                    row.get::<_, String>(5)?,
                ))
            })?;
            rows.collect::<rusqlite::Result<Vec<_>>>()?
        };

        let mut widgets = Vec::with_capacity(raw.len());
        for (id, user_id, kind, position, is_visible, config) in raw {
            let Some(kind) = WidgetKind::from_str(&kind) else {
                continue;
            };
            widgets.push(DashboardWidget {
                id,
                user_id,
                kind,
                position,
                is_visible,
                config: serde_json::from_str(&config)?,
            });
        }
        Ok(widgets)
    }

    pub fn remove_widget(&self, user_id: i64, widget_id: i64) -> Result<bool> {
        let rows = self.conn.execute(
            "DELETE FROM dashboard_widgets WHERE id = ?1 AND user_id = ?2",
            params![widget_id, user_id],
        )?;
        Ok(rows > 0)
    }

    /// Users ranked by how many events they generated.
    pub fn most_active_users(&self, limit: usize) -> Result<Vec<(String, i64)>> {
        let mut stmt = self.conn.prepare(&format!(
            r#"
            SELECT {}, COUNT(*) AS n
            FROM analytics_events ev
            JOIN users u ON u.id = ev.user_id
            GROUP BY u.id
            ORDER BY n DESC, u.username
            LIMIT ?1
            "#,
            display_name_sql("u")
        ))?;
        let rows = stmt.query_map(params![limit as i64], |row| Ok((row.get(0)?, row.get(1)?)))?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }
}
