use chrono::{DateTime, TimeDelta, Utc};
use rusqlite::{params, Row};
use tracing::{debug, info};

use super::assignments::parse_due_date;
use super::{timestamp, Database};
use crate::error::{LmsError, Result};
use crate::models::{Notification, NotificationKind, NotificationPreference};

fn notification_from_row(row: &Row<'_>) -> rusqlite::Result<Notification> {
    let kind: String = row.get(4)?;
    Ok(Notification {
        id: row.get(0)?,
        recipient_id: row.get(1)?,
        title: row.get(2)?,
        message: row.get(3)?,
        kind: NotificationKind::from_str(&kind),
        is_read: row.get(5)?,
        created_at: row.get(6)?,
        related_course_id: row.get(7)?,
        related_module_id: row.get(8)?,
        related_lesson_id: row.get(9)?,
    })
}

const NOTIFICATION_COLUMNS: &str = "id, recipient_id, title, message, kind, is_read, created_at, \
                                    related_course_id, related_module_id, related_lesson_id";

impl Database {
    /// Writes a notification for one recipient unless their preferences
    /// turn this kind off. Returns the new id, or `None` when suppressed.
    pub fn notify(
        &self,
        recipient_id: i64,
        kind: NotificationKind,
        title: &str,
        message: &str,
        course_id: Option<i64>,
    ) -> Result<Option<i64>> {
        let prefs = self.get_preferences(recipient_id)?;
        if !prefs.allows(kind) {
            debug!(recipient_id, kind = kind.as_str(), "Notification suppressed by preferences");
            return Ok(None);
        }

        self.conn.execute(
            r#"
            INSERT INTO notifications (recipient_id, title, message, kind, created_at, related_course_id)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
            params![recipient_id, title, message, kind.as_str(), timestamp(), course_id],
        )?;
        Ok(Some(self.conn.last_insert_rowid()))
    }

    pub fn list_notifications(&self, user_id: i64, unread_only: bool) -> Result<Vec<Notification>> {
        let mut stmt = self.conn.prepare(&format!(
            r#"
            SELECT {NOTIFICATION_COLUMNS}
            FROM notifications
            WHERE recipient_id = ?1 AND (?2 = 0 OR is_read = 0)
            ORDER BY created_at DESC, id DESC
            "#
        ))?;
        let rows = stmt.query_map(params![user_id, unread_only], notification_from_row)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    pub fn unread_count(&self, user_id: i64) -> Result<i64> {
        Ok(self.conn.query_row(
            "SELECT COUNT(*) FROM notifications WHERE recipient_id = ?1 AND is_read = 0",
            params![user_id],
            |row| row.get(0),
        )?)
    }

    /// Marks one of the user's own notifications read.
    pub fn mark_read(&self, user_id: i64, notification_id: i64) -> Result<()> {
        let owner = self.conn.query_row(
            "SELECT recipient_id FROM notifications WHERE id = ?1",
            params![notification_id],
            |row| row.get::<_, i64>(0),
        );

        match owner {
            Ok(owner) if owner == user_id => {
                self.conn.execute(
                    "UPDATE notifications SET is_read = 1 WHERE id = ?1",
                    params![notification_id],
                )?;
                Ok(())
            }
            // Someone else's notification looks the same as a missing one
            Ok(_) | Err(rusqlite::Error::QueryReturnedNoRows) => {
                Err(LmsError::not_found("Notification", notification_id))
            }
            Err(e) => Err(e.into()),
        }
    }

    pub fn mark_all_read(&self, user_id: i64) -> Result<usize> {
        let changed = self.conn.execute(
            "UPDATE notifications SET is_read = 1 WHERE recipient_id = ?1 AND is_read = 0",
            params![user_id],
        )?;
        Ok(changed)
    }

    pub fn get_preferences(&self, user_id: i64) -> Result<NotificationPreference> {
        let prefs = self.conn.query_row(
            r#"
            SELECT user_id, email_notifications, in_app_notifications, course_updates,
                   grade_updates, forum_posts, assignment_due
            FROM notification_preferences WHERE user_id = ?1
            "#,
            params![user_id],
            |row| {
                Ok(NotificationPreference {
                    user_id: row.get(0)?,
                    email_notifications: row.get(1)?,
                    in_app_notifications: row.get(2)?,
                    course_updates: row.get(3)?,
                    grade_updates: row.get(4)?,
                    forum_posts: row.get(5)?,
                    assignment_due: row.get(6)?,
                })
            },
        );

        match prefs {
            Ok(p) => Ok(p),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(NotificationPreference::defaults(user_id)),
            Err(e) => Err(e.into()),
        }
    }

    pub fn update_preferences(&self, prefs: &NotificationPreference) -> Result<()> {
        self.require_user(prefs.user_id)?;
        self.conn.execute(
            r#"
            INSERT INTO notification_preferences (user_id, email_notifications, in_app_notifications,
                                                  course_updates, grade_updates, forum_posts, assignment_due)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            ON CONFLICT(user_id) DO UPDATE SET
                email_notifications = excluded.email_notifications,
                in_app_notifications = excluded.in_app_notifications,
                course_updates = excluded.course_updates,
                grade_updates = excluded.grade_updates,
                forum_posts = excluded.forum_posts,
                assignment_due = excluded.assignment_due
            "#,
            params![
                prefs.user_id,
                prefs.email_notifications,
                prefs.in_app_notifications,
                prefs.course_updates,
                prefs.grade_updates,
                prefs.forum_posts,
                prefs.assignment_due
            ],
        )?;
        info!(user_id = prefs.user_id, "Updated notification preferences");
        Ok(())
    }

    /// Reminds enrolled students of assignments due within `window_hours`
    /// of `now` that they have not submitted. Each student hears about a
    /// given assignment at most once. Returns how many reminders were sent.
    pub fn notify_due_assignments(&self, now: DateTime<Utc>, window_hours: i64) -> Result<usize> {
        let horizon = TimeDelta::try_hours(window_hours.max(1))
            .and_then(|window| now.checked_add_signed(window))
            .ok_or_else(|| LmsError::invalid(format!("due window of {window_hours} hours is too large")))?;
        let mut sent = 0;

        self.in_transaction(|db| {
            for assignment in db.list_all_assignments()? {
                let due = parse_due_date(&assignment.due_date)?;
                if due <= now || due > horizon {
                    continue;
                }
                let course_id = db.lesson_course_id(assignment.lesson_id)?;

                let pending: Vec<i64> = {
                    let mut stmt = db.conn.prepare(
                        r#"
                        SELECT e.student_id FROM enrollments e
                        WHERE e.course_id = ?1
                          AND NOT EXISTS (SELECT 1 FROM submissions s
                                          WHERE s.assignment_id = ?2 AND s.student_id = e.student_id)
                          AND NOT EXISTS (SELECT 1 FROM due_reminders r
                                          WHERE r.assignment_id = ?2 AND r.student_id = e.student_id)
                        ORDER BY e.student_id
                        "#,
                    )?;
                    let rows = stmt.query_map(params![course_id, assignment.id], |row| row.get(0))?;
                    rows.collect::<rusqlite::Result<Vec<_>>>()?
                };

                for student_id in pending {
                    let delivered = db.notify(
                        student_id,
                        NotificationKind::AssignmentDue,
                        "Assignment due soon",
                        &format!("{} is due {}.", assignment.title, due.format("%Y-%m-%d %H:%M UTC")),
                        Some(course_id),
                    )?;
                    if delivered.is_some() {
                        db.conn.execute(
                            "INSERT INTO due_reminders (assignment_id, student_id, sent_at) VALUES (?1, ?2, ?3)",
                            params![assignment.id, student_id, timestamp()],
                        )?;
                        sent += 1;
                    }
                }
            }
            Ok(())
        })?;

        info!(sent, window_hours, "Due-date reminders sent");
        Ok(sent)
    }
}
