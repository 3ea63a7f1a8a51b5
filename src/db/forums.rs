use rusqlite::{params, Row};
use serde_json::json;
use tracing::{debug, info, warn};

use super::{display_name_sql, is_hex_color, timestamp, Database};
use crate::error::{LmsError, Result};
use crate::models::{EventKind, Forum, ForumTopic, NotificationKind, Post, Role, TopicTag};

const DEFAULT_TAG_COLOR: &str = "#007bff";

fn topic_select() -> String {
    format!(
        r#"
        SELECT t.id, t.forum_id, t.title, t.content, t.author_id, {},
               t.created_at, t.updated_at, t.is_pinned, t.is_closed,
               (SELECT COUNT(*) FROM forum_posts p WHERE p.topic_id = t.id)
        FROM forum_topics t
        JOIN users u ON u.id = t.author_id
        "#,
        display_name_sql("u")
    )
}

fn topic_from_row(row: &Row<'_>) -> rusqlite::Result<ForumTopic> {
    Ok(ForumTopic {
        id: row.get(0)?,
        forum_id: row.get(1)?,
        title: row.get(2)?,
        content: row.get(3)?,
        author_id: row.get(4)?,
        author_name: row.get(5)?,
        created_at: row.get(6)?,
        updated_at: row.get(7)?,
        is_pinned: row.get(8)?,
        is_closed: row.get(9)?,
        post_count: row.get(10)?,
        tags: vec![],
    })
}

fn post_from_row(row: &Row<'_>) -> rusqlite::Result<Post> {
    Ok(Post {
        id: row.get(0)?,
        topic_id: row.get(1)?,
        content: row.get(2)?,
        author_id: row.get(3)?,
        author_name: row.get(4)?,
        created_at: row.get(5)?,
        updated_at: row.get(6)?,
        is_edited: row.get(7)?,
    })
}

impl Database {
    /// The course's forum, created on first use.
    pub fn forum_for_course(&self, course_id: i64) -> Result<Forum> {
        self.require_course(course_id)?;
        self.conn.execute(
            "INSERT OR IGNORE INTO forums (course_id) VALUES (?1)",
            params![course_id],
        )?;
        Ok(self.conn.query_row(
            "SELECT id, course_id, title, description, is_active FROM forums WHERE course_id = ?1",
            params![course_id],
            |row| {
                Ok(Forum {
                    id: row.get(0)?,
                    course_id: row.get(1)?,
                    title: row.get(2)?,
                    description: row.get(3)?,
                    is_active: row.get(4)?,
                })
            },
        )?)
    }

    /// Enrolled students, the course instructor and admins may take part.
    fn require_participant(&self, user_id: i64, course_id: i64) -> Result<()> {
        let user = self.require_user(user_id)?;
        let course = self.require_course(course_id)?;
        if user.role == Role::Admin || course.instructor_id == user_id {
            return Ok(());
        }
        if self.find_enrollment(user_id, course_id)?.is_some() {
            return Ok(());
        }
        warn!(user_id, course_id, "Not a forum participant");
        Err(LmsError::PermissionDenied(format!(
            "{} is not part of course {}",
            user.username, course_id
        )))
    }

    fn topic_course_id(&self, topic_id: i64) -> Result<i64> {
        let course_id = self.conn.query_row(
            r#"
            SELECT f.course_id FROM forum_topics t
            JOIN forums f ON f.id = t.forum_id
            WHERE t.id = ?1
            "#,
            params![topic_id],
            |row| row.get(0),
        );

        match course_id {
            Ok(id) => Ok(id),
            Err(rusqlite::Error::QueryReturnedNoRows) => Err(LmsError::not_found("Topic", topic_id)),
            Err(e) => Err(e.into()),
        }
    }

    pub fn create_topic(
        &self,
        author_id: i64,
        course_id: i64,
        title: &str,
        content: &str,
        tags: &[String],
    ) -> Result<i64> {
        self.require_participant(author_id, course_id)?;
        if title.trim().is_empty() || content.trim().is_empty() {
            return Err(LmsError::invalid("a topic needs a title and content"));
        }
        let forum = self.forum_for_course(course_id)?;

        self.in_transaction(|db| {
            let now = timestamp();
            db.conn.execute(
                r#"
                INSERT INTO forum_topics (forum_id, title, content, author_id, created_at, updated_at)
                VALUES (?1, ?2, ?3, ?4, ?5, ?5)
                "#,
                params![forum.id, title.trim(), content, author_id, now],
            )?;
            let topic_id = db.conn.last_insert_rowid();

            for tag in tags.iter().map(|t| t.trim()).filter(|t| !t.is_empty()) {
                let tag_id = db.get_or_create_tag(tag)?;
                db.conn.execute(
                    "INSERT OR IGNORE INTO topic_taggings (topic_id, tag_id) VALUES (?1, ?2)",
                    params![topic_id, tag_id],
                )?;
            }

            db.record_event(
                EventKind::ForumActivity,
                Some(course_id),
                Some(author_id),
                1.0,
                json!({ "topic_id": topic_id, "action": "topic" }),
            )?;
            info!(topic_id, course_id, author_id, "Created topic");
            Ok(topic_id)
        })
    }

    pub fn get_topic(&self, id: i64) -> Result<Option<ForumTopic>> {
        let topic = self.conn.query_row(
            &format!("{} WHERE t.id = ?1", topic_select()),
            params![id],
            topic_from_row,
        );

        match topic {
            Ok(mut t) => {
                t.tags = self.topic_tags(id)?;
                Ok(Some(t))
            }
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Pinned topics first, then newest first.
    pub fn list_topics(&self, course_id: i64) -> Result<Vec<ForumTopic>> {
        let forum = self.forum_for_course(course_id)?;
        let mut topics = {
            let mut stmt = self.conn.prepare(&format!(
                "{} WHERE t.forum_id = ?1 ORDER BY t.is_pinned DESC, t.created_at DESC, t.id DESC",
                topic_select()
            ))?;
            let rows = stmt.query_map(params![forum.id], topic_from_row)?;
            rows.collect::<rusqlite::Result<Vec<_>>>()?
        };

        for topic in &mut topics {
            topic.tags = self.topic_tags(topic.id)?;
        }
        Ok(topics)
    }

    pub fn add_post(&self, author_id: i64, topic_id: i64, content: &str) -> Result<i64> {
        let topic = self
            .get_topic(topic_id)?
            .ok_or_else(|| LmsError::not_found("Topic", topic_id))?;
        let course_id = self.topic_course_id(topic_id)?;
        self.require_participant(author_id, course_id)?;

        if topic.is_closed {
            warn!(topic_id, author_id, "Post to closed topic");
            return Err(LmsError::TopicClosed(topic_id));
        }
        if content.trim().is_empty() {
            return Err(LmsError::invalid("post content must not be empty"));
        }

        self.in_transaction(|db| {
            let now = timestamp();
            db.conn.execute(
                r#"
                INSERT INTO forum_posts (topic_id, content, author_id, created_at, updated_at)
                VALUES (?1, ?2, ?3, ?4, ?4)
                "#,
                params![topic_id, content, author_id, now],
            )?;
            let post_id = db.conn.last_insert_rowid();
            db.conn.execute(
                "UPDATE forum_topics SET updated_at = ?1 WHERE id = ?2",
                params![now, topic_id],
            )?;

            if topic.author_id != author_id {
                let replier = db.require_user(author_id)?;
                db.notify(
                    topic.author_id,
                    NotificationKind::ForumPost,
                    "New reply",
                    &format!("{} replied to \"{}\".", replier.display_name(), topic.title),
                    Some(course_id),
                )?;
            }
            db.record_event(
                EventKind::ForumActivity,
                Some(course_id),
                Some(author_id),
                1.0,
                json!({ "topic_id": topic_id, "post_id": post_id, "action": "post" }),
            )?;
            debug!(post_id, topic_id, "Added post");
            Ok(post_id)
        })
    }

    /// Posts of a topic, oldest first.
    pub fn list_posts(&self, topic_id: i64) -> Result<Vec<Post>> {
        let mut stmt = self.conn.prepare(&format!(
            r#"
            SELECT p.id, p.topic_id, p.content, p.author_id, {}, p.created_at, p.updated_at, p.is_edited
            FROM forum_posts p
            JOIN users u ON u.id = p.author_id
            WHERE p.topic_id = ?1
            ORDER BY p.created_at, p.id
            "#,
            display_name_sql("u")
        ))?;
        let rows = stmt.query_map(params![topic_id], post_from_row)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    pub fn edit_post(&self, author_id: i64, post_id: i64, content: &str) -> Result<()> {
        let owner = self.conn.query_row(
            "SELECT author_id FROM forum_posts WHERE id = ?1",
            params![post_id],
            |row| row.get::<_, i64>(0),
        );
        match owner {
            Ok(owner) if owner == author_id => {}
            Ok(_) => {
                return Err(LmsError::PermissionDenied(format!(
                    "post {post_id} belongs to someone else"
                )))
            }
            Err(rusqlite::Error::QueryReturnedNoRows) => {
                return Err(LmsError::not_found("Post", post_id))
            }
            Err(e) => return Err(e.into()),
        }
        if content.trim().is_empty() {
            return Err(LmsError::invalid("post content must not be empty"));
        }

        self.conn.execute(
            "UPDATE forum_posts SET content = ?1, updated_at = ?2, is_edited = 1 WHERE id = ?3",
            params![content, timestamp(), post_id],
        )?;
        Ok(())
    }

    fn moderate(&self, actor_id: i64, topic_id: i64, column: &str, value: bool) -> Result<()> {
        let course_id = self.topic_course_id(topic_id)?;
        self.require_course_staff(actor_id, course_id)?;
        self.conn.execute(
            &format!("UPDATE forum_topics SET {column} = ?1 WHERE id = ?2"),
            params![value, topic_id],
        )?;
        info!(topic_id, column, value, "Moderated topic");
        Ok(())
    }

    pub fn set_pinned(&self, actor_id: i64, topic_id: i64, pinned: bool) -> Result<()> {
        self.moderate(actor_id, topic_id, "is_pinned", pinned)
    }

    pub fn set_closed(&self, actor_id: i64, topic_id: i64, closed: bool) -> Result<()> {
        self.moderate(actor_id, topic_id, "is_closed", closed)
    }

    // Tag operations
    fn get_or_create_tag(&self, name: &str) -> Result<i64> {
        let existing = self.conn.query_row(
            "SELECT id FROM topic_tags WHERE name = ?1",
            params![name],
            |row| row.get(0),
        );

        match existing {
            Ok(id) => Ok(id),
            Err(rusqlite::Error::QueryReturnedNoRows) => {
                self.conn.execute(
                    "INSERT INTO topic_tags (name, color) VALUES (?1, ?2)",
                    params![name, DEFAULT_TAG_COLOR],
                )?;
                Ok(self.conn.last_insert_rowid())
            }
            Err(e) => Err(e.into()),
        }
    }

    pub fn set_tag_color(&self, name: &str, color: &str) -> Result<()> {
        if !is_hex_color(color) {
            return Err(LmsError::invalid(format!("'{color}' is not a #rrggbb colour")));
        }
        let tag_id = self.get_or_create_tag(name.trim())?;
        self.conn.execute(
            "UPDATE topic_tags SET color = ?1 WHERE id = ?2",
            params![color, tag_id],
        )?;
        Ok(())
    }

    fn topic_tags(&self, topic_id: i64) -> Result<Vec<String>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT tg.name
            FROM topic_tags tg
            JOIN topic_taggings tt ON tg.id = tt.tag_id
            WHERE tt.topic_id = ?1
            ORDER BY tg.name
            "#,
        )?;

        let rows = stmt.query_map(params![topic_id], |row| row.get(0))?;
        Ok(rows.collect::<rusqlite::Result<Vec<String>>>()?)
    }

    pub fn list_tags(&self) -> Result<Vec<TopicTag>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, name, color FROM topic_tags ORDER BY name")?;
        let rows = stmt.query_map([], |row| {
            Ok(TopicTag {
                id: row.get(0)?,
                name: row.get(1)?,
                color: row.get(2)?,
            })
        })?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }
}

#[cfg(test)]
mod tests {
    use crate::db::testing::{setup_db, Fixture};
    use crate::error::LmsError;
    use crate::models::NotificationKind;

    fn tags(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    mod topic_tests {
        use super::*;

        #[test]
        fn forum_is_created_lazily_once() {
            let db = setup_db();
            let fx = Fixture::new(&db);
            let first = db.forum_for_course(fx.course_id).unwrap();
            let second = db.forum_for_course(fx.course_id).unwrap();
            assert_eq!(first.id, second.id);
            assert_eq!(first.title, "Course Forum");
        }

        #[test]
        fn create_topic_with_tags() {
            let db = setup_db();
            let (fx, _) = Fixture::enrolled(&db);
            let id = db
                .create_topic(fx.student_id, fx.course_id, "Help", "Borrow checker", &tags(&["help", "borrowck"]))
                .unwrap();

            let topic = db.get_topic(id).unwrap().unwrap();
            assert_eq!(topic.author_name, "Alice Liddell");
            assert_eq!(topic.tags, tags(&["borrowck", "help"]));
            assert_eq!(topic.post_count, 0);

            let all = db.list_tags().unwrap();
            assert_eq!(all.len(), 2);
            assert_eq!(all[0].color, "#007bff");
        }

        #[test]
        fn outsiders_cannot_post_topics() {
            let db = setup_db();
            let fx = Fixture::new(&db);
            assert!(matches!(
                db.create_topic(fx.student_id, fx.course_id, "Hi", "there", &[])
                    .unwrap_err(),
                LmsError::PermissionDenied(_)
            ));
            // The instructor does not need an enrollment
            assert!(db
                .create_topic(fx.instructor_id, fx.course_id, "Welcome", "Say hi", &[])
                .is_ok());
        }

        #[test]
        fn pinned_topics_list_first() {
            let db = setup_db();
            let (fx, _) = Fixture::enrolled(&db);
            let old = db
                .create_topic(fx.instructor_id, fx.course_id, "Rules", "Be kind", &[])
                .unwrap();
            let newer = db
                .create_topic(fx.student_id, fx.course_id, "Question", "Why?", &[])
                .unwrap();

            let ids: Vec<i64> = db.list_topics(fx.course_id).unwrap().iter().map(|t| t.id).collect();
            assert_eq!(ids, vec![newer, old]);

            db.set_pinned(fx.instructor_id, old, true).unwrap();
            let ids: Vec<i64> = db.list_topics(fx.course_id).unwrap().iter().map(|t| t.id).collect();
            assert_eq!(ids, vec![old, newer]);
        }

        #[test]
        fn students_cannot_moderate() {
            let db = setup_db();
            let (fx, _) = Fixture::enrolled(&db);
            let id = db
                .create_topic(fx.student_id, fx.course_id, "Q", "?", &[])
                .unwrap();
            assert!(matches!(
                db.set_closed(fx.student_id, id, true).unwrap_err(),
                LmsError::PermissionDenied(_)
            ));
        }

        #[test]
        fn tag_color_validated() {
            let db = setup_db();
            db.set_tag_color("urgent", "#ff0000").unwrap();
            assert_eq!(db.list_tags().unwrap()[0].color, "#ff0000");
            assert!(db.set_tag_color("urgent", "red").is_err());
        }
    }

    mod post_tests {
        use super::*;

        #[test]
        fn posts_are_flat_and_oldest_first() {
            let db = setup_db();
            let (fx, _) = Fixture::enrolled(&db);
            let topic = db
                .create_topic(fx.student_id, fx.course_id, "Q", "?", &[])
                .unwrap();
            let first = db.add_post(fx.instructor_id, topic, "Answer").unwrap();
            let second = db.add_post(fx.student_id, topic, "Thanks").unwrap();

            let posts = db.list_posts(topic).unwrap();
            let ids: Vec<i64> = posts.iter().map(|p| p.id).collect();
            assert_eq!(ids, vec![first, second]);
            assert_eq!(posts[0].author_name, "Grace Hopper");
            assert_eq!(db.get_topic(topic).unwrap().unwrap().post_count, 2);
        }

        #[test]
        fn closed_topic_rejects_posts() {
            let db = setup_db();
            let (fx, _) = Fixture::enrolled(&db);
            let topic = db
                .create_topic(fx.student_id, fx.course_id, "Q", "?", &[])
                .unwrap();
            db.set_closed(fx.instructor_id, topic, true).unwrap();

            assert!(matches!(
                db.add_post(fx.student_id, topic, "more").unwrap_err(),
                LmsError::TopicClosed(id) if id == topic
            ));
        }

        #[test]
        fn reply_notifies_topic_author_only() {
            let db = setup_db();
            let (fx, _) = Fixture::enrolled(&db);
            let topic = db
                .create_topic(fx.student_id, fx.course_id, "Q", "?", &[])
                .unwrap();
            db.add_post(fx.student_id, topic, "bump").unwrap();
            db.add_post(fx.instructor_id, topic, "Answer").unwrap();

            let replies: Vec<_> = db
                .list_notifications(fx.student_id, false)
                .unwrap()
                .into_iter()
                .filter(|n| n.kind == NotificationKind::ForumPost)
                .collect();
            assert_eq!(replies.len(), 1);
            assert!(replies[0].message.starts_with("Grace Hopper replied"));
        }

        #[test]
        fn only_author_edits() {
            let db = setup_db();
            let (fx, _) = Fixture::enrolled(&db);
            let topic = db
                .create_topic(fx.student_id, fx.course_id, "Q", "?", &[])
                .unwrap();
            let post = db.add_post(fx.student_id, topic, "typo").unwrap();

            assert!(matches!(
                db.edit_post(fx.instructor_id, post, "hijack").unwrap_err(),
                LmsError::PermissionDenied(_)
            ));
            db.edit_post(fx.student_id, post, "fixed").unwrap();

            let posts = db.list_posts(topic).unwrap();
            assert_eq!(posts[0].content, "fixed");
            assert!(posts[0].is_edited);
        }
    }
}
