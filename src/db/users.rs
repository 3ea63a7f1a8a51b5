use rusqlite::{params, OptionalExtension, Row};
use tracing::{info, warn};

use super::{is_unique_violation, timestamp, Database};
use crate::error::{LmsError, Result};
use crate::models::{Role, User};

const USER_COLUMNS: &str = "id, username, email, first_name, last_name, role, created_at";

fn user_from_row(row: &Row<'_>) -> rusqlite::Result<User> {
    let role_str: String = row.get(5)?;
    Ok(User {
        id: row.get(0)?,
        username: row.get(1)?,
        email: row.get(2)?,
        first_name: row.get(3)?,
        last_name: row.get(4)?,
        role: Role::from_str(&role_str).unwrap_or(Role::Student),
        created_at: row.get(6)?,
    })
}

impl Database {
    pub fn add_user(
        &self,
        username: &str,
        email: Option<&str>,
        first_name: &str,
        last_name: &str,
        role: Role,
    ) -> Result<i64> {
        let username = username.trim();
        if username.is_empty() {
            return Err(LmsError::invalid("username must not be empty"));
        }

        let inserted = self.conn.execute(
            r#"
            INSERT INTO users (username, email, first_name, last_name, role, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
            params![username, email, first_name, last_name, role.as_str(), timestamp()],
        );

        match inserted {
            Ok(_) => {
                let id = self.conn.last_insert_rowid();
                info!(user_id = id, username, role = role.as_str(), "Registered user");
                Ok(id)
            }
            Err(e) if is_unique_violation(&e) => {
                Err(LmsError::invalid(format!("username '{username}' is taken")))
            }
            Err(e) => Err(e.into()),
        }
    }

    pub fn get_user(&self, id: i64) -> Result<Option<User>> {
        let user = self
            .conn
            .query_row(
                &format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1"),
                params![id],
                user_from_row,
            )
            .optional()?;
        Ok(user)
    }

    pub fn get_user_by_username(&self, username: &str) -> Result<Option<User>> {
        let user = self
            .conn
            .query_row(
                &format!("SELECT {USER_COLUMNS} FROM users WHERE username = ?1"),
                params![username.trim()],
                user_from_row,
            )
            .optional()?;
        Ok(user)
    }

    pub fn require_user(&self, id: i64) -> Result<User> {
        self.get_user(id)?
            .ok_or_else(|| LmsError::not_found("User", id))
    }

    pub fn require_username(&self, username: &str) -> Result<User> {
        self.get_user_by_username(username)?
            .ok_or_else(|| LmsError::not_found("User", username))
    }

    pub fn list_users(&self, role: Option<Role>) -> Result<Vec<User>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE (?1 IS NULL OR role = ?1) ORDER BY username"
        ))?;
        let rows = stmt.query_map(params![role.map(|r| r.as_str())], user_from_row)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    /// Loads the user and checks their role is one of `allowed`.
    pub fn require_role(&self, user_id: i64, allowed: &[Role]) -> Result<User> {
        let user = self.require_user(user_id)?;
        if allowed.contains(&user.role) {
            Ok(user)
        } else {
            let wanted: Vec<&str> = allowed.iter().map(|r| r.as_str()).collect();
            warn!(user_id, role = user.role.as_str(), "Role check failed");
            Err(LmsError::PermissionDenied(format!(
                "{} is a {}, this requires: {}",
                user.username,
                user.role.as_str(),
                wanted.join(" or ")
            )))
        }
    }

    /// Instructor of the course, or any admin.
    pub(crate) fn require_course_staff(&self, user_id: i64, course_id: i64) -> Result<User> {
        let user = self.require_user(user_id)?;
        if user.role == Role::Admin {
            return Ok(user);
        }
        let instructor_id: Option<i64> = self
            .conn
            .query_row(
                "SELECT instructor_id FROM courses WHERE id = ?1",
                params![course_id],
                |row| row.get(0),
            )
            .optional()?;
        match instructor_id {
            None => Err(LmsError::not_found("Course", course_id)),
            Some(id) if id == user_id => Ok(user),
            Some(_) => {
                warn!(user_id, course_id, "Not staff on course");
                Err(LmsError::PermissionDenied(format!(
                    "{} does not teach course {}",
                    user.username, course_id
                )))
            }
        }
    }
}
