mod a11y;
mod analytics;
mod catalog;
mod certificates;
mod forums;
mod learning;
mod notifications;

use serde::Serialize;
use tracing::debug;

use crate::cli::Commands;
use crate::config::Config;
use crate::db::Database;
use crate::error::{LmsError, Result};
use crate::models::{JsonOutput, Role, User};

/// Everything a command handler needs: the store, the loaded config and
/// the output mode.
pub struct Ctx<'a> {
    pub db: &'a Database,
    pub config: &'a Config,
    pub json: bool,
    pub user: Option<String>,
}

impl Ctx<'_> {
    /// The user named by `--user` or `LMS_USER`.
    pub fn actor(&self) -> Result<User> {
        let username = self
            .user
            .as_deref()
            .or(self.config.acting_user.as_deref())
            .ok_or(LmsError::NoActingUser)?;
        let user = self.db.require_username(username)?;
        debug!(user_id = user.id, username = %user.username, "Acting user");
        Ok(user)
    }

    /// Prints `data` in the JSON envelope, or runs `text` for human output.
    pub fn emit<T: Serialize>(&self, data: &T, text: impl FnOnce()) -> Result<()> {
        if self.json {
            println!("{}", serde_json::to_string(&JsonOutput::ok(data))?);
        } else {
            text();
        }
        Ok(())
    }

    pub fn done(&self, message: &str) -> Result<()> {
        self.emit(&(), || println!("{message}"))
    }
}

pub fn run(ctx: &Ctx<'_>, command: Commands) -> Result<()> {
    match command {
        Commands::Init => {
            ctx.db.init()?;
            ctx.emit(&(), || {
                println!("Database initialized at: {}", ctx.config.db_path.display())
            })
        }
        Commands::Stats => {
            let stats = ctx.db.get_stats()?;
            ctx.emit(&stats, || {
                println!("=== LMS Statistics ===");
                println!("Users: {}", stats.users);
                println!("Active courses: {}", stats.courses);
                println!("Lessons: {}", stats.lessons);
                println!("Enrollments: {}", stats.enrollments);
                println!("Quiz attempts: {}", stats.quiz_attempts);
                println!("Submissions: {}", stats.submissions);
                println!("Certificates: {}", stats.certificates);
                println!("Forum posts: {}", stats.forum_posts);
            })
        }
        Commands::User(cmd) => catalog::users(ctx, cmd),
        Commands::Category(cmd) => catalog::categories(ctx, cmd),
        Commands::Course(cmd) => catalog::courses(ctx, cmd),
        Commands::Enroll { course_id } => learning::enroll(ctx, course_id),
        Commands::Unenroll { course_id } => learning::unenroll(ctx, course_id),
        Commands::Progress { course_id } => learning::progress(ctx, course_id),
        Commands::Complete { lesson_id, undo } => learning::complete(ctx, lesson_id, undo),
        Commands::Quiz(cmd) => learning::quizzes(ctx, cmd),
        Commands::Assignment(cmd) => learning::assignments(ctx, cmd),
        Commands::Grade(cmd) => learning::grades(ctx, cmd),
        Commands::Forum(cmd) => forums::run(ctx, cmd),
        Commands::Cert(cmd) => certificates::run(ctx, cmd),
        Commands::Notify(cmd) => notifications::run(ctx, cmd),
        Commands::Analytics(cmd) => analytics::run(ctx, cmd),
        Commands::A11y(cmd) => a11y::run(ctx, cmd),
        Commands::Tui => {
            let actor = ctx.actor()?;
            crate::tui::run(ctx.db, actor)?;
            Ok(())
        }
    }
}

pub(crate) fn parse_role(raw: &str) -> Result<Role> {
    Role::from_str(raw).ok_or_else(|| {
        LmsError::invalid(format!(
            "Invalid role '{raw}'. Use: student, instructor, or admin"
        ))
    })
}

pub(crate) fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

pub(crate) fn on_off(flag: bool) -> &'static str {
    if flag {
        "on"
    } else {
        "off"
    }
}

/// Text progress bar, `width` cells wide.
pub(crate) fn bar(percentage: f64, width: usize) -> String {
    let filled = ((percentage.clamp(0.0, 100.0) / 100.0) * width as f64).round() as usize;
    format!("[{}{}]", "#".repeat(filled), "-".repeat(width - filled))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::testing::{setup_db, Fixture};

    mod helper_tests {
        use super::*;

        #[test]
        fn split_list_drops_blanks() {
            assert_eq!(split_list("rust, help,,  "), vec!["rust", "help"]);
            assert!(split_list("").is_empty());
        }

        #[test]
        fn bar_fills_proportionally() {
            assert_eq!(bar(0.0, 4), "[----]");
            assert_eq!(bar(50.0, 4), "[##--]");
            assert_eq!(bar(150.0, 4), "[####]");
        }

        #[test]
        fn role_parsing() {
            assert_eq!(parse_role("Instructor").unwrap(), Role::Instructor);
            assert!(matches!(parse_role("dean").unwrap_err(), LmsError::Invalid(_)));
        }
    }

    mod actor_tests {
        use super::*;

        #[test]
        fn flag_takes_precedence_over_config() {
            let db = setup_db();
            let fx = Fixture::new(&db);
            let config = Config {
                acting_user: Some("bob".to_string()),
                ..Config::default()
            };

            let ctx = Ctx {
                db: &db,
                config: &config,
                json: false,
                user: Some("alice".to_string()),
            };
            assert_eq!(ctx.actor().unwrap().id, fx.student_id);

            let ctx = Ctx { user: None, ..ctx };
            assert_eq!(ctx.actor().unwrap().id, fx.other_student_id);
        }

        #[test]
        fn missing_actor() {
            let db = setup_db();
            let config = Config::default();
            let ctx = Ctx {
                db: &db,
                config: &config,
                json: true,
                user: None,
            };
            assert!(matches!(ctx.actor().unwrap_err(), LmsError::NoActingUser));
        }
    }
}
