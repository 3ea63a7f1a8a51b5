use chrono::Utc;
use serde_json::json;

use super::{on_off, Ctx};
use crate::cli::{NotifyCommands, PrefsArgs};
use crate::error::Result;
use crate::models::{NotificationPreference, Role};
use crate::text::truncate;

pub fn run(ctx: &Ctx<'_>, cmd: NotifyCommands) -> Result<()> {
    match cmd {
        NotifyCommands::List { unread } => {
            let actor = ctx.actor()?;
            let notes = ctx.db.list_notifications(actor.id, unread)?;
            ctx.emit(&notes, || {
                if notes.is_empty() {
                    println!("No notifications.");
                    return;
                }
                for note in &notes {
                    println!(
                        "{} #{:<4} [{:<18}] {:<30} {}",
                        if note.is_read { " " } else { "*" },
                        note.id,
                        note.kind.label(),
                        truncate(&note.title, 28),
                        note.message
                    );
                }
            })
        }

        NotifyCommands::Read { id } => {
            let actor = ctx.actor()?;
            ctx.db.mark_read(actor.id, id)?;
            ctx.done(&format!("Notification {id} marked as read."))
        }

        NotifyCommands::ReadAll => {
            let actor = ctx.actor()?;
            let count = ctx.db.mark_all_read(actor.id)?;
            ctx.emit(&json!({ "marked": count }), || {
                println!("Marked {count} notifications as read.")
            })
        }

        NotifyCommands::Prefs(args) => {
            let actor = ctx.actor()?;
            let current = ctx.db.get_preferences(actor.id)?;
            let prefs = apply_prefs(current, &args);
            if prefs != current {
                ctx.db.update_preferences(&prefs)?;
            }
            ctx.emit(&prefs, || {
                println!("Email:           {}", on_off(prefs.email_notifications));
                println!("In-app:          {}", on_off(prefs.in_app_notifications));
                println!("Course updates:  {}", on_off(prefs.course_updates));
                println!("Grade updates:   {}", on_off(prefs.grade_updates));
                println!("Forum posts:     {}", on_off(prefs.forum_posts));
                println!("Assignment due:  {}", on_off(prefs.assignment_due));
            })
        }

        NotifyCommands::Due { hours } => {
            let actor = ctx.actor()?;
            ctx.db.require_role(actor.id, &[Role::Admin, Role::Instructor])?;
            let window = hours.unwrap_or(ctx.config.due_window_hours);
            let sent = ctx.db.notify_due_assignments(Utc::now(), window)?;
            ctx.emit(&json!({ "sent": sent, "window_hours": window }), || {
                println!("Sent {sent} reminders for assignments due within {window}h.")
            })
        }
    }
}

fn apply_prefs(current: NotificationPreference, args: &PrefsArgs) -> NotificationPreference {
    NotificationPreference {
        email_notifications: args.email.unwrap_or(current.email_notifications),
        in_app_notifications: args.in_app.unwrap_or(current.in_app_notifications),
        course_updates: args.course_updates.unwrap_or(current.course_updates),
        grade_updates: args.grade_updates.unwrap_or(current.grade_updates),
        forum_posts: args.forum_posts.unwrap_or(current.forum_posts),
        assignment_due: args.assignment_due.unwrap_or(current.assignment_due),
        ..current
    }
}
