use serde_json::json;

use super::Ctx;
use crate::cli::{AnalyticsCommands, WidgetCommands};
use crate::error::{LmsError, Result};
use crate::models::{EventKind, ReportKind, Role, WidgetKind};
use crate::text::truncate;

fn parse_report_kind(raw: &str) -> Result<ReportKind> {
    ReportKind::from_str(raw)
        .ok_or_else(|| LmsError::invalid(format!("Invalid report kind '{raw}'")))
}

pub fn run(ctx: &Ctx<'_>, cmd: AnalyticsCommands) -> Result<()> {
    match cmd {
        AnalyticsCommands::Course { course_id } => {
            let actor = ctx.actor()?;
            ctx.db.require_course_staff(actor.id, course_id)?;
            let stats = ctx.db.course_analytics(course_id)?;
            ctx.emit(&stats, || {
                println!("=== {} ===", stats.course_title);
                println!("Enrollments: {}", stats.enrollments);
                println!("Average progress: {:.2}%", stats.average_progress);
                println!("Average final grade: {:.2}", stats.average_final_grade);
                println!("Completions: {}", stats.completions);
                println!("Certificates: {}", stats.certificates);
                println!("Quiz attempts: {}", stats.quiz_attempts);
                println!("Submissions: {}", stats.submissions);
                let letters: Vec<String> = stats
                    .letter_distribution
                    .iter()
                    .map(|(letter, n)| format!("{letter}:{n}"))
                    .collect();
                println!("Letter grades: {}", letters.join(" "));
            })
        }

        AnalyticsCommands::Student { username } => {
            let actor = ctx.actor()?;
            let student = match username {
                Some(name) if name != actor.username => {
                    ctx.db.require_role(actor.id, &[Role::Admin, Role::Instructor])?;
                    ctx.db.require_username(&name)?
                }
                _ => actor,
            };
            let stats = ctx.db.student_analytics(student.id)?;
            ctx.emit(&stats, || {
                println!("=== {} ===", stats.student_name);
                for course in &stats.courses {
                    println!(
                        "{:<35} {:>7.2}% {:>7.2} {}",
                        truncate(&course.course_title, 33),
                        course.progress,
                        course.final_grade,
                        course.letter_grade.as_str()
                    );
                }
                println!("Quiz attempts: {}", stats.quiz_attempts);
                println!("Submissions: {}", stats.submissions);
                println!("Certificates: {}", stats.certificates);
                println!("Events: {}", stats.events);
            })
        }

        AnalyticsCommands::Events {
            kind,
            course,
            limit,
        } => {
            let actor = ctx.actor()?;
            ctx.db.require_role(actor.id, &[Role::Admin, Role::Instructor])?;
            let kind = kind
                .as_deref()
                .map(|k| {
                    EventKind::from_str(k)
                        .ok_or_else(|| LmsError::invalid(format!("Invalid event kind '{k}'")))
                })
                .transpose()?;
            let events = ctx.db.list_events(kind, course, limit)?;
            ctx.emit(&events, || {
                if events.is_empty() {
                    println!("No events recorded.");
                    return;
                }
                for event in &events {
                    println!(
                        "{:<6} {:<22} course={:<5} user={:<5} {}",
                        event.id,
                        event.kind.as_str(),
                        event.course_id.map(|c| c.to_string()).unwrap_or_else(|| "-".into()),
                        event.user_id.map(|u| u.to_string()).unwrap_or_else(|| "-".into()),
                        event.recorded_at
                    );
                }
            })
        }

        AnalyticsCommands::Top { limit } => {
            let top = ctx.db.most_active_users(limit)?;
            let data: Vec<_> = top
                .iter()
                .map(|(name, events)| json!({ "username": name, "events": events }))
                .collect();
            ctx.emit(&data, || {
                for (rank, (name, events)) in top.iter().enumerate() {
                    println!("{:>3}. {:<20} {}", rank + 1, name, events);
                }
            })
        }

        AnalyticsCommands::Report { kind, title } => {
            let actor = ctx.actor()?;
            let kind = parse_report_kind(&kind)?;
            let report = ctx.db.generate_report(actor.id, kind, title.as_deref())?;
            ctx.emit(&report, || {
                println!("Generated '{}' (report {}).", report.title, report.id);
                println!("View it with: lms analytics show-report {}", report.id);
            })
        }

        AnalyticsCommands::Reports { kind } => {
            let kind = kind.as_deref().map(parse_report_kind).transpose()?;
            let reports = ctx.db.list_reports(kind)?;
            ctx.emit(&reports, || {
                if reports.is_empty() {
                    println!("No reports.");
                    return;
                }
                for report in &reports {
                    println!(
                        "{:<5} {:<22} {:<35} {}",
                        report.id,
                        report.kind.label(),
                        truncate(&report.title, 33),
                        report.generated_at
                    );
                }
            })
        }

        AnalyticsCommands::ShowReport { id } => {
            let report = ctx
                .db
                .get_report(id)?
                .ok_or_else(|| LmsError::not_found("Report", id))?;
            let pretty = serde_json::to_string_pretty(&report.data)?;
            ctx.emit(&report, || {
                println!("{} ({})", report.title, report.kind.label());
                println!("Generated {} by user {}", report.generated_at, report.generated_by);
                println!("{pretty}");
            })
        }

        AnalyticsCommands::Widget(cmd) => widgets(ctx, cmd),
    }
}

fn widgets(ctx: &Ctx<'_>, cmd: WidgetCommands) -> Result<()> {
    let actor = ctx.actor()?;
    match cmd {
        WidgetCommands::Add { kind, position } => {
            let kind = WidgetKind::from_str(&kind)
                .ok_or_else(|| LmsError::invalid(format!("Invalid widget kind '{kind}'")))?;
            let id = ctx.db.add_widget(actor.id, kind, position, json!({}))?;
            ctx.emit(&json!({ "id": id }), || {
                println!("Added {} widget with ID: {}", kind.as_str(), id)
            })
        }
        WidgetCommands::List => {
            let widgets = ctx.db.list_widgets(actor.id)?;
            ctx.emit(&widgets, || {
                if widgets.is_empty() {
                    println!("No widgets.");
                }
                for w in &widgets {
                    println!("{:<5} {:>3} {}", w.id, w.position, w.kind.as_str());
                }
            })
        }
        WidgetCommands::Remove { id } => {
            if !ctx.db.remove_widget(actor.id, id)? {
                return Err(LmsError::not_found("Widget", id));
            }
            ctx.done(&format!("Widget {id} removed."))
        }
    }
}
