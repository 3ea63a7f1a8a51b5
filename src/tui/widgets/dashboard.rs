use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{List, ListItem, Paragraph},
    Frame,
};

use super::{format_date, progress_bar};
use crate::text::truncate;
use crate::tui::App;

pub fn draw(f: &mut Frame, app: &App<'_>, area: Rect) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(7), // Stats + recent notifications row
            Constraint::Min(0),    // Enrolled / taught courses
        ])
        .split(area);

    let top_chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(40), Constraint::Percentage(60)])
        .split(chunks[0]);

    draw_stats(f, app, top_chunks[0]);
    draw_recent_notifications(f, app, top_chunks[1]);
    if app.taught.is_empty() {
        draw_enrolled(f, app, chunks[1]);
    } else {
        draw_taught(f, app, chunks[1]);
    }
}

fn stat_line<'a>(app: &App<'_>, label: &'a str, value: String) -> Line<'a> {
    Line::from(vec![
        Span::styled(label, Style::default().fg(app.theme.muted)),
        Span::styled(
            value,
            Style::default()
                .fg(app.theme.text)
                .add_modifier(Modifier::BOLD),
        ),
    ])
}

fn draw_stats(f: &mut Frame, app: &App<'_>, area: Rect) {
    let stats = &app.stats;
    let text = vec![
        stat_line(app, "Courses: ", stats.courses.to_string()),
        stat_line(app, "Enrollments: ", stats.enrollments.to_string()),
        stat_line(app, "Certificates: ", stats.certificates.to_string()),
        stat_line(
            app,
            "Unread: ",
            if app.unread > 0 {
                format!("{} new", app.unread)
            } else {
                "0".to_string()
            },
        ),
        stat_line(app, "Forum posts: ", stats.forum_posts.to_string()),
    ];

    let paragraph = Paragraph::new(text).block(app.theme.block(" Stats ", app.theme.accent));
    f.render_widget(paragraph, area);
}

fn draw_recent_notifications(f: &mut Frame, app: &App<'_>, area: Rect) {
    let items: Vec<ListItem> = app
        .notifications
        .items
        .iter()
        .take(5)
        .map(|n| {
            let style = if n.is_read {
                Style::default().fg(app.theme.muted)
            } else {
                Style::default()
                    .fg(app.theme.warn)
                    .add_modifier(Modifier::BOLD)
            };
            ListItem::new(Line::from(vec![
                Span::styled(
                    format!("{:<8}", format_date(&n.created_at)),
                    Style::default().fg(app.theme.muted),
                ),
                Span::styled(truncate(&n.title, 40), style),
            ]))
        })
        .collect();

    let list = List::new(items).block(app.theme.block(" Recent Notifications ", app.theme.warn));
    f.render_widget(list, area);
}

fn draw_enrolled(f: &mut Frame, app: &App<'_>, area: Rect) {
    let items: Vec<ListItem> = if app.enrolled.is_empty() {
        vec![ListItem::new(Span::styled(
            "Not enrolled yet. Open the Courses tab and press e to enroll.",
            Style::default().fg(app.theme.muted),
        ))]
    } else {
        app.enrolled
            .iter()
            .map(|row| {
                ListItem::new(Line::from(vec![
                    Span::styled(
                        format!("{:<32}", truncate(&row.course_title, 30)),
                        Style::default().fg(app.theme.text),
                    ),
                    Span::styled(progress_bar(row.progress, 20), Style::default().fg(app.theme.good)),
                    Span::styled(
                        format!(" {:>6.2}%  ", row.progress),
                        Style::default().fg(app.theme.text),
                    ),
                    Span::styled(
                        format!("{:>6.2} {}", row.final_grade, row.letter_grade.as_str()),
                        Style::default()
                            .fg(app.theme.grade_color(row.final_grade))
                            .add_modifier(Modifier::BOLD),
                    ),
                ]))
            })
            .collect()
    };

    let list = List::new(items).block(app.theme.block(" My Courses ", app.theme.good));
    f.render_widget(list, area);
}

fn draw_taught(f: &mut Frame, app: &App<'_>, area: Rect) {
    let items: Vec<ListItem> = app
        .taught
        .iter()
        .map(|course| {
            ListItem::new(Line::from(vec![
                Span::styled(
                    format!("{:<32}", truncate(&course.course_title, 30)),
                    Style::default().fg(app.theme.text),
                ),
                Span::styled(
                    format!("{:>4} students  ", course.enrollments),
                    Style::default().fg(app.theme.accent),
                ),
                Span::styled(
                    progress_bar(course.average_progress, 12),
                    Style::default().fg(app.theme.good),
                ),
                Span::styled(
                    format!(" avg {:>6.2}%  ", course.average_progress),
                    Style::default().fg(app.theme.text),
                ),
                Span::styled(
                    format!("grade {:>6.2}", course.average_final_grade),
                    Style::default().fg(app.theme.grade_color(course.average_final_grade)),
                ),
            ]))
        })
        .collect();

    let list = List::new(items).block(app.theme.block(" Courses I Teach ", app.theme.good));
    f.render_widget(list, area);
}
