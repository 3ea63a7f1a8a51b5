use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Gauge, List, ListItem, ListState, Paragraph, Wrap},
    Frame,
};

use crate::text::truncate;
use crate::tui::App;

pub fn draw(f: &mut Frame, app: &App<'_>, area: Rect) {
    let Some(open) = &app.open_course else {
        let empty = Paragraph::new("No course selected")
            .block(app.theme.block(" Course ", app.theme.accent));
        f.render_widget(empty, area);
        return;
    };
    let theme = &app.theme;
    let course = &open.outline.course;

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(5), // Header
            Constraint::Length(3), // Progress
            Constraint::Min(0),    // Lessons
        ])
        .split(area);

    let header = vec![
        Line::from(Span::styled(
            course.title.clone(),
            Style::default().fg(theme.text).add_modifier(Modifier::BOLD),
        )),
        Line::from(vec![
            Span::styled("Instructor: ", Style::default().fg(theme.muted)),
            Span::styled(course.instructor_name.clone(), Style::default().fg(theme.accent)),
        ]),
        Line::from(Span::styled(
            course.description.clone(),
            Style::default().fg(theme.text),
        )),
    ];
    f.render_widget(
        Paragraph::new(header)
            .wrap(Wrap { trim: true })
            .block(theme.block(format!(" Course {} ", course.id), theme.accent)),
        chunks[0],
    );

    match open.progress {
        Some(report) => {
            let gauge = Gauge::default()
                .block(theme.block(" Progress ", theme.good))
                .gauge_style(Style::default().fg(theme.good))
                .ratio((report.percentage / 100.0).clamp(0.0, 1.0))
                .label(format!(
                    "{}/{} lessons ({:.2}%)",
                    report.completed, report.total, report.percentage
                ));
            f.render_widget(gauge, chunks[1]);
        }
        None => {
            let hint = Paragraph::new(Span::styled(
                "Not enrolled. Go back to Courses and press e to enroll.",
                Style::default().fg(theme.warn),
            ))
            .block(theme.block(" Progress ", theme.good));
            f.render_widget(hint, chunks[1]);
        }
    }

    // Rows follow the outline order, which is also the order of `open.lessons`
    let mut items: Vec<ListItem> = Vec::new();
    for module in &open.outline.modules {
        for lesson in &module.lessons {
            let done = open.completed.contains(&lesson.id);
            let (mark, color) = if done {
                ("[x] ", theme.good)
            } else {
                ("[ ] ", theme.muted)
            };
            items.push(ListItem::new(Line::from(vec![
                Span::styled(mark, Style::default().fg(color)),
                Span::styled(
                    format!("{:<24}", truncate(&module.module.title, 22)),
                    Style::default().fg(theme.muted),
                ),
                Span::styled(
                    format!("{:<36}", truncate(&lesson.title, 34)),
                    Style::default().fg(theme.text),
                ),
                Span::styled(
                    lesson.content_type.as_str(),
                    Style::default().fg(theme.accent),
                ),
                Span::styled(
                    lesson
                        .duration_minutes
                        .map(|m| format!(" {m}m"))
                        .unwrap_or_default(),
                    Style::default().fg(theme.muted),
                ),
            ])));
        }
    }

    let list = List::new(items)
        .block(theme.block(
            format!(" Lessons ({} modules) ", open.outline.modules.len()),
            theme.accent,
        ))
        .highlight_style(theme.highlight())
        .highlight_symbol(theme.marker);

    let mut state = ListState::default();
    state.select(open.lessons.selected);
    f.render_stateful_widget(list, chunks[2], &mut state);
}
