use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{List, ListItem, ListState, Paragraph},
    Frame,
};

use crate::text::truncate;
use crate::tui::App;

pub fn draw(f: &mut Frame, app: &App<'_>, area: Rect) {
    let theme = &app.theme;

    let items: Vec<ListItem> = app
        .courses
        .items
        .iter()
        .map(|course| {
            let enrolled = app.enrolled.iter().any(|row| row.course_id == course.id);
            ListItem::new(Line::from(vec![
                Span::styled(
                    format!("{:<36}", truncate(&course.title, 34)),
                    Style::default().fg(theme.text),
                ),
                Span::styled(
                    format!("{:<22}", truncate(&course.instructor_name, 20)),
                    Style::default().fg(theme.accent),
                ),
                Span::styled(
                    format!("{:<16}", truncate(course.category.as_deref().unwrap_or("-"), 14)),
                    Style::default().fg(theme.muted),
                ),
                Span::styled(
                    if enrolled { "enrolled" } else { "" },
                    Style::default().fg(theme.good),
                ),
            ]))
        })
        .collect();

    let header_style = Style::default()
        .fg(theme.muted)
        .add_modifier(Modifier::BOLD);
    let header = [
        Span::styled(format!("{:<36}", "Title"), header_style),
        Span::styled(format!("{:<22}", "Instructor"), header_style),
        Span::styled(format!("{:<16}", "Category"), header_style),
    ];

    let block = theme.block(" Courses ", theme.accent);
    let inner = block.inner(area);
    f.render_widget(block, area);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(1), Constraint::Min(0)])
        .split(inner);

    // Pad the header by the marker width so columns line up with the rows
    let header = Line::from(
        std::iter::once(Span::raw(" ".repeat(theme.marker.chars().count())))
            .chain(header)
            .collect::<Vec<_>>(),
    );
    f.render_widget(Paragraph::new(header), chunks[0]);

    let list = List::new(items)
        .highlight_style(theme.highlight())
        .highlight_symbol(theme.marker);

    let mut state = ListState::default();
    state.select(app.courses.selected);
    f.render_stateful_widget(list, chunks[1], &mut state);
}
