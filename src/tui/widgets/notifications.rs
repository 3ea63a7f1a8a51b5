use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{List, ListItem, ListState, Paragraph, Wrap},
    Frame,
};

use super::format_date;
use crate::text::truncate;
use crate::tui::App;

pub fn draw(f: &mut Frame, app: &App<'_>, area: Rect) {
    let theme = &app.theme;
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(0), Constraint::Length(5)])
        .split(area);

    let items: Vec<ListItem> = app
        .notifications
        .items
        .iter()
        .map(|n| {
            let title_style = if n.is_read {
                Style::default().fg(theme.muted)
            } else {
                Style::default().fg(theme.text).add_modifier(Modifier::BOLD)
            };
            ListItem::new(Line::from(vec![
                Span::styled(
                    if n.is_read { "  " } else { "* " },
                    Style::default().fg(theme.warn),
                ),
                Span::styled(
                    format!("{:<8}", format_date(&n.created_at)),
                    Style::default().fg(theme.muted),
                ),
                Span::styled(
                    format!("{:<20}", n.kind.label()),
                    Style::default().fg(theme.accent),
                ),
                Span::styled(truncate(&n.title, 50), title_style),
            ]))
        })
        .collect();

    let title = format!(" Notifications ({} unread) ", app.unread);
    let list = List::new(items)
        .block(theme.block(title, theme.warn))
        .highlight_style(theme.highlight())
        .highlight_symbol(theme.marker);

    let mut state = ListState::default();
    state.select(app.notifications.selected);
    f.render_stateful_widget(list, chunks[0], &mut state);

    let message = app
        .notifications
        .selected_item()
        .map(|n| n.message.clone())
        .unwrap_or_default();
    f.render_widget(
        Paragraph::new(message)
            .wrap(Wrap { trim: true })
            .block(theme.block(" Message ", theme.accent)),
        chunks[1],
    );
}
