use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Tabs},
    Frame,
};

use super::widgets::{course_detail, courses, dashboard, notifications};
use super::{App, View};
use crate::models::AccessibilitySettings;

/// Palette and focus marker derived from the user's accessibility settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Theme {
    pub high_contrast: bool,
    pub text: Color,
    pub muted: Color,
    pub accent: Color,
    pub good: Color,
    pub warn: Color,
    pub bad: Color,
    pub bar: Color,
    pub marker: &'static str,
}

impl Theme {
    pub fn from_settings(settings: &AccessibilitySettings) -> Self {
        let marker = if settings.focus_indicator_enabled {
            "> "
        } else {
            "  "
        };

        if settings.high_contrast_mode {
            Self {
                high_contrast: true,
                text: Color::White,
                muted: Color::White,
                accent: Color::Yellow,
                good: Color::LightGreen,
                warn: Color::LightYellow,
                bad: Color::LightRed,
                bar: Color::Black,
                marker,
            }
        } else {
            Self {
                high_contrast: false,
                text: Color::White,
                muted: Color::DarkGray,
                accent: Color::Cyan,
                good: Color::Green,
                warn: Color::Yellow,
                bad: Color::Red,
                bar: Color::DarkGray,
                marker,
            }
        }
    }

    pub fn highlight(&self) -> Style {
        if self.high_contrast {
            Style::default()
                .bg(Color::White)
                .fg(Color::Black)
                .add_modifier(Modifier::BOLD)
        } else {
            Style::default()
                .bg(Color::DarkGray)
                .add_modifier(Modifier::BOLD)
        }
    }

    pub fn block<'a>(&self, title: impl Into<Line<'a>>, color: Color) -> Block<'a> {
        let title_color = if self.high_contrast { self.accent } else { color };
        let title: Line<'a> = title.into();
        Block::default()
            .borders(Borders::ALL)
            .title(title)
            .title_style(Style::default().fg(title_color))
    }

    pub fn grade_color(&self, percentage: f64) -> Color {
        if percentage >= 80.0 {
            self.good
        } else if percentage >= 60.0 {
            self.warn
        } else {
            self.bad
        }
    }
}

pub fn draw(f: &mut Frame, app: &App<'_>) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Tab bar
            Constraint::Min(0),    // Content
            Constraint::Length(1), // Help bar
        ])
        .split(f.area());

    draw_tabs(f, app, chunks[0]);
    draw_content(f, app, chunks[1]);
    draw_help_bar(f, app, chunks[2]);
}

fn draw_tabs(f: &mut Frame, app: &App<'_>, area: Rect) {
    let notifications = if app.unread > 0 {
        format!("Notifications ({})", app.unread)
    } else {
        "Notifications".to_string()
    };
    let tab_titles = vec!["Dashboard".to_string(), "Courses".to_string(), notifications];
    let selected = match app.view {
        View::Dashboard => 0,
        View::Courses | View::CourseDetail => 1,
        View::Notifications => 2,
    };

    let title = format!(
        " LMS - {} ({}) ",
        app.user.display_name(),
        app.user.role.label()
    );
    let tabs = Tabs::new(tab_titles)
        .block(Block::default().borders(Borders::ALL).title(title))
        .select(selected)
        .style(Style::default().fg(app.theme.text))
        .highlight_style(
            Style::default()
                .fg(app.theme.warn)
                .add_modifier(Modifier::BOLD | Modifier::UNDERLINED),
        );

    f.render_widget(tabs, area);
}

fn draw_content(f: &mut Frame, app: &App<'_>, area: Rect) {
    match app.view {
        View::Dashboard => dashboard::draw(f, app, area),
        View::Courses => courses::draw(f, app, area),
        View::CourseDetail => course_detail::draw(f, app, area),
        View::Notifications => notifications::draw(f, app, area),
    }
}

fn draw_help_bar(f: &mut Frame, app: &App<'_>, area: Rect) {
    let key = Style::default().fg(app.theme.accent);

    let help_text = if let Some(status) = &app.status {
        vec![Span::styled(
            status.clone(),
            Style::default()
                .fg(app.theme.warn)
                .add_modifier(Modifier::BOLD),
        )]
    } else {
        let mut spans = vec![Span::styled("h/l", key), Span::raw(" Views  ")];

        match app.view {
            View::Dashboard => {
                spans.extend(vec![Span::styled("^r", key), Span::raw(" Refresh  ")]);
            }
            View::Courses => {
                spans.extend(vec![
                    Span::styled("j/k", key),
                    Span::raw(" Nav  "),
                    Span::styled("l/<CR>", key),
                    Span::raw(" Open  "),
                    Span::styled("e", key),
                    Span::raw(" Enroll  "),
                ]);
            }
            View::CourseDetail => {
                spans.extend(vec![
                    Span::styled("j/k", key),
                    Span::raw(" Nav  "),
                    Span::styled("c", key),
                    Span::raw(" Complete  "),
                    Span::styled("h/<Esc>", key),
                    Span::raw(" Back  "),
                ]);
            }
            View::Notifications => {
                spans.extend(vec![
                    Span::styled("j/k", key),
                    Span::raw(" Nav  "),
                    Span::styled("m", key),
                    Span::raw(" Read  "),
                    Span::styled("M", key),
                    Span::raw(" Read all  "),
                ]);
            }
        }

        spans.extend(vec![Span::styled("q", key), Span::raw(" Quit")]);
        spans
    };

    let help = Paragraph::new(Line::from(help_text)).style(Style::default().bg(app.theme.bar));
    f.render_widget(help, area);
}
