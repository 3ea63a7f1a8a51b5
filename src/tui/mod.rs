mod ui;
mod widgets;

use std::collections::BTreeSet;
use std::io;
use std::time::Duration;

use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use tracing::debug;

use crate::db::{CourseAnalytics, Database, Stats};
use crate::error::Result;
use crate::models::{
    Course, CourseOutline, GradebookRow, Lesson, Notification, ProgressReport, Role, User,
};

use ui::Theme;

/// Key map of the terminal UI, also listed by `lms a11y shortcuts`.
pub const KEY_BINDINGS: &[(&str, &str)] = &[
    ("q", "Quit"),
    ("h / Left", "Previous view, or back from a course"),
    ("l / Right", "Next view, or open the selected course"),
    ("Tab", "Next view"),
    ("Shift+Tab", "Previous view"),
    ("j / Down", "Move down"),
    ("k / Up", "Move up"),
    ("g / G", "Jump to top / bottom"),
    ("Enter", "Open the selected course"),
    ("Esc", "Back"),
    ("e", "Enroll in the selected course"),
    ("c", "Toggle completion of the selected lesson"),
    ("m", "Mark the selected notification as read"),
    ("M", "Mark all notifications as read"),
    ("Ctrl+r", "Refresh"),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Motion {
    Next,
    Previous,
    First,
    Last,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum View {
    Dashboard,
    Courses,
    CourseDetail,
    Notifications,
}

impl View {
    fn next(&self) -> Self {
        match self {
            View::Dashboard => View::Courses,
            View::Courses => View::Notifications,
            View::CourseDetail => View::Courses,
            View::Notifications => View::Dashboard,
        }
    }

    fn prev(&self) -> Self {
        match self {
            View::Dashboard => View::Notifications,
            View::Courses => View::Dashboard,
            View::CourseDetail => View::Courses,
            View::Notifications => View::Courses,
        }
    }
}

pub struct StatefulList<T> {
    pub items: Vec<T>,
    pub selected: Option<usize>,
}

impl<T> StatefulList<T> {
    fn with_items(items: Vec<T>) -> Self {
        let selected = if items.is_empty() { None } else { Some(0) };
        Self { items, selected }
    }

    /// Replaces the items, keeping the cursor where it was when possible.
    fn replace(&mut self, items: Vec<T>) {
        let selected = match (self.selected, items.len()) {
            (_, 0) => None,
            (Some(i), len) => Some(i.min(len - 1)),
            (None, _) => Some(0),
        };
        self.items = items;
        self.selected = selected;
    }

    fn next(&mut self) {
        if self.items.is_empty() {
            return;
        }
        let i = match self.selected {
            Some(i) if i + 1 < self.items.len() => i + 1,
            _ => 0,
        };
        self.selected = Some(i);
    }

    fn previous(&mut self) {
        if self.items.is_empty() {
            return;
        }
        let i = match self.selected {
            Some(0) | None => self.items.len() - 1,
            Some(i) => i - 1,
        };
        self.selected = Some(i);
    }

    fn first(&mut self) {
        if !self.items.is_empty() {
            self.selected = Some(0);
        }
    }

    fn last(&mut self) {
        if !self.items.is_empty() {
            self.selected = Some(self.items.len() - 1);
        }
    }

    fn apply(&mut self, motion: Motion) {
        match motion {
            Motion::Next => self.next(),
            Motion::Previous => self.previous(),
            Motion::First => self.first(),
            Motion::Last => self.last(),
        }
    }

    fn selected_item(&self) -> Option<&T> {
        self.selected.and_then(|i| self.items.get(i))
    }
}

/// The course opened in the detail view.
pub struct OpenCourse {
    pub outline: CourseOutline,
    pub lessons: StatefulList<Lesson>,
    pub enrollment_id: Option<i64>,
    pub completed: BTreeSet<i64>,
    pub progress: Option<ProgressReport>,
}

pub struct App<'a> {
    db: &'a Database,
    pub user: User,
    pub theme: Theme,
    pub view: View,
    pub stats: Stats,
    pub enrolled: Vec<GradebookRow>,
    pub taught: Vec<CourseAnalytics>,
    pub courses: StatefulList<Course>,
    pub open_course: Option<OpenCourse>,
    pub notifications: StatefulList<Notification>,
    pub unread: i64,
    pub status: Option<String>,
    pub should_quit: bool,
}

impl<'a> App<'a> {
    pub fn new(db: &'a Database, user: User) -> Result<Self> {
        let settings = db.get_settings(user.id)?;
        let mut app = Self {
            db,
            theme: Theme::from_settings(&settings),
            user,
            view: View::Dashboard,
            stats: Stats::default(),
            enrolled: Vec::new(),
            taught: Vec::new(),
            courses: StatefulList::with_items(Vec::new()),
            open_course: None,
            notifications: StatefulList::with_items(Vec::new()),
            unread: 0,
            status: None,
            should_quit: false,
        };
        app.refresh_data()?;
        Ok(app)
    }

    pub fn refresh_data(&mut self) -> Result<()> {
        self.stats = self.db.get_stats()?;
        self.enrolled = self.db.student_gradebook(self.user.id)?;
        self.taught = if self.user.role == Role::Student {
            Vec::new()
        } else {
            self.db
                .list_courses_taught(self.user.id)?
                .iter()
                .map(|c| self.db.course_analytics(c.id))
                .collect::<Result<Vec<_>>>()?
        };
        self.courses.replace(self.db.list_courses(false, None)?);
        self.notifications
            .replace(self.db.list_notifications(self.user.id, false)?);
        self.unread = self.db.unread_count(self.user.id)?;
        if let Some(course_id) = self.open_course.as_ref().map(|c| c.outline.course.id) {
            self.load_course(course_id)?;
        }
        Ok(())
    }

    fn load_course(&mut self, course_id: i64) -> Result<()> {
        let outline = self.db.course_outline(course_id)?;
        let enrollment = self.db.find_enrollment(self.user.id, course_id)?;
        let (completed, progress) = match &enrollment {
            Some(e) => (
                self.db.completed_lesson_ids(e.id)?.into_iter().collect(),
                Some(self.db.progress(e.id)?),
            ),
            None => (BTreeSet::new(), None),
        };
        let lessons: Vec<Lesson> = outline
            .modules
            .iter()
            .flat_map(|m| m.lessons.iter().cloned())
            .collect();

        let mut list = StatefulList::with_items(Vec::new());
        list.selected = self
            .open_course
            .as_ref()
            .filter(|c| c.outline.course.id == course_id)
            .and_then(|c| c.lessons.selected);
        list.replace(lessons);

        self.open_course = Some(OpenCourse {
            outline,
            lessons: list,
            enrollment_id: enrollment.map(|e| e.id),
            completed,
            progress,
        });
        Ok(())
    }

    fn open_selected_course(&mut self) -> Result<()> {
        if let Some(course_id) = self.courses.selected_item().map(|c| c.id) {
            self.open_course = None;
            self.load_course(course_id)?;
            self.view = View::CourseDetail;
        }
        Ok(())
    }

    fn enroll_selected(&mut self) -> Result<()> {
        let Some(course) = self.courses.selected_item() else {
            return Ok(());
        };
        let title = course.title.clone();
        self.db.enroll(self.user.id, course.id)?;
        self.status = Some(format!("Enrolled in {title}"));
        self.refresh_data()
    }

    fn toggle_lesson(&mut self) -> Result<()> {
        let Some(open) = &self.open_course else {
            return Ok(());
        };
        let Some(lesson_id) = open.lessons.selected_item().map(|l| l.id) else {
            return Ok(());
        };

        let report = if open.completed.contains(&lesson_id) {
            self.db.uncomplete_lesson(self.user.id, lesson_id)?
        } else {
            self.db.complete_lesson(self.user.id, lesson_id)?
        };
        self.status = Some(if report.is_complete() {
            "Course complete! Claim your certificate with `lms cert claim`".to_string()
        } else {
            format!("Progress {:.2}%", report.percentage)
        });
        self.refresh_data()
    }

    fn mark_selected_read(&mut self) -> Result<()> {
        if let Some(id) = self
            .notifications
            .selected_item()
            .filter(|n| !n.is_read)
            .map(|n| n.id)
        {
            self.db.mark_read(self.user.id, id)?;
            self.refresh_data()?;
        }
        Ok(())
    }

    fn mark_all_read(&mut self) -> Result<()> {
        let count = self.db.mark_all_read(self.user.id)?;
        self.status = Some(format!("Marked {count} notifications as read"));
        self.refresh_data()
    }

    fn back(&mut self) {
        if self.view == View::CourseDetail {
            self.view = View::Courses;
            self.open_course = None;
        } else {
            self.view = self.view.prev();
        }
    }

    fn move_cursor(&mut self, motion: Motion) {
        match self.view {
            View::Courses => self.courses.apply(motion),
            View::CourseDetail => {
                if let Some(open) = self.open_course.as_mut() {
                    open.lessons.apply(motion);
                }
            }
            View::Notifications => self.notifications.apply(motion),
            View::Dashboard => {}
        }
    }

    /// Applies one key press. Domain errors end up in the status line.
    pub fn handle_key(&mut self, key: KeyCode, modifiers: KeyModifiers) -> Result<()> {
        let result = self.dispatch_key(key, modifiers);
        match result {
            Ok(()) => Ok(()),
            Err(crate::error::LmsError::Database(e)) => Err(e.into()),
            Err(e) => {
                debug!(error = %e, "TUI action rejected");
                self.status = Some(e.to_string());
                Ok(())
            }
        }
    }

    fn dispatch_key(&mut self, key: KeyCode, modifiers: KeyModifiers) -> Result<()> {
        self.status = None;

        match key {
            KeyCode::Char('q') => self.should_quit = true,

            KeyCode::Char('r') if modifiers.contains(KeyModifiers::CONTROL) => {
                self.refresh_data()?;
                self.status = Some("Refreshed".to_string());
            }

            KeyCode::Esc => {
                if self.view == View::CourseDetail {
                    self.back();
                }
            }

            KeyCode::Char('h') | KeyCode::Left => self.back(),
            KeyCode::Char('l') | KeyCode::Right => match self.view {
                View::Courses => self.open_selected_course()?,
                View::CourseDetail => {}
                _ => self.view = self.view.next(),
            },

            KeyCode::Tab => {
                self.open_course = None;
                self.view = self.view.next();
            }
            KeyCode::BackTab => {
                self.open_course = None;
                self.view = self.view.prev();
            }

            KeyCode::Char('j') | KeyCode::Down => self.move_cursor(Motion::Next),
            KeyCode::Char('k') | KeyCode::Up => self.move_cursor(Motion::Previous),
            KeyCode::Char('g') => self.move_cursor(Motion::First),
            KeyCode::Char('G') => self.move_cursor(Motion::Last),

            KeyCode::Enter if self.view == View::Courses => self.open_selected_course()?,
            KeyCode::Char('e') if self.view == View::Courses => self.enroll_selected()?,
            KeyCode::Char('c') if self.view == View::CourseDetail => self.toggle_lesson()?,
            KeyCode::Char('m') if self.view == View::Notifications => self.mark_selected_read()?,
            KeyCode::Char('M') if self.view == View::Notifications => self.mark_all_read()?,

            _ => {}
        }
        Ok(())
    }
}

pub fn run(db: &Database, user: User) -> Result<()> {
    let mut app = App::new(db, user)?;

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = run_app(&mut terminal, &mut app);

    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    result
}

fn run_app(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut App<'_>,
) -> Result<()> {
    loop {
        terminal.draw(|f| ui::draw(f, app))?;

        if event::poll(Duration::from_millis(100))? {
            if let Event::Key(key) = event::read()? {
                app.handle_key(key.code, key.modifiers)?;
            }
        }

        if app.should_quit {
            return Ok(());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::testing::{setup_db, Fixture};
    use crate::models::AccessibilityMode;
    use ratatui::backend::TestBackend;

    fn press(app: &mut App<'_>, key: KeyCode) {
        app.handle_key(key, KeyModifiers::NONE).unwrap();
    }

    mod list_tests {
        use super::*;

        #[test]
        fn wraps_in_both_directions() {
            let mut list = StatefulList::with_items(vec![1, 2, 3]);
            list.previous();
            assert_eq!(list.selected, Some(2));
            list.next();
            assert_eq!(list.selected, Some(0));
        }

        #[test]
        fn replace_clamps_selection() {
            let mut list = StatefulList::with_items(vec![1, 2, 3]);
            list.last();
            list.replace(vec![1]);
            assert_eq!(list.selected, Some(0));
            list.replace(Vec::new());
            assert_eq!(list.selected, None);
            list.next();
            assert_eq!(list.selected, None);
        }
    }

    mod app_tests {
        use super::*;

        #[test]
        fn view_cycle() {
            let db = setup_db();
            let fx = Fixture::new(&db);
            let user = db.require_user(fx.student_id).unwrap();
            let mut app = App::new(&db, user).unwrap();

            assert_eq!(app.view, View::Dashboard);
            press(&mut app, KeyCode::Tab);
            assert_eq!(app.view, View::Courses);
            press(&mut app, KeyCode::Tab);
            assert_eq!(app.view, View::Notifications);
            press(&mut app, KeyCode::BackTab);
            assert_eq!(app.view, View::Courses);
            press(&mut app, KeyCode::Char('q'));
            assert!(app.should_quit);
        }

        #[test]
        fn enroll_open_and_complete_lessons() {
            let db = setup_db();
            let fx = Fixture::new(&db);
            let user = db.require_user(fx.student_id).unwrap();
            let mut app = App::new(&db, user).unwrap();

            press(&mut app, KeyCode::Tab);
            press(&mut app, KeyCode::Char('e'));
            assert_eq!(app.enrolled.len(), 1);
            assert!(app.unread >= 1);

            press(&mut app, KeyCode::Enter);
            assert_eq!(app.view, View::CourseDetail);
            for _ in 0..3 {
                press(&mut app, KeyCode::Char('c'));
                press(&mut app, KeyCode::Char('j'));
            }
            let open = app.open_course.as_ref().unwrap();
            assert_eq!(open.completed.len(), 3);
            assert_eq!(open.progress.unwrap().percentage, 100.0);
            assert_eq!(app.enrolled[0].progress, 100.0);

            press(&mut app, KeyCode::Char('c'));
            assert_eq!(app.open_course.as_ref().unwrap().completed.len(), 2);

            press(&mut app, KeyCode::Esc);
            assert_eq!(app.view, View::Courses);
            assert!(app.open_course.is_none());
        }

        #[test]
        fn rejected_action_shows_status() {
            let db = setup_db();
            let fx = Fixture::new(&db);
            let user = db.require_user(fx.student_id).unwrap();
            let mut app = App::new(&db, user).unwrap();

            press(&mut app, KeyCode::Tab);
            press(&mut app, KeyCode::Enter);
            press(&mut app, KeyCode::Char('c'));
            assert_eq!(
                app.status.as_deref(),
                Some(format!("Not enrolled in course {}", fx.course_id).as_str())
            );
        }

        #[test]
        fn mark_notifications_read() {
            let db = setup_db();
            let (fx, _) = Fixture::enrolled(&db);
            let user = db.require_user(fx.student_id).unwrap();
            let mut app = App::new(&db, user).unwrap();
            assert_eq!(app.unread, 1);

            press(&mut app, KeyCode::BackTab);
            assert_eq!(app.view, View::Notifications);
            press(&mut app, KeyCode::Char('m'));
            assert_eq!(app.unread, 0);
            assert!(app.notifications.items[0].is_read);
        }

        #[test]
        fn staff_dashboard_lists_taught_courses() {
            let db = setup_db();
            let (fx, _) = Fixture::enrolled(&db);
            let user = db.require_user(fx.instructor_id).unwrap();
            let app = App::new(&db, user).unwrap();
            assert_eq!(app.taught.len(), 1);
            assert_eq!(app.taught[0].enrollments, 1);
            assert!(app.enrolled.is_empty());
        }
    }

    mod render_tests {
        use super::*;

        fn render(app: &App<'_>) -> String {
            let mut terminal = Terminal::new(TestBackend::new(100, 30)).unwrap();
            terminal.draw(|f| ui::draw(f, app)).unwrap();
            terminal
                .backend()
                .buffer()
                .content
                .iter()
                .map(|cell| cell.symbol())
                .collect::<String>()
        }

        #[test]
        fn every_view_renders() {
            let db = setup_db();
            let (fx, _) = Fixture::enrolled(&db);
            let user = db.require_user(fx.student_id).unwrap();
            let mut app = App::new(&db, user).unwrap();

            assert!(render(&app).contains("Rust 101"));
            press(&mut app, KeyCode::Tab);
            assert!(render(&app).contains("Grace Hopper"));
            press(&mut app, KeyCode::Enter);
            assert!(render(&app).contains("Generics"));
            press(&mut app, KeyCode::Tab);
            press(&mut app, KeyCode::Tab);
            assert!(render(&app).contains("Enrollment confirmed"));
        }

        #[test]
        fn focus_marker_follows_settings() {
            let db = setup_db();
            let fx = Fixture::new(&db);
            db.toggle_mode(fx.student_id, AccessibilityMode::FocusIndicator)
                .unwrap();
            db.toggle_mode(fx.student_id, AccessibilityMode::HighContrast)
                .unwrap();
            let user = db.require_user(fx.student_id).unwrap();
            let app = App::new(&db, user).unwrap();

            assert!(app.theme.high_contrast);
            assert_eq!(app.theme.marker, "  ");
        }
    }
}
