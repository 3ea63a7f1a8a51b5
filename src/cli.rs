use clap::{Args, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "lms")]
#[command(about = "A learning-management CLI: courses, quizzes, assignments, grades and certificates")]
#[command(version)]
pub struct Cli {
    /// Output as JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Act as this user (defaults to LMS_USER)
    #[arg(long, short, global = true)]
    pub user: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Initialize the database
    Init,

    /// Show system-wide counts
    Stats,

    /// Manage users
    #[command(subcommand)]
    User(UserCommands),

    /// Manage course categories
    #[command(subcommand)]
    Category(CategoryCommands),

    /// Author and browse courses
    #[command(subcommand)]
    Course(CourseCommands),

    /// Enroll the acting student in a course
    Enroll {
        /// Course ID
        course_id: i64,
    },

    /// Drop a course (removes progress and grades)
    Unenroll {
        /// Course ID
        course_id: i64,
    },

    /// Show progress, for one course or all enrollments
    Progress {
        /// Course ID
        course_id: Option<i64>,
    },

    /// Mark a lesson as completed
    Complete {
        /// Lesson ID
        lesson_id: i64,

        /// Mark as not completed instead
        #[arg(long)]
        undo: bool,
    },

    /// Quizzes and attempts
    #[command(subcommand)]
    Quiz(QuizCommands),

    /// Assignments and submissions
    #[command(subcommand)]
    Assignment(AssignmentCommands),

    /// Grades and gradebooks
    #[command(subcommand)]
    Grade(GradeCommands),

    /// Course discussion forums
    #[command(subcommand)]
    Forum(ForumCommands),

    /// Course completion certificates
    #[command(subcommand)]
    Cert(CertCommands),

    /// Notifications and preferences
    #[command(subcommand)]
    Notify(NotifyCommands),

    /// Events, analytics and reports
    #[command(subcommand)]
    Analytics(AnalyticsCommands),

    /// Accessibility settings
    #[command(subcommand)]
    A11y(A11yCommands),

    /// Launch interactive terminal UI
    Tui,
}

#[derive(Subcommand, Debug)]
pub enum UserCommands {
    /// Register a user
    Add {
        username: String,

        /// student, instructor or admin
        #[arg(long, short, default_value = "student")]
        role: String,

        #[arg(long, short)]
        email: Option<String>,

        #[arg(long, default_value = "")]
        first: String,

        #[arg(long, default_value = "")]
        last: String,
    },

    /// List users
    List {
        /// Filter by role
        #[arg(long, short)]
        role: Option<String>,
    },

    /// Show one user
    Show { username: String },
}

#[derive(Subcommand, Debug)]
pub enum CategoryCommands {
    /// Add a category
    Add {
        name: String,

        #[arg(long, short)]
        description: Option<String>,
    },

    /// List categories with course counts
    List,
}

#[derive(Subcommand, Debug)]
pub enum CourseCommands {
    /// Create a course taught by the acting user
    Add {
        title: String,

        #[arg(long, short, default_value = "")]
        description: String,

        /// Category name (created if missing)
        #[arg(long, short)]
        category: Option<String>,
    },

    /// List courses
    List {
        /// Include inactive courses
        #[arg(long, short)]
        all: bool,

        #[arg(long, short)]
        category: Option<String>,
    },

    /// Show the course outline
    Show { id: i64 },

    /// Courses taught by the acting user
    Taught,

    /// Hide a course from the catalog
    Archive { id: i64 },

    /// Make an archived course active again
    Restore { id: i64 },

    /// Add a module to a course
    Module {
        course_id: i64,
        title: String,

        #[arg(long, short)]
        description: Option<String>,

        #[arg(long, short, default_value_t = 0)]
        order: i32,
    },

    /// Add a lesson to a module
    Lesson(LessonArgs),

    /// List enrolled students
    Students { id: i64 },
}

#[derive(Args, Debug)]
pub struct LessonArgs {
    pub module_id: i64,
    pub title: String,

    /// text, video, pdf, quiz or assignment
    #[arg(long = "type", short = 't', default_value = "text")]
    pub content_type: String,

    #[arg(long, short)]
    pub content: Option<String>,

    #[arg(long)]
    pub video_url: Option<String>,

    #[arg(long)]
    pub file: Option<String>,

    /// Duration in minutes
    #[arg(long)]
    pub duration: Option<i32>,

    #[arg(long, short, default_value_t = 0)]
    pub order: i32,
}

#[derive(Subcommand, Debug)]
pub enum QuizCommands {
    /// Attach a quiz to a lesson
    Add {
        lesson_id: i64,
        title: String,

        #[arg(long, short)]
        description: Option<String>,

        /// Time limit in minutes
        #[arg(long)]
        time_limit: Option<i32>,

        #[arg(long, default_value_t = 1)]
        attempts: i32,

        /// Passing score in percent
        #[arg(long, default_value_t = 70.0)]
        passing: f64,
    },

    /// Add a question to a quiz
    Question {
        quiz_id: i64,
        text: String,

        /// multiple_choice, true_false or short_answer
        #[arg(long = "type", short = 't', default_value = "multiple_choice")]
        question_type: String,

        #[arg(long, short, default_value_t = 1)]
        points: i32,

        #[arg(long, short, default_value_t = 0)]
        order: i32,
    },

    /// Add an answer option to a question
    #[command(name = "option")]
    AddOption {
        question_id: i64,
        text: String,

        #[arg(long)]
        correct: bool,

        #[arg(long, short, default_value_t = 0)]
        order: i32,
    },

    /// List quizzes in a course
    List { course_id: i64 },

    /// Show a quiz with its questions
    Show { quiz_id: i64 },

    /// Submit an attempt: --answer QUESTION=OPTION[,OPTION] or QUESTION=text
    Take {
        quiz_id: i64,

        #[arg(long = "answer", short = 'a')]
        answers: Vec<String>,

        /// Seconds spent on the attempt
        #[arg(long)]
        time: Option<i64>,
    },

    /// List the acting student's attempts
    Attempts { quiz_id: i64 },
}

#[derive(Subcommand, Debug)]
pub enum AssignmentCommands {
    /// Attach an assignment to a lesson
    Add {
        lesson_id: i64,
        title: String,

        /// Due date: RFC 3339, "YYYY-MM-DD HH:MM" or "YYYY-MM-DD"
        #[arg(long)]
        due: String,

        #[arg(long, short, default_value = "")]
        description: String,

        #[arg(long, default_value_t = 100)]
        points: i32,
    },

    /// List assignments in a course
    List { course_id: i64 },

    /// Submit work for an assignment
    Submit {
        assignment_id: i64,

        /// Path to the submitted file
        #[arg(long, short)]
        file: Option<String>,

        /// Inline submission text
        #[arg(long, short)]
        text: Option<String>,
    },

    /// List submissions for an assignment
    Submissions { assignment_id: i64 },

    /// Grade a submission
    Grade {
        submission_id: i64,
        score: f64,

        #[arg(long, short)]
        feedback: Option<String>,
    },
}

#[derive(Subcommand, Debug)]
pub enum GradeCommands {
    /// Record an exam grade for an enrollment
    Record {
        enrollment_id: i64,
        score: f64,
        max_points: f64,
    },

    /// Gradebook: own enrollments, or a whole course with --course
    Book {
        #[arg(long, short)]
        course: Option<i64>,
    },

    /// Grade rows of one enrollment
    List { enrollment_id: i64 },
}

#[derive(Subcommand, Debug)]
pub enum ForumCommands {
    /// List topics in a course forum
    Topics { course_id: i64 },

    /// Start a topic
    New {
        course_id: i64,
        title: String,

        #[arg(long, short)]
        content: String,

        /// Comma-separated tags
        #[arg(long, short)]
        tags: Option<String>,
    },

    /// Show a topic and its posts
    Show { topic_id: i64 },

    /// Reply to a topic
    Reply { topic_id: i64, content: String },

    /// Edit one of your posts
    Edit { post_id: i64, content: String },

    /// Pin a topic
    Pin {
        topic_id: i64,

        #[arg(long)]
        off: bool,
    },

    /// Close a topic to new posts
    Close {
        topic_id: i64,

        #[arg(long)]
        off: bool,
    },

    /// List tags
    Tags,

    /// Set a tag's colour (#rrggbb)
    TagColor { name: String, color: String },
}

#[derive(Subcommand, Debug)]
pub enum CertCommands {
    /// Check eligibility for a course certificate
    Check { course_id: i64 },

    /// Claim the certificate for a completed course
    Claim { course_id: i64 },

    /// List the acting student's certificates
    List,

    /// Render a certificate
    Show { certificate_id: String },

    /// Certificates issued for a course
    Issued { course_id: i64 },

    /// Show or update a course's certificate template
    Template {
        course_id: i64,

        #[arg(long)]
        title: Option<String>,

        /// Body text; {{ student }} and {{ course }} are substituted
        #[arg(long)]
        description: Option<String>,

        #[arg(long)]
        font_size: Option<i32>,

        #[arg(long)]
        color: Option<String>,
    },
}

#[derive(Subcommand, Debug)]
pub enum NotifyCommands {
    /// List notifications
    List {
        #[arg(long)]
        unread: bool,
    },

    /// Mark a notification as read
    Read { id: i64 },

    /// Mark every notification as read
    ReadAll,

    /// Show or change notification preferences
    Prefs(PrefsArgs),

    /// Send reminders for assignments due soon
    Due {
        /// Window in hours (defaults to LMS_DUE_WINDOW_HOURS)
        #[arg(long)]
        hours: Option<i64>,
    },
}

#[derive(Args, Debug, Default)]
pub struct PrefsArgs {
    #[arg(long)]
    pub email: Option<bool>,
    #[arg(long)]
    pub in_app: Option<bool>,
    #[arg(long)]
    pub course_updates: Option<bool>,
    #[arg(long)]
    pub grade_updates: Option<bool>,
    #[arg(long)]
    pub forum_posts: Option<bool>,
    #[arg(long)]
    pub assignment_due: Option<bool>,
}

#[derive(Subcommand, Debug)]
pub enum AnalyticsCommands {
    /// Aggregates for one course
    Course { course_id: i64 },

    /// Aggregates for a student (defaults to the acting user)
    Student { username: Option<String> },

    /// Recent events
    Events {
        #[arg(long, short)]
        kind: Option<String>,

        #[arg(long, short)]
        course: Option<i64>,

        #[arg(long, short, default_value_t = 20)]
        limit: usize,
    },

    /// Most active users by event count
    Top {
        #[arg(long, short, default_value_t = 10)]
        limit: usize,
    },

    /// Generate and store a report
    Report {
        /// course_performance, student_progress, user_engagement,
        /// system_usage, grade_distribution or certificate_issuance
        kind: String,

        #[arg(long, short)]
        title: Option<String>,
    },

    /// List stored reports
    Reports {
        #[arg(long, short)]
        kind: Option<String>,
    },

    /// Show a stored report
    ShowReport { id: i64 },

    /// Dashboard widgets of the acting user
    #[command(subcommand)]
    Widget(WidgetCommands),
}

#[derive(Subcommand, Debug)]
pub enum WidgetCommands {
    Add {
        kind: String,

        #[arg(long, short, default_value_t = 0)]
        position: i32,
    },
    List,
    Remove { id: i64 },
}

#[derive(Subcommand, Debug)]
pub enum A11yCommands {
    /// Show the acting user's settings
    Show,

    /// Change settings
    Set(A11yArgs),

    /// Flip one mode on or off
    Toggle {
        /// high_contrast, large_text, reduced_motion, screen_reader,
        /// keyboard_navigation, focus_indicator or captions
        mode: String,
    },

    /// List keyboard shortcuts of the terminal UI
    Shortcuts,
}

#[derive(Args, Debug, Default)]
pub struct A11yArgs {
    #[arg(long)]
    pub high_contrast: Option<bool>,
    #[arg(long)]
    pub large_text: Option<bool>,
    #[arg(long)]
    pub reduced_motion: Option<bool>,
    #[arg(long)]
    pub screen_reader: Option<bool>,
    #[arg(long)]
    pub keyboard_navigation: Option<bool>,
    #[arg(long)]
    pub focus_indicator: Option<bool>,
    #[arg(long)]
    pub captions: Option<bool>,

    /// 0-100
    #[arg(long)]
    pub volume: Option<i32>,

    /// small, medium, large or x-large
    #[arg(long)]
    pub font_size: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("lms").chain(args.iter().copied())).unwrap()
    }

    mod global_flag_tests {
        use super::*;

        #[test]
        fn parse_init_command() {
            let cli = parse(&["init"]);
            assert!(!cli.json);
            assert!(cli.user.is_none());
            assert!(matches!(cli.command, Commands::Init));
        }

        #[test]
        fn json_and_user_are_global() {
            let cli = parse(&["stats", "--json", "--user", "alice"]);
            assert!(cli.json);
            assert_eq!(cli.user.as_deref(), Some("alice"));

            let cli = parse(&["-u", "prof", "course", "taught"]);
            assert_eq!(cli.user.as_deref(), Some("prof"));
        }

        #[test]
        fn invalid_command_fails() {
            assert!(Cli::try_parse_from(["lms", "invalid"]).is_err());
        }
    }

    mod course_tests {
        use super::*;

        #[test]
        fn parse_course_add() {
            let cli = parse(&["course", "add", "Rust 101", "-d", "Ownership", "-c", "Programming"]);
            match cli.command {
                Commands::Course(CourseCommands::Add {
                    title,
                    description,
                    category,
                }) => {
                    assert_eq!(title, "Rust 101");
                    assert_eq!(description, "Ownership");
                    assert_eq!(category.as_deref(), Some("Programming"));
                }
                other => panic!("Expected Course Add command, got {other:?}"),
            }
        }

        #[test]
        fn parse_lesson_with_type() {
            let cli = parse(&[
                "course", "lesson", "3", "Intro video", "--type", "video", "--video-url",
                "https://example.com/v", "--duration", "12", "-o", "2",
            ]);
            match cli.command {
                Commands::Course(CourseCommands::Lesson(args)) => {
                    assert_eq!(args.module_id, 3);
                    assert_eq!(args.content_type, "video");
                    assert_eq!(args.duration, Some(12));
                    assert_eq!(args.order, 2);
                }
                other => panic!("Expected Course Lesson command, got {other:?}"),
            }
        }

        #[test]
        fn lesson_requires_title() {
            assert!(Cli::try_parse_from(["lms", "course", "lesson", "3"]).is_err());
        }
    }

    mod learning_tests {
        use super::*;

        #[test]
        fn parse_complete_undo() {
            match parse(&["complete", "7", "--undo"]).command {
                Commands::Complete { lesson_id, undo } => {
                    assert_eq!(lesson_id, 7);
                    assert!(undo);
                }
                other => panic!("Expected Complete command, got {other:?}"),
            }
        }

        #[test]
        fn parse_quiz_take_with_answers() {
            let cli = parse(&["quiz", "take", "4", "-a", "1=2,3", "--answer", "2=ownership", "--time", "90"]);
            match cli.command {
                Commands::Quiz(QuizCommands::Take {
                    quiz_id,
                    answers,
                    time,
                }) => {
                    assert_eq!(quiz_id, 4);
                    assert_eq!(answers, vec!["1=2,3", "2=ownership"]);
                    assert_eq!(time, Some(90));
                }
                other => panic!("Expected Quiz Take command, got {other:?}"),
            }
        }

        #[test]
        fn quiz_add_defaults() {
            match parse(&["quiz", "add", "1", "Checkpoint"]).command {
                Commands::Quiz(QuizCommands::Add {
                    attempts, passing, ..
                }) => {
                    assert_eq!(attempts, 1);
                    assert_eq!(passing, 70.0);
                }
                other => panic!("Expected Quiz Add command, got {other:?}"),
            }
        }

        #[test]
        fn assignment_add_requires_due() {
            assert!(Cli::try_parse_from(["lms", "assignment", "add", "1", "Essay"]).is_err());
            let cli = parse(&["assignment", "add", "1", "Essay", "--due", "2026-01-31"]);
            assert!(matches!(
                cli.command,
                Commands::Assignment(AssignmentCommands::Add { points: 100, .. })
            ));
        }

        #[test]
        fn parse_grade_record() {
            match parse(&["grade", "record", "5", "42.5", "50"]).command {
                Commands::Grade(GradeCommands::Record {
                    enrollment_id,
                    score,
                    max_points,
                }) => {
                    assert_eq!(enrollment_id, 5);
                    assert_eq!(score, 42.5);
                    assert_eq!(max_points, 50.0);
                }
                other => panic!("Expected Grade Record command, got {other:?}"),
            }
        }

        #[test]
        fn grade_record_has_no_source_flag() {
            assert!(Cli::try_parse_from([
                "lms", "grade", "record", "5", "42.5", "50", "--source", "quiz"
            ])
            .is_err());
        }
    }

    mod settings_tests {
        use super::*;

        #[test]
        fn parse_prefs_booleans() {
            match parse(&["notify", "prefs", "--grade-updates", "false", "--in-app", "true"]).command {
                Commands::Notify(NotifyCommands::Prefs(args)) => {
                    assert_eq!(args.grade_updates, Some(false));
                    assert_eq!(args.in_app, Some(true));
                    assert!(args.forum_posts.is_none());
                }
                other => panic!("Expected Notify Prefs command, got {other:?}"),
            }
        }

        #[test]
        fn parse_a11y_set() {
            match parse(&["a11y", "set", "--volume", "30", "--font-size", "large"]).command {
                Commands::A11y(A11yCommands::Set(args)) => {
                    assert_eq!(args.volume, Some(30));
                    assert_eq!(args.font_size.as_deref(), Some("large"));
                    assert!(args.high_contrast.is_none());
                }
                other => panic!("Expected A11y Set command, got {other:?}"),
            }
        }

        #[test]
        fn parse_widget_add() {
            match parse(&["analytics", "widget", "add", "progress_chart", "-p", "2"]).command {
                Commands::Analytics(AnalyticsCommands::Widget(WidgetCommands::Add {
                    kind,
                    position,
                })) => {
                    assert_eq!(kind, "progress_chart");
                    assert_eq!(position, 2);
                }
                other => panic!("Expected Widget Add command, got {other:?}"),
            }
        }
    }
}
