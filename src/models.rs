use serde::{Deserialize, Serialize};

use crate::grading::{self, LetterGrade};

// === Users ===

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Role {
    Student,
    Instructor,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Student => "student",
            Role::Instructor => "instructor",
            Role::Admin => "admin",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "student" | "s" => Some(Role::Student),
            "instructor" | "teacher" | "i" => Some(Role::Instructor),
            "admin" | "a" => Some(Role::Admin),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Role::Student => "Student",
            Role::Instructor => "Instructor",
            Role::Admin => "Admin",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub email: Option<String>,
    pub first_name: String,
    pub last_name: String,
    pub role: Role,
    pub created_at: String,
}

impl User {
    pub fn display_name(&self) -> String {
        let full = format!("{} {}", self.first_name.trim(), self.last_name.trim());
        let full = full.trim();
        if full.is_empty() {
            self.username.clone()
        } else {
            full.to_string()
        }
    }

    pub fn is_staff(&self) -> bool {
        matches!(self.role, Role::Instructor | Role::Admin)
    }
}

// === Catalog ===

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Category {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub course_count: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Course {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub instructor_id: i64,
    pub instructor_name: String,
    pub category: Option<String>,
    pub is_active: bool,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Module {
    pub id: i64,
    pub course_id: i64,
    pub title: String,
    pub description: Option<String>,
    pub order: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ContentType {
    Text,
    Video,
    Pdf,
    Quiz,
    Assignment,
}

impl ContentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContentType::Text => "text",
            ContentType::Video => "video",
            ContentType::Pdf => "pdf",
            ContentType::Quiz => "quiz",
            ContentType::Assignment => "assignment",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "text" => Some(ContentType::Text),
            "video" => Some(ContentType::Video),
            "pdf" => Some(ContentType::Pdf),
            "quiz" => Some(ContentType::Quiz),
            "assignment" => Some(ContentType::Assignment),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Lesson {
    pub id: i64,
    pub module_id: i64,
    pub title: String,
    pub content_type: ContentType,
    pub content: Option<String>,
    pub video_url: Option<String>,
    pub file_path: Option<String>,
    pub duration_minutes: Option<i32>,
    pub order: i32,
    pub created_at: String,
}

/// Fields an author supplies when adding a lesson.
#[derive(Debug, Clone)]
pub struct NewLesson<'a> {
    pub title: &'a str,
    pub content_type: ContentType,
    pub content: Option<&'a str>,
    pub video_url: Option<&'a str>,
    pub file_path: Option<&'a str>,
    pub duration_minutes: Option<i32>,
    pub order: i32,
}

impl<'a> NewLesson<'a> {
    pub fn text(title: &'a str, order: i32) -> Self {
        Self {
            title,
            content_type: ContentType::Text,
            content: None,
            video_url: None,
            file_path: None,
            duration_minutes: None,
            order,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModuleOutline {
    pub module: Module,
    pub lessons: Vec<Lesson>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CourseOutline {
    pub course: Course,
    pub modules: Vec<ModuleOutline>,
}

impl CourseOutline {
    pub fn lesson_count(&self) -> usize {
        self.modules.iter().map(|m| m.lessons.len()).sum()
    }
}

// === Enrollment ===

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Enrollment {
    pub id: i64,
    pub student_id: i64,
    pub course_id: i64,
    pub enrolled_at: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProgressReport {
    pub enrollment_id: i64,
    pub completed: usize,
    pub total: usize,
    pub percentage: f64,
}

impl ProgressReport {
    pub fn new(enrollment_id: i64, completed: usize, total: usize) -> Self {
        Self {
            enrollment_id,
            completed,
            total,
            percentage: grading::progress_percentage(completed, total),
        }
    }

    pub fn is_complete(&self) -> bool {
        self.total > 0 && self.completed >= self.total
    }
}

// === Quizzes ===

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Quiz {
    pub id: i64,
    pub lesson_id: i64,
    pub title: String,
    pub description: Option<String>,
    pub time_limit: Option<i32>,
    pub max_attempts: i32,
    pub passing_score: f64,
}

#[derive(Debug, Clone)]
pub struct NewQuiz<'a> {
    pub title: &'a str,
    pub description: Option<&'a str>,
    pub time_limit: Option<i32>,
    pub max_attempts: i32,
    pub passing_score: f64,
}

impl<'a> NewQuiz<'a> {
    pub fn new(title: &'a str) -> Self {
        Self {
            title,
            description: None,
            time_limit: None,
            max_attempts: 1,
            passing_score: 70.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum QuestionType {
    MultipleChoice,
    TrueFalse,
    ShortAnswer,
}

impl QuestionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            QuestionType::MultipleChoice => "multiple_choice",
            QuestionType::TrueFalse => "true_false",
            QuestionType::ShortAnswer => "short_answer",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "multiple_choice" | "mc" | "choice" => Some(QuestionType::MultipleChoice),
            "true_false" | "tf" | "bool" => Some(QuestionType::TrueFalse),
            "short_answer" | "short" | "text" => Some(QuestionType::ShortAnswer),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            QuestionType::MultipleChoice => "Multiple Choice",
            QuestionType::TrueFalse => "True/False",
            QuestionType::ShortAnswer => "Short Answer",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Question {
    pub id: i64,
    pub quiz_id: i64,
    pub text: String,
    pub question_type: QuestionType,
    pub points: i32,
    pub order: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnswerOption {
    pub id: i64,
    pub question_id: i64,
    pub text: String,
    pub is_correct: bool,
    pub order: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuestionWithOptions {
    pub question: Question,
    pub options: Vec<AnswerOption>,
}

impl QuestionWithOptions {
    pub fn answer_key(&self) -> grading::AnswerKey {
        let correct: Vec<&AnswerOption> = self.options.iter().filter(|o| o.is_correct).collect();
        grading::AnswerKey {
            question_type: self.question.question_type,
            points: self.question.points,
            correct_option_ids: correct.iter().map(|o| o.id).collect(),
            accepted_answers: correct.iter().map(|o| o.text.clone()).collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuizAttempt {
    pub id: i64,
    pub quiz_id: i64,
    pub student_id: i64,
    pub attempt_number: i32,
    pub score: f64,
    pub points_earned: i64,
    pub total_points: i64,
    pub passed: bool,
    pub completed_at: String,
    pub time_taken: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuizAnswer {
    pub id: i64,
    pub attempt_id: i64,
    pub question_id: i64,
    pub selected_option_ids: Vec<i64>,
    pub text_answer: Option<String>,
    pub is_correct: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttemptResult {
    pub attempt: QuizAttempt,
    pub answers: Vec<QuizAnswer>,
    pub attempts_remaining: i32,
}

// === Assignments ===

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Assignment {
    pub id: i64,
    pub lesson_id: i64,
    pub title: String,
    pub description: String,
    pub due_date: String,
    pub max_points: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Submission {
    pub id: i64,
    pub assignment_id: i64,
    pub student_id: i64,
    pub file_path: Option<String>,
    pub body: Option<String>,
    pub submitted_at: String,
    pub is_late: bool,
    pub grade: Option<f64>,
    pub feedback: Option<String>,
}

// === Grades ===

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GradeSource {
    Quiz,
    Assignment,
    Exam,
}

impl GradeSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            GradeSource::Quiz => "quiz",
            GradeSource::Assignment => "assignment",
            GradeSource::Exam => "exam",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "quiz" => Some(GradeSource::Quiz),
            "assignment" => Some(GradeSource::Assignment),
            "exam" => Some(GradeSource::Exam),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Grade {
    pub id: i64,
    pub enrollment_id: i64,
    pub source: GradeSource,
    pub quiz_id: Option<i64>,
    pub assignment_id: Option<i64>,
    pub score: f64,
    pub max_points: f64,
    pub recorded_at: String,
}

impl Grade {
    pub fn percentage(&self) -> f64 {
        grading::grade_percentage(self.score, self.max_points)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CourseGrade {
    pub enrollment_id: i64,
    pub final_grade: f64,
    pub letter_grade: LetterGrade,
    pub updated_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GradebookRow {
    pub enrollment_id: i64,
    pub course_id: i64,
    pub course_title: String,
    pub student_id: i64,
    pub student_name: String,
    pub progress: f64,
    pub final_grade: f64,
    pub letter_grade: LetterGrade,
    pub grade_count: i64,
}

// === Forums ===

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Forum {
    pub id: i64,
    pub course_id: i64,
    pub title: String,
    pub description: Option<String>,
    pub is_active: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForumTopic {
    pub id: i64,
    pub forum_id: i64,
    pub title: String,
    pub content: String,
    pub author_id: i64,
    pub author_name: String,
    pub created_at: String,
    pub updated_at: String,
    pub is_pinned: bool,
    pub is_closed: bool,
    pub post_count: i64,
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Post {
    pub id: i64,
    pub topic_id: i64,
    pub content: String,
    pub author_id: i64,
    pub author_name: String,
    pub created_at: String,
    pub updated_at: String,
    pub is_edited: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TopicTag {
    pub id: i64,
    pub name: String,
    pub color: String,
}

// === Certificates ===

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Certificate {
    pub id: i64,
    pub enrollment_id: i64,
    pub certificate_id: String,
    pub issued_at: String,
    pub is_active: bool,
    pub student_id: i64,
    pub student_name: String,
    pub course_id: i64,
    pub course_title: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CertificateTemplate {
    pub id: i64,
    pub course_id: i64,
    pub title: String,
    pub description: String,
    pub font_size: i32,
    pub text_color: String,
    pub is_active: bool,
}

impl CertificateTemplate {
    pub const DEFAULT_TITLE: &'static str = "Certificate of Completion";
    pub const DEFAULT_DESCRIPTION: &'static str =
        "This is to certify that the student has successfully completed the course.";

    pub fn fallback(course_id: i64) -> Self {
        Self {
            id: 0,
            course_id,
            title: Self::DEFAULT_TITLE.to_string(),
            description: Self::DEFAULT_DESCRIPTION.to_string(),
            font_size: 14,
            text_color: "#000000".to_string(),
            is_active: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Eligibility {
    pub course_id: i64,
    pub progress: f64,
    pub threshold: f64,
    pub eligible: bool,
    pub certificate: Option<Certificate>,
}

// === Notifications ===

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NotificationKind {
    CourseUpdate,
    GradeUpdate,
    ForumPost,
    AssignmentDue,
    CertificateEarned,
    Enrollment,
    General,
}

impl NotificationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationKind::CourseUpdate => "course_update",
            NotificationKind::GradeUpdate => "grade_update",
            NotificationKind::ForumPost => "forum_post",
            NotificationKind::AssignmentDue => "assignment_due",
            NotificationKind::CertificateEarned => "certificate_earned",
            NotificationKind::Enrollment => "enrollment",
            NotificationKind::General => "general",
        }
    }

    pub fn from_str(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "course_update" => NotificationKind::CourseUpdate,
            "grade_update" => NotificationKind::GradeUpdate,
            "forum_post" => NotificationKind::ForumPost,
            "assignment_due" => NotificationKind::AssignmentDue,
            "certificate_earned" => NotificationKind::CertificateEarned,
            "enrollment" => NotificationKind::Enrollment,
            _ => NotificationKind::General,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            NotificationKind::CourseUpdate => "Course Update",
            NotificationKind::GradeUpdate => "Grade Update",
            NotificationKind::ForumPost => "Forum Post",
            NotificationKind::AssignmentDue => "Assignment Due",
            NotificationKind::CertificateEarned => "Certificate Earned",
            NotificationKind::Enrollment => "Enrollment",
            NotificationKind::General => "General",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    pub id: i64,
    pub recipient_id: i64,
    pub title: String,
    pub message: String,
    pub kind: NotificationKind,
    pub is_read: bool,
    pub created_at: String,
    pub related_course_id: Option<i64>,
    pub related_module_id: Option<i64>,
    pub related_lesson_id: Option<i64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationPreference {
    pub user_id: i64,
    pub email_notifications: bool,
    pub in_app_notifications: bool,
    pub course_updates: bool,
    pub grade_updates: bool,
    pub forum_posts: bool,
    pub assignment_due: bool,
}

impl NotificationPreference {
    pub fn defaults(user_id: i64) -> Self {
        Self {
            user_id,
            email_notifications: true,
            in_app_notifications: true,
            course_updates: true,
            grade_updates: true,
            forum_posts: true,
            assignment_due: true,
        }
    }

    pub fn allows(&self, kind: NotificationKind) -> bool {
        if !self.in_app_notifications {
            return false;
        }
        match kind {
            NotificationKind::CourseUpdate => self.course_updates,
            NotificationKind::GradeUpdate => self.grade_updates,
            NotificationKind::ForumPost => self.forum_posts,
            NotificationKind::AssignmentDue => self.assignment_due,
            NotificationKind::CertificateEarned
            | NotificationKind::Enrollment
            | NotificationKind::General => true,
        }
    }
}

// === Analytics ===

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventKind {
    CourseEnrollment,
    CourseCompletion,
    LessonCompletion,
    QuizAttempt,
    AssignmentSubmission,
    ForumActivity,
    UserEngagement,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::CourseEnrollment => "course_enrollment",
            EventKind::CourseCompletion => "course_completion",
            EventKind::LessonCompletion => "lesson_completion",
            EventKind::QuizAttempt => "quiz_attempt",
            EventKind::AssignmentSubmission => "assignment_submission",
            EventKind::ForumActivity => "forum_activity",
            EventKind::UserEngagement => "user_engagement",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "course_enrollment" => Some(EventKind::CourseEnrollment),
            "course_completion" => Some(EventKind::CourseCompletion),
            "lesson_completion" => Some(EventKind::LessonCompletion),
            "quiz_attempt" => Some(EventKind::QuizAttempt),
            "assignment_submission" => Some(EventKind::AssignmentSubmission),
            "forum_activity" => Some(EventKind::ForumActivity),
            "user_engagement" => Some(EventKind::UserEngagement),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyticsEvent {
    pub id: i64,
    pub kind: EventKind,
    pub course_id: Option<i64>,
    pub user_id: Option<i64>,
    pub value: f64,
    pub metadata: serde_json::Value,
    pub recorded_at: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReportKind {
    CoursePerformance,
    StudentProgress,
    UserEngagement,
    SystemUsage,
    GradeDistribution,
    CertificateIssuance,
}

impl ReportKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReportKind::CoursePerformance => "course_performance",
            ReportKind::StudentProgress => "student_progress",
            ReportKind::UserEngagement => "user_engagement",
            ReportKind::SystemUsage => "system_usage",
            ReportKind::GradeDistribution => "grade_distribution",
            ReportKind::CertificateIssuance => "certificate_issuance",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "course_performance" => Some(ReportKind::CoursePerformance),
            "student_progress" => Some(ReportKind::StudentProgress),
            "user_engagement" => Some(ReportKind::UserEngagement),
            "system_usage" => Some(ReportKind::SystemUsage),
            "grade_distribution" => Some(ReportKind::GradeDistribution),
            "certificate_issuance" => Some(ReportKind::CertificateIssuance),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ReportKind::CoursePerformance => "Course Performance",
            ReportKind::StudentProgress => "Student Progress",
            ReportKind::UserEngagement => "User Engagement",
            ReportKind::SystemUsage => "System Usage",
            ReportKind::GradeDistribution => "Grade Distribution",
            ReportKind::CertificateIssuance => "Certificate Issuance",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Report {
    pub id: i64,
    pub title: String,
    pub kind: ReportKind,
    pub generated_by: i64,
    pub generated_at: String,
    pub data: serde_json::Value,
    pub is_active: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WidgetKind {
    EnrollmentChart,
    ProgressChart,
    GradeDistribution,
    RecentActivities,
    UserStatistics,
    CourseStatistics,
}

impl WidgetKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            WidgetKind::EnrollmentChart => "enrollment_chart",
            WidgetKind::ProgressChart => "progress_chart",
            WidgetKind::GradeDistribution => "grade_distribution",
            WidgetKind::RecentActivities => "recent_activities",
            WidgetKind::UserStatistics => "user_statistics",
            WidgetKind::CourseStatistics => "course_statistics",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "enrollment_chart" => Some(WidgetKind::EnrollmentChart),
            "progress_chart" => Some(WidgetKind::ProgressChart),
            "grade_distribution" => Some(WidgetKind::GradeDistribution),
            "recent_activities" => Some(WidgetKind::RecentActivities),
            "user_statistics" => Some(WidgetKind::UserStatistics),
            "course_statistics" => Some(WidgetKind::CourseStatistics),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DashboardWidget {
    pub id: i64,
    pub user_id: i64,
    pub kind: WidgetKind,
    pub position: i32,
    pub is_visible: bool,
    pub config: serde_json::Value,
}

// === Accessibility ===

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FontSize {
    Small,
    Medium,
    Large,
    XLarge,
}

impl FontSize {
    pub fn as_str(&self) -> &'static str {
        match self {
            FontSize::Small => "small",
            FontSize::Medium => "medium",
            FontSize::Large => "large",
            FontSize::XLarge => "x-large",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "small" | "s" => Some(FontSize::Small),
            "medium" | "m" => Some(FontSize::Medium),
            "large" | "l" => Some(FontSize::Large),
            "x-large" | "xlarge" | "xl" => Some(FontSize::XLarge),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessibilitySettings {
    pub user_id: i64,
    pub high_contrast_mode: bool,
    pub large_text_mode: bool,
    pub reduced_motion_mode: bool,
    pub screen_reader_optimized: bool,
    pub keyboard_navigation_enabled: bool,
    pub focus_indicator_enabled: bool,
    pub caption_preference: bool,
    pub audio_volume_level: i32,
    pub preferred_font_size: FontSize,
    pub created_at: String,
    pub updated_at: String,
}

impl AccessibilitySettings {
    pub fn defaults(user_id: i64) -> Self {
        Self {
            user_id,
            high_contrast_mode: false,
            large_text_mode: false,
            reduced_motion_mode: false,
            screen_reader_optimized: true,
            keyboard_navigation_enabled: true,
            focus_indicator_enabled: true,
            caption_preference: true,
            audio_volume_level: 50,
            preferred_font_size: FontSize::Medium,
            created_at: String::new(),
            updated_at: String::new(),
        }
    }
}

/// Partial update; `None` leaves the stored value alone.
#[derive(Debug, Clone, Default)]
pub struct AccessibilityPatch {
    pub high_contrast_mode: Option<bool>,
    pub large_text_mode: Option<bool>,
    pub reduced_motion_mode: Option<bool>,
    pub screen_reader_optimized: Option<bool>,
    pub keyboard_navigation_enabled: Option<bool>,
    pub focus_indicator_enabled: Option<bool>,
    pub caption_preference: Option<bool>,
    pub audio_volume_level: Option<i32>,
    pub preferred_font_size: Option<FontSize>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AccessibilityMode {
    HighContrast,
    LargeText,
    ReducedMotion,
    ScreenReader,
    KeyboardNavigation,
    FocusIndicator,
    Captions,
}

impl AccessibilityMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccessibilityMode::HighContrast => "high_contrast",
            AccessibilityMode::LargeText => "large_text",
            AccessibilityMode::ReducedMotion => "reduced_motion",
            AccessibilityMode::ScreenReader => "screen_reader",
            AccessibilityMode::KeyboardNavigation => "keyboard_navigation",
            AccessibilityMode::FocusIndicator => "focus_indicator",
            AccessibilityMode::Captions => "captions",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "high_contrast" | "contrast" => Some(AccessibilityMode::HighContrast),
            "large_text" => Some(AccessibilityMode::LargeText),
            "reduced_motion" | "motion" => Some(AccessibilityMode::ReducedMotion),
            "screen_reader" => Some(AccessibilityMode::ScreenReader),
            "keyboard_navigation" | "keyboard" => Some(AccessibilityMode::KeyboardNavigation),
            "focus_indicator" | "focus" => Some(AccessibilityMode::FocusIndicator),
            "captions" | "caption" => Some(AccessibilityMode::Captions),
            _ => None,
        }
    }

    /// Column backing this mode in `accessibility_settings`.
    pub fn column(&self) -> &'static str {
        match self {
            AccessibilityMode::HighContrast => "high_contrast_mode",
            AccessibilityMode::LargeText => "large_text_mode",
            AccessibilityMode::ReducedMotion => "reduced_motion_mode",
            AccessibilityMode::ScreenReader => "screen_reader_optimized",
            AccessibilityMode::KeyboardNavigation => "keyboard_navigation_enabled",
            AccessibilityMode::FocusIndicator => "focus_indicator_enabled",
            AccessibilityMode::Captions => "caption_preference",
        }
    }
}

// JSON output wrapper for CLI
#[derive(Debug, Serialize)]
pub struct JsonOutput<T: Serialize> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<String>,
}

impl<T: Serialize> JsonOutput<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn err(msg: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(msg.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_user(first: &str, last: &str, role: Role) -> User {
        User {
            id: 1,
            username: "jdoe".to_string(),
            email: None,
            first_name: first.to_string(),
            last_name: last.to_string(),
            role,
            created_at: String::new(),
        }
    }

    mod user_tests {
        use super::*;

        #[test]
        fn display_name_joins_names() {
            let u = make_user("Jane", "Doe", Role::Student);
            assert_eq!(u.display_name(), "Jane Doe");
        }

        #[test]
        fn display_name_falls_back_to_username() {
            let u = make_user("", "  ", Role::Student);
            assert_eq!(u.display_name(), "jdoe");
        }

        #[test]
        fn display_name_with_only_first_name() {
            let u = make_user("Jane", "", Role::Student);
            assert_eq!(u.display_name(), "Jane");
        }

        #[test]
        fn staff_roles() {
            assert!(!make_user("a", "b", Role::Student).is_staff());
            assert!(make_user("a", "b", Role::Instructor).is_staff());
            assert!(make_user("a", "b", Role::Admin).is_staff());
        }

        #[test]
        fn role_from_str_variants() {
            assert_eq!(Role::from_str("STUDENT"), Some(Role::Student));
            assert_eq!(Role::from_str("teacher"), Some(Role::Instructor));
            assert_eq!(Role::from_str("a"), Some(Role::Admin));
            assert_eq!(Role::from_str("guest"), None);
        }
    }

    mod progress_report_tests {
        use super::*;

        #[test]
        fn new_computes_percentage() {
            let p = ProgressReport::new(1, 1, 4);
            assert_eq!(p.percentage, 25.0);
            assert!(!p.is_complete());
        }

        #[test]
        fn empty_course_is_never_complete() {
            let p = ProgressReport::new(1, 0, 0);
            assert_eq!(p.percentage, 0.0);
            assert!(!p.is_complete());
        }

        #[test]
        fn all_done_is_complete() {
            assert!(ProgressReport::new(1, 3, 3).is_complete());
        }
    }

    mod question_tests {
        use super::*;

        #[test]
        fn question_type_aliases() {
            assert_eq!(QuestionType::from_str("mc"), Some(QuestionType::MultipleChoice));
            assert_eq!(QuestionType::from_str("true-false"), Some(QuestionType::TrueFalse));
            assert_eq!(QuestionType::from_str("short"), Some(QuestionType::ShortAnswer));
            assert_eq!(QuestionType::from_str("essay"), None);
        }

        #[test]
        fn answer_key_collects_correct_options() {
            let q = QuestionWithOptions {
                question: Question {
                    id: 1,
                    quiz_id: 1,
                    text: "Pick".to_string(),
                    question_type: QuestionType::MultipleChoice,
                    points: 2,
                    order: 0,
                },
                options: vec![
                    AnswerOption {
                        id: 10,
                        question_id: 1,
                        text: "yes".to_string(),
                        is_correct: true,
                        order: 0,
                    },
                    AnswerOption {
                        id: 11,
                        question_id: 1,
                        text: "no".to_string(),
                        is_correct: false,
                        order: 1,
                    },
                ],
            };
            let key = q.answer_key();
            assert_eq!(key.points, 2);
            assert_eq!(key.correct_option_ids.into_iter().collect::<Vec<_>>(), vec![10]);
            assert_eq!(key.accepted_answers, vec!["yes".to_string()]);
        }
    }

    mod grade_tests {
        use super::*;

        #[test]
        fn percentage_of_grade() {
            let g = Grade {
                id: 1,
                enrollment_id: 1,
                source: GradeSource::Assignment,
                quiz_id: None,
                assignment_id: Some(1),
                score: 42.0,
                max_points: 50.0,
                recorded_at: String::new(),
            };
            assert_eq!(g.percentage(), 84.0);
        }

        #[test]
        fn grade_source_round_trip() {
            for s in [GradeSource::Quiz, GradeSource::Assignment, GradeSource::Exam] {
                assert_eq!(GradeSource::from_str(s.as_str()), Some(s));
            }
        }
    }

    mod notification_preference_tests {
        use super::*;

        #[test]
        fn defaults_allow_everything() {
            let p = NotificationPreference::defaults(1);
            assert!(p.allows(NotificationKind::GradeUpdate));
            assert!(p.allows(NotificationKind::General));
        }

        #[test]
        fn in_app_off_blocks_everything() {
            let mut p = NotificationPreference::defaults(1);
            p.in_app_notifications = false;
            assert!(!p.allows(NotificationKind::CertificateEarned));
            assert!(!p.allows(NotificationKind::Enrollment));
        }

        #[test]
        fn kind_specific_flags() {
            let mut p = NotificationPreference::defaults(1);
            p.grade_updates = false;
            p.forum_posts = false;
            assert!(!p.allows(NotificationKind::GradeUpdate));
            assert!(!p.allows(NotificationKind::ForumPost));
            assert!(p.allows(NotificationKind::AssignmentDue));
            assert!(p.allows(NotificationKind::CertificateEarned));
        }

        #[test]
        fn unknown_kind_maps_to_general() {
            assert_eq!(NotificationKind::from_str("weird"), NotificationKind::General);
            assert_eq!(
                NotificationKind::from_str("grade_update"),
                NotificationKind::GradeUpdate
            );
        }
    }

    mod analytics_kind_tests {
        use super::*;

        #[test]
        fn report_kind_accepts_dashes() {
            assert_eq!(
                ReportKind::from_str("grade-distribution"),
                Some(ReportKind::GradeDistribution)
            );
            assert_eq!(ReportKind::from_str("nope"), None);
        }

        #[test]
        fn event_kind_from_str() {
            assert_eq!(
                EventKind::from_str("lesson_completion"),
                Some(EventKind::LessonCompletion)
            );
            assert_eq!(EventKind::from_str(""), None);
        }

        #[test]
        fn widget_kind_from_str() {
            assert_eq!(
                WidgetKind::from_str("progress_chart"),
                Some(WidgetKind::ProgressChart)
            );
            assert_eq!(WidgetKind::from_str("pie"), None);
        }
    }

    mod accessibility_tests {
        use super::*;

        #[test]
        fn defaults_match_documented_values() {
            let s = AccessibilitySettings::defaults(7);
            assert!(!s.high_contrast_mode);
            assert!(s.screen_reader_optimized);
            assert_eq!(s.audio_volume_level, 50);
            assert_eq!(s.preferred_font_size, FontSize::Medium);
        }

        #[test]
        fn font_size_from_str() {
            assert_eq!(FontSize::from_str("x-large"), Some(FontSize::XLarge));
            assert_eq!(FontSize::from_str("XL"), Some(FontSize::XLarge));
            assert_eq!(FontSize::from_str("huge"), None);
        }

        #[test]
        fn mode_aliases_and_columns() {
            let mode = AccessibilityMode::from_str("high-contrast").unwrap();
            assert_eq!(mode, AccessibilityMode::HighContrast);
            assert_eq!(mode.column(), "high_contrast_mode");
            assert_eq!(
                AccessibilityMode::from_str("captions").unwrap().column(),
                "caption_preference"
            );
            assert!(AccessibilityMode::from_str("dark").is_none());
        }
    }

    mod json_output_tests {
        use super::*;

        #[test]
        fn ok_wraps_data() {
            let output = JsonOutput::ok(42);
            assert!(output.success);
            assert_eq!(output.data, Some(42));
            assert!(output.error.is_none());
        }

        #[test]
        fn err_carries_message() {
            let output = JsonOutput::<()>::err("Course 3 not found");
            assert!(!output.success);
            assert!(output.data.is_none());
            assert_eq!(output.error, Some("Course 3 not found".to_string()));
        }

        #[test]
        fn serializes_envelope() {
            let json = serde_json::to_string(&JsonOutput::ok("x")).unwrap();
            assert!(json.contains("\"success\":true"));
            assert!(json.contains("\"data\":\"x\""));
            assert!(json.contains("\"error\":null"));
        }
    }
}
