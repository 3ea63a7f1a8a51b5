use thiserror::Error;

#[derive(Error, Debug)]
pub enum LmsError {
    #[error("{0} {1} not found")]
    NotFound(&'static str, String),

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Already enrolled in course {0}")]
    AlreadyEnrolled(i64),

    #[error("Not enrolled in course {0}")]
    NotEnrolled(i64),

    #[error("No attempts remaining for quiz {quiz_id} (maximum {max_attempts})")]
    AttemptLimitReached { quiz_id: i64, max_attempts: i32 },

    #[error("Assignment {0} already has a submission from this student")]
    AlreadySubmitted(i64),

    #[error("Topic {0} is closed to new posts")]
    TopicClosed(i64),

    #[error("Not eligible for a certificate: progress {progress:.2}% is below {threshold:.0}%")]
    NotEligible { progress: f64, threshold: f64 },

    #[error("Invalid input: {0}")]
    Invalid(String),

    #[error("No acting user; pass --user <username> or set LMS_USER")]
    NoActingUser,

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl LmsError {
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        LmsError::NotFound(entity, id.to_string())
    }

    pub fn invalid(msg: impl Into<String>) -> Self {
        LmsError::Invalid(msg.into())
    }
}

pub type Result<T> = std::result::Result<T, LmsError>;
