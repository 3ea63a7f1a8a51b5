use std::{env, fmt::Display, path::PathBuf, str::FromStr};

use tracing::{debug, warn};

const DEFAULT_DB_NAME: &str = "lms.db";
pub const DEFAULT_CERTIFICATE_THRESHOLD: f64 = 100.0;
pub const DEFAULT_DUE_WINDOW_HOURS: i64 = 24;

#[derive(Debug, Clone)]
pub struct Config {
    pub db_path: PathBuf,
    pub acting_user: Option<String>,
    /// Minimum course progress, in percent, before a certificate can be claimed.
    pub certificate_threshold: f64,
    pub due_window_hours: i64,
    pub log_filter: String,
    pub log_json: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from(DEFAULT_DB_NAME),
            acting_user: None,
            certificate_threshold: DEFAULT_CERTIFICATE_THRESHOLD,
            due_window_hours: DEFAULT_DUE_WINDOW_HOURS,
            log_filter: "warn".to_string(),
            log_json: false,
        }
    }
}

impl Config {
    pub fn load() -> Self {
        let mut threshold: f64 = try_load(
            "LMS_CERTIFICATE_THRESHOLD",
            DEFAULT_CERTIFICATE_THRESHOLD,
        );
        if !threshold.is_finite() {
            warn!("Invalid LMS_CERTIFICATE_THRESHOLD value '{threshold}'; using default {DEFAULT_CERTIFICATE_THRESHOLD}");
            threshold = DEFAULT_CERTIFICATE_THRESHOLD;
        }

        let (log_filter, log_json) = log_settings();

        Self {
            db_path: db_path(),
            acting_user: var("LMS_USER").filter(|u| !u.trim().is_empty()),
            certificate_threshold: threshold.clamp(0.0, 100.0),
            due_window_hours: try_load("LMS_DUE_WINDOW_HOURS", DEFAULT_DUE_WINDOW_HOURS).max(1),
            log_filter,
            log_json,
        }
    }
}

/// Log filter and format, read before the subscriber exists so nothing here logs.
pub fn log_settings() -> (String, bool) {
    let filter = var("LMS_LOG").unwrap_or_else(|| "warn".to_string());
    let json = var("LMS_LOG_JSON")
        .map(|raw| matches!(raw.trim(), "1" | "true" | "yes"))
        .unwrap_or(false);
    (filter, json)
}

fn var(key: &str) -> Option<String> {
    env::var(key).ok()
}

// Unparseable values fall back to the default instead of aborting the command
fn try_load<T: FromStr + Display>(key: &str, default: T) -> T
where
    T::Err: Display,
{
    match var(key) {
        Some(raw) => raw.trim().parse().unwrap_or_else(|e| {
            warn!("Invalid {key} value '{raw}': {e}; using default {default}");
            default
        }),
        None => {
            debug!("{key} not set, using default: {default}");
            default
        }
    }
}

fn db_path() -> PathBuf {
    if let Some(path) = var("LMS_DB") {
        return PathBuf::from(path);
    }

    let config_dir = dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("lms");

    if let Err(e) = std::fs::create_dir_all(&config_dir) {
        warn!("Could not create {}: {e}", config_dir.display());
    }
    config_dir.join(DEFAULT_DB_NAME)
}
