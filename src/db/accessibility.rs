use rusqlite::params;
use tracing::debug;

use super::{timestamp, Database};
use crate::error::{LmsError, Result};
use crate::models::{AccessibilityMode, AccessibilityPatch, AccessibilitySettings, FontSize};

impl Database {
    /// Settings for a user, creating the default row on first access.
    pub fn get_settings(&self, user_id: i64) -> Result<AccessibilitySettings> {
        self.require_user(user_id)?;
        let now = timestamp();
        self.conn.execute(
            "INSERT OR IGNORE INTO accessibility_settings (user_id, created_at, updated_at) VALUES (?1, ?2, ?2)",
            params![user_id, now],
        )?;

        let settings = self.conn.query_row(
            r#"
            SELECT user_id, high_contrast_mode, large_text_mode, reduced_motion_mode,
                   screen_reader_optimized, keyboard_navigation_enabled, focus_indicator_enabled,
                   caption_preference, audio_volume_level, preferred_font_size,
                   created_at, updated_at
            FROM accessibility_settings WHERE user_id = ?1
            "#,
            params![user_id],
            |row| {
                let font: String = row.get(9)?;
                Ok(AccessibilitySettings {
                    user_id: row.get(0)?,
                    high_contrast_mode: row.get(1)?,
                    large_text_mode: row.get(2)?,
                    reduced_motion_mode: row.get(3)?,
                    screen_reader_optimized: row.get(4)?,
                    keyboard_navigation_enabled: row.get(5)?,
                    focus_indicator_enabled: row.get(6)?,
                    caption_preference: row.get(7)?,
                    audio_volume_level: row.get(8)?,
                    preferred_font_size: FontSize::from_str(&font).unwrap_or(FontSize::Medium),
                    created_at: row.get(10)?,
                    updated_at: row.get(11)?,
                })
            },
        )?;

        Ok(settings)
    }

    pub fn update_settings(
        &self,
        user_id: i64,
        patch: &AccessibilityPatch,
    ) -> Result<AccessibilitySettings> {
        if let Some(volume) = patch.audio_volume_level {
            if !(0..=100).contains(&volume) {
                return Err(LmsError::invalid("audio volume must be within 0..=100"));
            }
        }

        let current = self.get_settings(user_id)?;
        let next = AccessibilitySettings {
            high_contrast_mode: patch.high_contrast_mode.unwrap_or(current.high_contrast_mode),
            large_text_mode: patch.large_text_mode.unwrap_or(current.large_text_mode),
            reduced_motion_mode: patch.reduced_motion_mode.unwrap_or(current.reduced_motion_mode),
            screen_reader_optimized: patch
                .screen_reader_optimized
                .unwrap_or(current.screen_reader_optimized),
            keyboard_navigation_enabled: patch
                .keyboard_navigation_enabled
                .unwrap_or(current.keyboard_navigation_enabled),
            focus_indicator_enabled: patch
                .focus_indicator_enabled
                .unwrap_or(current.focus_indicator_enabled),
            caption_preference: patch.caption_preference.unwrap_or(current.caption_preference),
            audio_volume_level: patch.audio_volume_level.unwrap_or(current.audio_volume_level),
            preferred_font_size: patch.preferred_font_size.unwrap_or(current.preferred_font_size),
            ..current
        };

        self.conn.execute(
            r#"
            UPDATE accessibility_settings SET
                high_contrast_mode = ?1,
                large_text_mode = ?2,
                reduced_motion_mode = ?3,
                screen_reader_optimized = ?4,
                keyboard_navigation_enabled = ?5,
                focus_indicator_enabled = ?6,
                caption_preference = ?7,
                audio_volume_level = ?8,
                preferred_font_size = ?9,
                updated_at = ?10
            WHERE user_id = ?11
            "#,
            params![
                next.high_contrast_mode,
                next.large_text_mode,
                next.reduced_motion_mode,
                next.screen_reader_optimized,
                next.keyboard_navigation_enabled,
                next.focus_indicator_enabled,
                next.caption_preference,
                next.audio_volume_level,
                next.preferred_font_size.as_str(),
                timestamp(),
                user_id,
            ],
        )?;
        debug!(user_id, "Updated accessibility settings");
        self.get_settings(user_id)
    }

    /// Flips one mode and returns its new state.
    pub fn toggle_mode(&self, user_id: i64, mode: AccessibilityMode) -> Result<bool> {
        self.get_settings(user_id)?;
        let column = mode.column();
        self.conn.execute(
            &format!(
                "UPDATE accessibility_settings SET {column} = 1 - {column}, updated_at = ?1 WHERE user_id = ?2"
            ),
            params![timestamp(), user_id],
        )?;
        let enabled: bool = self.conn.query_row(
            &format!("SELECT {column} FROM accessibility_settings WHERE user_id = ?1"),
            params![user_id],
            |row| row.get(0),
        )?;
        debug!(user_id, mode = mode.as_str(), enabled, "Toggled accessibility mode");
        Ok(enabled)
    }
}

#[cfg(test)]
mod tests {
    use crate::db::testing::{setup_db, Fixture};
    use crate::error::LmsError;
    use crate::models::{AccessibilityMode, AccessibilityPatch, FontSize};

    #[test]
    fn defaults_created_on_first_read() {
        let db = setup_db();
        let fx = Fixture::new(&db);

        let settings = db.get_settings(fx.student_id).unwrap();
        assert!(!settings.high_contrast_mode);
        assert!(settings.screen_reader_optimized);
        assert!(settings.keyboard_navigation_enabled);
        assert_eq!(settings.audio_volume_level, 50);
        assert_eq!(settings.preferred_font_size, FontSize::Medium);

        let again = db.get_settings(fx.student_id).unwrap();
        assert_eq!(again.created_at, settings.created_at);
    }

    #[test]
    fn unknown_user() {
        let db = setup_db();
        assert!(matches!(
            db.get_settings(42).unwrap_err(),
            LmsError::NotFound("User", _)
        ));
    }

    #[test]
    fn patch_changes_only_given_fields() {
        let db = setup_db();
        let fx = Fixture::new(&db);

        let patch = AccessibilityPatch {
            large_text_mode: Some(true),
            audio_volume_level: Some(80),
            preferred_font_size: Some(FontSize::XLarge),
            ..Default::default()
        };
        let settings = db.update_settings(fx.student_id, &patch).unwrap();
        assert!(settings.large_text_mode);
        assert_eq!(settings.audio_volume_level, 80);
        assert_eq!(settings.preferred_font_size, FontSize::XLarge);
        assert!(!settings.high_contrast_mode);
        assert!(settings.caption_preference);
    }

    #[test]
    fn volume_out_of_range() {
        let db = setup_db();
        let fx = Fixture::new(&db);
        let patch = AccessibilityPatch {
            audio_volume_level: Some(101),
            ..Default::default()
        };
        assert!(matches!(
            db.update_settings(fx.student_id, &patch).unwrap_err(),
            LmsError::Invalid(_)
        ));
        assert_eq!(db.get_settings(fx.student_id).unwrap().audio_volume_level, 50);
    }

    #[test]
    fn toggle_flips_back_and_forth() {
        let db = setup_db();
        let fx = Fixture::new(&db);

        assert!(db.toggle_mode(fx.student_id, AccessibilityMode::HighContrast).unwrap());
        assert!(db.get_settings(fx.student_id).unwrap().high_contrast_mode);
        assert!(!db.toggle_mode(fx.student_id, AccessibilityMode::HighContrast).unwrap());
        assert!(!db.toggle_mode(fx.student_id, AccessibilityMode::Captions).unwrap());
    }
}
