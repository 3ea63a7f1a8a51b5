use serde_json::json;

use super::{on_off, Ctx};
use crate::cli::{A11yArgs, A11yCommands};
use crate::error::{LmsError, Result};
use crate::models::{AccessibilityMode, AccessibilityPatch, AccessibilitySettings, FontSize};
use crate::tui::KEY_BINDINGS;

pub fn run(ctx: &Ctx<'_>, cmd: A11yCommands) -> Result<()> {
    match cmd {
        A11yCommands::Show => {
            let actor = ctx.actor()?;
            let settings = ctx.db.get_settings(actor.id)?;
            ctx.emit(&settings, || print_settings(&settings))
        }

        A11yCommands::Set(args) => {
            let actor = ctx.actor()?;
            let patch = to_patch(&args)?;
            let settings = ctx.db.update_settings(actor.id, &patch)?;
            ctx.emit(&settings, || print_settings(&settings))
        }

        A11yCommands::Toggle { mode } => {
            let actor = ctx.actor()?;
            let mode = AccessibilityMode::from_str(&mode)
                .ok_or_else(|| LmsError::invalid(format!("Unknown accessibility mode '{mode}'")))?;
            let enabled = ctx.db.toggle_mode(actor.id, mode)?;
            ctx.emit(&json!({ "mode": mode.as_str(), "enabled": enabled }), || {
                println!("{} is now {}.", mode.as_str(), on_off(enabled))
            })
        }

        A11yCommands::Shortcuts => {
            let data: Vec<_> = KEY_BINDINGS
                .iter()
                .map(|(key, action)| json!({ "key": key, "action": action }))
                .collect();
            ctx.emit(&data, || {
                for (key, action) in KEY_BINDINGS {
                    println!("{key:<12} {action}");
                }
            })
        }
    }
}

fn to_patch(args: &A11yArgs) -> Result<AccessibilityPatch> {
    let preferred_font_size = args
        .font_size
        .as_deref()
        .map(|raw| {
            FontSize::from_str(raw).ok_or_else(|| {
                LmsError::invalid(format!(
                    "Invalid font size '{raw}'. Use: small, medium, large, or x-large"
                ))
            })
        })
        .transpose()?;

    Ok(AccessibilityPatch {
        high_contrast_mode: args.high_contrast,
        large_text_mode: args.large_text,
        reduced_motion_mode: args.reduced_motion,
        screen_reader_optimized: args.screen_reader,
        keyboard_navigation_enabled: args.keyboard_navigation,
        focus_indicator_enabled: args.focus_indicator,
        caption_preference: args.captions,
        audio_volume_level: args.volume,
        preferred_font_size,
    })
}

fn print_settings(s: &AccessibilitySettings) {
    println!("High contrast:        {}", on_off(s.high_contrast_mode));
    println!("Large text:           {}", on_off(s.large_text_mode));
    println!("Reduced motion:       {}", on_off(s.reduced_motion_mode));
    println!("Screen reader:        {}", on_off(s.screen_reader_optimized));
    println!("Keyboard navigation:  {}", on_off(s.keyboard_navigation_enabled));
    println!("Focus indicator:      {}", on_off(s.focus_indicator_enabled));
    println!("Captions:             {}", on_off(s.caption_preference));
    println!("Audio volume:         {}", s.audio_volume_level);
    println!("Font size:            {}", s.preferred_font_size.as_str());
}
