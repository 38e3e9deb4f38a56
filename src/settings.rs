//! Game settings and preferences
//!
//! Persisted separately from any session in LocalStorage.

use serde::{Deserialize, Serialize};

use crate::consts::{MISS_MARGIN, START_LIVES, TIMED_BUDGET_SECS};
use crate::error::GameError;
use crate::sim::GameMode;

/// Playfield geometry in CSS pixels
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    pub width: f32,
    pub height: f32,
    /// Rendered width of one falling definition box
    pub entity_width: f32,
    /// Rendered height of one falling definition box
    pub entity_height: f32,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            width: 1280.0,
            height: 720.0,
            entity_width: 320.0,
            entity_height: 64.0,
        }
    }
}

impl Viewport {
    /// Largest horizontal offset that keeps a definition box on screen
    pub fn max_x(&self) -> f32 {
        (self.width - self.entity_width).max(0.0)
    }

    /// A freshly spawned box (top at 0) must sit above the miss line
    /// `height - miss_margin`.
    pub fn check(&self, miss_margin: f32) -> Result<(), GameError> {
        if !(self.width > 0.0 && self.height > 0.0) {
            return Err(GameError::InvalidSettings(format!(
                "viewport must be positive, got {}x{}",
                self.width, self.height
            )));
        }
        if !(self.entity_width >= 0.0 && self.entity_height >= 0.0) {
            return Err(GameError::InvalidSettings(
                "entity size must not be negative".to_string(),
            ));
        }
        if !(miss_margin >= 0.0 && self.entity_height + miss_margin < self.height) {
            return Err(GameError::InvalidSettings(format!(
                "viewport height {} leaves no room above the miss line \
                 (entity {} + margin {})",
                self.height, self.entity_height, miss_margin
            )));
        }
        Ok(())
    }
}

/// Game settings/preferences
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Mode preselected in the menu
    pub default_mode: GameMode,
    pub viewport: Viewport,
    /// Distance above the viewport bottom that counts as a miss
    pub miss_margin: f32,
    /// Lives at the start of a lives-based session
    pub start_lives: u8,
    /// Timed mode countdown (seconds)
    pub timed_budget_secs: u32,
    /// Start a session right after a word list is uploaded from the menu
    pub auto_start_on_upload: bool,
    /// Fixed RNG seed (None = seed from the clock)
    pub seed: Option<u64>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            default_mode: GameMode::Classic,
            viewport: Viewport::default(),
            miss_margin: MISS_MARGIN,
            start_lives: START_LIVES,
            timed_budget_secs: TIMED_BUDGET_SECS,
            auto_start_on_upload: true,
            seed: None,
        }
    }
}

impl Settings {
    /// Parse settings from JSON; missing fields take their defaults
    pub fn from_json(json: &str) -> Result<Self, GameError> {
        let settings: Settings = serde_json::from_str(json)?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn to_json(&self) -> Result<String, GameError> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn validate(&self) -> Result<(), GameError> {
        self.viewport.check(self.miss_margin)?;
        if self.start_lives == 0 {
            return Err(GameError::InvalidSettings(
                "start_lives must be at least 1".to_string(),
            ));
        }
        if self.timed_budget_secs == 0 {
            return Err(GameError::InvalidSettings(
                "timed_budget_secs must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// LocalStorage key
    #[cfg(target_arch = "wasm32")]
    const STORAGE_KEY: &'static str = "typefall_settings";

    /// Load settings from LocalStorage (WASM only)
    #[cfg(target_arch = "wasm32")]
    pub fn load() -> Self {
        let storage = web_sys::window()
            .and_then(|w| w.local_storage().ok())
            .flatten();

        if let Some(storage) = storage {
            if let Ok(Some(json)) = storage.get_item(Self::STORAGE_KEY) {
                match Self::from_json(&json) {
                    Ok(settings) => {
                        log::info!("Loaded settings from LocalStorage");
                        return settings;
                    }
                    Err(err) => log::warn!("Ignoring stored settings: {}", err),
                }
            }
        }

        log::info!("Using default settings");
        Self::default()
    }

    /// Save settings to LocalStorage (WASM only)
    #[cfg(target_arch = "wasm32")]
    pub fn save(&self) {
        let storage = web_sys::window()
            .and_then(|w| w.local_storage().ok())
            .flatten();

        if let Some(storage) = storage {
            if let Ok(json) = self.to_json() {
                let _ = storage.set_item(Self::STORAGE_KEY, &json);
                log::info!("Settings saved");
            }
        }
    }

    /// Native stubs
    #[cfg(not(target_arch = "wasm32"))]
    pub fn load() -> Self {
        Self::default()
    }

    #[cfg(not(target_arch = "wasm32"))]
    pub fn save(&self) {
        // No-op for native
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        assert!(Settings::default().validate().is_ok());
    }

    #[test]
    fn test_partial_json_fills_defaults() {
        let settings = Settings::from_json(r#"{"default_mode":"Timed","seed":7}"#).unwrap();
        assert_eq!(settings.default_mode, GameMode::Timed);
        assert_eq!(settings.seed, Some(7));
        assert_eq!(settings.start_lives, START_LIVES);
        assert_eq!(settings.viewport, Viewport::default());
    }

    #[test]
    fn test_invalid_json_is_rejected() {
        assert!(matches!(
            Settings::from_json("{not json"),
            Err(GameError::InvalidSettings(_))
        ));
        assert!(matches!(
            Settings::from_json(r#"{"start_lives":0}"#),
            Err(GameError::InvalidSettings(_))
        ));
        assert!(matches!(
            Settings::from_json(r#"{"miss_margin":5000.0}"#),
            Err(GameError::InvalidSettings(_))
        ));
    }

    #[test]
    fn test_round_trip_through_json() {
        let mut settings = Settings::default();
        settings.auto_start_on_upload = false;
        settings.viewport.width = 640.0;
        let json = settings.to_json().unwrap();
        assert_eq!(Settings::from_json(&json).unwrap(), settings);
    }

    #[test]
    fn test_short_viewport_is_rejected() {
        let settings = Settings::default();
        let short = Viewport {
            height: 120.0,
            ..Viewport::default()
        };
        // 64 + 60 >= 120: a new box would already be past the miss line
        assert!(short.check(settings.miss_margin).is_err());
        assert!(
            Viewport {
                height: 125.0,
                ..Viewport::default()
            }
            .check(settings.miss_margin)
            .is_ok()
        );
        assert!(matches!(
            Settings::from_json(r#"{"viewport":{"width":800,"height":100,"entity_width":200,"entity_height":64}}"#),
            Err(GameError::InvalidSettings(_))
        ));
    }

    #[test]
    fn test_max_x_never_negative() {
        let narrow = Viewport {
            width: 100.0,
            ..Viewport::default()
        };
        assert_eq!(narrow.max_x(), 0.0);
        assert_eq!(Viewport::default().max_x(), 960.0);
    }
}
