//! Game settings
//!
//! Persisted separately from progress, in the same key-value store.

use serde::{Deserialize, Serialize};

use crate::consts::{AUTOSAVE_INTERVAL_MS, LEADERBOARD_TIMEOUT_MS};
use crate::platform::{KeyValueStore, StorageError};

/// How the jump key is sampled each tick
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum JumpTrigger {
    /// Jump whenever the key is held. Holding it in the air spends the double jump right away.
    #[default]
    Level,
    /// Jump only on the tick after the key goes down
    Edge,
}

impl JumpTrigger {
    pub fn as_str(&self) -> &'static str {
        match self {
            JumpTrigger::Level => "level",
            JumpTrigger::Edge => "edge",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "level" | "held" => Some(JumpTrigger::Level),
            "edge" | "press" => Some(JumpTrigger::Edge),
            _ => None,
        }
    }
}

/// Game settings/preferences
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub jump_trigger: JumpTrigger,
    /// Minimum wall-clock gap between autosaves
    pub autosave_interval_ms: f64,
    /// How long to wait for the host leaderboard
    pub leaderboard_timeout_ms: f64,
    /// Let the web wrapper substitute a timestamp id when the host gave none
    pub offline_fallback_id: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            jump_trigger: JumpTrigger::Level,
            autosave_interval_ms: AUTOSAVE_INTERVAL_MS,
            leaderboard_timeout_ms: LEADERBOARD_TIMEOUT_MS,
            offline_fallback_id: true,
        }
    }
}

impl Settings {
    /// Storage key
    const STORAGE_KEY: &'static str = "coin_dash_settings";

    /// Load settings, falling back to defaults
    pub fn load(storage: &dyn KeyValueStore) -> Self {
        if let Ok(Some(json)) = storage.get(Self::STORAGE_KEY) {
            match serde_json::from_str(&json) {
                Ok(settings) => {
                    log::info!("Loaded settings");
                    return settings;
                }
                Err(e) => log::warn!("Ignoring unreadable settings: {}", e),
            }
        }

        log::info!("Using default settings");
        Self::default()
    }

    pub fn save(&self, storage: &mut dyn KeyValueStore) -> Result<(), StorageError> {
        let json = serde_json::to_string(self)?;
        storage.set(Self::STORAGE_KEY, &json)?;
        log::info!("Settings saved");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::MemoryStorage;

    #[test]
    fn test_defaults() {
        let settings = Settings::default();
        assert_eq!(settings.jump_trigger, JumpTrigger::Level);
        assert_eq!(settings.autosave_interval_ms, 3000.0);
        assert_eq!(settings.leaderboard_timeout_ms, 3000.0);
    }

    #[test]
    fn test_save_and_load() {
        let mut storage = MemoryStorage::new();
        assert_eq!(Settings::load(&storage), Settings::default());

        let settings = Settings {
            jump_trigger: JumpTrigger::Edge,
            ..Settings::default()
        };
        settings.save(&mut storage).unwrap();
        assert_eq!(Settings::load(&storage), settings);
    }

    #[test]
    fn test_partial_settings_fill_defaults() {
        let mut storage = MemoryStorage::new();
        storage
            .set(Settings::STORAGE_KEY, r#"{"jump_trigger":"edge"}"#)
            .unwrap();
        let settings = Settings::load(&storage);
        assert_eq!(settings.jump_trigger, JumpTrigger::Edge);
        assert_eq!(settings.autosave_interval_ms, 3000.0);
    }

    #[test]
    fn test_jump_trigger_names() {
        assert_eq!(JumpTrigger::from_str("EDGE"), Some(JumpTrigger::Edge));
        assert_eq!(JumpTrigger::from_str(JumpTrigger::Level.as_str()), Some(JumpTrigger::Level));
        assert_eq!(JumpTrigger::from_str("sometimes"), None);
    }
}
