//! The persisted progression record
//!
//! Field names on the wire match what the host's cloud store expects.

use serde::{Deserialize, Serialize};

use crate::consts::MAX_LEVEL;

/// Purchased stat upgrades
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Upgrades {
    pub jump_power: u32,
    pub double_jump: bool,
    pub speed: u32,
    pub max_hp: u32,
}

impl Upgrades {
    pub const BASE_JUMP_POWER: u32 = 12;
    pub const BASE_SPEED: u32 = 5;
    pub const BASE_MAX_HP: u32 = 3;
}

impl Default for Upgrades {
    fn default() -> Self {
        Self {
            jump_power: Self::BASE_JUMP_POWER,
            double_jump: false,
            speed: Self::BASE_SPEED,
            max_hp: Self::BASE_MAX_HP,
        }
    }
}

/// Everything that survives between sessions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProgressRecord {
    #[serde(rename = "coins")]
    pub currency: u64,
    #[serde(rename = "level")]
    pub level_reached: u32,
    pub upgrades: Upgrades,
}

impl Default for ProgressRecord {
    fn default() -> Self {
        Self {
            currency: 0,
            level_reached: 1,
            upgrades: Upgrades::default(),
        }
    }
}

impl ProgressRecord {
    /// Fresh record for a new game
    pub fn new_game() -> Self {
        Self::default()
    }

    /// Check a loaded record. Values no game could have produced mean the save
    /// was tampered with, and the whole record is rejected.
    pub fn validated(mut self) -> Option<Self> {
        let u = &self.upgrades;
        if self.level_reached > MAX_LEVEL
            || u.jump_power < Upgrades::BASE_JUMP_POWER
            || u.speed < Upgrades::BASE_SPEED
            || u.max_hp < Upgrades::BASE_MAX_HP
        {
            return None;
        }
        self.level_reached = self.level_reached.max(1);
        Some(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parses_saved_blob() {
        let json = r#"{"coins":42,"level":3,"upgrades":{"jumpPower":14,"doubleJump":true,"speed":6,"maxHp":4}}"#;
        let record: ProgressRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.currency, 42);
        assert_eq!(record.level_reached, 3);
        assert_eq!(
            record.upgrades,
            Upgrades {
                jump_power: 14,
                double_jump: true,
                speed: 6,
                max_hp: 4,
            }
        );
    }

    #[test]
    fn test_missing_fields_use_defaults() {
        let record: ProgressRecord = serde_json::from_str(r#"{"coins":5,"upgrades":{"speed":7}}"#).unwrap();
        assert_eq!(record.currency, 5);
        assert_eq!(record.level_reached, 1);
        assert_eq!(record.upgrades.speed, 7);
        assert_eq!(record.upgrades.jump_power, 12);
        assert_eq!(record.upgrades.max_hp, 3);
    }

    #[test]
    fn test_validated() {
        let zero_level = ProgressRecord {
            level_reached: 0,
            ..ProgressRecord::default()
        };
        assert_eq!(zero_level.validated().map(|r| r.level_reached), Some(1));

        let huge_level = ProgressRecord {
            level_reached: u32::MAX,
            ..ProgressRecord::default()
        };
        assert_eq!(huge_level.validated(), None);

        let weak_jump = ProgressRecord {
            upgrades: Upgrades {
                jump_power: 10,
                ..Upgrades::default()
            },
            ..ProgressRecord::default()
        };
        assert_eq!(weak_jump.validated(), None);

        let no_hp = ProgressRecord {
            upgrades: Upgrades {
                max_hp: 0,
                ..Upgrades::default()
            },
            ..ProgressRecord::default()
        };
        assert_eq!(no_hp.validated(), None);

        let saved = ProgressRecord {
            currency: 9,
            level_reached: MAX_LEVEL,
            ..ProgressRecord::default()
        };
        assert_eq!(saved.validated(), Some(saved));
    }
}
