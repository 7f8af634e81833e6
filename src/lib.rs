//! Coin Dash - a side-scrolling platformer mini-app
//!
//! Core modules:
//! - `sim`: Simulation (level generation, physics, collisions)
//! - `economy`: Upgrade catalog and purchases
//! - `persistence`: Progress record, local save and cloud sync
//! - `leaderboard`: Host leaderboard request/response
//! - `platform`: Browser/native abstraction (storage, host channel)
//! - `session`: Mode state machine tying everything together

pub mod economy;
pub mod leaderboard;
pub mod persistence;
pub mod platform;
pub mod session;
pub mod settings;
pub mod sim;

pub use economy::{PurchaseError, UpgradeId};
pub use leaderboard::{LeaderboardClient, LeaderboardEntry};
pub use persistence::{ProgressRecord, ProgressStore, Upgrades};
pub use session::{Mode, Session, SessionError};
pub use settings::{JumpTrigger, Settings};

/// Game configuration constants
pub mod consts {
    use glam::Vec2;

    /// Logical world size; all collision math runs in this space
    pub const WORLD_WIDTH: f32 = 800.0;
    pub const WORLD_HEIGHT: f32 = 400.0;

    /// Downward acceleration per tick
    pub const GRAVITY: f32 = 0.5;

    /// Where the player (re)spawns
    pub const SPAWN: Vec2 = Vec2::new(50.0, 300.0);

    /// Player and enemy hitboxes
    pub const PLAYER_SIZE: f32 = 32.0;
    pub const ENEMY_SIZE: f32 = 32.0;

    /// Coin sprite size (center is offset by half)
    pub const COIN_SIZE: f32 = 16.0;
    /// Pickup happens strictly inside this center-to-center distance
    pub const COIN_PICKUP_RADIUS: f32 = 25.0;

    /// Double jump is weaker than the ground jump
    pub const DOUBLE_JUMP_FACTOR: f32 = 0.8;
    /// Upward kick when touching an enemy
    pub const ENEMY_KNOCKBACK: f32 = -8.0;

    /// Enemies turn around outside this x range
    pub const PATROL_MIN_X: f32 = 100.0;
    pub const PATROL_MAX_X: f32 = 700.0;

    /// Highest level generated; saves claiming more are rejected
    pub const MAX_LEVEL: u32 = 999;

    /// Default wall-clock throttle for autosave
    pub const AUTOSAVE_INTERVAL_MS: f64 = 3000.0;
    /// Default leaderboard response deadline
    pub const LEADERBOARD_TIMEOUT_MS: f64 = 3000.0;
}
