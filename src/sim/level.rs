//! Procedural level generation
//!
//! Layout is driven by the level number; exact coordinates come from the
//! injected random source.

use glam::Vec2;
use rand::Rng;

use super::state::{Coin, Enemy, LevelState, Rect};
use crate::consts::MAX_LEVEL;

/// Coins per level, capped
pub fn coin_count(level: u32) -> usize {
    (5 + 2 * level.min(5) as usize).min(15)
}

/// Enemies per level, capped
pub fn enemy_count(level: u32) -> usize {
    (level / 2).min(5) as usize
}

/// Generated platforms per level (not counting the ground)
pub fn platform_count(level: u32) -> usize {
    2 + level.min(MAX_LEVEL) as usize
}

/// Build a level: ground, floating platforms, coins on top of them, patrolling enemies
pub fn generate_level<R: Rng + ?Sized>(level: u32, rng: &mut R) -> LevelState {
    let level = level.clamp(1, MAX_LEVEL);
    let mut state = LevelState::empty(level);

    for i in 0..platform_count(level) {
        state.platforms.push(Rect::new(
            150.0 + i as f32 * 200.0 + rng.random::<f32>() * 100.0,
            200.0 + rng.random::<f32>() * 100.0,
            80.0 + rng.random::<f32>() * 40.0,
            20.0,
        ));
    }

    // Coins never sit on the ground
    let floating = state.platforms.len() - 1;
    for _ in 0..coin_count(level) {
        let plat = state.platforms[1 + rng.random_range(0..floating)];
        state.coins.push(Coin {
            pos: Vec2::new(
                plat.x + rng.random::<f32>() * (plat.w - 20.0),
                plat.y - 20.0,
            ),
        });
    }

    let speed = 1.0 + 0.1 * level as f32;
    for i in 0..enemy_count(level) {
        state.enemies.push(Enemy {
            pos: Vec2::new(300.0 + i as f32 * 200.0, 318.0),
            dir: if i % 2 == 0 { -1.0 } else { 1.0 },
            speed,
        });
    }

    log::debug!(
        "Level {}: {} platforms, {} coins, {} enemies",
        level,
        state.platforms.len(),
        state.coins.len(),
        state.enemies.len()
    );

    state
}
