//! Game state and core simulation types
//!
//! Everything the physics tick reads or writes lives here. The render surface
//! only ever sees these through a read-only snapshot.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::consts::*;
use crate::persistence::Upgrades;

/// Axis-aligned rectangle in logical world space
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub w: f32,
    pub h: f32,
}

impl Rect {
    pub const fn new(x: f32, y: f32, w: f32, h: f32) -> Self {
        Self { x, y, w, h }
    }

    pub fn right(&self) -> f32 {
        self.x + self.w
    }

    pub fn bottom(&self) -> f32 {
        self.y + self.h
    }

    /// Strict AABB overlap (touching edges do not count)
    pub fn overlaps(&self, other: &Rect) -> bool {
        self.x < other.right()
            && self.right() > other.x
            && self.y < other.bottom()
            && self.bottom() > other.y
    }

    /// Strict overlap on the x axis only
    pub fn overlaps_x(&self, other: &Rect) -> bool {
        self.x < other.right() && self.right() > other.x
    }
}

/// Platforms are plain rectangles
pub type Platform = Rect;

/// The ground every level starts with
pub const GROUND: Platform = Rect::new(0.0, 350.0, 800.0, 50.0);

/// A collectible coin (position is the sprite's top-left corner)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coin {
    pub pos: Vec2,
}

impl Coin {
    pub fn center(&self) -> Vec2 {
        self.pos + Vec2::splat(COIN_SIZE / 2.0)
    }
}

/// A patrolling enemy
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Enemy {
    pub pos: Vec2,
    /// Patrol direction, -1.0 (left) or 1.0 (right)
    pub dir: f32,
    pub speed: f32,
}

impl Enemy {
    pub fn rect(&self) -> Rect {
        Rect::new(self.pos.x, self.pos.y, ENEMY_SIZE, ENEMY_SIZE)
    }

    /// Walk one step and turn around outside the patrol range
    pub fn patrol(&mut self) {
        self.pos.x += self.dir * self.speed;
        if self.pos.x < PATROL_MIN_X || self.pos.x > PATROL_MAX_X {
            self.dir = -self.dir;
        }
    }
}

/// The player character
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Player {
    pub pos: Vec2,
    pub vel: Vec2,
    pub speed: f32,
    pub jump_power: f32,
    pub max_hp: u32,
    pub hp: u32,
    pub double_jump: bool,
    pub grounded: bool,
    /// Air jumps left before landing again
    pub jumps_remaining: u32,
}

impl Player {
    /// Fresh player at spawn with stats taken from purchased upgrades
    pub fn from_upgrades(upgrades: &Upgrades) -> Self {
        let mut player = Self {
            pos: SPAWN,
            vel: Vec2::ZERO,
            speed: 0.0,
            jump_power: 0.0,
            max_hp: 0,
            hp: 0,
            double_jump: false,
            grounded: false,
            jumps_remaining: 0,
        };
        player.apply_upgrades(upgrades);
        player.hp = player.max_hp;
        player
    }

    /// Refresh stats after a purchase. Current hp is kept unless it exceeds the new max.
    pub fn apply_upgrades(&mut self, upgrades: &Upgrades) {
        self.speed = upgrades.speed as f32;
        self.jump_power = upgrades.jump_power as f32;
        self.max_hp = upgrades.max_hp.max(1);
        self.double_jump = upgrades.double_jump;
        self.hp = self.hp.min(self.max_hp);
        self.jumps_remaining = self.jumps_remaining.min(self.air_jumps());
    }

    /// Back to spawn with full health
    pub fn respawn(&mut self) {
        self.pos = SPAWN;
        self.vel = Vec2::ZERO;
        self.hp = self.max_hp;
        self.grounded = false;
        self.jumps_remaining = 0;
    }

    pub fn rect(&self) -> Rect {
        Rect::new(self.pos.x, self.pos.y, PLAYER_SIZE, PLAYER_SIZE)
    }

    pub fn center(&self) -> Vec2 {
        self.pos + Vec2::splat(PLAYER_SIZE / 2.0)
    }

    /// Number of jumps available in the air after leaving the ground
    pub fn air_jumps(&self) -> u32 {
        if self.double_jump { 1 } else { 0 }
    }

    pub fn is_dead(&self) -> bool {
        self.hp == 0
    }
}

/// One level's worth of geometry and entities
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LevelState {
    /// Level number (1-based)
    pub level: u32,
    pub gravity: f32,
    /// Ground first, then generated platforms
    pub platforms: Vec<Platform>,
    pub coins: Vec<Coin>,
    pub enemies: Vec<Enemy>,
}

impl LevelState {
    /// Empty level containing only the ground
    pub fn empty(level: u32) -> Self {
        Self {
            level: level.max(1),
            gravity: GRAVITY,
            platforms: vec![GROUND],
            coins: Vec::new(),
            enemies: Vec::new(),
        }
    }

    pub fn is_cleared(&self) -> bool {
        self.coins.is_empty()
    }
}
