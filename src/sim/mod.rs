//! Simulation module
//!
//! All gameplay logic lives here. No rendering or platform dependencies:
//! - One tick per frame, in a fixed update order
//! - Random source injected by the caller
//! - Stable iteration order (as stored)

pub mod level;
pub mod state;
pub mod tick;

pub use level::generate_level;
pub use state::{Coin, Enemy, LevelState, Platform, Player, Rect};
pub use tick::{GameEvent, TickInput, tick};
