//! Progress persistence
//!
//! Features:
//! - JSON progress record under a fixed LocalStorage key
//! - Best-effort cloud mirror through the host channel
//! - Autosave throttle (wall-clock rate limit)
//! - Corrupt or missing saves fall back to a new game

pub mod record;
pub mod store;

pub use record::{ProgressRecord, Upgrades};
pub use store::{ProgressStore, SAVE_KEY};
