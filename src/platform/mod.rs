//! Platform abstraction layer
//!
//! Handles browser/native differences for:
//! - Storage (LocalStorage on web, in-memory elsewhere)
//! - Host messaging (chat-client mini-app bridge)
//! - Launch parameters

pub mod host;
pub mod storage;

pub use host::{
    HOST_SOURCE, HostChannel, HostError, InboundMessage, LaunchParams, OutboundMessage,
    RecordingChannel, parse_inbound,
};
pub use storage::{KeyValueStore, MemoryStorage, StorageError};
