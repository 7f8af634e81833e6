//! Host runtime bridge
//!
//! The game runs as a mini-app inside a chat client. Outbound messages are
//! fire-and-forget JSON strings; inbound messages arrive as window events.

use std::cell::{Cell, RefCell};

use serde::{Deserialize, Serialize};

use crate::leaderboard::LeaderboardEntry;
use crate::persistence::ProgressRecord;
use crate::session::SessionError;

/// `source` value the host stamps on every inbound message
pub const HOST_SOURCE: &str = "telegram";

/// Host messaging failures
#[derive(Debug, thiserror::Error)]
pub enum HostError {
    #[error("host channel is not available")]
    Unavailable,
    #[error("could not encode host message: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Messages sent to the host
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OutboundMessage {
    /// Mirror of the local save
    CloudSave {
        user_id: u64,
        payload: ProgressRecord,
    },
    /// Ask for the ranked leaderboard, answered by a `leaderboard_resp` with the same id
    RequestLeaderboard { id: u64 },
}

impl OutboundMessage {
    pub fn to_json(&self) -> Result<String, HostError> {
        Ok(serde_json::to_string(self)?)
    }
}

/// Messages received from the host
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InboundMessage {
    LeaderboardResp {
        id: u64,
        #[serde(default)]
        data: Option<Vec<LeaderboardEntry>>,
    },
}

/// Parse a raw inbound event payload. Anything not stamped by the host, or not
/// understood, is ignored.
pub fn parse_inbound(raw: &str) -> Option<InboundMessage> {
    let value: serde_json::Value = match serde_json::from_str(raw) {
        Ok(value) => value,
        Err(e) => {
            log::debug!("Ignoring non-JSON host message: {}", e);
            return None;
        }
    };

    if value.get("source").and_then(|s| s.as_str()) != Some(HOST_SOURCE) {
        return None;
    }

    match serde_json::from_value(value) {
        Ok(message) => Some(message),
        Err(e) => {
            log::warn!("Unrecognized host message: {}", e);
            None
        }
    }
}

/// Outbound side of the host bridge
pub trait HostChannel {
    fn send(&self, message: &OutboundMessage) -> Result<(), HostError>;
}

/// Channel that keeps everything it was asked to send. Used headless and in tests.
#[derive(Debug, Default)]
pub struct RecordingChannel {
    sent: RefCell<Vec<OutboundMessage>>,
    failing: Cell<bool>,
}

impl RecordingChannel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make subsequent sends fail (simulates a closed host)
    pub fn set_failing(&self, failing: bool) {
        self.failing.set(failing);
    }

    pub fn sent(&self) -> Vec<OutboundMessage> {
        self.sent.borrow().clone()
    }
}

impl HostChannel for RecordingChannel {
    fn send(&self, message: &OutboundMessage) -> Result<(), HostError> {
        if self.failing.get() {
            return Err(HostError::Unavailable);
        }
        log::debug!("host <- {:?}", message);
        self.sent.borrow_mut().push(message.clone());
        Ok(())
    }
}

/// Telegram WebApp bridge
#[cfg(target_arch = "wasm32")]
pub mod telegram {
    use wasm_bindgen::prelude::*;

    use super::{HostChannel, HostError, OutboundMessage};

    #[wasm_bindgen(inline_js = "
        export function has_web_app() {
            return !!(window.Telegram && window.Telegram.WebApp);
        }

        export function send_data(data) {
            window.Telegram.WebApp.sendData(data);
        }

        export function expand() {
            if (window.Telegram && window.Telegram.WebApp) {
                window.Telegram.WebApp.expand();
                window.Telegram.WebApp.MainButton.hide();
            }
        }
    ")]
    extern "C" {
        fn has_web_app() -> bool;
        #[wasm_bindgen(catch)]
        fn send_data(data: &str) -> Result<(), JsValue>;
        pub fn expand();
    }

    /// Sends through `Telegram.WebApp.sendData`
    pub struct TelegramChannel;

    impl HostChannel for TelegramChannel {
        fn send(&self, message: &OutboundMessage) -> Result<(), HostError> {
            if !has_web_app() {
                return Err(HostError::Unavailable);
            }
            let json = message.to_json()?;
            send_data(&json).map_err(|_| HostError::Unavailable)
        }
    }
}

/// Launch parameters supplied by the host in the page URL
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchParams {
    pub user_id: u64,
    pub display_name: String,
}

impl LaunchParams {
    pub const DEFAULT_NAME: &'static str = "Player";

    /// Validate the raw `user_id` / `first_name` values. A missing or unusable id is fatal.
    pub fn parse(user_id: Option<&str>, first_name: Option<&str>) -> Result<Self, SessionError> {
        let raw = user_id.map(str::trim).filter(|s| !s.is_empty());
        let Some(raw) = raw else {
            return Err(SessionError::MissingUserId);
        };
        let user_id: u64 = raw
            .parse()
            .map_err(|_| SessionError::InvalidUserId(raw.to_string()))?;
        if user_id == 0 {
            return Err(SessionError::MissingUserId);
        }
        Ok(Self {
            user_id,
            display_name: Self::name_or_default(first_name),
        })
    }

    /// Offline stand-in identity derived from the current timestamp
    pub fn offline(now_ms: f64, first_name: Option<&str>) -> Self {
        Self {
            user_id: (now_ms.max(1.0)) as u64,
            display_name: Self::name_or_default(first_name),
        }
    }

    fn name_or_default(first_name: Option<&str>) -> String {
        first_name
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .unwrap_or(Self::DEFAULT_NAME)
            .to_string()
    }
}
