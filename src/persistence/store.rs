//! Local save with cloud mirror and autosave throttle

use std::rc::Rc;

use super::record::ProgressRecord;
use crate::consts::AUTOSAVE_INTERVAL_MS;
use crate::platform::{HostChannel, KeyValueStore, OutboundMessage, StorageError};

/// LocalStorage key for the progress blob
pub const SAVE_KEY: &str = "mario_save_v2";

/// Loads and saves the progress record.
///
/// The local write is authoritative. The cloud copy is sent once per save with
/// no acknowledgment and no retry.
pub struct ProgressStore {
    storage: Box<dyn KeyValueStore>,
    host: Rc<dyn HostChannel>,
    user_id: u64,
    interval_ms: f64,
    /// Wall-clock time of the last admitted autosave
    last_autosave_ms: Option<f64>,
}

impl ProgressStore {
    pub fn new(storage: Box<dyn KeyValueStore>, host: Rc<dyn HostChannel>, user_id: u64) -> Self {
        Self {
            storage,
            host,
            user_id,
            interval_ms: AUTOSAVE_INTERVAL_MS,
            last_autosave_ms: None,
        }
    }

    /// Override the autosave throttle window
    pub fn with_interval(mut self, interval_ms: f64) -> Self {
        self.interval_ms = interval_ms.max(0.0);
        self
    }

    /// Load the local save. Missing or unreadable saves count as absent.
    pub fn load(&self) -> Option<ProgressRecord> {
        let json = match self.storage.get(SAVE_KEY) {
            Ok(Some(json)) => json,
            Ok(None) => {
                log::info!("No local save found");
                return None;
            }
            Err(e) => {
                log::warn!("Could not read local save: {}", e);
                return None;
            }
        };

        let record = match serde_json::from_str::<ProgressRecord>(&json) {
            Ok(record) => record,
            Err(e) => {
                log::warn!("Ignoring corrupted local save: {}", e);
                return None;
            }
        };
        match record.validated() {
            Some(record) => {
                log::info!(
                    "Loaded local save (level {}, {} coins)",
                    record.level_reached,
                    record.currency
                );
                Some(record)
            }
            None => {
                log::warn!("Ignoring implausible local save: {:?}", record);
                None
            }
        }
    }

    /// Write the record locally, then mirror it to the host.
    pub fn save(&mut self, record: &ProgressRecord) -> Result<(), StorageError> {
        let json = serde_json::to_string(record)?;
        self.storage.set(SAVE_KEY, &json)?;

        let message = OutboundMessage::CloudSave {
            user_id: self.user_id,
            payload: *record,
        };
        if let Err(e) = self.host.send(&message) {
            log::debug!("Cloud save skipped: {}", e);
        }

        log::info!(
            "Progress saved (level {}, {} coins)",
            record.level_reached,
            record.currency
        );
        Ok(())
    }

    /// Rate-limited save. Returns true if this request was admitted.
    pub fn autosave(&mut self, record: &ProgressRecord, now_ms: f64) -> bool {
        if let Some(last) = self.last_autosave_ms {
            if now_ms - last < self.interval_ms {
                log::debug!("Autosave throttled ({} ms since last)", now_ms - last);
                return false;
            }
        }
        self.last_autosave_ms = Some(now_ms);

        if let Err(e) = self.save(record) {
            log::warn!("Autosave failed: {}", e);
        }
        true
    }
}
