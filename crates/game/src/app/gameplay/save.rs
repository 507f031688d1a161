use engine::SaveStore;
use tracing::{info, warn};

use super::state::{parse_snapshot_json, validate_snapshot, GameStateSnapshot};

pub(crate) const SAVE_SLOT_KEY: &str = "village";

/// Boolean/Option facade over a [`SaveStore`]. Failures are logged and never
/// propagated to the caller.
pub(crate) struct GameStateStore {
    store: Box<dyn SaveStore>,
    key: &'static str,
}

impl GameStateStore {
    pub(crate) fn new(store: Box<dyn SaveStore>) -> Self {
        Self {
            store,
            key: SAVE_SLOT_KEY,
        }
    }

    pub(crate) fn save_game(&mut self, snapshot: &GameStateSnapshot) -> bool {
        let encoded = match serde_json::to_string_pretty(snapshot) {
            Ok(encoded) => encoded,
            Err(error) => {
                warn!(slot = self.key, error = %error, "save_encode_failed");
                return false;
            }
        };
        match self.store.write(self.key, &encoded) {
            Ok(()) => {
                info!(
                    slot = self.key,
                    quest_count = snapshot.quests.len(),
                    "save_written"
                );
                true
            }
            Err(error) => {
                warn!(slot = self.key, error = %error, "save_failed");
                false
            }
        }
    }

    /// `None` when nothing is saved or the stored data is unreadable.
    pub(crate) fn load_game(&self) -> Option<GameStateSnapshot> {
        let raw = match self.store.read(self.key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(error) => {
                warn!(slot = self.key, error = %error, "load_failed");
                return None;
            }
        };
        let snapshot = match parse_snapshot_json(&raw) {
            Ok(snapshot) => snapshot,
            Err(error) => {
                warn!(slot = self.key, error = %error, "load_failed");
                return None;
            }
        };
        if let Err(error) = validate_snapshot(&snapshot) {
            warn!(slot = self.key, error = %error, "load_failed");
            return None;
        }
        Some(snapshot)
    }

    pub(crate) fn has_saved_game(&self) -> bool {
        match self.store.contains(self.key) {
            Ok(found) => found,
            Err(error) => {
                warn!(slot = self.key, error = %error, "save_probe_failed");
                false
            }
        }
    }
}
