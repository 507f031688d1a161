use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::thread;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

pub(crate) const DIALOGUE_FILE_NAME: &str = "dialogue.json";
pub(crate) const PLACEHOLDER_LINE: &str = "...";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub(crate) enum DialogueAction {
    Close,
    AcceptQuest,
    CompleteQuest,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct DialogueOption {
    pub(crate) text: String,
    pub(crate) action: DialogueAction,
    #[serde(rename = "questId", default, skip_serializing_if = "Option::is_none")]
    pub(crate) quest_id: Option<String>,
}

impl DialogueOption {
    pub(crate) fn close() -> Self {
        Self {
            text: "Close".to_string(),
            action: DialogueAction::Close,
            quest_id: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub(crate) struct DialoguePayload {
    pub(crate) lines: Vec<String>,
    pub(crate) options: Vec<DialogueOption>,
}

impl DialoguePayload {
    pub(crate) fn placeholder() -> Self {
        Self {
            lines: vec![PLACEHOLDER_LINE.to_string()],
            options: vec![DialogueOption::close()],
        }
    }
}

/// One NPC's entry in the dialogue data file. Both fields may be omitted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub(crate) struct DialogueEntry {
    pub(crate) intro: Vec<String>,
    pub(crate) options: Vec<DialogueOption>,
}

impl DialogueEntry {
    fn to_payload(&self) -> DialoguePayload {
        let lines = if self.intro.is_empty() {
            vec![PLACEHOLDER_LINE.to_string()]
        } else {
            self.intro.clone()
        };
        let options = if self.options.is_empty() {
            vec![DialogueOption::close()]
        } else {
            self.options.clone()
        };
        DialoguePayload { lines, options }
    }
}

pub(crate) type DialogueEntries = BTreeMap<String, DialogueEntry>;

pub(crate) fn parse_dialogue_json(raw: &str) -> Result<DialogueEntries, String> {
    let mut deserializer = serde_json::Deserializer::from_str(raw);
    serde_path_to_error::deserialize::<_, DialogueEntries>(&mut deserializer).map_err(|error| {
        let path = error.path().to_string();
        let source = error.into_inner();
        if path.is_empty() || path == "." {
            format!("parse dialogue json: {source}")
        } else {
            format!("parse dialogue json at {path}: {source}")
        }
    })
}

fn load_dialogue_file(path: &Path) -> Result<DialogueEntries, String> {
    let raw = fs::read_to_string(path)
        .map_err(|error| format!("read dialogue file {}: {error}", path.display()))?;
    parse_dialogue_json(&raw)
}

enum LibraryState {
    Pending(Receiver<Result<DialogueEntries, String>>),
    Ready(DialogueEntries),
}

/// Dialogue content for the session, loaded once off the frame thread.
pub(crate) struct DialogueLibrary {
    state: LibraryState,
}

impl DialogueLibrary {
    /// Starts a background read of `path`. Falls back to reading inline if
    /// the loader thread cannot be spawned.
    pub(crate) fn spawn_load(path: PathBuf) -> Self {
        let (sender, receiver) = mpsc::channel();
        let worker_path = path.clone();
        let spawned = thread::Builder::new()
            .name("dialogue-loader".to_string())
            .spawn(move || {
                let _ = sender.send(load_dialogue_file(&worker_path));
            });
        match spawned {
            Ok(_) => Self {
                state: LibraryState::Pending(receiver),
            },
            Err(error) => {
                warn!(error = %error, "dialogue_loader_spawn_failed");
                let mut library = Self {
                    state: LibraryState::Ready(DialogueEntries::new()),
                };
                library.finish(load_dialogue_file(&path));
                library
            }
        }
    }

    pub(crate) fn ready(entries: DialogueEntries) -> Self {
        Self {
            state: LibraryState::Ready(entries),
        }
    }

    #[cfg(test)]
    pub(crate) fn pending() -> (Self, mpsc::Sender<Result<DialogueEntries, String>>) {
        let (sender, receiver) = mpsc::channel();
        (
            Self {
                state: LibraryState::Pending(receiver),
            },
            sender,
        )
    }

    /// Moves to ready once the loader has reported. Non-blocking.
    pub(crate) fn poll(&mut self) -> bool {
        let LibraryState::Pending(receiver) = &self.state else {
            return true;
        };
        match receiver.try_recv() {
            Ok(result) => {
                self.finish(result);
                true
            }
            Err(TryRecvError::Empty) => false,
            Err(TryRecvError::Disconnected) => {
                self.finish(Err("dialogue loader exited without a result".to_string()));
                true
            }
        }
    }

    fn finish(&mut self, result: Result<DialogueEntries, String>) {
        let entries = match result {
            Ok(entries) => {
                info!(npc_count = entries.len(), "dialogue_loaded");
                entries
            }
            Err(error) => {
                warn!(error = %error, "dialogue_load_failed");
                DialogueEntries::new()
            }
        };
        self.state = LibraryState::Ready(entries);
    }

    #[cfg(test)]
    pub(crate) fn is_ready(&self) -> bool {
        matches!(self.state, LibraryState::Ready(_))
    }

    /// `None` while loading. Unknown names get the placeholder payload.
    pub(crate) fn dialogue_for(&self, npc_name: &str) -> Option<DialoguePayload> {
        let LibraryState::Ready(entries) = &self.state else {
            return None;
        };
        match entries.get(npc_name) {
            Some(entry) => Some(entry.to_payload()),
            None => {
                warn!(npc = npc_name, "dialogue_missing_placeholder");
                Some(DialoguePayload::placeholder())
            }
        }
    }
}
