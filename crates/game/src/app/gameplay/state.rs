use std::collections::HashSet;
use std::fmt::Display;

use serde::{Deserialize, Serialize};

use super::quest::{Quest, QuestSets};

pub(crate) const SAVE_VERSION: u32 = 1;

pub(crate) type SaveLoadResult<T> = Result<T, String>;

/// Persisted form of [`GameState`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct GameStateSnapshot {
    pub(crate) save_version: u32,
    /// -1 when no quest is current.
    pub(crate) current_quest_index: i64,
    pub(crate) quests: Vec<Quest>,
    pub(crate) can_interact_with: Option<String>,
    pub(crate) is_combat_active: bool,
    pub(crate) active_quest_ids: Vec<String>,
    pub(crate) complete_quest_ids: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct GameState {
    quests: Vec<Quest>,
    current_quest_index: Option<usize>,
    sets: QuestSets,
    can_interact_with: Option<String>,
    is_combat_active: bool,
}

impl GameState {
    pub(crate) fn quests(&self) -> &[Quest] {
        &self.quests
    }

    pub(crate) fn current_quest_index(&self) -> Option<usize> {
        self.current_quest_index
    }

    pub(crate) fn current_quest(&self) -> Option<&Quest> {
        self.current_quest_index
            .and_then(|index| self.quests.get(index))
    }

    pub(crate) fn can_interact_with(&self) -> Option<&str> {
        self.can_interact_with.as_deref()
    }

    pub(crate) fn is_combat_active(&self) -> bool {
        self.is_combat_active
    }

    pub(crate) fn is_active(&self, id: &str) -> bool {
        self.sets.is_active(id)
    }

    pub(crate) fn is_complete(&self, id: &str) -> bool {
        self.sets.is_complete(id)
    }

    /// Appends the quest unless its id is already listed, then makes it
    /// current. Returns true when anything changed.
    pub(crate) fn offer_quest(&mut self, quest: Quest) -> bool {
        if quest.id.is_empty() {
            return false;
        }
        let index = match self.quests.iter().position(|known| known.id == quest.id) {
            Some(index) => index,
            None => {
                self.quests.push(quest);
                self.quests.len() - 1
            }
        };
        let moved = self.current_quest_index != Some(index);
        self.current_quest_index = Some(index);
        moved
    }

    /// Ignores out-of-range indices.
    pub(crate) fn select_quest(&mut self, index: usize) -> bool {
        if index >= self.quests.len() || self.current_quest_index == Some(index) {
            return false;
        }
        self.current_quest_index = Some(index);
        true
    }

    pub(crate) fn accept_quest(&mut self, id: &str) -> bool {
        let changed = self.sets.accept(id);
        if let Some(quest) = self.quests.iter_mut().find(|quest| quest.id == id) {
            quest.is_complete = false;
        }
        changed
    }

    pub(crate) fn complete_quest(&mut self, id: &str) -> bool {
        let changed = self.sets.complete(id);
        self.mark_complete(id) || changed
    }

    /// Flags the listed quest complete. When it was the current quest the
    /// index moves on to the next incomplete one, searching forward and then
    /// wrapping; it stays put when every quest is complete.
    pub(crate) fn mark_complete(&mut self, id: &str) -> bool {
        let Some(index) = self.quests.iter().position(|quest| quest.id == id) else {
            return false;
        };
        if self.quests[index].is_complete {
            return false;
        }
        self.quests[index].is_complete = true;

        if self.current_quest_index == Some(index) {
            let count = self.quests.len();
            let next = (1..count)
                .map(|step| (index + step) % count)
                .find(|candidate| !self.quests[*candidate].is_complete);
            if let Some(next) = next {
                self.current_quest_index = Some(next);
            }
        }
        true
    }

    pub(crate) fn set_interactable(&mut self, name: Option<&str>) -> bool {
        if self.can_interact_with.as_deref() == name {
            return false;
        }
        self.can_interact_with = name.map(str::to_string);
        true
    }

    pub(crate) fn snapshot(&self) -> GameStateSnapshot {
        GameStateSnapshot {
            save_version: SAVE_VERSION,
            current_quest_index: self
                .current_quest_index
                .map(|index| index as i64)
                .unwrap_or(-1),
            quests: self.quests.clone(),
            can_interact_with: self.can_interact_with.clone(),
            is_combat_active: self.is_combat_active,
            active_quest_ids: self.sets.active_ids().map(str::to_string).collect(),
            complete_quest_ids: self.sets.complete_ids().map(str::to_string).collect(),
        }
    }

    /// Builds state from a snapshot, rejecting one that fails validation.
    pub(crate) fn from_snapshot(snapshot: &GameStateSnapshot) -> SaveLoadResult<Self> {
        validate_snapshot(snapshot)?;
        Ok(Self {
            quests: snapshot.quests.clone(),
            current_quest_index: usize::try_from(snapshot.current_quest_index).ok(),
            sets: QuestSets::from_lists(&snapshot.active_quest_ids, &snapshot.complete_quest_ids),
            can_interact_with: snapshot.can_interact_with.clone(),
            is_combat_active: snapshot.is_combat_active,
        })
    }
}

pub(crate) fn parse_snapshot_json(raw: &str) -> SaveLoadResult<GameStateSnapshot> {
    let mut deserializer = serde_json::Deserializer::from_str(raw);
    serde_path_to_error::deserialize::<_, GameStateSnapshot>(&mut deserializer).map_err(|error| {
        let path = error.path().to_string();
        let source = error.into_inner();
        if path.is_empty() || path == "." {
            format!("parse save json: {source}")
        } else {
            format!("parse save json at {path}: {source}")
        }
    })
}

fn validation_err(path: &str, message: impl Display) -> String {
    format!("validation failed at {path}: {message}")
}

fn expected_actual(path: &str, expected: impl Display, actual: impl Display) -> String {
    validation_err(path, format!("expected {expected}, got {actual}"))
}

pub(crate) fn validate_snapshot(snapshot: &GameStateSnapshot) -> SaveLoadResult<()> {
    if snapshot.save_version != SAVE_VERSION {
        return Err(expected_actual(
            "saveVersion",
            SAVE_VERSION,
            snapshot.save_version,
        ));
    }

    let quest_count = snapshot.quests.len() as i64;
    let index = snapshot.current_quest_index;
    if index != -1 && !(0..quest_count).contains(&index) {
        return Err(expected_actual(
            "currentQuestIndex",
            format!("-1 or 0..{quest_count}"),
            index,
        ));
    }

    let mut seen = HashSet::<&str>::new();
    for (position, quest) in snapshot.quests.iter().enumerate() {
        if quest.id.is_empty() {
            return Err(validation_err(
                &format!("quests[{position}].id"),
                "must not be empty",
            ));
        }
        if !seen.insert(quest.id.as_str()) {
            return Err(validation_err(
                &format!("quests[{position}].id"),
                format!("duplicate quest id '{}'", quest.id),
            ));
        }
    }

    for (list, ids) in [
        ("activeQuestIds", &snapshot.active_quest_ids),
        ("completeQuestIds", &snapshot.complete_quest_ids),
    ] {
        if let Some(position) = ids.iter().position(String::is_empty) {
            return Err(validation_err(
                &format!("{list}[{position}]"),
                "must not be empty",
            ));
        }
    }
    if let Some(shared) = snapshot
        .active_quest_ids
        .iter()
        .find(|id| snapshot.complete_quest_ids.contains(id))
    {
        return Err(validation_err(
            "activeQuestIds",
            format!("'{shared}' is also listed as complete"),
        ));
    }
    Ok(())
}
