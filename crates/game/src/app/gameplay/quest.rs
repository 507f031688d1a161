use std::collections::BTreeSet;

use engine::QuestDef;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct Quest {
    pub(crate) id: String,
    pub(crate) title: String,
    pub(crate) objective: String,
    pub(crate) is_complete: bool,
    #[serde(default)]
    pub(crate) npc: Option<String>,
    #[serde(rename = "rewardXP", default)]
    pub(crate) reward_xp: u32,
}

impl From<&QuestDef> for Quest {
    fn from(def: &QuestDef) -> Self {
        Self {
            id: def.id.clone(),
            title: def.title.clone(),
            objective: def.objective.clone(),
            is_complete: false,
            npc: def.npc.clone(),
            reward_xp: def.reward_xp,
        }
    }
}

/// Active and complete quest ids. The two sets never share an id.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct QuestSets {
    active: BTreeSet<String>,
    complete: BTreeSet<String>,
}

impl QuestSets {
    /// Returns true when the sets changed. Re-accepting a completed quest
    /// moves it back to active.
    pub(crate) fn accept(&mut self, id: &str) -> bool {
        if id.is_empty() {
            return false;
        }
        let reopened = self.complete.remove(id);
        let added = self.active.insert(id.to_string());
        reopened || added
    }

    pub(crate) fn complete(&mut self, id: &str) -> bool {
        if id.is_empty() {
            return false;
        }
        let was_active = self.active.remove(id);
        let added = self.complete.insert(id.to_string());
        was_active || added
    }

    pub(crate) fn is_active(&self, id: &str) -> bool {
        self.active.contains(id)
    }

    pub(crate) fn is_complete(&self, id: &str) -> bool {
        self.complete.contains(id)
    }

    pub(crate) fn active_ids(&self) -> impl Iterator<Item = &str> {
        self.active.iter().map(String::as_str)
    }

    pub(crate) fn complete_ids(&self) -> impl Iterator<Item = &str> {
        self.complete.iter().map(String::as_str)
    }

    /// Rebuilds from saved lists; an id in both lists ends up complete.
    pub(crate) fn from_lists(active: &[String], complete: &[String]) -> Self {
        let mut sets = Self::default();
        for id in active {
            sets.accept(id);
        }
        for id in complete {
            sets.complete(id);
        }
        sets
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accept_then_complete_leaves_id_only_in_complete() {
        let mut sets = QuestSets::default();
        assert!(sets.accept("AWAKENING"));
        assert!(sets.complete("AWAKENING"));

        assert!(!sets.is_active("AWAKENING"));
        assert!(sets.is_complete("AWAKENING"));
    }

    #[test]
    fn accept_and_complete_are_idempotent() {
        let mut sets = QuestSets::default();
        assert!(sets.accept("AWAKENING"));
        assert!(!sets.accept("AWAKENING"));
        assert!(sets.complete("AWAKENING"));
        let after_first = sets.clone();
        assert!(!sets.complete("AWAKENING"));
        assert_eq!(sets, after_first);
    }

    #[test]
    fn complete_without_accept_is_allowed() {
        let mut sets = QuestSets::default();
        assert!(sets.complete("RISING_ACTION"));
        assert!(sets.is_complete("RISING_ACTION"));
        assert!(!sets.is_active("RISING_ACTION"));
    }

    #[test]
    fn explicit_accept_reopens_completed_quest() {
        let mut sets = QuestSets::default();
        sets.complete("AWAKENING");
        assert!(sets.accept("AWAKENING"));
        assert!(sets.is_active("AWAKENING"));
        assert!(!sets.is_complete("AWAKENING"));
    }

    #[test]
    fn empty_ids_are_ignored() {
        let mut sets = QuestSets::default();
        assert!(!sets.accept(""));
        assert!(!sets.complete(""));
        assert_eq!(sets, QuestSets::default());
    }

    #[test]
    fn from_lists_keeps_sets_disjoint() {
        let sets = QuestSets::from_lists(
            &["A".to_string(), "B".to_string()],
            &["B".to_string()],
        );
        assert_eq!(sets.active_ids().collect::<Vec<_>>(), vec!["A"]);
        assert_eq!(sets.complete_ids().collect::<Vec<_>>(), vec!["B"]);
    }

    #[test]
    fn quest_from_def_starts_incomplete() {
        let def = QuestDef {
            id: "AWAKENING".to_string(),
            title: "A Stranger's Arrival".to_string(),
            objective: "Introduce yourself to the Village Elder.".to_string(),
            npc: Some("Village Elder".to_string()),
            reward_xp: 100,
        };
        let quest = Quest::from(&def);
        assert!(!quest.is_complete);
        assert_eq!(quest.reward_xp, 100);
        assert_eq!(quest.npc.as_deref(), Some("Village Elder"));
    }
}
