use std::collections::HashMap;

use crate::app::Vec3;

#[derive(Debug, Clone, PartialEq)]
pub struct NpcDef {
    pub name: String,
    pub position: Vec3,
    pub interact_radius: f32,
    pub color: [u8; 4],
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuestDef {
    pub id: String,
    pub title: String,
    pub objective: String,
    /// Name of the NPC who hands the quest out.
    pub npc: Option<String>,
    pub reward_xp: u32,
}

/// Compiled village content. NPCs keep file order, which is also the order
/// they are registered for picking.
#[derive(Debug, Default, Clone)]
pub struct VillageDatabase {
    npcs: Vec<NpcDef>,
    quests: Vec<QuestDef>,
    npc_index_by_name: HashMap<String, usize>,
    quest_index_by_id: HashMap<String, usize>,
}

impl VillageDatabase {
    pub fn new(npcs: Vec<NpcDef>, quests: Vec<QuestDef>) -> Self {
        let npc_index_by_name = npcs
            .iter()
            .enumerate()
            .map(|(index, npc)| (npc.name.clone(), index))
            .collect();
        let quest_index_by_id = quests
            .iter()
            .enumerate()
            .map(|(index, quest)| (quest.id.clone(), index))
            .collect();
        Self {
            npcs,
            quests,
            npc_index_by_name,
            quest_index_by_id,
        }
    }

    pub fn npcs(&self) -> &[NpcDef] {
        &self.npcs
    }

    pub fn quests(&self) -> &[QuestDef] {
        &self.quests
    }

    pub fn npc(&self, name: &str) -> Option<&NpcDef> {
        self.npc_index_by_name
            .get(name)
            .and_then(|index| self.npcs.get(*index))
    }

    pub fn quest(&self, id: &str) -> Option<&QuestDef> {
        self.quest_index_by_id
            .get(id)
            .and_then(|index| self.quests.get(*index))
    }

    pub fn quests_offered_by<'a>(
        &'a self,
        npc_name: &'a str,
    ) -> impl Iterator<Item = &'a QuestDef> {
        self.quests
            .iter()
            .filter(move |quest| quest.npc.as_deref() == Some(npc_name))
    }
}
