use std::collections::BTreeMap;

use engine::{
    EntityId, InputSnapshot, Interactable, OrbitRig, PickingService, RenderableKind, Scene,
    SceneCommand, SceneOverlay, SceneWorld, Transform, Vec3, Viewport, VillageDatabase,
};
use tracing::{debug, info, warn};

use super::avatar::{apply_movement_input, apply_orbit_input, AVATAR_SPAWN};
use super::dialogue::DialogueLibrary;
use super::interaction::{InteractionTrigger, TriggerInput, UiAction};
use super::proximity::{select_candidate, ProximityCandidate};
use super::save::GameStateStore;
use super::state::GameState;
use super::ui::PanelState;

pub(crate) const AVATAR_NAME: &str = "Avatar";
const SCENE_NAME: &str = "village";

/// The village: one avatar, the catalog's NPCs, and the interaction loop
/// that connects them to quest state.
pub(crate) struct VillageScene {
    catalog: VillageDatabase,
    dialogue: DialogueLibrary,
    store: GameStateStore,
    state: GameState,
    picking: PickingService,
    trigger: InteractionTrigger,
    panels: PanelState,
    rig: OrbitRig,
    avatar_id: Option<EntityId>,
    npc_ids: BTreeMap<EntityId, String>,
}

impl VillageScene {
    pub(crate) fn new(
        catalog: VillageDatabase,
        dialogue: DialogueLibrary,
        store: GameStateStore,
    ) -> Self {
        Self {
            catalog,
            dialogue,
            store,
            state: GameState::default(),
            picking: PickingService::default(),
            trigger: InteractionTrigger::default(),
            panels: PanelState::default(),
            rig: OrbitRig::default(),
            avatar_id: None,
            npc_ids: BTreeMap::new(),
        }
    }

    #[cfg(test)]
    pub(crate) fn state(&self) -> &GameState {
        &self.state
    }

    #[cfg(test)]
    pub(crate) fn trigger(&self) -> &InteractionTrigger {
        &self.trigger
    }

    #[cfg(test)]
    pub(crate) fn panels(&self) -> &PanelState {
        &self.panels
    }

    #[cfg(test)]
    pub(crate) fn avatar_id(&self) -> Option<EntityId> {
        self.avatar_id
    }

    pub(crate) fn save_game(&mut self) -> bool {
        self.store.save_game(&self.state.snapshot())
    }

    /// Replaces in-memory state with the stored save. Leaves state untouched
    /// when there is nothing valid to load.
    pub(crate) fn load_game(&mut self) -> bool {
        let Some(snapshot) = self.store.load_game() else {
            return false;
        };
        match GameState::from_snapshot(&snapshot) {
            Ok(state) => {
                self.state = state;
                info!(
                    scene = SCENE_NAME,
                    quest_count = self.state.quests().len(),
                    "save_loaded"
                );
                true
            }
            Err(error) => {
                warn!(scene = SCENE_NAME, error = %error, "load_apply_failed");
                false
            }
        }
    }

    /// Candidates in registration order, read from the world each tick.
    fn proximity_candidates(&self, world: &SceneWorld) -> Vec<ProximityCandidate> {
        self.picking
            .candidates()
            .iter()
            .filter_map(|id| world.find_entity(*id))
            .filter_map(|entity| {
                entity.interactable.map(|interactable| ProximityCandidate {
                    id: entity.id,
                    name: entity.name.clone(),
                    position: entity.transform.position,
                    interaction_radius: interactable.interaction_radius,
                })
            })
            .collect()
    }

    fn avatar_position(&self, world: &SceneWorld) -> Option<Vec3> {
        self.avatar_id
            .and_then(|id| world.find_entity(id))
            .map(|entity| entity.transform.position)
    }

    fn autosave(&mut self) {
        if !self.save_game() {
            debug!(scene = SCENE_NAME, "autosave_skipped");
        }
    }

    /// Q closes the panel; a digit picks an option. Close wins when both land
    /// in one tick. Returns whether the dialogue closed.
    fn handle_dialogue_input(&mut self, input: &InputSnapshot) -> bool {
        let action = if input.close_pressed() {
            UiAction::Close
        } else if let Some(index) = input.option_pressed() {
            UiAction::ChooseOption(usize::from(index))
        } else {
            return false;
        };
        let outcome = self.trigger.dispatch(
            action,
            &mut self.state,
            &self.catalog,
            &mut self.panels,
        );
        if outcome.quest_changed {
            self.autosave();
        }
        outcome.closed
    }
}

impl Scene for VillageScene {
    fn load(&mut self, world: &mut SceneWorld) {
        world.clear();
        self.npc_ids.clear();
        self.trigger = InteractionTrigger::default();
        self.panels = PanelState::default();
        self.picking = PickingService::default();

        self.avatar_id = Some(world.spawn(
            AVATAR_NAME,
            Transform::at(AVATAR_SPAWN),
            RenderableKind::Avatar,
        ));
        for npc in self.catalog.npcs() {
            let id = world.spawn_interactable(
                npc.name.clone(),
                Transform::at(npc.position),
                RenderableKind::Marker { color: npc.color },
                Interactable {
                    interaction_radius: npc.interact_radius,
                },
            );
            self.npc_ids.insert(id, npc.name.clone());
        }
        world.apply_pending();
        self.picking.register_candidates(world.interactable_ids());
        world.set_camera(self.rig.camera_for(AVATAR_SPAWN));

        if self.store.has_saved_game() && !self.load_game() {
            warn!(scene = SCENE_NAME, "saved_game_ignored");
        }

        info!(
            scene = SCENE_NAME,
            entity_count = world.entity_count(),
            npc_count = self.npc_ids.len(),
            quest_catalog = self.catalog.quests().len(),
            "scene_loaded"
        );
    }

    fn update(
        &mut self,
        fixed_dt_seconds: f32,
        input: &InputSnapshot,
        world: &mut SceneWorld,
    ) -> SceneCommand {
        self.dialogue.poll();

        if input.save_pressed() {
            self.save_game();
        }
        if input.load_pressed() && !self.load_game() {
            debug!(scene = SCENE_NAME, "load_skipped");
        }

        let mut dialogue_closed = false;
        if self.trigger.is_dialogue_open() {
            dialogue_closed = self.handle_dialogue_input(input);
        } else if let Some(index) = input.option_pressed() {
            if self.state.select_quest(usize::from(index)) {
                debug!(scene = SCENE_NAME, index, "quest_selected");
                self.autosave();
            }
        }

        apply_orbit_input(&mut self.rig, input, fixed_dt_seconds);
        if !self.trigger.is_dialogue_open() {
            if let Some(avatar) = self.avatar_id.and_then(|id| world.find_entity_mut(id)) {
                apply_movement_input(&mut avatar.transform, &self.rig, input, fixed_dt_seconds);
            }
        }
        let Some(avatar_position) = self.avatar_position(world) else {
            return SceneCommand::None;
        };
        world.set_camera(self.rig.camera_for(avatar_position));

        self.picking.set_pointer_px(
            input.cursor_position_px(),
            Viewport::from_window_size(input.window_size()),
        );
        let hovered = self.picking.update(world);

        let candidates = self.proximity_candidates(world);
        let candidate = select_candidate(avatar_position, &candidates, hovered);
        if !self.trigger.is_dialogue_open() {
            self.state
                .set_interactable(candidate.map(|candidate| candidate.name.as_str()));
        }

        self.trigger.tick(
            TriggerInput {
                candidate,
                hovered,
                interact_pressed: input.interact_pressed() && !dialogue_closed,
                click_pressed: input.left_click_pressed() && !dialogue_closed,
            },
            &self.dialogue,
            &mut self.panels,
        );

        if input.quit_requested() {
            return SceneCommand::Quit;
        }
        SceneCommand::None
    }

    fn unload(&mut self, world: &mut SceneWorld) {
        if !self.save_game() {
            warn!(scene = SCENE_NAME, "exit_save_failed");
        }
        let owned = self
            .avatar_id
            .take()
            .into_iter()
            .chain(std::mem::take(&mut self.npc_ids).into_keys());
        for id in owned {
            self.picking.unregister(id);
            world.despawn(id);
        }
        world.apply_pending();
        info!(
            scene = SCENE_NAME,
            entity_count = world.entity_count(),
            near = ?self.state.can_interact_with(),
            "scene_unloaded"
        );
    }

    fn debug_title(&self, _world: &SceneWorld) -> Option<String> {
        let panel_text = self.panels.title_text();
        let quest_text = self
            .state
            .current_quest_index()
            .zip(self.state.current_quest())
            .map(|(index, quest)| {
                let combat = if self.state.is_combat_active() {
                    " [combat]"
                } else {
                    ""
                };
                format!(
                    "Quest {}/{}: {} - {}{combat}",
                    index + 1,
                    self.state.quests().len(),
                    quest.title,
                    quest.objective
                )
            });
        match (panel_text, quest_text) {
            (Some(panel), Some(quest)) => Some(format!("{panel} || {quest}")),
            (panel, quest) => panel.or(quest),
        }
    }

    fn overlay(&self) -> SceneOverlay {
        self.panels.overlay()
    }
}
