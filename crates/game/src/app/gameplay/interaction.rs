use engine::{EntityId, VillageDatabase};
use tracing::{debug, info, warn};

use super::dialogue::{DialogueAction, DialogueLibrary, DialoguePayload};
use super::proximity::ProximityCandidate;
use super::quest::Quest;
use super::state::GameState;
use super::ui::UiPanelHost;

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum TriggerState {
    Idle,
    Eligible {
        entity: EntityId,
        npc_name: String,
    },
    DialogueOpen {
        entity: EntityId,
        npc_name: String,
        payload: DialoguePayload,
    },
}

/// Player responses while a dialogue is open.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum UiAction {
    ChooseOption(usize),
    Close,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct DispatchOutcome {
    pub(crate) closed: bool,
    pub(crate) quest_changed: bool,
}

/// Per-tick inputs. `interact_pressed` and `click_pressed` are press edges.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct TriggerInput<'a> {
    pub(crate) candidate: Option<&'a ProximityCandidate>,
    pub(crate) hovered: Option<EntityId>,
    pub(crate) interact_pressed: bool,
    pub(crate) click_pressed: bool,
}

#[derive(Debug)]
pub(crate) struct InteractionTrigger {
    state: TriggerState,
}

impl Default for InteractionTrigger {
    fn default() -> Self {
        Self {
            state: TriggerState::Idle,
        }
    }
}

impl InteractionTrigger {
    pub(crate) fn state(&self) -> &TriggerState {
        &self.state
    }

    pub(crate) fn is_dialogue_open(&self) -> bool {
        matches!(self.state, TriggerState::DialogueOpen { .. })
    }

    /// Advances Idle/Eligible from this tick's candidate and input. An open
    /// dialogue only leaves through [`InteractionTrigger::dispatch`]. Returns
    /// true when a dialogue opened.
    pub(crate) fn tick(
        &mut self,
        input: TriggerInput<'_>,
        dialogue: &DialogueLibrary,
        ui: &mut impl UiPanelHost,
    ) -> bool {
        if self.is_dialogue_open() {
            return false;
        }

        let Some(candidate) = input.candidate else {
            if !matches!(self.state, TriggerState::Idle) {
                ui.hide_prompt();
                debug!("interaction_idle");
                self.state = TriggerState::Idle;
            }
            return false;
        };

        let already_eligible = matches!(
            &self.state,
            TriggerState::Eligible { entity, .. } if *entity == candidate.id
        );
        if !already_eligible {
            ui.show_prompt(&candidate.name);
            debug!(npc = %candidate.name, "interaction_eligible");
            self.state = TriggerState::Eligible {
                entity: candidate.id,
                npc_name: candidate.name.clone(),
            };
        }

        let clicked_on_candidate = input.click_pressed && input.hovered == Some(candidate.id);
        if !input.interact_pressed && !clicked_on_candidate {
            return false;
        }

        let Some(payload) = dialogue.dialogue_for(&candidate.name) else {
            debug!(npc = %candidate.name, "dialogue_not_loaded");
            return false;
        };
        ui.hide_prompt();
        ui.open_dialogue(&candidate.name, &payload);
        info!(
            npc = %candidate.name,
            line_count = payload.lines.len(),
            option_count = payload.options.len(),
            "dialogue_opened"
        );
        self.state = TriggerState::DialogueOpen {
            entity: candidate.id,
            npc_name: candidate.name.clone(),
            payload,
        };
        true
    }

    /// Applies a dialogue response. Quest actions mutate `game` before the
    /// dialogue closes; option indices outside the payload are ignored.
    pub(crate) fn dispatch(
        &mut self,
        action: UiAction,
        game: &mut GameState,
        catalog: &VillageDatabase,
        ui: &mut impl UiPanelHost,
    ) -> DispatchOutcome {
        let TriggerState::DialogueOpen {
            entity,
            npc_name,
            payload,
        } = &self.state
        else {
            return DispatchOutcome::default();
        };

        let quest_changed = match action {
            UiAction::Close => false,
            UiAction::ChooseOption(index) => {
                let Some(option) = payload.options.get(index) else {
                    debug!(npc = %npc_name, index, "dialogue_option_out_of_range");
                    return DispatchOutcome::default();
                };
                match (option.action, option.quest_id.as_deref()) {
                    (DialogueAction::Close, _) => false,
                    (DialogueAction::AcceptQuest, Some(quest_id)) => {
                        accept_from_catalog(game, catalog, quest_id)
                    }
                    (DialogueAction::CompleteQuest, Some(quest_id)) => {
                        let changed = game.complete_quest(quest_id);
                        info!(quest = quest_id, changed, "quest_completed");
                        changed
                    }
                    (DialogueAction::AcceptQuest | DialogueAction::CompleteQuest, None) => {
                        warn!(
                            npc = %npc_name,
                            text = %option.text,
                            "dialogue_option_missing_quest_id"
                        );
                        false
                    }
                    (DialogueAction::Unknown, _) => {
                        warn!(npc = %npc_name, text = %option.text, "dialogue_action_unknown");
                        false
                    }
                }
            }
        };

        info!(entity = entity.0, npc = %npc_name, "dialogue_closed");
        ui.close_dialogue();
        self.state = TriggerState::Idle;
        DispatchOutcome {
            closed: true,
            quest_changed,
        }
    }
}

fn accept_from_catalog(game: &mut GameState, catalog: &VillageDatabase, quest_id: &str) -> bool {
    let offered = match catalog.quest(quest_id) {
        Some(def) => game.offer_quest(Quest::from(def)),
        None => {
            warn!(quest = quest_id, "quest_not_in_catalog");
            false
        }
    };
    let accepted = game.accept_quest(quest_id);
    info!(quest = quest_id, changed = offered || accepted, "quest_accepted");
    offered || accepted
}
