use engine::SceneOverlay;

use super::dialogue::DialoguePayload;

/// Visible panel state driven by the interaction trigger.
pub(crate) trait UiPanelHost {
    fn show_prompt(&mut self, npc_name: &str);
    fn hide_prompt(&mut self);
    fn open_dialogue(&mut self, npc_name: &str, payload: &DialoguePayload);
    fn close_dialogue(&mut self);
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct OpenDialogue {
    pub(crate) npc_name: String,
    pub(crate) payload: DialoguePayload,
}

/// Panel host that keeps its state in memory for the renderer and window
/// title to read back.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct PanelState {
    prompt: Option<String>,
    dialogue: Option<OpenDialogue>,
}

impl PanelState {
    #[cfg(test)]
    pub(crate) fn prompt(&self) -> Option<&str> {
        self.prompt.as_deref()
    }

    #[cfg(test)]
    pub(crate) fn dialogue(&self) -> Option<&OpenDialogue> {
        self.dialogue.as_ref()
    }

    pub(crate) fn overlay(&self) -> SceneOverlay {
        SceneOverlay {
            prompt_visible: self.prompt.is_some(),
            dialogue_line_count: self
                .dialogue
                .as_ref()
                .map_or(0, |open| open.payload.lines.len()),
            dialogue_option_count: self
                .dialogue
                .as_ref()
                .map_or(0, |open| open.payload.options.len()),
            dialogue_open: self.dialogue.is_some(),
        }
    }

    /// One-line rendering of the panels, shown in the window title.
    pub(crate) fn title_text(&self) -> Option<String> {
        if let Some(open) = &self.dialogue {
            let lines = open.payload.lines.join(" ");
            let options = open
                .payload
                .options
                .iter()
                .enumerate()
                .map(|(index, option)| format!("[{}] {}", index + 1, option.text))
                .collect::<Vec<_>>()
                .join(" ");
            return Some(format!("{}: {lines} | {options}", open.npc_name));
        }
        self.prompt
            .as_ref()
            .map(|name| format!("Press E to talk to {name}"))
    }
}

impl UiPanelHost for PanelState {
    fn show_prompt(&mut self, npc_name: &str) {
        self.prompt = Some(npc_name.to_string());
    }

    fn hide_prompt(&mut self) {
        self.prompt = None;
    }

    fn open_dialogue(&mut self, npc_name: &str, payload: &DialoguePayload) {
        self.dialogue = Some(OpenDialogue {
            npc_name: npc_name.to_string(),
            payload: payload.clone(),
        });
    }

    fn close_dialogue(&mut self) {
        self.dialogue = None;
    }
}
