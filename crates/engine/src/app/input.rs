#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InputAction {
    MoveForward,
    MoveBack,
    MoveLeft,
    MoveRight,
    OrbitLeft,
    OrbitRight,
    OrbitUp,
    OrbitDown,
    Quit,
}

const ACTION_COUNT: usize = 9;

#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct ActionStates {
    down: [bool; ACTION_COUNT],
}

impl ActionStates {
    pub(crate) fn set(&mut self, action: InputAction, is_down: bool) {
        self.down[action.index()] = is_down;
    }

    pub(crate) fn is_down(&self, action: InputAction) -> bool {
        self.down[action.index()]
    }
}

impl InputAction {
    const fn index(self) -> usize {
        match self {
            InputAction::MoveForward => 0,
            InputAction::MoveBack => 1,
            InputAction::MoveLeft => 2,
            InputAction::MoveRight => 3,
            InputAction::OrbitLeft => 4,
            InputAction::OrbitRight => 5,
            InputAction::OrbitUp => 6,
            InputAction::OrbitDown => 7,
            InputAction::Quit => 8,
        }
    }
}

/// Edge detector for a single button: reports one press per down transition,
/// no matter how many repeat or bounce events arrive before it is consumed.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct PressEdge {
    is_down: bool,
    pressed: bool,
}

impl PressEdge {
    pub(crate) fn handle(&mut self, is_pressed: bool) {
        if is_pressed {
            if !self.is_down {
                self.pressed = true;
            }
            self.is_down = true;
        } else {
            self.is_down = false;
        }
    }

    pub(crate) fn take(&mut self) -> bool {
        std::mem::take(&mut self.pressed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn held_button_reports_one_edge() {
        let mut edge = PressEdge::default();
        edge.handle(true);
        edge.handle(true);
        assert!(edge.take());
        edge.handle(true);
        assert!(!edge.take());
    }

    #[test]
    fn press_release_press_before_consume_reports_one_edge() {
        let mut edge = PressEdge::default();
        edge.handle(true);
        edge.handle(false);
        edge.handle(true);
        assert!(edge.take());
        assert!(!edge.take());
    }

    #[test]
    fn action_states_track_each_action_independently() {
        let mut states = ActionStates::default();
        states.set(InputAction::MoveForward, true);
        states.set(InputAction::OrbitLeft, true);
        states.set(InputAction::OrbitLeft, false);
        assert!(states.is_down(InputAction::MoveForward));
        assert!(!states.is_down(InputAction::OrbitLeft));
        assert!(!states.is_down(InputAction::Quit));
    }
}
