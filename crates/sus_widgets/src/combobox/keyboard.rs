//! Keyboard navigation for the combobox input

use sus_core::KeyCode;

use super::machine::{ComboboxAction, ComboboxState, Lifecycle};

/// What a key press asks of the input
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct KeyOutcome {
    pub prevent_default: bool,
    pub action: Option<ComboboxAction>,
}

impl KeyOutcome {
    fn ignore() -> Self {
        Self::default()
    }

    fn prevent() -> Self {
        Self {
            prevent_default: true,
            action: None,
        }
    }

    fn prevent_and(action: ComboboxAction) -> Self {
        Self {
            prevent_default: true,
            action: Some(action),
        }
    }
}

/// Map a key press to an action given the current state
pub fn handle_key(key: KeyCode, state: &ComboboxState) -> KeyOutcome {
    let options = &state.options;
    match key {
        KeyCode::DOWN => {
            if options.is_empty() {
                return KeyOutcome::prevent();
            }
            if state.lifecycle == Lifecycle::Idle {
                return KeyOutcome::prevent_and(ComboboxAction::Navigate(None));
            }
            let next = match state.navigated_index() {
                Some(index) if index == options.len() - 1 => None,
                Some(index) => Some(options[index + 1].clone()),
                None => Some(options[0].clone()),
            };
            KeyOutcome::prevent_and(ComboboxAction::Navigate(next))
        }
        KeyCode::UP => {
            if options.is_empty() {
                return KeyOutcome::prevent();
            }
            if state.lifecycle == Lifecycle::Idle {
                return KeyOutcome::prevent_and(ComboboxAction::Navigate(None));
            }
            let next = match state.navigated_index() {
                Some(0) => None,
                Some(index) => Some(options[index - 1].clone()),
                None => options.last().cloned(),
            };
            KeyOutcome::prevent_and(ComboboxAction::Navigate(next))
        }
        KeyCode::ESCAPE if state.lifecycle != Lifecycle::Idle => KeyOutcome {
            prevent_default: false,
            action: Some(ComboboxAction::Close),
        },
        KeyCode::ENTER
            if state.lifecycle == Lifecycle::Navigating && state.navigated_value.is_some() =>
        {
            KeyOutcome::prevent_and(ComboboxAction::SelectWithKeyboard)
        }
        _ => KeyOutcome::ignore(),
    }
}
