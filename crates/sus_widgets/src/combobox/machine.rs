//! Combobox state chart and reducer

use std::sync::OnceLock;

use serde::{Deserialize, Serialize};
use sus_core::fsm::StateChart;

/// Interaction lifecycle of a combobox
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Lifecycle {
    #[default]
    Idle,
    Suggesting,
    Navigating,
    SelectingWithPointer,
}

impl Lifecycle {
    /// Whether the list is shown in this state
    pub fn is_visible(self) -> bool {
        !matches!(self, Lifecycle::Idle)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Lifecycle::Idle => "idle",
            Lifecycle::Suggesting => "suggesting",
            Lifecycle::Navigating => "navigating",
            Lifecycle::SelectingWithPointer => "selecting_with_pointer",
        }
    }
}

/// Something that happened to the combobox
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ComboboxAction {
    /// The user typed; carries the whole input value
    Change(String),
    /// Keyboard navigation; `None` returns to the typed value
    Navigate(Option<String>),
    /// Pointer pressed on an option
    MouseDown,
    /// Pointer pressed on an option and released somewhere else
    CancelPointer,
    Clear,
    Close,
    SelectWithKeyboard,
    SelectWithClick(String),
}

/// Event column of the state chart
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ActionKind {
    Change,
    Navigate,
    MouseDown,
    CancelPointer,
    Clear,
    Close,
    SelectWithKeyboard,
    SelectWithClick,
}

impl ComboboxAction {
    pub fn kind(&self) -> ActionKind {
        match self {
            ComboboxAction::Change(_) => ActionKind::Change,
            ComboboxAction::Navigate(_) => ActionKind::Navigate,
            ComboboxAction::MouseDown => ActionKind::MouseDown,
            ComboboxAction::CancelPointer => ActionKind::CancelPointer,
            ComboboxAction::Clear => ActionKind::Clear,
            ComboboxAction::Close => ActionKind::Close,
            ComboboxAction::SelectWithKeyboard => ActionKind::SelectWithKeyboard,
            ComboboxAction::SelectWithClick(_) => ActionKind::SelectWithClick,
        }
    }
}

/// The combobox transition table
pub fn chart() -> &'static StateChart<Lifecycle, ActionKind> {
    static CHART: OnceLock<StateChart<Lifecycle, ActionKind>> = OnceLock::new();
    CHART.get_or_init(|| {
        use ActionKind::*;
        use Lifecycle::*;

        StateChart::new(Idle)
            .on(Idle, Change, Suggesting)
            .on(Idle, Navigate, Navigating)
            .on(Idle, Clear, Idle)
            .on(Idle, Close, Idle)
            .on(Suggesting, Change, Suggesting)
            .on(Suggesting, Navigate, Navigating)
            .on(Suggesting, MouseDown, SelectingWithPointer)
            .on(Suggesting, Clear, Idle)
            .on(Suggesting, Close, Idle)
            .on(Navigating, Change, Suggesting)
            .on(Navigating, Navigate, Navigating)
            .on(Navigating, MouseDown, SelectingWithPointer)
            .on(Navigating, Clear, Idle)
            .on(Navigating, Close, Idle)
            .on(Navigating, SelectWithKeyboard, Idle)
            .on(SelectingWithPointer, SelectWithClick, Idle)
            .on(SelectingWithPointer, CancelPointer, Idle)
    })
}

/// Interaction state shared by the combobox fragments
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ComboboxState {
    pub lifecycle: Lifecycle,
    /// What the user typed (or last selected)
    pub typed_value: String,
    /// Option highlighted with the keyboard
    pub navigated_value: Option<String>,
    /// Option values of the most recent list render
    pub options: Vec<String>,
}

impl ComboboxState {
    /// Value shown in the input
    pub fn displayed_value(&self) -> &str {
        match (self.lifecycle, &self.navigated_value) {
            (Lifecycle::Navigating | Lifecycle::SelectingWithPointer, Some(nav)) => nav,
            _ => &self.typed_value,
        }
    }

    /// Index of the navigated value in the options, if it is one of them
    pub fn navigated_index(&self) -> Option<usize> {
        let nav = self.navigated_value.as_deref()?;
        self.options.iter().position(|o| o == nav)
    }

    pub fn is_open(&self) -> bool {
        self.lifecycle.is_visible()
    }

    /// Data guard layered over the chart: a keyboard selection needs a
    /// navigated value to select.
    pub(crate) fn permits(&self, action: &ComboboxAction) -> bool {
        !matches!(action, ComboboxAction::SelectWithKeyboard) || self.navigated_value.is_some()
    }

    /// Apply the data half of a transition already accepted by the chart
    pub(crate) fn apply(&mut self, action: ComboboxAction, next: Lifecycle) {
        match action {
            ComboboxAction::Change(value) | ComboboxAction::SelectWithClick(value) => {
                self.typed_value = value;
                self.navigated_value = None;
            }
            ComboboxAction::Navigate(value) => self.navigated_value = value,
            ComboboxAction::Clear => {
                self.typed_value.clear();
                self.navigated_value = None;
            }
            ComboboxAction::Close | ComboboxAction::CancelPointer => self.navigated_value = None,
            ComboboxAction::SelectWithKeyboard => {
                if let Some(value) = self.navigated_value.take() {
                    self.typed_value = value;
                }
            }
            ComboboxAction::MouseDown => {}
        }
        self.lifecycle = next;
    }
}

/// Pure reducer: the next state, or `None` when the chart does not list the
/// action for the current lifecycle (state and data stay unchanged).
pub fn reduce(state: &ComboboxState, action: ComboboxAction) -> Option<ComboboxState> {
    if !state.permits(&action) {
        return None;
    }
    let next = chart().next(state.lifecycle, action.kind())?;
    let mut state = state.clone();
    state.apply(action, next);
    Some(state)
}
