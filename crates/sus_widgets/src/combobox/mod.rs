//! Combobox ("dropout")
//!
//! An accessible autocomplete built from four collaborating pieces:
//!
//! - [`ComboboxHandle`]: interaction state and the state machine, created
//!   against a host [`Document`] and shared by the fragments
//! - [`ComboboxInput`]: the text field, keyboard navigation and blur handling
//! - [`ComboboxList`]: the listbox, rendered into a body portal anchored
//!   under the input
//! - [`ComboboxOption`]: one selectable value
//!
//! # Example
//!
//! ```rust
//! use sus_core::{Document, Event, KeyCode, Rect, Size};
//! use sus_widgets::combobox::{ComboboxHandle, ComboboxInput, ComboboxList, ComboboxOption, Lifecycle};
//! use sus_widgets::Widget;
//!
//! let doc = Document::shared(Size::new(800.0, 600.0));
//! let combobox = ComboboxHandle::new(&doc);
//! let input = ComboboxInput::new(&combobox);
//! let list = ComboboxList::new(&combobox)
//!     .options(["apple", "apricot"].map(ComboboxOption::new));
//!
//! doc.set_rect(combobox.input_node(), Rect::new(10.0, 10.0, 200.0, 30.0));
//! list.mount();
//!
//! input.handle_event(&mut Event::key_down(combobox.input_node(), KeyCode::DOWN));
//! input.handle_event(&mut Event::key_down(combobox.input_node(), KeyCode::DOWN));
//! assert_eq!(combobox.lifecycle(), Lifecycle::Navigating);
//! assert_eq!(combobox.displayed_value(), "apple");
//! assert_eq!(doc.body().len(), 1);
//! ```

mod input;
mod keyboard;
mod list;
mod machine;
mod option;

pub use input::{ComboboxInput, ComboboxInputConfig};
pub use keyboard::{handle_key, KeyOutcome};
pub use list::ComboboxList;
pub use machine::{chart, reduce, ActionKind, ComboboxAction, ComboboxState, Lifecycle};
pub use option::ComboboxOption;

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use slotmap::{new_key_type, SlotMap};
use smallvec::SmallVec;
use sus_core::rect_observer::RectSubscriptionId;
use sus_core::{div, event_types, Document, Element, ListenerId, NodeId, Rect, StateMachine};
use tracing::{debug, trace};

new_key_type! {
    /// Handle for a state change subscription
    pub struct StateSubscription;
}

/// Called after every accepted action and anchor change
pub type StateListener = Rc<dyn Fn(&ComboboxState)>;

/// Called with the value chosen by click or keyboard
pub type SelectCallback = Rc<dyn Fn(&str)>;

/// Option node pressed by the pointer and not yet released
#[derive(Debug, Default)]
struct PointerSession {
    target: Option<NodeId>,
}

impl PointerSession {
    fn press(&mut self, node: NodeId) {
        self.target = Some(node);
    }

    /// Forget the pressed node; true when the release happened elsewhere
    fn release(&mut self, target: NodeId) -> bool {
        matches!(self.target.take(), Some(pressed) if pressed != target)
    }

    fn clear(&mut self) {
        self.target = None;
    }
}

struct ComboboxInner {
    document: Rc<Document>,
    id: String,
    root_node: NodeId,
    input_node: NodeId,
    state: RefCell<ComboboxState>,
    machine: RefCell<StateMachine<Lifecycle, ActionKind>>,
    pointer: Rc<RefCell<PointerSession>>,
    input_rect: Cell<Option<Rect>>,
    resize_listener: Cell<Option<ListenerId>>,
    rect_subscription: Cell<Option<RectSubscriptionId>>,
    listeners: RefCell<SlotMap<StateSubscription, StateListener>>,
    on_select: RefCell<Option<SelectCallback>>,
}

impl Drop for ComboboxInner {
    fn drop(&mut self) {
        if let Some(id) = self.resize_listener.take() {
            self.document.remove_listener(id);
        }
        if let Some(id) = self.rect_subscription.take() {
            self.document.unobserve_rect(id);
        }
        debug!(id = %self.id, "combobox released");
    }
}

/// Shared combobox state, threaded to each fragment
#[derive(Clone)]
pub struct ComboboxHandle {
    inner: Rc<ComboboxInner>,
}

impl ComboboxHandle {
    pub fn new(document: &Rc<Document>) -> Self {
        let pointer = Rc::new(RefCell::new(PointerSession::default()));
        let mut machine = StateMachine::new(chart().clone());
        let session = pointer.clone();
        machine.on_enter(Lifecycle::Idle, move || session.borrow_mut().clear());

        let inner = Rc::new(ComboboxInner {
            document: document.clone(),
            id: document.next_instance_id("dropout"),
            root_node: document.alloc_node(),
            input_node: document.alloc_node(),
            state: RefCell::new(ComboboxState::default()),
            machine: RefCell::new(machine),
            pointer,
            input_rect: Cell::new(None),
            resize_listener: Cell::new(None),
            rect_subscription: Cell::new(None),
            listeners: RefCell::new(SlotMap::with_key()),
            on_select: RefCell::new(None),
        });

        let weak = Rc::downgrade(&inner);
        let resize = document.add_listener(event_types::RESIZE, move |_| {
            if let Some(handle) = Self::upgrade(&weak) {
                handle.measure_input();
            }
        });
        let weak = Rc::downgrade(&inner);
        let moved = document.observe_rect(inner.input_node, move |_| {
            if let Some(handle) = Self::upgrade(&weak) {
                handle.measure_input();
            }
        });
        inner.resize_listener.set(Some(resize));
        inner.rect_subscription.set(Some(moved));

        debug!(id = %inner.id, "combobox created");
        Self { inner }
    }

    fn upgrade(weak: &Weak<ComboboxInner>) -> Option<Self> {
        weak.upgrade().map(|inner| Self { inner })
    }

    // =========================================================================
    // Identity
    // =========================================================================

    pub fn document(&self) -> &Rc<Document> {
        &self.inner.document
    }

    /// Instance id, `dropout-<n>`
    pub fn id(&self) -> &str {
        &self.inner.id
    }

    pub fn menu_id(&self) -> String {
        format!("{}-menu", self.inner.id)
    }

    pub fn input_id(&self) -> String {
        format!("{}-input", self.inner.id)
    }

    pub fn item_id(&self, index: usize) -> String {
        format!("{}-item-{}", self.inner.id, index)
    }

    pub fn root_node(&self) -> NodeId {
        self.inner.root_node
    }

    pub fn input_node(&self) -> NodeId {
        self.inner.input_node
    }

    // =========================================================================
    // State
    // =========================================================================

    pub fn state(&self) -> ComboboxState {
        self.inner.state.borrow().clone()
    }

    pub fn lifecycle(&self) -> Lifecycle {
        self.inner.state.borrow().lifecycle
    }

    pub fn is_open(&self) -> bool {
        self.lifecycle().is_visible()
    }

    pub fn typed_value(&self) -> String {
        self.inner.state.borrow().typed_value.clone()
    }

    pub fn navigated_value(&self) -> Option<String> {
        self.inner.state.borrow().navigated_value.clone()
    }

    /// Value the input shows
    pub fn displayed_value(&self) -> String {
        self.inner.state.borrow().displayed_value().to_string()
    }

    /// Id of the option matching the navigated value while open
    pub fn active_descendant(&self) -> Option<String> {
        let state = self.inner.state.borrow();
        if !state.is_open() {
            return None;
        }
        state.navigated_index().map(|index| self.item_id(index))
    }

    /// Option values from the most recent list render
    pub fn options(&self) -> Vec<String> {
        self.inner.state.borrow().options.clone()
    }

    pub(crate) fn set_options(&self, options: Vec<String>) {
        self.inner.state.borrow_mut().options = options;
    }

    /// Transitions taken so far, oldest first
    pub fn history(&self) -> Vec<(Lifecycle, ActionKind, Lifecycle)> {
        self.inner.machine.borrow().history()
    }

    /// Feed an action through the state machine.
    ///
    /// Returns false when the action is not valid in the current lifecycle;
    /// nothing changes in that case.
    pub fn dispatch(&self, action: ComboboxAction) -> bool {
        let kind = action.kind();
        if !self.inner.state.borrow().permits(&action) {
            trace!(id = %self.inner.id, ?kind, "action dropped by guard");
            return false;
        }

        let next = self.inner.machine.borrow_mut().send(kind);
        let Some(next) = next else {
            trace!(id = %self.inner.id, ?kind, lifecycle = ?self.lifecycle(), "action dropped");
            return false;
        };

        let (opened, selected) = {
            let mut state = self.inner.state.borrow_mut();
            let opened = !state.lifecycle.is_visible() && next.is_visible();
            let selected = match &action {
                ComboboxAction::SelectWithClick(value) => Some(value.clone()),
                ComboboxAction::SelectWithKeyboard => state.navigated_value.clone(),
                _ => None,
            };
            state.apply(action, next);
            (opened, selected)
        };

        if opened {
            self.refresh_rect();
        }

        if let Some(value) = selected {
            debug!(id = %self.inner.id, %value, "option selected");
            let callback = self.inner.on_select.borrow().clone();
            if let Some(callback) = callback {
                callback(&value);
            }
        }

        self.notify();
        true
    }

    /// Called with the chosen value after a click or keyboard selection
    pub fn on_select<F>(&self, callback: F)
    where
        F: Fn(&str) + 'static,
    {
        *self.inner.on_select.borrow_mut() = Some(Rc::new(callback));
    }

    pub fn subscribe<F>(&self, listener: F) -> StateSubscription
    where
        F: Fn(&ComboboxState) + 'static,
    {
        self.inner.listeners.borrow_mut().insert(Rc::new(listener))
    }

    pub fn unsubscribe(&self, id: StateSubscription) -> bool {
        self.inner.listeners.borrow_mut().remove(id).is_some()
    }

    fn notify(&self) {
        let listeners: SmallVec<[StateListener; 2]> =
            self.inner.listeners.borrow().values().cloned().collect();
        if listeners.is_empty() {
            return;
        }
        let state = self.state();
        for listener in listeners {
            listener(&state);
        }
    }

    // =========================================================================
    // Anchoring
    // =========================================================================

    /// Last measured rect of the input
    pub fn input_rect(&self) -> Option<Rect> {
        self.inner.input_rect.get()
    }

    fn refresh_rect(&self) -> bool {
        let rect = self.inner.document.rect(self.inner.input_node);
        let previous = self.inner.input_rect.replace(rect);
        if previous != rect {
            trace!(id = %self.inner.id, ?rect, "input measured");
            true
        } else {
            false
        }
    }

    /// Re-read the input rect from the host, notifying listeners on change
    pub fn measure_input(&self) -> Option<Rect> {
        if self.refresh_rect() {
            self.notify();
        }
        self.input_rect()
    }

    // =========================================================================
    // Pointer
    // =========================================================================

    /// Option node currently pressed, if any
    pub fn pressed_option(&self) -> Option<NodeId> {
        self.inner.pointer.borrow().target
    }

    pub(crate) fn press_option(&self, node: NodeId) {
        self.inner.pointer.borrow_mut().press(node);
    }

    /// A pointer was released on `target`. Releasing away from the pressed
    /// option cancels the pointer selection and closes the list.
    pub fn release_pointer(&self, target: NodeId) {
        let elsewhere = self.inner.pointer.borrow_mut().release(target);
        if elsewhere {
            trace!(id = %self.inner.id, ?target, "pointer released outside the pressed option");
            self.dispatch(ComboboxAction::CancelPointer);
        }
    }

    // =========================================================================
    // Rendering
    // =========================================================================

    /// Root `role=combobox` element around the given fragments
    pub fn render(&self, children: impl IntoIterator<Item = Element>) -> Element {
        let open = self.is_open();
        div()
            .node(self.inner.root_node)
            .attr("role", "combobox")
            .attr("aria-expanded", open.to_string())
            .attr("aria-haspopup", "listbox")
            .attr_opt("aria-owns", open.then(|| self.menu_id()))
            .children(children)
    }
}

impl std::fmt::Debug for ComboboxHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ComboboxHandle")
            .field("id", &self.inner.id)
            .field("state", &*self.inner.state.borrow())
            .finish()
    }
}
