//! Event dispatch system
//!
//! Platform-agnostic events routed by the host document to widgets, plus the
//! registry used for document-level (global) listeners.

use std::rc::Rc;

use slotmap::{new_key_type, SlotMap};
use smallvec::SmallVec;

use crate::element::NodeId;

/// Event type identifier
pub type EventType = u32;

/// Common event types
pub mod event_types {
    use super::EventType;

    pub const POINTER_DOWN: EventType = 1;
    pub const POINTER_UP: EventType = 2;
    /// Pointer down + up on the same target
    pub const CLICK: EventType = 8;
    pub const FOCUS: EventType = 10;
    pub const BLUR: EventType = 11;
    pub const KEY_DOWN: EventType = 20;
    /// Committed value change of a text field
    pub const CHANGE: EventType = 23;
    pub const RESIZE: EventType = 40;
}

/// A UI event with associated data
#[derive(Clone, Debug)]
pub struct Event {
    pub event_type: EventType,
    pub target: NodeId,
    pub data: EventData,
    default_prevented: bool,
}

/// Event-specific data
#[derive(Clone, Debug, PartialEq)]
pub enum EventData {
    Pointer {
        x: f32,
        y: f32,
        button: u8,
    },
    Key {
        /// Virtual key code
        key: KeyCode,
    },
    /// New value of a text field
    Change {
        value: String,
    },
    Resize {
        width: f32,
        height: f32,
    },
    None,
}

impl Event {
    pub fn new(event_type: EventType, target: NodeId, data: EventData) -> Self {
        Self {
            event_type,
            target,
            data,
            default_prevented: false,
        }
    }

    pub fn key_down(target: NodeId, key: KeyCode) -> Self {
        Self::new(event_types::KEY_DOWN, target, EventData::Key { key })
    }

    /// Text field value change
    pub fn change(target: NodeId, value: impl Into<String>) -> Self {
        Self::new(
            event_types::CHANGE,
            target,
            EventData::Change {
                value: value.into(),
            },
        )
    }

    /// Primary-button pointer event at the origin
    pub fn pointer(event_type: EventType, target: NodeId) -> Self {
        Self::new(
            event_type,
            target,
            EventData::Pointer {
                x: 0.0,
                y: 0.0,
                button: 0,
            },
        )
    }

    pub fn click(target: NodeId) -> Self {
        Self::pointer(event_types::CLICK, target)
    }

    pub fn focus(target: NodeId) -> Self {
        Self::new(event_types::FOCUS, target, EventData::None)
    }

    pub fn blur(target: NodeId) -> Self {
        Self::new(event_types::BLUR, target, EventData::None)
    }

    /// Key code for keyboard events
    pub fn key(&self) -> Option<KeyCode> {
        match self.data {
            EventData::Key { key } => Some(key),
            _ => None,
        }
    }

    /// Value carried by a change event
    pub fn value(&self) -> Option<&str> {
        match &self.data {
            EventData::Change { value } => Some(value),
            _ => None,
        }
    }

    /// Suppress the host's default action and any internal handling that is
    /// wrapped behind a caller handler.
    pub fn prevent_default(&mut self) {
        self.default_prevented = true;
    }

    pub fn is_default_prevented(&self) -> bool {
        self.default_prevented
    }
}

/// Virtual key codes (platform-agnostic)
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub struct KeyCode(pub u32);

impl KeyCode {
    pub const BACKSPACE: KeyCode = KeyCode(0x08);
    pub const TAB: KeyCode = KeyCode(0x09);
    pub const ENTER: KeyCode = KeyCode(0x0D);
    pub const ESCAPE: KeyCode = KeyCode(0x1B);
    pub const SPACE: KeyCode = KeyCode(0x20);
    pub const DELETE: KeyCode = KeyCode(0x7F);

    // Arrow keys
    pub const LEFT: KeyCode = KeyCode(0x25);
    pub const UP: KeyCode = KeyCode(0x26);
    pub const RIGHT: KeyCode = KeyCode(0x27);
    pub const DOWN: KeyCode = KeyCode(0x28);

    // Navigation keys
    pub const HOME: KeyCode = KeyCode(0x24);
    pub const END: KeyCode = KeyCode(0x23);
    pub const PAGE_UP: KeyCode = KeyCode(0x21);
    pub const PAGE_DOWN: KeyCode = KeyCode(0x22);

    // Unknown/unmapped key
    pub const UNKNOWN: KeyCode = KeyCode(0);

    /// Map a DOM `KeyboardEvent.key` name to a key code.
    ///
    /// Single ASCII letters and digits map to their uppercase ASCII value.
    pub fn from_name(name: &str) -> KeyCode {
        match name {
            "ArrowDown" | "Down" => Self::DOWN,
            "ArrowUp" | "Up" => Self::UP,
            "ArrowLeft" | "Left" => Self::LEFT,
            "ArrowRight" | "Right" => Self::RIGHT,
            "Enter" => Self::ENTER,
            "Escape" | "Esc" => Self::ESCAPE,
            " " | "Space" | "Spacebar" => Self::SPACE,
            "Tab" => Self::TAB,
            "Backspace" => Self::BACKSPACE,
            "Delete" => Self::DELETE,
            "Home" => Self::HOME,
            "End" => Self::END,
            "PageUp" => Self::PAGE_UP,
            "PageDown" => Self::PAGE_DOWN,
            other => {
                let mut chars = other.chars();
                match (chars.next(), chars.next()) {
                    (Some(c), None) if c.is_ascii_alphanumeric() => {
                        KeyCode(c.to_ascii_uppercase() as u32)
                    }
                    _ => Self::UNKNOWN,
                }
            }
        }
    }
}

/// Event handler function type
pub type EventHandler = Rc<dyn Fn(&mut Event)>;

/// Run the caller's handler first, then the internal one unless the caller
/// prevented default.
pub fn wrap_event<F>(handler: Option<&EventHandler>, event: &mut Event, internal: F)
where
    F: FnOnce(&mut Event),
{
    if let Some(handler) = handler {
        handler(event);
    }

    if !event.is_default_prevented() {
        internal(event);
    }
}

new_key_type! {
    /// Handle for a registered global listener
    pub struct ListenerId;
}

struct Registration {
    event_type: EventType,
    /// Registration sequence; slots are reused so keys do not order listeners
    seq: u64,
    handler: EventHandler,
}

/// Registry of document-level listeners keyed by event type.
///
/// Handlers are handed out as cloned `Rc`s so that the owner can release its
/// borrow before invoking them; handlers are free to register or remove
/// listeners while running.
#[derive(Default)]
pub struct EventDispatcher {
    handlers: SlotMap<ListenerId, Registration>,
    next_seq: u64,
}

impl EventDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler for an event type
    pub fn register<F>(&mut self, event_type: EventType, handler: F) -> ListenerId
    where
        F: Fn(&mut Event) + 'static,
    {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.handlers.insert(Registration {
            event_type,
            seq,
            handler: Rc::new(handler),
        })
    }

    pub fn unregister(&mut self, id: ListenerId) -> bool {
        self.handlers.remove(id).is_some()
    }

    pub fn is_registered(&self, id: ListenerId) -> bool {
        self.handlers.contains_key(id)
    }

    /// Snapshot of the handlers for an event type, in registration order
    pub fn handlers_for(&self, event_type: EventType) -> SmallVec<[(ListenerId, EventHandler); 4]> {
        let mut registrations: SmallVec<[(ListenerId, &Registration); 4]> = self
            .handlers
            .iter()
            .filter(|(_, r)| r.event_type == event_type)
            .collect();
        registrations.sort_by_key(|(_, r)| r.seq);
        registrations
            .into_iter()
            .map(|(id, r)| (id, r.handler.clone()))
            .collect()
    }

    pub fn count(&self, event_type: EventType) -> usize {
        self.handlers
            .values()
            .filter(|r| r.event_type == event_type)
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    #[test]
    fn test_wrap_event_runs_caller_first() {
        let order = Rc::new(RefCell::new(Vec::new()));
        let order_clone = order.clone();
        let handler: EventHandler = Rc::new(move |_e: &mut Event| {
            order_clone.borrow_mut().push("caller");
        });

        let mut event = Event::focus(NodeId(1));
        wrap_event(Some(&handler), &mut event, |_| order.borrow_mut().push("internal"));

        assert_eq!(*order.borrow(), vec!["caller", "internal"]);
    }

    #[test]
    fn test_wrap_event_skips_internal_when_prevented() {
        let handler: EventHandler = Rc::new(|e: &mut Event| e.prevent_default());
        let mut ran = false;

        let mut event = Event::blur(NodeId(1));
        wrap_event(Some(&handler), &mut event, |_| ran = true);

        assert!(!ran);
        assert!(event.is_default_prevented());
    }

    #[test]
    fn test_key_names() {
        assert_eq!(KeyCode::from_name("ArrowDown"), KeyCode::DOWN);
        assert_eq!(KeyCode::from_name("Escape"), KeyCode::ESCAPE);
        assert_eq!(KeyCode::from_name(" "), KeyCode::SPACE);
        assert_eq!(KeyCode::from_name("a"), KeyCode(0x41));
        assert_eq!(KeyCode::from_name("F13"), KeyCode::UNKNOWN);
    }

    #[test]
    fn test_dispatcher_registration() {
        let mut dispatcher = EventDispatcher::new();
        let a = dispatcher.register(event_types::POINTER_UP, |_| {});
        let _b = dispatcher.register(event_types::RESIZE, |_| {});

        assert_eq!(dispatcher.count(event_types::POINTER_UP), 1);
        assert_eq!(dispatcher.handlers_for(event_types::POINTER_UP).len(), 1);

        assert!(dispatcher.unregister(a));
        assert!(!dispatcher.is_registered(a));
        assert_eq!(dispatcher.count(event_types::POINTER_UP), 0);
    }

    #[test]
    fn test_reused_slot_keeps_registration_order() {
        let mut dispatcher = EventDispatcher::new();
        let first = dispatcher.register(event_types::POINTER_UP, |_| {});
        let second = dispatcher.register(event_types::POINTER_UP, |_| {});
        dispatcher.unregister(first);

        // Lands in the vacated slot with a bumped version
        let third = dispatcher.register(event_types::POINTER_UP, |_| {});
        let fourth = dispatcher.register(event_types::POINTER_UP, |_| {});

        let order: Vec<ListenerId> = dispatcher
            .handlers_for(event_types::POINTER_UP)
            .into_iter()
            .map(|(id, _)| id)
            .collect();
        assert_eq!(order, vec![second, third, fourth]);
    }
}
