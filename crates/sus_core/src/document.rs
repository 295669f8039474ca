//! Host document
//!
//! The headless stand-in for a rendering host. Widgets receive an
//! `Rc<Document>` and use it to:
//!
//! - allocate node ids and per-document instance ids (`dropout-0`, ...)
//! - read the last measured bounding rect of a node
//! - render into body-level portal slots
//! - register document-level listeners (pointer up, resize)
//! - attach intersection observers, rect observers and media listeners
//!
//! The embedding application (or a test) drives it: it reports layout with
//! [`Document::set_rect`], resizes with [`Document::set_viewport`] and runs a
//! frame with [`Document::tick`].
//!
//! Every method that invokes callbacks releases its own borrows first, so
//! callbacks may freely call back into the document.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use rustc_hash::FxHashMap;
use slotmap::{new_key_type, SlotMap};
use tracing::{debug, trace};

use crate::element::{Element, NodeId};
use crate::error::MediaQueryError;
use crate::events::{event_types, Event, EventData, EventDispatcher, EventType, ListenerId};
use crate::geometry::{Rect, Size};
use crate::intersection::{IntersectionCallback, IntersectionRegistry, ObserverId, ObserverOptions};
use crate::media_query::{ColorScheme, MediaEnvironment, MediaQueryList};
use crate::rect_observer::{RectObserverRegistry, RectSubscriptionId};

new_key_type! {
    /// Handle for a body-level portal slot
    pub struct PortalId;
    /// Handle for a media query listener
    pub struct MediaListenerId;
}

/// Node id of the document itself (target of resize events)
pub const DOCUMENT_NODE: NodeId = NodeId(0);

/// Media listener notification
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MediaQueryEvent {
    pub media: String,
    pub matches: bool,
}

pub type MediaCallback = Rc<dyn Fn(&MediaQueryEvent)>;

struct MediaListener {
    query: MediaQueryList,
    matches: bool,
    callback: MediaCallback,
}

/// Selected text range in a text field
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TextSelection {
    pub start: usize,
    pub end: usize,
}

pub struct Document {
    next_node: Cell<u64>,
    instance_counters: RefCell<FxHashMap<String, u64>>,
    environment: Cell<MediaEnvironment>,
    frame: Cell<u64>,
    rects: RefCell<FxHashMap<NodeId, Rect>>,
    focused: Cell<Option<NodeId>>,
    selections: RefCell<FxHashMap<NodeId, TextSelection>>,
    portals: RefCell<SlotMap<PortalId, Option<Element>>>,
    portal_order: RefCell<Vec<PortalId>>,
    listeners: RefCell<EventDispatcher>,
    intersections: RefCell<IntersectionRegistry>,
    rect_observers: RefCell<RectObserverRegistry>,
    media: RefCell<SlotMap<MediaListenerId, MediaListener>>,
}

impl Default for Document {
    fn default() -> Self {
        Self::new(Size::new(1024.0, 768.0))
    }
}

impl Document {
    pub fn new(viewport: Size) -> Self {
        Self {
            next_node: Cell::new(DOCUMENT_NODE.0 + 1),
            instance_counters: RefCell::new(FxHashMap::default()),
            environment: Cell::new(MediaEnvironment::new(viewport, ColorScheme::Light)),
            frame: Cell::new(0),
            rects: RefCell::new(FxHashMap::default()),
            focused: Cell::new(None),
            selections: RefCell::new(FxHashMap::default()),
            portals: RefCell::new(SlotMap::with_key()),
            portal_order: RefCell::new(Vec::new()),
            listeners: RefCell::new(EventDispatcher::new()),
            intersections: RefCell::new(IntersectionRegistry::new()),
            rect_observers: RefCell::new(RectObserverRegistry::new()),
            media: RefCell::new(SlotMap::with_key()),
        }
    }

    /// Create a document already wrapped for sharing with widgets
    pub fn shared(viewport: Size) -> Rc<Self> {
        Rc::new(Self::new(viewport))
    }

    // =========================================================================
    // Identity
    // =========================================================================

    pub fn alloc_node(&self) -> NodeId {
        let id = self.next_node.get();
        self.next_node.set(id + 1);
        NodeId(id)
    }

    /// Next `<prefix>-<n>` id, counting per prefix from 0
    pub fn next_instance_id(&self, prefix: &str) -> String {
        let mut counters = self.instance_counters.borrow_mut();
        let counter = counters.entry(prefix.to_string()).or_insert(0);
        let id = format!("{prefix}-{counter}");
        *counter += 1;
        id
    }

    // =========================================================================
    // Environment
    // =========================================================================

    pub fn viewport(&self) -> Size {
        self.environment.get().viewport
    }

    pub fn environment(&self) -> MediaEnvironment {
        self.environment.get()
    }

    pub fn frame(&self) -> u64 {
        self.frame.get()
    }

    /// Resize the viewport: dispatches a global `RESIZE` event, then
    /// re-evaluates media listeners
    pub fn set_viewport(&self, viewport: Size) {
        let mut env = self.environment.get();
        if env.viewport == viewport {
            return;
        }
        env.viewport = viewport;
        self.environment.set(env);
        debug!(width = viewport.width, height = viewport.height, "viewport resized");

        let mut event = Event::new(
            event_types::RESIZE,
            DOCUMENT_NODE,
            EventData::Resize {
                width: viewport.width,
                height: viewport.height,
            },
        );
        self.dispatch_global(&mut event);
        self.notify_media();
    }

    pub fn set_color_scheme(&self, scheme: ColorScheme) {
        let mut env = self.environment.get();
        if env.color_scheme == scheme {
            return;
        }
        env.color_scheme = scheme;
        self.environment.set(env);
        self.notify_media();
    }

    // =========================================================================
    // Layout
    // =========================================================================

    /// Report the measured bounding rect of a node
    pub fn set_rect(&self, node: NodeId, rect: Rect) {
        self.rects.borrow_mut().insert(node, rect);
    }

    /// Last measured bounding rect of a node
    pub fn rect(&self, node: NodeId) -> Option<Rect> {
        self.rects.borrow().get(&node).copied()
    }

    /// Forget layout and selection state of a removed node
    pub fn remove_node(&self, node: NodeId) {
        self.rects.borrow_mut().remove(&node);
        self.selections.borrow_mut().remove(&node);
        if self.focused.get() == Some(node) {
            self.focused.set(None);
        }
    }

    // =========================================================================
    // Focus and selection
    // =========================================================================

    pub fn focus(&self, node: NodeId) {
        self.focused.set(Some(node));
    }

    pub fn blur(&self, node: NodeId) {
        if self.focused.get() == Some(node) {
            self.focused.set(None);
        }
    }

    pub fn focused(&self) -> Option<NodeId> {
        self.focused.get()
    }

    pub fn select_text(&self, node: NodeId, start: usize, end: usize) {
        self.selections
            .borrow_mut()
            .insert(node, TextSelection { start, end });
    }

    pub fn clear_selection(&self, node: NodeId) {
        self.selections.borrow_mut().remove(&node);
    }

    pub fn selection(&self, node: NodeId) -> Option<TextSelection> {
        self.selections.borrow().get(&node).copied()
    }

    // =========================================================================
    // Portals
    // =========================================================================

    /// Append an empty slot to the body
    pub fn create_portal(&self) -> PortalId {
        let id = self.portals.borrow_mut().insert(None);
        self.portal_order.borrow_mut().push(id);
        trace!(?id, "portal created");
        id
    }

    /// Replace a slot's content; returns false for a removed slot
    pub fn set_portal_content(&self, id: PortalId, content: Option<Element>) -> bool {
        match self.portals.borrow_mut().get_mut(id) {
            Some(slot) => {
                *slot = content;
                true
            }
            None => false,
        }
    }

    pub fn portal_content(&self, id: PortalId) -> Option<Element> {
        self.portals.borrow().get(id).cloned().flatten()
    }

    pub fn has_portal(&self, id: PortalId) -> bool {
        self.portals.borrow().contains_key(id)
    }

    pub fn remove_portal(&self, id: PortalId) -> bool {
        let removed = self.portals.borrow_mut().remove(id).is_some();
        if removed {
            self.portal_order.borrow_mut().retain(|p| *p != id);
            trace!(?id, "portal removed");
        }
        removed
    }

    pub fn portal_count(&self) -> usize {
        self.portals.borrow().len()
    }

    /// Non-empty portal contents in body order
    pub fn body(&self) -> Vec<Element> {
        let portals = self.portals.borrow();
        self.portal_order
            .borrow()
            .iter()
            .filter_map(|id| portals.get(*id).cloned().flatten())
            .collect()
    }

    // =========================================================================
    // Global listeners
    // =========================================================================

    pub fn add_listener<F>(&self, event_type: EventType, handler: F) -> ListenerId
    where
        F: Fn(&mut Event) + 'static,
    {
        self.listeners.borrow_mut().register(event_type, handler)
    }

    pub fn remove_listener(&self, id: ListenerId) -> bool {
        self.listeners.borrow_mut().unregister(id)
    }

    pub fn listener_count(&self, event_type: EventType) -> usize {
        self.listeners.borrow().count(event_type)
    }

    /// Deliver an event to document-level listeners in registration order.
    ///
    /// Listeners removed by an earlier handler during the same dispatch are
    /// skipped.
    pub fn dispatch_global(&self, event: &mut Event) {
        let handlers = self.listeners.borrow().handlers_for(event.event_type);
        for (id, handler) in handlers {
            if !self.listeners.borrow().is_registered(id) {
                continue;
            }
            handler(event);
        }
    }

    // =========================================================================
    // Observers
    // =========================================================================

    pub fn create_intersection_observer(
        &self,
        options: ObserverOptions,
        callback: IntersectionCallback,
    ) -> ObserverId {
        self.intersections.borrow_mut().create(options, callback)
    }

    pub fn observe_intersection(&self, id: ObserverId, target: NodeId) -> bool {
        self.intersections.borrow_mut().observe(id, target)
    }

    pub fn unobserve_intersection(&self, id: ObserverId, target: NodeId) -> bool {
        self.intersections.borrow_mut().unobserve(id, target)
    }

    pub fn disconnect_intersection_observer(&self, id: ObserverId) {
        self.intersections.borrow_mut().disconnect(id);
    }

    pub fn release_intersection_observer(&self, id: ObserverId) -> bool {
        self.intersections.borrow_mut().release(id)
    }

    pub fn is_observing_intersection(&self, id: ObserverId, target: NodeId) -> bool {
        self.intersections.borrow().is_observing(id, target)
    }

    pub fn intersection_observer_count(&self) -> usize {
        self.intersections.borrow().len()
    }

    pub fn observe_rect<F>(&self, node: NodeId, callback: F) -> RectSubscriptionId
    where
        F: Fn(Rect) + 'static,
    {
        self.rect_observers
            .borrow_mut()
            .observe(node, Rc::new(callback))
    }

    pub fn unobserve_rect(&self, id: RectSubscriptionId) -> bool {
        self.rect_observers.borrow_mut().unobserve(id)
    }

    pub fn is_observing_rect(&self, node: NodeId) -> bool {
        self.rect_observers.borrow().is_observing(node)
    }

    /// Run one frame: rect observers first, then intersection observers.
    /// Returns the number of callbacks invoked.
    pub fn tick(&self) -> usize {
        let frame = self.frame.get() + 1;
        self.frame.set(frame);

        let rect_callbacks = {
            let rects = self.rects.borrow();
            self.rect_observers.borrow_mut().compute(&rects)
        };
        let mut invoked = rect_callbacks.len();
        for (callback, rect) in rect_callbacks {
            callback(rect);
        }

        let intersection_callbacks = {
            let rects = self.rects.borrow();
            self.intersections
                .borrow_mut()
                .compute(&rects, self.viewport(), frame)
        };
        invoked += intersection_callbacks.len();
        for (callback, entries) in intersection_callbacks {
            callback(&entries);
        }

        trace!(frame, invoked, "frame");
        invoked
    }

    // =========================================================================
    // Media queries
    // =========================================================================

    /// Evaluate a query against the current environment
    pub fn matches_media(&self, query: &str) -> Result<bool, MediaQueryError> {
        Ok(MediaQueryList::parse(query)?.matches(&self.environment.get()))
    }

    /// Subscribe to a media query. The callback receives the current match
    /// immediately, then every change.
    pub fn add_media_listener<F>(&self, query: &str, callback: F) -> Result<MediaListenerId, MediaQueryError>
    where
        F: Fn(&MediaQueryEvent) + 'static,
    {
        let query = MediaQueryList::parse(query)?;
        let matches = query.matches(&self.environment.get());
        let event = MediaQueryEvent {
            media: query.as_str().to_string(),
            matches,
        };
        let callback: MediaCallback = Rc::new(callback);

        let id = self.media.borrow_mut().insert(MediaListener {
            query,
            matches,
            callback: callback.clone(),
        });
        callback(&event);
        Ok(id)
    }

    pub fn remove_media_listener(&self, id: MediaListenerId) -> bool {
        self.media.borrow_mut().remove(id).is_some()
    }

    pub fn media_listener_count(&self) -> usize {
        self.media.borrow().len()
    }

    fn notify_media(&self) {
        let env = self.environment.get();
        let changed: Vec<(MediaCallback, MediaQueryEvent)> = self
            .media
            .borrow_mut()
            .values_mut()
            .filter_map(|listener| {
                let matches = listener.query.matches(&env);
                if matches == listener.matches {
                    return None;
                }
                listener.matches = matches;
                Some((
                    listener.callback.clone(),
                    MediaQueryEvent {
                        media: listener.query.as_str().to_string(),
                        matches,
                    },
                ))
            })
            .collect();

        for (callback, event) in changed {
            callback(&event);
        }
    }
}
