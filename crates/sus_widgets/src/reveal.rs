//! Visibility trigger
//!
//! [`Reveal`] wraps exactly one child and calls `on_appear` when the child
//! enters the viewport (or the configured root). With `once` the observer is
//! torn down after the first appearance; otherwise the callback runs on each
//! transition into visibility.
//!
//! Visibility state only lives while mounted: unmounting drops it together
//! with the observer.

use std::cell::Cell;
use std::rc::{Rc, Weak};

use serde::{Deserialize, Serialize};
use sus_core::{CompositionError, Document, Element, IntersectionEntry, NodeId, ObserverId, ObserverOptions};
use tracing::{debug, trace};

use crate::widget::{only_child, Widget};

/// Called when the wrapped child appears
pub type AppearCallback = Rc<dyn Fn()>;

/// Reveal configuration
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RevealConfig {
    /// Fire at most once per mount
    pub once: bool,
    pub options: ObserverOptions,
}

impl RevealConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn once(mut self, once: bool) -> Self {
        self.once = once;
        self
    }

    pub fn options(mut self, options: ObserverOptions) -> Self {
        self.options = options;
        self
    }
}

/// Per-mount visibility memory
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct VisibilityState {
    /// Set on the first appearance, never cleared while mounted
    pub has_been_visible: bool,
    pub has_fired_once: bool,
}

struct Mounted {
    document: Rc<Document>,
    target: NodeId,
    once: bool,
    on_appear: AppearCallback,
    observer: Cell<Option<ObserverId>>,
    visibility: Cell<VisibilityState>,
    in_view: Cell<bool>,
}

impl Mounted {
    fn on_entries(&self, entries: &[IntersectionEntry]) {
        let Some(entry) = entries.iter().rev().find(|e| e.target == self.target) else {
            return;
        };
        let visible = entry.is_intersecting || entry.intersection_ratio > 0.0;
        let was_visible = self.in_view.replace(visible);
        if !visible || was_visible {
            return;
        }

        let mut visibility = self.visibility.get();
        if self.once && visibility.has_fired_once {
            return;
        }
        visibility.has_been_visible = true;
        if self.once {
            visibility.has_fired_once = true;
        }
        self.visibility.set(visibility);

        trace!(target = ?self.target, ratio = entry.intersection_ratio, "revealed");
        (self.on_appear)();

        if self.once {
            self.stop_observing();
        }
    }

    fn stop_observing(&self) {
        if let Some(observer) = self.observer.get() {
            self.document.unobserve_intersection(observer, self.target);
            self.document.disconnect_intersection_observer(observer);
        }
    }

    fn release(&self) {
        self.stop_observing();
        if let Some(observer) = self.observer.take() {
            self.document.release_intersection_observer(observer);
        }
    }
}

pub struct Reveal {
    document: Rc<Document>,
    child: Element,
    target: NodeId,
    config: RevealConfig,
    on_appear: AppearCallback,
    mounted: Option<Rc<Mounted>>,
}

impl Reveal {
    /// Wrap exactly one child. The child keeps its node id when it has one.
    pub fn new<F>(document: &Rc<Document>, children: Vec<Element>, on_appear: F) -> Result<Self, CompositionError>
    where
        F: Fn() + 'static,
    {
        let child = only_child("Reveal", children)?;
        let target = child.node_id().unwrap_or_else(|| document.alloc_node());
        Ok(Self::around(document, child.node(target), on_appear))
    }

    /// Watch a node the caller renders itself
    pub fn for_node<F>(document: &Rc<Document>, target: NodeId, on_appear: F) -> Self
    where
        F: Fn() + 'static,
    {
        Self::around(document, sus_core::div().node(target), on_appear)
    }

    fn around<F: Fn() + 'static>(document: &Rc<Document>, child: Element, on_appear: F) -> Self {
        let target = child.node_id().unwrap_or_else(|| document.alloc_node());
        Self {
            document: document.clone(),
            child: child.node(target),
            target,
            config: RevealConfig::default(),
            on_appear: Rc::new(on_appear),
            mounted: None,
        }
    }

    pub fn once(mut self, once: bool) -> Self {
        self.config.once = once;
        self
    }

    pub fn options(mut self, options: ObserverOptions) -> Self {
        self.config.options = options;
        self
    }

    pub fn config(mut self, config: RevealConfig) -> Self {
        self.config = config;
        self
    }

    /// Node observed for visibility
    pub fn target(&self) -> NodeId {
        self.target
    }

    pub fn is_mounted(&self) -> bool {
        self.mounted.is_some()
    }

    /// `None` while unmounted
    pub fn visibility(&self) -> Option<VisibilityState> {
        self.mounted.as_ref().map(|m| m.visibility.get())
    }

    /// Whether the observer is still watching the child
    pub fn is_observing(&self) -> bool {
        self.mounted
            .as_ref()
            .and_then(|m| m.observer.get())
            .is_some_and(|observer| self.document.is_observing_intersection(observer, self.target))
    }

    pub fn mount(&mut self) {
        if self.mounted.is_some() {
            return;
        }

        let mounted = Rc::new(Mounted {
            document: self.document.clone(),
            target: self.target,
            once: self.config.once,
            on_appear: self.on_appear.clone(),
            observer: Cell::new(None),
            visibility: Cell::new(VisibilityState::default()),
            in_view: Cell::new(false),
        });

        let weak: Weak<Mounted> = Rc::downgrade(&mounted);
        let observer = self.document.create_intersection_observer(
            self.config.options.clone(),
            Rc::new(move |entries: &[IntersectionEntry]| {
                if let Some(mounted) = weak.upgrade() {
                    mounted.on_entries(entries);
                }
            }),
        );
        self.document.observe_intersection(observer, self.target);
        mounted.observer.set(Some(observer));

        debug!(target = ?self.target, once = self.config.once, "reveal mounted");
        self.mounted = Some(mounted);
    }

    /// Stop observing and forget visibility. Safe to call repeatedly.
    pub fn unmount(&mut self) {
        if let Some(mounted) = self.mounted.take() {
            mounted.release();
            debug!(target = ?self.target, "reveal unmounted");
        }
    }
}

impl Widget for Reveal {
    fn render(&self) -> Element {
        self.child.clone()
    }
}

impl Drop for Reveal {
    fn drop(&mut self) {
        self.unmount();
    }
}
