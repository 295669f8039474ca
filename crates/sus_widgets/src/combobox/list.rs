//! Combobox listbox
//!
//! Rendered into a body portal and anchored under the input's last measured
//! rect. While mounted the list re-renders after every state change and
//! watches document-level pointer releases to end pointer selections.

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use sus_core::{element, event_types, Element, Event, ListenerId, NodeId, Style};
use tracing::debug;

use super::{ComboboxHandle, ComboboxOption, StateSubscription};
use crate::portal::Portal;

struct ListInner {
    handle: ComboboxHandle,
    portal: Portal,
    style: RefCell<Style>,
    options: RefCell<Vec<ComboboxOption>>,
    option_nodes: RefCell<Vec<NodeId>>,
    pointer_up: Cell<Option<ListenerId>>,
    subscription: Cell<Option<StateSubscription>>,
}

impl ListInner {
    fn detach(&self) {
        if let Some(id) = self.pointer_up.take() {
            self.handle.document().remove_listener(id);
        }
        if let Some(id) = self.subscription.take() {
            self.handle.unsubscribe(id);
        }
    }

    fn sync_values(&self) {
        let values = self
            .options
            .borrow()
            .iter()
            .map(|option| option.value().to_string())
            .collect();
        self.handle.set_options(values);
    }

    /// Node ids are stable per option position
    fn option_nodes(&self, count: usize) -> Vec<NodeId> {
        let mut nodes = self.option_nodes.borrow_mut();
        while nodes.len() < count {
            nodes.push(self.handle.document().alloc_node());
        }
        nodes[..count].to_vec()
    }

    fn render(&self) -> Option<Element> {
        self.sync_values();
        let handle = &self.handle;
        let state = handle.state();

        let content = match (state.is_open(), handle.input_rect()) {
            (true, Some(anchor)) => {
                let options = self.options.borrow();
                let nodes = self.option_nodes(options.len());
                let items = options.iter().zip(nodes).enumerate().map(|(index, (option, node))| {
                    let active = state.navigated_value.as_deref() == Some(option.value());
                    option.render(node, handle.item_id(index), active)
                });

                Some(
                    element("ul")
                        .attr("id", handle.menu_id())
                        .attr("role", "listbox")
                        .attr("data-dropoutmenu", "")
                        .style("top", format!("{}px", anchor.bottom()))
                        .style("left", format!("{}px", anchor.left()))
                        .style("width", format!("{}px", anchor.width()))
                        .styles(&self.style.borrow())
                        .children(items.collect::<Vec<_>>()),
                )
            }
            _ => None,
        };

        self.portal.render(content.clone());
        content
    }
}

impl Drop for ListInner {
    fn drop(&mut self) {
        self.detach();
    }
}

pub struct ComboboxList {
    inner: Rc<ListInner>,
}

impl ComboboxList {
    pub fn new(handle: &ComboboxHandle) -> Self {
        Self {
            inner: Rc::new(ListInner {
                handle: handle.clone(),
                portal: Portal::new(handle.document()),
                style: RefCell::new(Style::new()),
                options: RefCell::new(Vec::new()),
                option_nodes: RefCell::new(Vec::new()),
                pointer_up: Cell::new(None),
                subscription: Cell::new(None),
            }),
        }
    }

    /// Style override, applied after the anchor position
    pub fn style(self, property: impl Into<String>, value: impl Into<String>) -> Self {
        self.inner
            .style
            .borrow_mut()
            .insert(property.into(), value.into());
        self
    }

    pub fn options(self, options: impl IntoIterator<Item = ComboboxOption>) -> Self {
        *self.inner.options.borrow_mut() = options.into_iter().collect();
        self
    }

    /// Replace the options (new suggestions) and re-render when mounted
    pub fn set_options(&self, options: impl IntoIterator<Item = ComboboxOption>) {
        *self.inner.options.borrow_mut() = options.into_iter().collect();
        if self.is_mounted() {
            self.inner.render();
        } else {
            self.inner.sync_values();
        }
    }

    pub fn is_mounted(&self) -> bool {
        self.inner.subscription.get().is_some()
    }

    /// Attach to the host: watch pointer releases, follow state changes and
    /// render the initial content.
    pub fn mount(&self) {
        if self.is_mounted() {
            return;
        }
        let handle = &self.inner.handle;

        let weak = Rc::downgrade(&self.inner);
        let pointer_up = handle
            .document()
            .add_listener(event_types::POINTER_UP, move |event| {
                if let Some(inner) = weak.upgrade() {
                    inner.handle.release_pointer(event.target);
                }
            });

        let weak: Weak<ListInner> = Rc::downgrade(&self.inner);
        let subscription = handle.subscribe(move |_| {
            if let Some(inner) = weak.upgrade() {
                inner.render();
            }
        });

        self.inner.pointer_up.set(Some(pointer_up));
        self.inner.subscription.set(Some(subscription));
        debug!(id = %handle.id(), "combobox list mounted");
        self.inner.render();
    }

    /// Detach from the host and remove the portal
    pub fn unmount(&self) {
        if !self.is_mounted() {
            return;
        }
        self.inner.detach();
        self.inner.portal.unmount();
        self.inner.handle.set_options(Vec::new());
        debug!(id = %self.inner.handle.id(), "combobox list unmounted");
    }

    /// Render into the portal and return the listbox, if shown.
    ///
    /// Records the option values with the handle for keyboard navigation.
    pub fn render(&self) -> Option<Element> {
        self.inner.render()
    }

    /// Route an event aimed at one of the rendered options
    pub fn handle_event(&self, event: &mut Event) -> bool {
        let index = self
            .inner
            .option_nodes
            .borrow()
            .iter()
            .position(|node| *node == event.target);
        let option = index.and_then(|index| self.inner.options.borrow().get(index).cloned());
        match option {
            Some(option) => option.handle_event(&self.inner.handle, event),
            None => false,
        }
    }

    /// Node of the option at `index` once rendered
    pub fn option_node(&self, index: usize) -> Option<NodeId> {
        self.inner.option_nodes.borrow().get(index).copied()
    }
}

impl Drop for ComboboxList {
    fn drop(&mut self) {
        self.unmount();
    }
}
