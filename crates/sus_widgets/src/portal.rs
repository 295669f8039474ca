//! Body-level portal
//!
//! Renders content outside the normal tree, into a slot appended to the
//! document body. The slot is created on first render and removed on
//! unmount (or drop).

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use sus_core::{element, Document, Element, PortalId};
use tracing::trace;

pub struct Portal {
    document: Rc<Document>,
    tag: String,
    slot: Cell<Option<PortalId>>,
    last: RefCell<Option<Element>>,
}

impl Portal {
    pub fn new(document: &Rc<Document>) -> Self {
        Self {
            document: document.clone(),
            tag: "div".to_string(),
            slot: Cell::new(None),
            last: RefCell::new(None),
        }
    }

    /// Tag of the slot element (default `div`)
    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = tag.into();
        self
    }

    /// Replace the portal content. `None` leaves an empty slot.
    pub fn render(&self, content: Option<Element>) {
        let slot = match self.slot.get() {
            Some(slot) if self.document.has_portal(slot) => slot,
            _ => {
                let slot = self.document.create_portal();
                trace!(?slot, "portal slot created");
                self.slot.set(Some(slot));
                slot
            }
        };

        let wrapper = element(self.tag.as_str()).children(content.clone());
        self.document.set_portal_content(slot, Some(wrapper));
        *self.last.borrow_mut() = content;
    }

    /// Content of the last render
    pub fn content(&self) -> Option<Element> {
        self.last.borrow().clone()
    }

    pub fn is_attached(&self) -> bool {
        self.slot
            .get()
            .is_some_and(|slot| self.document.has_portal(slot))
    }

    /// Remove the slot from the body
    pub fn unmount(&self) {
        if let Some(slot) = self.slot.take() {
            self.document.remove_portal(slot);
            trace!(?slot, "portal slot removed");
        }
        self.last.borrow_mut().take();
    }
}

impl Drop for Portal {
    fn drop(&mut self) {
        self.unmount();
    }
}
