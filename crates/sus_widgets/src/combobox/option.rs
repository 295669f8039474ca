//! Combobox option

use std::rc::Rc;

use sus_core::{element, event_types, wrap_event, Attributes, Element, Event, EventHandler, NodeId};

use super::{ComboboxAction, ComboboxHandle};

/// One selectable value of a [`ComboboxList`](super::ComboboxList)
#[derive(Clone)]
pub struct ComboboxOption {
    value: String,
    attrs: Attributes,
    children: Vec<Element>,
    on_click: Option<EventHandler>,
    on_pointer_down: Option<EventHandler>,
}

impl ComboboxOption {
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            attrs: Attributes::new(),
            children: Vec::new(),
            on_click: None,
            on_pointer_down: None,
        }
    }

    /// Pass-through attribute
    pub fn attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attrs.insert(name.into(), value.into());
        self
    }

    pub fn child(mut self, child: Element) -> Self {
        self.children.push(child);
        self
    }

    /// Runs before the built-in selection; preventing default skips it
    pub fn on_click<F>(mut self, handler: F) -> Self
    where
        F: Fn(&mut Event) + 'static,
    {
        self.on_click = Some(Rc::new(handler));
        self
    }

    /// Runs before the built-in press tracking; preventing default skips it
    pub fn on_pointer_down<F>(mut self, handler: F) -> Self
    where
        F: Fn(&mut Event) + 'static,
    {
        self.on_pointer_down = Some(Rc::new(handler));
        self
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    pub(crate) fn render(&self, node: NodeId, id: String, active: bool) -> Element {
        let content = if self.children.is_empty() {
            vec![element("span").text(self.value.as_str())]
        } else {
            self.children.clone()
        };

        element("li")
            .node(node)
            .attr("role", "option")
            .attrs(&self.attrs)
            .attr("id", id)
            .attr("data-dropoutitem", "")
            .attr("aria-selected", active.to_string())
            .children(content)
    }

    pub(crate) fn handle_event(&self, handle: &ComboboxHandle, event: &mut Event) -> bool {
        match event.event_type {
            event_types::POINTER_DOWN => {
                wrap_event(self.on_pointer_down.as_ref(), event, |event| {
                    // Keep focus on the input
                    event.prevent_default();
                    handle.press_option(event.target);
                    handle.dispatch(ComboboxAction::MouseDown);
                });
                true
            }
            event_types::CLICK => {
                wrap_event(self.on_click.as_ref(), event, |_| {
                    handle.dispatch(ComboboxAction::SelectWithClick(self.value.clone()));
                });
                true
            }
            _ => false,
        }
    }
}

impl std::fmt::Debug for ComboboxOption {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ComboboxOption")
            .field("value", &self.value)
            .field("attrs", &self.attrs)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::combobox::Lifecycle;
    use sus_core::{Document, Size};

    #[test]
    fn test_render_attributes() {
        let option = ComboboxOption::new("apple").attr("data-testid", "option-0");
        let li = option.render(NodeId(9), "dropout-0-item-0".into(), true);

        assert_eq!(li.tag(), "li");
        assert_eq!(li.node_id(), Some(NodeId(9)));
        assert_eq!(li.get_attr("role"), Some("option"));
        assert_eq!(li.get_attr("id"), Some("dropout-0-item-0"));
        assert_eq!(li.get_attr("aria-selected"), Some("true"));
        assert_eq!(li.get_attr("data-testid"), Some("option-0"));
        assert_eq!(li.child_elements()[0].get_text(), Some("apple"));
    }

    #[test]
    fn test_caller_can_veto_selection() {
        let doc = Document::shared(Size::new(100.0, 100.0));
        let handle = ComboboxHandle::new(&doc);
        let node = doc.alloc_node();
        let option = ComboboxOption::new("apple").on_click(|event| event.prevent_default());

        handle.dispatch(ComboboxAction::Change("a".into()));
        let mut down = Event::pointer(event_types::POINTER_DOWN, node);
        assert!(option.handle_event(&handle, &mut down));
        assert!(down.is_default_prevented());
        assert_eq!(handle.lifecycle(), Lifecycle::SelectingWithPointer);
        assert_eq!(handle.pressed_option(), Some(node));

        let mut click = Event::click(node);
        option.handle_event(&handle, &mut click);
        assert_eq!(handle.lifecycle(), Lifecycle::SelectingWithPointer);
        assert_eq!(handle.typed_value(), "a");
    }
}
