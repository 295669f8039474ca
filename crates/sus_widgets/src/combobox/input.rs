//! Combobox text input

use std::cell::Cell;
use std::rc::Rc;

use serde::{Deserialize, Serialize};
use sus_core::{element, event_types, wrap_event, Attributes, Element, Event, EventHandler};
use tracing::trace;

use super::keyboard::handle_key;
use super::{ComboboxAction, ComboboxHandle, Lifecycle};
use crate::widget::Widget;

/// Input behavior switches
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ComboboxInputConfig {
    /// Select the whole value on the first click after focus
    pub select_on_click: bool,
    /// Accepted for compatibility; navigation never rewrites the typed value
    pub autocomplete_on_nav: bool,
}

impl ComboboxInputConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn select_on_click(mut self, enabled: bool) -> Self {
        self.select_on_click = enabled;
        self
    }

    pub fn autocomplete_on_nav(mut self, enabled: bool) -> Self {
        self.autocomplete_on_nav = enabled;
        self
    }
}

#[derive(Default)]
struct InputHandlers {
    on_blur: Option<EventHandler>,
    on_change: Option<EventHandler>,
    on_key_down: Option<EventHandler>,
    on_click: Option<EventHandler>,
    on_focus: Option<EventHandler>,
}

/// The combobox text field
pub struct ComboboxInput {
    handle: ComboboxHandle,
    config: ComboboxInputConfig,
    attrs: Attributes,
    handlers: InputHandlers,
    /// Set by focus when `select_on_click` is on, consumed by the next click
    select_armed: Cell<bool>,
}

impl ComboboxInput {
    pub fn new(handle: &ComboboxHandle) -> Self {
        Self {
            handle: handle.clone(),
            config: ComboboxInputConfig::default(),
            attrs: Attributes::new(),
            handlers: InputHandlers::default(),
            select_armed: Cell::new(false),
        }
    }

    pub fn config(mut self, config: ComboboxInputConfig) -> Self {
        self.config = config;
        self
    }

    pub fn select_on_click(mut self, enabled: bool) -> Self {
        self.config.select_on_click = enabled;
        self
    }

    pub fn autocomplete_on_nav(mut self, enabled: bool) -> Self {
        self.config.autocomplete_on_nav = enabled;
        self
    }

    /// Pass-through attribute (placeholder, name, test ids, ...)
    pub fn attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attrs.insert(name.into(), value.into());
        self
    }

    pub fn on_blur<F: Fn(&mut Event) + 'static>(mut self, handler: F) -> Self {
        self.handlers.on_blur = Some(Rc::new(handler));
        self
    }

    pub fn on_change<F: Fn(&mut Event) + 'static>(mut self, handler: F) -> Self {
        self.handlers.on_change = Some(Rc::new(handler));
        self
    }

    pub fn on_key_down<F: Fn(&mut Event) + 'static>(mut self, handler: F) -> Self {
        self.handlers.on_key_down = Some(Rc::new(handler));
        self
    }

    pub fn on_click<F: Fn(&mut Event) + 'static>(mut self, handler: F) -> Self {
        self.handlers.on_click = Some(Rc::new(handler));
        self
    }

    pub fn on_focus<F: Fn(&mut Event) + 'static>(mut self, handler: F) -> Self {
        self.handlers.on_focus = Some(Rc::new(handler));
        self
    }

    pub fn get_config(&self) -> ComboboxInputConfig {
        self.config
    }

    fn handle_blur(&self) {
        if self.handle.lifecycle() != Lifecycle::SelectingWithPointer {
            self.handle.dispatch(ComboboxAction::Close);
        }
    }

    fn handle_change(&self, event: &Event) {
        let Some(value) = event.value() else {
            return;
        };
        if value.trim().is_empty() {
            self.handle.dispatch(ComboboxAction::Clear);
        } else {
            self.handle.dispatch(ComboboxAction::Change(value.to_string()));
        }
    }

    fn handle_key_down(&self, event: &mut Event) {
        let Some(key) = event.key() else {
            return;
        };
        let outcome = handle_key(key, &self.handle.state());
        if outcome.prevent_default {
            event.prevent_default();
        }
        if let Some(action) = outcome.action {
            self.handle.dispatch(action);
        }
    }

    fn handle_focus(&self) {
        self.select_armed.set(self.config.select_on_click);
    }

    fn handle_click(&self) {
        if !self.select_armed.replace(false) {
            return;
        }
        let len = self.handle.displayed_value().chars().count();
        trace!(id = %self.handle.id(), len, "selecting input text");
        self.handle
            .document()
            .select_text(self.handle.input_node(), 0, len);
    }
}

impl Widget for ComboboxInput {
    fn render(&self) -> Element {
        let state = self.handle.state();
        let open = state.is_open();

        element("input")
            .node(self.handle.input_node())
            .attr("id", self.handle.input_id())
            .attr("role", "textbox")
            .attr("aria-autocomplete", "list")
            .attr_opt(
                "aria-activedescendant",
                open.then(|| self.handle.active_descendant()).flatten(),
            )
            .attr_opt("aria-controls", open.then(|| self.handle.menu_id()))
            .attr("aria-multiline", "false")
            .attr("data-dropoutinput", "")
            .attrs(&self.attrs)
            .attr("value", state.displayed_value())
    }

    fn handle_event(&self, event: &mut Event) -> bool {
        if event.target != self.handle.input_node() {
            return false;
        }

        match event.event_type {
            event_types::BLUR => {
                wrap_event(self.handlers.on_blur.as_ref(), event, |_| self.handle_blur())
            }
            event_types::CHANGE => {
                wrap_event(self.handlers.on_change.as_ref(), event, |event| {
                    self.handle_change(event)
                })
            }
            event_types::KEY_DOWN => {
                wrap_event(self.handlers.on_key_down.as_ref(), event, |event| {
                    self.handle_key_down(event)
                })
            }
            event_types::FOCUS => {
                wrap_event(self.handlers.on_focus.as_ref(), event, |_| self.handle_focus())
            }
            event_types::CLICK => {
                wrap_event(self.handlers.on_click.as_ref(), event, |_| self.handle_click())
            }
            _ => return false,
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use sus_core::document::TextSelection;
    use sus_core::{Document, KeyCode, Size};

    fn setup() -> (Rc<Document>, ComboboxHandle) {
        let doc = Document::shared(Size::new(800.0, 600.0));
        let handle = ComboboxHandle::new(&doc);
        handle.set_options(vec!["apple".into(), "apricot".into(), "avocado".into()]);
        (doc, handle)
    }

    #[test]
    fn test_render_closed_and_open() {
        let (_doc, handle) = setup();
        let input = ComboboxInput::new(&handle).attr("placeholder", "Fruit");

        let closed = input.render();
        assert_eq!(closed.tag(), "input");
        assert_eq!(closed.get_attr("id"), Some("dropout-0-input"));
        assert_eq!(closed.get_attr("role"), Some("textbox"));
        assert_eq!(closed.get_attr("aria-autocomplete"), Some("list"));
        assert_eq!(closed.get_attr("aria-multiline"), Some("false"));
        assert_eq!(closed.get_attr("aria-controls"), None);
        assert_eq!(closed.get_attr("aria-activedescendant"), None);
        assert_eq!(closed.get_attr("placeholder"), Some("Fruit"));
        assert_eq!(closed.get_attr("value"), Some(""));

        handle.dispatch(ComboboxAction::Navigate(None));
        handle.dispatch(ComboboxAction::Navigate(Some("avocado".into())));
        let open = input.render();
        assert_eq!(open.get_attr("aria-controls"), Some("dropout-0-menu"));
        assert_eq!(open.get_attr("aria-activedescendant"), Some("dropout-0-item-2"));
        assert_eq!(open.get_attr("value"), Some("avocado"));
    }

    #[test]
    fn test_value_attr_cannot_be_overridden() {
        let (_doc, handle) = setup();
        let input = ComboboxInput::new(&handle).attr("value", "stale");
        handle.dispatch(ComboboxAction::Change("fresh".into()));
        assert_eq!(input.render().get_attr("value"), Some("fresh"));
    }

    #[test]
    fn test_change_and_blank_change() {
        let (_doc, handle) = setup();
        let input = ComboboxInput::new(&handle);
        let node = handle.input_node();

        assert!(input.handle_event(&mut Event::change(node, " ap ")));
        assert_eq!(handle.lifecycle(), Lifecycle::Suggesting);
        assert_eq!(handle.typed_value(), " ap ");

        input.handle_event(&mut Event::change(node, "   "));
        assert_eq!(handle.lifecycle(), Lifecycle::Idle);
        assert_eq!(handle.typed_value(), "");
    }

    #[test]
    fn test_keyboard_prevents_default() {
        let (_doc, handle) = setup();
        let input = ComboboxInput::new(&handle);
        let node = handle.input_node();

        let mut down = Event::key_down(node, KeyCode::DOWN);
        input.handle_event(&mut down);
        assert!(down.is_default_prevented());

        input.handle_event(&mut Event::key_down(node, KeyCode::DOWN));
        let mut enter = Event::key_down(node, KeyCode::ENTER);
        input.handle_event(&mut enter);
        assert!(enter.is_default_prevented());
        assert_eq!(handle.typed_value(), "apple");
        assert_eq!(handle.lifecycle(), Lifecycle::Idle);

        let mut enter_again = Event::key_down(node, KeyCode::ENTER);
        input.handle_event(&mut enter_again);
        assert!(!enter_again.is_default_prevented());
        assert_eq!(handle.typed_value(), "apple");
    }

    #[test]
    fn test_blur_closes_unless_selecting_with_pointer() {
        let (doc, handle) = setup();
        let input = ComboboxInput::new(&handle);
        let node = handle.input_node();

        input.handle_event(&mut Event::change(node, "a"));
        input.handle_event(&mut Event::blur(node));
        assert_eq!(handle.lifecycle(), Lifecycle::Idle);

        input.handle_event(&mut Event::change(node, "a"));
        handle.press_option(doc.alloc_node());
        handle.dispatch(ComboboxAction::MouseDown);
        input.handle_event(&mut Event::blur(node));
        assert_eq!(handle.lifecycle(), Lifecycle::SelectingWithPointer);
    }

    #[test]
    fn test_caller_handlers_run_first_and_can_veto() {
        let (_doc, handle) = setup();
        let calls = Rc::new(RefCell::new(Vec::new()));
        let log = calls.clone();
        let input = ComboboxInput::new(&handle)
            .on_key_down(move |event| {
                log.borrow_mut().push(format!("{:?}", event.key()));
                if event.key() == Some(KeyCode::ESCAPE) {
                    event.prevent_default();
                }
            });
        let node = handle.input_node();

        input.handle_event(&mut Event::key_down(node, KeyCode::DOWN));
        assert_eq!(handle.lifecycle(), Lifecycle::Navigating);

        input.handle_event(&mut Event::key_down(node, KeyCode::ESCAPE));
        assert_eq!(handle.lifecycle(), Lifecycle::Navigating);
        assert_eq!(calls.borrow().len(), 2);
    }

    #[test]
    fn test_select_on_click_once_per_focus() {
        let (doc, handle) = setup();
        let input = ComboboxInput::new(&handle).select_on_click(true);
        let node = handle.input_node();
        input.handle_event(&mut Event::change(node, "apple pie"));

        input.handle_event(&mut Event::focus(node));
        input.handle_event(&mut Event::click(node));
        assert_eq!(doc.selection(node), Some(TextSelection { start: 0, end: 9 }));

        doc.clear_selection(node);
        input.handle_event(&mut Event::click(node));
        assert_eq!(doc.selection(node), None);

        input.handle_event(&mut Event::focus(node));
        input.handle_event(&mut Event::click(node));
        assert!(doc.selection(node).is_some());
    }

    #[test]
    fn test_select_on_click_disabled_by_default() {
        let (doc, handle) = setup();
        let input = ComboboxInput::new(&handle).config(ComboboxInputConfig::new().autocomplete_on_nav(true));
        let node = handle.input_node();
        assert!(input.get_config().autocomplete_on_nav);

        input.handle_event(&mut Event::focus(node));
        input.handle_event(&mut Event::click(node));
        assert_eq!(doc.selection(node), None);
    }

    #[test]
    fn test_config_from_json() {
        let config: ComboboxInputConfig = serde_json::from_str(r#"{"select_on_click": true}"#).unwrap();
        assert!(config.select_on_click);
        assert!(!config.autocomplete_on_nav);
    }

    #[test]
    fn test_ignores_foreign_targets() {
        let (doc, handle) = setup();
        let input = ComboboxInput::new(&handle);
        assert!(!input.handle_event(&mut Event::change(doc.alloc_node(), "x")));
        assert_eq!(handle.lifecycle(), Lifecycle::Idle);
    }
}
