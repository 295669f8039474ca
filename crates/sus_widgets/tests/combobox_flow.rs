//! Integration tests for a complete combobox
//!
//! Input, list and options are wired to one handle and driven with host
//! events, the way a page would: typing, arrow navigation, Enter, Escape,
//! pointer selection and blur.

use std::cell::RefCell;
use std::rc::Rc;

use sus_core::{event_types, Document, Element, Event, KeyCode, Rect, Size};
use sus_widgets::combobox::{ComboboxHandle, ComboboxInput, ComboboxList, ComboboxOption, Lifecycle};
use sus_widgets::Widget;

const FRUITS: [&str; 5] = ["apple", "apricot", "avocado", "banana", "blueberry"];

struct Page {
    doc: Rc<Document>,
    handle: ComboboxHandle,
    input: ComboboxInput,
    list: ComboboxList,
    selected: Rc<RefCell<Vec<String>>>,
}

impl Page {
    fn new() -> Self {
        let doc = Document::shared(Size::new(1024.0, 768.0));
        let handle = ComboboxHandle::new(&doc);
        let input = ComboboxInput::new(&handle).attr("placeholder", "Pick a fruit");
        let list = ComboboxList::new(&handle)
            .style("max-height", "200px")
            .options(FRUITS.map(ComboboxOption::new));

        let selected = Rc::new(RefCell::new(Vec::new()));
        let sink = selected.clone();
        handle.on_select(move |value| sink.borrow_mut().push(value.to_string()));

        doc.set_rect(handle.input_node(), Rect::new(100.0, 40.0, 300.0, 36.0));
        list.mount();

        Self {
            doc,
            handle,
            input,
            list,
            selected,
        }
    }

    fn key(&self, key: KeyCode) -> bool {
        let mut event = Event::key_down(self.handle.input_node(), key);
        self.input.handle_event(&mut event);
        event.is_default_prevented()
    }

    fn type_text(&self, text: &str) {
        self.input
            .handle_event(&mut Event::change(self.handle.input_node(), text));
    }

    fn menu(&self) -> Option<Element> {
        self.doc.body().first().and_then(|portal| portal.child_elements().first().cloned())
    }
}

#[test]
fn test_type_navigate_and_select_with_enter() {
    let page = Page::new();
    assert!(page.menu().is_none());

    page.type_text("a");
    assert_eq!(page.handle.lifecycle(), Lifecycle::Suggesting);
    let menu = page.menu().unwrap();
    assert_eq!(menu.get_style("top"), Some("76px"));
    assert_eq!(menu.get_style("max-height"), Some("200px"));
    assert_eq!(menu.child_elements().len(), FRUITS.len());

    assert!(page.key(KeyCode::DOWN));
    assert!(page.key(KeyCode::DOWN));
    assert_eq!(page.handle.displayed_value(), "apricot");
    assert_eq!(page.input.render().get_attr("value"), Some("apricot"));
    assert_eq!(
        page.input.render().get_attr("aria-activedescendant"),
        Some("dropout-0-item-1")
    );
    let menu = page.menu().unwrap();
    assert_eq!(menu.child_elements()[1].get_attr("aria-selected"), Some("true"));

    assert!(page.key(KeyCode::ENTER));
    assert_eq!(page.handle.lifecycle(), Lifecycle::Idle);
    assert_eq!(page.handle.typed_value(), "apricot");
    assert_eq!(*page.selected.borrow(), vec!["apricot".to_string()]);
    assert!(page.menu().is_none());

    let root = page.handle.render([page.input.render()]);
    assert_eq!(root.get_attr("aria-expanded"), Some("false"));
}

#[test]
fn test_arrow_up_starts_from_the_end() {
    let page = Page::new();
    assert!(page.key(KeyCode::UP));
    assert_eq!(page.handle.lifecycle(), Lifecycle::Navigating);
    assert_eq!(page.handle.navigated_value(), None);
    assert!(page.key(KeyCode::UP));
    assert_eq!(page.handle.navigated_value(), Some("blueberry".to_string()));
    assert!(page.key(KeyCode::UP));
    assert_eq!(page.handle.navigated_value(), Some("banana".to_string()));
}

#[test]
fn test_escape_restores_typed_value() {
    let page = Page::new();
    page.type_text("b");
    page.key(KeyCode::DOWN);
    assert_eq!(page.handle.displayed_value(), "apple");

    page.key(KeyCode::ESCAPE);
    assert_eq!(page.handle.lifecycle(), Lifecycle::Idle);
    assert_eq!(page.handle.displayed_value(), "b");
    assert!(page.selected.borrow().is_empty());
}

#[test]
fn test_pointer_selection_survives_blur() {
    let page = Page::new();
    page.type_text("bl");
    let node = page.list.option_node(4).unwrap();

    let mut down = Event::pointer(event_types::POINTER_DOWN, node);
    assert!(page.list.handle_event(&mut down));
    assert!(down.is_default_prevented());

    // Focus leaves the input before the click lands
    page.input.handle_event(&mut Event::blur(page.handle.input_node()));
    assert_eq!(page.handle.lifecycle(), Lifecycle::SelectingWithPointer);

    page.doc
        .dispatch_global(&mut Event::pointer(event_types::POINTER_UP, node));
    page.list.handle_event(&mut Event::click(node));

    assert_eq!(page.handle.typed_value(), "blueberry");
    assert_eq!(*page.selected.borrow(), vec!["blueberry".to_string()]);
    assert!(page.menu().is_none());
}

#[test]
fn test_drag_off_option_cancels_and_typing_resumes() {
    let page = Page::new();
    page.type_text("ap");
    page.key(KeyCode::DOWN);
    assert_eq!(page.handle.displayed_value(), "apple");

    let node = page.list.option_node(1).unwrap();
    page.list
        .handle_event(&mut Event::pointer(event_types::POINTER_DOWN, node));
    page.input.handle_event(&mut Event::blur(page.handle.input_node()));
    assert_eq!(page.handle.lifecycle(), Lifecycle::SelectingWithPointer);
    assert!(page.menu().is_some());

    // Released away from the pressed option
    page.doc
        .dispatch_global(&mut Event::pointer(event_types::POINTER_UP, sus_core::DOCUMENT_NODE));
    assert_eq!(page.handle.lifecycle(), Lifecycle::Idle);
    assert_eq!(page.handle.pressed_option(), None);
    assert_eq!(page.handle.navigated_value(), None);
    assert_eq!(page.input.render().get_attr("value"), Some("ap"));
    assert!(page.menu().is_none());
    assert!(page.selected.borrow().is_empty());

    // The combobox takes input again
    assert!(!page.key(KeyCode::ESCAPE));
    page.type_text("banana");
    assert_eq!(page.handle.lifecycle(), Lifecycle::Suggesting);
    assert_eq!(page.handle.typed_value(), "banana");
    assert!(page.menu().is_some());

    page.key(KeyCode::ESCAPE);
    assert_eq!(page.handle.lifecycle(), Lifecycle::Idle);
    assert!(page.menu().is_none());
}

#[test]
fn test_blur_closes_suggestions() {
    let page = Page::new();
    page.type_text("av");
    page.key(KeyCode::DOWN);
    page.input.handle_event(&mut Event::blur(page.handle.input_node()));

    assert_eq!(page.handle.lifecycle(), Lifecycle::Idle);
    assert_eq!(page.handle.navigated_value(), None);
    assert_eq!(page.handle.typed_value(), "av");
}

#[test]
fn test_clearing_input_closes_list() {
    let page = Page::new();
    page.type_text("ap");
    page.type_text("   ");
    assert_eq!(page.handle.lifecycle(), Lifecycle::Idle);
    assert_eq!(page.handle.typed_value(), "");
}

#[test]
fn test_caller_handler_can_veto_internal_handling() {
    let doc = Document::shared(Size::new(800.0, 600.0));
    let handle = ComboboxHandle::new(&doc);
    let input = ComboboxInput::new(&handle).on_key_down(|event| {
        if event.key() == Some(KeyCode::DOWN) {
            event.prevent_default();
        }
    });
    let list = ComboboxList::new(&handle).options(FRUITS.map(ComboboxOption::new));
    list.mount();

    input.handle_event(&mut Event::key_down(handle.input_node(), KeyCode::DOWN));
    assert_eq!(handle.lifecycle(), Lifecycle::Idle);

    input.handle_event(&mut Event::key_down(handle.input_node(), KeyCode::UP));
    assert_eq!(handle.lifecycle(), Lifecycle::Navigating);
}

#[test]
fn test_dropping_list_cleans_up_host() {
    let page = Page::new();
    page.type_text("a");
    assert_eq!(page.doc.portal_count(), 1);
    assert_eq!(page.doc.listener_count(event_types::POINTER_UP), 1);

    let Page { doc, handle, list, .. } = page;
    drop(list);
    assert_eq!(doc.portal_count(), 0);
    assert_eq!(doc.listener_count(event_types::POINTER_UP), 0);
    assert!(handle.options().is_empty());
}
