//! Integration tests for the host document
//!
//! These tests drive a `Document` the way widgets do:
//! - rect and intersection observers reporting on frame ticks
//! - observers scoped to a scrolling container
//! - media listeners following viewport and color scheme changes
//! - callbacks re-entering the document

use std::cell::RefCell;
use std::rc::Rc;

use sus_core::{
    div, event_types, ColorScheme, Document, Event, IntersectionEntry, ObserverOptions, Rect, Size, DOCUMENT_NODE,
};

fn doc() -> Rc<Document> {
    Document::shared(Size::new(800.0, 600.0))
}

#[test]
fn test_rect_then_intersection_order() {
    let doc = doc();
    let node = doc.alloc_node();
    let log = Rc::new(RefCell::new(Vec::<&'static str>::new()));

    let sink = log.clone();
    doc.observe_rect(node, move |_| sink.borrow_mut().push("rect"));
    let sink = log.clone();
    let observer = doc.create_intersection_observer(
        ObserverOptions::new(),
        Rc::new(move |_: &[IntersectionEntry]| sink.borrow_mut().push("intersection")),
    );
    doc.observe_intersection(observer, node);

    doc.set_rect(node, Rect::new(0.0, 0.0, 10.0, 10.0));
    assert_eq!(doc.tick(), 2);
    assert_eq!(*log.borrow(), vec!["rect", "intersection"]);

    // Nothing moved
    assert_eq!(doc.tick(), 0);
}

#[test]
fn test_observer_scoped_to_container() {
    let doc = doc();
    let container = doc.alloc_node();
    let item = doc.alloc_node();
    doc.set_rect(container, Rect::new(0.0, 0.0, 200.0, 200.0));
    doc.set_rect(item, Rect::new(0.0, 300.0, 50.0, 50.0));

    let seen = Rc::new(RefCell::new(Vec::new()));
    let sink = seen.clone();
    let observer = doc.create_intersection_observer(
        ObserverOptions::new().root(container),
        Rc::new(move |entries: &[IntersectionEntry]| {
            sink.borrow_mut().extend(entries.iter().map(|e| e.is_intersecting))
        }),
    );
    doc.observe_intersection(observer, item);

    // Inside the viewport, outside the container
    doc.tick();
    assert_eq!(*seen.borrow(), vec![false]);

    // Scrolled into the container
    doc.set_rect(item, Rect::new(0.0, 100.0, 50.0, 50.0));
    doc.tick();
    assert_eq!(*seen.borrow(), vec![false, true]);
}

#[test]
fn test_callbacks_can_reenter_document() {
    let doc = doc();
    let node = doc.alloc_node();
    doc.set_rect(node, Rect::new(0.0, 0.0, 10.0, 10.0));

    let weak = Rc::downgrade(&doc);
    let observer = doc.create_intersection_observer(
        ObserverOptions::new(),
        Rc::new(move |entries: &[IntersectionEntry]| {
            if let Some(doc) = weak.upgrade() {
                let portal = doc.create_portal();
                doc.set_portal_content(portal, Some(div().attr("data-target", entries[0].target.0.to_string())));
            }
        }),
    );
    doc.observe_intersection(observer, node);
    doc.tick();

    assert_eq!(doc.portal_count(), 1);
    assert_eq!(doc.body()[0].get_attr("data-target"), Some(node.0.to_string().as_str()));
}

#[test]
fn test_media_and_resize_listeners() {
    let doc = doc();
    let events = Rc::new(RefCell::new(Vec::new()));

    let sink = events.clone();
    doc.add_media_listener("(prefers-color-scheme: dark)", move |e| {
        sink.borrow_mut().push(format!("dark={}", e.matches))
    })
    .unwrap();
    let sink = events.clone();
    doc.add_media_listener("(min-width: 1024px)", move |e| {
        sink.borrow_mut().push(format!("wide={}", e.matches))
    })
    .unwrap();
    let sink = events.clone();
    doc.add_listener(event_types::RESIZE, move |event: &mut Event| {
        assert_eq!(event.target, DOCUMENT_NODE);
        sink.borrow_mut().push("resize".to_string());
    });

    doc.set_color_scheme(ColorScheme::Dark);
    doc.set_viewport(Size::new(1280.0, 720.0));
    doc.set_viewport(Size::new(1280.0, 720.0));

    assert_eq!(
        *events.borrow(),
        vec!["dark=false", "wide=false", "dark=true", "resize", "wide=true"]
    );
    assert!(doc.matches_media("screen and (orientation: landscape)").unwrap());
    assert!(doc.matches_media("(min-width: 10)").is_err());
}
