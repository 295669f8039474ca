//! Sus Core
//!
//! Foundational primitives for the sus widget kit:
//!
//! - **State Charts**: table-driven state machines for widget interaction states
//! - **Event Dispatch**: platform-agnostic events and document-level listeners
//! - **Element Tree**: what widgets render, with host-addressable node ids
//! - **Host Document**: node ids, layout rects, portals, observers and media
//!   queries for a single-threaded headless host
//!
//! # Example
//!
//! ```rust
//! use std::cell::Cell;
//! use std::rc::Rc;
//!
//! use sus_core::{Document, ObserverOptions, Rect, Size};
//!
//! let doc = Document::shared(Size::new(800.0, 600.0));
//! let node = doc.alloc_node();
//! doc.set_rect(node, Rect::new(0.0, 100.0, 50.0, 50.0));
//!
//! let visible = Rc::new(Cell::new(false));
//! let flag = visible.clone();
//! let observer = doc.create_intersection_observer(
//!     ObserverOptions::new(),
//!     Rc::new(move |entries| flag.set(entries.iter().any(|e| e.is_intersecting))),
//! );
//! doc.observe_intersection(observer, node);
//!
//! doc.tick();
//! assert!(visible.get());
//! ```

pub mod document;
pub mod element;
pub mod error;
pub mod events;
pub mod fsm;
pub mod geometry;
pub mod intersection;
pub mod media_query;
pub mod rect_observer;

pub use document::{Document, MediaListenerId, MediaQueryEvent, PortalId, DOCUMENT_NODE};
pub use element::{div, element, Attributes, Element, NodeId, Style};
pub use error::{CompositionError, MediaQueryError, RootMarginError};
pub use events::{event_types, wrap_event, Event, EventData, EventHandler, EventType, KeyCode, ListenerId};
pub use fsm::{StateChart, StateMachine};
pub use geometry::{EdgeInsets, Point, Rect, Size};
pub use intersection::{IntersectionEntry, ObserverId, ObserverOptions, RootMargin};
pub use media_query::{ColorScheme, MediaEnvironment, MediaQueryList};
pub use rect_observer::RectSubscriptionId;
