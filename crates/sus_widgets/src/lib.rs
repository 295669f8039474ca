//! Sus Widgets
//!
//! Presentational widgets for the sus host document:
//!
//! - **Combobox** ("dropout"): autocomplete input and listbox driven by a
//!   table-driven state machine
//! - **Reveal**: calls back when its child enters the viewport
//! - **Lazy images**: [`BackgroundImage`] and [`LazyImage`], loaded on first
//!   appearance through a shared image cache
//! - **Accordion**: tablist of single- or multi-open folds
//! - **MatchMedia**: named media queries that follow the viewport
//! - **Portal**: body-level render target
//!
//! Widgets hold an `Rc<Document>` and never share state across threads.
//!
//! # Example
//!
//! ```rust
//! use std::cell::Cell;
//! use std::rc::Rc;
//!
//! use sus_core::{div, Document, Rect, Size};
//! use sus_widgets::Reveal;
//!
//! let doc = Document::shared(Size::new(800.0, 600.0));
//! let seen = Rc::new(Cell::new(false));
//! let flag = seen.clone();
//!
//! let mut reveal = Reveal::new(&doc, vec![div()], move || flag.set(true))
//!     .unwrap()
//!     .once(true);
//! doc.set_rect(reveal.target(), Rect::new(0.0, 50.0, 100.0, 100.0));
//! reveal.mount();
//!
//! doc.tick();
//! assert!(seen.get());
//! ```

pub mod accordion;
pub mod combobox;
pub mod lazy_image;
pub mod match_media;
pub mod portal;
pub mod reveal;
pub mod widget;

pub use accordion::{Accordion, AccordionMode};
pub use combobox::{ComboboxHandle, ComboboxInput, ComboboxList, ComboboxOption, Lifecycle};
pub use lazy_image::{BackgroundImage, ImageContext, LazyImage, LazyImageState};
pub use match_media::{
    current_device_class, device_class_for_width, DeviceClass, MatchMedia, MediaMatches, MediaQueryBag,
    TailwindBreakpoints,
};
pub use portal::Portal;
pub use reveal::{Reveal, RevealConfig, VisibilityState};
pub use widget::Widget;
