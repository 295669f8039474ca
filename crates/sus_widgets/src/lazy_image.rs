//! Lazy-loading images
//!
//! Two widgets share one loading core:
//!
//! - [`BackgroundImage`] paints a single child with `background-image`
//! - [`LazyImage`] renders a native `<img>`
//!
//! Loading starts when the widget first appears (through [`Reveal`]) or at
//! mount when `critical`. Decoded images go into the process-wide
//! [`ImageCache`] keyed by `src`; a widget whose `src` is already cached is
//! ready on first appearance without loading again.
//!
//! Completions that arrive after unmount (or after the widget is dropped)
//! are ignored.

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use sus_core::{div, element, CompositionError, Document, Element};
use sus_image::{ImageCache, ImageData, ImageError, ImageLoader, ImageSource};
use tracing::{debug, trace, warn};

use crate::reveal::Reveal;
use crate::widget::{only_child, Widget};

/// Called with the decoded image after a load
pub type LoadCallback = Rc<dyn Fn(&ImageData)>;

/// Called with the failure of a load
pub type ErrorCallback = Rc<dyn Fn(&ImageError)>;

/// Everything lazy images need from their host
#[derive(Clone)]
pub struct ImageContext {
    pub document: Rc<Document>,
    pub loader: Rc<dyn ImageLoader>,
    pub cache: ImageCache,
}

impl ImageContext {
    /// Context using the process-wide cache
    pub fn new(document: &Rc<Document>, loader: Rc<dyn ImageLoader>) -> Self {
        Self {
            document: document.clone(),
            loader,
            cache: ImageCache::global(),
        }
    }

    pub fn with_cache(mut self, cache: ImageCache) -> Self {
        self.cache = cache;
        self
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum LazyImageMessage {
    Loaded(ImageData),
    Visible,
    /// First appearance of an already cached image
    Reappear,
    Error(ImageError),
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct LazyImageState {
    /// `src` was cached when the widget mounted
    pub seen_before: bool,
    pub img_visible: bool,
    pub img_loaded: bool,
    pub image_data: Option<ImageData>,
}

impl LazyImageState {
    fn at_mount(cached: Option<ImageData>) -> Self {
        Self {
            seen_before: cached.is_some(),
            img_visible: false,
            img_loaded: cached.is_some(),
            image_data: cached,
        }
    }

    /// Visible (or critical), loaded and measured
    pub fn is_ready(&self, critical: bool) -> bool {
        (self.img_visible || critical) && self.img_loaded && self.image_data.is_some()
    }
}

pub fn reduce(state: &LazyImageState, message: LazyImageMessage) -> LazyImageState {
    let mut next = state.clone();
    match message {
        LazyImageMessage::Loaded(data) => {
            next.img_loaded = true;
            next.image_data = Some(data);
        }
        LazyImageMessage::Visible | LazyImageMessage::Reappear => next.img_visible = true,
        LazyImageMessage::Error(_) => next.img_loaded = false,
    }
    next
}

struct ImageCore {
    src: String,
    loader: Rc<dyn ImageLoader>,
    cache: ImageCache,
    critical: Cell<bool>,
    state: RefCell<LazyImageState>,
    mounted: Cell<bool>,
    loading: Cell<bool>,
    on_load: RefCell<Option<LoadCallback>>,
    on_error: RefCell<Option<ErrorCallback>>,
}

impl ImageCore {
    fn new(context: &ImageContext, src: String) -> Rc<Self> {
        Rc::new(Self {
            src,
            loader: context.loader.clone(),
            cache: context.cache.clone(),
            critical: Cell::new(false),
            state: RefCell::new(LazyImageState::default()),
            mounted: Cell::new(false),
            loading: Cell::new(false),
            on_load: RefCell::new(None),
            on_error: RefCell::new(None),
        })
    }

    fn send(&self, message: LazyImageMessage) {
        let next = reduce(&self.state.borrow(), message);
        *self.state.borrow_mut() = next;
    }

    fn mount(self: &Rc<Self>) {
        self.mounted.set(true);
        *self.state.borrow_mut() = LazyImageState::at_mount(self.cache.get(&self.src));
        debug!(src = %self.src, cached = self.state.borrow().seen_before, "lazy image mounted");

        if self.critical.get() {
            self.load();
        }
    }

    fn unmount(&self) {
        self.mounted.set(false);
        self.loading.set(false);
    }

    fn appear(self: &Rc<Self>) {
        if !self.mounted.get() {
            return;
        }
        self.send(LazyImageMessage::Visible);
        if self.state.borrow().seen_before {
            self.send(LazyImageMessage::Reappear);
        } else {
            self.load();
        }
    }

    fn load(self: &Rc<Self>) {
        if self.state.borrow().img_loaded || self.loading.replace(true) {
            return;
        }

        debug!(src = %self.src, "lazy image load started");
        let weak: Weak<ImageCore> = Rc::downgrade(self);
        self.loader.load(
            ImageSource::from_uri(&self.src),
            Box::new(move |result| match weak.upgrade() {
                Some(core) => core.finish(result),
                None => trace!("image load finished after the widget was dropped"),
            }),
        );
    }

    fn finish(&self, result: sus_image::Result<ImageData>) {
        if !self.mounted.get() || !self.loading.replace(false) {
            trace!(src = %self.src, "image load finished after unmount");
            return;
        }

        match result {
            Ok(data) => {
                self.cache.insert(self.src.as_str(), data.clone());
                self.send(LazyImageMessage::Loaded(data.clone()));
                let callback = self.on_load.borrow().clone();
                if let Some(callback) = callback {
                    callback(&data);
                }
            }
            Err(error) => {
                warn!(src = %self.src, %error, "image load failed");
                self.send(LazyImageMessage::Error(error.clone()));
                let callback = self.on_error.borrow().clone();
                if let Some(callback) = callback {
                    callback(&error);
                }
            }
        }
    }

    fn ready_data(&self) -> Option<ImageData> {
        let state = self.state.borrow();
        if state.is_ready(self.critical.get()) {
            state.image_data.clone()
        } else {
            None
        }
    }
}

/// Shared wiring of the two image widgets
struct LazyLoad {
    core: Rc<ImageCore>,
    reveal: Reveal,
}

impl LazyLoad {
    fn new(context: &ImageContext, src: String) -> Self {
        let core = ImageCore::new(context, src);
        let weak = Rc::downgrade(&core);
        let reveal = Reveal::for_node(&context.document, context.document.alloc_node(), move || {
            if let Some(core) = weak.upgrade() {
                core.appear();
            }
        })
        .once(true);
        Self { core, reveal }
    }

    fn mount(&mut self) {
        if self.core.mounted.get() {
            return;
        }
        self.core.mount();
        if !self.core.critical.get() {
            self.reveal.mount();
        }
    }

    fn unmount(&mut self) {
        self.reveal.unmount();
        self.core.unmount();
    }

    fn state(&self) -> LazyImageState {
        self.core.state.borrow().clone()
    }
}

macro_rules! lazy_image_builders {
    ($ty:ty) => {
        impl $ty {
            /// Load at mount instead of waiting for visibility
            pub fn critical(self, critical: bool) -> Self {
                self.lazy.core.critical.set(critical);
                self
            }

            pub fn on_load<F: Fn(&ImageData) + 'static>(self, callback: F) -> Self {
                *self.lazy.core.on_load.borrow_mut() = Some(Rc::new(callback));
                self
            }

            pub fn on_error<F: Fn(&ImageError) + 'static>(self, callback: F) -> Self {
                *self.lazy.core.on_error.borrow_mut() = Some(Rc::new(callback));
                self
            }

            pub fn src(&self) -> &str {
                &self.lazy.core.src
            }

            pub fn state(&self) -> LazyImageState {
                self.lazy.state()
            }

            pub fn is_mounted(&self) -> bool {
                self.lazy.core.mounted.get()
            }

            /// Node observed for visibility
            pub fn node(&self) -> sus_core::NodeId {
                self.lazy.reveal.target()
            }

            pub fn mount(&mut self) {
                self.lazy.mount();
            }

            /// Stop observing; pending loads are ignored from here on
            pub fn unmount(&mut self) {
                self.lazy.unmount();
            }
        }

        impl Drop for $ty {
            fn drop(&mut self) {
                self.lazy.unmount();
            }
        }
    };
}

/// A single child painted with a lazily loaded background image
pub struct BackgroundImage {
    lazy: LazyLoad,
    child: Element,
    placeholder: Option<Element>,
}

impl BackgroundImage {
    pub fn new(context: &ImageContext, src: impl Into<String>, children: Vec<Element>) -> Result<Self, CompositionError> {
        let child = only_child("BackgroundImage", children)?;
        Ok(Self {
            lazy: LazyLoad::new(context, src.into()),
            child,
            placeholder: None,
        })
    }

    /// Replace the default flickering placeholder
    pub fn placeholder(mut self, placeholder: Element) -> Self {
        self.placeholder = Some(placeholder);
        self
    }
}

lazy_image_builders!(BackgroundImage);

impl Widget for BackgroundImage {
    fn render(&self) -> Element {
        let ready = self.lazy.core.ready_data();

        let placeholder = self.placeholder.clone().unwrap_or_else(|| {
            let placeholder = div().class("default-placeholder");
            if ready.is_some() {
                placeholder
            } else {
                placeholder.class("flicker")
            }
        });

        let mut child = self.child.clone().class("lazy-img");
        if let Some(data) = ready {
            child = child
                .style("background-image", format!("url({})", self.lazy.core.src))
                .style("opacity", "1")
                .style("width", format!("{}px", data.width() as f32 / 3.0))
                .style("height", format!("{}px", data.height() as f32 / 3.0));
        }

        div()
            .node(self.lazy.reveal.target())
            .class("lazy-img-wrapper")
            .child(placeholder)
            .child(child)
    }
}

/// A native `<img>` that only loads once visible
pub struct LazyImage {
    lazy: LazyLoad,
    alt: Option<String>,
}

impl LazyImage {
    pub fn new(context: &ImageContext, src: impl Into<String>) -> Self {
        Self {
            lazy: LazyLoad::new(context, src.into()),
            alt: None,
        }
    }

    pub fn alt(mut self, alt: impl Into<String>) -> Self {
        self.alt = Some(alt.into());
        self
    }
}

lazy_image_builders!(LazyImage);

impl Widget for LazyImage {
    fn render(&self) -> Element {
        let core = &self.lazy.core;
        let state = core.state.borrow();
        let wrapper = div().node(self.lazy.reveal.target());

        if !(state.img_visible || core.critical.get()) {
            return wrapper;
        }

        let mut img = element("img")
            .class("lazy-img")
            .attr("src", core.src.as_str())
            .attr_opt("alt", self.alt.clone())
            .style("opacity", if state.img_loaded { "1" } else { "0" });
        if let (true, Some(data)) = (state.img_loaded, &state.image_data) {
            img = img
                .style("width", format!("{}px", data.width() as f32 / 2.0))
                .style("height", format!("{}px", data.height() as f32 / 2.0));
        }
        wrapper.child(img)
    }
}
