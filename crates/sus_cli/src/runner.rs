//! Headless scenario runner
//!
//! Mounts the scenario's widgets on a fresh [`Document`], feeds the steps in
//! order and checks expectations against each widget's observable state.
//! Malformed steps (unknown widget, wrong widget kind, unrendered option)
//! abort the run; failed expectations are recorded and the run continues.

use anyhow::{bail, Context, Result};
use indexmap::IndexMap;
use serde_json::{json, Value};
use std::cell::Cell;
use std::rc::Rc;
use sus_core::{div, event_types, Document, Event, KeyCode, NodeId, Size, DOCUMENT_NODE};
use sus_image::{BlockingImageLoader, ImageCache, ImageLoader};
use sus_widgets::{
    Accordion, AccordionMode, BackgroundImage, ComboboxHandle, ComboboxInput, ComboboxList, ComboboxOption,
    ImageContext, LazyImage, LazyImageState, MatchMedia, Reveal, Widget,
};
use tracing::{debug, info};

use crate::config::SusConfig;
use crate::report::{Failure, RunReport};
use crate::scenario::{to_rect, Scenario, Step, WidgetSpec};

enum Mounted {
    Combobox {
        handle: ComboboxHandle,
        input: ComboboxInput,
        list: ComboboxList,
    },
    Reveal {
        reveal: Reveal,
        appeared: Rc<Cell<u32>>,
    },
    BackgroundImage(BackgroundImage),
    LazyImage(LazyImage),
    Accordion(Accordion),
    MatchMedia(MatchMedia),
}

impl Mounted {
    fn kind(&self) -> &'static str {
        match self {
            Mounted::Combobox { .. } => "combobox",
            Mounted::Reveal { .. } => "reveal",
            Mounted::BackgroundImage(_) | Mounted::LazyImage(_) => "lazy_image",
            Mounted::Accordion(_) => "accordion",
            Mounted::MatchMedia(_) => "match_media",
        }
    }

    /// Node a `set_rect` step moves
    fn node(&self) -> Option<NodeId> {
        match self {
            Mounted::Combobox { handle, .. } => Some(handle.input_node()),
            Mounted::Reveal { reveal, .. } => Some(reveal.target()),
            Mounted::BackgroundImage(image) => Some(image.node()),
            Mounted::LazyImage(image) => Some(image.node()),
            Mounted::Accordion(_) | Mounted::MatchMedia(_) => None,
        }
    }
}

fn image_snapshot(state: LazyImageState) -> Value {
    let (width, height) = state.image_data.as_ref().map(|d| d.dimensions()).unzip();
    json!({
        "seen_before": state.seen_before,
        "visible": state.img_visible,
        "loaded": state.img_loaded,
        "width": width,
        "height": height,
    })
}

/// Look up a dotted path such as `matches.md`
fn lookup<'a>(value: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.').try_fold(value, |value, key| value.get(key))
}

pub struct Runner {
    config: SusConfig,
    doc: Rc<Document>,
    loader: Rc<BlockingImageLoader>,
    images: ImageContext,
    widgets: IndexMap<String, Mounted>,
}

impl Runner {
    pub fn new(config: SusConfig, viewport: Option<Size>) -> Self {
        let doc = Document::shared(viewport.unwrap_or_else(|| config.viewport.size()));
        doc.set_color_scheme(config.viewport.color_scheme);

        let loader = Rc::new(BlockingImageLoader::new());
        let images = ImageContext::new(&doc, loader.clone()).with_cache(ImageCache::new());

        Self {
            config,
            doc,
            loader,
            images,
            widgets: IndexMap::new(),
        }
    }

    pub fn document(&self) -> &Rc<Document> {
        &self.doc
    }

    /// Mount the widgets, run every step and snapshot the final state
    pub fn run(config: SusConfig, scenario: &Scenario) -> Result<RunReport> {
        let viewport = scenario.viewport.map(|[w, h]| Size::new(w, h));
        let mut runner = Self::new(config, viewport);
        let mut report = RunReport::new(scenario.name.clone());

        for spec in &scenario.widgets {
            runner
                .mount(spec)
                .with_context(|| format!("Failed to mount `{}`", spec.id()))?;
        }

        for (index, step) in scenario.steps.iter().enumerate() {
            debug!(index, ?step, "step");
            runner
                .step(index, step, &mut report)
                .with_context(|| format!("Step {index} failed"))?;
            report.steps += 1;
        }

        report.widgets = runner.snapshot();
        info!(
            scenario = %scenario.name,
            steps = report.steps,
            expectations = report.expectations,
            failures = report.failures.len(),
            "scenario finished"
        );
        Ok(report)
    }

    pub fn mount(&mut self, spec: &WidgetSpec) -> Result<()> {
        if self.widgets.contains_key(spec.id()) {
            bail!("duplicate widget id `{}`", spec.id());
        }

        let mounted = match spec {
            WidgetSpec::Combobox {
                options,
                rect,
                select_on_click,
                ..
            } => {
                let handle = ComboboxHandle::new(&self.doc);
                let input = ComboboxInput::new(&handle).select_on_click(*select_on_click);
                let list = ComboboxList::new(&handle).options(options.iter().map(ComboboxOption::new));
                if let Some(rect) = rect {
                    self.doc.set_rect(handle.input_node(), to_rect(*rect));
                }
                list.mount();
                Mounted::Combobox { handle, input, list }
            }
            WidgetSpec::Reveal {
                rect, once, options, ..
            } => {
                let appeared = Rc::new(Cell::new(0));
                let counter = appeared.clone();
                let mut reveal = Reveal::new(&self.doc, vec![div()], move || counter.set(counter.get() + 1))?
                    .once(*once)
                    .options(options.clone().unwrap_or_else(|| self.config.observer.clone()));
                if let Some(rect) = rect {
                    self.doc.set_rect(reveal.target(), to_rect(*rect));
                }
                reveal.mount();
                Mounted::Reveal { reveal, appeared }
            }
            WidgetSpec::LazyImage {
                src,
                rect,
                critical,
                background,
                ..
            } => {
                let rect = rect.map(to_rect);
                if *background {
                    let mut image = BackgroundImage::new(&self.images, src.as_str(), vec![div()])?.critical(*critical);
                    if let Some(rect) = rect {
                        self.doc.set_rect(image.node(), rect);
                    }
                    image.mount();
                    Mounted::BackgroundImage(image)
                } else {
                    let mut image = LazyImage::new(&self.images, src.as_str()).critical(*critical);
                    if let Some(rect) = rect {
                        self.doc.set_rect(image.node(), rect);
                    }
                    image.mount();
                    Mounted::LazyImage(image)
                }
            }
            WidgetSpec::Accordion { folds, multi, open, .. } => {
                let mode = if *multi { AccordionMode::Multi } else { AccordionMode::Single };
                let accordion = folds
                    .iter()
                    .fold(Accordion::new(&self.doc).mode(mode), |accordion, label| {
                        accordion.fold(label.as_str(), [div().text(label.as_str())])
                    });
                for index in open {
                    accordion.set_expanded(*index, true);
                }
                Mounted::Accordion(accordion)
            }
            WidgetSpec::MatchMedia { queries, .. } => {
                let queries = queries.clone().unwrap_or_else(|| self.config.media_queries());
                let mut media = MatchMedia::new(&self.doc, queries);
                media.mount()?;
                Mounted::MatchMedia(media)
            }
        };

        debug!(id = spec.id(), kind = mounted.kind(), "widget mounted");
        self.widgets.insert(spec.id().to_string(), mounted);
        Ok(())
    }

    fn widget(&self, id: &str) -> Result<&Mounted> {
        self.widgets
            .get(id)
            .with_context(|| format!("unknown widget `{id}`"))
    }

    fn combobox(&self, id: &str) -> Result<(&ComboboxHandle, &ComboboxInput, &ComboboxList)> {
        match self.widget(id)? {
            Mounted::Combobox { handle, input, list } => Ok((handle, input, list)),
            other => bail!("`{id}` is a {}, not a combobox", other.kind()),
        }
    }

    fn option_node(&self, id: &str, index: usize) -> Result<NodeId> {
        let (_, _, list) = self.combobox(id)?;
        list.option_node(index)
            .with_context(|| format!("option {index} of `{id}` is not rendered"))
    }

    pub fn step(&mut self, index: usize, step: &Step, report: &mut RunReport) -> Result<()> {
        match step {
            Step::Type { widget, text } => {
                let (handle, input, _) = self.combobox(widget)?;
                input.handle_event(&mut Event::change(handle.input_node(), text.as_str()));
            }
            Step::Key { widget, key } => {
                let code = KeyCode::from_name(key);
                if code == KeyCode::UNKNOWN {
                    bail!("unknown key `{key}`");
                }
                let (handle, input, _) = self.combobox(widget)?;
                input.handle_event(&mut Event::key_down(handle.input_node(), code));
            }
            Step::Focus { widget } => {
                let (handle, input, _) = self.combobox(widget)?;
                self.doc.focus(handle.input_node());
                input.handle_event(&mut Event::focus(handle.input_node()));
            }
            Step::Blur { widget } => {
                let (handle, input, _) = self.combobox(widget)?;
                self.doc.blur(handle.input_node());
                input.handle_event(&mut Event::blur(handle.input_node()));
            }
            Step::ClickInput { widget } => {
                let (handle, input, _) = self.combobox(widget)?;
                input.handle_event(&mut Event::click(handle.input_node()));
            }
            Step::ClickOption { widget, index } => {
                let node = self.option_node(widget, *index)?;
                let (_, _, list) = self.combobox(widget)?;
                list.handle_event(&mut Event::pointer(event_types::POINTER_DOWN, node));
                self.doc
                    .dispatch_global(&mut Event::pointer(event_types::POINTER_UP, node));
                list.handle_event(&mut Event::click(node));
            }
            Step::DragOff { widget, index } => {
                let node = self.option_node(widget, *index)?;
                let (_, _, list) = self.combobox(widget)?;
                list.handle_event(&mut Event::pointer(event_types::POINTER_DOWN, node));
                self.doc
                    .dispatch_global(&mut Event::pointer(event_types::POINTER_UP, DOCUMENT_NODE));
            }
            Step::Toggle { widget, fold } => match self.widget(widget)? {
                Mounted::Accordion(accordion) => {
                    let header = accordion
                        .header_node(*fold)
                        .with_context(|| format!("`{widget}` has no fold {fold}"))?;
                    accordion.handle_event(&mut Event::click(header));
                }
                other => bail!("`{widget}` is a {}, not an accordion", other.kind()),
            },
            Step::SetRect { widget, rect } => {
                let mounted = self.widget(widget)?;
                let node = mounted
                    .node()
                    .with_context(|| format!("a {} has no rect", mounted.kind()))?;
                self.doc.set_rect(node, to_rect(*rect));
            }
            Step::Resize { width, height } => self.doc.set_viewport(Size::new(*width, *height)),
            Step::ColorScheme { scheme } => self.doc.set_color_scheme(*scheme),
            Step::Tick { frames } => {
                for _ in 0..*frames {
                    self.doc.tick();
                }
            }
            Step::Pump => {
                let delivered = self.loader.pump();
                debug!(delivered, "image loads delivered");
            }
            Step::Expect {
                widget,
                field,
                equals,
            } => {
                let snapshot = self.observe(widget)?;
                let actual = lookup(&snapshot, field)
                    .cloned()
                    .with_context(|| format!("`{widget}` has no field `{field}`"))?;
                report.expectations += 1;
                if actual != *equals {
                    let failure = Failure {
                        step: index,
                        widget: widget.clone(),
                        field: field.clone(),
                        expected: equals.clone(),
                        actual,
                    };
                    info!("{failure}");
                    report.record_failure(failure);
                }
            }
        }
        Ok(())
    }

    /// Observable state of one widget
    pub fn observe(&self, id: &str) -> Result<Value> {
        let value = match self.widget(id)? {
            Mounted::Combobox { handle, input, .. } => {
                let selection = self
                    .doc
                    .selection(handle.input_node())
                    .map(|s| json!([s.start, s.end]));
                json!({
                    "lifecycle": handle.lifecycle().as_str(),
                    "open": handle.is_open(),
                    "typed_value": handle.typed_value(),
                    "displayed_value": handle.displayed_value(),
                    "navigated_value": handle.navigated_value(),
                    "active_descendant": handle.active_descendant(),
                    "input_value": input.render().get_attr("value"),
                    "selection": selection,
                })
            }
            Mounted::Reveal { reveal, appeared } => {
                let visibility = reveal.visibility().unwrap_or_default();
                json!({
                    "appeared": appeared.get(),
                    "visible": visibility.has_been_visible,
                    "observing": reveal.is_observing(),
                })
            }
            Mounted::BackgroundImage(image) => image_snapshot(image.state()),
            Mounted::LazyImage(image) => image_snapshot(image.state()),
            Mounted::Accordion(accordion) => json!({ "expanded": accordion.expanded() }),
            Mounted::MatchMedia(media) => {
                let width = self.doc.viewport().width;
                json!({
                    "matches": media.matches(),
                    "device_class": self.config.breakpoints.device_class(width),
                })
            }
        };
        Ok(value)
    }

    pub fn snapshot(&self) -> IndexMap<String, Value> {
        self.widgets
            .keys()
            .filter_map(|id| Some((id.clone(), self.observe(id).ok()?)))
            .collect()
    }
}
