//! Accordion
//!
//! A tablist of folds. Each fold is a header (`role=tab`) followed by its
//! panel (`role=tabpanel`). Plain elements may sit between folds and are
//! rendered untouched.
//!
//! In [`AccordionMode::Single`] at most one fold is open; opening a fold
//! closes the rest. In [`AccordionMode::Multi`] folds toggle independently.

use std::cell::RefCell;
use std::rc::Rc;

use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};
use sus_core::{div, event_types, Document, Element, Event, KeyCode, NodeId};
use tracing::trace;

use crate::widget::Widget;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccordionMode {
    #[default]
    Single,
    Multi,
}

struct Fold {
    header: NodeId,
    id: String,
    section_id: String,
    label: String,
    content: Vec<Element>,
}

enum Item {
    Fold(Fold),
    Plain(Element),
}

pub struct Accordion {
    document: Rc<Document>,
    instance: String,
    mode: AccordionMode,
    items: Vec<Item>,
    expanded: RefCell<FxHashSet<usize>>,
}

impl Accordion {
    pub fn new(document: &Rc<Document>) -> Self {
        Self {
            document: document.clone(),
            instance: document.next_instance_id("accordion"),
            mode: AccordionMode::Single,
            items: Vec::new(),
            expanded: RefCell::new(FxHashSet::default()),
        }
    }

    pub fn mode(mut self, mode: AccordionMode) -> Self {
        self.mode = mode;
        self
    }

    /// Let several folds stay open at once
    pub fn multi_open(self) -> Self {
        self.mode(AccordionMode::Multi)
    }

    /// Add a fold with generated header and panel ids
    pub fn fold(self, label: impl Into<String>, content: impl IntoIterator<Item = Element>) -> Self {
        let index = self.fold_count();
        let id = format!("{}-fold-{index}", self.instance);
        let section_id = format!("{}-section-{index}", self.instance);
        self.fold_with_ids(id, section_id, label, content)
    }

    /// Add a fold with caller-chosen header and panel ids
    pub fn fold_with_ids(
        mut self,
        id: impl Into<String>,
        section_id: impl Into<String>,
        label: impl Into<String>,
        content: impl IntoIterator<Item = Element>,
    ) -> Self {
        self.items.push(Item::Fold(Fold {
            header: self.document.alloc_node(),
            id: id.into(),
            section_id: section_id.into(),
            label: label.into(),
            content: content.into_iter().collect(),
        }));
        self
    }

    /// Add a non-fold child
    pub fn child(mut self, child: Element) -> Self {
        self.items.push(Item::Plain(child));
        self
    }

    /// Open the most recently added fold
    pub fn default_open(self) -> Self {
        if let Some(index) = self.fold_count().checked_sub(1) {
            self.set_expanded(index, true);
        }
        self
    }

    pub fn get_mode(&self) -> AccordionMode {
        self.mode
    }

    pub fn fold_count(&self) -> usize {
        self.folds().count()
    }

    /// Header node of the fold at `index`
    pub fn header_node(&self, index: usize) -> Option<NodeId> {
        self.folds().nth(index).map(|fold| fold.header)
    }

    pub fn is_expanded(&self, index: usize) -> bool {
        self.expanded.borrow().contains(&index)
    }

    /// Open fold indices in ascending order
    pub fn expanded(&self) -> Vec<usize> {
        let mut open: Vec<usize> = self.expanded.borrow().iter().copied().collect();
        open.sort_unstable();
        open
    }

    pub fn set_expanded(&self, index: usize, expanded: bool) {
        if index >= self.fold_count() {
            return;
        }
        let mut open = self.expanded.borrow_mut();
        if expanded {
            if self.mode == AccordionMode::Single {
                open.clear();
            }
            open.insert(index);
        } else {
            open.remove(&index);
        }
        trace!(accordion = %self.instance, index, expanded, "fold toggled");
    }

    pub fn toggle(&self, index: usize) {
        self.set_expanded(index, !self.is_expanded(index));
    }

    fn folds(&self) -> impl Iterator<Item = &Fold> {
        self.items.iter().filter_map(|item| match item {
            Item::Fold(fold) => Some(fold),
            Item::Plain(_) => None,
        })
    }
}

impl Widget for Accordion {
    fn render(&self) -> Element {
        let mut root = div().class("accordion").attr("role", "tablist");
        let mut index = 0;

        for item in &self.items {
            match item {
                Item::Plain(element) => root = root.child(element.clone()),
                Item::Fold(fold) => {
                    let open = self.is_expanded(index);
                    index += 1;

                    let header = div()
                        .node(fold.header)
                        .class("fold")
                        .attr("role", "tab")
                        .attr("tabindex", "0")
                        .attr("id", fold.id.as_str())
                        .attr("aria-controls", fold.section_id.as_str())
                        .attr("aria-expanded", open.to_string())
                        .text(fold.label.as_str());
                    let panel = div()
                        .attr("tabindex", "0")
                        .attr("role", "tabpanel")
                        .attr("id", fold.section_id.as_str())
                        .attr("aria-labelledby", fold.id.as_str())
                        .attr("aria-hidden", (!open).to_string())
                        .children(fold.content.clone());
                    root = root.child(header).child(panel);
                }
            }
        }
        root
    }

    fn handle_event(&self, event: &mut Event) -> bool {
        let Some(index) = self.folds().position(|fold| fold.header == event.target) else {
            return false;
        };

        match event.event_type {
            event_types::CLICK => self.toggle(index),
            event_types::KEY_DOWN if matches!(event.key(), Some(KeyCode::ENTER | KeyCode::SPACE)) => {
                self.toggle(index)
            }
            _ => {}
        }
        true
    }
}
