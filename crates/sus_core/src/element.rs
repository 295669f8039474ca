//! Element tree
//!
//! A small declarative description of what a widget renders: a tag,
//! ordered attributes and inline style, text and children. Elements that
//! the host must address (event targets, observed nodes) carry a [`NodeId`].
//!
//! ```
//! use sus_core::element::{div, element};
//!
//! let el = div()
//!     .attr("role", "listbox")
//!     .style("top", "40px")
//!     .child(element("li").text("apple"));
//!
//! assert_eq!(
//!     el.to_markup(),
//!     r#"<div role="listbox" style="top: 40px"><li>apple</li></div>"#
//! );
//! ```

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Host-assigned identifier of a rendered node
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub struct NodeId(pub u64);

/// Ordered attribute map
pub type Attributes = IndexMap<String, String>;

/// Ordered inline style map
pub type Style = IndexMap<String, String>;

/// Tags rendered without a closing tag
const VOID_TAGS: &[&str] = &["img", "input", "br", "hr", "meta", "link"];

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Element {
    node: Option<NodeId>,
    tag: String,
    attrs: Attributes,
    style: Style,
    text: Option<String>,
    children: Vec<Element>,
}

/// Create an element with the given tag
pub fn element(tag: impl Into<String>) -> Element {
    Element {
        tag: tag.into(),
        ..Default::default()
    }
}

pub fn div() -> Element {
    element("div")
}

impl Element {
    pub fn node(mut self, node: NodeId) -> Self {
        self.node = Some(node);
        self
    }

    pub fn attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attrs.insert(name.into(), value.into());
        self
    }

    /// Set the attribute when `value` is present, remove it otherwise
    pub fn attr_opt(mut self, name: impl Into<String>, value: Option<impl Into<String>>) -> Self {
        let name = name.into();
        match value {
            Some(value) => {
                self.attrs.insert(name, value.into());
            }
            None => {
                self.attrs.shift_remove(&name);
            }
        }
        self
    }

    /// Merge pass-through attributes; later values win
    pub fn attrs(mut self, attrs: &Attributes) -> Self {
        for (name, value) in attrs {
            self.attrs.insert(name.clone(), value.clone());
        }
        self
    }

    pub fn style(mut self, property: impl Into<String>, value: impl Into<String>) -> Self {
        self.style.insert(property.into(), value.into());
        self
    }

    /// Merge style overrides; later values win
    pub fn styles(mut self, style: &Style) -> Self {
        for (property, value) in style {
            self.style.insert(property.clone(), value.clone());
        }
        self
    }

    /// Append a class name to the `class` attribute
    pub fn class(mut self, class: &str) -> Self {
        match self.attrs.get_mut("class") {
            Some(existing) if !existing.is_empty() => {
                if !existing.split_whitespace().any(|c| c == class) {
                    existing.push(' ');
                    existing.push_str(class);
                }
            }
            _ => {
                self.attrs.insert("class".to_string(), class.to_string());
            }
        }
        self
    }

    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    pub fn child(mut self, child: Element) -> Self {
        self.children.push(child);
        self
    }

    pub fn children(mut self, children: impl IntoIterator<Item = Element>) -> Self {
        self.children.extend(children);
        self
    }

    pub fn node_id(&self) -> Option<NodeId> {
        self.node
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    pub fn get_attr(&self, name: &str) -> Option<&str> {
        self.attrs.get(name).map(String::as_str)
    }

    pub fn get_style(&self, property: &str) -> Option<&str> {
        self.style.get(property).map(String::as_str)
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.get_attr("class")
            .is_some_and(|classes| classes.split_whitespace().any(|c| c == class))
    }

    pub fn get_text(&self) -> Option<&str> {
        self.text.as_deref()
    }

    pub fn child_elements(&self) -> &[Element] {
        &self.children
    }

    /// Depth-first search including `self`
    pub fn find(&self, predicate: &dyn Fn(&Element) -> bool) -> Option<&Element> {
        if predicate(self) {
            return Some(self);
        }
        self.children.iter().find_map(|c| c.find(predicate))
    }

    /// All matching elements in document order
    pub fn find_all<'a>(&'a self, predicate: &dyn Fn(&Element) -> bool, out: &mut Vec<&'a Element>) {
        if predicate(self) {
            out.push(self);
        }
        for child in &self.children {
            child.find_all(predicate, out);
        }
    }

    pub fn find_by_attr(&self, name: &str, value: &str) -> Option<&Element> {
        self.find(&|el| el.get_attr(name) == Some(value))
    }

    pub fn find_node(&self, node: NodeId) -> Option<&Element> {
        self.find(&|el| el.node == Some(node))
    }

    /// Serialize to HTML-like markup (for snapshots and the CLI)
    pub fn to_markup(&self) -> String {
        let mut out = String::new();
        self.write_markup(&mut out);
        out
    }

    fn write_markup(&self, out: &mut String) {
        out.push('<');
        out.push_str(&self.tag);
        for (name, value) in &self.attrs {
            out.push(' ');
            out.push_str(name);
            out.push_str("=\"");
            escape_into(value, out);
            out.push('"');
        }
        if !self.style.is_empty() {
            let style = self
                .style
                .iter()
                .map(|(k, v)| format!("{k}: {v}"))
                .collect::<Vec<_>>()
                .join("; ");
            out.push_str(" style=\"");
            escape_into(&style, out);
            out.push('"');
        }

        if VOID_TAGS.contains(&self.tag.as_str()) {
            out.push_str(" />");
            return;
        }

        out.push('>');
        if let Some(text) = &self.text {
            escape_into(text, out);
        }
        for child in &self.children {
            child.write_markup(out);
        }
        out.push_str("</");
        out.push_str(&self.tag);
        out.push('>');
    }
}

fn escape_into(value: &str, out: &mut String) {
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            c => out.push(c),
        }
    }
}
