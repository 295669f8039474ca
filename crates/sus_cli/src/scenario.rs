//! Scenario files
//!
//! A scenario declares widgets on a headless page and a list of steps to
//! drive them. Scenarios are JSON:
//!
//! ```json
//! {
//!   "name": "pick a fruit",
//!   "widgets": [
//!     { "kind": "combobox", "id": "fruit", "options": ["apple", "apricot"], "rect": [10, 10, 200, 30] }
//!   ],
//!   "steps": [
//!     { "action": "type", "widget": "fruit", "text": "ap" },
//!     { "action": "key", "widget": "fruit", "key": "ArrowDown" },
//!     { "action": "expect", "widget": "fruit", "field": "lifecycle", "equals": "navigating" }
//!   ]
//! }
//! ```

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fs;
use std::path::Path;
use sus_core::{ObserverOptions, Rect};
use sus_widgets::MediaQueryBag;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Scenario {
    #[serde(default)]
    pub name: String,
    /// Overrides the configured viewport
    #[serde(default)]
    pub viewport: Option<[f32; 2]>,
    #[serde(default)]
    pub widgets: Vec<WidgetSpec>,
    #[serde(default)]
    pub steps: Vec<Step>,
}

/// `[x, y, width, height]`
pub type RectSpec = [f32; 4];

pub fn to_rect(spec: RectSpec) -> Rect {
    Rect::new(spec[0], spec[1], spec[2], spec[3])
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum WidgetSpec {
    Combobox {
        id: String,
        options: Vec<String>,
        /// Input rect
        #[serde(default)]
        rect: Option<RectSpec>,
        #[serde(default = "default_true")]
        select_on_click: bool,
    },
    Reveal {
        id: String,
        #[serde(default)]
        rect: Option<RectSpec>,
        #[serde(default)]
        once: bool,
        /// Falls back to the configured observer options
        #[serde(default)]
        options: Option<ObserverOptions>,
    },
    LazyImage {
        id: String,
        src: String,
        #[serde(default)]
        rect: Option<RectSpec>,
        #[serde(default)]
        critical: bool,
        /// Render as a background image on a div
        #[serde(default)]
        background: bool,
    },
    Accordion {
        id: String,
        folds: Vec<String>,
        #[serde(default)]
        multi: bool,
        #[serde(default)]
        open: Vec<usize>,
    },
    MatchMedia {
        id: String,
        /// Falls back to the configured media queries
        #[serde(default)]
        queries: Option<MediaQueryBag>,
    },
}

fn default_true() -> bool {
    true
}

impl WidgetSpec {
    pub fn id(&self) -> &str {
        match self {
            Self::Combobox { id, .. }
            | Self::Reveal { id, .. }
            | Self::LazyImage { id, .. }
            | Self::Accordion { id, .. }
            | Self::MatchMedia { id, .. } => id,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Step {
    /// Replace the combobox input text
    Type { widget: String, text: String },
    /// Key press on the combobox input (DOM key names)
    Key { widget: String, key: String },
    Focus { widget: String },
    Blur { widget: String },
    /// Click the combobox input
    ClickInput { widget: String },
    /// Press and release on a listed option, then click it
    ClickOption { widget: String, index: usize },
    /// Press on an option and release elsewhere
    DragOff { widget: String, index: usize },
    /// Toggle an accordion fold, by click
    Toggle { widget: String, fold: usize },
    /// Move a widget's node
    SetRect { widget: String, rect: RectSpec },
    Resize { width: f32, height: f32 },
    ColorScheme { scheme: sus_core::ColorScheme },
    Tick {
        #[serde(default = "default_frames")]
        frames: u32,
    },
    /// Deliver finished image loads
    Pump,
    /// Compare one observable field of a widget
    Expect { widget: String, field: String, equals: Value },
}

fn default_frames() -> u32 {
    1
}

impl Scenario {
    pub fn load(path: &Path) -> Result<Self> {
        let content =
            fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?;
        Self::from_json(&content).with_context(|| format!("Failed to parse {}", path.display()))
    }

    pub fn from_json(content: &str) -> Result<Self> {
        let scenario: Scenario = serde_json::from_str(content)?;

        let mut seen = std::collections::HashSet::new();
        for widget in &scenario.widgets {
            if !seen.insert(widget.id()) {
                anyhow::bail!("duplicate widget id `{}`", widget.id());
            }
        }
        Ok(scenario)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_scenario() {
        let scenario = Scenario::from_json(
            r#"{
                "name": "demo",
                "viewport": [390, 844],
                "widgets": [
                    {"kind": "combobox", "id": "fruit", "options": ["apple"], "rect": [0, 0, 100, 20]},
                    {"kind": "reveal", "id": "hero", "once": true, "options": {"root_margin": "50px"}},
                    {"kind": "lazy_image", "id": "pic", "src": "a.png", "background": true},
                    {"kind": "accordion", "id": "faq", "folds": ["a", "b"], "open": [1]},
                    {"kind": "match_media", "id": "bp"}
                ],
                "steps": [
                    {"action": "type", "widget": "fruit", "text": "ap"},
                    {"action": "tick"},
                    {"action": "tick", "frames": 3},
                    {"action": "color_scheme", "scheme": "dark"},
                    {"action": "expect", "widget": "fruit", "field": "open", "equals": true}
                ]
            }"#,
        )
        .unwrap();

        assert_eq!(scenario.viewport, Some([390.0, 844.0]));
        assert_eq!(scenario.widgets.len(), 5);
        assert!(matches!(
            &scenario.widgets[0],
            WidgetSpec::Combobox { select_on_click: true, rect: Some(_), .. }
        ));
        assert!(matches!(scenario.steps[1], Step::Tick { frames: 1 }));
        assert!(matches!(scenario.steps[2], Step::Tick { frames: 3 }));
        assert!(matches!(&scenario.steps[4], Step::Expect { equals: Value::Bool(true), .. }));
    }

    #[test]
    fn test_rejects_duplicate_ids_and_unknown_actions() {
        let duplicate = r#"{"widgets": [
            {"kind": "accordion", "id": "x", "folds": []},
            {"kind": "match_media", "id": "x"}
        ]}"#;
        assert!(Scenario::from_json(duplicate).is_err());

        assert!(Scenario::from_json(r#"{"steps": [{"action": "teleport"}]}"#).is_err());
    }
}
