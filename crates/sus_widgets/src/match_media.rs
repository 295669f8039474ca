//! Named media queries
//!
//! [`MatchMedia`] keeps an ordered `alias -> query` bag and a matching
//! `alias -> bool` dictionary that follows the host viewport. Replacing the
//! bag re-subscribes only what changed.
//!
//! Also holds the Tailwind breakpoint presets.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use sus_core::{Document, MediaListenerId, MediaQueryError, MediaQueryEvent, MediaQueryList};
use tracing::{debug, trace};

/// Ordered `alias -> media query`
pub type MediaQueryBag = IndexMap<String, String>;

/// Ordered `alias -> currently matches`
pub type MediaMatches = IndexMap<String, bool>;

pub type MatchesCallback = Rc<dyn Fn(&MediaMatches)>;

/// What to change when the bag is replaced
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct QueryDiff {
    /// New or changed entries
    pub subscribe: Vec<(String, String)>,
    /// Removed or changed aliases
    pub unsubscribe: Vec<String>,
}

impl QueryDiff {
    pub fn is_empty(&self) -> bool {
        self.subscribe.is_empty() && self.unsubscribe.is_empty()
    }
}

pub fn diff_queries(previous: &MediaQueryBag, current: &MediaQueryBag) -> QueryDiff {
    let mut diff = QueryDiff::default();

    for (alias, query) in current {
        if previous.get(alias) != Some(query) {
            diff.subscribe.push((alias.clone(), query.clone()));
        }
    }
    for (alias, query) in previous {
        if current.get(alias) != Some(query) {
            diff.unsubscribe.push(alias.clone());
        }
    }
    diff
}

/// Dictionary over the aliases of `queries`, keeping known values
fn compute_matches(queries: &MediaQueryBag, previous: &MediaMatches) -> MediaMatches {
    queries
        .keys()
        .map(|alias| (alias.clone(), previous.get(alias).copied().unwrap_or(false)))
        .collect()
}

#[derive(Default)]
struct Shared {
    matches: RefCell<MediaMatches>,
    on_change: RefCell<Option<MatchesCallback>>,
}

impl Shared {
    fn update(&self, alias: &str, event: &MediaQueryEvent) {
        let changed = match self.matches.borrow_mut().get_mut(alias) {
            Some(slot) if *slot != event.matches => {
                *slot = event.matches;
                true
            }
            _ => false,
        };
        if changed {
            trace!(alias, media = %event.media, matches = event.matches, "media match changed");
            self.notify();
        }
    }

    fn notify(&self) {
        let callback = self.on_change.borrow().clone();
        if let Some(callback) = callback {
            let snapshot = self.matches.borrow().clone();
            callback(&snapshot);
        }
    }
}

pub struct MatchMedia {
    document: Rc<Document>,
    queries: MediaQueryBag,
    shared: Rc<Shared>,
    subscriptions: IndexMap<String, MediaListenerId>,
    mounted: bool,
}

impl MatchMedia {
    pub fn new(document: &Rc<Document>, queries: MediaQueryBag) -> Self {
        let shared = Shared::default();
        *shared.matches.borrow_mut() = compute_matches(&queries, &MediaMatches::new());
        Self {
            document: document.clone(),
            queries,
            shared: Rc::new(shared),
            subscriptions: IndexMap::new(),
            mounted: false,
        }
    }

    /// Called with the whole dictionary whenever a flag changes
    pub fn on_change<F: Fn(&MediaMatches) + 'static>(self, callback: F) -> Self {
        *self.shared.on_change.borrow_mut() = Some(Rc::new(callback));
        self
    }

    pub fn queries(&self) -> &MediaQueryBag {
        &self.queries
    }

    pub fn matches(&self) -> MediaMatches {
        self.shared.matches.borrow().clone()
    }

    /// `false` for unknown aliases
    pub fn is_match(&self, alias: &str) -> bool {
        self.shared.matches.borrow().get(alias).copied().unwrap_or(false)
    }

    pub fn is_mounted(&self) -> bool {
        self.mounted
    }

    /// Live host listeners
    pub fn subscription_count(&self) -> usize {
        self.subscriptions.len()
    }

    /// Subscribe every query. Nothing is subscribed when one fails to parse.
    pub fn mount(&mut self) -> Result<(), MediaQueryError> {
        if self.mounted {
            return Ok(());
        }
        let entries: Vec<(String, String)> = self.queries.iter().map(|(a, q)| (a.clone(), q.clone())).collect();
        validate(&entries)?;
        self.subscribe(entries)?;
        self.mounted = true;
        debug!(queries = self.queries.len(), "match media mounted");
        Ok(())
    }

    pub fn unmount(&mut self) {
        if !self.mounted {
            return;
        }
        let aliases: Vec<String> = self.subscriptions.keys().cloned().collect();
        self.unsubscribe(&aliases);
        self.mounted = false;
        debug!("match media unmounted");
    }

    /// Replace the bag. While mounted only new or changed queries are
    /// subscribed; removed or changed ones are unsubscribed first.
    pub fn set_queries(&mut self, queries: MediaQueryBag) -> Result<(), MediaQueryError> {
        let diff = diff_queries(&self.queries, &queries);
        if diff.is_empty() {
            return Ok(());
        }
        if self.mounted {
            validate(&diff.subscribe)?;
        }

        let before = self.matches();
        let after = compute_matches(&queries, &before);
        *self.shared.matches.borrow_mut() = after;
        self.queries = queries;

        if self.mounted {
            self.unsubscribe(&diff.unsubscribe);
            self.subscribe(diff.subscribe)?;
        }
        if self.matches() != before {
            self.shared.notify();
        }
        Ok(())
    }

    fn subscribe(&mut self, entries: Vec<(String, String)>) -> Result<(), MediaQueryError> {
        for (alias, query) in entries {
            let weak: Weak<Shared> = Rc::downgrade(&self.shared);
            let key = alias.clone();
            let id = self.document.add_media_listener(&query, move |event| {
                if let Some(shared) = weak.upgrade() {
                    shared.update(&key, event);
                }
            })?;
            self.subscriptions.insert(alias, id);
        }
        Ok(())
    }

    fn unsubscribe(&mut self, aliases: &[String]) {
        for alias in aliases {
            if let Some(id) = self.subscriptions.shift_remove(alias) {
                self.document.remove_media_listener(id);
            }
        }
    }
}

impl Drop for MatchMedia {
    fn drop(&mut self) {
        self.unmount();
    }
}

fn validate(entries: &[(String, String)]) -> Result<(), MediaQueryError> {
    for (_, query) in entries {
        MediaQueryList::parse(query)?;
    }
    Ok(())
}

// =============================================================================
// Tailwind presets
// =============================================================================

/// Tailwind-compatible breakpoint widths in CSS pixels
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TailwindBreakpoints {
    /// `sm`, 640px
    pub sm: f32,
    /// `md`, 768px
    pub md: f32,
    /// `lg`, 1024px
    pub lg: f32,
    /// `xl`, 1280px
    pub xl: f32,
    /// `2xl`, 1536px
    #[serde(rename = "2xl", alias = "xxl")]
    pub xxl: f32,
}

impl TailwindBreakpoints {
    pub const DEFAULT: Self = Self {
        sm: 640.0,
        md: 768.0,
        lg: 1024.0,
        xl: 1280.0,
        xxl: 1536.0,
    };

    /// One `min-width` query per breakpoint, smallest first
    pub fn query_bag(&self) -> MediaQueryBag {
        [("sm", self.sm), ("md", self.md), ("lg", self.lg), ("xl", self.xl), ("2xl", self.xxl)]
            .into_iter()
            .map(|(alias, width)| (alias.to_string(), format!("(min-width: {width}px)")))
            .collect()
    }

    pub fn device_class(&self, width: f32) -> DeviceClass {
        match width {
            w if w < self.md => DeviceClass::Mobile,
            w if w < self.lg => DeviceClass::Tablet,
            _ => DeviceClass::Desktop,
        }
    }
}

impl Default for TailwindBreakpoints {
    fn default() -> Self {
        Self::DEFAULT
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceClass {
    /// Below `md`
    Mobile,
    /// From `md` up to `lg`
    Tablet,
    /// `lg` and wider
    Desktop,
}

/// Classify a width with the default breakpoints
pub fn device_class_for_width(width: f32) -> DeviceClass {
    TailwindBreakpoints::DEFAULT.device_class(width)
}

/// Device class of the document viewport. A zero-width viewport counts as
/// desktop.
pub fn current_device_class(document: &Document) -> DeviceClass {
    Some(document.viewport().width)
        .filter(|w| *w > 0.0)
        .map(device_class_for_width)
        .unwrap_or(DeviceClass::Desktop)
}
