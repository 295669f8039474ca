//! Intersection observation
//!
//! Host-side model of viewport intersection tracking. Each observer watches a
//! set of target nodes against a root (the viewport, or a node's rect),
//! optionally grown or shrunk by a root margin. Entries are computed when the
//! host document ticks a frame:
//!
//! - a target's first computation always produces an entry
//! - afterwards an entry is produced when the target's `is_intersecting` flag
//!   or the number of crossed thresholds changes

use std::fmt;
use std::rc::Rc;
use std::str::FromStr;

use indexmap::IndexMap;
use nom::{
    branch::alt,
    bytes::complete::tag,
    character::complete::{char, multispace0, multispace1},
    combinator::{all_consuming, map},
    multi::separated_list1,
    Finish,
};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use slotmap::{new_key_type, SlotMap};
use smallvec::{smallvec, SmallVec};

use crate::element::NodeId;
use crate::error::RootMarginError;
use crate::geometry::{EdgeInsets, Rect, Size};
use crate::media_query::{number, ParseResult};

new_key_type! {
    /// Handle for an intersection observer owned by a document
    pub struct ObserverId;
}

/// Margin length: absolute or relative to the root's size
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum MarginLength {
    Px(f32),
    Percent(f32),
}

impl MarginLength {
    fn resolve(self, basis: f32) -> f32 {
        match self {
            MarginLength::Px(px) => px,
            MarginLength::Percent(pct) => basis * pct / 100.0,
        }
    }
}

impl fmt::Display for MarginLength {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MarginLength::Px(v) => write!(f, "{v}px"),
            MarginLength::Percent(v) => write!(f, "{v}%"),
        }
    }
}

/// CSS margin shorthand applied to the root bounds
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RootMargin {
    pub top: MarginLength,
    pub right: MarginLength,
    pub bottom: MarginLength,
    pub left: MarginLength,
}

impl Default for RootMargin {
    fn default() -> Self {
        Self::uniform(MarginLength::Px(0.0))
    }
}

impl RootMargin {
    pub const fn uniform(length: MarginLength) -> Self {
        Self {
            top: length,
            right: length,
            bottom: length,
            left: length,
        }
    }

    /// Parse `"10px"`, `"10px 5%"`, `"1px 2px 3px"` or `"1px 2px 3px 4px"`
    pub fn parse(input: &str) -> Result<Self, RootMarginError> {
        let (_, lengths) = margin_list(input)
            .finish()
            .map_err(|_| RootMarginError(input.to_string()))?;

        let (top, right, bottom, left) = match lengths.as_slice() {
            [all] => (*all, *all, *all, *all),
            [v, h] => (*v, *h, *v, *h),
            [t, h, b] => (*t, *h, *b, *h),
            [t, r, b, l] => (*t, *r, *b, *l),
            _ => return Err(RootMarginError(input.to_string())),
        };
        Ok(Self {
            top,
            right,
            bottom,
            left,
        })
    }

    /// Percentages resolve against the root's height (top/bottom) and width
    /// (left/right)
    pub fn resolve(&self, root: &Rect) -> EdgeInsets {
        EdgeInsets::new(
            self.top.resolve(root.height()),
            self.right.resolve(root.width()),
            self.bottom.resolve(root.height()),
            self.left.resolve(root.width()),
        )
    }
}

fn margin_length(input: &str) -> ParseResult<MarginLength> {
    let (input, value) = number(input)?;
    alt((
        map(tag("px"), move |_| MarginLength::Px(value)),
        map(char('%'), move |_| MarginLength::Percent(value)),
    ))(input)
}

fn margin_list(input: &str) -> ParseResult<Vec<MarginLength>> {
    all_consuming(|input| {
        let (input, _) = multispace0(input)?;
        let (input, lengths) = separated_list1(multispace1, margin_length)(input)?;
        let (input, _) = multispace0(input)?;
        Ok((input, lengths))
    })(input)
}

impl FromStr for RootMargin {
    type Err = RootMarginError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for RootMargin {
    type Error = RootMarginError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<RootMargin> for String {
    fn from(margin: RootMargin) -> Self {
        margin.to_string()
    }
}

impl fmt::Display for RootMargin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {} {}", self.top, self.right, self.bottom, self.left)
    }
}

/// Sorted ratio thresholds in `[0, 1]`; a single number or a list when
/// deserialized
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(from = "ThresholdSpec", into = "Vec<f32>")]
pub struct Thresholds(SmallVec<[f32; 4]>);

#[derive(Deserialize)]
#[serde(untagged)]
enum ThresholdSpec {
    One(f32),
    Many(Vec<f32>),
}

impl From<ThresholdSpec> for Thresholds {
    fn from(spec: ThresholdSpec) -> Self {
        match spec {
            ThresholdSpec::One(t) => Thresholds::new([t]),
            ThresholdSpec::Many(ts) => Thresholds::new(ts),
        }
    }
}

impl From<Thresholds> for Vec<f32> {
    fn from(thresholds: Thresholds) -> Self {
        thresholds.0.into_vec()
    }
}

impl Default for Thresholds {
    fn default() -> Self {
        Self(smallvec![0.0])
    }
}

impl Thresholds {
    /// Values are clamped to `[0, 1]`, sorted and deduplicated. An empty
    /// list means `[0]`.
    pub fn new(values: impl IntoIterator<Item = f32>) -> Self {
        let mut values: SmallVec<[f32; 4]> = values
            .into_iter()
            .filter(|v| !v.is_nan())
            .map(|v| v.clamp(0.0, 1.0))
            .collect();
        values.sort_by(|a, b| a.total_cmp(b));
        values.dedup();
        if values.is_empty() {
            values.push(0.0);
        }
        Self(values)
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.0
    }

    /// Number of thresholds crossed at `ratio` (0 when not intersecting)
    fn crossed(&self, is_intersecting: bool, ratio: f32) -> usize {
        if !is_intersecting {
            return 0;
        }
        self.0.iter().filter(|t| ratio >= **t).count()
    }
}

/// Intersection observer configuration
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ObserverOptions {
    /// Root node; `None` means the viewport
    #[serde(skip)]
    pub root: Option<NodeId>,
    pub root_margin: RootMargin,
    pub threshold: Thresholds,
}

impl ObserverOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn root(mut self, node: NodeId) -> Self {
        self.root = Some(node);
        self
    }

    pub fn root_margin(mut self, margin: RootMargin) -> Self {
        self.root_margin = margin;
        self
    }

    pub fn threshold(mut self, threshold: f32) -> Self {
        self.threshold = Thresholds::new([threshold]);
        self
    }

    pub fn thresholds(mut self, thresholds: impl IntoIterator<Item = f32>) -> Self {
        self.threshold = Thresholds::new(thresholds);
        self
    }
}

/// One observation of a target
#[derive(Clone, Debug, PartialEq)]
pub struct IntersectionEntry {
    pub target: NodeId,
    /// Target rect, zero when the target has not been measured
    pub bounding_client_rect: Rect,
    pub intersection_rect: Rect,
    /// Root rect after applying the root margin
    pub root_bounds: Option<Rect>,
    pub intersection_ratio: f32,
    pub is_intersecting: bool,
    /// Host frame number
    pub time: u64,
}

pub type IntersectionCallback = Rc<dyn Fn(&[IntersectionEntry])>;

#[derive(Clone, Copy, PartialEq)]
struct TargetState {
    is_intersecting: bool,
    crossed: usize,
}

struct Observer {
    options: ObserverOptions,
    callback: IntersectionCallback,
    /// `None` until first computed
    targets: IndexMap<NodeId, Option<TargetState>>,
}

/// All intersection observers of a document
#[derive(Default)]
pub struct IntersectionRegistry {
    observers: SlotMap<ObserverId, Observer>,
}

impl IntersectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create(&mut self, options: ObserverOptions, callback: IntersectionCallback) -> ObserverId {
        self.observers.insert(Observer {
            options,
            callback,
            targets: IndexMap::new(),
        })
    }

    /// Start observing `target`; observing twice is a no-op
    pub fn observe(&mut self, id: ObserverId, target: NodeId) -> bool {
        match self.observers.get_mut(id) {
            Some(observer) => {
                observer.targets.entry(target).or_insert(None);
                true
            }
            None => false,
        }
    }

    pub fn unobserve(&mut self, id: ObserverId, target: NodeId) -> bool {
        self.observers
            .get_mut(id)
            .is_some_and(|o| o.targets.shift_remove(&target).is_some())
    }

    /// Stop observing all targets; the observer stays usable
    pub fn disconnect(&mut self, id: ObserverId) {
        if let Some(observer) = self.observers.get_mut(id) {
            observer.targets.clear();
        }
    }

    /// Drop the observer entirely
    pub fn release(&mut self, id: ObserverId) -> bool {
        self.observers.remove(id).is_some()
    }

    pub fn contains(&self, id: ObserverId) -> bool {
        self.observers.contains_key(id)
    }

    pub fn is_observing(&self, id: ObserverId, target: NodeId) -> bool {
        self.observers
            .get(id)
            .is_some_and(|o| o.targets.contains_key(&target))
    }

    pub fn len(&self) -> usize {
        self.observers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observers.is_empty()
    }

    /// Compute pending entries for every observer
    pub fn compute(
        &mut self,
        rects: &FxHashMap<NodeId, Rect>,
        viewport: Size,
        time: u64,
    ) -> Vec<(IntersectionCallback, Vec<IntersectionEntry>)> {
        let mut pending = Vec::new();

        for observer in self.observers.values_mut() {
            let root = match observer.options.root {
                None => Some(viewport.to_rect()),
                Some(node) => rects.get(&node).copied(),
            };
            let root_bounds = root.map(|r| r.expand(observer.options.root_margin.resolve(&r)));

            let mut entries = Vec::new();
            for (target, last) in observer.targets.iter_mut() {
                let entry = intersect(*target, rects.get(target).copied(), root_bounds, time);
                let state = TargetState {
                    is_intersecting: entry.is_intersecting,
                    crossed: observer
                        .options
                        .threshold
                        .crossed(entry.is_intersecting, entry.intersection_ratio),
                };

                if *last != Some(state) {
                    *last = Some(state);
                    entries.push(entry);
                }
            }

            if !entries.is_empty() {
                pending.push((observer.callback.clone(), entries));
            }
        }

        pending
    }
}

fn intersect(
    target: NodeId,
    target_rect: Option<Rect>,
    root_bounds: Option<Rect>,
    time: u64,
) -> IntersectionEntry {
    let bounding_client_rect = target_rect.unwrap_or(Rect::ZERO);
    let overlap = match (target_rect, root_bounds) {
        (Some(t), Some(root)) => t.intersect(&root),
        _ => None,
    };

    let (is_intersecting, intersection_ratio, intersection_rect) = match overlap {
        Some(rect) => {
            let target_area = bounding_client_rect.area();
            let ratio = if target_area > 0.0 {
                (rect.area() / target_area).min(1.0)
            } else {
                1.0
            };
            (true, ratio, rect)
        }
        None => (false, 0.0, Rect::ZERO),
    };

    IntersectionEntry {
        target,
        bounding_client_rect,
        intersection_rect,
        root_bounds,
        intersection_ratio,
        is_intersecting,
        time,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    fn recorder() -> (IntersectionCallback, Rc<RefCell<Vec<IntersectionEntry>>>) {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = seen.clone();
        let callback: IntersectionCallback =
            Rc::new(move |entries: &[IntersectionEntry]| sink.borrow_mut().extend_from_slice(entries));
        (callback, seen)
    }

    fn run(
        registry: &mut IntersectionRegistry,
        rects: &FxHashMap<NodeId, Rect>,
        time: u64,
    ) {
        for (callback, entries) in registry.compute(rects, Size::new(800.0, 600.0), time) {
            callback(&entries);
        }
    }

    #[test]
    fn test_root_margin_parse() {
        let m = RootMargin::parse("10px 5%").unwrap();
        assert_eq!(m.top, MarginLength::Px(10.0));
        assert_eq!(m.right, MarginLength::Percent(5.0));
        assert_eq!(m.bottom, MarginLength::Px(10.0));
        assert_eq!(m.left, MarginLength::Percent(5.0));

        let insets = m.resolve(&Rect::new(0.0, 0.0, 200.0, 100.0));
        assert_eq!(insets, EdgeInsets::new(10.0, 10.0, 10.0, 10.0));

        assert!(RootMargin::parse("10").is_err());
        assert!(RootMargin::parse("1px 2px 3px 4px 5px").is_err());
        assert!(RootMargin::parse("").is_err());
    }

    #[test]
    fn test_thresholds_normalized() {
        let t = Thresholds::new([1.5, 0.5, 0.5, -1.0]);
        assert_eq!(t.as_slice(), &[0.0, 0.5, 1.0]);
        assert_eq!(Thresholds::new([]).as_slice(), &[0.0]);
    }

    #[test]
    fn test_first_computation_always_reports() {
        let mut registry = IntersectionRegistry::new();
        let (callback, seen) = recorder();
        let id = registry.create(ObserverOptions::new(), callback);
        registry.observe(id, NodeId(1));

        // Unmeasured target still gets an initial, non-intersecting entry
        run(&mut registry, &FxHashMap::default(), 1);
        assert_eq!(seen.borrow().len(), 1);
        assert!(!seen.borrow()[0].is_intersecting);

        // No change, no entry
        run(&mut registry, &FxHashMap::default(), 2);
        assert_eq!(seen.borrow().len(), 1);
    }

    #[test]
    fn test_enter_and_leave() {
        let mut registry = IntersectionRegistry::new();
        let (callback, seen) = recorder();
        let id = registry.create(ObserverOptions::new(), callback);
        registry.observe(id, NodeId(1));

        let mut rects = FxHashMap::default();
        rects.insert(NodeId(1), Rect::new(0.0, 1000.0, 100.0, 100.0));
        run(&mut registry, &rects, 1);

        rects.insert(NodeId(1), Rect::new(0.0, 550.0, 100.0, 100.0));
        run(&mut registry, &rects, 2);

        let seen = seen.borrow();
        assert_eq!(seen.len(), 2);
        assert!(seen[1].is_intersecting);
        assert!((seen[1].intersection_ratio - 0.5).abs() < 1e-6);
        assert_eq!(seen[1].time, 2);
    }

    #[test]
    fn test_threshold_crossing_reports() {
        let mut registry = IntersectionRegistry::new();
        let (callback, seen) = recorder();
        let id = registry.create(ObserverOptions::new().thresholds([0.0, 1.0]), callback);
        registry.observe(id, NodeId(1));

        let mut rects = FxHashMap::default();
        rects.insert(NodeId(1), Rect::new(0.0, 550.0, 100.0, 100.0));
        run(&mut registry, &rects, 1);
        // Still partially visible: same crossed count, no entry
        rects.insert(NodeId(1), Rect::new(0.0, 540.0, 100.0, 100.0));
        run(&mut registry, &rects, 2);
        // Fully visible crosses 1.0
        rects.insert(NodeId(1), Rect::new(0.0, 100.0, 100.0, 100.0));
        run(&mut registry, &rects, 3);

        let ratios: Vec<f32> = seen.borrow().iter().map(|e| e.intersection_ratio).collect();
        assert_eq!(ratios.len(), 2);
        assert_eq!(ratios[1], 1.0);
    }

    #[test]
    fn test_root_margin_extends_viewport() {
        let mut registry = IntersectionRegistry::new();
        let (callback, seen) = recorder();
        let options = ObserverOptions::new().root_margin(RootMargin::parse("200px").unwrap());
        let id = registry.create(options, callback);
        registry.observe(id, NodeId(1));

        let mut rects = FxHashMap::default();
        rects.insert(NodeId(1), Rect::new(0.0, 700.0, 100.0, 100.0));
        run(&mut registry, &rects, 1);

        assert!(seen.borrow()[0].is_intersecting);
    }

    #[test]
    fn test_zero_area_target_touching_root() {
        let entry = intersect(
            NodeId(1),
            Some(Rect::new(10.0, 10.0, 0.0, 0.0)),
            Some(Rect::new(0.0, 0.0, 100.0, 100.0)),
            0,
        );
        assert!(entry.is_intersecting);
        assert_eq!(entry.intersection_ratio, 1.0);
    }

    #[test]
    fn test_unobserve_disconnect_release() {
        let mut registry = IntersectionRegistry::new();
        let (callback, _seen) = recorder();
        let id = registry.create(ObserverOptions::new(), callback);
        registry.observe(id, NodeId(1));
        registry.observe(id, NodeId(2));

        assert!(registry.unobserve(id, NodeId(1)));
        assert!(!registry.unobserve(id, NodeId(1)));
        assert!(registry.is_observing(id, NodeId(2)));

        registry.disconnect(id);
        assert!(!registry.is_observing(id, NodeId(2)));
        assert!(registry.contains(id));

        assert!(registry.release(id));
        assert!(!registry.release(id));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_options_deserialize() {
        #[derive(Deserialize)]
        struct Wrapper {
            observer: ObserverOptions,
        }
        let json = r#"{"observer": {"root_margin": "0px 0px 50px 0px", "threshold": 0.25}}"#;
        let parsed: Wrapper = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.observer.threshold.as_slice(), &[0.25]);
        assert_eq!(parsed.observer.root_margin.bottom, MarginLength::Px(50.0));
    }
}
