//! Bounding rect observation
//!
//! Callbacks receive a node's rect on the first frame after subscribing and
//! on every later frame where the rect changed. A node that was never
//! measured reports [`Rect::ZERO`].

use std::rc::Rc;

use rustc_hash::{FxHashMap, FxHashSet};
use slotmap::{new_key_type, SlotMap};

use crate::element::NodeId;
use crate::geometry::Rect;

new_key_type! {
    /// Handle for a rect subscription
    pub struct RectSubscriptionId;
}

pub type RectCallback = Rc<dyn Fn(Rect)>;

struct Subscription {
    node: NodeId,
    callback: RectCallback,
    last: Option<Rect>,
}

#[derive(Default)]
pub struct RectObserverRegistry {
    subscriptions: SlotMap<RectSubscriptionId, Subscription>,
}

impl RectObserverRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn observe(&mut self, node: NodeId, callback: RectCallback) -> RectSubscriptionId {
        self.subscriptions.insert(Subscription {
            node,
            callback,
            last: None,
        })
    }

    pub fn unobserve(&mut self, id: RectSubscriptionId) -> bool {
        self.subscriptions.remove(id).is_some()
    }

    /// Number of distinct nodes with at least one subscription
    pub fn observed_nodes(&self) -> usize {
        self.subscriptions
            .values()
            .map(|s| s.node)
            .collect::<FxHashSet<_>>()
            .len()
    }

    pub fn is_observing(&self, node: NodeId) -> bool {
        self.subscriptions.values().any(|s| s.node == node)
    }

    /// Collect callbacks whose node rect changed since they last fired
    pub fn compute(&mut self, rects: &FxHashMap<NodeId, Rect>) -> Vec<(RectCallback, Rect)> {
        let mut pending = Vec::new();
        for subscription in self.subscriptions.values_mut() {
            let current = rects.get(&subscription.node).copied().unwrap_or(Rect::ZERO);
            if subscription.last != Some(current) {
                subscription.last = Some(current);
                pending.push((subscription.callback.clone(), current));
            }
        }
        pending
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    #[test]
    fn test_reports_first_then_changes() {
        let mut registry = RectObserverRegistry::new();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = seen.clone();
        registry.observe(NodeId(3), Rc::new(move |r| sink.borrow_mut().push(r)));

        let mut rects = FxHashMap::default();
        let fire = |registry: &mut RectObserverRegistry, rects: &FxHashMap<NodeId, Rect>| {
            for (cb, rect) in registry.compute(rects) {
                cb(rect);
            }
        };

        fire(&mut registry, &rects);
        rects.insert(NodeId(3), Rect::new(0.0, 0.0, 10.0, 10.0));
        fire(&mut registry, &rects);
        fire(&mut registry, &rects);
        rects.insert(NodeId(3), Rect::new(0.0, 5.0, 10.0, 10.0));
        fire(&mut registry, &rects);

        assert_eq!(
            *seen.borrow(),
            vec![
                Rect::ZERO,
                Rect::new(0.0, 0.0, 10.0, 10.0),
                Rect::new(0.0, 5.0, 10.0, 10.0),
            ]
        );
    }

    #[test]
    fn test_last_subscription_drops_node() {
        let mut registry = RectObserverRegistry::new();
        let a = registry.observe(NodeId(1), Rc::new(|_| {}));
        let b = registry.observe(NodeId(1), Rc::new(|_| {}));
        assert_eq!(registry.observed_nodes(), 1);

        registry.unobserve(a);
        assert!(registry.is_observing(NodeId(1)));
        registry.unobserve(b);
        assert!(!registry.is_observing(NodeId(1)));
    }
}
