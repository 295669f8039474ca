//! State Machine Runtime
//!
//! Table-driven flat state machines for widget interaction states.
//!
//! A [`StateChart`] is the immutable transition table. It is `Sync` and can
//! live in a `static`. A [`StateMachine`] pairs a chart with a current state,
//! entry/exit actions and a bounded transition history.
//!
//! The table is total: any `(state, event)` pair that was not declared is a
//! no-op.

use std::collections::VecDeque;
use std::fmt::Debug;
use std::hash::Hash;

use rustc_hash::FxHashMap;
use smallvec::SmallVec;
use tracing::trace;

/// Bound for state and event identifiers
pub trait ChartKey: Copy + Eq + Hash + Debug + 'static {}

impl<T: Copy + Eq + Hash + Debug + 'static> ChartKey for T {}

/// An action executed on state entry or exit
pub type Action = Box<dyn FnMut()>;

/// Transitions a machine remembers unless configured otherwise
pub const DEFAULT_HISTORY_LIMIT: usize = 32;

/// Immutable transition table
#[derive(Clone, Debug)]
pub struct StateChart<S: ChartKey, E: ChartKey> {
    initial: S,
    transitions: FxHashMap<(S, E), S>,
}

impl<S: ChartKey, E: ChartKey> StateChart<S, E> {
    pub fn new(initial: S) -> Self {
        Self {
            initial,
            transitions: FxHashMap::default(),
        }
    }

    /// Add a transition (from, event, to)
    pub fn on(mut self, from: S, event: E, to: S) -> Self {
        self.transitions.insert((from, event), to);
        self
    }

    /// Add the same event transition from several source states
    pub fn on_any(mut self, from: &[S], event: E, to: S) -> Self {
        for state in from {
            self.transitions.insert((*state, event), to);
        }
        self
    }

    pub fn initial(&self) -> S {
        self.initial
    }

    /// Target state for `event` in `state`, if the table lists one
    pub fn next(&self, state: S, event: E) -> Option<S> {
        self.transitions.get(&(state, event)).copied()
    }

    /// Check if an event triggers a transition from `state`
    pub fn can_send(&self, state: S, event: E) -> bool {
        self.transitions.contains_key(&(state, event))
    }

    /// Events accepted in `state`
    pub fn events_from(&self, state: S) -> SmallVec<[E; 8]> {
        self.transitions
            .keys()
            .filter(|(from, _)| *from == state)
            .map(|(_, event)| *event)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.transitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transitions.is_empty()
    }
}

/// A state machine instance
pub struct StateMachine<S: ChartKey, E: ChartKey> {
    chart: StateChart<S, E>,
    current_state: S,
    entry_callbacks: FxHashMap<S, Vec<Action>>,
    exit_callbacks: FxHashMap<S, Vec<Action>>,
    /// Most recent transitions, oldest first (for debugging)
    history: VecDeque<(S, E, S)>,
    history_limit: usize,
}

impl<S: ChartKey, E: ChartKey> StateMachine<S, E> {
    /// Start a machine in the chart's initial state
    pub fn new(chart: StateChart<S, E>) -> Self {
        Self {
            current_state: chart.initial(),
            chart,
            entry_callbacks: FxHashMap::default(),
            exit_callbacks: FxHashMap::default(),
            history: VecDeque::new(),
            history_limit: DEFAULT_HISTORY_LIMIT,
        }
    }

    /// Keep at most `limit` transitions; zero disables the history
    pub fn with_history_limit(mut self, limit: usize) -> Self {
        self.history_limit = limit;
        self.history.truncate(limit);
        self
    }

    pub fn chart(&self) -> &StateChart<S, E> {
        &self.chart
    }

    /// Get the current state
    pub fn current_state(&self) -> S {
        self.current_state
    }

    /// Check if we're in a specific state
    pub fn is_in(&self, state: S) -> bool {
        self.current_state == state
    }

    /// Recent transitions, oldest first
    pub fn history(&self) -> Vec<(S, E, S)> {
        self.history.iter().copied().collect()
    }

    /// Clear transition history
    pub fn clear_history(&mut self) {
        self.history.clear();
    }

    /// Check if an event can trigger a transition from current state
    pub fn can_send(&self, event: E) -> bool {
        self.chart.can_send(self.current_state, event)
    }

    /// Send an event to the state machine.
    ///
    /// Returns the new state, or `None` when the event is not listed for the
    /// current state (nothing runs, nothing is recorded). Self-transitions
    /// run exit and entry actions like any other transition.
    pub fn send(&mut self, event: E) -> Option<S> {
        let current = self.current_state;

        let Some(to_state) = self.chart.next(current, event) else {
            trace!(state = ?current, event = ?event, "event ignored");
            return None;
        };

        if let Some(callbacks) = self.exit_callbacks.get_mut(&current) {
            for callback in callbacks.iter_mut() {
                callback();
            }
        }

        self.current_state = to_state;
        if self.history_limit > 0 {
            if self.history.len() == self.history_limit {
                self.history.pop_front();
            }
            self.history.push_back((current, event, to_state));
        }
        trace!(from = ?current, event = ?event, to = ?to_state, "transition");

        if let Some(callbacks) = self.entry_callbacks.get_mut(&to_state) {
            for callback in callbacks.iter_mut() {
                callback();
            }
        }

        Some(to_state)
    }

    /// Register an entry callback for a state
    pub fn on_enter<F: FnMut() + 'static>(&mut self, state: S, callback: F) {
        self.entry_callbacks
            .entry(state)
            .or_default()
            .push(Box::new(callback));
    }

    /// Register an exit callback for a state
    pub fn on_exit<F: FnMut() + 'static>(&mut self, state: S, callback: F) {
        self.exit_callbacks
            .entry(state)
            .or_default()
            .push(Box::new(callback));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::rc::Rc;

    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    enum Door {
        Closed,
        Open,
        Locked,
    }

    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    enum DoorEvent {
        Push,
        Pull,
        Lock,
        Unlock,
    }

    fn door_chart() -> StateChart<Door, DoorEvent> {
        StateChart::new(Door::Closed)
            .on(Door::Closed, DoorEvent::Push, Door::Open)
            .on(Door::Open, DoorEvent::Pull, Door::Closed)
            .on(Door::Closed, DoorEvent::Lock, Door::Locked)
            .on(Door::Locked, DoorEvent::Unlock, Door::Closed)
    }

    #[test]
    fn test_simple_transitions() {
        let mut fsm = StateMachine::new(door_chart());
        assert_eq!(fsm.current_state(), Door::Closed);

        assert_eq!(fsm.send(DoorEvent::Push), Some(Door::Open));
        assert_eq!(fsm.send(DoorEvent::Pull), Some(Door::Closed));
        assert_eq!(fsm.send(DoorEvent::Lock), Some(Door::Locked));
        assert!(fsm.is_in(Door::Locked));
    }

    #[test]
    fn test_unlisted_event_is_noop() {
        let mut fsm = StateMachine::new(door_chart());
        fsm.send(DoorEvent::Lock);

        assert_eq!(fsm.send(DoorEvent::Push), None);
        assert_eq!(fsm.current_state(), Door::Locked);
        assert_eq!(fsm.history().len(), 1);
    }

    #[test]
    fn test_entry_exit_callbacks() {
        let entered = Rc::new(Cell::new(0));
        let exited = Rc::new(Cell::new(0));

        let mut fsm = StateMachine::new(door_chart());
        let e = entered.clone();
        fsm.on_enter(Door::Open, move || e.set(e.get() + 1));
        let x = exited.clone();
        fsm.on_exit(Door::Open, move || x.set(x.get() + 1));

        fsm.send(DoorEvent::Push);
        assert_eq!((entered.get(), exited.get()), (1, 0));

        fsm.send(DoorEvent::Pull);
        assert_eq!((entered.get(), exited.get()), (1, 1));

        // Ignored events run nothing
        fsm.send(DoorEvent::Pull);
        assert_eq!((entered.get(), exited.get()), (1, 1));
    }

    #[test]
    fn test_self_transition_runs_callbacks() {
        let chart = StateChart::new(Door::Closed).on(Door::Closed, DoorEvent::Pull, Door::Closed);
        let count = Rc::new(Cell::new(0));
        let mut fsm = StateMachine::new(chart);
        let c = count.clone();
        fsm.on_enter(Door::Closed, move || c.set(c.get() + 1));

        fsm.send(DoorEvent::Pull);
        fsm.send(DoorEvent::Pull);
        assert_eq!(count.get(), 2);
    }

    #[test]
    fn test_history() {
        let mut fsm = StateMachine::new(door_chart());
        fsm.send(DoorEvent::Push);
        fsm.send(DoorEvent::Pull);

        assert_eq!(
            fsm.history(),
            vec![
                (Door::Closed, DoorEvent::Push, Door::Open),
                (Door::Open, DoorEvent::Pull, Door::Closed),
            ]
        );

        fsm.clear_history();
        assert!(fsm.history().is_empty());
    }

    #[test]
    fn test_history_is_bounded() {
        let mut fsm = StateMachine::new(door_chart());
        for _ in 0..10_000 {
            fsm.send(DoorEvent::Push);
            fsm.send(DoorEvent::Pull);
        }

        let history = fsm.history();
        assert_eq!(history.len(), DEFAULT_HISTORY_LIMIT);
        assert_eq!(history.last(), Some(&(Door::Open, DoorEvent::Pull, Door::Closed)));

        let mut short = StateMachine::new(door_chart()).with_history_limit(1);
        short.send(DoorEvent::Push);
        short.send(DoorEvent::Pull);
        assert_eq!(short.history(), vec![(Door::Open, DoorEvent::Pull, Door::Closed)]);

        let mut none = StateMachine::new(door_chart()).with_history_limit(0);
        none.send(DoorEvent::Push);
        assert!(none.history().is_empty());
        assert!(none.is_in(Door::Open));
    }

    #[test]
    fn test_chart_queries() {
        let chart = door_chart().on_any(&[Door::Open, Door::Locked], DoorEvent::Unlock, Door::Closed);

        assert!(chart.can_send(Door::Closed, DoorEvent::Push));
        assert!(!chart.can_send(Door::Open, DoorEvent::Push));
        assert_eq!(chart.next(Door::Open, DoorEvent::Unlock), Some(Door::Closed));

        let mut events = chart.events_from(Door::Closed).into_vec();
        events.sort_by_key(|e| *e as u8);
        assert_eq!(events, vec![DoorEvent::Push, DoorEvent::Lock]);
        assert_eq!(chart.len(), 5);
    }
}
