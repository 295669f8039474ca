//! Base widget trait

use sus_core::{CompositionError, Element, Event};

/// Base trait for widgets that render in place
pub trait Widget {
    /// Render the widget's element tree from its current state
    fn render(&self) -> Element;

    /// Handle an event targeted at one of the widget's nodes.
    ///
    /// Returns whether the widget recognised the target.
    fn handle_event(&self, _event: &mut Event) -> bool {
        false
    }
}

/// Exactly one child, or a composition error naming `component`
pub(crate) fn only_child(component: &'static str, children: Vec<Element>) -> Result<Element, CompositionError> {
    let found = children.len();
    let mut children = children.into_iter();
    match (children.next(), children.next()) {
        (Some(child), None) => Ok(child),
        _ => Err(CompositionError::ExpectedSingleChild { component, found }),
    }
}
