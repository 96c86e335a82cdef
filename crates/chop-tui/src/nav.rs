//! Navigation stack: forward pushes, back pops, tab switches clear.

use crate::app::Screen;
use chop_types::Hash;

/// Context a pushed frame carries back to its originating screen.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum Payload {
    /// Nothing to carry.
    #[default]
    None,
    /// A cursor position to restore.
    Index(usize),
    /// A transaction selection to restore.
    Hash(Hash),
}

/// One stack frame.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Frame {
    /// Where back navigation lands.
    pub screen: Screen,
    /// Context restored alongside it.
    pub payload: Payload,
}

/// The navigation stack. Popping an empty stack yields the dashboard
/// sentinel, so back navigation never dead-ends.
#[derive(Clone, Debug, Default)]
pub struct NavStack {
    frames: Vec<Frame>,
}

impl NavStack {
    /// Creates an empty stack.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Pushes a frame on forward navigation.
    pub fn push(&mut self, screen: Screen, payload: Payload) {
        self.frames.push(Frame { screen, payload });
    }

    /// Pops on back navigation; the dashboard sentinel when empty.
    pub fn pop(&mut self) -> Frame {
        self.frames.pop().unwrap_or(Frame {
            screen: Screen::Dashboard,
            payload: Payload::None,
        })
    }

    /// The frame a pop would return, without popping.
    #[must_use]
    pub fn peek(&self) -> Option<&Frame> {
        self.frames.last()
    }

    /// Clears everything (top-level tab switch).
    pub fn clear(&mut self) {
        self.frames.clear();
    }

    /// Current depth.
    #[must_use]
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    /// True when no frames are stacked.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_pop_identity() {
        let mut nav = NavStack::new();
        nav.push(Screen::CallHistory, Payload::Index(7));

        let frame = nav.pop();
        assert_eq!(frame.screen, Screen::CallHistory);
        assert_eq!(frame.payload, Payload::Index(7));
        assert!(nav.is_empty());

        nav.push(Screen::TransactionDetail, Payload::Hash(Hash::ZERO));
        assert_eq!(nav.pop().payload, Payload::Hash(Hash::ZERO));
    }

    #[test]
    fn test_pop_empty_is_dashboard_sentinel() {
        let mut nav = NavStack::new();
        let frame = nav.pop();
        assert_eq!(frame.screen, Screen::Dashboard);
        assert_eq!(frame.payload, Payload::None);
    }

    #[test]
    fn test_lifo_order() {
        let mut nav = NavStack::new();
        nav.push(Screen::BlocksList, Payload::Index(1));
        nav.push(Screen::BlockDetail, Payload::Index(5));

        assert_eq!(nav.len(), 2);
        assert_eq!(nav.peek().map(|f| f.screen), Some(Screen::BlockDetail));
        assert_eq!(nav.pop().screen, Screen::BlockDetail);
        assert_eq!(nav.pop().screen, Screen::BlocksList);
    }

    #[test]
    fn test_clear() {
        let mut nav = NavStack::new();
        nav.push(Screen::Contracts, Payload::None);
        nav.clear();
        assert!(nav.is_empty());
        assert_eq!(nav.pop().screen, Screen::Dashboard);
    }
}
