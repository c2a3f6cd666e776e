//! Foreground/background state of the client.
//!
//! Pollers subscribe to a [`VisibilitySource`] and only run while it reports
//! [`Visibility::Visible`]. Subscribers are woken on real transitions only;
//! setting the current value again is a no-op.
//!
//! A watch channel only keeps the latest value, so a hide followed by a show
//! can collapse into a single `Visible` observation. Each state therefore
//! carries a count of hidden-to-visible transitions; a subscriber that sees
//! the count move knows the client came back, whatever it missed in between.

use tokio::sync::watch;

/// Whether the client is in the foreground.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visibility {
    /// Foreground: polling is active.
    Visible,
    /// Background: no network calls are made.
    Hidden,
}

/// Snapshot published to subscribers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VisibilityState {
    /// Current foreground/background state.
    pub visibility: Visibility,
    /// Number of hidden-to-visible transitions so far.
    pub shown: u64,
}

impl VisibilityState {
    /// Returns `true` if the client is in the foreground.
    #[must_use]
    pub fn is_visible(&self) -> bool {
        self.visibility == Visibility::Visible
    }
}

/// Owner of the visibility state.
#[derive(Debug)]
pub struct VisibilitySource {
    tx: watch::Sender<VisibilityState>,
}

impl Default for VisibilitySource {
    fn default() -> Self {
        Self::new(Visibility::Visible)
    }
}

impl VisibilitySource {
    /// Creates a source with the given initial state.
    #[must_use]
    pub fn new(initial: Visibility) -> Self {
        let (tx, _rx) = watch::channel(VisibilityState {
            visibility: initial,
            shown: 0,
        });
        Self { tx }
    }

    /// Updates the state. Returns `true` if this was a transition.
    pub fn set(&self, visibility: Visibility) -> bool {
        let changed = self.tx.send_if_modified(|state| {
            if state.visibility == visibility {
                return false;
            }
            state.visibility = visibility;
            if visibility == Visibility::Visible {
                state.shown += 1;
            }
            true
        });
        if changed {
            tracing::debug!(?visibility, "visibility changed");
        }
        changed
    }

    /// Returns the current state.
    #[must_use]
    pub fn current(&self) -> Visibility {
        self.tx.borrow().visibility
    }

    /// Returns a receiver that observes future transitions.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<VisibilityState> {
        self.tx.subscribe()
    }
}
