//! Application state machine.
//!
//! ```text
//!            CLOSED edge / override(FORMED)
//!        ┌────────────────────────────────────┐
//!        ▼                                    │
//!    ┌────────┐  OPEN edge / override(CHAOS) ┌───────┐
//!    │ FORMED │ ────────────────────────────▶│ CHAOS │
//!    └────────┘                              └───────┘
//!
//!    FOCUS: modelled, reachable only by an explicit override.
//! ```
//!
//! Only edges drive transitions; a sustained gesture produces no events, and
//! a request for the mode we are already in is ignored.

use tracing::info;

use hand_signal::Gesture;

// ════════════════════════════════════════════════════════════════════════════
// AppMode
// ════════════════════════════════════════════════════════════════════════════

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum AppMode {
    /// Particles gathered into the tree.
    #[default]
    Formed,
    /// Particles scattered into the sphere.
    Chaos,
    /// Reserved for a future close-up view.
    Focus,
}

impl AppMode {
    /// Blend target: 1.0 in CHAOS, 0.0 otherwise.
    pub fn blend_target(&self) -> f32 {
        match self {
            AppMode::Chaos => 1.0,
            AppMode::Formed | AppMode::Focus => 0.0,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AppMode::Formed => "FORMED",
            AppMode::Chaos  => "CHAOS",
            AppMode::Focus  => "FOCUS",
        }
    }
}

impl std::fmt::Display for AppMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ════════════════════════════════════════════════════════════════════════════
// MorphEvent
// ════════════════════════════════════════════════════════════════════════════

/// Everything that can ask the state machine to move, delivered over one
/// `mpsc` channel from the detection thread and the window.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MorphEvent {
    /// The classified gesture changed to this value.
    GestureEdge(Gesture),
    /// Manual override from a UI control.
    Override(AppMode),
    /// Leave the application.
    Quit,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TransitionCause {
    Gesture(Gesture),
    Override,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Transition {
    pub from:  AppMode,
    pub to:    AppMode,
    pub cause: TransitionCause,
}

// ════════════════════════════════════════════════════════════════════════════
// StateMachine
// ════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Default)]
pub struct StateMachine {
    mode: AppMode,
}

impl StateMachine {
    pub fn new() -> Self { Self::default() }

    pub fn mode(&self) -> AppMode { self.mode }

    /// Process one event.  Returns the transition taken, if any.
    pub fn handle(&mut self, event: MorphEvent) -> Option<Transition> {
        match event {
            MorphEvent::GestureEdge(Gesture::Closed) =>
                self.request(AppMode::Formed, TransitionCause::Gesture(Gesture::Closed)),
            MorphEvent::GestureEdge(Gesture::Open) =>
                self.request(AppMode::Chaos, TransitionCause::Gesture(Gesture::Open)),
            MorphEvent::GestureEdge(Gesture::None) => None,
            MorphEvent::Override(mode) => self.request(mode, TransitionCause::Override),
            MorphEvent::Quit => None, // handled in run loop
        }
    }

    /// Gesture edges and manual overrides both land here.
    pub fn request(&mut self, to: AppMode, cause: TransitionCause) -> Option<Transition> {
        if to == self.mode {
            return None;
        }
        let from = self.mode;
        self.mode = to;
        info!(%from, %to, ?cause, "mode transition");
        Some(Transition { from, to, cause })
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════
