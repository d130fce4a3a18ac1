//! Shared control surface.
//!
//! One record, written by the detection thread every tick and read by the
//! render loop, the status poller and anything else that wants the latest
//! hand state.  Writers replace the whole record under the lock, so readers
//! always get a consistent snapshot and never a half-updated one.
//!
//! When the hand disappears only `is_present` changes; position, depth and
//! gesture keep their last values.  Readers must treat those as stale.

use std::sync::{Arc, PoisonError, RwLock};

use hand_signal::{Gesture, HandSignal};

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ControlState {
    /// Hand position, `[-1, 1]`.
    pub x:          f32,
    pub y:          f32,
    /// Zoom factor, `[0, 1]`.
    pub z:          f32,
    pub gesture:    Gesture,
    pub is_present: bool,
}

impl ControlState {
    /// A present hand with this frame's features.
    pub fn present(signal: &HandSignal, gesture: Gesture) -> Self {
        ControlState {
            x: signal.position.0,
            y: signal.position.1,
            z: signal.depth,
            gesture,
            is_present: true,
        }
    }
}

#[derive(Debug, Default)]
pub struct ControlSurface {
    state: RwLock<ControlState>,
}

impl ControlSurface {
    pub fn shared() -> Arc<ControlSurface> {
        Arc::new(ControlSurface::default())
    }

    pub fn publish(&self, next: ControlState) {
        *self.state.write().unwrap_or_else(PoisonError::into_inner) = next;
    }

    /// No hand this tick: keep everything else as it was.
    pub fn mark_absent(&self) {
        self.state.write().unwrap_or_else(PoisonError::into_inner).is_present = false;
    }

    pub fn snapshot(&self) -> ControlState {
        *self.state.read().unwrap_or_else(PoisonError::into_inner)
    }
}
