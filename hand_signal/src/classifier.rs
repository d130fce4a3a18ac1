//! Open / closed classification with a dead band.
//!
//! Raw compactness jitters from frame to frame.  A single threshold would
//! oscillate whenever the hand hovers near it, so the classifier only
//! commits below `closed_below` or above `open_above`; anything in between
//! returns the previous gesture unchanged.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

// ════════════════════════════════════════════════════════════════════════════
// Gesture
// ════════════════════════════════════════════════════════════════════════════

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Gesture {
    /// Nothing classified yet.
    #[default]
    None,
    Open,
    Closed,
}

impl Gesture {
    pub fn as_str(&self) -> &'static str {
        match self {
            Gesture::None   => "NONE",
            Gesture::Open   => "OPEN",
            Gesture::Closed => "CLOSED",
        }
    }
}

impl std::fmt::Display for Gesture {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Thresholds
// ════════════════════════════════════════════════════════════════════════════

/// Dead-band bounds on the compactness ratio.  Empirically tuned for a
/// typical webcam; the band must be wider than landmark jitter.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GestureThresholds {
    pub closed_below: f32,
    pub open_above:   f32,
}

impl Default for GestureThresholds {
    fn default() -> Self {
        GestureThresholds { closed_below: 1.4, open_above: 1.6 }
    }
}

#[derive(Clone, Copy, Debug, Error, PartialEq)]
pub enum ThresholdError {
    #[error("gesture thresholds must be finite (closed_below {closed_below}, open_above {open_above})")]
    NonFinite { closed_below: f32, open_above: f32 },
    #[error("closed_below ({closed_below}) must not exceed open_above ({open_above})")]
    Inverted { closed_below: f32, open_above: f32 },
}

impl GestureThresholds {
    /// The band may be empty (`closed_below == open_above`) but never inverted.
    pub fn validate(&self) -> Result<(), ThresholdError> {
        let (closed_below, open_above) = (self.closed_below, self.open_above);
        if !(closed_below.is_finite() && open_above.is_finite()) {
            return Err(ThresholdError::NonFinite { closed_below, open_above });
        }
        if closed_below > open_above {
            return Err(ThresholdError::Inverted { closed_below, open_above });
        }
        Ok(())
    }
}

/// Pure hysteresis classifier.
pub fn classify(compactness: f32, previous: Gesture, t: &GestureThresholds) -> Gesture {
    if compactness < t.closed_below {
        Gesture::Closed
    } else if compactness > t.open_above {
        Gesture::Open
    } else {
        previous
    }
}

// ════════════════════════════════════════════════════════════════════════════
// GestureTracker — remembers the last gesture and reports edges
// ════════════════════════════════════════════════════════════════════════════

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GestureUpdate {
    /// Classification for this frame (may equal the previous one).
    pub gesture: Gesture,
    /// `Some(new)` only when the classification changed this frame.
    pub edge:    Option<Gesture>,
}

/// Stateful wrapper around [`classify`].
///
/// Not reset when the hand disappears: the
/// last gesture survives absence, and a reappearing hand whose first frame
/// lands in the dead band keeps the stale value.
#[derive(Clone, Debug, Default)]
pub struct GestureTracker {
    previous:   Gesture,
    thresholds: GestureThresholds,
}

impl GestureTracker {
    pub fn new(thresholds: GestureThresholds) -> Self {
        GestureTracker { previous: Gesture::None, thresholds }
    }

    pub fn current(&self) -> Gesture { self.previous }

    pub fn thresholds(&self) -> &GestureThresholds { &self.thresholds }

    pub fn update(&mut self, compactness: f32) -> GestureUpdate {
        let gesture = classify(compactness, self.previous, &self.thresholds);
        let edge = if gesture != self.previous {
            debug!(from = %self.previous, to = %gesture, compactness, "gesture edge");
            Some(gesture)
        } else {
            None
        };
        self.previous = gesture;
        GestureUpdate { gesture, edge }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════
