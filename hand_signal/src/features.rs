//! Feature extraction — one [`HandFrame`] in, one [`HandSignal`] out.
//!
//! Callers only invoke [`extract`] when a hand was actually detected;
//! absence is handled upstream by the detection loop.

use serde::{Deserialize, Serialize};

use crate::landmarks::{HandFrame, FINGERTIPS, MIDDLE_MCP, WRIST};

/// Affine map from raw palm size onto a `[0, 1]` zoom factor.
///
/// Palm size depends on camera resolution and how far the user sits from
/// it, so both numbers are tuning knobs, not physical constants.  With the
/// defaults the map saturates below a palm of `0.05` and above `0.3`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DepthCalibration {
    /// Palm size that maps to zoom 0.
    pub palm_min: f32,
    /// Zoom gained per unit of palm size above `palm_min`.
    pub gain:     f32,
}

impl Default for DepthCalibration {
    fn default() -> Self {
        DepthCalibration { palm_min: 0.05, gain: 4.0 }
    }
}

/// Per-frame hand features.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct HandSignal {
    /// Wrist position, recentred on the origin and mirrored on both axes.
    pub position:    (f32, f32),
    /// Zoom factor in `[0, 1]`.
    pub depth:       f32,
    /// Mean wrist→fingertip distance divided by palm size.
    pub compactness: f32,
    /// Wrist → middle-finger MCP distance.
    pub palm_size:   f32,
}

/// `clamp((palm_size - palm_min) * gain, 0, 1)`.
pub fn zoom_factor(palm_size: f32, cal: &DepthCalibration) -> f32 {
    ((palm_size - cal.palm_min) * cal.gain).clamp(0.0, 1.0)
}

/// Mirror-mode position: `-(raw - 0.5) * 2` on each axis.
fn mirrored(raw: f32) -> f32 {
    -(raw - 0.5) * 2.0
}

pub fn extract(frame: &HandFrame, cal: &DepthCalibration) -> HandSignal {
    let wrist = frame.get(WRIST);
    let palm_size = wrist.distance(frame.get(MIDDLE_MCP));

    let reach: f32 = FINGERTIPS.iter()
        .map(|&tip| wrist.distance(frame.get(tip)))
        .sum::<f32>() / FINGERTIPS.len() as f32;

    HandSignal {
        position:    (mirrored(wrist.x), mirrored(wrist.y)),
        depth:       zoom_factor(palm_size, cal),
        compactness: reach / palm_size.max(f32::EPSILON),
        palm_size,
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════
