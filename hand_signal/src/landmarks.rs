//! Hand landmark model.
//!
//! A detector reports 21 points per hand.  `x`/`y` are normalised image
//! coordinates in `[0, 1]` (origin top-left, un-mirrored); `z` is depth
//! relative to the wrist, on roughly the same scale as `x`.

use thiserror::Error;

// ════════════════════════════════════════════════════════════════════════════
// Landmark indices (MediaPipe hand topology)
// ════════════════════════════════════════════════════════════════════════════

pub const LANDMARK_COUNT: usize = 21;

pub const WRIST:      usize = 0;
pub const THUMB_CMC:  usize = 1;
pub const THUMB_MCP:  usize = 2;
pub const THUMB_IP:   usize = 3;
pub const THUMB_TIP:  usize = 4;
pub const INDEX_MCP:  usize = 5;
pub const INDEX_PIP:  usize = 6;
pub const INDEX_DIP:  usize = 7;
pub const INDEX_TIP:  usize = 8;
pub const MIDDLE_MCP: usize = 9;
pub const MIDDLE_PIP: usize = 10;
pub const MIDDLE_DIP: usize = 11;
pub const MIDDLE_TIP: usize = 12;
pub const RING_MCP:   usize = 13;
pub const RING_PIP:   usize = 14;
pub const RING_DIP:   usize = 15;
pub const RING_TIP:   usize = 16;
pub const PINKY_MCP:  usize = 17;
pub const PINKY_PIP:  usize = 18;
pub const PINKY_DIP:  usize = 19;
pub const PINKY_TIP:  usize = 20;

/// The four non-thumb fingertips used for the compactness ratio.
pub const FINGERTIPS: [usize; 4] = [INDEX_TIP, MIDDLE_TIP, RING_TIP, PINKY_TIP];

// ════════════════════════════════════════════════════════════════════════════
// Landmark / HandFrame
// ════════════════════════════════════════════════════════════════════════════

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Landmark {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Landmark {
    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Landmark { x, y, z }
    }

    /// 3D Euclidean distance.
    pub fn distance(&self, other: &Landmark) -> f32 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        let dz = self.z - other.z;
        (dx * dx + dy * dy + dz * dz).sqrt()
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum LandmarkError {
    #[error("expected 21 landmarks, detector returned {0}")]
    WrongCount(usize),
    #[error("landmark {0} is not a finite coordinate")]
    NonFinite(usize),
}

/// One detected hand.  Ephemeral: produced per detection tick and consumed
/// immediately by [`crate::extract`].
#[derive(Clone, Debug, PartialEq)]
pub struct HandFrame {
    pub landmarks: [Landmark; LANDMARK_COUNT],
}

impl HandFrame {
    pub fn new(landmarks: [Landmark; LANDMARK_COUNT]) -> Self {
        HandFrame { landmarks }
    }

    /// Build a frame from a detector's point list.
    pub fn from_slice(points: &[Landmark]) -> Result<Self, LandmarkError> {
        if points.len() != LANDMARK_COUNT {
            return Err(LandmarkError::WrongCount(points.len()));
        }
        if let Some(i) = points.iter().position(|p| {
            !(p.x.is_finite() && p.y.is_finite() && p.z.is_finite())
        }) {
            return Err(LandmarkError::NonFinite(i));
        }
        let mut landmarks = [Landmark::default(); LANDMARK_COUNT];
        landmarks.copy_from_slice(points);
        Ok(HandFrame { landmarks })
    }

    pub fn wrist(&self) -> &Landmark { &self.landmarks[WRIST] }

    pub fn get(&self, index: usize) -> &Landmark { &self.landmarks[index] }
}

// ════════════════════════════════════════════════════════════════════════════
// Synthetic hands (simulation + tests)
// ════════════════════════════════════════════════════════════════════════════

/// Finger layout relative to the wrist, in palm-size units (image space,
/// fingers pointing toward the top of the frame).  `(mcp_dx, mcp_dy)`.
const FINGER_MCPS: [(f32, f32); 4] = [
    (-0.30, -0.95),   // index
    ( 0.00, -1.00),   // middle: exactly one palm-size from the wrist
    ( 0.25, -0.93),   // ring
    ( 0.45, -0.80),   // pinky
];

/// Build a plausible hand whose wrist sits at `center` (normalised image
/// coordinates), whose palm (wrist → middle MCP) measures `palm_size`, and
/// whose fingers are extended by `openness` (0.0 = fist, 1.0 = flat palm).
///
/// Every fingertip is placed `(1 + openness) * palm_size` from the wrist, so
/// the compactness ratio of the result is exactly `1 + openness`.
pub fn synthetic_hand(center: (f32, f32), palm_size: f32, openness: f32) -> HandFrame {
    let (cx, cy) = center;
    let reach = 1.0 + openness.clamp(0.0, 1.0);
    let mut lm = [Landmark::new(cx, cy, 0.0); LANDMARK_COUNT];

    // Thumb fans out sideways.
    let thumb = [(-0.35, -0.20), (-0.55, -0.35), (-0.65, -0.50), (-0.40 - 0.35 * openness, -0.55 - 0.15 * openness)];
    for (k, (dx, dy)) in thumb.iter().enumerate() {
        lm[THUMB_CMC + k] = Landmark::new(cx + dx * palm_size, cy + dy * palm_size, 0.0);
    }

    for (f, &(mx, my)) in FINGER_MCPS.iter().enumerate() {
        let base = INDEX_MCP + f * 4;
        let len  = (mx * mx + my * my).sqrt();
        let (ux, uy) = (mx / len, my / len);

        let mcp = Landmark::new(cx + mx * palm_size, cy + my * palm_size, 0.0);
        let tip = Landmark::new(
            cx + ux * reach * palm_size,
            cy + uy * reach * palm_size,
            0.0,
        );
        lm[base]     = mcp;
        lm[base + 1] = lerp(&mcp, &tip, 0.45);
        lm[base + 2] = lerp(&mcp, &tip, 0.75);
        lm[base + 3] = tip;
    }

    HandFrame { landmarks: lm }
}

fn lerp(a: &Landmark, b: &Landmark, t: f32) -> Landmark {
    Landmark::new(
        a.x + (b.x - a.x) * t,
        a.y + (b.y - a.y) * t,
        a.z + (b.z - a.z) * t,
    )
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_slice_rejects_partial_hand() {
        let pts = vec![Landmark::default(); 20];
        assert_eq!(HandFrame::from_slice(&pts), Err(LandmarkError::WrongCount(20)));
    }

    #[test]
    fn from_slice_rejects_nan() {
        let mut pts = vec![Landmark::default(); LANDMARK_COUNT];
        pts[7].y = f32::NAN;
        assert_eq!(HandFrame::from_slice(&pts), Err(LandmarkError::NonFinite(7)));
    }

    #[test]
    fn from_slice_keeps_order() {
        let pts: Vec<_> = (0..LANDMARK_COUNT)
            .map(|i| Landmark::new(i as f32 / 100.0, 0.0, 0.0))
            .collect();
        let frame = HandFrame::from_slice(&pts).unwrap();
        assert_eq!(frame.get(PINKY_TIP).x, 0.20);
    }

    #[test]
    fn synthetic_palm_size_is_exact() {
        let frame = synthetic_hand((0.4, 0.6), 0.12, 0.5);
        let palm = frame.wrist().distance(frame.get(MIDDLE_MCP));
        assert!((palm - 0.12).abs() < 1e-6);
        assert_eq!(*frame.wrist(), Landmark::new(0.4, 0.6, 0.0));
    }

    #[test]
    fn synthetic_fingertips_above_wrist() {
        let frame = synthetic_hand((0.5, 0.5), 0.1, 1.0);
        for &tip in &FINGERTIPS {
            assert!(frame.get(tip).y < frame.wrist().y, "tip {} should point up", tip);
        }
    }
}
