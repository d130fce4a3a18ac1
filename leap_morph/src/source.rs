//! Landmark sources — real LeapMotion hardware or a keyboard/mouse simulation.
//!
//! The detection loop only sees the [`LandmarkSource`] trait; it doesn't
//! care whether a frame came from hardware or from the simulated hand.
//! A source owns two releasable resources, the camera/device and the
//! detector, which are released separately at teardown.

use std::sync::mpsc::{Receiver, TryRecvError};
use std::time::Duration;

use tracing::info;

use hand_signal::{synthetic_hand, HandFrame};

use crate::error::{DetectionError, SessionError, TeardownError};

// ════════════════════════════════════════════════════════════════════════════
// LandmarkSource trait
// ════════════════════════════════════════════════════════════════════════════

/// Anything that can deliver zero or one hand per detection tick.
pub trait LandmarkSource: Send + 'static {
    /// Acquire the camera and load the detector.  Failures are terminal.
    fn start(&mut self) -> Result<(), SessionError>;

    /// Run one detection.  `Ok(None)` means no hand in view; `Err` is a
    /// transient failure and the caller moves on to the next tick.
    fn detect(&mut self, timestamp: Duration) -> Result<Option<HandFrame>, DetectionError>;

    fn release_camera(&mut self) -> Result<(), TeardownError>;

    fn release_detector(&mut self) -> Result<(), TeardownError>;
}

// ════════════════════════════════════════════════════════════════════════════
// SimHandSource — keyboard/mouse simulation (always available)
// ════════════════════════════════════════════════════════════════════════════

/// Raw input from the simulation window.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum SimInput {
    /// Pointer position in window coordinates normalised to `[0, 1]`
    /// (origin top-left), as the user sees it.
    Pointer { x: f32, y: f32 },
    /// `true` while the fist key is held.
    Fist(bool),
    /// Change the simulated palm size (moves the hand toward the camera).
    Zoom(f32),
    /// Hand leaves or re-enters the frame.
    ToggleHand,
}

const SIM_PALM_MIN: f32 = 0.04;
const SIM_PALM_MAX: f32 = 0.32;
/// How far the fingers curl or open per detection tick.
const SIM_OPENNESS_STEP: f32 = 0.2;

/// Synthetic hand driven by [`SimInput`] events from the visualizer.
///
/// Openness eases toward its target over a few ticks instead of jumping,
/// so the compactness ratio sweeps through the dead band like a real hand.
pub struct SimHandSource {
    rx:       Receiver<SimInput>,
    pointer:  (f32, f32),
    palm:     f32,
    openness: f32,
    fist:     bool,
    present:  bool,
    camera_open: bool,
}

impl SimHandSource {
    pub fn new(rx: Receiver<SimInput>) -> Self {
        SimHandSource {
            rx,
            pointer:  (0.5, 0.5),
            palm:     0.15,
            openness: 1.0,
            fist:     false,
            present:  true,
            camera_open: false,
        }
    }

    fn apply(&mut self, input: SimInput) {
        match input {
            SimInput::Pointer { x, y } => self.pointer = (x.clamp(0.0, 1.0), y.clamp(0.0, 1.0)),
            SimInput::Fist(down)       => self.fist = down,
            SimInput::Zoom(delta)      => self.palm = (self.palm + delta).clamp(SIM_PALM_MIN, SIM_PALM_MAX),
            SimInput::ToggleHand       => self.present = !self.present,
        }
    }
}

impl LandmarkSource for SimHandSource {
    fn start(&mut self) -> Result<(), SessionError> {
        self.camera_open = true;
        info!("simulated hand source ready (mouse = move, F = fist, Up/Down = zoom, H = hide)");
        Ok(())
    }

    fn detect(&mut self, _timestamp: Duration) -> Result<Option<HandFrame>, DetectionError> {
        loop {
            match self.rx.try_recv() {
                Ok(input) => self.apply(input),
                // A closed window just freezes the simulated hand.
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => break,
            }
        }

        let target = if self.fist { 0.0 } else { 1.0 };
        let step = (target - self.openness).clamp(-SIM_OPENNESS_STEP, SIM_OPENNESS_STEP);
        self.openness += step;

        if !self.present {
            return Ok(None);
        }
        // Camera image is un-mirrored; the extractor mirrors it back.
        let raw = (1.0 - self.pointer.0, self.pointer.1);
        Ok(Some(synthetic_hand(raw, self.palm, self.openness)))
    }

    fn release_camera(&mut self) -> Result<(), TeardownError> {
        self.camera_open = false;
        Ok(())
    }

    fn release_detector(&mut self) -> Result<(), TeardownError> {
        Ok(())
    }
}

// ════════════════════════════════════════════════════════════════════════════
// LeapHandSource — real hardware (feature = "leap")
// ════════════════════════════════════════════════════════════════════════════

/// Hand source backed by a LeapMotion controller.
///
/// Requires the `leap` feature flag and the LeapC shared library installed.
///
/// LeapC reports bones in millimetres above the device.  They are mapped
/// into the same normalised space a webcam detector would produce:
///
/// * `x ∈ [-200, 200] mm` → `[1, 0]` (un-mirrored, like a camera image);
/// * `y ∈ [100, 500] mm`  → `[1, 0]` (image y grows downward);
/// * each joint is scaled about the palm by `LEAP_REFERENCE_HEIGHT / palm.y`
///   so a hand further from the sensor looks smaller, as it would on camera.
#[cfg(feature = "leap")]
pub struct LeapHandSource {
    connection: Option<leaprs::Connection>,
}

#[cfg(feature = "leap")]
const LEAP_SPAN_MM:          f32 = 400.0;
#[cfg(feature = "leap")]
const LEAP_FLOOR_MM:         f32 = 100.0;
#[cfg(feature = "leap")]
const LEAP_REFERENCE_HEIGHT: f32 = 250.0;
#[cfg(feature = "leap")]
const LEAP_POLL_MS:          u32 = 10;
#[cfg(feature = "leap")]
const LEAP_POLLS_PER_TICK:   usize = 4;

#[cfg(feature = "leap")]
impl LeapHandSource {
    pub fn new() -> Self {
        LeapHandSource { connection: None }
    }
}

#[cfg(feature = "leap")]
impl Default for LeapHandSource {
    fn default() -> Self { Self::new() }
}

#[cfg(feature = "leap")]
impl LandmarkSource for LeapHandSource {
    fn start(&mut self) -> Result<(), SessionError> {
        use leaprs::*;

        let mut connection = Connection::create(ConnectionConfig::default())
            .map_err(|e| SessionError::ModelLoad(format!("LeapC connection: {:?}", e)))?;
        connection.open()
            .map_err(|e| SessionError::CameraUnavailable(format!("LeapMotion device: {:?}", e)))?;
        info!("LeapMotion connection open");
        self.connection = Some(connection);
        Ok(())
    }

    fn detect(&mut self, _timestamp: Duration) -> Result<Option<HandFrame>, DetectionError> {
        use leaprs::*;

        let connection = self.connection.as_mut()
            .ok_or_else(|| DetectionError::Inference("connection closed".to_string()))?;

        for _ in 0..LEAP_POLLS_PER_TICK {
            let msg = match connection.poll(LEAP_POLL_MS) {
                Ok(m)  => m,
                Err(_) => continue,
            };
            if let Event::Tracking(frame) = msg.event() {
                let hands: Vec<_> = frame.hands().collect();
                // Prefer the right hand, like a single-hand webcam detector.
                let hand = hands.iter()
                    .find(|h| h.hand_type() == HandType::Right)
                    .or_else(|| hands.first());
                return match hand {
                    Some(h) => Ok(Some(leap_hand_to_frame(h)?)),
                    None    => Ok(None),
                };
            }
        }
        Err(DetectionError::NoFrame)
    }

    fn release_camera(&mut self) -> Result<(), TeardownError> {
        // Dropping the connection closes the device.
        self.connection.take();
        Ok(())
    }

    fn release_detector(&mut self) -> Result<(), TeardownError> {
        // LeapC runs tracking inside the service; nothing held locally.
        Ok(())
    }
}

/// Convert LeapC bones into the 21-point MediaPipe layout.
#[cfg(feature = "leap")]
fn leap_hand_to_frame(hand: &leaprs::Hand) -> Result<HandFrame, hand_signal::LandmarkError> {
    use hand_signal::Landmark;

    let palm = hand.palm().position();
    let scale = LEAP_REFERENCE_HEIGHT / palm.y.max(50.0);
    let norm = |x: f32, y: f32, z: f32| {
        let (x, y, z) = (
            palm.x + (x - palm.x) * scale,
            palm.y + (y - palm.y) * scale,
            palm.z + (z - palm.z) * scale,
        );
        Landmark::new(
            0.5 - x / LEAP_SPAN_MM,
            1.0 - (y - LEAP_FLOOR_MM) / LEAP_SPAN_MM,
            z / LEAP_SPAN_MM,
        )
    };

    let digits: Vec<_> = hand.digits().collect();
    let mut points = Vec::with_capacity(hand_signal::LANDMARK_COUNT);

    // Wrist: mean of the four finger metacarpal bases.
    let bases: Vec<_> = digits.iter().skip(1).map(|d| d.metacarpal().prev_joint()).collect();
    let n = bases.len().max(1) as f32;
    let (wx, wy, wz) = bases.iter().fold((0.0, 0.0, 0.0), |acc, j| (acc.0 + j.x, acc.1 + j.y, acc.2 + j.z));
    points.push(norm(wx / n, wy / n, wz / n));

    for d in &digits {
        for j in [
            d.metacarpal().next_joint(),
            d.proximal().next_joint(),
            d.intermediate().next_joint(),
            d.distal().next_joint(),
        ] {
            points.push(norm(j.x, j.y, j.z));
        }
    }

    HandFrame::from_slice(&points)
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use hand_signal::{extract, DepthCalibration};
    use std::sync::mpsc;

    fn sim() -> (mpsc::Sender<SimInput>, SimHandSource) {
        let (tx, rx) = mpsc::channel();
        let mut s = SimHandSource::new(rx);
        s.start().unwrap();
        (tx, s)
    }

    #[test]
    fn pointer_maps_to_mirrored_position() {
        let (tx, mut s) = sim();
        tx.send(SimInput::Pointer { x: 1.0, y: 0.0 }).unwrap();
        let frame = s.detect(Duration::ZERO).unwrap().unwrap();
        let sig = extract(&frame, &DepthCalibration::default());
        // right edge of the window → +x, top → +y
        assert!((sig.position.0 - 1.0).abs() < 1e-5);
        assert!((sig.position.1 - 1.0).abs() < 1e-5);
    }

    #[test]
    fn fist_closes_over_several_ticks() {
        let (tx, mut s) = sim();
        tx.send(SimInput::Fist(true)).unwrap();
        let cal = DepthCalibration::default();
        let mut ratios = Vec::new();
        for _ in 0..6 {
            let f = s.detect(Duration::ZERO).unwrap().unwrap();
            ratios.push(extract(&f, &cal).compactness);
        }
        assert!(ratios.windows(2).all(|w| w[1] <= w[0] + 1e-5));
        assert!(ratios[0] > 1.6);
        assert!(*ratios.last().unwrap() < 1.4);
    }

    #[test]
    fn toggle_hides_hand() {
        let (tx, mut s) = sim();
        tx.send(SimInput::ToggleHand).unwrap();
        assert_eq!(s.detect(Duration::ZERO).unwrap(), None);
        tx.send(SimInput::ToggleHand).unwrap();
        assert!(s.detect(Duration::ZERO).unwrap().is_some());
    }

    #[test]
    fn zoom_is_clamped() {
        let (tx, mut s) = sim();
        for _ in 0..100 { tx.send(SimInput::Zoom(0.05)).unwrap(); }
        let f = s.detect(Duration::ZERO).unwrap().unwrap();
        assert_eq!(extract(&f, &DepthCalibration::default()).depth, 1.0);
    }

    #[test]
    fn closed_window_freezes_hand() {
        let (tx, mut s) = sim();
        drop(tx);
        assert!(s.detect(Duration::ZERO).is_ok());
        assert!(s.release_camera().is_ok());
        assert!(!s.camera_open);
    }
}
