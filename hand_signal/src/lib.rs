//! # hand_signal
//!
//! Turns one frame of hand landmarks (21 normalised points, MediaPipe
//! ordering) into the control signals the morph controller needs:
//!
//! | Signal | Source | Range |
//! |---|---|---|
//! | position `(x, y)` | wrist, recentred and mirrored | `[-1, 1]` |
//! | depth | palm size (wrist → middle MCP), calibrated | `[0, 1]` |
//! | compactness | mean fingertip distance ÷ palm size | `~1.0` fist, `~2.0` open |
//!
//! Compactness feeds a dead-band classifier ([`classify`]) so that jitter
//! around the open/closed boundary never flips the output.  A
//! [`GestureTracker`] remembers the last gesture and reports edges.
//!
//! ```rust
//! use hand_signal::{synthetic_hand, extract, DepthCalibration, GestureTracker, Gesture};
//!
//! let frame  = synthetic_hand((0.5, 0.5), 0.15, 1.0);
//! let signal = extract(&frame, &DepthCalibration::default());
//!
//! let mut tracker = GestureTracker::default();
//! let update = tracker.update(signal.compactness);
//! assert_eq!(update.gesture, Gesture::Open);
//! assert_eq!(update.edge, Some(Gesture::Open));
//! ```

pub mod landmarks;
pub mod features;
pub mod classifier;

pub use landmarks::{HandFrame, Landmark, LandmarkError, synthetic_hand, LANDMARK_COUNT};
pub use features::{DepthCalibration, HandSignal, extract, zoom_factor};
pub use classifier::{Gesture, GestureThresholds, GestureTracker, GestureUpdate, ThresholdError, classify};
