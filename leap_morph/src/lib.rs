//! # leap_morph
//!
//! Hand-gesture controller for a particle field that morphs between a
//! spiral tree and a scattered sphere.
//!
//! A background detection loop samples a [`source::LandmarkSource`], turns
//! each hand into position / depth / compactness, and publishes the result
//! on a shared [`control::ControlSurface`].  Gesture edges drive a small
//! state machine; the render loop damps the blend and the camera toward
//! their targets every frame.
//!
//! ## Gesture → mode mapping
//!
//! | Gesture | Compactness | Mode |
//! |---|---|---|
//! | Closed fist | < 1.4 | FORMED (tree) |
//! | Open hand | > 1.6 | CHAOS (sphere) |
//! | In between | 1.4 – 1.6 | unchanged |
//!
//! Hand position steers the camera; hand size (distance to the sensor)
//! zooms it.  With no hand in view the camera drifts on a slow orbit.
//!
//! ## Feature flags
//!
//! * (default) — **Simulation mode**: the mouse moves a synthetic hand.
//! * `leap` — **Hardware mode**: polls a real LeapMotion controller via LeapC.
//!
//! ### Keyboard
//!
//! | Key | Action |
//! |---|---|
//! | mouse | Move the simulated hand |
//! | `F` (hold) | Close the simulated hand |
//! | `Up` / `Down` | Move the simulated hand toward / away from the camera |
//! | `H` | Hide / show the simulated hand |
//! | `1` | Override → FORMED |
//! | `2` | Override → CHAOS |
//! | `Q` / `Escape` | Quit |

pub mod config;
pub mod control;
pub mod error;
pub mod smoothing;
pub mod source;
pub mod session;
pub mod state;
pub mod visualizer;
pub mod app;
