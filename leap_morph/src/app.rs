//! Top-level application.
//!
//! `MorphApp` owns the state machine, the two smoothing trackers, the
//! particle field and the status label.  It processes `MorphEvent`s and
//! produces one `RenderFrame` per displayed frame.  `run()` wires it to the
//! window, the landmark source and the detection session.

use std::sync::mpsc::{self, TryRecvError};
use std::sync::Arc;
use std::time::{Duration, Instant};

use nalgebra::Point3;
use tracing::{info, warn};

use particle_field::ParticleField;

use crate::config::MorphConfig;
use crate::control::{ControlState, ControlSurface};
use crate::error::SessionError;
use crate::session::Session;
use crate::smoothing::{BlendTracker, CameraRig, RenderFrame};
use crate::source::{LandmarkSource, SimInput};
use crate::state::{AppMode, MorphEvent, StateMachine, Transition};
use crate::visualizer::Visualizer;

// ════════════════════════════════════════════════════════════════════════════
// Status label
// ════════════════════════════════════════════════════════════════════════════

/// Human-readable status for the current mode and hand.
pub fn status_label(mode: AppMode, control: &ControlState) -> String {
    if control.is_present {
        format!(
            "{}  hand {}  x={:+.2} y={:+.2} zoom={:.2}",
            mode, control.gesture, control.x, control.y, control.z
        )
    } else {
        format!("{}  no hand  (last gesture {})", mode, control.gesture)
    }
}

/// Rebuilds the status label at a coarse rate so the text isn't redrawn on
/// every detection tick.
#[derive(Debug)]
pub struct StatusPoller {
    interval: Duration,
    last:     Option<Duration>,
    label:    String,
}

impl StatusPoller {
    pub fn new(interval: Duration) -> Self {
        StatusPoller { interval, last: None, label: String::new() }
    }

    /// Refresh the label if `interval` has passed.  Returns true on refresh.
    pub fn poll(&mut self, elapsed: Duration, mode: AppMode, control: &ControlState) -> bool {
        if let Some(last) = self.last {
            if elapsed.saturating_sub(last) < self.interval {
                return false;
            }
        }
        self.last = Some(elapsed);
        self.label = status_label(mode, control);
        true
    }

    pub fn label(&self) -> &str { &self.label }
}

// ════════════════════════════════════════════════════════════════════════════
// MorphApp
// ════════════════════════════════════════════════════════════════════════════

pub struct MorphApp {
    machine: StateMachine,
    blend:   BlendTracker,
    rig:     CameraRig,
    field:   ParticleField,
    status:  StatusPoller,
}

impl MorphApp {
    pub fn new(cfg: &MorphConfig) -> Self {
        let field = ParticleField::seeded(cfg.particles.count, cfg.particles.seed);
        info!(particles = field.len(), "particle field generated");

        MorphApp {
            machine: StateMachine::new(),
            blend:   BlendTracker::new(cfg.smoothing.blend_rate),
            rig:     CameraRig::new(cfg.smoothing.camera_rate, cfg.camera, cfg.idle),
            field,
            status:  StatusPoller::new(cfg.session.status_interval()),
        }
    }

    // ── process one MorphEvent ────────────────────────────────────────────

    pub fn handle_event(&mut self, event: MorphEvent) -> Option<Transition> {
        self.machine.handle(event)
    }

    // ── per-frame tick ────────────────────────────────────────────────────

    /// Advance both trackers by `dt` seconds.  `elapsed` drives the idle orbit.
    pub fn tick(&mut self, dt: f32, elapsed: f32, control: &ControlState) -> RenderFrame {
        let mode = self.machine.mode();
        let blend = self.blend.advance(mode.blend_target(), dt);
        let camera = self.rig.update(control, mode, dt, elapsed);
        RenderFrame { blend, camera, look_at: Point3::origin() }
    }

    pub fn poll_status(&mut self, elapsed: Duration, control: &ControlState) -> bool {
        let mode = self.machine.mode();
        self.status.poll(elapsed, mode, control)
    }

    // ── accessors for the render loop ─────────────────────────────────────

    pub fn mode(&self)        -> AppMode        { self.machine.mode() }
    pub fn blend(&self)       -> f32            { self.blend.value() }
    pub fn field(&self)       -> &ParticleField { &self.field }
    pub fn status_line(&self) -> &str           { self.status.label() }
}

// ════════════════════════════════════════════════════════════════════════════
// run() — the main application loop
// ════════════════════════════════════════════════════════════════════════════

#[cfg(feature = "leap")]
fn landmark_source(_sim_rx: mpsc::Receiver<SimInput>) -> Box<dyn LandmarkSource> {
    Box::new(crate::source::LeapHandSource::new())
}

#[cfg(not(feature = "leap"))]
fn landmark_source(sim_rx: mpsc::Receiver<SimInput>) -> Box<dyn LandmarkSource> {
    Box::new(crate::source::SimHandSource::new(sim_rx))
}

/// Run the full application.
///
/// Creates the visualizer, the landmark source (simulation by default,
/// hardware with `--features leap`) and the detection session, then drives
/// the event/render loop at ~60 fps until the window closes or `Q` is hit.
pub fn run(cfg: MorphConfig) -> Result<(), SessionError> {
    let (sim_tx, sim_rx)     = mpsc::channel::<SimInput>();
    let (event_tx, event_rx) = mpsc::channel::<MorphEvent>();

    let mut vis = Visualizer::new(sim_tx, event_tx.clone())?;

    let surface = ControlSurface::shared();
    let session = Session::start(landmark_source(sim_rx), Arc::clone(&surface), event_tx, &cfg)?;

    let mut app = MorphApp::new(&cfg);
    let epoch = Instant::now();
    let mut last = epoch;

    'frames: while vis.is_open() {
        // 1. window input → SimInput / MorphEvent
        if !vis.poll_input() { break; }

        // 2. drain events (gesture edges + overrides)
        loop {
            match event_rx.try_recv() {
                Ok(MorphEvent::Quit) => break 'frames,
                Ok(evt) => { app.handle_event(evt); }
                Err(TryRecvError::Empty)        => break,
                Err(TryRecvError::Disconnected) => break 'frames,
            }
        }

        // 3. smoothing
        let now = Instant::now();
        let dt = now.duration_since(last).as_secs_f32();
        last = now;
        let control = surface.snapshot();
        let frame = app.tick(dt, epoch.elapsed().as_secs_f32(), &control);

        // 4. status label (coarse)
        app.poll_status(epoch.elapsed(), &control);

        // 5. render
        vis.render(&frame, app.field(), app.mode(), app.status_line());
    }

    let report = session.teardown();
    if !report.is_clean() {
        warn!(failures = report.errors.len(), "teardown finished with errors");
    }
    Ok(())
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════
