//! End-to-end runs of the detection session against a scripted landmark
//! source: frames in, control surface and mode transitions out.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc::{self, Receiver};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use hand_signal::{synthetic_hand, Gesture, HandFrame};
use leap_morph::app::MorphApp;
use leap_morph::config::MorphConfig;
use leap_morph::control::{ControlState, ControlSurface};
use leap_morph::error::{DetectionError, SessionError, TeardownError};
use leap_morph::session::{Session, TeardownReport};
use leap_morph::source::LandmarkSource;
use leap_morph::state::{AppMode, MorphEvent, StateMachine};

// ────────────────────────────────────────────────────────────────────────────
// Scripted source
// ────────────────────────────────────────────────────────────────────────────

#[derive(Clone, Copy, Debug)]
enum Step {
    /// A hand whose compactness ratio is exactly this value.
    Hand(f32),
    Absent,
    Fail,
    /// The detector panics mid-inference.
    Panic,
    /// Block until the test opens the gate, then report no frame.
    Gate,
}

type CallLog = Arc<Mutex<Vec<&'static str>>>;

struct ScriptedSource {
    script:              VecDeque<Step>,
    log:                 CallLog,
    polls:               Arc<AtomicUsize>,
    gate:                Option<Receiver<()>>,
    fail_start:          bool,
    fail_camera_release: bool,
}

impl ScriptedSource {
    fn new(script: &[Step]) -> Self {
        ScriptedSource {
            script: script.iter().copied().collect(),
            log:    Arc::default(),
            polls:  Arc::default(),
            gate:   None,
            fail_start: false,
            fail_camera_release: false,
        }
    }

    fn record(&self, call: &'static str) {
        self.log.lock().unwrap().push(call);
    }
}

fn hand_with_compactness(c: f32) -> HandFrame {
    synthetic_hand((0.5, 0.5), 0.15, c - 1.0)
}

impl LandmarkSource for ScriptedSource {
    fn start(&mut self) -> Result<(), SessionError> {
        self.record("start");
        if self.fail_start {
            return Err(SessionError::CameraPermissionDenied("user said no".to_string()));
        }
        Ok(())
    }

    fn detect(&mut self, _timestamp: Duration) -> Result<Option<HandFrame>, DetectionError> {
        self.polls.fetch_add(1, Ordering::SeqCst);
        match self.script.pop_front() {
            Some(Step::Hand(c)) => Ok(Some(hand_with_compactness(c))),
            Some(Step::Absent)  => Ok(None),
            Some(Step::Fail)    => Err(DetectionError::Inference("scripted failure".to_string())),
            Some(Step::Panic)   => panic!("inference backend crashed"),
            Some(Step::Gate)    => {
                if let Some(gate) = &self.gate {
                    let _ = gate.recv_timeout(Duration::from_secs(5));
                }
                Err(DetectionError::NoFrame)
            }
            // Script exhausted: leave the surface alone.
            None                => Err(DetectionError::NoFrame),
        }
    }

    fn release_camera(&mut self) -> Result<(), TeardownError> {
        self.record("release_camera");
        if self.fail_camera_release {
            return Err(TeardownError::Camera("device busy".to_string()));
        }
        Ok(())
    }

    fn release_detector(&mut self) -> Result<(), TeardownError> {
        self.record("release_detector");
        Ok(())
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Harness
// ────────────────────────────────────────────────────────────────────────────

struct Outcome {
    edges:   Vec<Gesture>,
    control: ControlState,
    report:  TeardownReport,
    log:     Vec<&'static str>,
}

fn fast_config() -> MorphConfig {
    let mut cfg = MorphConfig::default();
    cfg.session.detection_hz = 500.0;
    cfg
}

fn drain_edges(rx: &Receiver<MorphEvent>) -> Vec<Gesture> {
    rx.try_iter()
        .filter_map(|e| match e {
            MorphEvent::GestureEdge(g) => Some(g),
            _ => None,
        })
        .collect()
}

fn wait_for_polls(polls: &AtomicUsize, at_least: usize) {
    let deadline = Instant::now() + Duration::from_secs(5);
    while polls.load(Ordering::SeqCst) < at_least {
        assert!(Instant::now() < deadline, "detection loop stalled");
        thread::sleep(Duration::from_millis(1));
    }
}

/// Run the whole script through a live session, then tear it down.
fn run_script(source: ScriptedSource) -> Outcome {
    let steps = source.script.len();
    let polls = Arc::clone(&source.polls);
    let log   = Arc::clone(&source.log);

    let surface = ControlSurface::shared();
    let (tx, rx) = mpsc::channel();
    let session = Session::start(Box::new(source), Arc::clone(&surface), tx, &fast_config())
        .expect("session starts");

    // One poll past the script means the last scripted frame is processed.
    wait_for_polls(&polls, steps + 1);

    let report = session.teardown();
    let log = log.lock().unwrap().clone();
    Outcome { edges: drain_edges(&rx), control: surface.snapshot(), report, log }
}

fn replay(machine: &mut StateMachine, edges: &[Gesture]) -> Vec<AppMode> {
    edges.iter()
        .map(|&g| {
            machine.handle(MorphEvent::GestureEdge(g));
            machine.mode()
        })
        .collect()
}

// ────────────────────────────────────────────────────────────────────────────
// Scenarios
// ────────────────────────────────────────────────────────────────────────────

#[test]
fn dead_band_holds_previous_gesture() {
    let out = run_script(ScriptedSource::new(&[
        Step::Hand(1.0),
        Step::Hand(1.5),
        Step::Hand(1.5),
        Step::Hand(1.8),
    ]));

    assert_eq!(out.edges, vec![Gesture::Closed, Gesture::Open]);
    let mut machine = StateMachine::new();
    assert_eq!(replay(&mut machine, &out.edges), vec![AppMode::Formed, AppMode::Chaos]);

    assert!(out.control.is_present);
    assert_eq!(out.control.gesture, Gesture::Open);
}

#[test]
fn hand_leaving_keeps_mode_and_stale_gesture() {
    let mut script = vec![Step::Hand(1.0)];
    script.extend(std::iter::repeat(Step::Absent).take(10));
    let out = run_script(ScriptedSource::new(&script));

    assert_eq!(out.edges, vec![Gesture::Closed]);
    let mut machine = StateMachine::new();
    replay(&mut machine, &out.edges);
    assert_eq!(machine.mode(), AppMode::Formed);

    assert!(!out.control.is_present);
    assert_eq!(out.control.gesture, Gesture::Closed);
}

#[test]
fn gesture_edge_overrides_manual_override() {
    let (gate_tx, gate_rx) = mpsc::channel();
    let mut source = ScriptedSource::new(&[
        Step::Hand(1.0),
        Step::Hand(1.0),
        Step::Gate,
        Step::Hand(1.0),
        Step::Hand(1.0),
        Step::Hand(1.8),
        Step::Hand(1.0),
    ]);
    source.gate = Some(gate_rx);
    let steps = source.script.len();
    let polls = Arc::clone(&source.polls);

    let (tx, rx) = mpsc::channel();
    let window_tx = tx.clone();
    let session = Session::start(Box::new(source), ControlSurface::shared(), tx, &fast_config())
        .expect("session starts");

    // Entering the gate means both CLOSED frames are published.
    wait_for_polls(&polls, 3);
    window_tx.send(MorphEvent::Override(AppMode::Chaos)).unwrap();
    gate_tx.send(()).unwrap();
    wait_for_polls(&polls, steps + 1);
    assert!(session.teardown().is_clean());
    drop(window_tx);

    let mut cfg = fast_config();
    cfg.particles.count = 16;
    let mut app = MorphApp::new(&cfg);
    let mut seen = Vec::new();
    for event in rx.try_iter() {
        app.handle_event(event);
        seen.push((event, app.mode()));
    }

    assert_eq!(seen, vec![
        (MorphEvent::GestureEdge(Gesture::Closed), AppMode::Formed),
        (MorphEvent::Override(AppMode::Chaos),     AppMode::Chaos),
        (MorphEvent::GestureEdge(Gesture::Open),   AppMode::Chaos),
        (MorphEvent::GestureEdge(Gesture::Closed), AppMode::Formed),
    ]);
}

#[test]
fn panicking_detector_does_not_stop_the_loop_or_teardown() {
    let out = run_script(ScriptedSource::new(&[
        Step::Hand(1.0),
        Step::Panic,
        Step::Hand(1.8),
    ]));

    assert_eq!(out.edges, vec![Gesture::Closed, Gesture::Open]);
    assert!(out.control.is_present);
    assert!(out.report.is_clean(), "{:?}", out.report);
    assert_eq!(out.log, vec!["start", "release_camera", "release_detector"]);
}

#[test]
fn transient_failures_change_nothing() {
    let out = run_script(ScriptedSource::new(&[
        Step::Hand(1.0),
        Step::Fail,
        Step::Fail,
        Step::Hand(1.0),
    ]));

    assert_eq!(out.edges, vec![Gesture::Closed]);
    assert!(out.control.is_present);
    assert_eq!(out.control.gesture, Gesture::Closed);
    assert!(out.report.is_clean());
}

#[test]
fn setup_failure_is_terminal_and_releases_resources() {
    let mut source = ScriptedSource::new(&[Step::Hand(1.8)]);
    source.fail_start = true;
    let polls = Arc::clone(&source.polls);
    let log   = Arc::clone(&source.log);

    let (tx, rx) = mpsc::channel();
    let result = Session::start(Box::new(source), ControlSurface::shared(), tx, &fast_config());

    let err = result.err().expect("start must fail");
    assert_eq!(err.reason(), "camera-permission-denied");
    assert_eq!(polls.load(Ordering::SeqCst), 0);
    assert!(rx.try_recv().is_err());
    assert_eq!(*log.lock().unwrap(), vec!["start", "release_camera", "release_detector"]);
}

#[test]
fn teardown_releases_camera_then_detector() {
    let out = run_script(ScriptedSource::new(&[Step::Hand(1.0)]));
    assert!(out.report.is_clean());
    assert_eq!(out.log, vec!["start", "release_camera", "release_detector"]);
}

#[test]
fn detector_released_even_when_camera_release_fails() {
    let mut source = ScriptedSource::new(&[Step::Hand(1.0)]);
    source.fail_camera_release = true;
    let out = run_script(source);

    assert_eq!(out.log, vec!["start", "release_camera", "release_detector"]);
    assert_eq!(out.report.errors.len(), 1);
    assert!(matches!(out.report.errors[0], TeardownError::Camera(_)));
}

#[test]
fn dropping_a_session_also_tears_down() {
    let source = ScriptedSource::new(&[]);
    let log = Arc::clone(&source.log);
    let (tx, _rx) = mpsc::channel();
    let session = Session::start(Box::new(source), ControlSurface::shared(), tx, &fast_config())
        .expect("session starts");
    drop(session);
    assert_eq!(*log.lock().unwrap(), vec!["start", "release_camera", "release_detector"]);
}
