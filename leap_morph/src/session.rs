//! Detection session: the background loop that samples the landmark source
//! and keeps the [`ControlSurface`] current.
//!
//! * The loop runs on its own thread and owns the source outright.  One
//!   detection finishes before the next starts, so there is never more
//!   than one in flight and never a backlog; slow inference simply lowers
//!   the effective rate.
//! * Gesture edges are forwarded to the main loop over the shared
//!   [`MorphEvent`] channel.
//! * Teardown stops the loop, then releases the camera, then the detector.
//!   Each step runs even if an earlier one failed, and a panicking detector
//!   only costs the tick it panicked in.

use std::io;
use std::panic::{self, AssertUnwindSafe};
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use hand_signal::{extract, DepthCalibration, Gesture, GestureThresholds, GestureTracker, HandFrame};

use crate::config::MorphConfig;
use crate::control::{ControlState, ControlSurface};
use crate::error::{DetectionError, SessionError, TeardownError};
use crate::source::LandmarkSource;
use crate::state::MorphEvent;

// ════════════════════════════════════════════════════════════════════════════
// SignalPipeline — one detection tick, minus the threading
// ════════════════════════════════════════════════════════════════════════════

/// Feature extraction + classification + publication for a single frame.
#[derive(Debug)]
pub struct SignalPipeline {
    calibration: DepthCalibration,
    tracker:     GestureTracker,
}

impl SignalPipeline {
    pub fn new(calibration: DepthCalibration, thresholds: GestureThresholds) -> Self {
        SignalPipeline { calibration, tracker: GestureTracker::new(thresholds) }
    }

    pub fn from_config(cfg: &MorphConfig) -> Self {
        Self::new(cfg.depth, cfg.gesture)
    }

    /// Publish this tick's hand state.  Returns the new gesture on an edge.
    ///
    /// With no hand only `is_present` is cleared; the tracker keeps its
    /// gesture so no edge is reported for the absence itself.
    pub fn process(&mut self, frame: Option<&HandFrame>, surface: &ControlSurface) -> Option<Gesture> {
        match frame {
            Some(frame) => {
                let signal = extract(frame, &self.calibration);
                let update = self.tracker.update(signal.compactness);
                surface.publish(ControlState::present(&signal, update.gesture));
                update.edge
            }
            None => {
                surface.mark_absent();
                None
            }
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Session
// ════════════════════════════════════════════════════════════════════════════

/// What went wrong during teardown, if anything.
#[derive(Debug, Default)]
pub struct TeardownReport {
    pub errors: Vec<TeardownError>,
}

impl TeardownReport {
    pub fn is_clean(&self) -> bool { self.errors.is_empty() }
}

/// Holds the source for the detection thread.  The thread locks it for its
/// whole run, so after a join (or a failed spawn) the source is still here
/// to release, even if the thread unwound.
type SourceSlot      = Arc<Mutex<Option<Box<dyn LandmarkSource>>>>;
type DetectionJob    = Box<dyn FnOnce() + Send + 'static>;
type DetectionHandle = JoinHandle<()>;

fn take_source(slot: &SourceSlot) -> Option<Box<dyn LandmarkSource>> {
    slot.lock().unwrap_or_else(PoisonError::into_inner).take()
}

/// Camera first, then detector.  The second step runs whatever the first
/// returned.
fn release_all(source: &mut dyn LandmarkSource) -> Vec<TeardownError> {
    let mut errors = Vec::new();
    if let Err(e) = source.release_camera() {
        warn!(error = %e, "camera release failed");
        errors.push(e);
    }
    if let Err(e) = source.release_detector() {
        warn!(error = %e, "detector release failed");
        errors.push(e);
    }
    errors
}

pub struct Session {
    stop_tx: Option<Sender<()>>,
    handle:  Option<DetectionHandle>,
    slot:    SourceSlot,
}

impl Session {
    /// Start the source and spawn the detection loop.
    ///
    /// Setup failures are returned as-is and never retried.
    pub fn start(
        source:  Box<dyn LandmarkSource>,
        surface: Arc<ControlSurface>,
        events:  Sender<MorphEvent>,
        cfg:     &MorphConfig,
    ) -> Result<Session, SessionError> {
        Self::start_with(source, surface, events, cfg, |job| {
            thread::Builder::new().name("detection".to_string()).spawn(job)
        })
    }

    fn start_with<S>(
        mut source: Box<dyn LandmarkSource>,
        surface:    Arc<ControlSurface>,
        events:     Sender<MorphEvent>,
        cfg:        &MorphConfig,
        spawn:      S,
    ) -> Result<Session, SessionError>
    where
        S: FnOnce(DetectionJob) -> io::Result<DetectionHandle>,
    {
        if let Err(e) = source.start() {
            // Release whatever was acquired before the failure.
            release_all(source.as_mut());
            return Err(e);
        }

        let pipeline = SignalPipeline::from_config(cfg);
        let interval = cfg.session.detection_interval();
        let (stop_tx, stop_rx) = mpsc::channel::<()>();

        let slot: SourceSlot = Arc::new(Mutex::new(Some(source)));
        let job_slot = Arc::clone(&slot);
        let job: DetectionJob = Box::new(move || {
            let mut guard = job_slot.lock().unwrap_or_else(PoisonError::into_inner);
            if let Some(source) = guard.as_mut() {
                detection_loop(source.as_mut(), pipeline, &surface, &events, &stop_rx, interval);
            }
        });

        let handle = match spawn(job) {
            Ok(handle) => handle,
            Err(e) => {
                if let Some(mut source) = take_source(&slot) {
                    release_all(source.as_mut());
                }
                return Err(SessionError::Spawn(e));
            }
        };

        info!(hz = cfg.session.detection_hz, "detection loop started");
        Ok(Session { stop_tx: Some(stop_tx), handle: Some(handle), slot })
    }

    pub fn teardown(mut self) -> TeardownReport {
        self.shutdown()
    }

    fn shutdown(&mut self) -> TeardownReport {
        let mut report = TeardownReport::default();

        // 1. stop the detection loop (cancels the next scheduled tick)
        if let Some(tx) = self.stop_tx.take() {
            let _ = tx.send(());
        }
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                warn!("detection loop panicked");
                report.errors.push(TeardownError::DetectionLoopPanicked);
            }
        }

        // 2. camera, 3. detector
        if let Some(mut source) = take_source(&self.slot) {
            report.errors.extend(release_all(source.as_mut()));
        }

        info!(clean = report.is_clean(), "session torn down");
        report
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        if self.handle.is_some() {
            let _ = self.shutdown();
        }
    }
}

/// One detection; a panicking detector counts as a failed inference.
fn detect_guarded(source: &mut dyn LandmarkSource, timestamp: Duration) -> Result<Option<HandFrame>, DetectionError> {
    panic::catch_unwind(AssertUnwindSafe(|| source.detect(timestamp)))
        .unwrap_or_else(|_| Err(DetectionError::Inference("detector panicked".to_string())))
}

fn detection_loop(
    source:       &mut dyn LandmarkSource,
    mut pipeline: SignalPipeline,
    surface:      &ControlSurface,
    events:       &Sender<MorphEvent>,
    stop_rx:      &mpsc::Receiver<()>,
    interval:     Duration,
) {
    let epoch = Instant::now();

    loop {
        let tick = Instant::now();

        match detect_guarded(source, epoch.elapsed()) {
            Ok(frame) => {
                if let Some(edge) = pipeline.process(frame.as_ref(), surface) {
                    if events.send(MorphEvent::GestureEdge(edge)).is_err() {
                        debug!("event receiver gone; stopping detection");
                        break;
                    }
                }
            }
            Err(DetectionError::NoFrame) => {}
            Err(e) => warn!(error = %e, "detection failed; keeping previous hand state"),
        }

        let wait = interval.saturating_sub(tick.elapsed());
        match stop_rx.recv_timeout(wait) {
            Err(RecvTimeoutError::Timeout) => continue,
            Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
        }
    }

    debug!("detection loop exited");
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use hand_signal::synthetic_hand;

    #[derive(Default)]
    struct LoggedSource {
        log: Arc<Mutex<Vec<&'static str>>>,
    }

    impl LandmarkSource for LoggedSource {
        fn start(&mut self) -> Result<(), SessionError> {
            self.log.lock().unwrap().push("start");
            Ok(())
        }
        fn detect(&mut self, _t: Duration) -> Result<Option<HandFrame>, DetectionError> {
            Err(DetectionError::NoFrame)
        }
        fn release_camera(&mut self) -> Result<(), TeardownError> {
            self.log.lock().unwrap().push("release_camera");
            Ok(())
        }
        fn release_detector(&mut self) -> Result<(), TeardownError> {
            self.log.lock().unwrap().push("release_detector");
            Ok(())
        }
    }

    fn pipeline() -> SignalPipeline {
        SignalPipeline::new(DepthCalibration::default(), GestureThresholds::default())
    }

    #[test]
    fn present_frame_publishes_signal() {
        let surface = ControlSurface::default();
        let mut p = pipeline();
        let edge = p.process(Some(&synthetic_hand((0.25, 0.5), 0.175, 1.0)), &surface);
        assert_eq!(edge, Some(Gesture::Open));

        let s = surface.snapshot();
        assert!(s.is_present);
        assert_eq!(s.gesture, Gesture::Open);
        assert!((s.x - 0.5).abs() < 1e-5);
        assert!((s.z - 0.5).abs() < 1e-4);
    }

    #[test]
    fn absence_reports_no_edge() {
        let surface = ControlSurface::default();
        let mut p = pipeline();
        p.process(Some(&synthetic_hand((0.5, 0.5), 0.1, 0.0)), &surface);
        for _ in 0..5 {
            assert_eq!(p.process(None, &surface), None);
        }
        assert_eq!(surface.snapshot().gesture, Gesture::Closed);
    }

    #[test]
    fn sustained_gesture_single_edge() {
        let surface = ControlSurface::default();
        let mut p = pipeline();
        let frame = synthetic_hand((0.5, 0.5), 0.1, 1.0);
        let edges: Vec<_> = (0..10).filter_map(|_| p.process(Some(&frame), &surface)).collect();
        assert_eq!(edges, vec![Gesture::Open]);
    }

    #[test]
    fn spawn_failure_releases_started_source() {
        let source = LoggedSource::default();
        let log = Arc::clone(&source.log);
        let (tx, _rx) = mpsc::channel();

        let result = Session::start_with(
            Box::new(source),
            ControlSurface::shared(),
            tx,
            &MorphConfig::default(),
            |_job| Err(io::Error::new(io::ErrorKind::WouldBlock, "thread limit reached")),
        );

        assert!(matches!(result, Err(SessionError::Spawn(_))));
        assert_eq!(*log.lock().unwrap(), vec!["start", "release_camera", "release_detector"]);
    }

    #[test]
    fn panicking_detector_is_one_failed_tick() {
        struct Exploding;
        impl LandmarkSource for Exploding {
            fn start(&mut self) -> Result<(), SessionError> { Ok(()) }
            fn detect(&mut self, _t: Duration) -> Result<Option<HandFrame>, DetectionError> {
                panic!("inference backend crashed")
            }
            fn release_camera(&mut self) -> Result<(), TeardownError> { Ok(()) }
            fn release_detector(&mut self) -> Result<(), TeardownError> { Ok(()) }
        }

        let mut source = Exploding;
        let result = detect_guarded(&mut source, Duration::ZERO);
        assert!(matches!(result, Err(DetectionError::Inference(_))));
    }
}
