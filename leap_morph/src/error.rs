//! Error taxonomy.
//!
//! | Class | Type | Handling |
//! |---|---|---|
//! | Setup failure (camera, model, window) | [`SessionError`] | terminal, shown to the user |
//! | Playback failure | [`SessionError::Playback`] | terminal, reported apart from camera errors |
//! | Transient detection failure | [`DetectionError`] | logged, tick skipped, loop continues |
//! | Teardown failure | [`TeardownError`] | logged, remaining release steps still run |

use thiserror::Error;

use hand_signal::{LandmarkError, ThresholdError};

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("camera permission denied: {0}")]
    CameraPermissionDenied(String),
    #[error("no camera available: {0}")]
    CameraUnavailable(String),
    #[error("hand-landmark model failed to load: {0}")]
    ModelLoad(String),
    #[error("video playback could not start: {0}")]
    Playback(String),
    #[error("window could not be opened: {0}")]
    Window(String),
    #[error("detection thread could not be spawned: {0}")]
    Spawn(#[source] std::io::Error),
}

impl SessionError {
    /// Short machine-friendly reason, distinct per failure class.
    pub fn reason(&self) -> &'static str {
        match self {
            SessionError::CameraPermissionDenied(_) => "camera-permission-denied",
            SessionError::CameraUnavailable(_)      => "camera-unavailable",
            SessionError::ModelLoad(_)              => "model-load-failed",
            SessionError::Playback(_)               => "playback-failed",
            SessionError::Window(_)                 => "window-failed",
            SessionError::Spawn(_)                  => "thread-spawn-failed",
        }
    }
}

#[derive(Debug, Error)]
pub enum DetectionError {
    #[error("hand inference failed: {0}")]
    Inference(String),
    #[error("detector returned a malformed hand: {0}")]
    Landmarks(#[from] LandmarkError),
    /// The device produced no tracking frame this tick.
    #[error("no frame available")]
    NoFrame,
}

#[derive(Debug, Error)]
pub enum TeardownError {
    #[error("detection loop panicked")]
    DetectionLoopPanicked,
    #[error("failed to release camera: {0}")]
    Camera(String),
    #[error("failed to release hand detector: {0}")]
    Detector(String),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("cannot parse config file: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid gesture thresholds: {0}")]
    Thresholds(#[from] ThresholdError),
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn setup_reasons_are_distinct() {
        let errs = [
            SessionError::CameraPermissionDenied("x".into()),
            SessionError::CameraUnavailable("x".into()),
            SessionError::ModelLoad("x".into()),
            SessionError::Playback("x".into()),
            SessionError::Window("x".into()),
        ];
        let mut reasons: Vec<_> = errs.iter().map(|e| e.reason()).collect();
        reasons.sort();
        reasons.dedup();
        assert_eq!(reasons.len(), errs.len());
    }

    #[test]
    fn playback_message_differs_from_permission() {
        let p = SessionError::Playback("autoplay blocked".into()).to_string();
        let c = SessionError::CameraPermissionDenied("user said no".into()).to_string();
        assert!(p.starts_with("video playback"));
        assert!(c.starts_with("camera permission"));
    }
}
