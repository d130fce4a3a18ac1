//! Configuration loaded from a TOML file.  Every field has a default, so an
//! empty file (or no file at all) gives the stock tuning.
//!
//! ```toml
//! [gesture]
//! closed_below = 1.4
//! open_above   = 1.6
//!
//! [depth]
//! palm_min = 0.05
//! gain     = 4.0
//!
//! [smoothing]
//! blend_rate  = 2.0
//! camera_rate = 2.0
//!
//! [camera.chaos]          # a preset table must list all five fields
//! x_range = 50.0
//! y_range = 25.0
//! y_offset = 2.0
//! min_distance = 15.0
//! max_distance = 40.0
//!
//! [particles]
//! count = 4000
//! seed  = 2024
//! ```

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use hand_signal::{DepthCalibration, GestureThresholds};

use crate::error::ConfigError;
use crate::smoothing::{CameraPreset, CameraPresets, IdleOrbit};

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SmoothingConfig {
    /// Blend parameter damping, per second.
    pub blend_rate:  f32,
    /// Camera damping with a hand present, per second.
    pub camera_rate: f32,
}

impl Default for SmoothingConfig {
    fn default() -> Self {
        SmoothingConfig { blend_rate: 2.0, camera_rate: 2.0 }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParticleConfig {
    pub count: usize,
    pub seed:  u64,
}

impl Default for ParticleConfig {
    fn default() -> Self {
        ParticleConfig { count: 4_000, seed: 2024 }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Upper bound on detection ticks per second.
    pub detection_hz: f32,
    /// Status label refresh rate.
    pub status_hz:    f32,
}

impl Default for SessionConfig {
    fn default() -> Self {
        SessionConfig { detection_hz: 30.0, status_hz: 5.0 }
    }
}

impl SessionConfig {
    pub fn detection_interval(&self) -> Duration {
        Duration::from_secs_f64(1.0 / f64::from(self.detection_hz))
    }

    pub fn status_interval(&self) -> Duration {
        Duration::from_secs_f64(1.0 / f64::from(self.status_hz))
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MorphConfig {
    pub gesture:   GestureThresholds,
    pub depth:     DepthCalibration,
    pub smoothing: SmoothingConfig,
    pub camera:    CameraPresets,
    pub idle:      IdleOrbit,
    pub particles: ParticleConfig,
    pub session:   SessionConfig,
}

impl MorphConfig {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let cfg: MorphConfig = toml::from_str(text)?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.gesture.validate()?;

        let positive = [
            ("depth.gain",             self.depth.gain),
            ("smoothing.blend_rate",   self.smoothing.blend_rate),
            ("smoothing.camera_rate",  self.smoothing.camera_rate),
            ("session.detection_hz",   self.session.detection_hz),
            ("session.status_hz",      self.session.status_hz),
        ];
        for (name, v) in positive {
            if !(v > 0.0 && v.is_finite()) {
                return Err(ConfigError::Invalid(format!("{} must be positive, got {}", name, v)));
            }
        }

        for (name, p) in [("camera.formed", &self.camera.formed), ("camera.chaos", &self.camera.chaos)] {
            check_preset(name, p)?;
        }
        Ok(())
    }
}

fn check_preset(name: &str, p: &CameraPreset) -> Result<(), ConfigError> {
    if p.min_distance <= 0.0 || p.min_distance > p.max_distance {
        return Err(ConfigError::Invalid(format!(
            "{}: need 0 < min_distance <= max_distance (got {} / {})",
            name, p.min_distance, p.max_distance
        )));
    }
    Ok(())
}
