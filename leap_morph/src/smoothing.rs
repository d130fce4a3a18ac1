//! Per-render-tick smoothing.
//!
//! Two independent damped trackers run once per rendered frame:
//!
//! * the **blend** scalar chases the mode's target (0 = tree, 1 = sphere);
//! * the **camera** chases a point derived from the hand, or an idle orbit
//!   when no hand is visible.
//!
//! Both use `value += (target - value) * min(1, rate * dt)`: an exponential
//! approach that cannot overshoot for any positive `dt`.

use nalgebra::{Point3, Vector3};
use serde::{Deserialize, Serialize};

use crate::control::ControlState;
use crate::state::AppMode;

/// One damping step.  Non-positive or non-finite `dt` leaves `current` alone.
pub fn damp(current: f32, target: f32, rate: f32, dt: f32) -> f32 {
    if !(dt > 0.0 && dt.is_finite()) {
        return current;
    }
    current + (target - current) * (rate * dt).min(1.0)
}

fn damp_vec(current: Vector3<f32>, target: Vector3<f32>, rate: f32, dt: f32) -> Vector3<f32> {
    if !(dt > 0.0 && dt.is_finite()) {
        return current;
    }
    current + (target - current) * (rate * dt).min(1.0)
}

// ════════════════════════════════════════════════════════════════════════════
// BlendTracker
// ════════════════════════════════════════════════════════════════════════════

/// The scalar driving tree ↔ sphere interpolation.  Only ever advanced,
/// never assigned.
#[derive(Clone, Debug)]
pub struct BlendTracker {
    value: f32,
    rate:  f32,
}

impl BlendTracker {
    pub fn new(rate: f32) -> Self {
        BlendTracker { value: 0.0, rate }
    }

    pub fn value(&self) -> f32 { self.value }

    pub fn advance(&mut self, target: f32, dt: f32) -> f32 {
        self.value = damp(self.value, target, self.rate, dt).clamp(0.0, 1.0);
        self.value
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Camera presets
// ════════════════════════════════════════════════════════════════════════════

/// How far the camera travels for a full-range hand movement.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct CameraPreset {
    /// World units at `x = ±1`.
    pub x_range:      f32,
    /// World units at `y = ±1`.
    pub y_range:      f32,
    pub y_offset:     f32,
    /// Distance from the origin at full zoom (`z = 1`).
    pub min_distance: f32,
    /// Distance from the origin with no zoom (`z = 0`).
    pub max_distance: f32,
}

impl CameraPreset {
    pub fn formed() -> Self {
        CameraPreset { x_range: 30.0, y_range: 15.0, y_offset: 5.0, min_distance: 10.0, max_distance: 35.0 }
    }

    /// Wider and further out, to look around the scattered sphere.
    pub fn chaos() -> Self {
        CameraPreset { x_range: 50.0, y_range: 25.0, y_offset: 2.0, min_distance: 15.0, max_distance: 40.0 }
    }

    pub fn target(&self, control: &ControlState) -> Vector3<f32> {
        Vector3::new(
            control.x * self.x_range,
            control.y * self.y_range + self.y_offset,
            self.max_distance - control.z * (self.max_distance - self.min_distance),
        )
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct CameraPresets {
    #[serde(default = "CameraPreset::formed")]
    pub formed: CameraPreset,
    #[serde(default = "CameraPreset::chaos")]
    pub chaos:  CameraPreset,
}

impl Default for CameraPresets {
    fn default() -> Self {
        CameraPresets { formed: CameraPreset::formed(), chaos: CameraPreset::chaos() }
    }
}

impl CameraPresets {
    /// FOCUS uses the tight preset until it gets its own.
    pub fn for_mode(&self, mode: AppMode) -> &CameraPreset {
        match mode {
            AppMode::Chaos => &self.chaos,
            AppMode::Formed | AppMode::Focus => &self.formed,
        }
    }
}

/// Slow circle the camera drifts along while no hand is visible.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IdleOrbit {
    pub radius:        f32,
    pub height:        f32,
    /// Radians per second.
    pub angular_speed: f32,
}

impl Default for IdleOrbit {
    fn default() -> Self {
        IdleOrbit { radius: 30.0, height: 5.0, angular_speed: 0.2 }
    }
}

impl IdleOrbit {
    pub fn position(&self, elapsed: f32) -> Vector3<f32> {
        let a = elapsed * self.angular_speed;
        Vector3::new(a.sin() * self.radius, self.height, a.cos() * self.radius)
    }
}

// ════════════════════════════════════════════════════════════════════════════
// CameraRig
// ════════════════════════════════════════════════════════════════════════════

#[derive(Clone, Debug)]
pub struct CameraRig {
    position: Vector3<f32>,
    /// Damping rate with a hand present; the idle orbit uses half.
    rate:     f32,
    presets:  CameraPresets,
    idle:     IdleOrbit,
}

impl CameraRig {
    pub fn new(rate: f32, presets: CameraPresets, idle: IdleOrbit) -> Self {
        CameraRig { position: idle.position(0.0), rate, presets, idle }
    }

    pub fn position(&self) -> Vector3<f32> { self.position }

    /// The point the camera is heading for, and the damping rate to use.
    pub fn target(&self, control: &ControlState, mode: AppMode, elapsed: f32) -> (Vector3<f32>, f32) {
        if control.is_present {
            (self.presets.for_mode(mode).target(control), self.rate)
        } else {
            (self.idle.position(elapsed), self.rate * 0.5)
        }
    }

    pub fn update(&mut self, control: &ControlState, mode: AppMode, dt: f32, elapsed: f32) -> Vector3<f32> {
        let (target, rate) = self.target(control, mode, elapsed);
        self.position = damp_vec(self.position, target, rate, dt);
        self.position
    }
}

// ════════════════════════════════════════════════════════════════════════════
// RenderFrame — what the renderer receives each tick
// ════════════════════════════════════════════════════════════════════════════

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RenderFrame {
    /// 0 = tree, 1 = sphere.
    pub blend:   f32,
    pub camera:  Vector3<f32>,
    pub look_at: Point3<f32>,
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use hand_signal::Gesture;

    fn hand(x: f32, y: f32, z: f32) -> ControlState {
        ControlState { x, y, z, gesture: Gesture::Open, is_present: true }
    }

    #[test]
    fn damp_ignores_bad_dt() {
        assert_eq!(damp(0.3, 1.0, 2.0, 0.0), 0.3);
        assert_eq!(damp(0.3, 1.0, 2.0, -0.1), 0.3);
        assert_eq!(damp(0.3, 1.0, 2.0, f32::NAN), 0.3);
    }

    #[test]
    fn damp_snaps_when_step_exceeds_one() {
        assert_eq!(damp(0.0, 1.0, 2.0, 5.0), 1.0);
    }

    #[test]
    fn blend_monotone_without_overshoot() {
        for dt in [0.001, 1.0 / 144.0, 1.0 / 60.0, 0.1, 0.49, 0.5, 2.0] {
            let mut b = BlendTracker::new(2.0);
            let mut prev = b.value();
            for _ in 0..2_000 {
                let v = b.advance(1.0, dt);
                assert!(v >= prev && v <= 1.0, "dt={} v={} prev={}", dt, v, prev);
                prev = v;
            }
            let mut prev = b.value();
            for _ in 0..2_000 {
                let v = b.advance(0.0, dt);
                assert!(v <= prev && v >= 0.0, "dt={} v={} prev={}", dt, v, prev);
                prev = v;
            }
        }
    }

    #[test]
    fn blend_converges_in_bounded_ticks() {
        // Remaining error shrinks by (1 - k) per tick, k = rate * dt.
        // Within 1e-3 after ceil(ln(1e-3) / ln(1 - k)) ≈ 6.9 / k ticks.
        let dt = 1.0 / 60.0;
        let k: f32 = 2.0 * dt;
        let bound = (7.0 / k).ceil() as usize + 1;
        let mut b = BlendTracker::new(2.0);
        let mut ticks = 0;
        while 1.0 - b.value() > 1e-3 {
            b.advance(1.0, dt);
            ticks += 1;
            assert!(ticks <= bound, "not converged after {} ticks", ticks);
        }
    }

    #[test]
    fn chaos_ranges_are_wider() {
        let p = CameraPresets::default();
        let (f, c) = (p.formed, p.chaos);
        assert!(c.x_range > f.x_range);
        assert!(c.y_range > f.y_range);
        assert!(c.max_distance > f.max_distance);
        assert_eq!((f.x_range, c.x_range), (30.0, 50.0));
        assert_eq!((f.y_range, c.y_range), (15.0, 25.0));
        assert_eq!((f.y_offset, c.y_offset), (5.0, 2.0));
        assert_eq!((f.max_distance, c.max_distance), (35.0, 40.0));
    }

    #[test]
    fn same_hand_reaches_further_in_chaos() {
        let p = CameraPresets::default();
        let c = hand(0.8, -0.6, 0.0);
        let tf = p.for_mode(AppMode::Formed).target(&c);
        let tc = p.for_mode(AppMode::Chaos).target(&c);
        assert!(tc.x.abs() > tf.x.abs());
        assert!(tc.z > tf.z);
        assert!((tf.x - 24.0).abs() < 1e-4);
        assert!((tf.y - (-4.0)).abs() < 1e-4);
        assert!((tf.z - 35.0).abs() < 1e-4);
    }

    #[test]
    fn full_zoom_reaches_min_distance() {
        let t = CameraPreset::formed().target(&hand(0.0, 0.0, 1.0));
        assert!((t.z - 10.0).abs() < 1e-4);
    }

    #[test]
    fn absent_hand_follows_idle_orbit_at_half_rate() {
        let rig = CameraRig::new(2.0, CameraPresets::default(), IdleOrbit::default());
        let mut absent = hand(0.9, 0.9, 0.9);
        absent.is_present = false;
        let (target, rate) = rig.target(&absent, AppMode::Chaos, 0.0);
        assert_eq!(rate, 1.0);
        assert!((target - Vector3::new(0.0, 5.0, 30.0)).norm() < 1e-4);

        let (_, present_rate) = rig.target(&hand(0.0, 0.0, 0.0), AppMode::Chaos, 0.0);
        assert_eq!(present_rate, 2.0);
    }

    #[test]
    fn idle_orbit_stays_on_circle() {
        let orbit = IdleOrbit::default();
        for t in [0.0, 3.0, 17.5, 100.0] {
            let p = orbit.position(t);
            let r = (p.x * p.x + p.z * p.z).sqrt();
            assert!((r - 30.0).abs() < 1e-3);
            assert_eq!(p.y, 5.0);
        }
    }

    #[test]
    fn rig_moves_toward_hand_target() {
        let mut rig = CameraRig::new(2.0, CameraPresets::default(), IdleOrbit::default());
        let c = hand(1.0, 0.0, 0.5);
        let target = CameraPreset::formed().target(&c);
        let before = (rig.position() - target).norm();
        rig.update(&c, AppMode::Formed, 1.0 / 60.0, 0.0);
        let after = (rig.position() - target).norm();
        assert!(after < before);
    }
}
