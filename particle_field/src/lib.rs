//! # particle_field
//!
//! Two fixed particle configurations generated once at startup:
//!
//! * **Tree** — a conical spiral, widest at the base, tapering to the apex.
//! * **Sphere** — particles scattered through a shell of radius 8–10.
//!
//! Particle `i` owns one endpoint in each configuration.  The renderer
//! blends between them with a single scalar `t ∈ [0, 1]`
//! (0 = tree, 1 = sphere); nothing here changes after generation.
//!
//! ```rust
//! use particle_field::ParticleField;
//!
//! let field = ParticleField::seeded(1_000, 7);
//! assert_eq!(field.tree.len(), 3_000);
//! let halfway = field.blended(0, 0.5);
//! # let _ = halfway;
//! ```

use std::f32::consts::TAU;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

// ════════════════════════════════════════════════════════════════════════════
// Shape constants
// ════════════════════════════════════════════════════════════════════════════

pub const TREE_HEIGHT:      f32 = 24.0;
pub const TREE_BASE_RADIUS: f32 = 9.0;
const TREE_TURNS:           f32 = 7.0;
/// Fraction of the local radius a particle may drift inward.
const TREE_JITTER:          f32 = 0.2;

pub const SPHERE_INNER: f32 = 8.0;
pub const SPHERE_OUTER: f32 = 10.0;

/// One tree particle in this many is an ornament (gold instead of green).
const ORNAMENT_EVERY: usize = 12;

// ════════════════════════════════════════════════════════════════════════════
// ParticleField
// ════════════════════════════════════════════════════════════════════════════

/// Static per-particle endpoints.  Positions are interleaved `x, y, z`.
#[derive(Clone, Debug)]
pub struct ParticleField {
    pub tree:   Vec<f32>,
    pub sphere: Vec<f32>,
    /// Packed ARGB colour per particle.
    pub colors: Vec<u32>,
}

impl ParticleField {
    pub fn generate<R: Rng>(count: usize, rng: &mut R) -> Self {
        let mut tree   = Vec::with_capacity(count * 3);
        let mut sphere = Vec::with_capacity(count * 3);
        let mut colors = Vec::with_capacity(count);

        for i in 0..count {
            tree.extend_from_slice(&tree_point(i, count, rng));
            sphere.extend_from_slice(&sphere_point(rng));
            colors.push(particle_color(i, rng));
        }

        ParticleField { tree, sphere, colors }
    }

    /// Deterministic field for a given seed.
    pub fn seeded(count: usize, seed: u64) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        Self::generate(count, &mut rng)
    }

    pub fn len(&self) -> usize { self.colors.len() }

    pub fn is_empty(&self) -> bool { self.colors.is_empty() }

    /// Position of particle `i` at blend `t` (0 = tree, 1 = sphere).
    pub fn blended(&self, i: usize, t: f32) -> [f32; 3] {
        let t = t.clamp(0.0, 1.0);
        let a = &self.tree[i * 3..i * 3 + 3];
        let b = &self.sphere[i * 3..i * 3 + 3];
        [
            a[0] + (b[0] - a[0]) * t,
            a[1] + (b[1] - a[1]) * t,
            a[2] + (b[2] - a[2]) * t,
        ]
    }
}

fn tree_point<R: Rng>(i: usize, count: usize, rng: &mut R) -> [f32; 3] {
    let h = if count > 1 { i as f32 / (count - 1) as f32 } else { 0.0 };
    let angle  = h * TREE_TURNS * TAU + rng.gen_range(-0.15_f32..0.15);
    let radius = TREE_BASE_RADIUS * (1.0 - h) * (1.0 - rng.gen::<f32>() * TREE_JITTER);
    [
        radius * angle.cos(),
        h * TREE_HEIGHT - TREE_HEIGHT / 2.0,
        radius * angle.sin(),
    ]
}

/// Uniform direction (`cos θ` uniform in [-1, 1]), radius uniform in the shell.
fn sphere_point<R: Rng>(rng: &mut R) -> [f32; 3] {
    let u: f32   = rng.gen_range(-1.0..=1.0);
    let phi: f32 = rng.gen_range(0.0..TAU);
    let r: f32   = rng.gen_range(SPHERE_INNER..=SPHERE_OUTER);
    let ring = (1.0 - u * u).max(0.0).sqrt();
    [r * ring * phi.cos(), r * u, r * ring * phi.sin()]
}

// ════════════════════════════════════════════════════════════════════════════
// Palette
// ════════════════════════════════════════════════════════════════════════════

fn particle_color<R: Rng>(i: usize, rng: &mut R) -> u32 {
    if i % ORNAMENT_EVERY == 0 {
        hsv_to_argb(45.0 + rng.gen_range(-6.0_f32..6.0), 0.85, 1.0)
    } else {
        hsv_to_argb(rng.gen_range(100.0_f32..150.0), 0.75, rng.gen_range(0.55_f32..0.95))
    }
}

/// Convert HSV → packed ARGB (0xAARRGGBB, A=0xFF).
pub fn hsv_to_argb(h: f32, s: f32, v: f32) -> u32 {
    let h  = h.rem_euclid(360.0);
    let hi = (h / 60.0) as u32;
    let f  = h / 60.0 - hi as f32;
    let p  = v * (1.0 - s);
    let q  = v * (1.0 - s * f);
    let t  = v * (1.0 - s * (1.0 - f));
    let (r, g, b) = match hi {
        0 => (v, t, p),
        1 => (q, v, p),
        2 => (p, v, t),
        3 => (p, q, v),
        4 => (t, p, v),
        _ => (v, p, q),
    };
    let ri = (r.clamp(0.0, 1.0) * 255.0) as u32;
    let gi = (g.clamp(0.0, 1.0) * 255.0) as u32;
    let bi = (b.clamp(0.0, 1.0) * 255.0) as u32;
    0xFF000000 | (ri << 16) | (gi << 8) | bi
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════
