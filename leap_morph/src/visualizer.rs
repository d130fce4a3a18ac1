//! Software-rendered particle viewer using `minifb`.
//!
//! Layout:
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │ MODE                                          [blend ▮▮▮ ]│
//! │                                                          │
//! │                  particles (perspective)                 │
//! │                                                          │
//! │ status bar                                               │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! Particles are projected with a look-at view and a perspective matrix,
//! then splatted as single pixels (or 2×2 when close) and faded toward the
//! background with distance.

use std::sync::mpsc::Sender;

use minifb::{Key, KeyRepeat, MouseMode, Window, WindowOptions};
use nalgebra::{Isometry3, Perspective3, Point3, Vector3};
use tracing::warn;

use particle_field::ParticleField;

use crate::error::SessionError;
use crate::smoothing::RenderFrame;
use crate::source::SimInput;
use crate::state::{AppMode, MorphEvent};

// ════════════════════════════════════════════════════════════════════════════
// Layout constants
// ════════════════════════════════════════════════════════════════════════════

pub const WIN_W:      usize = 960;
pub const WIN_H:      usize = 640;
const STATUS_H:       usize = 28;
const STATUS_Y:       usize = WIN_H - STATUS_H;
const TEXT_SCALE:     usize = 2;
const BLEND_BAR_W:    usize = 160;
const BLEND_BAR_H:    usize = 10;
const BG_COLOR:       u32   = 0xFF05070F;
const TEXT_BG:        u32   = 0xFF0F3460;
const TEXT_COLOR:     u32   = 0xFFE0E0E0;
const BAR_COLOR:      u32   = 0xFFFFD700;  // gold

const FOV_Y:          f32   = std::f32::consts::FRAC_PI_4;
const Z_NEAR:         f32   = 0.5;
const Z_FAR:          f32   = 200.0;
/// Distance at which particles start fading, and where they vanish.
const FADE_START:     f32   = 20.0;
const FADE_END:       f32   = 70.0;
/// Closer than this a particle is drawn 2×2.
const SPLAT_DISTANCE: f32   = 18.0;

/// Palm-size change per frame while Up/Down is held.
const ZOOM_STEP:      f32   = 0.004;

// ════════════════════════════════════════════════════════════════════════════
// Projector — pure camera maths, no window
// ════════════════════════════════════════════════════════════════════════════

/// World → screen projection for one frame.
#[derive(Clone, Debug)]
pub struct Projector {
    view:   Isometry3<f32>,
    proj:   Perspective3<f32>,
    width:  f32,
    height: f32,
}

/// A projected point: pixel coordinates plus distance along the view axis.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ScreenPoint {
    pub x:     f32,
    pub y:     f32,
    pub depth: f32,
}

impl Projector {
    pub fn new(eye: Vector3<f32>, look_at: Point3<f32>, width: usize, height: usize) -> Self {
        let eye = Point3::from(eye);
        let view = Isometry3::look_at_rh(&eye, &look_at, &Vector3::y());
        let aspect = width as f32 / height.max(1) as f32;
        Projector {
            view,
            proj: Perspective3::new(aspect, FOV_Y, Z_NEAR, Z_FAR),
            width:  width as f32,
            height: height as f32,
        }
    }

    pub fn for_frame(frame: &RenderFrame, width: usize, height: usize) -> Self {
        Self::new(frame.camera, frame.look_at, width, height)
    }

    /// `None` for points behind the camera or outside the depth range.
    pub fn project(&self, world: &Point3<f32>) -> Option<ScreenPoint> {
        let eye_space = self.view.transform_point(world);
        // Right-handed view space looks down -z.
        let depth = -eye_space.z;
        if !(Z_NEAR..=Z_FAR).contains(&depth) {
            return None;
        }
        let ndc = self.proj.project_point(&eye_space);
        Some(ScreenPoint {
            x: (ndc.x + 1.0) * 0.5 * self.width,
            y: (1.0 - ndc.y) * 0.5 * self.height,
            depth,
        })
    }
}

/// 1.0 up to `FADE_START`, falling linearly to 0.0 at `FADE_END`.
pub fn depth_fade(depth: f32) -> f32 {
    (1.0 - (depth - FADE_START) / (FADE_END - FADE_START)).clamp(0.0, 1.0)
}

// ════════════════════════════════════════════════════════════════════════════
// Visualizer
// ════════════════════════════════════════════════════════════════════════════

pub struct Visualizer {
    window:   Window,
    buf:      Vec<u32>,
    sim_tx:   Sender<SimInput>,
    event_tx: Sender<MorphEvent>,
    pointer:  Option<(f32, f32)>,
    fist:     bool,
}

impl Visualizer {
    pub fn new(sim_tx: Sender<SimInput>, event_tx: Sender<MorphEvent>) -> Result<Self, SessionError> {
        let mut window = Window::new(
            "Leap Morph — tree / sphere",
            WIN_W, WIN_H,
            WindowOptions {
                resize: false,
                ..WindowOptions::default()
            },
        ).map_err(|e| SessionError::Window(e.to_string()))?;

        window.limit_update_rate(Some(std::time::Duration::from_millis(16))); // ~60fps

        Ok(Visualizer {
            window,
            buf: vec![BG_COLOR; WIN_W * WIN_H],
            sim_tx,
            event_tx,
            pointer: None,
            fist: false,
        })
    }

    /// Returns false when the window should close.
    pub fn is_open(&self) -> bool { self.window.is_open() }

    /// Poll mouse and keyboard.  Hand movement goes to the simulated source;
    /// mode overrides and quit go straight to the event channel.
    pub fn poll_input(&mut self) -> bool {
        if !self.window.is_open() { return false; }

        if self.window.is_key_pressed(Key::Q, KeyRepeat::No)
            || self.window.is_key_pressed(Key::Escape, KeyRepeat::No)
        {
            let _ = self.event_tx.send(MorphEvent::Quit);
            return false;
        }

        // ── simulated hand ────────────────────────────────────────────────
        if let Some((mx, my)) = self.window.get_mouse_pos(MouseMode::Clamp) {
            let p = (mx / WIN_W as f32, my / WIN_H as f32);
            if self.pointer != Some(p) {
                self.pointer = Some(p);
                let _ = self.sim_tx.send(SimInput::Pointer { x: p.0, y: p.1 });
            }
        }

        let fist = self.window.is_key_down(Key::F);
        if fist != self.fist {
            self.fist = fist;
            let _ = self.sim_tx.send(SimInput::Fist(fist));
        }

        if self.window.is_key_down(Key::Up) {
            let _ = self.sim_tx.send(SimInput::Zoom(ZOOM_STEP));
        }
        if self.window.is_key_down(Key::Down) {
            let _ = self.sim_tx.send(SimInput::Zoom(-ZOOM_STEP));
        }
        if self.window.is_key_pressed(Key::H, KeyRepeat::No) {
            let _ = self.sim_tx.send(SimInput::ToggleHand);
        }

        // ── manual overrides (FOCUS has no key) ───────────────────────────
        for (key, mode) in [(Key::Key1, AppMode::Formed), (Key::Key2, AppMode::Chaos)] {
            if self.window.is_key_pressed(key, KeyRepeat::No) {
                let _ = self.event_tx.send(MorphEvent::Override(mode));
            }
        }

        true
    }

    /// Render one frame.
    pub fn render(&mut self, frame: &RenderFrame, field: &ParticleField, mode: AppMode, status: &str) {
        self.buf.fill(BG_COLOR);

        let projector = Projector::for_frame(frame, WIN_W, STATUS_Y);
        for i in 0..field.len() {
            let [x, y, z] = field.blended(i, frame.blend);
            if let Some(sp) = projector.project(&Point3::new(x, y, z)) {
                let fade = depth_fade(sp.depth);
                if fade <= 0.0 { continue; }
                let color = blend(BG_COLOR, field.colors[i], fade);
                self.draw_particle(sp, color);
            }
        }

        self.draw_header(mode, frame.blend);
        self.draw_status(status);

        if let Err(e) = self.window.update_with_buffer(&self.buf, WIN_W, WIN_H) {
            warn!(error = %e, "framebuffer update failed");
        }
    }

    fn draw_particle(&mut self, sp: ScreenPoint, color: u32) {
        if sp.x < 0.0 || sp.y < 0.0 { return; }
        let (px, py) = (sp.x as usize, sp.y as usize);
        if py >= STATUS_Y { return; }
        if sp.depth < SPLAT_DISTANCE {
            self.fill_rect(px, py, 2, 2usize.min(STATUS_Y - py), color);
        } else {
            self.set_pixel(px, py, color);
        }
    }

    fn draw_header(&mut self, mode: AppMode, blend_value: f32) {
        self.draw_label(mode.as_str(), 12, 12, TEXT_COLOR);

        let bx = WIN_W - BLEND_BAR_W - 12;
        self.draw_border(bx, 12, BLEND_BAR_W, BLEND_BAR_H, TEXT_COLOR);
        let filled = ((BLEND_BAR_W - 4) as f32 * blend_value.clamp(0.0, 1.0)) as usize;
        self.fill_rect(bx + 2, 14, filled, BLEND_BAR_H - 4, BAR_COLOR);
    }

    fn draw_status(&mut self, status: &str) {
        self.fill_rect(0, STATUS_Y, WIN_W, STATUS_H, TEXT_BG);
        self.draw_label(status, 12, STATUS_Y + (STATUS_H - 5 * TEXT_SCALE) / 2, TEXT_COLOR);
    }

    // ── Primitive drawing helpers ─────────────────────────────────────────

    fn fill_rect(&mut self, x: usize, y: usize, w: usize, h: usize, color: u32) {
        for row in y..(y+h).min(WIN_H) {
            for col in x..(x+w).min(WIN_W) {
                self.buf[row * WIN_W + col] = color;
            }
        }
    }

    fn draw_border(&mut self, x: usize, y: usize, w: usize, h: usize, color: u32) {
        if w == 0 || h == 0 { return; }
        for col in x..(x+w).min(WIN_W) {
            self.set_pixel(col, y, color);
            self.set_pixel(col, y + h - 1, color);
        }
        for row in y..(y+h).min(WIN_H) {
            self.set_pixel(x, row, color);
            self.set_pixel(x + w - 1, row, color);
        }
    }

    fn set_pixel(&mut self, x: usize, y: usize, color: u32) {
        if x < WIN_W && y < WIN_H {
            self.buf[y * WIN_W + x] = color;
        }
    }

    /// 3×5 bitmap font, each dot drawn `TEXT_SCALE` pixels square.
    fn draw_label(&mut self, text: &str, x: usize, y: usize, color: u32) {
        let advance = 4 * TEXT_SCALE; // 3 wide + 1 gap
        let mut cx = x;
        for ch in text.chars() {
            if cx + advance > WIN_W { break; }
            let glyph = char_glyph(ch);
            for (row, &bits) in glyph.iter().enumerate() {
                for col in 0..3usize {
                    if bits & (1 << (2 - col)) != 0 {
                        self.fill_rect(
                            cx + col * TEXT_SCALE,
                            y + row * TEXT_SCALE,
                            TEXT_SCALE, TEXT_SCALE,
                            color,
                        );
                    }
                }
            }
            cx += advance;
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Minimal 3×5 bitmap font
// ────────────────────────────────────────────────────────────────────────────

fn char_glyph(c: char) -> [u8; 5] {
    match c {
        '0' => [0b111, 0b101, 0b101, 0b101, 0b111],
        '1' => [0b010, 0b110, 0b010, 0b010, 0b111],
        '2' => [0b111, 0b001, 0b111, 0b100, 0b111],
        '3' => [0b111, 0b001, 0b111, 0b001, 0b111],
        '4' => [0b101, 0b101, 0b111, 0b001, 0b001],
        '5' => [0b111, 0b100, 0b111, 0b001, 0b111],
        '6' => [0b111, 0b100, 0b111, 0b101, 0b111],
        '7' => [0b111, 0b001, 0b001, 0b001, 0b001],
        '8' => [0b111, 0b101, 0b111, 0b101, 0b111],
        '9' => [0b111, 0b101, 0b111, 0b001, 0b111],
        'a' | 'A' => [0b111, 0b101, 0b111, 0b101, 0b101],
        'b' | 'B' => [0b110, 0b101, 0b110, 0b101, 0b110],
        'c' | 'C' => [0b111, 0b100, 0b100, 0b100, 0b111],
        'd' | 'D' => [0b110, 0b101, 0b101, 0b101, 0b110],
        'e' | 'E' => [0b111, 0b100, 0b111, 0b100, 0b111],
        'f' | 'F' => [0b111, 0b100, 0b111, 0b100, 0b100],
        'g' | 'G' => [0b111, 0b100, 0b101, 0b101, 0b111],
        'h' | 'H' => [0b101, 0b101, 0b111, 0b101, 0b101],
        'i' | 'I' => [0b111, 0b010, 0b010, 0b010, 0b111],
        'j' | 'J' => [0b001, 0b001, 0b001, 0b101, 0b111],
        'k' | 'K' => [0b101, 0b101, 0b110, 0b101, 0b101],
        'l' | 'L' => [0b100, 0b100, 0b100, 0b100, 0b111],
        'm' | 'M' => [0b101, 0b111, 0b101, 0b101, 0b101],
        'n' | 'N' => [0b111, 0b101, 0b101, 0b101, 0b101],
        'o' | 'O' => [0b111, 0b101, 0b101, 0b101, 0b111],
        'p' | 'P' => [0b111, 0b101, 0b111, 0b100, 0b100],
        'q' | 'Q' => [0b111, 0b101, 0b101, 0b111, 0b001],
        'r' | 'R' => [0b110, 0b101, 0b110, 0b101, 0b101],
        's' | 'S' => [0b111, 0b100, 0b111, 0b001, 0b111],
        't' | 'T' => [0b111, 0b010, 0b010, 0b010, 0b010],
        'u' | 'U' => [0b101, 0b101, 0b101, 0b101, 0b111],
        'v' | 'V' => [0b101, 0b101, 0b101, 0b010, 0b010],
        'w' | 'W' => [0b101, 0b101, 0b101, 0b111, 0b101],
        'x' | 'X' => [0b101, 0b101, 0b010, 0b101, 0b101],
        'y' | 'Y' => [0b101, 0b101, 0b111, 0b010, 0b010],
        'z' | 'Z' => [0b111, 0b001, 0b010, 0b100, 0b111],
        '(' => [0b001, 0b010, 0b010, 0b010, 0b001],
        ')' => [0b100, 0b010, 0b010, 0b010, 0b100],
        '-' => [0b000, 0b000, 0b111, 0b000, 0b000],
        '+' => [0b000, 0b010, 0b111, 0b010, 0b000],
        '=' => [0b000, 0b111, 0b000, 0b111, 0b000],
        '.' => [0b000, 0b000, 0b000, 0b000, 0b010],
        ':' => [0b000, 0b010, 0b000, 0b010, 0b000],
        ' ' => [0b000, 0b000, 0b000, 0b000, 0b000],
        _   => [0b000, 0b000, 0b010, 0b000, 0b000], // fallback dot
    }
}

/// Mix two ARGB colors. `t` = 0.0 → all `a`, `t` = 1.0 → all `b`.
fn blend(a: u32, b: u32, t: f32) -> u32 {
    let t = t.clamp(0.0, 1.0);
    let lerp = |ca: u32, cb: u32| (ca as f32 * (1.0-t) + cb as f32 * t) as u32;
    let ar = (a >> 16) & 0xFF; let br = (b >> 16) & 0xFF;
    let ag = (a >>  8) & 0xFF; let bg = (b >>  8) & 0xFF;
    let ab =  a        & 0xFF; let bb =  b        & 0xFF;
    0xFF000000 | (lerp(ar,br) << 16) | (lerp(ag,bg) << 8) | lerp(ab,bb)
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════
